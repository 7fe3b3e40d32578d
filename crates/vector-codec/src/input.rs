//! Raw vector input.
//!
//! Vectors arrive either as an array of numbers or, for byte and bit
//! fields, as a hex string. Dimension checks run while members are read so
//! an oversized vector fails at the first surplus element.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vector_types::{ElementType, FieldError, VectorData};

use crate::validate::check_vector_errors;

/// A vector as supplied by a caller, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VectorInput {
    Numbers(Vec<f64>),
    Hex(String),
}

impl From<Vec<f32>> for VectorInput {
    fn from(values: Vec<f32>) -> Self {
        VectorInput::Numbers(values.into_iter().map(f64::from).collect())
    }
}

impl From<Vec<i8>> for VectorInput {
    fn from(values: Vec<i8>) -> Self {
        VectorInput::Numbers(values.into_iter().map(f64::from).collect())
    }
}

impl From<&VectorData> for VectorInput {
    fn from(data: &VectorData) -> Self {
        match data {
            VectorData::Floats(v) => VectorInput::from(v.clone()),
            VectorData::Bytes(v) => VectorInput::from(v.clone()),
        }
    }
}

/// Shape of a field's expected vectors.
#[derive(Debug, Clone, Copy)]
pub struct VectorShape<'a> {
    pub field: &'a str,
    pub element_type: ElementType,
    pub dims: usize,
}

impl VectorShape<'_> {
    fn exceeded(&self, index: usize) -> Result<(), FieldError> {
        if self.element_type.dims_for_elements(index) >= self.dims {
            return Err(FieldError::DimensionExceeded {
                field: self.field.to_string(),
                expected: self.dims,
            });
        }
        Ok(())
    }

    fn matches(&self, count: usize) -> Result<(), FieldError> {
        let actual = self.element_type.dims_for_elements(count);
        if actual != self.dims {
            return Err(FieldError::DimensionMismatch {
                field: self.field.to_string(),
                expected: self.dims,
                actual,
            });
        }
        Ok(())
    }

    /// Parse a JSON document value. `null` yields `None`.
    pub fn parse_value(&self, value: &Value) -> Result<Option<VectorData>, FieldError> {
        match value {
            Value::Null => Ok(None),
            Value::Array(items) => {
                if items.first().is_some_and(Value::is_array) {
                    return Err(multiple_values(self.field));
                }
                let numbers = items.iter().enumerate().map(|(i, item)| {
                    item.as_f64().ok_or_else(|| {
                        FieldError::parse(
                            self.field,
                            format!("expected a number at dim [{}] but found [{}]", i, item),
                        )
                    })
                });
                self.parse_numbers(numbers).map(Some)
            }
            Value::String(hex) => self.parse_hex(hex).map(Some),
            other => Err(unsupported(self.field, other)),
        }
    }

    /// Parse a typed input, as used for query vectors.
    pub fn parse_input(&self, input: &VectorInput) -> Result<VectorData, FieldError> {
        match input {
            VectorInput::Numbers(values) => self.parse_numbers(values.iter().copied().map(Ok)),
            VectorInput::Hex(hex) => self.parse_hex(hex),
        }
    }

    fn parse_numbers(
        &self,
        numbers: impl Iterator<Item = Result<f64, FieldError>>,
    ) -> Result<VectorData, FieldError> {
        let capacity = self.element_type.num_elements(self.dims);
        let mut values: Vec<f64> = Vec::with_capacity(capacity);
        for number in numbers {
            self.exceeded(values.len())?;
            values.push(number?);
        }
        self.matches(values.len())?;
        check_vector_errors(self.field, self.element_type, &values)?;

        let data = match self.element_type {
            ElementType::Float => VectorData::Floats(values.iter().map(|&v| v as f32).collect()),
            ElementType::Byte | ElementType::Bit => {
                VectorData::Bytes(values.iter().map(|&v| v as i8).collect())
            }
        };
        Ok(data)
    }

    fn parse_hex(&self, hex: &str) -> Result<VectorData, FieldError> {
        if self.element_type == ElementType::Float {
            return Err(unsupported(self.field, &Value::String(hex.to_string())));
        }
        let bytes = decode_hex(self.field, hex)?;
        self.matches(bytes.len())?;
        Ok(VectorData::Bytes(bytes))
    }
}

/// Count the dims carried by a value, for fields whose dims are unset.
pub fn parse_dimension_count(
    field: &str,
    element_type: ElementType,
    value: &Value,
) -> Result<usize, FieldError> {
    match value {
        Value::Array(items) => {
            if items.first().is_some_and(Value::is_array) {
                return Err(multiple_values(field));
            }
            Ok(element_type.dims_for_elements(items.len()))
        }
        Value::String(hex) if element_type != ElementType::Float => {
            Ok(element_type.dims_for_elements(decode_hex(field, hex)?.len()))
        }
        other => Err(unsupported(field, other)),
    }
}

/// Decode a hex string into signed bytes.
pub fn decode_hex(field: &str, hex: &str) -> Result<Vec<i8>, FieldError> {
    if hex.len() % 2 != 0 {
        return Err(FieldError::parse(
            field,
            format!("hex string [{}] must have an even number of characters", hex),
        ));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .map(|b| b as i8)
                .ok_or_else(|| {
                    FieldError::parse(field, format!("invalid hex string [{}]", hex))
                })
        })
        .collect()
}

/// Encode signed bytes as lowercase hex.
pub fn encode_hex(bytes: &[i8]) -> String {
    bytes.iter().map(|&b| format!("{:02x}", b as u8)).collect()
}

fn unsupported(field: &str, value: &Value) -> FieldError {
    FieldError::parse(
        field,
        format!("Unsupported type for provided value [{}]", value),
    )
}

pub(crate) fn multiple_values(field: &str) -> FieldError {
    FieldError::parse(
        field,
        format!(
            "Field [{}] of type [dense_vector] doesn't support indexing multiple values for the same field in the same document",
            field
        ),
    )
}
