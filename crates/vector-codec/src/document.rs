//! Document-level parsing for dense vector fields.

use std::collections::HashSet;

use serde_json::Value;
use tracing::info;
use vector_mapping::{DenseVectorField, FieldConfig};
use vector_types::FieldError;

use crate::encoder::{IndexEntry, VectorEncoder};
use crate::input::{multiple_values, parse_dimension_count};

/// Entries collected for a single document.
#[derive(Debug, Default)]
pub struct ParsedDocument {
    entries: Vec<IndexEntry>,
    seen: HashSet<String>,
}

impl ParsedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<IndexEntry> {
        self.entries
    }

    /// Parse `value` for `field` into this document.
    ///
    /// A field without dims is promoted using the value's dimension count;
    /// the promoted configuration is returned so the caller can publish it
    /// as a mapping update. The document itself is encoded against it.
    pub fn add_field(
        &mut self,
        field: &DenseVectorField,
        value: &Value,
    ) -> Result<Option<FieldConfig>, FieldError> {
        if self.seen.contains(field.name()) {
            return Err(multiple_values(field.name()));
        }
        match field {
            DenseVectorField::Ready(config) => {
                self.add_encoded(config, value)?;
                Ok(None)
            }
            DenseVectorField::Pending(pending) => {
                if value.is_null() {
                    return Ok(None);
                }
                let dims = parse_dimension_count(pending.name(), pending.element_type(), value)?;
                let config = pending.promote(dims)?;
                self.add_encoded(&config, value)?;
                info!(field = %config.name(), dims, "Promoted dense_vector field");
                Ok(Some(config))
            }
        }
    }

    fn add_encoded(&mut self, config: &FieldConfig, value: &Value) -> Result<(), FieldError> {
        let entries = VectorEncoder::new(config).encode_value(value)?;
        if !entries.is_empty() {
            self.seen.insert(config.name().to_string());
            self.entries.extend(entries);
        }
        Ok(())
    }
}
