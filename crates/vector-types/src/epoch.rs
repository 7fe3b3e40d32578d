//! Format epochs.
//!
//! An epoch is pinned when a field is created and never changes for that
//! field. Behaviour that evolved over time (buffer endianness, cosine
//! normalization, default index options) is keyed off the epoch.

use serde::{Deserialize, Serialize};

/// Totally ordered on-disk/mapping format generation, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FormatEpoch {
    /// Raw buffers hold components only, big-endian
    Legacy,
    /// Raw buffers carry a trailing 4-byte magnitude
    MagnitudeStored,
    /// `index` defaults to true and `similarity` gets a default
    IndexedByDefault,
    /// Float raw buffers are little-endian
    LittleEndianFloats,
    /// Float cosine vectors are normalized at write time
    NormalizedCosine,
    /// Unset float index options default to int8_hnsw
    DefaultInt8Hnsw,
    /// Quantized index options accept `rescore_vector`
    RescoreVector,
    /// `rescore_vector.oversample` may be exactly 0
    RescoreZeroOversample,
    /// BBQ variants default to an oversample of 3.0
    DefaultBbqOversample,
    /// Unset float index options default to bbq_hnsw for large dims
    DefaultBbqHnsw,
    /// Filtered HNSW search defaults to the ACORN heuristic
    #[default]
    DefaultAcornHeuristic,
}

impl FormatEpoch {
    /// The newest epoch, used for freshly created fields.
    pub const CURRENT: FormatEpoch = FormatEpoch::DefaultAcornHeuristic;

    pub const ALL: [FormatEpoch; 11] = [
        FormatEpoch::Legacy,
        FormatEpoch::MagnitudeStored,
        FormatEpoch::IndexedByDefault,
        FormatEpoch::LittleEndianFloats,
        FormatEpoch::NormalizedCosine,
        FormatEpoch::DefaultInt8Hnsw,
        FormatEpoch::RescoreVector,
        FormatEpoch::RescoreZeroOversample,
        FormatEpoch::DefaultBbqOversample,
        FormatEpoch::DefaultBbqHnsw,
        FormatEpoch::DefaultAcornHeuristic,
    ];

    /// Whether this epoch is the same as or newer than `other`.
    pub fn on_or_after(self, other: FormatEpoch) -> bool {
        self >= other
    }

    pub fn stores_magnitude(self) -> bool {
        self.on_or_after(FormatEpoch::MagnitudeStored)
    }

    pub fn indexed_by_default(self) -> bool {
        self.on_or_after(FormatEpoch::IndexedByDefault)
    }

    pub fn normalizes_cosine(self) -> bool {
        self.on_or_after(FormatEpoch::NormalizedCosine)
    }

    pub fn accepts_rescore_vector(self) -> bool {
        self.on_or_after(FormatEpoch::RescoreVector)
    }

    pub fn allows_zero_oversample(self) -> bool {
        self.on_or_after(FormatEpoch::RescoreZeroOversample)
    }

    pub fn defaults_bbq_oversample(self) -> bool {
        self.on_or_after(FormatEpoch::DefaultBbqOversample)
    }

    /// Filtered graph search can run, and defaults to, the ACORN heuristic.
    pub fn supports_acorn_heuristic(self) -> bool {
        self.on_or_after(FormatEpoch::DefaultAcornHeuristic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormatEpoch::Legacy => "legacy",
            FormatEpoch::MagnitudeStored => "magnitude_stored",
            FormatEpoch::IndexedByDefault => "indexed_by_default",
            FormatEpoch::LittleEndianFloats => "little_endian_floats",
            FormatEpoch::NormalizedCosine => "normalized_cosine",
            FormatEpoch::DefaultInt8Hnsw => "default_int8_hnsw",
            FormatEpoch::RescoreVector => "rescore_vector",
            FormatEpoch::RescoreZeroOversample => "rescore_zero_oversample",
            FormatEpoch::DefaultBbqOversample => "default_bbq_oversample",
            FormatEpoch::DefaultBbqHnsw => "default_bbq_hnsw",
            FormatEpoch::DefaultAcornHeuristic => "default_acorn_heuristic",
        }
    }
}

impl std::fmt::Display for FormatEpoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FormatEpoch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormatEpoch::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown format epoch: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(FormatEpoch::CURRENT.on_or_after(FormatEpoch::DefaultBbqHnsw));
        assert!(!FormatEpoch::Legacy.stores_magnitude());
        assert!(FormatEpoch::LittleEndianFloats.stores_magnitude());
        assert!(!FormatEpoch::LittleEndianFloats.normalizes_cosine());
        for pair in FormatEpoch::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_parse_round_trip() {
        for epoch in FormatEpoch::ALL {
            assert_eq!(epoch.as_str().parse::<FormatEpoch>().unwrap(), epoch);
        }
        assert!("v9".parse::<FormatEpoch>().is_err());
    }
}
