//! Filtered graph-search heuristics.

use serde::{Deserialize, Serialize};

use crate::epoch::FormatEpoch;

/// How a graph search treats neighbors rejected by the metadata filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterHeuristic {
    /// Explore every neighbor, collect only those passing the filter
    Fanout,
    /// Only compare neighbors that pass the filter
    Acorn,
}

impl FilterHeuristic {
    pub fn default_for(epoch: FormatEpoch) -> Self {
        if epoch.supports_acorn_heuristic() {
            FilterHeuristic::Acorn
        } else {
            FilterHeuristic::Fanout
        }
    }

    /// Whether fields created at `epoch` can use this heuristic.
    pub fn available_for(self, epoch: FormatEpoch) -> bool {
        match self {
            FilterHeuristic::Fanout => true,
            FilterHeuristic::Acorn => epoch.supports_acorn_heuristic(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterHeuristic::Fanout => "fanout",
            FilterHeuristic::Acorn => "acorn",
        }
    }
}

impl std::fmt::Display for FilterHeuristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FilterHeuristic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fanout" => Ok(FilterHeuristic::Fanout),
            "acorn" => Ok(FilterHeuristic::Acorn),
            other => Err(format!("unknown filter heuristic: {}", other)),
        }
    }
}
