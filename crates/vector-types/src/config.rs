//! Configuration loading for dense vector tooling.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/dense-vector/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::epoch::FormatEpoch;
use crate::error::SettingsError;
use crate::heuristic::FilterHeuristic;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Epoch pinned onto fields created with these settings
    #[serde(default)]
    pub format_epoch: FormatEpoch,

    /// Feature flag gating the `bbq_disk` index type
    #[serde(default)]
    pub ivf_format_enabled: bool,

    /// Filtered-search heuristic; follows the epoch when unset
    #[serde(default)]
    pub hnsw_filter_heuristic: Option<FilterHeuristic>,

    /// Wrap graph searches in the patience adapter
    #[serde(default)]
    pub hnsw_early_termination: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format_epoch: FormatEpoch::CURRENT,
            ivf_format_enabled: false,
            hnsw_filter_heuristic: None,
            hnsw_early_termination: false,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/dense-vector/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (DENSE_VECTOR_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, SettingsError> {
        let config_dir = ProjectDirs::from("", "", "dense-vector")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("format_epoch", FormatEpoch::CURRENT.as_str())
            .map_err(|e| SettingsError::Load(e.to_string()))?
            .set_default("ivf_format_enabled", false)
            .map_err(|e| SettingsError::Load(e.to_string()))?
            .set_default("hnsw_early_termination", false)
            .map_err(|e| SettingsError::Load(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| SettingsError::Load(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // DENSE_VECTOR_FORMAT_EPOCH, DENSE_VECTOR_IVF_FORMAT_ENABLED, ...
        builder = builder.add_source(
            Environment::with_prefix("DENSE_VECTOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| SettingsError::Load(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| SettingsError::Load(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that deserialize but make no sense together.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(SettingsError::Invalid(format!(
                "log_level must be one of {:?}, got {}",
                LOG_LEVELS, self.log_level
            )));
        }
        if let Some(heuristic) = self.hnsw_filter_heuristic {
            if !heuristic.available_for(self.format_epoch) {
                return Err(SettingsError::Invalid(format!(
                    "hnsw_filter_heuristic [{}] is not available for format_epoch [{}]",
                    heuristic, self.format_epoch
                )));
            }
        }
        Ok(())
    }

    /// The heuristic in effect, falling back to the epoch default.
    pub fn filter_heuristic(&self) -> FilterHeuristic {
        self.hnsw_filter_heuristic
            .unwrap_or_else(|| FilterHeuristic::default_for(self.format_epoch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.format_epoch, FormatEpoch::CURRENT);
        assert!(!settings.ivf_format_enabled);
        assert_eq!(settings.filter_heuristic(), FilterHeuristic::Acorn);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_load_with_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "format_epoch = \"normalized_cosine\"\nivf_format_enabled = true\nlog_level = \"debug\""
        )
        .unwrap();

        let settings = Settings::load(Some(&file.path().to_string_lossy())).unwrap();
        assert_eq!(settings.format_epoch, FormatEpoch::NormalizedCosine);
        assert!(settings.ivf_format_enabled);
        assert_eq!(settings.filter_heuristic(), FilterHeuristic::Fanout);
    }

    #[test]
    fn test_missing_cli_file_fails() {
        let result = Settings::load(Some("/nonexistent/dense-vector.toml"));
        assert!(matches!(result, Err(SettingsError::Load(_))));
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.log_level = "loud".to_string();
        assert!(settings.validate().is_err());

        settings.log_level = "warn".to_string();
        settings.format_epoch = FormatEpoch::Legacy;
        settings.hnsw_filter_heuristic = Some(FilterHeuristic::Acorn);
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_acorn_gate_matches_epoch_default() {
        let mut settings = Settings {
            hnsw_filter_heuristic: Some(FilterHeuristic::Acorn),
            ..Settings::default()
        };
        for epoch in FormatEpoch::ALL {
            settings.format_epoch = epoch;
            let acorn_default = FilterHeuristic::default_for(epoch) == FilterHeuristic::Acorn;
            assert_eq!(settings.validate().is_ok(), acorn_default, "{}", epoch);
        }

        settings.format_epoch = FormatEpoch::DefaultBbqHnsw;
        assert!(settings.validate().is_err());
        settings.hnsw_filter_heuristic = Some(FilterHeuristic::Fanout);
        assert!(settings.validate().is_ok());
    }
}
