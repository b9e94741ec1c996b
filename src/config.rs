use crate::error::NotecraftError;
use crate::logger::LogSeverity;
use crate::types::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Plugin configuration, usually read from `notecraft.json` in the plugin data folder.
/// Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Namespace used for every persistent data key
    pub namespace: String,
    /// Lowest severity that is printed
    pub log_level: String,
    /// Bits per entry of a biome container using the global biome palette
    pub biome_direct_bits: u8,
    /// Rewrite outgoing chunk data packets
    pub rewrite_chunks: bool,
    /// Rewrite outgoing single and multi block update packets
    pub rewrite_block_updates: bool,
    /// Handle custom block placement from use-item-on packets
    pub intercept_placement: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            namespace: "notecraft".to_owned(),
            log_level: "info".to_owned(),
            biome_direct_bits: 6,
            rewrite_chunks: true,
            rewrite_block_updates: true,
            intercept_placement: true,
        }
    }
}

impl PluginConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PluginConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn log_severity(&self) -> Result<LogSeverity> {
        self.log_level
            .parse()
            .map_err(NotecraftError::ConfigError)
    }

    fn validate(&self) -> Result<()> {
        if self.namespace.is_empty()
            || !self
                .namespace
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_-.".contains(c))
        {
            return Err(NotecraftError::ConfigError(format!(
                "Invalid namespace '{}', expected [a-z0-9_.-]+",
                self.namespace
            )));
        }
        if !(1..=32).contains(&self.biome_direct_bits) {
            return Err(NotecraftError::ConfigError(format!(
                "biome_direct_bits must be between 1 and 32, got {}",
                self.biome_direct_bits
            )));
        }
        self.log_severity()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PluginConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PluginConfig::default());
        assert_eq!(config.log_severity().unwrap(), LogSeverity::Info);
    }

    #[test]
    fn test_partial_document_overrides_fields() {
        let config =
            PluginConfig::from_json_str(r#"{"log_level": "debug", "rewrite_chunks": false}"#)
                .unwrap();
        assert_eq!(config.log_severity().unwrap(), LogSeverity::Debug);
        assert!(!config.rewrite_chunks);
        assert!(config.rewrite_block_updates);
        assert_eq!(config.namespace, "notecraft");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert_matches!(
            PluginConfig::from_json_str(r#"{"namespace": "Bad Namespace"}"#),
            Err(NotecraftError::ConfigError(_))
        );
        assert_matches!(
            PluginConfig::from_json_str(r#"{"log_level": "loud"}"#),
            Err(NotecraftError::ConfigError(_))
        );
        assert_matches!(
            PluginConfig::from_json_str(r#"{"biome_direct_bits": 0}"#),
            Err(NotecraftError::ConfigError(_))
        );
        assert_matches!(
            PluginConfig::from_json_str("not json"),
            Err(NotecraftError::ConfigError(_))
        );
    }
}
