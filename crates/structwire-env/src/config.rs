use serde::{Deserialize, Serialize};

/// Separator placed between channel path segments.
pub const DEFAULT_DELIMITER: &str = ".";

/// Controls how channel names are formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Joins namespace, field, index and nested-struct segments.
    pub delimiter: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config: EnvironmentConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EnvironmentConfig::default());
        assert_eq!(config.delimiter, ".");
    }
}
