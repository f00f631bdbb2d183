//! Engine configuration
//!
//! Tuning knobs that would otherwise be global mutable state, loaded once
//! from TOML and immutable afterwards:
//!
//! ```toml
//! null_literal = "null"
//! max_generic_depth = 10
//! default_marshal_flags = "VERBOSE"
//! default_reorder_flags = "FEWEST_PARAMETERS|DEEPEST_TYPES"
//! simple_generic_definitions = ["List`1"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tether_sdk::{MarshalFlags, ObjectFlags, ReorderFlags};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Semantically invalid setting
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Binding engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Script literal standing for the null reference
    pub null_literal: String,

    /// Depth added to string-typed slots under `STRING_TYPE_BONUS`
    pub string_type_bonus: i64,

    /// Depth removed from string-typed slots under `STRING_TYPE_PENALTY`
    pub string_type_penalty: i64,

    /// Recursion cap for the simple-generic recognizer
    pub max_generic_depth: usize,

    /// Largest array rank accepted during conversion
    pub max_array_rank: usize,

    /// Largest total cell count of an array built from a script variable
    pub max_array_length: usize,

    /// Separator between type name and counter in generated handles
    pub handle_separator: String,

    /// Prefix of deterministic handle names for assemblies
    pub assembly_handle_prefix: String,

    /// Generic definitions whose simple instantiations render as lists
    pub simple_generic_definitions: Vec<String>,

    /// Marshal flags applied to every call
    pub default_marshal_flags: String,

    /// Reorder flags used when the caller does not pass any
    pub default_reorder_flags: String,

    /// Flags given to every new object table entry
    pub default_object_flags: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            null_literal: "null".to_string(),
            string_type_bonus: 1,
            string_type_penalty: 1,
            max_generic_depth: tether_types::DEFAULT_GENERIC_LIMIT,
            max_array_rank: tether_types::MAX_ARRAY_RANK,
            max_array_length: 1 << 24,
            handle_separator: "#".to_string(),
            assembly_handle_prefix: "assembly".to_string(),
            simple_generic_definitions: vec![
                "List`1".to_string(),
                "IList`1".to_string(),
                "ICollection`1".to_string(),
                "IEnumerable`1".to_string(),
            ],
            default_marshal_flags: "NONE".to_string(),
            default_reorder_flags: "DEFAULT".to_string(),
            default_object_flags: "NONE".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_generic_depth == 0 {
            return Err(ConfigError::ValidationError(
                "max_generic_depth must be at least 1".to_string(),
            ));
        }

        if self.max_array_rank == 0 || self.max_array_rank > tether_types::MAX_ARRAY_RANK {
            return Err(ConfigError::ValidationError(format!(
                "max_array_rank must be between 1 and {}",
                tether_types::MAX_ARRAY_RANK
            )));
        }

        if self.max_array_length == 0 {
            return Err(ConfigError::ValidationError(
                "max_array_length must be at least 1".to_string(),
            ));
        }

        if self.handle_separator.is_empty() {
            return Err(ConfigError::ValidationError(
                "handle_separator cannot be empty".to_string(),
            ));
        }

        self.marshal_flags()?;
        self.object_flags()?;
        let reorder = self.reorder_flags()?;
        crate::ranker::check_policy(reorder)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(())
    }

    /// Parsed `default_marshal_flags`
    pub fn marshal_flags(&self) -> Result<MarshalFlags, ConfigError> {
        MarshalFlags::from_combined_str(&self.default_marshal_flags).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "Invalid marshal flags: {}",
                self.default_marshal_flags
            ))
        })
    }

    /// Parsed `default_reorder_flags`
    pub fn reorder_flags(&self) -> Result<ReorderFlags, ConfigError> {
        ReorderFlags::from_combined_str(&self.default_reorder_flags).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "Invalid reorder flags: {}",
                self.default_reorder_flags
            ))
        })
    }

    /// Parsed `default_object_flags`
    pub fn object_flags(&self) -> Result<ObjectFlags, ConfigError> {
        ObjectFlags::from_combined_str(&self.default_object_flags).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "Invalid object flags: {}",
                self.default_object_flags
            ))
        })
    }
}
