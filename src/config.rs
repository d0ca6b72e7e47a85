//! Generator configuration.
//!
//! Loaded from an optional JSON file; CLI flags override whatever the file
//! sets. Every key is optional:
//!
//! ```json
//! {
//!   "skip_fields": ["id", "_links"],
//!   "reentry": "expand",
//!   "max_depth": 32,
//!   "indent": "  ",
//!   "escape": true,
//!   "pretty": false
//! }
//! ```
use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::render::{JsonRenderer, MarkupRenderer};
use crate::walker::{ReentryPolicy, WalkOptions, DEFAULT_MAX_DEPTH};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Field names dropped at every nesting level.
    pub skip_fields: Vec<String>,
    pub reentry: ReentryPolicy,
    pub max_depth: usize,
    /// Indentation of field lines in markup output.
    pub indent: String,
    /// XML-escape markup attribute values.
    pub escape: bool,
    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            skip_fields: vec!["id".to_string()],
            reentry: ReentryPolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            indent: "\t".to_string(),
            escape: false,
            pretty: true,
        }
    }
}

impl GeneratorConfig {
    pub fn from_json(src: &str) -> Result<Self> {
        crate::path_de::from_str_with_path(src)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path).map_err(|error| SchemaError::Config {
            path: path.display().to_string(),
            message: error.to_string(),
        })?;
        Self::from_json(&src)
    }

    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            skip_fields: self.skip_fields.clone(),
            reentry: self.reentry,
            max_depth: self.max_depth,
        }
    }

    pub fn markup_renderer(&self) -> MarkupRenderer {
        MarkupRenderer { indent: self.indent.clone(), escape: self.escape }
    }

    pub fn json_renderer(&self) -> JsonRenderer {
        JsonRenderer { pretty: self.pretty }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_means_defaults() {
        assert_eq!(GeneratorConfig::from_json("{}").unwrap(), GeneratorConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_what_it_sets() {
        let config = GeneratorConfig::from_json(r#"{"reentry": "expand", "skip_fields": []}"#).unwrap();
        assert_eq!(config.reentry, ReentryPolicy::Expand);
        assert!(config.skip_fields.is_empty());
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert!(config.walk_options().skip_fields.is_empty());
    }

    #[test]
    fn bad_value_names_the_key() {
        let err = GeneratorConfig::from_json(r#"{"max_depth": "deep"}"#).unwrap_err();
        match err {
            SchemaError::Config { path, .. } => assert_eq!(path, "max_depth"),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(GeneratorConfig::from_json(r#"{"format": "xml"}"#).is_err());
    }
}
