//! Flowgate configuration
//!
//! Read from `flowgate.yaml` in the working directory, or from the path given
//! with `--config`. Every section is optional:
//!
//! ```yaml
//! validation:
//!   warnings_as_errors: false
//!   report_self_loops: true
//! compile:
//!   duplicate_names: merge   # or reject
//! output:
//!   format: text             # or json
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::compiler::CompileOptions;
use crate::error::{FlowgateError, Result};
use crate::validator::ValidationConfig;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "flowgate.yaml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FlowgateConfig {
    pub validation: ValidationConfig,
    pub compile: CompileOptions,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// How CLI reports are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Colored, human-readable lines (default)
    #[default]
    Text,

    /// One JSON document on stdout
    Json,
}

impl FlowgateConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| FlowgateError::Config {
            reason: format!("Failed to parse config: {}", e),
        })
    }

    /// Load configuration
    ///
    /// With an explicit path the file must exist. Without one, a missing
    /// `flowgate.yaml` yields the defaults; a malformed one is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path,
            None => {
                let default = Path::new(CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = fs::read_to_string(path).map_err(|e| FlowgateError::Config {
            reason: format!("Failed to read {}: {}", path.display(), e),
        })?;
        Self::from_yaml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::DuplicateNamePolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_config_is_default() {
        let config = FlowgateConfig::from_yaml("").unwrap();
        assert_eq!(config, FlowgateConfig::default());
        assert!(!config.validation.warnings_as_errors);
        assert!(config.validation.report_self_loops);
        assert_eq!(config.compile.duplicate_names, DuplicateNamePolicy::Merge);
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn partial_sections() {
        let config = FlowgateConfig::from_yaml(
            r#"
compile:
  duplicate_names: reject
output:
  format: json
"#,
        )
        .unwrap();
        assert_eq!(config.compile.duplicate_names, DuplicateNamePolicy::Reject);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.validation, ValidationConfig::default());
    }

    #[test]
    fn malformed_config_is_an_error() {
        let err = FlowgateConfig::from_yaml("compile:\n  duplicate_names: sometimes\n").unwrap_err();
        assert!(matches!(err, FlowgateError::Config { .. }));
    }

    #[test]
    fn load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "validation:\n  warnings_as_errors: true").unwrap();

        let config = FlowgateConfig::load(Some(file.path())).unwrap();
        assert!(config.validation.warnings_as_errors);
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let err = FlowgateConfig::load(Some(Path::new("/nonexistent/flowgate.yaml"))).unwrap_err();
        assert!(matches!(err, FlowgateError::Config { .. }));
    }
}
