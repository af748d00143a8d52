//! Pipeline configuration
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```toml
//! z_offset = -0.15
//! sample_rate_override = 50.0
//!
//! [writer]
//! output_root = "artifacts"
//! compress = true
//! ```

use std::path::{Path, PathBuf};

use kinebake_core::{MotionError, MotionResult};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Artifact layout and encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Directory that holds one sub-directory per artifact
    pub output_root: PathBuf,
    /// Artifact version tag, appended to the output name
    pub version: String,
    /// File name of the archive inside the artifact directory
    pub file_name: String,
    /// Deflate archive entries
    pub compress: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("artifacts"),
            version: "v0".to_string(),
            file_name: "motion.npz".to_string(),
            compress: false,
        }
    }
}

/// Bake configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    /// Vertical shift applied to every root position at load time
    pub z_offset: f64,
    /// Replaces the motion's nominal sample rate when set
    pub sample_rate_override: Option<f64>,
    /// Log replay progress every this many frames (0 disables)
    pub progress_interval: usize,
    pub writer: WriterConfig,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            z_offset: 0.0,
            sample_rate_override: None,
            progress_interval: 30,
            writer: WriterConfig::default(),
        }
    }
}

impl BakeConfig {
    pub fn from_toml_str(text: &str) -> MotionResult<Self> {
        toml::from_str(text)
            .map_err(|e| MotionError::InvalidFormat(format!("config: {}", e)))
    }

    /// Load config from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> MotionResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MotionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        info!(?path, "Loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BakeConfig::default();
        assert_eq!(config.z_offset, 0.0);
        assert_eq!(config.sample_rate_override, None);
        assert_eq!(config.progress_interval, 30);
        assert_eq!(config.writer.output_root, PathBuf::from("artifacts"));
        assert_eq!(config.writer.version, "v0");
        assert_eq!(config.writer.file_name, "motion.npz");
        assert!(!config.writer.compress);
    }

    #[test]
    fn test_partial_toml() {
        let config = BakeConfig::from_toml_str(
            r#"
            z_offset = -0.15

            [writer]
            compress = true
            "#,
        )
        .unwrap();
        assert_eq!(config.z_offset, -0.15);
        assert_eq!(config.progress_interval, 30);
        assert!(config.writer.compress);
        assert_eq!(config.writer.version, "v0");
    }

    #[test]
    fn test_bad_toml() {
        let err = BakeConfig::from_toml_str("z_offset = \"low\"").unwrap_err();
        assert!(err.is_format());
    }
}
