use crate::error::{BundleError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILENAME: &str = "notebundle.json";
const DEFAULT_BODY_EXT: &str = ".md";
const DEFAULT_COMPRESSION_LEVEL: u32 = 6;
const DEFAULT_MAX_NAME_LEN: usize = 64;
const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Settings shared by export and import. Both sides must agree on `body_ext`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleConfig {
    /// gzip level applied to the whole archive (0 = store, 9 = best)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Suffix of the note body entry (e.g. ".md")
    #[serde(default = "default_body_ext")]
    pub body_ext: String,

    /// Longest generated filename, in chars, before collision suffixes
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn default_body_ext() -> String {
    DEFAULT_BODY_EXT.to_string()
}

fn default_max_name_len() -> usize {
    DEFAULT_MAX_NAME_LEN
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            body_ext: DEFAULT_BODY_EXT.to_string(),
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }
}

impl BundleConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(BundleError::Io)?;
        let mut config: BundleConfig =
            serde_json::from_str(&content).map_err(BundleError::Serialization)?;
        config.validate()?;
        let ext = config.body_ext.clone();
        config.set_body_ext(&ext);
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(BundleError::Io)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self).map_err(BundleError::Serialization)?;
        fs::write(config_path, content).map_err(BundleError::Io)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.max_name_len == 0 {
            return Err(BundleError::Config(
                "max_name_len must be at least 1".to_string(),
            ));
        }
        if self.body_ext.trim_start_matches('.').is_empty() {
            return Err(BundleError::Config("body_ext must not be empty".to_string()));
        }
        Ok(())
    }

    /// Set the body extension (normalizes to start with a dot)
    pub fn set_body_ext(&mut self, ext: &str) {
        if ext.starts_with('.') {
            self.body_ext = ext.to_string();
        } else {
            self.body_ext = format!(".{}", ext);
        }
    }

    /// The level handed to the gzip encoder, clamped to the valid range.
    pub fn compression(&self) -> flate2::Compression {
        flate2::Compression::new(self.compression_level.min(MAX_COMPRESSION_LEVEL))
    }

    pub fn max_name_len(&self) -> usize {
        self.max_name_len.max(1)
    }
}
