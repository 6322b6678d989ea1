//! Configuration management for rsacrypt
//!
//! Only the command-line front end reads configuration; the library
//! functions take every input as an explicit argument.

use crate::crypto::{DEFAULT_KEY_BITS, MAX_KEY_BITS, MIN_KEY_BITS};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default stem for auto-named encrypted images
pub const DEFAULT_FILE_STEM: &str = "encrypted_image";

/// Default extension for encrypted output
pub const DEFAULT_EXTENSION: &str = "rsa";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Key generation and key file locations
    #[serde(default)]
    pub keys: KeyConfig,

    /// Where encrypted output goes
    #[serde(default)]
    pub output: OutputConfig,
}

/// Key configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    /// RSA modulus size in bits for newly generated keys
    #[serde(default = "default_key_size")]
    pub key_size: usize,

    /// PKCS#8 PEM private key used for decryption
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    /// SubjectPublicKeyInfo PEM public key used for encryption
    #[serde(default)]
    pub public_key_path: Option<PathBuf>,
}

fn default_key_size() -> usize {
    DEFAULT_KEY_BITS
}

/// Output naming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for auto-named output files
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// File name stem, numbered as `<stem>_<n>`
    #[serde(default = "default_file_stem")]
    pub file_stem: String,

    /// File extension without the dot
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_stem() -> String {
    DEFAULT_FILE_STEM.to_string()
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl Default for KeyConfig {
    fn default() -> Self {
        KeyConfig {
            key_size: DEFAULT_KEY_BITS,
            private_key_path: None,
            public_key_path: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: default_output_dir(),
            file_stem: default_file_stem(),
            extension: default_extension(),
        }
    }
}

impl Config {
    /// Load configuration from a file, with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!("Failed to read config file: {}", e))
        })?;

        let mut config: Config = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config file: {}", e))
        })?;

        config.apply_env_overrides();

        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise start from defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::load(path);
        }

        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key_size) = std::env::var("RSACRYPT_KEY_SIZE") {
            if let Ok(bits) = key_size.trim().parse::<usize>() {
                self.keys.key_size = bits;
            }
        }

        if let Ok(path) = std::env::var("RSACRYPT_PRIVATE_KEY") {
            let path = path.trim();
            if !path.is_empty() {
                self.keys.private_key_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(path) = std::env::var("RSACRYPT_PUBLIC_KEY") {
            let path = path.trim();
            if !path.is_empty() {
                self.keys.public_key_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(dir) = std::env::var("RSACRYPT_OUTPUT_DIR") {
            let dir = dir.trim();
            if !dir.is_empty() {
                self.output.dir = PathBuf::from(dir);
            }
        }
    }

    /// Save configuration to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            Error::Config(format!("Failed to serialize config: {}", e))
        })?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path.as_ref(), content).map_err(|e| {
            Error::Config(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let bits = self.keys.key_size;
        if !(MIN_KEY_BITS..=MAX_KEY_BITS).contains(&bits) || bits % 8 != 0 {
            return Err(Error::InvalidConfig(format!(
                "Key size {} is not supported (use 2048 or 4096)",
                bits
            )));
        }

        if self.output.file_stem.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "Output file stem must not be empty".to_string(),
            ));
        }

        if self.output.extension.trim().is_empty() || self.output.extension.contains('.') {
            return Err(Error::InvalidConfig(
                "Output extension must be non-empty and contain no dots".to_string(),
            ));
        }

        Ok(())
    }

    /// Default location of the configuration file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rsacrypt")
            .join("config.json")
    }
}
