//! Client configuration file (TOML).
//!
//! ```toml
//! [device]
//! kind = "up5k"
//! port = "/dev/ttyACM0"
//!
//! [shadow]
//! bram_path = "build/data.hex"
//! spram_path = "build/spram_data.hex"
//!
//! [sync]
//! seed = 0
//! max_attempts = 256
//! max_probe_words = 10
//!
//! [init]
//! chunk_words = 16
//! ```

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::memctl::{
    client::ClientOptions,
    error::{MemctlError, Result},
    helpers::MAX_REQUEST_WORDS,
    shadow::ShadowPaths,
    sync::SyncPolicy,
    types::{Device, Region},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub device: DeviceConfig,

    #[serde(default)]
    pub shadow: ShadowConfig,

    #[serde(default)]
    pub sync: SyncPolicy,

    #[serde(default)]
    pub init: InitConfig,
}

/// `[device]`: which part, and how to reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_kind")]
    pub kind: Device,

    /// Serial port path, e.g. `/dev/ttyACM0` or `COM3`.
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Per-read timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Reset line hold time.
    #[serde(default = "default_reset_settle_ms")]
    pub reset_settle_ms: u64,
}

/// `[shadow]`: word-list files, one per region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowConfig {
    #[serde(default = "default_bram_path")]
    pub bram_path: PathBuf,

    /// Ignored on parts without SPRAM.
    #[serde(default = "default_spram_path")]
    pub spram_path: PathBuf,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            bram_path: default_bram_path(),
            spram_path: default_spram_path(),
        }
    }
}

/// `[init]`: SPRAM bulk load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitConfig {
    #[serde(default = "default_chunk_words")]
    pub chunk_words: usize,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            chunk_words: default_chunk_words(),
        }
    }
}

fn default_kind() -> Device {
    Device::Hx1k
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_reset_settle_ms() -> u64 {
    100
}

fn default_bram_path() -> PathBuf {
    PathBuf::from("build/data.hex")
}

fn default_spram_path() -> PathBuf {
    PathBuf::from("build/spram_data.hex")
}

fn default_chunk_words() -> usize {
    16
}

impl FromStr for Config {
    type Err = MemctlError;

    fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| MemctlError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Loads and validates a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MemctlError::Config(format!("failed to read {}: {e}", path.display())))?;
        content.parse()
    }

    /// Rejects values the client cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.device.port.trim().is_empty() {
            return Err(MemctlError::Config("device.port must not be empty".into()));
        }
        if self.device.baud_rate == 0 {
            return Err(MemctlError::Config("device.baud_rate must be positive".into()));
        }
        if !(1..=MAX_REQUEST_WORDS).contains(&self.init.chunk_words) {
            return Err(MemctlError::Config(format!(
                "init.chunk_words must be within 1..={MAX_REQUEST_WORDS}, got {}",
                self.init.chunk_words
            )));
        }
        if self.sync.max_attempts == 0 {
            return Err(MemctlError::Config("sync.max_attempts must be positive".into()));
        }
        if self.sync.max_probe_words == 0 {
            return Err(MemctlError::Config(
                "sync.max_probe_words must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.device.timeout_ms)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            reset_settle: Duration::from_millis(self.device.reset_settle_ms),
            init_chunk_words: self.init.chunk_words,
            sync: self.sync,
        }
    }

    /// Backing files for the configured part. SPRAM is left out on parts
    /// without it.
    pub fn shadow_paths(&self) -> ShadowPaths {
        let paths = ShadowPaths::new(&self.shadow.bram_path);
        if self.device.kind.has_region(Region::Spram) {
            paths.with_spram(&self.shadow.spram_path)
        } else {
            paths
        }
    }
}
