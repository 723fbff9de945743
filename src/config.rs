use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::ingest::{FetchPolicy, RefreshFailurePolicy, RefreshMode};
use crate::utils::constants::{
    ARCHIVE_DEFAULT_SHEET, ARCHIVE_DEFAULT_URL, ARCHIVE_MAX_ATTEMPTS, ARCHIVE_RETRY_DELAY_MS,
    ARCHIVE_TIMEOUT_SECS, COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE,
    COMPRESSION_SNAPPY, COMPRESSION_ZSTD, DEFAULT_DATA_DIR, LOCAL_DEFAULT_SOURCE_NAME,
    LOCAL_DEFAULT_URL, LOCAL_TIMEOUT_SECS,
};

pub const DEFAULT_CONFIG_FILE: &str = "airq.toml";
pub const ENV_PREFIX: &str = "AIRQ";

/// Process settings, layered from an optional TOML file and `AIRQ_*`
/// environment variables (`AIRQ_LOCAL__URL`, `AIRQ_ARCHIVE__MAX_ATTEMPTS`, ...).
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,

    pub compression: String,

    pub on_refresh_failure: RefreshFailurePolicy,

    #[validate(nested)]
    pub local: LocalSettings,

    #[validate(nested)]
    pub archive: ArchiveSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(default)]
pub struct LocalSettings {
    #[validate(url)]
    pub url: String,

    #[validate(length(min = 1))]
    pub source_name: String,

    #[validate(range(min = 1, max = 300))]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(default)]
pub struct ArchiveSettings {
    #[validate(url)]
    pub url: String,

    #[validate(length(min = 1))]
    pub sheet: String,

    #[validate(range(min = 1, max = 300))]
    pub timeout_secs: u64,

    #[validate(range(min = 1, max = 10))]
    pub max_attempts: u32,

    pub retry_delay_ms: u64,

    pub refresh: RefreshMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            compression: COMPRESSION_ZSTD.to_string(),
            on_refresh_failure: RefreshFailurePolicy::default(),
            local: LocalSettings::default(),
            archive: ArchiveSettings::default(),
        }
    }
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            url: LOCAL_DEFAULT_URL.to_string(),
            source_name: LOCAL_DEFAULT_SOURCE_NAME.to_string(),
            timeout_secs: LOCAL_TIMEOUT_SECS,
        }
    }
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            url: ARCHIVE_DEFAULT_URL.to_string(),
            sheet: ARCHIVE_DEFAULT_SHEET.to_string(),
            timeout_secs: ARCHIVE_TIMEOUT_SECS,
            max_attempts: ARCHIVE_MAX_ATTEMPTS,
            retry_delay_ms: ARCHIVE_RETRY_DELAY_MS,
            refresh: RefreshMode::default(),
        }
    }
}

impl Settings {
    /// Read settings from `path` (or `airq.toml` in the working directory if
    /// present) and the environment, then validate them.
    ///
    /// An explicitly given file must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let settings: Settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.check()?;
        debug!(?settings, "settings loaded");
        Ok(settings)
    }

    /// Field validation plus the checks the derive cannot express.
    pub fn check(&self) -> Result<()> {
        self.validate()?;

        let known = [
            COMPRESSION_SNAPPY,
            COMPRESSION_GZIP,
            COMPRESSION_LZ4,
            COMPRESSION_ZSTD,
            COMPRESSION_NONE,
        ];
        if !known.contains(&self.compression.to_lowercase().as_str()) {
            return Err(ProcessingError::Config(format!(
                "Unsupported compression: {}",
                self.compression
            )));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(ProcessingError::Config(
                "data_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl LocalSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ArchiveSettings {
    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_secs(self.timeout_secs),
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}
