//! Import configuration
//!
//! An [`ImportConfig`] is built once (CLI flags, environment, defaults) and
//! handed to the pipeline by value. The pipeline never reads settings from
//! anywhere else.

use estatefeed_common::{ImportError, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Default destination API root
pub const DEFAULT_API_URL: &str = "https://api.airtable.com";

/// Rows per create call; also the destination's documented per-call limit
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const MAX_BATCH_SIZE: usize = 10;

/// Archives above this size are rejected before extraction
pub const DEFAULT_MAX_ARCHIVE_BYTES: u64 = 512 * 1024 * 1024;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Shortest access token accepted before any request is made
pub const MIN_TOKEN_LEN: usize = 10;

// ============================================================================
// Configuration values
// ============================================================================

/// Where the archive comes from and where it gets unpacked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveConfig {
    pub archive_path: PathBuf,
    /// Parent directory for per-run scratch directories
    pub scratch_root: PathBuf,
    pub max_archive_bytes: u64,
}

impl ArchiveConfig {
    pub fn new(archive_path: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: archive_path.into(),
            scratch_root: std::env::temp_dir(),
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_BYTES,
        }
    }

    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    pub fn with_max_archive_bytes(mut self, max: u64) -> Self {
        self.max_archive_bytes = max;
        self
    }
}

/// Credentials and identifiers of the destination table
#[derive(Clone, PartialEq, Eq)]
pub struct DestinationConfig {
    pub api_url: String,
    pub api_token: String,
    pub base_id: String,
    pub table_name: String,
    pub timeout_secs: u64,
}

impl DestinationConfig {
    pub fn new(
        api_token: impl Into<String>,
        base_id: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: api_token.into(),
            base_id: base_id.into(),
            table_name: table_name.into(),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        let token = self.api_token.trim();
        if token.is_empty() {
            return Err(ImportError::config("access token is empty"));
        }
        if token.len() < MIN_TOKEN_LEN {
            return Err(ImportError::config(format!(
                "access token is too short (expected at least {} characters)",
                MIN_TOKEN_LEN
            )));
        }
        if self.base_id.trim().is_empty() {
            return Err(ImportError::config("base id is empty"));
        }
        if self.table_name.trim().is_empty() {
            return Err(ImportError::config("table name is empty"));
        }
        if self.timeout_secs == 0 {
            return Err(ImportError::config("request timeout must be greater than 0"));
        }
        Ok(())
    }
}

// Keep the token out of logs.
impl fmt::Debug for DestinationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &"***")
            .field("base_id", &self.base_id)
            .field("table_name", &self.table_name)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Everything one import run needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    pub archive: ArchiveConfig,
    pub destination: DestinationConfig,
    pub batch_size: usize,
    /// Try to create missing destination columns before choosing a build mode
    pub provision_columns: bool,
}

impl ImportConfig {
    pub fn new(archive: ArchiveConfig, destination: DestinationConfig) -> Self {
        Self {
            archive,
            destination,
            batch_size: DEFAULT_BATCH_SIZE,
            provision_columns: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_provision_columns(mut self, provision: bool) -> Self {
        self.provision_columns = provision;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.archive.archive_path.as_os_str().is_empty() {
            return Err(ImportError::config("archive path is empty"));
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ImportError::config(format!(
                "batch size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.batch_size
            )));
        }
        self.destination.validate()
    }
}
