use empty_bucket_core::batching::validate_batch_size;
use empty_bucket_core::contract::DEFAULT_DELETE_BATCH_SIZE;
use thiserror::Error;

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const BUCKET_NAME_ENV: &str = "BUCKET_NAME";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const DEFAULT_LOG_LEVEL_ENV: &str = "DEFAULT_LOG_LEVEL";
pub const DELETE_BATCH_SIZE_ENV: &str = "DELETE_BATCH_SIZE";

/// Process-level settings read once at cold start. Blank variables count as unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Bucket emptied when the event carries no `BucketName`.
    pub default_bucket: Option<String>,
    /// `tracing` filter directive, `LOG_LEVEL` winning over `DEFAULT_LOG_LEVEL`.
    pub log_level: String,
    pub delete_batch_size: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            default_bucket: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            delete_batch_size: DEFAULT_DELETE_BATCH_SIZE,
        }
    }
}

impl HandlerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let log_level = read(LOG_LEVEL_ENV)
            .or_else(|| read(DEFAULT_LOG_LEVEL_ENV))
            .map(|level| normalize_log_level(&level))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let delete_batch_size = match read(DELETE_BATCH_SIZE_ENV) {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .and_then(|size| validate_batch_size(size).ok())
                .ok_or(ConfigError::InvalidBatchSize { value: raw })?,
            None => DEFAULT_DELETE_BATCH_SIZE,
        };

        Ok(Self {
            default_bucket: read(BUCKET_NAME_ENV),
            log_level,
            delete_batch_size,
        })
    }
}

/// Bare level names are matched case-insensitively, with the `logging`
/// spellings `WARNING` and `CRITICAL` mapped onto `tracing` levels. Anything
/// else is a filter directive and is kept verbatim, target names included.
fn normalize_log_level(raw: &str) -> String {
    match raw.to_ascii_lowercase().as_str() {
        level @ ("trace" | "debug" | "info" | "warn" | "error" | "off") => level.to_string(),
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        _ => raw.to_string(),
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DELETE_BATCH_SIZE must be an integer between 1 and 1000, got '{value}'")]
    InvalidBatchSize { value: String },
}
