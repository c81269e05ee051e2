use std::fmt;

use serde::{Deserialize, Serialize};

/// One object version (or delete marker) to remove from a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeletionCandidate {
    pub key: String,
    /// Absent for listing entries S3 returned without a version id.
    pub version_id: Option<String>,
}

impl DeletionCandidate {
    pub fn new(key: impl Into<String>, version_id: Option<String>) -> Self {
        Self {
            key: key.into(),
            version_id,
        }
    }
}

/// A per-object failure reported by a quiet-mode batch delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionError {
    pub key: Option<String>,
    pub version_id: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}

/// `s3://bucket/key(version)` as it appears in sweep logs.
pub struct ObjectVersionUri<'a> {
    pub bucket: &'a str,
    pub key: Option<&'a str>,
    pub version_id: Option<&'a str>,
}

impl fmt::Display for ObjectVersionUri<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "s3://{}/{}({})",
            self.bucket,
            self.key.unwrap_or_default(),
            self.version_id.unwrap_or("null")
        )
    }
}

impl DeletionError {
    pub fn uri<'a>(&'a self, bucket: &'a str) -> ObjectVersionUri<'a> {
        ObjectVersionUri {
            bucket,
            key: self.key.as_deref(),
            version_id: self.version_id.as_deref(),
        }
    }
}

/// Aggregate result of one sweep. Computed and logged, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionOutcome {
    pub bucket: String,
    pub total_candidates: usize,
    pub batches_issued: usize,
    pub errors: Vec<DeletionError>,
}

impl DeletionOutcome {
    pub fn new(bucket: impl Into<String>, total_candidates: usize) -> Self {
        Self {
            bucket: bucket.into(),
            total_candidates,
            ..Self::default()
        }
    }

    pub fn record_batch(&mut self, errors: impl IntoIterator<Item = DeletionError>) {
        self.batches_issued += 1;
        self.errors.extend(errors);
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
