use empty_bucket_core::deletion::{DeletionCandidate, DeletionError};
use thiserror::Error;

/// Continuation point for `ListObjectVersions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMarker {
    pub key_marker: String,
    pub version_id_marker: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionListingPage {
    /// Object versions and delete markers, in listing order.
    pub candidates: Vec<DeletionCandidate>,
    /// `None` once the listing is complete.
    pub next_marker: Option<VersionMarker>,
}

/// Storage port used by the bucket sweep.
///
/// Implementations issue live requests: no caching between calls.
/// `delete_object_versions` must use quiet mode, so only failures come back,
/// and is never called with more than 1000 candidates.
pub trait VersionedObjectStore {
    fn list_object_versions_page(
        &self,
        bucket: &str,
        marker: Option<&VersionMarker>,
    ) -> Result<VersionListingPage, StoreError>;

    fn delete_object_versions(
        &self,
        bucket: &str,
        candidates: &[DeletionCandidate],
    ) -> Result<Vec<DeletionError>, StoreError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to list object versions in bucket {bucket}: {message}")]
    List { bucket: String, message: String },
    #[error("failed to delete object versions from bucket {bucket}: {message}")]
    Delete { bucket: String, message: String },
}
