#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use empty_bucket_core::deletion::{DeletionCandidate, DeletionError};
use empty_bucket_lambda::adapters::object_store::{
    StoreError, VersionListingPage, VersionMarker, VersionedObjectStore,
};
use empty_bucket_lambda::adapters::response_transport::{ResponseTransport, TransportError};
use serde_json::Value;

/// Versioned buckets held in memory, listed in pages of `page_size`.
/// Markers are plain offsets into the bucket's version list. Clones share state.
#[derive(Clone)]
pub struct InMemoryBuckets {
    buckets: Arc<Mutex<BTreeMap<String, Vec<DeletionCandidate>>>>,
    page_size: usize,
    protected_keys: HashSet<String>,
    delete_calls: Arc<Mutex<Vec<(String, usize)>>>,
}

impl InMemoryBuckets {
    pub fn new(page_size: usize) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(BTreeMap::new())),
            page_size,
            protected_keys: HashSet::new(),
            delete_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a bucket holding `count` versions spread over `count / 2` keys.
    pub fn with_bucket(self, bucket: &str, count: usize) -> Self {
        let versions = (0..count)
            .map(|index| {
                DeletionCandidate::new(
                    format!("logs/{:05}.gz", index / 2),
                    Some(format!("v{index}")),
                )
            })
            .collect();
        self.buckets
            .lock()
            .expect("poisoned mutex")
            .insert(bucket.to_string(), versions);
        self
    }

    /// Versions of these keys survive every delete and are reported as errors.
    pub fn protecting(mut self, keys: &[&str]) -> Self {
        self.protected_keys = keys.iter().map(|key| key.to_string()).collect();
        self
    }

    pub fn remaining(&self, bucket: &str) -> usize {
        self.buckets
            .lock()
            .expect("poisoned mutex")
            .get(bucket)
            .map_or(0, Vec::len)
    }

    pub fn delete_calls(&self) -> Vec<(String, usize)> {
        self.delete_calls.lock().expect("poisoned mutex").clone()
    }
}

impl VersionedObjectStore for InMemoryBuckets {
    fn list_object_versions_page(
        &self,
        bucket: &str,
        marker: Option<&VersionMarker>,
    ) -> Result<VersionListingPage, StoreError> {
        let buckets = self.buckets.lock().expect("poisoned mutex");
        let versions = buckets.get(bucket).ok_or_else(|| StoreError::List {
            bucket: bucket.to_string(),
            message: "NoSuchBucket: The specified bucket does not exist".to_string(),
        })?;
        let start = marker
            .map(|marker| {
                marker
                    .key_marker
                    .parse::<usize>()
                    .expect("fake markers are offsets")
            })
            .unwrap_or(0);
        let end = (start + self.page_size).min(versions.len());
        Ok(VersionListingPage {
            candidates: versions[start..end].to_vec(),
            next_marker: (end < versions.len()).then(|| VersionMarker {
                key_marker: end.to_string(),
                version_id_marker: None,
            }),
        })
    }

    fn delete_object_versions(
        &self,
        bucket: &str,
        candidates: &[DeletionCandidate],
    ) -> Result<Vec<DeletionError>, StoreError> {
        self.delete_calls
            .lock()
            .expect("poisoned mutex")
            .push((bucket.to_string(), candidates.len()));

        let (protected, deletable): (Vec<_>, Vec<_>) = candidates
            .iter()
            .partition(|candidate| self.protected_keys.contains(&candidate.key));

        let mut buckets = self.buckets.lock().expect("poisoned mutex");
        if let Some(versions) = buckets.get_mut(bucket) {
            versions.retain(|version| !deletable.contains(&version));
        }

        Ok(protected
            .into_iter()
            .map(|candidate| DeletionError {
                key: Some(candidate.key.clone()),
                version_id: candidate.version_id.clone(),
                code: Some("AccessDenied".to_string()),
                message: Some("Access Denied".to_string()),
            })
            .collect())
    }
}

/// Records every PUT instead of sending it.
#[derive(Default)]
pub struct RecordingTransport {
    puts: Mutex<Vec<(String, Value)>>,
}

impl RecordingTransport {
    pub fn puts(&self) -> Vec<(String, Value)> {
        self.puts.lock().expect("poisoned mutex").clone()
    }

    pub fn single_body(&self) -> Value {
        let puts = self.puts();
        assert_eq!(puts.len(), 1, "expected exactly one response, got {puts:?}");
        puts[0].1.clone()
    }
}

impl ResponseTransport for RecordingTransport {
    fn put_response(&self, url: &str, body: &[u8]) -> Result<(), TransportError> {
        let body = serde_json::from_slice(body).expect("response body should be json");
        self.puts
            .lock()
            .expect("poisoned mutex")
            .push((url.to_string(), body));
        Ok(())
    }
}
