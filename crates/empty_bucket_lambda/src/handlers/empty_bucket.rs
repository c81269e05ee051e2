use empty_bucket_core::batching::{compute_batch_plan, validate_batch_size};
use empty_bucket_core::deletion::{DeletionCandidate, DeletionOutcome};
use tracing::{debug, info, warn};

use crate::adapters::object_store::{StoreError, VersionMarker, VersionedObjectStore};
use crate::handlers::fault::HandlerFault;

/// Walks every page of the version listing. Each call reflects the bucket as it
/// is now; writers racing with the listing are not accounted for.
pub fn list_all_object_versions(
    store: &dyn VersionedObjectStore,
    bucket: &str,
) -> Result<Vec<DeletionCandidate>, StoreError> {
    let mut candidates = Vec::new();
    let mut marker: Option<VersionMarker> = None;
    let mut pages = 0usize;

    loop {
        let page = store.list_object_versions_page(bucket, marker.as_ref())?;
        pages += 1;
        candidates.extend(page.candidates);
        match page.next_marker {
            Some(next) => marker = Some(next),
            None => break,
        }
    }

    debug!(
        component = "empty_bucket",
        bucket,
        pages,
        object_versions = candidates.len(),
        "Listed object versions"
    );
    Ok(candidates)
}

/// Deletes every object version and delete marker in `bucket`.
///
/// Candidates go out in consecutive quiet-mode batches of at most `batch_size`.
/// Per-object failures are logged and counted but never stop the sweep and
/// never turn into a fault; only listing or whole-request failures do.
pub fn empty_bucket(
    store: &dyn VersionedObjectStore,
    bucket: &str,
    batch_size: usize,
) -> Result<DeletionOutcome, HandlerFault> {
    let batch_size = validate_batch_size(batch_size)?;
    let candidates = list_all_object_versions(store, bucket)?;
    info!(
        component = "empty_bucket",
        bucket,
        object_versions = candidates.len(),
        "Emptying {} object versions from bucket {}",
        candidates.len(),
        bucket
    );

    let plan = compute_batch_plan(candidates.len(), batch_size)?;
    let mut outcome = DeletionOutcome::new(bucket, candidates.len());

    for batch in plan {
        let errors = store.delete_object_versions(bucket, &candidates[batch.range()])?;
        for error in &errors {
            warn!(
                component = "empty_bucket",
                bucket,
                batch_id = batch.batch_id,
                key = error.key.as_deref().unwrap_or_default(),
                version_id = error.version_id.as_deref().unwrap_or_default(),
                code = error.code.as_deref().unwrap_or_default(),
                "Failed to delete {}: ({}) {}",
                error.uri(bucket),
                error.code.as_deref().unwrap_or_default(),
                error.message.as_deref().unwrap_or_default()
            );
        }
        outcome.record_batch(errors);
    }

    if outcome.is_clean() {
        info!(
            component = "empty_bucket",
            bucket,
            batches = outcome.batches_issued,
            "Done emptying bucket {}",
            bucket
        );
    } else {
        warn!(
            component = "empty_bucket",
            bucket,
            error_count = outcome.error_count(),
            "Failed to delete {} object versions from bucket {}",
            outcome.error_count(),
            bucket
        );
    }

    Ok(outcome)
}
