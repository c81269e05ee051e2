use aws_sdk_s3::operation::list_object_versions::ListObjectVersionsOutput;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use empty_bucket_core::contract::InvocationContext;
use empty_bucket_core::deletion::{DeletionCandidate, DeletionError};
use empty_bucket_lambda::adapters::object_store::{
    StoreError, VersionListingPage, VersionMarker, VersionedObjectStore,
};
use empty_bucket_lambda::adapters::response_transport::{ResponseTransport, TransportError};
use empty_bucket_lambda::config::{HandlerConfig, DEFAULT_LOG_LEVEL};
use empty_bucket_lambda::handlers::dispatch::CustomResourceHandler;
use empty_bucket_lambda::telemetry::init_tracing;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, Value};
use tracing::info;

struct S3VersionStore {
    s3_client: aws_sdk_s3::Client,
}

impl VersionedObjectStore for S3VersionStore {
    fn list_object_versions_page(
        &self,
        bucket: &str,
        marker: Option<&VersionMarker>,
    ) -> Result<VersionListingPage, StoreError> {
        let bucket_name = bucket.to_string();
        let marker = marker.cloned();
        let client = self.s3_client.clone();

        let output = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let (key_marker, version_id_marker) = match marker {
                    Some(marker) => (Some(marker.key_marker), marker.version_id_marker),
                    None => (None, None),
                };
                client
                    .list_object_versions()
                    .bucket(bucket_name)
                    .set_key_marker(key_marker)
                    .set_version_id_marker(version_id_marker)
                    .send()
                    .await
            })
        })
        .map_err(|error| StoreError::List {
            bucket: bucket.to_string(),
            message: error.to_string(),
        })?;

        Ok(page_from_output(&output))
    }

    fn delete_object_versions(
        &self,
        bucket: &str,
        candidates: &[DeletionCandidate],
    ) -> Result<Vec<DeletionError>, StoreError> {
        let delete_failed = |message: String| StoreError::Delete {
            bucket: bucket.to_string(),
            message,
        };
        let objects = object_identifiers(candidates)
            .map_err(|error| delete_failed(format!("invalid object identifier: {error}")))?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|error| delete_failed(format!("invalid delete request: {error}")))?;
        let bucket_name = bucket.to_string();
        let client = self.s3_client.clone();

        let output = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .delete_objects()
                    .bucket(bucket_name)
                    .delete(delete)
                    .send()
                    .await
            })
        })
        .map_err(|error| delete_failed(error.to_string()))?;

        Ok(output.errors().iter().map(deletion_error_from).collect())
    }
}

struct HttpResponseTransport {
    http_client: reqwest::Client,
}

impl ResponseTransport for HttpResponseTransport {
    fn put_response(&self, url: &str, body: &[u8]) -> Result<(), TransportError> {
        let target_url = url.to_string();
        let body_bytes = body.to_vec();
        let client = self.http_client.clone();

        let status = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put(target_url)
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(body_bytes)
                    .send()
                    .await
                    .map(|response| response.status())
            })
        })
        .map_err(|error| TransportError::Request {
            url: url.to_string(),
            message: error.to_string(),
        })?;

        if !status.is_success() {
            return Err(TransportError::Rejected {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Versions first, then delete markers; both block deletion of the bucket.
fn page_from_output(output: &ListObjectVersionsOutput) -> VersionListingPage {
    let versions = output
        .versions()
        .iter()
        .filter_map(|version| candidate(version.key(), version.version_id()));
    let delete_markers = output
        .delete_markers()
        .iter()
        .filter_map(|marker| candidate(marker.key(), marker.version_id()));

    let next_marker = match (output.is_truncated(), output.next_key_marker()) {
        (Some(true), Some(key_marker)) => Some(VersionMarker {
            key_marker: key_marker.to_string(),
            version_id_marker: output.next_version_id_marker().map(str::to_string),
        }),
        _ => None,
    };

    VersionListingPage {
        candidates: versions.chain(delete_markers).collect(),
        next_marker,
    }
}

fn candidate(key: Option<&str>, version_id: Option<&str>) -> Option<DeletionCandidate> {
    key.map(|key| DeletionCandidate::new(key, version_id.map(str::to_string)))
}

fn object_identifiers(
    candidates: &[DeletionCandidate],
) -> Result<Vec<ObjectIdentifier>, aws_sdk_s3::error::BuildError> {
    candidates
        .iter()
        .map(|candidate| {
            ObjectIdentifier::builder()
                .key(&candidate.key)
                .set_version_id(candidate.version_id.clone())
                .build()
        })
        .collect()
}

fn deletion_error_from(error: &aws_sdk_s3::types::Error) -> DeletionError {
    DeletionError {
        key: error.key().map(str::to_string),
        version_id: error.version_id().map(str::to_string),
        code: error.code().map(str::to_string),
        message: error.message().map(str::to_string),
    }
}

fn invocation_context(context: &lambda_runtime::Context) -> InvocationContext {
    InvocationContext {
        aws_request_id: context.request_id.clone(),
        log_stream_name: context.env_config.log_stream.clone(),
    }
}

struct RuntimeDependencies {
    handler: CustomResourceHandler,
    transport: HttpResponseTransport,
}

async fn handle_request(
    deps: &RuntimeDependencies,
    event: LambdaEvent<Value>,
) -> Result<Value, Error> {
    let context = invocation_context(&event.context);

    let status = deps
        .handler
        .handle_payload(&event.payload, &context, &deps.transport)
        .map_err(|error| Error::from(error.to_string()))?;

    Ok(json!({ "status": status }))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = HandlerConfig::from_env();
    init_tracing(
        config
            .as_ref()
            .map(|config| config.log_level.as_str())
            .unwrap_or(DEFAULT_LOG_LEVEL),
    );
    let config = config.map_err(|error| Error::from(error.to_string()))?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = S3VersionStore {
        s3_client: aws_sdk_s3::Client::new(&aws_config),
    };
    let deps = RuntimeDependencies {
        handler: CustomResourceHandler::empty_bucket_on_delete(store, &config),
        transport: HttpResponseTransport {
            http_client: reqwest::Client::new(),
        },
    };

    info!(
        component = "runtime",
        default_bucket = config.default_bucket.as_deref(),
        delete_batch_size = config.delete_batch_size,
        "Empty-bucket runtime ready"
    );
    lambda_runtime::run(service_fn(|event| handle_request(&deps, event))).await
}
