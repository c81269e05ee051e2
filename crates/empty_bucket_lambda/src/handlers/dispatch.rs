use std::collections::HashMap;

use empty_bucket_core::contract::{
    ContractError, InvocationContext, LifecycleEvent, RequestType, ResourceProperties,
    ResponseData, ResponseStatus, BUCKET_NAME_PROPERTY,
};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::adapters::object_store::VersionedObjectStore;
use crate::adapters::response_transport::ResponseTransport;
use crate::config::HandlerConfig;
use crate::handlers::empty_bucket::empty_bucket;
use crate::handlers::fault::HandlerFault;
use crate::handlers::response::{ResponseChannel, ResponseError};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The payload lacks the fields needed to address a response at all.
    #[error("lifecycle event cannot be answered: {0}")]
    Unanswerable(#[source] serde_json::Error),
    #[error(transparent)]
    Response(#[from] ResponseError),
}

/// Work performed for one request type. Returned data becomes the `Data` of the
/// SUCCESS response; a returned fault becomes a FAILED response.
pub trait RequestAction {
    fn handle(
        &self,
        event: &LifecycleEvent,
        channel: &mut ResponseChannel<'_>,
    ) -> Result<Option<ResponseData>, HandlerFault>;
}

pub struct EmptyBucketAction<S> {
    store: S,
    default_bucket: Option<String>,
    batch_size: usize,
}

impl<S> EmptyBucketAction<S> {
    pub fn new(store: S, config: &HandlerConfig) -> Self {
        Self {
            store,
            default_bucket: config.default_bucket.clone(),
            batch_size: config.delete_batch_size,
        }
    }
}

impl<S: VersionedObjectStore> RequestAction for EmptyBucketAction<S> {
    fn handle(
        &self,
        event: &LifecycleEvent,
        _channel: &mut ResponseChannel<'_>,
    ) -> Result<Option<ResponseData>, HandlerFault> {
        let bucket =
            resolve_bucket_name(&event.resource_properties, self.default_bucket.as_deref())?;
        debug!(
            component = "dispatch",
            bucket = %bucket,
            default_bucket = self.default_bucket.as_deref(),
            "Resolved bucket {bucket}"
        );
        empty_bucket(&self.store, &bucket, self.batch_size)?;
        Ok(None)
    }
}

/// `BucketName` from the event, else the configured default. A `BucketName`
/// that is present but not a string is a fault, not a fallback.
pub fn resolve_bucket_name(
    properties: &ResourceProperties,
    default_bucket: Option<&str>,
) -> Result<String, HandlerFault> {
    properties
        .bucket_name()?
        .or(default_bucket)
        .map(str::to_string)
        .ok_or_else(|| HandlerFault::missing_key(BUCKET_NAME_PROPERTY))
}

/// Maps request types to actions. Request types without an action are reported
/// as SUCCESS without touching anything.
#[derive(Default)]
pub struct CustomResourceHandler {
    actions: HashMap<RequestType, Box<dyn RequestAction + Send + Sync>>,
}

impl CustomResourceHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(
        mut self,
        request_type: RequestType,
        action: impl RequestAction + Send + Sync + 'static,
    ) -> Self {
        self.actions.insert(request_type, Box::new(action));
        self
    }

    /// The production wiring: empty the bucket on Delete, nothing otherwise.
    pub fn empty_bucket_on_delete<S>(store: S, config: &HandlerConfig) -> Self
    where
        S: VersionedObjectStore + Send + Sync + 'static,
    {
        Self::new().on(RequestType::Delete, EmptyBucketAction::new(store, config))
    }

    pub fn handles(&self, request_type: &RequestType) -> bool {
        self.actions.contains_key(request_type)
    }

    /// Runs the action for `event` and reports the outcome exactly once.
    /// Only a failure to deliver the response itself is returned as an error.
    pub fn handle_event(
        &self,
        event: &LifecycleEvent,
        context: &InvocationContext,
        transport: &dyn ResponseTransport,
    ) -> Result<ResponseStatus, ResponseError> {
        debug!(
            component = "dispatch",
            request_type = %event.request_type,
            stack_id = %event.stack_id,
            request_id = %event.request_id,
            logical_resource_id = %event.logical_resource_id,
            "Dispatching lifecycle event"
        );

        ResponseChannel::new(event, context, transport).run_scoped(|channel| {
            let Some(action) = self.actions.get(&event.request_type) else {
                info!(
                    component = "dispatch",
                    request_type = %event.request_type,
                    "Nothing to do for {} requests",
                    event.request_type
                );
                return Ok(());
            };

            if let Some(data) = action.handle(event, channel)? {
                channel.set_data(data);
            }
            Ok(())
        })
    }

    /// Entry point for the raw invocation payload. A payload that does not
    /// parse as a lifecycle event is still answered with FAILED whenever it
    /// carries a response URL and the identity fields; only a payload without
    /// them is returned as [`DispatchError::Unanswerable`].
    pub fn handle_payload(
        &self,
        payload: &Value,
        context: &InvocationContext,
        transport: &dyn ResponseTransport,
    ) -> Result<ResponseStatus, DispatchError> {
        let parse_error = match LifecycleEvent::deserialize(payload) {
            Ok(event) => return Ok(self.handle_event(&event, context, transport)?),
            Err(error) => error,
        };

        let Some(event) = LifecycleEvent::envelope_only(payload) else {
            return Err(DispatchError::Unanswerable(parse_error));
        };
        warn!(
            component = "dispatch",
            logical_resource_id = %event.logical_resource_id,
            stack_id = %event.stack_id,
            error = %parse_error,
            "Lifecycle event failed to parse, answering from its envelope"
        );

        let fault = ContractError::MalformedEvent(parse_error.to_string());
        let status = ResponseChannel::new(&event, context, transport)
            .run_scoped(|_| Err(HandlerFault::from(fault)))?;
        Ok(status)
    }
}
