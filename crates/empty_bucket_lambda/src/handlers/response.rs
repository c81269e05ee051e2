use std::panic::{self, AssertUnwindSafe};

use empty_bucket_core::contract::{
    log_stream_reason, ContractError, InvocationContext, LifecycleEvent, ResponseData,
    ResponseEnvelope, ResponseStatus,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::adapters::response_transport::{ResponseTransport, TransportError};
use crate::handlers::fault::HandlerFault;

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("a {status} response was already sent for this request")]
    AlreadySent { status: ResponseStatus },
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Reports the outcome of one lifecycle event back to CloudFormation.
///
/// At most one envelope leaves a channel: the first send marks it as sent
/// before the PUT is attempted, and every later send fails with
/// [`ResponseError::AlreadySent`]. [`ResponseChannel::run_scoped`] adds the
/// other half of the guarantee by sending exactly once when the action did not.
pub struct ResponseChannel<'a> {
    event: &'a LifecycleEvent,
    context: &'a InvocationContext,
    transport: &'a dyn ResponseTransport,
    physical_resource_id: String,
    no_echo: bool,
    data: ResponseData,
    sent: Option<ResponseStatus>,
}

impl<'a> ResponseChannel<'a> {
    pub fn new(
        event: &'a LifecycleEvent,
        context: &'a InvocationContext,
        transport: &'a dyn ResponseTransport,
    ) -> Self {
        Self {
            event,
            context,
            transport,
            physical_resource_id: event.logical_resource_id.clone(),
            no_echo: false,
            data: ResponseData::new(),
            sent: None,
        }
    }

    pub fn with_physical_resource_id(mut self, physical_resource_id: impl Into<String>) -> Self {
        self.physical_resource_id = physical_resource_id.into();
        self
    }

    pub fn with_no_echo(mut self, no_echo: bool) -> Self {
        self.no_echo = no_echo;
        self
    }

    pub fn with_data(mut self, data: ResponseData) -> Self {
        self.data = data;
        self
    }

    pub fn set_data(&mut self, data: ResponseData) {
        self.data = data;
    }

    pub fn sent_status(&self) -> Option<ResponseStatus> {
        self.sent
    }

    pub fn send_success(
        &mut self,
        physical_resource_id: Option<String>,
        data: Option<ResponseData>,
    ) -> Result<(), ResponseError> {
        if let Some(data) = data {
            self.data = data;
        }
        if let Some(physical_resource_id) = physical_resource_id {
            self.physical_resource_id = physical_resource_id;
        }
        info!(
            component = "response_channel",
            logical_resource_id = %self.event.logical_resource_id,
            stack_id = %self.event.stack_id,
            "Sending SUCCESS for {} in stack {}",
            self.event.logical_resource_id,
            self.event.stack_id
        );
        self.transmit(ResponseStatus::Success, None, ResponseData::new())
    }

    /// Sends FAILED. A missing or empty `reason` points the reader at the log
    /// stream of this invocation.
    pub fn send_failed(&mut self, reason: Option<&str>) -> Result<(), ResponseError> {
        let reason = match reason {
            Some(reason) if !reason.is_empty() => reason.to_string(),
            _ => log_stream_reason(&self.context.log_stream_name),
        };
        error!(
            component = "response_channel",
            logical_resource_id = %self.event.logical_resource_id,
            stack_id = %self.event.stack_id,
            reason = %reason,
            "Sending FAILED for {} in stack {}: {}",
            self.event.logical_resource_id,
            self.event.stack_id,
            reason
        );
        self.transmit(ResponseStatus::Failed, Some(reason), ResponseData::new())
    }

    /// Builds the envelope and PUTs it to the event's response URL, unless the
    /// URL is the console placeholder.
    pub fn transmit(
        &mut self,
        status: ResponseStatus,
        reason: Option<String>,
        extra_fields: ResponseData,
    ) -> Result<(), ResponseError> {
        if let Some(previous) = self.sent {
            return Err(ResponseError::AlreadySent { status: previous });
        }

        let envelope = ResponseEnvelope {
            status,
            physical_resource_id: self.physical_resource_id.clone(),
            stack_id: self.event.stack_id.clone(),
            request_id: self.event.request_id.clone(),
            logical_resource_id: self.event.logical_resource_id.clone(),
            no_echo: self.no_echo,
            data: self.data.clone(),
            reason,
        };
        let body = envelope.to_body(&extra_fields)?;
        self.sent = Some(status);

        debug!(
            component = "response_channel",
            url = %self.event.response_url,
            body = %String::from_utf8_lossy(&body),
            "PUT response"
        );
        if self.event.is_dry_run() {
            debug!(
                component = "response_channel",
                "Placeholder response URL, skipping delivery"
            );
            return Ok(());
        }

        self.transport
            .put_response(&self.event.response_url, &body)
            .map_err(ResponseError::from)
    }

    /// Runs `action` and resolves the channel exactly once afterwards.
    ///
    /// When the action returns `Ok` without sending, SUCCESS is sent. When it
    /// returns a fault or panics without sending, FAILED is sent with the
    /// fault's reason. When the action already sent, nothing more is sent; a
    /// transport failure from that send is still returned to the caller.
    pub fn run_scoped<F>(mut self, action: F) -> Result<ResponseStatus, ResponseError>
    where
        F: FnOnce(&mut Self) -> Result<(), HandlerFault>,
    {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| action(&mut self)))
            .unwrap_or_else(|payload| Err(HandlerFault::from_panic(payload.as_ref())));

        match (self.sent, outcome) {
            (None, Ok(())) => {
                self.send_success(None, None)?;
                Ok(ResponseStatus::Success)
            }
            (None, Err(fault)) => {
                self.send_failed(Some(&fault.reason()))?;
                Ok(ResponseStatus::Failed)
            }
            (Some(status), Ok(())) => Ok(status),
            (Some(_), Err(HandlerFault::Response(ResponseError::Transport(error)))) => {
                Err(ResponseError::Transport(error))
            }
            (Some(status), Err(fault)) => {
                warn!(
                    component = "response_channel",
                    logical_resource_id = %self.event.logical_resource_id,
                    sent_status = %status,
                    fault = %fault.reason(),
                    "Fault raised after the response was already sent"
                );
                Ok(status)
            }
        }
    }
}
