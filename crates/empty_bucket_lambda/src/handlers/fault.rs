use std::any::Any;

use empty_bucket_core::contract::ContractError;
use thiserror::Error;

use crate::adapters::object_store::StoreError;
use crate::handlers::response::ResponseError;

/// A fault escaping a dispatched action. The response channel turns it into a
/// FAILED response whose reason is [`HandlerFault::reason`].
#[derive(Debug, Error)]
pub enum HandlerFault {
    #[error("{key}")]
    MissingKey { key: String },
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Response(#[from] ResponseError),
    #[error("{0}")]
    Panic(String),
}

impl HandlerFault {
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingKey { key: key.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingKey { .. } => "MissingKey",
            Self::Storage(_) => "StorageError",
            Self::Contract(_) => "ContractError",
            Self::Response(_) => "ResponseError",
            Self::Panic(_) => "Panic",
        }
    }

    /// `"<kind>: <message>"`, e.g. `"MissingKey: BucketName"`.
    pub fn reason(&self) -> String {
        format!("{}: {self}", self.kind())
    }

    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "action panicked".to_string());
        Self::Panic(message)
    }
}
