use thiserror::Error;

/// Delivers a serialized response envelope to the orchestrator's callback URL.
pub trait ResponseTransport {
    fn put_response(&self, url: &str, body: &[u8]) -> Result<(), TransportError>;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to send response to {url}: {message}")]
    Request { url: String, message: String },
    #[error("response endpoint {url} rejected the callback with status {status}")]
    Rejected { url: String, status: u16 },
}
