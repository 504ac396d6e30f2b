
use cores::ipc::{DEFAULT_CACHE_CONTROL, NO_CACHE_CONTROL};
use thiserror::Error;

/// Every way an invocation can fail. Each kind maps onto the status code and
/// cache directive of the error envelope returned to the gateway.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("method {0} is not allowed")]
    MethodNotAllowed(String),

    #[error("processing server not ready after {attempts} health probes")]
    UpstreamUnavailable { attempts: u32 },

    #[error("processing server responded with status {0}")]
    UpstreamError(u16),

    #[error("image body encoding failed: {0}")]
    EncodingFailed(String),

    #[error("internal failure: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ProxyError {
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::MethodNotAllowed(_) => 405,
            ProxyError::UpstreamUnavailable { .. } => 502,
            ProxyError::UpstreamError(status) => *status,
            ProxyError::EncodingFailed(_) | ProxyError::Internal(_) => 500,
        }
    }

    pub fn cache_control(&self) -> &'static str {
        match self {
            ProxyError::EncodingFailed(_) | ProxyError::Internal(_) => NO_CACHE_CONTROL,
            _ => DEFAULT_CACHE_CONTROL,
        }
    }
}
