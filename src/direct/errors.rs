use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("negotiation failed: status code {status}, body: {body}")]
    NegotiationFailed {
        status: u16,
        body: String,
    },

    #[error("transfer failed: status code {status}, message: {message}")]
    TransferFailed {
        status: u16,
        message: String,
    },

    #[error("storage protocol mismatch: {0}")]
    ProtocolMismatch(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("link failed: status code {status}, body: {body}")]
    LinkFailed {
        status: u16,
        body: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("param error: {0}")]
    Param(String),
}

impl UploadError {
    pub fn negotiation_failed(status: u16, body: impl Into<String>) -> Self {
        Self::NegotiationFailed {
            status,
            body: body.into(),
        }
    }

    pub fn transfer_failed(status: u16, message: impl Into<String>) -> Self {
        Self::TransferFailed {
            status,
            message: message.into(),
        }
    }

    pub fn protocol_mismatch(message: impl Into<String>) -> Self {
        Self::ProtocolMismatch(message.into())
    }

    pub fn link_failed(status: u16, body: impl Into<String>) -> Self {
        Self::LinkFailed {
            status,
            body: body.into(),
        }
    }
}

/// Error alias
pub type Result<T, E = UploadError> = std::result::Result<T, E>;
