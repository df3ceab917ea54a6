use thiserror::Error;

/// Everything that can abort a submission. All of these surface to the
/// storefront as a 500; the variants exist for logs and tests.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("could not parse upload form: {0}")]
    FormParse(String),

    #[error("no prescription file was received by the server")]
    MissingFile,

    #[error("remote validation failed on `{field}`: {message}")]
    RemoteValidation { field: String, message: String },

    #[error("staged upload was rejected with status {status}")]
    UploadTransport { status: u16, body: String },

    #[error("remote file was rejected with status {status}")]
    RemoteFileRejected { status: String },

    #[error("order #{order_number} not found")]
    OrderNotFound { order_number: String },

    #[error("admin API responded with status {status}")]
    RemoteStatus { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not decode admin API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("multipart field `{0}` contains header-breaking content")]
    UnsafeMultipartValue(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("too many uploads in flight, try again shortly")]
    Busy,

    #[error("request body exceeds the upload size limit")]
    BodyTooLarge,

    #[error("request did not complete within the configured timeout")]
    TimedOut,
}

impl IntakeError {
    pub fn remote_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        IntakeError::RemoteValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Message shown to the storefront; the detailed reason goes in `details`.
    pub fn client_message(&self) -> &'static str {
        match self {
            IntakeError::FormParse(_) | IntakeError::BodyTooLarge => "Error processing upload.",
            _ => "An internal server error occurred.",
        }
    }
}
