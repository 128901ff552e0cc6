//! Error taxonomy shared by channel computation, training, loading and detection.

pub type Result<T> = std::result::Result<T, CascadeError>;

#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    /// Malformed or empty image, ROI or argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Detection attempted without any trained octave.
    #[error("no cascade model loaded")]
    ModelNotLoaded,

    /// Structurally inconsistent persisted model.
    #[error("malformed model: {0}")]
    MalformedModel(String),

    /// Training could not gather the samples it needs.
    #[error("insufficient training data: {0}")]
    InsufficientData(String),

    /// A caller-supplied cancellation check fired.
    #[error("operation cancelled")]
    Cancelled,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl CascadeError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedModel(msg.into())
    }
}
