use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// Superseded or torn down. Never shown to the user.
    #[error("acquisition cancelled")]
    Cancelled,

    #[error("no page {index} in {source_id}")]
    UnknownPage { source_id: String, index: u32 },

    #[error("unsupported locator: {0}")]
    UnsupportedLocator(String),

    #[error("failed to read {path}: {source}")]
    Fetch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("empty image payload")]
    EmptyPayload,

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to start acquisition thread: {0}")]
    Spawn(std::io::Error),
}

impl AcquireError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AcquireError::Cancelled)
    }
}
