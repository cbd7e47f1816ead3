/// Convenience result type used across the crate.
pub type ApngResult<T> = Result<T, ApngError>;

/// Top-level error taxonomy used by decoder, compositor and player APIs.
#[derive(thiserror::Error, Debug)]
pub enum ApngError {
    /// Malformed or unreadable source data. Aborts the load that produced it.
    #[error("decode error: {0}")]
    Decode(String),

    /// A frame descriptor that does not fit its canvas or carries a bad pixel payload.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A frame sequence that contradicts the image header (e.g. animated with no frames).
    #[error("malformed sequence: {0}")]
    MalformedSequence(String),

    /// The player or scheduler was driven without a loaded image.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Invalid user-provided configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApngError {
    /// Build an [`ApngError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build an [`ApngError::MalformedFrame`] value.
    pub fn malformed_frame(msg: impl Into<String>) -> Self {
        Self::MalformedFrame(msg.into())
    }

    /// Build an [`ApngError::MalformedSequence`] value.
    pub fn malformed_sequence(msg: impl Into<String>) -> Self {
        Self::MalformedSequence(msg.into())
    }

    /// Build an [`ApngError::InvalidState`] value.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Build an [`ApngError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Return `true` for errors raised while decoding the source (eligible for a fallback retry).
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Other(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
