/// Crate-wide error type.
///
/// Only construction and mount-time problems are reported through this type. Once a backdrop is
/// running, degraded conditions (missing capabilities, pending assets) are reported per frame
/// instead of as errors.
#[derive(thiserror::Error, Debug)]
pub enum BackdropError {
    /// Invalid user input (configuration, stage pipeline, parameters).
    #[error("validation error: {0}")]
    Validation(String),

    /// The host could not provide a usable drawing surface.
    #[error("surface error: {0}")]
    Surface(String),

    /// Asset could not be read or decoded.
    #[error("asset error: {0}")]
    Asset(String),

    /// Configuration could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Any other error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience result alias used throughout the crate.
pub type BackdropResult<T> = Result<T, BackdropError>;

impl BackdropError {
    /// Build [`BackdropError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build [`BackdropError::Surface`].
    pub fn surface(msg: impl Into<String>) -> Self {
        Self::Surface(msg.into())
    }

    /// Build [`BackdropError::Asset`].
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    /// Build [`BackdropError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for BackdropError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
