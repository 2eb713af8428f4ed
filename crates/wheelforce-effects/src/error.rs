//! Boundary errors for effect operations.

/// Errors rejected synchronously at the effect operation boundary.
///
/// No partial mutation occurs when one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EffectError {
    /// A parameter the device cannot render, a handle out of range, or a
    /// category change on a started effect.
    #[error("invalid effect parameter: {0}")]
    InvalidParameter(&'static str),

    /// No free effect slot; the caller must erase one first.
    #[error("no free effect slot")]
    ResourceExhausted,
}

/// A specialized `Result` for effect operations.
pub type Result<T> = core::result::Result<T, EffectError>;
