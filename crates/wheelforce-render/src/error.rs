//! Rendering engine errors.

use thiserror::Error;

use wheelforce_effects::EffectError;

use crate::transport::TransportError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// No device is attached to the renderer.
    #[error("no device attached")]
    NotAttached,
    /// The effect table rejected the request.
    #[error(transparent)]
    Effect(#[from] EffectError),
    /// The outbound link failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = core::result::Result<T, RenderError>;
