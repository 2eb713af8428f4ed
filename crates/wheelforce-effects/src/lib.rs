//! Force feedback effect model, timing state machine, and fixed-point
//! waveform synthesis.
//!
//! This crate is the pure core of the renderer: it owns the effect
//! definitions callers upload, advances each effect's delay/duration/repeat
//! timing, evaluates envelope and waveform curves in saturating fixed-point
//! arithmetic, and folds everything into the four per-slot parameter sets
//! consumed by the command encoder. It performs no I/O and takes the
//! current time as an argument, so every path can be tested without
//! hardware or a clock.

pub mod effect;
pub mod error;
pub mod eval;
pub mod meter;
pub mod store;
pub mod trig;

pub use effect::{ConditionParams, EffectCategory, EffectDef, EffectKind, Envelope, Replay, Waveform};
pub use error::{EffectError, Result};
pub use meter::ClippingMeter;
pub use store::{EffectPhase, EffectStore, MAX_EFFECTS};
pub use trig::fixp_sin16;

/// Full-scale signed force magnitude in device units.
pub const FULL_SCALE: i32 = 0x7fff;
