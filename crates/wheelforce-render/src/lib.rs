//! Force feedback rendering engine.
//!
//! Ties the effect store and the slot command encoders to a real device:
//! a demand-driven pacer advances all started effects on a fixed cadence
//! (2 ms by default), stages the gain chain, meters clipping, and sends at
//! most one command per dirty slot per tick through a [`SlotTransport`].
//! The pacer runs only while at least one effect is started and winds down
//! one tick after the last one goes idle.

pub mod caps;
pub mod error;
pub mod renderer;
pub mod settings;
pub mod transport;

pub use caps::DeviceCaps;
pub use error::{RenderError, Result};
pub use renderer::{FfbRenderer, TickOutcome};
pub use settings::{BackpressurePolicy, RenderSettings};
pub use transport::{SlotTransport, TransportError};
