//! Tunable rendering parameters.

use serde::{Deserialize, Serialize};

/// How the pacer reacts when the outbound command queue is still busy at
/// tick time. Rendering is skipped for that tick in every mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackpressurePolicy {
    /// Keep the configured period and try again next tick.
    Fixed,
    /// Double the configured period permanently; warns the first time.
    Static,
    /// Delay one extra period without changing the configured one.
    #[default]
    Dynamic,
}

/// Rendering parameters, applied atomically at a tick boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Pacer period in milliseconds.
    pub tick_period_ms: u64,
    /// Global output gain, 0..=0xffff.
    pub master_gain: u16,
    /// Caller-requested gain, 0..=0xffff, multiplied into the master gain.
    pub gain: u16,
    /// Spring clip ceiling in percent of the requested saturation.
    pub spring_level: u8,
    /// Damper clip ceiling in percent.
    pub damper_level: u8,
    /// Friction clip ceiling in percent.
    pub friction_level: u8,
    /// Select the firmware's fixed loop mode at attach.
    pub fixed_loop: bool,
    /// Queue backpressure reaction.
    pub backpressure: BackpressurePolicy,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            tick_period_ms: 2,
            master_gain: 0xffff,
            gain: 0xffff,
            spring_level: 30,
            damper_level: 30,
            friction_level: 30,
            fixed_loop: false,
            backpressure: BackpressurePolicy::default(),
        }
    }
}
