//! Device-family capability descriptor.

use serde::{Deserialize, Serialize};

/// What a device family can render, decided once at attach time.
///
/// Slots a family lacks are held in their stopped state; effects of that
/// category are accepted but render as silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCaps {
    /// Signed full-scale force magnitude in device units.
    pub full_scale: i32,
    /// Spring condition slot present.
    pub has_spring: bool,
    /// Damper condition slot present.
    pub has_damper: bool,
    /// Friction condition slot present.
    pub has_friction: bool,
}

impl Default for DeviceCaps {
    fn default() -> Self {
        Self {
            full_scale: 0x7fff,
            has_spring: true,
            has_damper: true,
            has_friction: true,
        }
    }
}
