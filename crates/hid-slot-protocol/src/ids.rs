//! Slot identifiers and command opcodes.

/// Physical force slot identifiers.
pub mod slot_ids {
    /// Direct force slot. Constant, ramp and periodic effects sum here.
    pub const DIRECT: u8 = 0;
    /// Spring condition slot.
    pub const SPRING: u8 = 1;
    /// Damper condition slot.
    pub const DAMPER: u8 = 2;
    /// Friction condition slot.
    pub const FRICTION: u8 = 3;
    /// Number of physical slots.
    pub const SLOT_COUNT: usize = 4;
}

/// Opcodes carried in the low nibble of command byte 0.
pub mod opcodes {
    /// Start a slot / keep it alive.
    pub const START: u8 = 0x1;
    /// Stop a slot; the remaining six bytes must be zero.
    pub const STOP: u8 = 0x3;
    /// Update a running slot's parameters.
    pub const UPDATE: u8 = 0xc;
}

/// Effect type bytes carried in command byte 1.
pub mod type_bytes {
    /// Direct force payload.
    pub const DIRECT: u8 = 0x00;
    /// Spring condition payload.
    pub const SPRING: u8 = 0x0b;
    /// Damper condition payload.
    pub const DAMPER: u8 = 0x0c;
    /// Friction condition payload.
    pub const FRICTION: u8 = 0x0e;
}
