#![cfg_attr(not(test), no_std)]

//! Classic Logitech 4-slot FFB command protocol: scaling primitives and
//! per-slot command encoding.
//!
//! This crate is intentionally I/O-free and allocation-free on hot paths.
//! It provides pure functions and types that can be tested without hardware.
//!
//! # Protocol notes
//!
//! The wheel firmware exposes **4 force slots**, each driven by a 7-byte
//! command:
//!
//! ```text
//! Byte 0: (0x10 << slot_id) | opcode
//!   Slot IDs: 0 = direct force, 1 = spring, 2 = damper, 3 = friction
//!   Opcodes: 0x1 = start/keep-alive, 0xc = update/refresh, 0x3 = stop
//! Bytes 1–6: slot-specific data
//! ```
//!
//! | Slot     | Byte 1 | Encoding summary |
//! |----------|--------|------------------|
//! | Direct   | `0x00` | Force in byte `2 + slot_id` (unsigned 8-bit, 0x80 = center) |
//! | Spring   | `0x0b` | 11-bit deadband positions, 4-bit coefficients, sign bits, 8-bit clip |
//! | Damper   | `0x0c` | 4-bit coefficients, sign bytes, 8-bit clip |
//! | Friction | `0x0e` | 8-bit coefficients, 8-bit clip, sign nibble |
//!
//! The firmware expects a start command (opcode 0x1) when a slot comes
//! alive and update commands (opcode 0xc) for subsequent parameter changes;
//! a zero-clip condition slot is silenced with the stop opcode (0x3) and an
//! all-zero payload. [`SlotEncoder`] reproduces this cycling exactly and
//! suppresses redundant transmissions by comparing the freshly encoded
//! bytes against the previously produced ones.

pub mod encoder;
pub mod ids;
pub mod scale;

pub use encoder::{SlotEncoder, SlotKind, SlotParameters, SLOT_COMMAND_LEN};
pub use ids::{opcodes, slot_ids};
pub use scale::{saturate_s16, saturate_u16, scale_coeff, scale_u16, translate_force};

/// Build the 8-byte loop-mode select command sent once at device attach.
///
/// `fixed_loop` selects the firmware's fixed loop mode; fast loop otherwise.
pub fn build_loop_mode_command(fixed_loop: bool) -> [u8; 8] {
    let mut cmd = [0u8; 8];
    cmd[0] = 0x0d;
    cmd[1] = u8::from(fixed_loop);
    cmd
}

/// Build the global stop-all-forces command.
pub fn build_stop_all_command() -> [u8; 7] {
    let mut cmd = [0u8; 7];
    cmd[0] = 0xf3;
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_mode_command() {
        assert_eq!(
            build_loop_mode_command(true),
            [0x0d, 0x01, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            build_loop_mode_command(false),
            [0x0d, 0x00, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_stop_all_command() {
        let cmd = build_stop_all_command();
        assert_eq!(cmd[0], 0xf3);
        assert_eq!(&cmd[1..], &[0u8; 6]);
    }
}
