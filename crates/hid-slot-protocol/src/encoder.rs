//! Per-slot command synthesis with redundant-write suppression.

use crate::ids::{opcodes, slot_ids, type_bytes};
use crate::scale::{scale_coeff, scale_u16, translate_force};

/// Wire size of a slot command.
pub const SLOT_COMMAND_LEN: usize = 7;

/// The category of force a physical slot renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Direct force (constant/ramp/periodic sum).
    Direct,
    /// Spring condition.
    Spring,
    /// Damper condition.
    Damper,
    /// Friction condition.
    Friction,
}

impl SlotKind {
    /// The fixed slot id this kind renders on.
    pub fn slot_id(self) -> u8 {
        match self {
            Self::Direct => slot_ids::DIRECT,
            Self::Spring => slot_ids::SPRING,
            Self::Damper => slot_ids::DAMPER,
            Self::Friction => slot_ids::FRICTION,
        }
    }

    fn type_byte(self) -> u8 {
        match self {
            Self::Direct => type_bytes::DIRECT,
            Self::Spring => type_bytes::SPRING,
            Self::Damper => type_bytes::DAMPER,
            Self::Friction => type_bytes::FRICTION,
        }
    }
}

/// Aggregated parameters for one slot, in device units.
///
/// Only `level` is meaningful for the direct slot; only the remaining
/// fields are meaningful for condition slots (`d1`/`d2` for spring only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotParameters {
    /// Signed direct force level.
    pub level: i32,
    /// Lower deadband bound (spring).
    pub d1: i32,
    /// Upper deadband bound (spring).
    pub d2: i32,
    /// Left (negative-side) coefficient.
    pub k1: i32,
    /// Right (positive-side) coefficient.
    pub k2: i32,
    /// Saturation ceiling; zero silences a condition slot.
    pub clip: u32,
}

impl SlotParameters {
    /// The identity element of parameter aggregation: zero force, an
    /// empty deadband (`d1 > d2`), zero coefficients and zero clip.
    pub const NEUTRAL: Self = Self {
        level: 0,
        d1: i32::MAX,
        d2: i32::MIN,
        k1: 0,
        k2: 0,
        clip: 0,
    };
}

impl Default for SlotParameters {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Stateful encoder for one physical slot.
///
/// Tracks the opcode cycle the firmware expects (start once, update
/// thereafter, stop on zero clip) and flags `dirty` only when the freshly
/// encoded bytes differ from the previously encoded ones. A start (0x1)
/// and an update (0xc) carrying the same payload are considered equal, so
/// the opcode cycle alone never triggers a retransmission.
#[derive(Debug, Clone)]
pub struct SlotEncoder {
    kind: SlotKind,
    id: u8,
    current: [u8; SLOT_COMMAND_LEN],
    op: u8,
    dirty: bool,
}

impl SlotEncoder {
    /// Create an encoder for the given slot kind at its fixed slot id.
    pub fn new(kind: SlotKind) -> Self {
        Self {
            kind,
            id: kind.slot_id(),
            current: [0u8; SLOT_COMMAND_LEN],
            op: 0,
            dirty: false,
        }
    }

    /// Build the full bank of four encoders in slot order.
    pub fn bank() -> [SlotEncoder; slot_ids::SLOT_COUNT] {
        [
            SlotEncoder::new(SlotKind::Direct),
            SlotEncoder::new(SlotKind::Spring),
            SlotEncoder::new(SlotKind::Damper),
            SlotEncoder::new(SlotKind::Friction),
        ]
    }

    /// The slot kind this encoder renders.
    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// The physical slot id.
    pub fn slot_id(&self) -> u8 {
        self.id
    }

    /// The most recently encoded command bytes.
    pub fn command(&self) -> &[u8; SLOT_COMMAND_LEN] {
        &self.current
    }

    /// Whether the last `encode` produced bytes differing from the
    /// previous command.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Acknowledge that the current command has been transmitted.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Reset to the detached state (no command encoded, opcode cycle
    /// restarted). Used when a device is re-attached.
    pub fn reset(&mut self) {
        self.current = [0u8; SLOT_COMMAND_LEN];
        self.op = 0;
        self.dirty = false;
    }

    /// Encode `parameters` into this slot's command, advancing the opcode
    /// cycle and updating the dirty flag.
    pub fn encode(&mut self, parameters: &SlotParameters) {
        let mut previous = self.current;
        // A start and an update with identical payloads are the same
        // command as far as the firmware's state is concerned.
        if previous[0] & 0x0f == opcodes::START {
            previous[0] = (previous[0] & 0xf0) | opcodes::UPDATE;
        }

        if self.kind == SlotKind::Direct {
            self.op = if self.op == 0 {
                opcodes::START
            } else {
                opcodes::UPDATE
            };
        } else if parameters.clip == 0 {
            self.op = opcodes::STOP;
        } else if self.op == opcodes::STOP {
            self.op = opcodes::START;
        } else {
            self.op = opcodes::UPDATE;
        }

        self.current = [0u8; SLOT_COMMAND_LEN];
        self.current[0] = (0x10 << self.id) | self.op;

        if self.op != opcodes::STOP {
            self.current[1] = self.kind.type_byte();
            match self.kind {
                SlotKind::Direct => {
                    self.current[2 + self.id as usize] = translate_force(parameters.level);
                }
                SlotKind::Spring => {
                    let d1 = scale_u16(i64::from(parameters.d1) + 0x8000, 11);
                    let d2 = scale_u16(i64::from(parameters.d2) + 0x8000, 11);
                    let s1 = u8::from(parameters.k1 < 0);
                    let s2 = u8::from(parameters.k2 < 0);
                    self.current[2] = (d1 >> 3) as u8;
                    self.current[3] = (d2 >> 3) as u8;
                    self.current[4] =
                        (scale_coeff(parameters.k2, 4) << 4) | scale_coeff(parameters.k1, 4);
                    self.current[5] = (((d2 & 7) << 5) as u8)
                        | (((d1 & 7) << 1) as u8)
                        | (s2 << 4)
                        | s1;
                    self.current[6] = scale_u16(i64::from(parameters.clip), 8) as u8;
                }
                SlotKind::Damper => {
                    self.current[2] = scale_coeff(parameters.k1, 4);
                    self.current[3] = u8::from(parameters.k1 < 0);
                    self.current[4] = scale_coeff(parameters.k2, 4);
                    self.current[5] = u8::from(parameters.k2 < 0);
                    self.current[6] = scale_u16(i64::from(parameters.clip), 8) as u8;
                }
                SlotKind::Friction => {
                    let s1 = u8::from(parameters.k1 < 0);
                    let s2 = u8::from(parameters.k2 < 0);
                    self.current[2] = scale_coeff(parameters.k1, 8);
                    self.current[3] = scale_coeff(parameters.k2, 8);
                    self.current[4] = scale_u16(i64::from(parameters.clip), 8) as u8;
                    self.current[5] = (s2 << 4) | s1;
                }
            }
        }

        if self.current != previous {
            self.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spring_params(clip: u32) -> SlotParameters {
        SlotParameters {
            level: 0,
            d1: -1000,
            d2: 1000,
            k1: 8000,
            k2: 8000,
            clip,
        }
    }

    #[test]
    fn test_direct_level_byte_position() {
        let mut enc = SlotEncoder::new(SlotKind::Direct);
        enc.encode(&SlotParameters {
            level: 16000,
            ..SlotParameters::NEUTRAL
        });
        let cmd = enc.command();
        assert_eq!(cmd[0], 0x11, "direct slot, start opcode");
        assert_eq!(cmd[1], 0x00);
        assert_eq!(cmd[2], 0xbe, "TRANSLATE_FORCE(16000)");
        assert_eq!(&cmd[3..], &[0u8; 4]);
    }

    #[test]
    fn test_direct_opcode_cycle() {
        let mut enc = SlotEncoder::new(SlotKind::Direct);
        enc.encode(&SlotParameters::NEUTRAL);
        assert_eq!(enc.command()[0] & 0x0f, opcodes::START);
        enc.encode(&SlotParameters::NEUTRAL);
        assert_eq!(enc.command()[0] & 0x0f, opcodes::UPDATE);
        enc.encode(&SlotParameters::NEUTRAL);
        assert_eq!(enc.command()[0] & 0x0f, opcodes::UPDATE);
    }

    #[test]
    fn test_condition_zero_clip_stops() {
        let mut enc = SlotEncoder::new(SlotKind::Spring);
        enc.encode(&spring_params(0));
        let cmd = enc.command();
        assert_eq!(cmd[0], 0x20 | opcodes::STOP);
        assert_eq!(&cmd[1..], &[0u8; 6], "stop payload must be all zero");
    }

    #[test]
    fn test_condition_start_after_stop() {
        let mut enc = SlotEncoder::new(SlotKind::Spring);
        enc.encode(&spring_params(0));
        enc.encode(&spring_params(10000));
        assert_eq!(enc.command()[0] & 0x0f, opcodes::START);
        enc.encode(&spring_params(10000));
        assert_eq!(enc.command()[0] & 0x0f, opcodes::UPDATE);
    }

    #[test]
    fn test_dirty_only_on_payload_change() {
        let mut enc = SlotEncoder::new(SlotKind::Spring);
        enc.encode(&spring_params(0));
        assert!(enc.is_dirty(), "first stop command must transmit");
        enc.clear_dirty();

        enc.encode(&spring_params(10000));
        assert!(enc.is_dirty(), "start after stop must transmit");
        enc.clear_dirty();

        // Same payload again: opcode moves from start to update but the
        // canonicalized bytes are identical.
        enc.encode(&spring_params(10000));
        assert!(!enc.is_dirty(), "unchanged parameters must not retransmit");

        enc.encode(&spring_params(12000));
        assert!(enc.is_dirty(), "clip change must transmit");
    }

    #[test]
    fn test_spring_encoding_layout() {
        let mut enc = SlotEncoder::new(SlotKind::Spring);
        enc.encode(&SlotParameters {
            level: 0,
            d1: 0,
            d2: 0,
            k1: 0x4000,
            k2: -0x4000,
            clip: 0xffff,
        });
        let cmd = enc.command();
        assert_eq!(cmd[1], 0x0b);
        // Center deadband: (0 + 0x8000) >> 5 = 0x400; high 8 bits = 0x80.
        assert_eq!(cmd[2], 0x80);
        assert_eq!(cmd[3], 0x80);
        // |0x4000| * 2 = 0x8000 -> 4-bit coefficient 8 for both sides.
        assert_eq!(cmd[4], 0x88);
        // Low deadband bits zero; k2 negative sets sign bit 4.
        assert_eq!(cmd[5], 0x10);
        assert_eq!(cmd[6], 0xff);
    }

    #[test]
    fn test_damper_encoding_layout() {
        let mut enc = SlotEncoder::new(SlotKind::Damper);
        enc.encode(&SlotParameters {
            level: 0,
            d1: 0,
            d2: 0,
            k1: -0x2000,
            k2: 0x2000,
            clip: 0x8000,
        });
        let cmd = enc.command();
        assert_eq!(cmd[0], 0x40 | opcodes::UPDATE);
        assert_eq!(cmd[1], 0x0c);
        assert_eq!(cmd[2], 4, "4-bit |k1| * 2");
        assert_eq!(cmd[3], 1, "k1 sign byte");
        assert_eq!(cmd[4], 4);
        assert_eq!(cmd[5], 0);
        assert_eq!(cmd[6], 0x80);
    }

    #[test]
    fn test_friction_encoding_layout() {
        let mut enc = SlotEncoder::new(SlotKind::Friction);
        enc.encode(&SlotParameters {
            level: 0,
            d1: 0,
            d2: 0,
            k1: -0x1000,
            k2: 0x1000,
            clip: 0x4000,
        });
        let cmd = enc.command();
        assert_eq!(cmd[0], 0x80 | opcodes::UPDATE);
        assert_eq!(cmd[1], 0x0e);
        assert_eq!(cmd[2], 0x20, "8-bit |k1| * 2");
        assert_eq!(cmd[3], 0x20);
        assert_eq!(cmd[4], 0x40);
        assert_eq!(cmd[5], 0x01, "k1 sign in low nibble");
        assert_eq!(cmd[6], 0);
    }

    #[test]
    fn test_bank_slot_ids() {
        let bank = SlotEncoder::bank();
        for (i, enc) in bank.iter().enumerate() {
            assert_eq!(usize::from(enc.slot_id()), i);
        }
    }

    #[test]
    fn test_reset_restarts_cycle() {
        let mut enc = SlotEncoder::new(SlotKind::Direct);
        enc.encode(&SlotParameters::NEUTRAL);
        enc.encode(&SlotParameters::NEUTRAL);
        enc.reset();
        enc.encode(&SlotParameters::NEUTRAL);
        assert_eq!(enc.command()[0] & 0x0f, opcodes::START);
    }
}
