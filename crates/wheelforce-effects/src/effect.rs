//! Effect definitions uploaded by callers.

use serde::{Deserialize, Serialize};

use crate::error::{EffectError, Result};

/// Attack/fade shaping applied to an effect's magnitude over its lifetime.
///
/// A zero-length attack or fade disables that edge of the envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Attack ramp duration in milliseconds.
    pub attack_length_ms: u32,
    /// Magnitude at the start of the attack ramp.
    pub attack_level: u16,
    /// Fade ramp duration in milliseconds, ending at the replay length.
    pub fade_length_ms: u32,
    /// Magnitude at the end of the fade ramp.
    pub fade_level: u16,
}

/// Replay timing: how long to wait and how long to play.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Delay from the play request to the first contribution.
    pub delay_ms: u32,
    /// Playback duration; zero means unbounded.
    pub length_ms: u32,
}

/// Periodic effect waveform shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    /// Fixed-point sine.
    Sine,
    /// +magnitude for the first half period, -magnitude for the second.
    Square,
    /// Zero at 0°/360°, extrema at 90°/270°.
    Triangle,
    /// Linear rise from -magnitude to +magnitude over one period.
    SawUp,
    /// Linear fall from +magnitude to -magnitude over one period.
    SawDown,
}

/// Parameters shared by the spring/damper/friction condition effects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionParams {
    /// Deadband center position (spring only).
    pub center: i16,
    /// Deadband width around the center (spring only).
    pub deadband: u16,
    /// Coefficient applied left of center.
    pub left_coeff: i16,
    /// Coefficient applied right of center.
    pub right_coeff: i16,
    /// Force ceiling left of center.
    pub left_saturation: u16,
    /// Force ceiling right of center.
    pub right_saturation: u16,
}

/// Category-specific parameters of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// A fixed signed force level.
    Constant {
        /// Signed force level.
        level: i16,
        /// Magnitude envelope.
        envelope: Envelope,
    },
    /// A force sweeping linearly between two levels over the replay length.
    Ramp {
        /// Level at the end of the attack ramp.
        start_level: i16,
        /// Level at the start of the fade ramp.
        end_level: i16,
        /// Magnitude envelope.
        envelope: Envelope,
    },
    /// A repeating waveform.
    Periodic {
        /// Waveform shape.
        waveform: Waveform,
        /// Waveform period in milliseconds; must be non-zero.
        period_ms: u32,
        /// Initial position within the period, in milliseconds.
        phase_ms: u32,
        /// Peak waveform magnitude.
        magnitude: i16,
        /// Constant offset added to the waveform.
        offset: i16,
        /// Magnitude envelope.
        envelope: Envelope,
    },
    /// Position-proportional centering force.
    Spring(ConditionParams),
    /// Velocity-proportional resistance.
    Damper(ConditionParams),
    /// Motion-opposing resistance.
    Friction(ConditionParams),
}

/// The category of an effect, deciding which physical slot it renders on.
///
/// Constant, ramp and periodic effects all sum onto the direct force slot;
/// each condition category owns its own slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectCategory {
    Constant,
    Ramp,
    Periodic,
    Spring,
    Damper,
    Friction,
}

/// A caller-supplied force profile; immutable until redefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDef {
    /// Direction angle in fixed-point turns (0x10000 = one full turn).
    pub direction: u16,
    /// Replay timing.
    pub replay: Replay,
    /// Category-specific parameters.
    pub kind: EffectKind,
}

impl EffectDef {
    /// The effect's category.
    pub fn category(&self) -> EffectCategory {
        match self.kind {
            EffectKind::Constant { .. } => EffectCategory::Constant,
            EffectKind::Ramp { .. } => EffectCategory::Ramp,
            EffectKind::Periodic { .. } => EffectCategory::Periodic,
            EffectKind::Spring(_) => EffectCategory::Spring,
            EffectKind::Damper(_) => EffectCategory::Damper,
            EffectKind::Friction(_) => EffectCategory::Friction,
        }
    }

    /// The magnitude envelope, for the effect kinds that carry one.
    pub fn envelope(&self) -> Option<&Envelope> {
        match &self.kind {
            EffectKind::Constant { envelope, .. }
            | EffectKind::Ramp { envelope, .. }
            | EffectKind::Periodic { envelope, .. } => Some(envelope),
            _ => None,
        }
    }

    /// Reject definitions the device cannot render.
    pub fn validate(&self) -> Result<()> {
        if let EffectKind::Periodic { period_ms: 0, .. } = self.kind {
            return Err(EffectError::InvalidParameter("periodic period must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        let def = EffectDef {
            direction: 0,
            replay: Replay::default(),
            kind: EffectKind::Spring(ConditionParams::default()),
        };
        assert_eq!(def.category(), EffectCategory::Spring);
        assert!(def.envelope().is_none());
    }

    #[test]
    fn test_zero_period_rejected() {
        let def = EffectDef {
            direction: 0,
            replay: Replay::default(),
            kind: EffectKind::Periodic {
                waveform: Waveform::Sine,
                period_ms: 0,
                phase_ms: 0,
                magnitude: 1000,
                offset: 0,
                envelope: Envelope::default(),
            },
        };
        assert_eq!(
            def.validate(),
            Err(EffectError::InvalidParameter("periodic period must be non-zero"))
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let def = EffectDef {
            direction: 0x4000,
            replay: Replay {
                delay_ms: 100,
                length_ms: 2000,
            },
            kind: EffectKind::Periodic {
                waveform: Waveform::Triangle,
                period_ms: 50,
                phase_ms: 10,
                magnitude: 20000,
                offset: -100,
                envelope: Envelope {
                    attack_length_ms: 200,
                    attack_level: 0,
                    fade_length_ms: 300,
                    fade_level: 0,
                },
            },
        };
        let json = serde_json::to_string(&def).unwrap();
        let back: EffectDef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, def);
    }
}
