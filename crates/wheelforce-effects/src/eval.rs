//! Pure fixed-point evaluation of one effect's instantaneous contribution.
//!
//! Every function here takes the elapsed playing time explicitly and is a
//! pure function of its arguments. All arithmetic is widened to `i64`
//! internally and saturates on the way out.

use wheelforce_hid_slot_protocol::SlotParameters;

use crate::effect::{ConditionParams, Envelope, Waveform};
use crate::trig::fixp_sin16;
use crate::FULL_SCALE;

fn sign_of(level: i32) -> i64 {
    if level < 0 { -1 } else { 1 }
}

fn attack_value(base: i32, envelope: &Envelope, time_playing: u64) -> i64 {
    let sign = sign_of(base);
    let anchor = sign * i64::from(envelope.attack_level);
    let d = i64::from(base) - anchor;
    anchor + d * time_playing as i64 / i64::from(envelope.attack_length_ms)
}

fn fade_value(base: i32, envelope: &Envelope, time_playing: u64, length_ms: u32) -> i64 {
    let sign = sign_of(base);
    let t = time_playing as i64 - (i64::from(length_ms) - i64::from(envelope.fade_length_ms));
    let d = i64::from(base) - sign * i64::from(envelope.fade_level);
    i64::from(base) - d * t / i64::from(envelope.fade_length_ms)
}

/// Shape a base magnitude through the attack/fade envelope.
///
/// The attack window covers `[0, attack_length)`; the fade window covers the
/// last `fade_length` milliseconds of a bounded replay. Outside both windows
/// the base magnitude passes through unchanged, as it always does for an
/// unbounded replay's fade.
pub fn apply_envelope(base: i32, envelope: &Envelope, time_playing: u64, length_ms: u32) -> i64 {
    if time_playing < u64::from(envelope.attack_length_ms) {
        attack_value(base, envelope, time_playing)
    } else if length_ms > 0 && envelope.fade_length_ms > 0 {
        let t = time_playing as i64 - (i64::from(length_ms) - i64::from(envelope.fade_length_ms));
        if t > 0 {
            fade_value(base, envelope, time_playing, length_ms)
        } else {
            i64::from(base)
        }
    } else {
        i64::from(base)
    }
}

fn scale_output(level: i64, direction_gain: i32) -> i32 {
    let scaled = i64::from(direction_gain) * level / i64::from(FULL_SCALE);
    scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Instantaneous contribution of a constant-force effect.
pub fn constant_level(
    level: i16,
    envelope: &Envelope,
    time_playing: u64,
    length_ms: u32,
    direction_gain: i32,
) -> i32 {
    let shaped = apply_envelope(i32::from(level), envelope, time_playing, length_ms);
    scale_output(shaped, direction_gain)
}

/// Precompute a ramp's slope in 16.16 fixed point.
///
/// The slope covers the steady region between the attack and fade windows;
/// a degenerate region yields a flat ramp.
pub fn ramp_slope(start_level: i16, end_level: i16, envelope: &Envelope, length_ms: u32) -> i64 {
    if length_ms == 0 {
        return 0;
    }
    let steady =
        i64::from(length_ms) - i64::from(envelope.attack_length_ms) - i64::from(envelope.fade_length_ms);
    if steady <= 0 {
        return 0;
    }
    ((i64::from(end_level) - i64::from(start_level)) << 16) / steady
}

/// Instantaneous contribution of a ramp effect.
///
/// The attack window anchors at `start_level`, the fade window at
/// `end_level`, and the steady region interpolates with the precomputed
/// `slope`.
pub fn ramp_level(
    start_level: i16,
    end_level: i16,
    envelope: &Envelope,
    time_playing: u64,
    length_ms: u32,
    slope: i64,
    direction_gain: i32,
) -> i32 {
    let level = if time_playing < u64::from(envelope.attack_length_ms) {
        attack_value(i32::from(start_level), envelope, time_playing)
    } else if length_ms > 0
        && envelope.fade_length_ms > 0
        && time_playing as i64 >= i64::from(length_ms) - i64::from(envelope.fade_length_ms)
    {
        fade_value(i32::from(end_level), envelope, time_playing, length_ms)
    } else {
        let t = time_playing as i64 - i64::from(envelope.attack_length_ms);
        i64::from(start_level) + ((t * slope) >> 16)
    };
    scale_output(level, direction_gain)
}

/// Instantaneous contribution of a periodic effect at a given phase.
pub fn periodic_level(
    waveform: Waveform,
    magnitude: i16,
    offset: i16,
    envelope: &Envelope,
    time_playing: u64,
    length_ms: u32,
    phase_deg: u32,
    direction_gain: i32,
) -> i32 {
    let m = apply_envelope(i32::from(magnitude), envelope, time_playing, length_ms);
    let p = i64::from(phase_deg % 360);
    let wave = match waveform {
        Waveform::Sine => i64::from(fixp_sin16(p as i32)) * m / i64::from(FULL_SCALE),
        Waveform::Square => {
            if p < 180 {
                m
            } else {
                -m
            }
        }
        Waveform::Triangle => {
            let ps = (p + 270) % 360;
            (ps * m * 2 / 360 - m).abs() * 2 - m
        }
        Waveform::SawUp => p * m * 2 / 360 - m,
        Waveform::SawDown => m - p * m * 2 / 360,
    };
    scale_output(i64::from(offset) + wave, direction_gain)
}

/// Fold a spring effect's contribution into the slot parameter set:
/// widest deadband bounds, summed coefficients, highest clip.
pub fn fold_spring(condition: &ConditionParams, parameters: &mut SlotParameters) {
    let d1 = i32::from(condition.center) - i32::from(condition.deadband) / 2;
    let d2 = i32::from(condition.center) + i32::from(condition.deadband) / 2;
    parameters.d1 = parameters.d1.min(d1);
    parameters.d2 = parameters.d2.max(d2);
    fold_resistance(condition, parameters);
}

/// Fold a damper/friction effect's contribution: summed coefficients,
/// highest clip. No deadband.
pub fn fold_resistance(condition: &ConditionParams, parameters: &mut SlotParameters) {
    parameters.k1 = parameters.k1.saturating_add(i32::from(condition.left_coeff));
    parameters.k2 = parameters.k2.saturating_add(i32::from(condition.right_coeff));
    parameters.clip = parameters.clip.max(u32::from(
        condition.left_saturation.max(condition.right_saturation),
    ));
}
