//! Fixed-capacity effect arena and the per-effect timing state machine.
//!
//! The store owns up to [`MAX_EFFECTS`] uploaded effects, addressed by a
//! reused index handle. A single caller (the render tick) drives every slot
//! through its timing phases and folds the playing ones into the four
//! physical channel parameter sets. All timestamps are monotonic
//! milliseconds supplied by the caller, which keeps the machine fully
//! deterministic under test.

use wheelforce_hid_slot_protocol::slot_ids::{self, SLOT_COUNT};
use wheelforce_hid_slot_protocol::SlotParameters;

use crate::effect::{EffectDef, EffectKind};
use crate::error::{EffectError, Result};
use crate::eval;
use crate::trig::direction_gain;

/// Number of concurrently uploadable effects.
pub const MAX_EFFECTS: usize = 16;

/// Timing phase of one uploaded effect.
///
/// `Armed` and later phases count as started: the effect keeps the pacer
/// alive. Only `Playing` contributes force.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectPhase {
    /// Uploaded but not started. Never contributes.
    Idle,
    /// Started by a play request; timing not yet resolved.
    Armed,
    /// Timing resolved; waiting for `play_at`, or paused between repeats.
    Scheduled,
    /// Actively contributing to its channel.
    Playing,
}

/// A redefinition uploaded while the effect was started, absorbed at the
/// next tick boundary.
#[derive(Debug, Clone, Copy)]
struct PendingUpdate {
    def: EffectDef,
    at: u64,
}

#[derive(Debug, Clone, Copy)]
struct EffectSlot {
    def: EffectDef,
    phase: EffectPhase,
    remaining: u32,
    start_at: u64,
    play_at: u64,
    stop_at: Option<u64>,
    /// Anchor for periodic phase accounting; moves on redefinition.
    updated_at: u64,
    phase_deg: u32,
    phase_adjust: u32,
    direction_gain: i32,
    slope: i64,
    pending: Option<PendingUpdate>,
}

impl EffectSlot {
    fn new(def: EffectDef) -> Self {
        Self {
            def,
            phase: EffectPhase::Idle,
            remaining: 0,
            start_at: 0,
            play_at: 0,
            stop_at: None,
            updated_at: 0,
            phase_deg: 0,
            phase_adjust: 0,
            direction_gain: 0,
            slope: 0,
            pending: None,
        }
    }

    fn replay_length(&self) -> u32 {
        self.def.replay.length_ms
    }

    /// Derive the per-arming constants from the current definition,
    /// anchored at `anchor` (the start of delay accounting).
    fn resolve_timing(&mut self, anchor: u64) {
        self.play_at = anchor + u64::from(self.def.replay.delay_ms);
        self.stop_at = if self.replay_length() > 0 {
            Some(self.play_at + u64::from(self.replay_length()))
        } else {
            None
        };
        self.updated_at = self.play_at;
        self.direction_gain = direction_gain(self.def.direction);
        match self.def.kind {
            EffectKind::Ramp {
                start_level,
                end_level,
                envelope,
            } => {
                self.slope =
                    eval::ramp_slope(start_level, end_level, &envelope, self.replay_length());
            }
            EffectKind::Periodic {
                period_ms, phase_ms, ..
            } => {
                // Phase offsets beyond one period are legal; only the
                // residue matters.
                self.phase_adjust =
                    ((u64::from(phase_ms) * 360 / u64::from(period_ms)) % 360) as u32;
            }
            _ => {}
        }
        self.phase = EffectPhase::Scheduled;
    }

    /// Absorb a pending redefinition. A byte-identical redefinition is
    /// dropped without touching the timing, so repeat counting stays in
    /// sync. Otherwise timing re-anchors at the upload timestamp and a
    /// periodic effect carries its last phase forward.
    fn absorb_update(&mut self) {
        let Some(update) = self.pending.take() else {
            return;
        };
        if update.def == self.def {
            return;
        }
        self.def = update.def;
        self.play_at = update.at + u64::from(self.def.replay.delay_ms);
        self.stop_at = if self.replay_length() > 0 {
            Some(self.play_at + u64::from(self.replay_length()))
        } else {
            None
        };
        self.updated_at = update.at;
        self.direction_gain = direction_gain(self.def.direction);
        match self.def.kind {
            EffectKind::Ramp {
                start_level,
                end_level,
                envelope,
            } => {
                self.slope =
                    eval::ramp_slope(start_level, end_level, &envelope, self.replay_length());
            }
            EffectKind::Periodic { .. } => {
                self.phase_adjust = self.phase_deg;
            }
            _ => {}
        }
        self.phase = EffectPhase::Scheduled;
    }

    fn is_playing_at(&self, now_ms: u64) -> bool {
        now_ms >= self.play_at && self.stop_at.map_or(true, |stop_at| now_ms < stop_at)
    }

    /// Fold this slot's instantaneous contribution into the channel
    /// parameter banks. Must only be called while `Playing`.
    fn contribute(&self, now_ms: u64, channels: &mut [SlotParameters; SLOT_COUNT]) {
        let time_playing = now_ms - self.play_at;
        let length_ms = self.replay_length();
        match self.def.kind {
            EffectKind::Constant { level, envelope } => {
                let out = eval::constant_level(
                    level,
                    &envelope,
                    time_playing,
                    length_ms,
                    self.direction_gain,
                );
                let direct = &mut channels[slot_ids::DIRECT as usize];
                direct.level = direct.level.saturating_add(out);
            }
            EffectKind::Ramp {
                start_level,
                end_level,
                envelope,
            } => {
                let out = eval::ramp_level(
                    start_level,
                    end_level,
                    &envelope,
                    time_playing,
                    length_ms,
                    self.slope,
                    self.direction_gain,
                );
                let direct = &mut channels[slot_ids::DIRECT as usize];
                direct.level = direct.level.saturating_add(out);
            }
            EffectKind::Periodic {
                waveform,
                magnitude,
                offset,
                envelope,
                ..
            } => {
                let out = eval::periodic_level(
                    waveform,
                    magnitude,
                    offset,
                    &envelope,
                    time_playing,
                    length_ms,
                    self.phase_deg,
                    self.direction_gain,
                );
                let direct = &mut channels[slot_ids::DIRECT as usize];
                direct.level = direct.level.saturating_add(out);
            }
            EffectKind::Spring(condition) => {
                eval::fold_spring(&condition, &mut channels[slot_ids::SPRING as usize]);
            }
            EffectKind::Damper(condition) => {
                eval::fold_resistance(&condition, &mut channels[slot_ids::DAMPER as usize]);
            }
            EffectKind::Friction(condition) => {
                eval::fold_resistance(&condition, &mut channels[slot_ids::FRICTION as usize]);
            }
        }
    }
}

/// Arena of uploaded effects with a free-list of reusable handles.
#[derive(Debug)]
pub struct EffectStore {
    slots: [Option<EffectSlot>; MAX_EFFECTS],
    free: Vec<usize>,
}

impl Default for EffectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectStore {
    pub fn new() -> Self {
        Self {
            slots: [None; MAX_EFFECTS],
            free: (0..MAX_EFFECTS).rev().collect(),
        }
    }

    fn slot_mut(&mut self, id: usize) -> Result<&mut EffectSlot> {
        self.slots
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(EffectError::InvalidParameter("unknown effect handle"))
    }

    /// Upload a new effect, returning its handle.
    pub fn insert(&mut self, def: EffectDef) -> Result<usize> {
        def.validate()?;
        let id = self.free.pop().ok_or(EffectError::ResourceExhausted)?;
        self.slots[id] = Some(EffectSlot::new(def));
        Ok(id)
    }

    /// Redefine an uploaded effect.
    ///
    /// A started effect absorbs the new definition at the next tick
    /// boundary and must keep its category; an idle one is replaced
    /// immediately.
    pub fn upload(&mut self, id: usize, def: EffectDef, now_ms: u64) -> Result<()> {
        def.validate()?;
        let slot = self.slot_mut(id)?;
        if slot.phase == EffectPhase::Idle {
            slot.def = def;
            slot.pending = None;
        } else {
            if def.category() != slot.def.category() {
                return Err(EffectError::InvalidParameter(
                    "cannot change the category of a started effect",
                ));
            }
            slot.pending = Some(PendingUpdate { def, at: now_ms });
        }
        Ok(())
    }

    /// Start (`count > 0`) or stop (`count == 0`) an uploaded effect.
    ///
    /// Returns `true` when the effect was started, which is the signal to
    /// wake the pacer.
    pub fn play(&mut self, id: usize, count: u32, now_ms: u64) -> Result<bool> {
        let slot = self.slot_mut(id)?;
        if count > 0 {
            // A pending redefinition takes effect now; arming recomputes
            // the timing from scratch anyway.
            if let Some(update) = slot.pending.take() {
                slot.def = update.def;
            }
            slot.phase = EffectPhase::Armed;
            slot.start_at = now_ms;
            slot.remaining = count;
            Ok(true)
        } else {
            slot.phase = EffectPhase::Idle;
            slot.pending = None;
            Ok(false)
        }
    }

    /// Remove an effect and recycle its handle.
    pub fn erase(&mut self, id: usize) -> Result<()> {
        if self.slots.get(id).and_then(Option::as_ref).is_none() {
            return Err(EffectError::InvalidParameter("unknown effect handle"));
        }
        self.slots[id] = None;
        self.free.push(id);
        Ok(())
    }

    /// Stop every started effect without removing any.
    pub fn stop_all(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.phase = EffectPhase::Idle;
            slot.pending = None;
        }
    }

    /// Number of started effects; the pacer runs while this is non-zero.
    pub fn active_effects(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| slot.phase != EffectPhase::Idle)
            .count()
    }

    /// Timing phase of an uploaded effect, for diagnostics and tests.
    pub fn phase(&self, id: usize) -> Option<EffectPhase> {
        self.slots.get(id)?.as_ref().map(|slot| slot.phase)
    }

    /// Resolved play timestamp of an uploaded effect, for diagnostics.
    pub fn play_at(&self, id: usize) -> Option<u64> {
        self.slots.get(id)?.as_ref().map(|slot| slot.play_at)
    }

    /// Advance every effect to `now_ms` and fold the playing ones into the
    /// four channel parameter banks. Returns the number of effects still
    /// started afterwards.
    pub fn render(
        &mut self,
        now_ms: u64,
        channels: &mut [SlotParameters; SLOT_COUNT],
    ) -> usize {
        *channels = [SlotParameters::NEUTRAL; SLOT_COUNT];
        let mut started = 0_usize;

        for slot in self.slots.iter_mut().flatten() {
            if slot.phase == EffectPhase::Idle {
                continue;
            }

            // Bounded replay expiry: burn one repeat, then either retire
            // the effect or re-arm it back-to-back.
            if matches!(slot.phase, EffectPhase::Scheduled | EffectPhase::Playing) {
                if let Some(stop_at) = slot.stop_at {
                    if now_ms >= stop_at {
                        slot.remaining = slot.remaining.saturating_sub(1);
                        if slot.remaining == 0 {
                            slot.phase = EffectPhase::Idle;
                            slot.pending = None;
                            continue;
                        }
                        slot.start_at = stop_at;
                        slot.phase = EffectPhase::Armed;
                    }
                }
            }

            if slot.phase == EffectPhase::Armed {
                let anchor = slot.start_at;
                slot.resolve_timing(anchor);
            }

            slot.absorb_update();

            started += 1;

            if !slot.is_playing_at(now_ms) {
                if slot.phase == EffectPhase::Playing {
                    slot.phase = EffectPhase::Scheduled;
                }
                continue;
            }
            slot.phase = EffectPhase::Playing;

            if let EffectKind::Periodic { period_ms, .. } = slot.def.kind {
                let elapsed = now_ms - slot.updated_at;
                slot.phase_deg = ((elapsed % u64::from(period_ms)) * 360
                    / u64::from(period_ms)) as u32;
                slot.phase_deg = (slot.phase_deg + slot.phase_adjust) % 360;
            }

            slot.contribute(now_ms, channels);
        }

        started
    }
}
