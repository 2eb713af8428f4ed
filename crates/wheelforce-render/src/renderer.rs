//! The rendering engine: effect table, demand-driven pacer, gain staging
//! and command transmission.
//!
//! Two independent critical sections keep ticks and caller requests from
//! racing: the engine core (effect table, in-force settings, pacer state)
//! and the send path (slot encoders plus the transport). A tick never
//! holds both at once, and never blocks on the transport while the effect
//! table is locked.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use wheelforce_effects::meter::{combined_level, ClippingMeter};
use wheelforce_effects::{EffectDef, EffectStore};
use wheelforce_hid_slot_protocol::slot_ids::{self, SLOT_COUNT};
use wheelforce_hid_slot_protocol::{
    build_loop_mode_command, build_stop_all_command, SlotEncoder, SlotParameters,
};

use crate::caps::DeviceCaps;
use crate::error::{RenderError, Result};
use crate::settings::{BackpressurePolicy, RenderSettings};
use crate::transport::SlotTransport;

/// What one tick did, and whether the pacer should keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Rendered and sent; effects remain started.
    Continue,
    /// The outbound queue was busy; rendering was skipped.
    Backpressure,
    /// No effect remains started; the pacer goes idle.
    Stop,
}

struct EngineCore {
    store: EffectStore,
    settings: RenderSettings,
    attached: bool,
    pacer_running: bool,
    backpressure_warned: bool,
}

struct SendPath {
    encoders: [SlotEncoder; SLOT_COUNT],
    transport: Option<Box<dyn SlotTransport>>,
}

struct Shared {
    caps: DeviceCaps,
    core: Mutex<EngineCore>,
    send_path: Mutex<SendPath>,
    pending_settings: Mutex<Option<RenderSettings>>,
    meter: Mutex<ClippingMeter>,
    epoch: Instant,
}

impl Shared {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// One pacer tick at an explicit timestamp.
    fn tick(&self, now_ms: u64) -> Result<TickOutcome> {
        {
            let send_path = self.send_path.lock();
            let Some(transport) = send_path.transport.as_ref() else {
                self.core.lock().pacer_running = false;
                return Ok(TickOutcome::Stop);
            };
            if transport.queued() > 0 {
                return Ok(TickOutcome::Backpressure);
            }
        }

        let mut channels = [SlotParameters::NEUTRAL; SLOT_COUNT];
        let started = {
            let mut core = self.core.lock();
            if !core.attached {
                core.pacer_running = false;
                return Ok(TickOutcome::Stop);
            }
            if let Some(settings) = self.pending_settings.lock().take() {
                core.settings = settings;
            }
            let started = core.store.render(now_ms, &mut channels);
            self.apply_gains(&core.settings, &mut channels);
            if started == 0 {
                // Stopping is decided under the core lock so a concurrent
                // play request either lands before this tick's snapshot or
                // observes the pacer as stopped and restarts it.
                core.pacer_running = false;
            }
            started
        };

        self.meter
            .lock()
            .update(combined_level(&channels, self.caps.full_scale));

        let send_result = {
            let mut send_path = self.send_path.lock();
            let SendPath {
                encoders,
                transport,
            } = &mut *send_path;
            // A detach may have raced this tick and taken the transport.
            let Some(transport) = transport.as_mut() else {
                drop(send_path);
                self.core.lock().pacer_running = false;
                return Ok(TickOutcome::Stop);
            };
            let mut result = Ok(());
            for encoder in encoders.iter_mut() {
                encoder.encode(&channels[encoder.slot_id() as usize]);
                if encoder.is_dirty() {
                    if let Err(error) = transport.send(encoder.command()) {
                        result = Err(error);
                        break;
                    }
                    encoder.clear_dirty();
                }
            }
            result
        };
        if let Err(error) = send_result {
            warn!(%error, "command transmission failed, pacer stopping");
            self.core.lock().pacer_running = false;
            return Err(error.into());
        }

        Ok(if started == 0 {
            TickOutcome::Stop
        } else {
            TickOutcome::Continue
        })
    }

    /// Stage the master/caller gain into the direct level and the
    /// per-category percentage plus gain into the condition parameters.
    fn apply_gains(&self, settings: &RenderSettings, channels: &mut [SlotParameters; SLOT_COUNT]) {
        let gain = u32::from(settings.master_gain) * u32::from(settings.gain) / 0xffff;
        let scale = |x: i32| (i64::from(x) * i64::from(gain) / 0xffff) as i32;

        let direct = &mut channels[slot_ids::DIRECT as usize];
        direct.level = scale(direct.level);

        let conditions = [
            (slot_ids::SPRING, settings.spring_level, self.caps.has_spring),
            (slot_ids::DAMPER, settings.damper_level, self.caps.has_damper),
            (
                slot_ids::FRICTION,
                settings.friction_level,
                self.caps.has_friction,
            ),
        ];
        for (id, level_pct, present) in conditions {
            let slot = &mut channels[id as usize];
            if !present {
                *slot = SlotParameters::NEUTRAL;
                continue;
            }
            slot.clip = slot.clip * u32::from(level_pct) / 100;
            slot.clip = (u64::from(slot.clip) * u64::from(gain) / 0xffff) as u32;
            slot.k1 = scale(slot.k1);
            slot.k2 = scale(slot.k2);
        }
    }
}

fn pacer_loop(shared: Arc<Shared>) {
    loop {
        let period = shared.core.lock().settings.tick_period_ms.max(1);
        thread::sleep(Duration::from_millis(period));
        match shared.tick(shared.now_ms()) {
            Ok(TickOutcome::Continue) => {}
            Ok(TickOutcome::Backpressure) => {
                let policy = {
                    let mut core = shared.core.lock();
                    let policy = core.settings.backpressure;
                    if policy == BackpressurePolicy::Static {
                        core.settings.tick_period_ms =
                            core.settings.tick_period_ms.saturating_mul(2);
                        if !core.backpressure_warned {
                            core.backpressure_warned = true;
                            warn!(
                                period_ms = core.settings.tick_period_ms,
                                "outbound queue busy, growing tick period"
                            );
                        }
                    }
                    policy
                };
                if policy == BackpressurePolicy::Dynamic {
                    thread::sleep(Duration::from_millis(period));
                }
            }
            Ok(TickOutcome::Stop) | Err(_) => break,
        }
    }
}

/// Force feedback renderer for one device.
///
/// All methods take `&self`; the renderer is internally synchronized and
/// can be shared across threads.
pub struct FfbRenderer {
    shared: Arc<Shared>,
    manual: bool,
}

impl FfbRenderer {
    /// A renderer paced by a background thread while effects are started.
    pub fn new(caps: DeviceCaps, settings: RenderSettings) -> Self {
        Self::build(caps, settings, false)
    }

    /// A renderer with no background pacing; the caller drives every tick
    /// through [`pump`](Self::pump). Intended for tests and harnesses that
    /// need deterministic time.
    pub fn manual(caps: DeviceCaps, settings: RenderSettings) -> Self {
        Self::build(caps, settings, true)
    }

    fn build(caps: DeviceCaps, settings: RenderSettings, manual: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                caps,
                core: Mutex::new(EngineCore {
                    store: EffectStore::new(),
                    settings,
                    attached: false,
                    pacer_running: false,
                    backpressure_warned: false,
                }),
                send_path: Mutex::new(SendPath {
                    encoders: SlotEncoder::bank(),
                    transport: None,
                }),
                pending_settings: Mutex::new(None),
                meter: Mutex::new(ClippingMeter::new()),
                epoch: Instant::now(),
            }),
            manual,
        }
    }

    /// Attach a device: select the firmware loop mode and drive every slot
    /// to its neutral state.
    pub fn attach(&self, transport: Box<dyn SlotTransport>) -> Result<()> {
        let fixed_loop = {
            let mut core = self.shared.core.lock();
            core.attached = true;
            core.backpressure_warned = false;
            core.settings.fixed_loop
        };

        let mut send_path = self.shared.send_path.lock();
        send_path.transport = Some(transport);
        let SendPath {
            encoders,
            transport,
        } = &mut *send_path;
        let transport = transport.as_mut().ok_or(RenderError::NotAttached)?;
        transport.send(&build_loop_mode_command(fixed_loop))?;
        for encoder in encoders.iter_mut() {
            encoder.reset();
            encoder.encode(&SlotParameters::NEUTRAL);
            transport.send(encoder.command())?;
            encoder.clear_dirty();
        }
        debug!(fixed_loop, "device attached");
        Ok(())
    }

    /// Detach the device, silencing all forces first.
    pub fn detach(&self) -> Result<()> {
        {
            let mut core = self.shared.core.lock();
            if !core.attached {
                return Err(RenderError::NotAttached);
            }
            core.attached = false;
            core.store.stop_all();
        }
        let mut send_path = self.shared.send_path.lock();
        if let Some(transport) = send_path.transport.as_mut() {
            transport.send(&build_stop_all_command())?;
        }
        send_path.transport = None;
        debug!("device detached");
        Ok(())
    }

    /// Upload a new effect, returning its handle.
    pub fn upload(&self, def: EffectDef) -> Result<usize> {
        let mut core = self.locked_core()?;
        Ok(core.store.insert(def)?)
    }

    /// Redefine an uploaded effect. Takes effect at the next tick if the
    /// effect is started.
    pub fn redefine(&self, id: usize, def: EffectDef) -> Result<()> {
        let now_ms = self.shared.now_ms();
        let mut core = self.locked_core()?;
        Ok(core.store.upload(id, def, now_ms)?)
    }

    /// Start (`count > 0`) or stop (`count == 0`) an effect. Starting
    /// wakes the pacer if it was idle.
    pub fn play(&self, id: usize, count: u32) -> Result<()> {
        let now_ms = self.shared.now_ms();
        let mut core = self.locked_core()?;
        let started = core.store.play(id, count, now_ms)?;
        if started && !core.pacer_running {
            core.pacer_running = true;
            if !self.manual {
                let shared = Arc::clone(&self.shared);
                thread::Builder::new()
                    .name("ffb-pacer".into())
                    .spawn(move || pacer_loop(shared))
                    .map_err(|_| RenderError::Transport(
                        crate::transport::TransportError::Rejected("pacer thread spawn failed"),
                    ))?;
            }
        }
        Ok(())
    }

    /// Remove an effect and recycle its handle.
    pub fn erase(&self, id: usize) -> Result<()> {
        let mut core = self.locked_core()?;
        Ok(core.store.erase(id)?)
    }

    /// Stop every started effect and silence the device immediately.
    pub fn stop_all(&self) -> Result<()> {
        {
            let mut core = self.locked_core()?;
            core.store.stop_all();
        }
        let mut send_path = self.shared.send_path.lock();
        let transport = send_path
            .transport
            .as_mut()
            .ok_or(RenderError::NotAttached)?;
        transport.send(&build_stop_all_command())?;
        Ok(())
    }

    /// Stage new settings, absorbed atomically at the next tick boundary.
    pub fn update_settings(&self, settings: RenderSettings) {
        *self.shared.pending_settings.lock() = Some(settings);
    }

    /// Peak combined output level since the last reset.
    pub fn peak_level(&self) -> i32 {
        self.shared.meter.lock().peak()
    }

    pub fn reset_peak(&self) {
        self.shared.meter.lock().reset();
    }

    /// Drive one tick at an explicit timestamp. The normal entry point for
    /// a renderer built with [`manual`](Self::manual); safe on a paced
    /// renderer too, where it simply renders one extra frame.
    pub fn pump(&self, now_ms: u64) -> Result<TickOutcome> {
        self.shared.tick(now_ms)
    }

    fn locked_core(&self) -> Result<parking_lot::MutexGuard<'_, EngineCore>> {
        let core = self.shared.core.lock();
        if !core.attached {
            return Err(RenderError::NotAttached);
        }
        Ok(core)
    }
}

impl Drop for FfbRenderer {
    fn drop(&mut self) {
        let _ = self.detach();
    }
}
