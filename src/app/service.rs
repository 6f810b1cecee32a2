//! Application service — the state synchronization core.
//!
//! [`AcService`] owns the device state and the active vendor protocol and
//! is the only place either is mutated. All I/O flows through port traits
//! injected at call sites, making the entire service testable with mock
//! adapters.
//!
//! ```text
//!  ClientTransportPort ──▶ ┌───────────────────────────┐ ──▶ IrTransmitPort
//!                          │         AcService          │
//!  EnvironmentPort ───────▶│  normalize · state · send  │──▶ SettingsStorePort
//!                          └───────────────────────────┘ ──▶ broadcast
//! ```
//!
//! Every accepted setting change follows the same strict order: issue to
//! the vendor frame, record in state, persist if persistable, broadcast —
//! and the whole cycle runs to completion on the single control thread, so
//! clients never observe a half-applied change.

use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::vendor::{ActiveVendor, VendorProtocol};

use super::ports::{
    addr, ClientTransportPort, EnvironmentPort, IrTransmitPort, SettingsStorePort,
};
use super::state::{AcState, FanSpeed, Mode};
use super::wire::{StateReport, StateUpdate};

// ───────────────────────────────────────────────────────────────
// Quiet/powerful mutual exclusion
// ───────────────────────────────────────────────────────────────

/// Which comfort flag a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comfort {
    Quiet,
    Powerful,
}

/// Compute both comfort flags' next values in one step.
///
/// Enabling either flag forces the other off; disabling one leaves the
/// other untouched. Computing the pair together (instead of two setters
/// calling each other) makes the no-reentrancy argument trivial.
fn comfort_transition(quiet: bool, powerful: bool, target: Comfort, on: bool) -> (bool, bool) {
    match (target, on) {
        (Comfort::Quiet, true) => (true, false),
        (Comfort::Quiet, false) => (false, powerful),
        (Comfort::Powerful, true) => (false, true),
        (Comfort::Powerful, false) => (quiet, false),
    }
}

// ───────────────────────────────────────────────────────────────
// AcService
// ───────────────────────────────────────────────────────────────

/// Owns device state, normalizes incoming changes and runs the
/// transmit → persist → broadcast cycle.
pub struct AcService {
    state: AcState,
    vendor: ActiveVendor,
    /// True iff a persisted cell changed since the last successful commit.
    dirty: bool,
    sample_interval_ms: u64,
    last_sample_ms: u64,
}

impl AcService {
    pub fn new(config: &SystemConfig) -> Self {
        info!("vendor protocol: {:?}", config.vendor);
        Self {
            state: AcState::default(),
            vendor: ActiveVendor::new(config.vendor),
            dirty: false,
            sample_interval_ms: config.sample_interval_ms(),
            last_sample_ms: 0,
        }
    }

    /// Read-only snapshot of the current device state.
    pub fn state(&self) -> &AcState {
        &self.state
    }

    /// The full frame the next transmit would carry (diagnostics/tests).
    pub fn pending_command(&self) -> crate::vendor::VendorCommand {
        self.vendor.command()
    }

    // ── Startup ───────────────────────────────────────────────

    /// Load the persisted cells, then re-issue every setting through the
    /// normalizer so the vendor frame converges with the restored state.
    ///
    /// The unit cannot be read back over IR and always powers on in its
    /// off-equivalent default, so non-persisted fields keep their
    /// documented defaults and the persisted ones are pushed back into the
    /// frame. Re-applying equal values writes nothing to the store; a
    /// corrupted cell pair that decodes with both comfort flags set is
    /// healed by the transition function and re-persisted, with quiet
    /// winning because each field is re-read at its own apply step.
    pub fn restore(&mut self, store: &mut impl SettingsStorePort) {
        let load = |a: u16| store.read_byte(a) == 1;
        self.state.vertical_swing = load(addr::VERTICAL_SWING);
        self.state.horizontal_swing = load(addr::HORIZONTAL_SWING);
        self.state.quiet_mode = load(addr::QUIET_MODE);
        self.state.powerful_mode = load(addr::POWERFUL_MODE);
        info!(
            "restored settings: vswing={} hswing={} quiet={} powerful={}",
            self.state.vertical_swing,
            self.state.horizontal_swing,
            self.state.quiet_mode,
            self.state.powerful_mode,
        );

        let (mode, fan, temp) = (
            self.state.target_mode,
            self.state.target_fan_speed,
            self.state.target_temperature,
        );
        self.apply_mode(mode);
        self.apply_fan(fan);
        self.set_target_temperature(temp);

        // Each field is read back at its own apply step: applying quiet may
        // already have cleared a corrupted powerful cell, and that cleared
        // value is what gets re-applied.
        let vs = self.state.vertical_swing;
        self.set_vertical_swing(vs, store);
        let hs = self.state.horizontal_swing;
        self.set_horizontal_swing(hs, store);
        let quiet = self.state.quiet_mode;
        self.set_quiet_mode(quiet, store);
        let powerful = self.state.powerful_mode;
        self.set_powerful_mode(powerful, store);
    }

    // ── Validating setters (Command Normalizer) ───────────────

    /// Set the target mode from a raw client string. Unrecognized values
    /// force the safe fallback `off` — the unit is actively commanded off
    /// rather than left in an unknown state.
    pub fn set_target_mode(&mut self, raw: &str) {
        let mode = Mode::parse(raw).unwrap_or_else(|| {
            warn!("unrecognized target mode {raw:?}, turning off");
            Mode::Off
        });
        self.apply_mode(mode);
    }

    fn apply_mode(&mut self, mode: Mode) {
        // Always re-issued, even when unchanged: a client that suspects
        // desync can force a resend of the same value.
        self.vendor.set_mode(mode);
        if mode != self.state.target_mode {
            info!("target mode -> {mode}");
            self.state.target_mode = mode;
        }
    }

    /// Set the fan speed from a raw client string; unrecognized values
    /// fall back to `auto`.
    pub fn set_target_fan_speed(&mut self, raw: &str) {
        let fan = FanSpeed::parse(raw).unwrap_or_else(|| {
            warn!("unrecognized fan speed {raw:?}, using auto");
            FanSpeed::Auto
        });
        self.apply_fan(fan);
    }

    fn apply_fan(&mut self, fan: FanSpeed) {
        self.vendor.set_fan(fan);
        if fan != self.state.target_fan_speed {
            info!("target fan speed -> {fan}");
            self.state.target_fan_speed = fan;
        }
    }

    /// Any integer is accepted; the vendor protocol clamps to its own
    /// range while the state keeps the requested value.
    pub fn set_target_temperature(&mut self, celsius: i32) {
        self.vendor.set_temperature(celsius);
        if celsius != self.state.target_temperature {
            info!("target temperature -> {celsius}");
            self.state.target_temperature = celsius;
        }
    }

    pub fn set_vertical_swing(&mut self, on: bool, store: &mut impl SettingsStorePort) {
        self.vendor.set_vertical_swing(on);
        if on != self.state.vertical_swing {
            info!("vertical swing -> {on}");
            self.state.vertical_swing = on;
            self.persist(store, addr::VERTICAL_SWING, on);
        }
    }

    pub fn set_horizontal_swing(&mut self, on: bool, store: &mut impl SettingsStorePort) {
        self.vendor.set_horizontal_swing(on);
        if on != self.state.horizontal_swing {
            info!("horizontal swing -> {on}");
            self.state.horizontal_swing = on;
            self.persist(store, addr::HORIZONTAL_SWING, on);
        }
    }

    /// Quiet and powerful are mutually exclusive; enabling one disables
    /// the other in the same step.
    pub fn set_quiet_mode(&mut self, on: bool, store: &mut impl SettingsStorePort) {
        self.vendor.set_quiet(on);
        if on {
            self.vendor.set_powerful(false);
        }
        let (quiet, powerful) =
            comfort_transition(self.state.quiet_mode, self.state.powerful_mode, Comfort::Quiet, on);
        self.record_comfort(quiet, powerful, store);
    }

    pub fn set_powerful_mode(&mut self, on: bool, store: &mut impl SettingsStorePort) {
        self.vendor.set_powerful(on);
        if on {
            self.vendor.set_quiet(false);
        }
        let (quiet, powerful) = comfort_transition(
            self.state.quiet_mode,
            self.state.powerful_mode,
            Comfort::Powerful,
            on,
        );
        self.record_comfort(quiet, powerful, store);
    }

    fn record_comfort(&mut self, quiet: bool, powerful: bool, store: &mut impl SettingsStorePort) {
        debug_assert!(!(quiet && powerful));
        if quiet != self.state.quiet_mode {
            info!("quiet mode -> {quiet}");
            self.state.quiet_mode = quiet;
            self.persist(store, addr::QUIET_MODE, quiet);
        }
        if powerful != self.state.powerful_mode {
            info!("powerful mode -> {powerful}");
            self.state.powerful_mode = powerful;
            self.persist(store, addr::POWERFUL_MODE, powerful);
        }
    }

    fn persist(&mut self, store: &mut impl SettingsStorePort, address: u16, on: bool) {
        store.write_byte(address, u8::from(on));
        self.dirty = true;
    }

    // ── Sync protocol handling ────────────────────────────────

    /// A client connected: broadcast the full state to everyone so all
    /// views stay consistent, not just the newcomer's.
    pub fn on_client_connected(&self, tx: &mut impl ClientTransportPort) {
        self.broadcast(tx);
    }

    /// Process one inbound text message. Recognized keys are applied
    /// through the setters, then exactly one send cycle runs — multi-field
    /// updates coalesce into a single transmit/persist/broadcast.
    /// Malformed messages are dropped with no state change.
    pub fn handle_message(
        &mut self,
        text: &str,
        ir: &mut impl IrTransmitPort,
        store: &mut impl SettingsStorePort,
        tx: &mut impl ClientTransportPort,
    ) {
        let update: StateUpdate = match serde_json::from_str(text) {
            Ok(u) => u,
            Err(e) => {
                debug!("dropping malformed client message: {e}");
                return;
            }
        };
        self.apply_update(&update, store);
        self.send(ir, store, tx);
    }

    /// Apply the fields present in an update; missing keys leave their
    /// fields untouched.
    pub fn apply_update(&mut self, update: &StateUpdate, store: &mut impl SettingsStorePort) {
        if let Some(raw) = update.target_mode.as_deref() {
            self.set_target_mode(raw);
        }
        if let Some(raw) = update.target_fan_speed.as_deref() {
            self.set_target_fan_speed(raw);
        }
        if let Some(celsius) = update.target_temperature {
            self.set_target_temperature(celsius);
        }
        if let Some(on) = update.vertical_swing {
            self.set_vertical_swing(on, store);
        }
        if let Some(on) = update.horizontal_swing {
            self.set_horizontal_swing(on, store);
        }
        if let Some(on) = update.quiet_mode {
            self.set_quiet_mode(on, store);
        }
        if let Some(on) = update.powerful_mode {
            self.set_powerful_mode(on, store);
        }
    }

    /// One full send cycle: transmit the complete frame, commit dirty
    /// settings, broadcast the new state. Runs to completion; transmit has
    /// no acknowledgment path and is never retried.
    pub fn send(
        &mut self,
        ir: &mut impl IrTransmitPort,
        store: &mut impl SettingsStorePort,
        tx: &mut impl ClientTransportPort,
    ) {
        ir.transmit(&self.vendor.command());
        self.save(store);
        self.broadcast(tx);
    }

    /// Commit only when something persisted actually changed, to bound
    /// flash wear. The dirty flag survives a failed commit so durability
    /// catches up on the next cycle.
    fn save(&mut self, store: &mut impl SettingsStorePort) {
        if !self.dirty {
            return;
        }
        match store.commit() {
            Ok(()) => {
                debug!("settings committed");
                self.dirty = false;
            }
            Err(e) => warn!("settings commit failed: {e}"),
        }
    }

    fn broadcast(&self, tx: &mut impl ClientTransportPort) {
        match serde_json::to_string(&StateReport::from(&self.state)) {
            Ok(json) => tx.send_all(&json),
            Err(e) => warn!("state serialization failed: {e}"),
        }
    }

    // ── Poll loop ─────────────────────────────────────────────

    /// Periodic tick: once per sample interval, read the environment and
    /// broadcast — unconditionally, even if the sample failed, so clients
    /// see a regular heartbeat of the authoritative state.
    pub fn poll(
        &mut self,
        now_ms: u64,
        env: &mut impl EnvironmentPort,
        tx: &mut impl ClientTransportPort,
    ) {
        if now_ms.wrapping_sub(self.last_sample_ms) < self.sample_interval_ms {
            return;
        }
        self.last_sample_ms = now_ms;
        self.sample_environment(env);
        self.broadcast(tx);
    }

    /// Take one environment sample. A failure keeps the previous values;
    /// clients are never told about sensor trouble.
    pub fn sample_environment(&mut self, env: &mut impl EnvironmentPort) {
        match env.sample() {
            Ok(sample) => {
                self.state.current_temperature = sample.temperature_c;
                self.state.current_humidity = sample.humidity_pct;
            }
            Err(e) => warn!("environment sample failed: {e}"),
        }
    }
}
