//! Integration tests: AcService → ports, full sync-protocol cycles.

use acbridge::app::ports::{
    addr, ClientTransportPort, ClientEvent, EnvSample, EnvironmentPort, IrTransmitPort,
    SettingsStorePort,
};
use acbridge::app::service::AcService;
use acbridge::app::state::{FanSpeed, Mode};
use acbridge::app::wire::StateReport;
use acbridge::config::SystemConfig;
use acbridge::error::{SensorError, StorageError};
use acbridge::vendor::{VendorCommand, VendorKind};

// ── Mock implementations ──────────────────────────────────────

struct MockIr {
    sent: Vec<VendorCommand>,
}
impl MockIr {
    fn new() -> Self {
        Self { sent: Vec::new() }
    }
}
impl IrTransmitPort for MockIr {
    fn transmit(&mut self, command: &VendorCommand) {
        self.sent.push(*command);
    }
}

struct MockStore {
    page: [u8; 256],
    commits: usize,
    fail_commits: bool,
}
impl MockStore {
    fn new() -> Self {
        Self {
            page: [0xFF; 256],
            commits: 0,
            fail_commits: false,
        }
    }
}
impl SettingsStorePort for MockStore {
    fn read_byte(&self, address: u16) -> u8 {
        self.page[address as usize]
    }
    fn write_byte(&mut self, address: u16, value: u8) {
        self.page[address as usize] = value;
    }
    fn commit(&mut self) -> Result<(), StorageError> {
        self.commits += 1;
        if self.fail_commits {
            Err(StorageError::CommitFailed)
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
struct MockTransport {
    broadcasts: Vec<String>,
}
impl MockTransport {
    fn last_report(&self) -> StateReport {
        serde_json::from_str(self.broadcasts.last().expect("no broadcast")).expect("bad report")
    }
}
impl ClientTransportPort for MockTransport {
    fn poll_event(&mut self) -> Option<ClientEvent> {
        None
    }
    fn send_all(&mut self, text: &str) {
        self.broadcasts.push(text.to_owned());
    }
}

struct ScriptedEnv {
    samples: Vec<Result<EnvSample, SensorError>>,
}
impl EnvironmentPort for ScriptedEnv {
    fn sample(&mut self) -> Result<EnvSample, SensorError> {
        if self.samples.is_empty() {
            Err(SensorError::Timeout)
        } else {
            self.samples.remove(0)
        }
    }
}

fn service() -> AcService {
    AcService::new(&SystemConfig::default())
}

fn rig() -> (AcService, MockIr, MockStore, MockTransport) {
    (service(), MockIr::new(), MockStore::new(), MockTransport::default())
}

// ── Message handling ──────────────────────────────────────────

#[test]
fn partial_update_runs_one_full_send_cycle() {
    let (mut svc, mut ir, mut store, mut tx) = rig();

    svc.handle_message(r#"{"targetTemperature": 18}"#, &mut ir, &mut store, &mut tx);

    assert_eq!(svc.state().target_temperature, 18);
    assert_eq!(ir.sent.len(), 1, "exactly one transmit per message");
    assert_eq!(tx.broadcasts.len(), 1, "exactly one broadcast per message");
    let report = tx.last_report();
    assert_eq!(report.target_temperature, 18);
    // Untouched fields keep their defaults.
    assert_eq!(report.target_mode, Mode::Off);
    assert_eq!(report.target_fan_speed, FanSpeed::Auto);
}

#[test]
fn multi_field_update_coalesces_into_single_cycle() {
    let (mut svc, mut ir, mut store, mut tx) = rig();

    svc.handle_message(
        r#"{"targetMode": "cool", "targetTemperature": 21, "quietMode": true}"#,
        &mut ir,
        &mut store,
        &mut tx,
    );

    assert_eq!(ir.sent.len(), 1);
    assert_eq!(tx.broadcasts.len(), 1);
    assert_eq!(store.commits, 1, "quietMode change commits once");
    let report = tx.last_report();
    assert_eq!(report.target_mode, Mode::Cool);
    assert_eq!(report.target_temperature, 21);
    assert!(report.quiet_mode);
}

#[test]
fn unrecognized_mode_powers_the_unit_down() {
    let (mut svc, mut ir, mut store, mut tx) = rig();

    svc.handle_message(r#"{"targetMode": "cool"}"#, &mut ir, &mut store, &mut tx);
    svc.handle_message(r#"{"targetMode": "BOGUS"}"#, &mut ir, &mut store, &mut tx);

    assert_eq!(svc.state().target_mode, Mode::Off);
    let cmd = ir.sent.last().unwrap();
    assert!(!cmd.power, "fallback must actively command the unit off");
    assert_eq!(tx.last_report().target_mode, Mode::Off);
}

#[test]
fn unrecognized_fan_speed_falls_back_to_auto() {
    let (mut svc, mut ir, mut store, mut tx) = rig();

    svc.handle_message(r#"{"targetFanSpeed": "max"}"#, &mut ir, &mut store, &mut tx);
    assert_eq!(svc.state().target_fan_speed, FanSpeed::Max);

    svc.handle_message(r#"{"targetFanSpeed": "turbo"}"#, &mut ir, &mut store, &mut tx);
    assert_eq!(svc.state().target_fan_speed, FanSpeed::Auto);
}

#[test]
fn mode_and_fan_parse_case_insensitively() {
    let (mut svc, mut ir, mut store, mut tx) = rig();

    svc.handle_message(
        r#"{"targetMode": "HEAT", "targetFanSpeed": "Min"}"#,
        &mut ir,
        &mut store,
        &mut tx,
    );

    assert_eq!(svc.state().target_mode, Mode::Heat);
    assert_eq!(svc.state().target_fan_speed, FanSpeed::Min);
}

#[test]
fn malformed_message_is_dropped_silently() {
    let (mut svc, mut ir, mut store, mut tx) = rig();

    svc.handle_message("not json", &mut ir, &mut store, &mut tx);
    svc.handle_message(r#"{"targetTemperature": "cold"}"#, &mut ir, &mut store, &mut tx);

    assert!(ir.sent.is_empty(), "no transmit for malformed input");
    assert!(tx.broadcasts.is_empty(), "no broadcast for malformed input");
    assert_eq!(store.commits, 0);
    assert_eq!(svc.state().target_temperature, 23);
}

#[test]
fn empty_object_still_triggers_a_send_cycle() {
    // A client can force a resend of the current frame with `{}`.
    let (mut svc, mut ir, mut store, mut tx) = rig();

    svc.handle_message("{}", &mut ir, &mut store, &mut tx);

    assert_eq!(ir.sent.len(), 1);
    assert_eq!(tx.broadcasts.len(), 1);
    assert_eq!(store.commits, 0, "nothing changed, nothing committed");
}

#[test]
fn idempotent_update_retransmits_but_does_not_recommit() {
    let (mut svc, mut ir, mut store, mut tx) = rig();

    svc.handle_message(r#"{"verticalSwing": false}"#, &mut ir, &mut store, &mut tx);
    assert_eq!(store.commits, 1);

    svc.handle_message(r#"{"verticalSwing": false}"#, &mut ir, &mut store, &mut tx);
    assert_eq!(ir.sent.len(), 2, "frame is always re-issued");
    assert_eq!(store.commits, 1, "unchanged setting must not hit flash again");
}

// ── Mutual exclusion ──────────────────────────────────────────

#[test]
fn quiet_and_powerful_stay_mutually_exclusive() {
    let (mut svc, mut ir, mut store, mut tx) = rig();

    svc.handle_message(r#"{"quietMode": true}"#, &mut ir, &mut store, &mut tx);
    assert!(svc.state().quiet_mode);
    assert!(!svc.state().powerful_mode);

    svc.handle_message(r#"{"powerfulMode": true}"#, &mut ir, &mut store, &mut tx);
    assert!(!svc.state().quiet_mode, "powerful must force quiet off");
    assert!(svc.state().powerful_mode);

    let report = tx.last_report();
    assert!(!report.quiet_mode);
    assert!(report.powerful_mode);

    // Both flags in one message: last applied key wins, never both on.
    svc.handle_message(
        r#"{"quietMode": true, "powerfulMode": true}"#,
        &mut ir,
        &mut store,
        &mut tx,
    );
    assert!(!(svc.state().quiet_mode && svc.state().powerful_mode));
}

#[test]
fn disabling_one_comfort_flag_leaves_the_other() {
    let (mut svc, mut ir, mut store, mut tx) = rig();

    svc.handle_message(r#"{"powerfulMode": true}"#, &mut ir, &mut store, &mut tx);
    svc.handle_message(r#"{"quietMode": false}"#, &mut ir, &mut store, &mut tx);

    assert!(svc.state().powerful_mode, "no-op disable must not clear powerful");
}

// ── Persistence & restore ─────────────────────────────────────

#[test]
fn restore_reproduces_persisted_settings_and_defaults() {
    let mut store = MockStore::new();
    store.write_byte(addr::VERTICAL_SWING, 0);
    store.write_byte(addr::HORIZONTAL_SWING, 1);
    store.write_byte(addr::QUIET_MODE, 1);
    store.write_byte(addr::POWERFUL_MODE, 0);

    let mut svc = service();
    svc.restore(&mut store);

    let s = svc.state();
    assert!(!s.vertical_swing);
    assert!(s.horizontal_swing);
    assert!(s.quiet_mode);
    assert!(!s.powerful_mode);
    // Non-persisted settings keep their power-on defaults.
    assert_eq!(s.target_mode, Mode::Off);
    assert_eq!(s.target_fan_speed, FanSpeed::Auto);
    assert_eq!(s.target_temperature, 23);
}

#[test]
fn erased_cells_restore_as_false() {
    let mut store = MockStore::new();
    let mut svc = service();
    svc.restore(&mut store);

    assert!(!svc.state().vertical_swing);
    assert!(!svc.state().horizontal_swing);
    assert!(!svc.state().quiet_mode);
    assert!(!svc.state().powerful_mode);
}

#[test]
fn restore_heals_a_corrupted_both_flags_pair_quiet_wins() {
    let mut store = MockStore::new();
    store.write_byte(addr::QUIET_MODE, 1);
    store.write_byte(addr::POWERFUL_MODE, 1);

    let mut svc = service();
    svc.restore(&mut store);

    // Re-applying quiet clears the corrupted powerful cell, and the
    // cleared value is what the powerful step then re-applies.
    assert!(svc.state().quiet_mode);
    assert!(!svc.state().powerful_mode);
    assert_eq!(store.read_byte(addr::POWERFUL_MODE), 0, "healed cell is rewritten");
}

#[test]
fn settings_survive_a_simulated_reboot() {
    let mut store = MockStore::new();
    {
        let (mut svc, mut ir, mut tx) = (service(), MockIr::new(), MockTransport::default());
        svc.handle_message(
            r#"{"verticalSwing": false, "powerfulMode": true}"#,
            &mut ir,
            &mut store,
            &mut tx,
        );
        assert_eq!(store.commits, 1);
    }

    let mut svc = service();
    svc.restore(&mut store);
    assert!(!svc.state().vertical_swing);
    assert!(svc.state().powerful_mode);
    assert!(!svc.state().quiet_mode);
}

#[test]
fn failed_commit_keeps_dirty_until_a_later_cycle_succeeds() {
    let (mut svc, mut ir, mut store, mut tx) = rig();
    store.fail_commits = true;

    svc.handle_message(r#"{"quietMode": true}"#, &mut ir, &mut store, &mut tx);
    assert_eq!(store.commits, 1);
    // The change is still applied and broadcast.
    assert!(svc.state().quiet_mode);
    assert_eq!(tx.broadcasts.len(), 1);

    // Next cycle with a healthy store retries the commit.
    store.fail_commits = false;
    svc.handle_message("{}", &mut ir, &mut store, &mut tx);
    assert_eq!(store.commits, 2, "dirty flag must survive the failed commit");

    // Once clean, no further commits.
    svc.handle_message("{}", &mut ir, &mut store, &mut tx);
    assert_eq!(store.commits, 2);
}

// ── Connect & poll ────────────────────────────────────────────

#[test]
fn client_connect_broadcasts_full_state_to_all() {
    let (svc, _ir, _store, mut tx) = rig();

    svc.on_client_connected(&mut tx);

    assert_eq!(tx.broadcasts.len(), 1);
    let report = tx.last_report();
    assert_eq!(report.target_temperature, 23);
    assert!(report.vertical_swing);
    assert!(report.horizontal_swing);
}

#[test]
fn poll_samples_and_broadcasts_on_the_interval() {
    let config = SystemConfig::default();
    let mut svc = AcService::new(&config);
    let mut tx = MockTransport::default();
    let mut env = ScriptedEnv {
        samples: vec![
            Ok(EnvSample { temperature_c: 24.5, humidity_pct: 51.0 }),
            Ok(EnvSample { temperature_c: 25.0, humidity_pct: 52.0 }),
        ],
    };

    let step = config.sample_interval_ms();

    // First tick at t=interval fires.
    svc.poll(step, &mut env, &mut tx);
    assert_eq!(tx.broadcasts.len(), 1);
    assert_eq!(tx.last_report().current_temperature, 24.5);

    // Ticks inside the interval do nothing.
    svc.poll(step + 100, &mut env, &mut tx);
    svc.poll(step + step / 2, &mut env, &mut tx);
    assert_eq!(tx.broadcasts.len(), 1);

    // Next interval boundary fires again.
    svc.poll(step * 2, &mut env, &mut tx);
    assert_eq!(tx.broadcasts.len(), 2);
    assert_eq!(tx.last_report().current_humidity, 52.0);
}

#[test]
fn failed_sample_keeps_previous_values_and_still_broadcasts() {
    let config = SystemConfig::default();
    let mut svc = AcService::new(&config);
    let mut tx = MockTransport::default();
    let mut env = ScriptedEnv {
        samples: vec![
            Ok(EnvSample { temperature_c: 22.0, humidity_pct: 40.0 }),
            Err(SensorError::ChecksumMismatch),
        ],
    };

    let step = config.sample_interval_ms();
    svc.poll(step, &mut env, &mut tx);
    svc.poll(step * 2, &mut env, &mut tx);

    assert_eq!(tx.broadcasts.len(), 2, "heartbeat continues through failures");
    let report = tx.last_report();
    assert_eq!(report.current_temperature, 22.0);
    assert_eq!(report.current_humidity, 40.0);
}

#[test]
fn broadcast_replayed_through_the_handler_reproduces_state() {
    // A state report fed back in as an update must converge on the same
    // observable state: report keys are a superset of update keys and the
    // normalizer accepts its own wire forms.
    let (mut svc, mut ir, mut store, mut tx) = rig();
    svc.handle_message(
        r#"{"targetMode": "heat", "targetFanSpeed": "min", "targetTemperature": 27,
            "verticalSwing": false, "quietMode": true}"#,
        &mut ir,
        &mut store,
        &mut tx,
    );
    let snapshot = tx.last_report();
    let json = tx.broadcasts.last().unwrap().clone();

    let (mut replay, mut ir2, mut store2, mut tx2) = rig();
    replay.handle_message(&json, &mut ir2, &mut store2, &mut tx2);

    assert_eq!(StateReport::from(replay.state()), snapshot);
    assert_eq!(tx2.last_report(), snapshot);
}

// ── Vendor dispatch through the service ───────────────────────

#[test]
fn temperature_is_clamped_per_vendor_but_state_keeps_request() {
    let config = SystemConfig {
        vendor: VendorKind::Panasonic,
        ..SystemConfig::default()
    };
    let mut svc = AcService::new(&config);
    let (mut ir, mut store, mut tx) = (MockIr::new(), MockStore::new(), MockTransport::default());

    svc.handle_message(r#"{"targetTemperature": 5}"#, &mut ir, &mut store, &mut tx);

    assert_eq!(svc.state().target_temperature, 5);
    assert_eq!(ir.sent.last().unwrap().temperature_c, 16, "Panasonic floor");
    assert_eq!(tx.last_report().target_temperature, 5);
}

#[test]
fn hitachi_accepts_comfort_flags_without_encoding_them() {
    let config = SystemConfig {
        vendor: VendorKind::Hitachi,
        ..SystemConfig::default()
    };
    let mut svc = AcService::new(&config);
    let (mut ir, mut store, mut tx) = (MockIr::new(), MockStore::new(), MockTransport::default());

    svc.handle_message(r#"{"quietMode": true}"#, &mut ir, &mut store, &mut tx);

    // Client-visible state and persistence stay vendor-agnostic.
    assert!(svc.state().quiet_mode);
    assert_eq!(store.read_byte(addr::QUIET_MODE), 1);
    assert!(tx.last_report().quiet_mode);
    // The frame itself never carries the unsupported flag.
    assert!(!ir.sent.last().unwrap().quiet);
}
