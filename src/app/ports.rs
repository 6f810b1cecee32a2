//! Port traits — the hexagonal boundary between the sync core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AcService (domain)
//! ```
//!
//! Driven adapters (DHT sensor, EEPROM page, IR transmitter, WebSocket
//! server) implement these traits. The [`AcService`](super::service::AcService)
//! consumes them via generics at call sites, so the domain core never
//! touches hardware directly and the whole service runs under test with
//! mock adapters.

use crate::error::{SensorError, StorageError};
use crate::vendor::VendorCommand;

// ───────────────────────────────────────────────────────────────
// Environment sampler (driven adapter: sensor → domain)
// ───────────────────────────────────────────────────────────────

/// One temperature/humidity reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvSample {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// Read-side port for the room sensor. A failed read is an expected,
/// recoverable event: the caller keeps its previous values.
pub trait EnvironmentPort {
    fn sample(&mut self) -> Result<EnvSample, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Persistent settings store (driven adapter: domain ↔ flash)
// ───────────────────────────────────────────────────────────────

/// Fixed cell addresses within the settings page.
///
/// Addresses are part of the on-flash layout and must never be reordered;
/// they were inherited from earlier board revisions and existing units in
/// the field still carry data at these offsets.
pub mod addr {
    pub const VERTICAL_SWING: u16 = 230;
    pub const HORIZONTAL_SWING: u16 = 231;
    pub const QUIET_MODE: u16 = 232;
    pub const POWERFUL_MODE: u16 = 233;
}

/// Byte-addressable persistent storage with an explicit commit step.
///
/// Writes land in RAM; `commit` pushes the page to the backing medium and
/// is the only call that can fail. A never-written or corrupted cell reads
/// as whatever the erased medium yields (0xFF on flash) — callers must map
/// anything other than `1` to `false`.
pub trait SettingsStorePort {
    fn read_byte(&self, address: u16) -> u8;
    fn write_byte(&mut self, address: u16, value: u8);
    fn commit(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// IR transmitter (driven adapter: domain → vendor encoder)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the IR stage.
///
/// Transmission is fire-and-forget: IR has no acknowledgment path, so the
/// adapter logs failures internally and the domain treats every transmit
/// as delivered for bookkeeping purposes.
pub trait IrTransmitPort {
    fn transmit(&mut self, command: &VendorCommand);
}

// ───────────────────────────────────────────────────────────────
// Client transport (driven adapter: domain ↔ WebSocket clients)
// ───────────────────────────────────────────────────────────────

/// Opaque per-connection identifier assigned by the transport.
pub type ClientId = u8;

/// Connection-lifecycle and inbound-message events, drained by the poll
/// loop one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Connected(ClientId),
    Message(ClientId, String),
    Disconnected(ClientId),
}

/// Text transport to zero or more concurrently connected clients.
pub trait ClientTransportPort {
    /// Non-blocking: next pending event, if any.
    fn poll_event(&mut self) -> Option<ClientEvent>;

    /// Best-effort broadcast of one text frame to every connected client.
    fn send_all(&mut self, text: &str);
}
