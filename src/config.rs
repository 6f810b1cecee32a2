//! System configuration parameters.
//!
//! Everything here is fixed at boot: the active vendor protocol never
//! changes while the controller is running, and the cadences are tied to
//! the sensor and transport characteristics rather than user preference.

use serde::{Deserialize, Serialize};

use crate::vendor::VendorKind;

/// Core system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Which vendor IR protocol this controller drives. Exactly one unit is
    /// attached per controller; the selection is permanent for the process.
    pub vendor: VendorKind,

    /// Environment sample + periodic broadcast interval (seconds).
    pub sample_interval_secs: u32,

    /// Poll loop tick — how often transport I/O is serviced (milliseconds).
    pub tick_interval_ms: u32,

    /// TCP port the WebSocket server listens on.
    pub ws_port: u16,
}

impl SystemConfig {
    /// Sample interval in milliseconds, the unit the poll loop works in.
    pub fn sample_interval_ms(&self) -> u64 {
        u64::from(self.sample_interval_secs) * 1000
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            vendor: VendorKind::Panasonic,
            sample_interval_secs: 30,
            tick_interval_ms: 20,
            ws_port: 81,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.sample_interval_secs > 0);
        assert!(c.tick_interval_ms > 0);
        assert!(c.ws_port > 0);
        assert!(
            u64::from(c.tick_interval_ms) < c.sample_interval_ms(),
            "transport servicing must be faster than the sample cadence"
        );
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.vendor, c2.vendor);
        assert_eq!(c.sample_interval_secs, c2.sample_interval_secs);
        assert_eq!(c.ws_port, c2.ws_port);
    }
}
