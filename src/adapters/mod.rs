//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter  | Implements          | Connects to                    |
//! |----------|---------------------|--------------------------------|
//! | `dht`    | EnvironmentPort     | DHT22 on a single GPIO         |
//! | `eeprom` | SettingsStorePort   | NVS-backed emulated EEPROM     |
//! | `ir`     | IrTransmitPort      | ESP32 RMT + 38 kHz IR LED      |
//! | `time`   | —                   | ESP32 system timer             |
//! | `ws`     | ClientTransportPort | WebSocket endpoint on httpd    |
//!
//! Every adapter compiles a simulation backend on non-ESP targets so the
//! whole stack runs under host tests.

pub mod dht;
pub mod eeprom;
pub mod ir;
pub mod time;
pub mod ws;
