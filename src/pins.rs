//! GPIO / peripheral pin assignments for the ACBridge board.
//!
//! Single source of truth — every adapter references this module rather than
//! hard-coding pin numbers.

/// IR LED driver output (through a transistor stage). D2 on the devkit.
pub const IR_TX_GPIO: i32 = 4;

/// DHT22 temperature/humidity sensor, single-wire data line. D1 on the devkit.
pub const DHT_DATA_GPIO: i32 = 5;

/// On-board status LED, active-low. Flashed for the duration of an IR burst.
pub const STATUS_LED_GPIO: i32 = 2;

/// IR carrier frequency in kHz (38 kHz is shared by all three supported vendors).
pub const IR_CARRIER_KHZ: u32 = 38;
