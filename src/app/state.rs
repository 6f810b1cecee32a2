//! The in-memory device state model.
//!
//! [`AcState`] is the single authoritative view of the attached unit's
//! target settings and the last environment sample. Exactly one instance
//! exists per controller, owned by the [`AcService`](super::service::AcService)
//! for the lifetime of the process. The unit's true state cannot be read
//! back over IR, so this model *is* the device as far as clients are
//! concerned.

use core::fmt;

use serde::{Deserialize, Serialize};

// ───────────────────────────────────────────────────────────────
// Operating mode
// ───────────────────────────────────────────────────────────────

/// Target operating mode. `Off` doubles as the safe fallback for any
/// unrecognized client value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Off,
    Cool,
    Heat,
    Fan,
    Auto,
    Dry,
}

impl Mode {
    /// Case-insensitive parse of a client-supplied mode string.
    pub fn parse(raw: &str) -> Option<Self> {
        let m = match raw.trim() {
            s if s.eq_ignore_ascii_case("off") => Self::Off,
            s if s.eq_ignore_ascii_case("cool") => Self::Cool,
            s if s.eq_ignore_ascii_case("heat") => Self::Heat,
            s if s.eq_ignore_ascii_case("fan") => Self::Fan,
            s if s.eq_ignore_ascii_case("auto") => Self::Auto,
            s if s.eq_ignore_ascii_case("dry") => Self::Dry,
            _ => return None,
        };
        Some(m)
    }

    /// Lowercase wire form, also used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Cool => "cool",
            Self::Heat => "heat",
            Self::Fan => "fan",
            Self::Auto => "auto",
            Self::Dry => "dry",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ───────────────────────────────────────────────────────────────
// Fan speed
// ───────────────────────────────────────────────────────────────

/// Target fan speed. `Auto` is the fallback for unrecognized values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanSpeed {
    #[default]
    Auto,
    Min,
    Max,
}

impl FanSpeed {
    /// Case-insensitive parse of a client-supplied fan-speed string.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = match raw.trim() {
            s if s.eq_ignore_ascii_case("auto") => Self::Auto,
            s if s.eq_ignore_ascii_case("min") => Self::Min,
            s if s.eq_ignore_ascii_case("max") => Self::Max,
            _ => return None,
        };
        Some(s)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ───────────────────────────────────────────────────────────────
// Device state
// ───────────────────────────────────────────────────────────────

/// Target settings plus the last successful environment sample.
///
/// The four swing/comfort booleans are persisted individually; everything
/// else is volatile and resets to the documented defaults on power loss
/// (the unit itself comes back in its off-equivalent state, so persisting
/// mode or temperature would only create disagreement).
#[derive(Debug, Clone, PartialEq)]
pub struct AcState {
    /// Last sampled room temperature (°C). 0.0 until the first sample.
    pub current_temperature: f32,
    /// Last sampled relative humidity (%). 0.0 until the first sample.
    pub current_humidity: f32,

    pub target_mode: Mode,
    pub target_fan_speed: FanSpeed,
    /// Target temperature in whole °C. Range-clamping is the active vendor
    /// protocol's job; this field stores whatever the client asked for.
    pub target_temperature: i32,

    // Persisted cells — restored from the settings store at startup.
    pub vertical_swing: bool,
    pub horizontal_swing: bool,
    pub quiet_mode: bool,
    pub powerful_mode: bool,
}

/// Power-on default target temperature (°C).
pub const DEFAULT_TARGET_TEMPERATURE: i32 = 23;

impl Default for AcState {
    fn default() -> Self {
        Self {
            current_temperature: 0.0,
            current_humidity: 0.0,
            target_mode: Mode::Off,
            target_fan_speed: FanSpeed::Auto,
            target_temperature: DEFAULT_TARGET_TEMPERATURE,
            vertical_swing: true,
            horizontal_swing: true,
            quiet_mode: false,
            powerful_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_power_on_contract() {
        let s = AcState::default();
        assert_eq!(s.target_mode, Mode::Off);
        assert_eq!(s.target_fan_speed, FanSpeed::Auto);
        assert_eq!(s.target_temperature, 23);
        assert_eq!(s.current_temperature, 0.0);
        assert_eq!(s.current_humidity, 0.0);
    }

    #[test]
    fn mode_parse_is_case_insensitive() {
        assert_eq!(Mode::parse("COOL"), Some(Mode::Cool));
        assert_eq!(Mode::parse("Dry"), Some(Mode::Dry));
        assert_eq!(Mode::parse("off"), Some(Mode::Off));
        assert_eq!(Mode::parse("defrost"), None);
        assert_eq!(Mode::parse(""), None);
    }

    #[test]
    fn fan_parse_is_case_insensitive() {
        assert_eq!(FanSpeed::parse("AUTO"), Some(FanSpeed::Auto));
        assert_eq!(FanSpeed::parse("mIn"), Some(FanSpeed::Min));
        assert_eq!(FanSpeed::parse("turbo"), None);
    }

    #[test]
    fn enum_wire_form_is_lowercase() {
        assert_eq!(serde_json::to_string(&Mode::Cool).unwrap(), "\"cool\"");
        assert_eq!(serde_json::to_string(&FanSpeed::Max).unwrap(), "\"max\"");
    }
}
