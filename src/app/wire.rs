//! Client sync protocol — the sole external representation of device state.
//!
//! Outbound: [`StateReport`], a flat JSON object with exactly nine camelCase
//! keys, broadcast after every accepted change, on every client connect and
//! on the periodic sample tick. Inbound: [`StateUpdate`], any subset of the
//! seven setting keys; unknown keys are ignored and missing keys leave the
//! corresponding field untouched.
//!
//! Enumerated fields travel inbound as raw strings so that validation and
//! fallback stay in the normalizer rather than in serde.

use serde::{Deserialize, Serialize};

use super::state::{AcState, FanSpeed, Mode};

/// Full device state as broadcast to clients. All nine keys always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateReport {
    pub current_temperature: f32,
    pub current_humidity: f32,
    pub target_mode: Mode,
    pub target_fan_speed: FanSpeed,
    pub target_temperature: i32,
    pub vertical_swing: bool,
    pub horizontal_swing: bool,
    pub quiet_mode: bool,
    pub powerful_mode: bool,
}

impl From<&AcState> for StateReport {
    fn from(s: &AcState) -> Self {
        Self {
            current_temperature: s.current_temperature,
            current_humidity: s.current_humidity,
            target_mode: s.target_mode,
            target_fan_speed: s.target_fan_speed,
            target_temperature: s.target_temperature,
            vertical_swing: s.vertical_swing,
            horizontal_swing: s.horizontal_swing,
            quiet_mode: s.quiet_mode,
            powerful_mode: s.powerful_mode,
        }
    }
}

/// Partial setting change request from a client. Every field is optional;
/// serde drops keys it does not recognize.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    #[serde(default)]
    pub target_mode: Option<String>,
    #[serde(default)]
    pub target_fan_speed: Option<String>,
    #[serde(default)]
    pub target_temperature: Option<i32>,
    #[serde(default)]
    pub vertical_swing: Option<bool>,
    #[serde(default)]
    pub horizontal_swing: Option<bool>,
    #[serde(default)]
    pub quiet_mode: Option<bool>,
    #[serde(default)]
    pub powerful_mode: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_carries_all_nine_keys() {
        let report = StateReport::from(&AcState::default());
        let json = serde_json::to_string(&report).unwrap();
        for key in [
            "currentTemperature",
            "currentHumidity",
            "targetMode",
            "targetFanSpeed",
            "targetTemperature",
            "verticalSwing",
            "horizontalSwing",
            "quietMode",
            "powerfulMode",
        ] {
            assert!(json.contains(key), "missing key {key} in {json}");
        }
    }

    #[test]
    fn update_accepts_partial_payload() {
        let u: StateUpdate = serde_json::from_str(r#"{"targetTemperature": 18}"#).unwrap();
        assert_eq!(u.target_temperature, Some(18));
        assert!(u.target_mode.is_none());
        assert!(u.quiet_mode.is_none());
    }

    #[test]
    fn update_ignores_unknown_keys() {
        let u: StateUpdate =
            serde_json::from_str(r#"{"bogusKey": 1, "quietMode": true}"#).unwrap();
        assert_eq!(u.quiet_mode, Some(true));
    }

    #[test]
    fn update_keeps_enumerated_fields_raw() {
        // "BOGUS" must survive parsing so the normalizer can apply the
        // off fallback rather than serde rejecting the whole message.
        let u: StateUpdate = serde_json::from_str(r#"{"targetMode": "BOGUS"}"#).unwrap();
        assert_eq!(u.target_mode.as_deref(), Some("BOGUS"));
    }

    #[test]
    fn malformed_payload_fails_to_parse() {
        assert!(serde_json::from_str::<StateUpdate>("not json at all").is_err());
        assert!(serde_json::from_str::<StateUpdate>(r#"{"targetTemperature": "x"}"#).is_err());
    }
}
