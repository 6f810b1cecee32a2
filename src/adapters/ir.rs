//! IR transmit adapter.
//!
//! Implements [`IrTransmitPort`] over the ESP32 RMT peripheral: the
//! composed [`VendorCommand`] is packed into that vendor's frame bytes and
//! radiated as a 38 kHz-carrier pulse train. The status LED is held on for
//! the duration of the burst, mirroring the stock remote's feedback blink.
//!
//! Transmission is fire-and-forget — IR has no acknowledgment path, so
//! failures are logged here and never surfaced to the domain.
//!
//! On host targets the adapter records every command for inspection by the
//! integration tests.

use log::debug;

use crate::app::ports::IrTransmitPort;
use crate::vendor::VendorCommand;

#[cfg(target_os = "espidf")]
use crate::vendor::VendorKind;

#[cfg(target_os = "espidf")]
use esp_idf_hal::{
    gpio::OutputPin,
    peripheral::Peripheral,
    rmt::{
        config::{CarrierConfig, DutyPercent, TransmitConfig},
        PinState, Pulse, PulseTicks, RmtChannel, TxRmtDriver, VariableLengthSignal,
    },
    units::FromValueType,
};
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(target_os = "espidf")]
const IR_TICK_DIVIDER: u8 = 80; // 1 µs per RMT tick at 80 MHz APB.

/// Pulse timings (µs) for one vendor's frame encoding.
#[cfg(target_os = "espidf")]
struct IrTiming {
    header_mark: u16,
    header_space: u16,
    bit_mark: u16,
    one_space: u16,
    zero_space: u16,
}

#[cfg(target_os = "espidf")]
const fn timing_for(vendor: VendorKind) -> IrTiming {
    match vendor {
        VendorKind::Daikin => IrTiming {
            header_mark: 3650,
            header_space: 1623,
            bit_mark: 428,
            one_space: 1280,
            zero_space: 428,
        },
        VendorKind::Panasonic => IrTiming {
            header_mark: 3456,
            header_space: 1728,
            bit_mark: 432,
            one_space: 1296,
            zero_space: 432,
        },
        VendorKind::Hitachi => IrTiming {
            header_mark: 3300,
            header_space: 1700,
            bit_mark: 400,
            one_space: 1250,
            zero_space: 500,
        },
    }
}

/// Pack the command into its on-air byte form: settings in declaration
/// order, 8-bit additive checksum last.
#[cfg(target_os = "espidf")]
fn frame_bytes(cmd: &VendorCommand) -> [u8; 8] {
    let mut bytes = [
        u8::from(cmd.power),
        cmd.mode_code,
        cmd.fan_code,
        cmd.temperature_c,
        cmd.swing_v_code,
        cmd.swing_h_code,
        u8::from(cmd.quiet) | (u8::from(cmd.powerful) << 1),
        0,
    ];
    bytes[7] = bytes[..7].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    bytes
}

/// Header mark/space, then 8 bits per byte LSB-first, trailing mark.
#[cfg(target_os = "espidf")]
fn build_signal(
    command: &VendorCommand,
) -> Result<VariableLengthSignal, esp_idf_sys::EspError> {
    let timing = timing_for(command.vendor);
    let bytes = frame_bytes(command);

    let mut pulses: Vec<Pulse> = Vec::with_capacity(2 + bytes.len() * 16 + 1);
    pulses.push(Pulse::new(PinState::High, PulseTicks::new(timing.header_mark)?));
    pulses.push(Pulse::new(PinState::Low, PulseTicks::new(timing.header_space)?));
    for byte in bytes {
        for bit in 0..8 {
            pulses.push(Pulse::new(PinState::High, PulseTicks::new(timing.bit_mark)?));
            let one = byte & (1 << bit) != 0;
            let space = if one { timing.one_space } else { timing.zero_space };
            pulses.push(Pulse::new(PinState::Low, PulseTicks::new(space)?));
        }
    }
    pulses.push(Pulse::new(PinState::High, PulseTicks::new(timing.bit_mark)?));

    let refs: Vec<&Pulse> = pulses.iter().collect();
    let mut signal = VariableLengthSignal::with_capacity(pulses.len());
    signal.push(refs)?;
    Ok(signal)
}

pub struct IrTransmitter {
    #[cfg(target_os = "espidf")]
    tx: TxRmtDriver<'static>,
    #[cfg(target_os = "espidf")]
    led: esp_idf_hal::gpio::PinDriver<'static, esp_idf_hal::gpio::AnyOutputPin, esp_idf_hal::gpio::Output>,
    #[cfg(not(target_os = "espidf"))]
    sent: Vec<VendorCommand>,
}

impl IrTransmitter {
    #[cfg(target_os = "espidf")]
    pub fn new<C, P>(
        channel: impl Peripheral<P = C> + 'static,
        pin: impl Peripheral<P = P> + 'static,
        led_gpio: i32,
    ) -> Result<Self, crate::error::Error>
    where
        C: RmtChannel,
        P: OutputPin,
    {
        let carrier = CarrierConfig::new()
            .frequency(crate::pins::IR_CARRIER_KHZ.kHz().into())
            .carrier_level(PinState::High)
            .duty_percent(DutyPercent::new(33).map_err(|_| crate::error::Error::Init("carrier duty"))?);

        let config = TransmitConfig::new()
            .clock_divider(IR_TICK_DIVIDER)
            .carrier(Some(carrier))
            .idle(Some(PinState::Low));

        let tx = TxRmtDriver::new(channel, pin, &config)
            .map_err(|_| crate::error::Error::Init("RMT IR driver"))?;
        let led_pin = unsafe { esp_idf_hal::gpio::AnyOutputPin::new(led_gpio) };
        let led = esp_idf_hal::gpio::PinDriver::output(led_pin)
            .map_err(|_| crate::error::Error::Init("status LED"))?;

        Ok(Self { tx, led })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self { sent: Vec::new() }
    }

    // ── Host test hooks ───────────────────────────────────────

    #[cfg(not(target_os = "espidf"))]
    pub fn sent(&self) -> &[VendorCommand] {
        &self.sent
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn last(&self) -> Option<&VendorCommand> {
        self.sent.last()
    }
}

impl IrTransmitPort for IrTransmitter {
    #[cfg(not(target_os = "espidf"))]
    fn transmit(&mut self, command: &VendorCommand) {
        debug!("IR transmit (sim): {command:?}");
        self.sent.push(*command);
    }

    #[cfg(target_os = "espidf")]
    fn transmit(&mut self, command: &VendorCommand) {
        let signal = match build_signal(command) {
            Ok(s) => s,
            Err(e) => {
                warn!("IR: could not build pulse train: {e}");
                return;
            }
        };

        // Active-low status LED: on for the burst.
        let _ = self.led.set_low();
        if let Err(e) = self.tx.start_blocking(&signal) {
            warn!("IR transmit failed: {e}");
        } else {
            debug!("IR transmit: frame to {:?}", command.vendor);
        }
        let _ = self.led.set_high();
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::vendor::{ActiveVendor, VendorKind, VendorProtocol};

    #[test]
    fn sim_records_transmissions_in_order() {
        let mut ir = IrTransmitter::new();
        let vendor = ActiveVendor::new(VendorKind::Daikin);
        ir.transmit(&vendor.command());
        ir.transmit(&vendor.command());
        assert_eq!(ir.sent().len(), 2);
        assert_eq!(ir.last().unwrap().vendor, VendorKind::Daikin);
    }
}
