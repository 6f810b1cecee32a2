//! ACBridge firmware — main entry point.
//!
//! Hexagonal architecture: the application service owns all device state
//! and talks to the world exclusively through port traits.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                  │
//! │                                                          │
//! │  WsServer          DhtSensor       IrTransmitter         │
//! │  (ClientTransport) (Environment)   (IrTransmit)          │
//! │  EepromStore       MonotonicClock                        │
//! │  (SettingsStore)                                         │
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ───────────────     │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────┐      │
//! │  │            AcService (pure logic)              │      │
//! │  │  normalize · mutual exclusion · sync protocol  │      │
//! │  └────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────┘
//! ```

use anyhow::Result;
use log::{debug, info};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::peripherals::Peripherals;

use acbridge::adapters::dht::DhtSensor;
use acbridge::adapters::eeprom::EepromStore;
use acbridge::adapters::ir::IrTransmitter;
use acbridge::adapters::time::MonotonicClock;
use acbridge::adapters::ws::WsServer;
use acbridge::app::ports::{ClientEvent, ClientTransportPort};
use acbridge::app::service::AcService;
use acbridge::config::SystemConfig;
use acbridge::error::Error;
use acbridge::pins;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ACBridge v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = SystemConfig::default();
    info!(
        "config: vendor={:?} sample={}s port={}",
        config.vendor, config.sample_interval_secs, config.ws_port,
    );

    // ── 2. Construct adapters ─────────────────────────────────
    let peripherals = Peripherals::take().map_err(|_| Error::Init("peripherals"))?;

    let mut store = EepromStore::new()?;
    let mut dht = DhtSensor::new(pins::DHT_DATA_GPIO);
    // SAFETY: IR_TX_GPIO names a free output-capable pin on this board and
    // is claimed exactly once, here.
    let ir_pin = unsafe { esp_idf_hal::gpio::AnyOutputPin::new(pins::IR_TX_GPIO) };
    let mut ir = IrTransmitter::new(peripherals.rmt.channel0, ir_pin, pins::STATUS_LED_GPIO)?;
    let mut ws = WsServer::new(config.ws_port)?;
    let clock = MonotonicClock::new();

    // ── 3. Construct the application service ──────────────────
    let mut svc = AcService::new(&config);
    svc.restore(&mut store);
    svc.sample_environment(&mut dht);

    info!("system ready, entering poll loop");

    // ── 4. Poll loop ──────────────────────────────────────────
    loop {
        while let Some(event) = ws.poll_event() {
            match event {
                ClientEvent::Connected(id) => {
                    info!("client {id} connected");
                    svc.on_client_connected(&mut ws);
                }
                ClientEvent::Message(id, text) => {
                    debug!("client {id}: {text}");
                    svc.handle_message(&text, &mut ir, &mut store, &mut ws);
                }
                ClientEvent::Disconnected(id) => {
                    debug!("client {id} disconnected");
                }
            }
        }

        svc.poll(clock.now_ms(), &mut dht, &mut ws);

        FreeRtos::delay_ms(config.tick_interval_ms);
    }
}
