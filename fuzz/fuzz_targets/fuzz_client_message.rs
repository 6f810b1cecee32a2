//! Fuzz target: `AcService::handle_message` (client sync inbound path)
//!
//! Feeds arbitrary byte sequences through the message handler as UTF-8
//! text and checks that the sync core stays well-formed.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Quiet and powerful mode are never both recorded on
//! - Malformed input produces no transmit and no broadcast
//!
//! cargo fuzz run fuzz_client_message

#![no_main]

use libfuzzer_sys::fuzz_target;

use acbridge::app::ports::{
    ClientEvent, ClientTransportPort, IrTransmitPort, SettingsStorePort,
};
use acbridge::app::service::AcService;
use acbridge::config::SystemConfig;
use acbridge::error::StorageError;
use acbridge::vendor::VendorCommand;

struct CountingIr {
    transmits: usize,
}
impl IrTransmitPort for CountingIr {
    fn transmit(&mut self, _command: &VendorCommand) {
        self.transmits += 1;
    }
}

struct RamStore {
    page: [u8; 256],
}
impl SettingsStorePort for RamStore {
    fn read_byte(&self, address: u16) -> u8 {
        self.page[address as usize]
    }
    fn write_byte(&mut self, address: u16, value: u8) {
        self.page[address as usize] = value;
    }
    fn commit(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

struct CountingTransport {
    broadcasts: usize,
}
impl ClientTransportPort for CountingTransport {
    fn poll_event(&mut self) -> Option<ClientEvent> {
        None
    }
    fn send_all(&mut self, _text: &str) {
        self.broadcasts += 1;
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    let mut svc = AcService::new(&SystemConfig::default());
    let mut ir = CountingIr { transmits: 0 };
    let mut store = RamStore { page: [0xFF; 256] };
    let mut tx = CountingTransport { broadcasts: 0 };

    svc.handle_message(text, &mut ir, &mut store, &mut tx);

    assert!(
        !(svc.state().quiet_mode && svc.state().powerful_mode),
        "quiet and powerful must stay mutually exclusive"
    );
    // One message yields at most one transmit and one broadcast, and they
    // always travel together.
    assert!(ir.transmits <= 1);
    assert_eq!(ir.transmits, tx.broadcasts);
});
