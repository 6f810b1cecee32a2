//! Emulated-EEPROM settings store.
//!
//! Implements [`SettingsStorePort`] as a 512-byte RAM page with an explicit
//! commit step, the classic flash-backed EEPROM model: byte writes are
//! cheap RAM pokes and only `commit` touches the medium.
//!
//! - **`target_os = "espidf"`** — the page is persisted as a single NVS
//!   blob; `commit` is atomic per `nvs_commit`.
//! - **host** — a committed shadow copy stands in for flash, with commit
//!   counting and failure injection for tests.

use log::{info, warn};

use crate::app::ports::SettingsStorePort;
use crate::error::StorageError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Size of the emulated EEPROM page. Large enough for the reserved cell
/// addresses with headroom for future fields.
pub const PAGE_SIZE: usize = 512;

#[cfg(target_os = "espidf")]
const NVS_NAMESPACE: &[u8; 9] = b"acbridge\0";
#[cfg(target_os = "espidf")]
const NVS_KEY: &[u8; 5] = b"page\0";

pub struct EepromStore {
    page: [u8; PAGE_SIZE],
    #[cfg(not(target_os = "espidf"))]
    committed: [u8; PAGE_SIZE],
    #[cfg(not(target_os = "espidf"))]
    commit_count: usize,
    #[cfg(not(target_os = "espidf"))]
    fail_commits: bool,
}

impl EepromStore {
    /// Open the store and load the persisted page. A missing or short blob
    /// leaves the affected bytes in the erased state (0xFF), which every
    /// boolean cell decodes as `false`.
    pub fn new() -> Result<Self, StorageError> {
        let mut store = Self {
            page: [0xFF; PAGE_SIZE],
            #[cfg(not(target_os = "espidf"))]
            committed: [0xFF; PAGE_SIZE],
            #[cfg(not(target_os = "espidf"))]
            commit_count: 0,
            #[cfg(not(target_os = "espidf"))]
            fail_commits: false,
        };
        store.load()?;
        Ok(store)
    }

    #[cfg(not(target_os = "espidf"))]
    fn load(&mut self) -> Result<(), StorageError> {
        self.page = self.committed;
        info!("EepromStore: simulation backend");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn load(&mut self) -> Result<(), StorageError> {
        // SAFETY: nvs_flash_init is called from the single main-task
        // context before any concurrent NVS access.
        let ret = unsafe { nvs_flash_init() };
        if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
            warn!("EepromStore: erasing and re-initialising NVS partition");
            if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                return Err(StorageError::IoError);
            }
        } else if ret != ESP_OK {
            return Err(StorageError::IoError);
        }

        let result = Self::with_handle(false, |handle| {
            let mut size = PAGE_SIZE;
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    NVS_KEY.as_ptr().cast(),
                    self.page.as_mut_ptr().cast(),
                    &mut size,
                )
            };
            if ret == ESP_ERR_NVS_NOT_FOUND {
                // First boot: the page stays erased.
                return Ok(());
            }
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        match result {
            Ok(()) => {
                info!("EepromStore: page loaded from NVS");
                Ok(())
            }
            Err(e) => {
                warn!("EepromStore: NVS read error {e}, starting from erased page");
                Ok(())
            }
        }
    }

    /// Open the NVS namespace, run `f` with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let ret = unsafe { nvs_open(NVS_NAMESPACE.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe { nvs_close(handle) };
        result
    }

    // ── Host test hooks ───────────────────────────────────────

    #[cfg(not(target_os = "espidf"))]
    pub fn commit_count(&self) -> usize {
        self.commit_count
    }

    /// Make subsequent commits fail, to exercise the dirty-flag retention
    /// path.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_commit_failure(&mut self, fail: bool) {
        self.fail_commits = fail;
    }
}

impl SettingsStorePort for EepromStore {
    fn read_byte(&self, address: u16) -> u8 {
        self.page.get(address as usize).copied().unwrap_or(0xFF)
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        if let Some(cell) = self.page.get_mut(address as usize) {
            *cell = value;
        } else {
            warn!("EepromStore: write past page end (address {address})");
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn commit(&mut self) -> Result<(), StorageError> {
        self.commit_count += 1;
        if self.fail_commits {
            return Err(StorageError::CommitFailed);
        }
        self.committed = self.page;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn commit(&mut self) -> Result<(), StorageError> {
        let result = Self::with_handle(true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    NVS_KEY.as_ptr().cast(),
                    self.page.as_ptr().cast(),
                    PAGE_SIZE,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        result.map_err(|e| {
            warn!("EepromStore: NVS commit error {e}");
            StorageError::CommitFailed
        })
    }
}
