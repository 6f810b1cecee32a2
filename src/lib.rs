//! ACBridge firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module, so the crate builds
//! and tests on the host without the ESP toolchain.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod vendor;

pub mod error;
pub mod pins;

// Adapters carry their own cfg guards; the host side exposes simulation
// backends used by the integration tests.
pub mod adapters;
