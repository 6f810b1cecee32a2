//! Application core — pure domain logic, zero I/O.
//!
//! The state model, command normalization, mutual-exclusion rules and the
//! client sync protocol all live here. Interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod ports;
pub mod service;
pub mod state;
pub mod wire;
