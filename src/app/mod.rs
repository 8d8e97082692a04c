//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the orchestration layer of the simulation:
//! device lifecycle, per-tick drive, link-request routing and the
//! per-device fault boundary. All interaction with the host engine
//! happens through **port traits** defined in [`ports`], keeping this
//! layer fully testable without a running game world.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
