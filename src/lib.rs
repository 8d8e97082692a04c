//! Switchlink simulation core.
//!
//! A host-agnostic library implementing the state machines behind a
//! family of redstone-style devices (manual switches, contact mats,
//! environmental sensors, interval timers, link relays, gauges and
//! indicator lamps) plus the switch-link protocol that couples them
//! across distance. The host engine drives it once per simulation tick
//! and on discrete world events; everything else flows through the port
//! traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod link;
pub mod optout;
pub mod pos;
pub mod signal;
pub mod switch;
