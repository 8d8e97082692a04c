//! Unified error types for the simulation core.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! host-facing surface uniform. All variants are `Copy` so they can be
//! passed through the per-device fault boundary without allocation;
//! anything with interesting detail (the offending pattern, the postcard
//! message) is logged at the site that observed it.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level core error
// ---------------------------------------------------------------------------

/// Every fallible service operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid (bad pattern, zero-valued tunable).
    Config(ConfigError),
    /// The host adapter failed a sample, lookup or persistence call.
    Host(HostError),
    /// A device tick failed and was contained at the device boundary.
    Tick(TickFault),
    /// A command or query named a device id the service does not hold.
    UnknownDevice(u64),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Host(e) => write!(f, "host: {e}"),
            Self::Tick(e) => write!(f, "tick: {e}"),
            Self::UnknownDevice(id) => write!(f, "unknown device {id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// An optout glob did not compile. Pattern filtering is disabled for
    /// the session; category toggles stay in force.
    BadPattern,
    /// A numeric tunable holds a value the engine cannot run with.
    BadValue(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadPattern => write!(f, "optout pattern rejected"),
            Self::BadValue(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Host adapter errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    /// The device's containing region is not resident.
    RegionNotLoaded,
    /// The host could not produce a sensor sample.
    SampleFailed,
    /// Persistence read failed.
    StorageRead,
    /// Persistence write failed.
    StorageWrite,
    /// A state blob failed to encode.
    Encode,
    /// A state blob failed to decode.
    Decode,
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegionNotLoaded => write!(f, "region not loaded"),
            Self::SampleFailed => write!(f, "sensor sample failed"),
            Self::StorageRead => write!(f, "storage read failed"),
            Self::StorageWrite => write!(f, "storage write failed"),
            Self::Encode => write!(f, "state encode failed"),
            Self::Decode => write!(f, "state decode failed"),
        }
    }
}

impl From<HostError> for Error {
    fn from(e: HostError) -> Self {
        Self::Host(e)
    }
}

// ---------------------------------------------------------------------------
// Tick faults
// ---------------------------------------------------------------------------

/// A fault contained at the per-device tick boundary. The device keeps
/// its last-known-good state and its interval timer is reset to the
/// configured retry back-off; no fault propagates to other devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFault {
    /// The per-tick sensor sample could not be taken.
    Sample(HostError),
    /// Writing the post-tick state back to the host failed.
    Persist(HostError),
}

impl fmt::Display for TickFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sample(e) => write!(f, "sample: {e}"),
            Self::Persist(e) => write!(f, "persist: {e}"),
        }
    }
}

impl From<TickFault> for Error {
    fn from(e: TickFault) -> Self {
        Self::Tick(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
