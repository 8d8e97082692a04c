//! Port traits: the boundary between the simulation core and the host engine.
//!
//! ```text
//!   Host engine ──▶ Port trait ──▶ SwitchService (domain)
//! ```
//!
//! The host engine implements these traits over its world, save stream and
//! notification machinery. The [`SwitchService`](super::service::SwitchService)
//! consumes them via generics, so the decision logic never touches an engine
//! type directly and the whole core runs under test against mock ports.
//!
//! ## Contract notes
//!
//! - **WorldPort** lookups must tolerate unloaded regions: `device_at`
//!   returns `None` rather than forcing a chunk load.
//! - **StoragePort** writes MUST be atomic per key: a device record is
//!   either the old blob or the new one, never a partial write.
//! - **NotifyPort** calls are fire-and-forget; the host swallows failures.

use crate::error::HostError;
use crate::pos::BlockPos;
use crate::switch::device::{DeviceId, SensorSample};
use crate::switch::SoundCue;

// ───────────────────────────────────────────────────────────────
// World port (driven adapter: host world → domain)
// ───────────────────────────────────────────────────────────────

/// What [`WorldPort::device_at`] found at a position: enough identity to
/// verify a stored link address without touching the device itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    pub id: DeviceId,
    /// Registry name of the block occupying the position right now.
    pub kind_name: String,
}

/// Read-side port: tick clock, sensor samples and position lookups.
pub trait WorldPort {
    /// The host's monotonically increasing simulation tick.
    fn current_tick(&self) -> u64;

    /// Take the per-tick sensor sample for one device: light level,
    /// weather, entities in the detection volume, neighbor power.
    fn sample(&mut self, id: DeviceId, pos: BlockPos) -> Result<SensorSample, HostError>;

    /// Resolve whatever linkable device currently occupies `pos`.
    /// `None` when the containing region is not resident or the position
    /// holds no device.
    fn device_at(&self, pos: BlockPos) -> Option<DeviceHandle>;
}

// ───────────────────────────────────────────────────────────────
// Notify port (driven adapter: domain → host world)
// ───────────────────────────────────────────────────────────────

/// Write-side port: world-visible side effects of a state change.
/// Both calls are best-effort with no return value.
pub trait NotifyPort {
    /// Tell the host to propagate a power change to the device's
    /// neighboring blocks.
    fn notify_neighbors(&mut self, id: DeviceId);

    /// Play the switch sound cue at the device.
    fn play_sound(&mut self, id: DeviceId, cue: SoundCue);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → overlay / logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`CoreEvent`](super::events::CoreEvent)s
/// through this port. Adapters decide where they go, the status overlay
/// and the log file being the usual consumers.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::CoreEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (domain ↔ host save stream)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for device records.
///
/// Keys are namespaced so the core's blobs never collide with other
/// subsystems sharing the same save stream. Durability across process
/// restarts is the host's responsibility.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage backend is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
