//! Outbound core events.
//!
//! The [`SwitchService`](super::service::SwitchService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them; the linking-tool overlay renders
//! `LinkResolved` results directly.

use crate::error::TickFault;
use crate::link::{LinkAddress, RequestResult};
use crate::pos::BlockPos;
use crate::switch::device::DeviceId;

/// Structured events emitted by the simulation core.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// The service has started (carries the restored device count).
    Started { device_count: usize },

    /// A device's world-visible output changed: ACTIVE flag, emitted
    /// power, or lit appearance.
    SwitchChanged {
        id: DeviceId,
        active: bool,
        power: u8,
    },

    /// One link request finished resolving. `result` doubles as the
    /// overlay text shown to a player holding the linking tool.
    LinkResolved {
        source: DeviceId,
        target: LinkAddress,
        result: RequestResult,
    },

    /// A relay chain exceeded the hop budget and was cut short.
    HopBudgetExhausted { source: BlockPos },

    /// A device tick faulted and was contained at the device boundary.
    TickFault { id: DeviceId, fault: TickFault },
}
