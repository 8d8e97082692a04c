//! Inbound commands to the switch service.
//!
//! These represent actions arriving from the host world (a player clicks a
//! switch, a neighbor block changes, a tuning screen closes, the linking
//! tool writes an address) that the
//! [`SwitchService`](super::service::SwitchService) interprets and acts
//! upon.

use crate::link::{ActorId, LinkAddress};
use crate::switch::device::{DeviceId, Tuning};

/// Commands that host adapters can send into the simulation core.
#[derive(Debug, Clone)]
pub enum DeviceCommand {
    /// A player used (clicked) the device.
    Interact { id: DeviceId, actor: ActorId },

    /// The device took a physical shock (arrow hit, piston bump).
    /// Only shock-sensitive devices react.
    Shock { id: DeviceId },

    /// An adjacent block changed; relays and gauges re-read their input.
    NeighborChanged { id: DeviceId },

    /// The linking tool stored a new target address on a source device.
    AddLink { id: DeviceId, link: LinkAddress },

    /// The linking tool cleared every stored address on a source device.
    ClearLinks { id: DeviceId },

    /// A tuning screen closed; replace the device's tuning wholesale.
    SetTuning { id: DeviceId, tuning: Tuning },
}
