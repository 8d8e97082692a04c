//! Link relay: bridges local redstone to the link protocol.
//!
//! Not periodic - the host reports upstream power changes as events. The
//! relay derives a boolean from the configured input (one face or the
//! whole cube), folds in its inversion flag, and on a genuine edge runs
//! the shared activation handler, whose rising/falling effects carry the
//! link broadcast to the stored targets.

use crate::config::SimConfig;
use crate::link::SwitchAction;

use super::device::{Device, SensorSample, Tuning};
use super::{apply_action, TickEffects};

pub(super) fn neighbor_changed(
    device: &mut Device,
    sample: &SensorSample,
    cfg: &SimConfig,
) -> TickEffects {
    let Tuning::Relay { face, cube_input } = device.tuning else {
        return TickEffects::default();
    };
    let raw = if cube_input {
        sample.neighbor_power.cube
    } else {
        sample.neighbor_power.face(face)
    };
    // The inversion flag is consumed here, on the input side.
    let incoming = (raw != 0) != device.signal.caps().is_inverted();
    let stored = device.signal.power() != 0;
    if incoming == stored {
        // No edge at the input.
        return TickEffects::default();
    }
    if device.signal.caps().is_pulse() && !incoming {
        // Pulse-configured relays only fire on rising input edges; the
        // on-timer handles the rest.
        return TickEffects::default();
    }
    let action = if incoming {
        SwitchAction::Activate
    } else {
        SwitchAction::Deactivate
    };
    apply_action(device, action, cfg).unwrap_or_default()
}
