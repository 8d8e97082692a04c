//! Per-kind switch state machines.
//!
//! One dispatcher ([`tick_device`]) advances a device's timers and hands
//! control to its kind's tick function; a second entry point
//! ([`neighbor_changed`]) serves the event-driven kinds. All kinds share
//! one activation handler ([`apply_action`]) so interaction, link
//! delivery and sensor edges produce identical transitions.
//!
//! Tick functions are pure state math over the already-taken sensor
//! sample; nothing in here talks to the host. Side effects are returned
//! as a [`TickEffects`] value the service applies through its ports.

pub mod device;

mod contact;
mod environmental;
mod gauge;
mod interval;
mod relay;

use log::debug;
use rand::rngs::SmallRng;

use crate::config::SimConfig;
use crate::link::{RequestKind, SwitchAction};
use crate::signal::{CapabilityFlags, DeviceKind, Timer, MAX_POWER};
use device::{Device, SensorSample, Tuning};

// ---------------------------------------------------------------------------
// Side effects
// ---------------------------------------------------------------------------

/// Sound cues the host maps onto actual sound events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    PowerOn,
    PowerOff,
}

/// An edge of the ACTIVE flag, broadcast over the device's links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    pub const fn request_kind(self) -> RequestKind {
        match self {
            Edge::Rising => RequestKind::Activate,
            Edge::Falling => RequestKind::Deactivate,
        }
    }
}

/// What one tick (or event) of a device asks the host to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickEffects {
    pub sound: Option<SoundCue>,
    pub notify_neighbors: bool,
    /// Visual state changed; the host should redraw the block.
    pub redraw: bool,
    /// State edge to broadcast over the device's stored links.
    pub link_edge: Option<Edge>,
}

impl TickEffects {
    /// Full rising-edge bundle: on-sound, neighbor notify, redraw, link
    /// activation broadcast.
    pub fn rising() -> Self {
        Self {
            sound: Some(SoundCue::PowerOn),
            notify_neighbors: true,
            redraw: true,
            link_edge: Some(Edge::Rising),
        }
    }

    pub fn falling() -> Self {
        Self {
            sound: Some(SoundCue::PowerOff),
            notify_neighbors: true,
            redraw: true,
            link_edge: Some(Edge::Falling),
        }
    }

    /// Analog output moved without a state edge (interval ramp steps).
    pub fn power_changed() -> Self {
        Self {
            sound: None,
            notify_neighbors: true,
            redraw: true,
            link_edge: None,
        }
    }

    /// Display-only refresh (gauges, indicators).
    pub fn redraw_only() -> Self {
        Self {
            sound: None,
            notify_neighbors: false,
            redraw: true,
            link_edge: None,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Shared activation handler
// ---------------------------------------------------------------------------

/// Binary output level for a switch whose ACTIVE flag is `active`.
///
/// The inversion flag complements the output for ordinary switches.
/// Power relays are the exception: they consume their inversion flag on
/// the input side (see `relay`), so their output tracks ACTIVE directly.
pub(crate) fn binary_power(active: bool, caps: CapabilityFlags) -> u8 {
    let on = if caps.is_power_relay() {
        active
    } else {
        active != caps.is_inverted()
    };
    if on {
        MAX_POWER
    } else {
        0
    }
}

/// On-time a pulse device loads when it (re)fires. A configured value is
/// floored at 4 ticks; unconfigured devices use the world default.
pub(crate) fn pulse_on_ticks(device: &Device, cfg: &SimConfig) -> u32 {
    match device.tuning {
        Tuning::Contact { on_time, .. } if on_time != 0 => on_time.max(4),
        _ => cfg.default_pulse_ticks.max(4),
    }
}

/// The one place ACTIVE transitions happen outside the tick functions.
///
/// Applies `action` to the device and returns the effects to run, or
/// `None` if the action changed nothing (bistable already in the asked
/// state). A pulse re-arm (activate while already ACTIVE) is accepted
/// with empty effects: the timer reloads but no new edge is emitted.
pub fn apply_action(
    device: &mut Device,
    action: SwitchAction,
    cfg: &SimConfig,
) -> Option<TickEffects> {
    let caps = device.signal.caps();
    let activate = match action {
        SwitchAction::Activate => true,
        SwitchAction::Deactivate => false,
        // A toggle always (re)fires a pulse.
        SwitchAction::Toggle => caps.is_pulse() || !device.signal.is_active(),
    };

    if activate {
        let was_active = device.signal.is_active();
        if was_active && !caps.is_pulse() {
            return None;
        }
        let on_ticks = caps.is_pulse().then(|| pulse_on_ticks(device, cfg));
        device.signal.set_active(true);
        device.signal.set_power(binary_power(true, caps));
        if let Some(ticks) = on_ticks {
            device.signal.set_timer(Timer::OnTime, ticks);
        }
        if was_active {
            // Pulse re-arm.
            Some(TickEffects::default())
        } else {
            debug!("device {} at {} activated", device.id, device.pos);
            Some(TickEffects::rising())
        }
    } else {
        if !device.signal.is_active() {
            return None;
        }
        device.signal.set_active(false);
        device.signal.set_power(binary_power(false, caps));
        device.signal.clear_timer(Timer::OnTime);
        debug!("device {} at {} deactivated", device.id, device.pos);
        Some(TickEffects::falling())
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Advances one device by `dt` ticks ending at global tick `now`.
pub fn tick_device(
    device: &mut Device,
    now: u64,
    dt: u32,
    sample: &SensorSample,
    cfg: &SimConfig,
    rng: &mut SmallRng,
) -> TickEffects {
    let expiry = device.signal.tick_advance(dt);
    match device.kind {
        DeviceKind::BistableSwitch => TickEffects::default(),
        // A pulse-configured relay expires like any other pulse.
        DeviceKind::PulseSwitch | DeviceKind::LinkRelay => {
            pulse_expiry(device, expiry.expired(Timer::OnTime))
        }
        DeviceKind::ContactSwitch => contact::tick(device, now, expiry, sample, cfg),
        DeviceKind::EnvironmentalSwitch => environmental::tick(device, expiry, sample, cfg, rng),
        DeviceKind::IntervalTimerSwitch => interval::tick(device, rng),
        DeviceKind::Gauge | DeviceKind::Indicator => gauge::tick(device, expiry, sample),
    }
}

/// Whether the device's next tick will read the sensor sample.
///
/// Lets the service skip host sampling (entity scans in particular) for
/// devices that will not look at it. Conservative: may report `true` for
/// a tick that ends up not reading, never `false` for one that does.
pub fn wants_sample(device: &Device, now: u64, dt: u32) -> bool {
    match device.kind {
        DeviceKind::BistableSwitch
        | DeviceKind::PulseSwitch
        | DeviceKind::LinkRelay
        | DeviceKind::IntervalTimerSwitch => false,
        DeviceKind::ContactSwitch => {
            !device.signal.is_active()
                || device.signal.timer(Timer::OnTime) <= dt
                || now & 0x3 == 0
        }
        DeviceKind::EnvironmentalSwitch | DeviceKind::Gauge | DeviceKind::Indicator => {
            device.signal.timer(Timer::Interval) <= dt
        }
    }
}

/// Reacts to an upstream neighbor power change (event, not periodic).
pub fn neighbor_changed(
    device: &mut Device,
    sample: &SensorSample,
    cfg: &SimConfig,
) -> TickEffects {
    match device.kind {
        DeviceKind::LinkRelay => relay::neighbor_changed(device, sample, cfg),
        // Displays refresh immediately instead of waiting a sample period.
        DeviceKind::Gauge | DeviceKind::Indicator => gauge::refresh(device, sample),
        _ => TickEffects::default(),
    }
}

/// Player interaction (use/click). Kinds without a manual action return
/// `None` and the host falls through to its config UI.
pub fn interact(device: &mut Device, cfg: &SimConfig) -> Option<TickEffects> {
    match device.kind {
        DeviceKind::BistableSwitch | DeviceKind::LinkRelay => {
            apply_action(device, SwitchAction::Toggle, cfg)
        }
        DeviceKind::PulseSwitch => apply_action(device, SwitchAction::Activate, cfg),
        _ => None,
    }
}

/// Block shock/vibration event (projectile hit). Only shock-sensitive
/// devices react; they fire like a pulse press.
pub fn shock(device: &mut Device, cfg: &SimConfig) -> Option<TickEffects> {
    if !device.signal.caps().is_shock_sensitive() {
        return None;
    }
    apply_action(device, SwitchAction::Activate, cfg)
}

/// Pulse devices' only periodic behavior: on-timer expiry.
fn pulse_expiry(device: &mut Device, expired: bool) -> TickEffects {
    // A zero timer with no expiry event only happens on restored records;
    // treat it the same as an expiry.
    let ran_out = expired || device.signal.timer(Timer::OnTime) == 0;
    if ran_out && device.signal.is_active() && device.signal.caps().is_pulse() {
        device.signal.set_active(false);
        device
            .signal
            .set_power(binary_power(false, device.signal.caps()));
        TickEffects::falling()
    } else {
        TickEffects::default()
    }
}
