//! Device kinds and capability flags.
//!
//! Every device carries an immutable bitfield describing what it *is*
//! (pulse vs bistable, which sensor drives it, whether it can source or
//! accept links). Behavior code never inspects concrete device types;
//! it asks the flags. One named accessor per bit, no ad hoc masks.

use serde::{Deserialize, Serialize};

/// A single capability bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Capability {
    /// ACTIVE self-expires via the on-timer (buttons, contact mats).
    Pulse = 1 << 0,
    /// Holds ACTIVE/INACTIVE until explicitly flipped (levers, relays).
    Bistable = 1 << 1,
    /// Emitted power is complemented (`15 - p`).
    Inverted = 1 << 2,
    /// Triggers on block shock/vibration events.
    ShockSensitive = 1 << 3,
    /// May broadcast activation over stored link addresses.
    LinkSource = 1 << 4,
    /// Accepts incoming link requests.
    LinkTarget = 1 << 5,
    /// Entity-contact sensor (pressure mat footprint sampling).
    ContactSensor = 1 << 6,
    /// Light-level sensor.
    LightSensor = 1 << 7,
    /// Rain sensor.
    RainSensor = 1 << 8,
    /// Lightning/thunderstorm sensor.
    LightningSensor = 1 << 9,
    /// Free-running interval oscillator.
    TimerDriven = 1 << 10,
    /// Mirrors upstream neighbor power (link relay input side).
    PowerRelay = 1 << 11,
    /// Display-only power gauge.
    Gauge = 1 << 12,
    /// Indicator lamp (lit when powered).
    Indicator = 1 << 13,
    /// Indicator blinks on a global-tick phase instead of steady light.
    Blinking = 1 << 14,
    /// Purely decorative variant (separate optout category).
    Decorative = 1 << 15,
}

impl Capability {
    /// Bitmask for this capability.
    pub const fn mask(self) -> u32 {
        self as u32
    }
}

/// Immutable capability bitfield of one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityFlags(u32);

impl CapabilityFlags {
    pub const NONE: Self = Self(0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, cap: Capability) -> bool {
        self.0 & cap.mask() != 0
    }

    pub const fn with(self, cap: Capability) -> Self {
        Self(self.0 | cap.mask())
    }

    pub const fn without(self, cap: Capability) -> Self {
        Self(self.0 & !cap.mask())
    }

    // Named accessors, one per bit.

    pub const fn is_pulse(self) -> bool {
        self.contains(Capability::Pulse)
    }

    pub const fn is_bistable(self) -> bool {
        self.contains(Capability::Bistable)
    }

    pub const fn is_inverted(self) -> bool {
        self.contains(Capability::Inverted)
    }

    pub const fn is_shock_sensitive(self) -> bool {
        self.contains(Capability::ShockSensitive)
    }

    pub const fn is_link_source(self) -> bool {
        self.contains(Capability::LinkSource)
    }

    pub const fn is_link_target(self) -> bool {
        self.contains(Capability::LinkTarget)
    }

    pub const fn is_contact_sensor(self) -> bool {
        self.contains(Capability::ContactSensor)
    }

    pub const fn is_timer_driven(self) -> bool {
        self.contains(Capability::TimerDriven)
    }

    pub const fn is_power_relay(self) -> bool {
        self.contains(Capability::PowerRelay)
    }

    pub const fn is_gauge(self) -> bool {
        self.contains(Capability::Gauge)
    }

    pub const fn is_indicator(self) -> bool {
        self.contains(Capability::Indicator)
    }

    pub const fn is_blinking(self) -> bool {
        self.contains(Capability::Blinking)
    }

    pub const fn is_decorative(self) -> bool {
        self.contains(Capability::Decorative)
    }

    /// True for any environment-driven sensor kind (light/rain/lightning).
    pub const fn is_environmental(self) -> bool {
        self.0
            & (Capability::LightSensor.mask()
                | Capability::RainSensor.mask()
                | Capability::LightningSensor.mask())
            != 0
    }
}

/// Enumeration of the device kinds the tick engine dispatches on.
///
/// Replaces the runtime type inspection of the original design: behavior
/// is selected by this tag, fine-grained policy by [`CapabilityFlags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Gauge,
    Indicator,
    BistableSwitch,
    PulseSwitch,
    ContactSwitch,
    EnvironmentalSwitch,
    IntervalTimerSwitch,
    LinkRelay,
}

impl DeviceKind {
    /// Default capability template for the kind. Placement may refine it
    /// (e.g. OR in `Inverted` or a sensor flag), never contradict it.
    pub const fn caps(self) -> CapabilityFlags {
        match self {
            DeviceKind::Gauge => CapabilityFlags::NONE.with(Capability::Gauge),
            DeviceKind::Indicator => CapabilityFlags::NONE.with(Capability::Indicator),
            DeviceKind::BistableSwitch => CapabilityFlags::NONE
                .with(Capability::Bistable)
                .with(Capability::LinkSource)
                .with(Capability::LinkTarget),
            DeviceKind::PulseSwitch => CapabilityFlags::NONE
                .with(Capability::Pulse)
                .with(Capability::LinkSource)
                .with(Capability::LinkTarget),
            DeviceKind::ContactSwitch => CapabilityFlags::NONE
                .with(Capability::Pulse)
                .with(Capability::ContactSensor)
                .with(Capability::LinkSource),
            DeviceKind::EnvironmentalSwitch => CapabilityFlags::NONE
                .with(Capability::Bistable)
                .with(Capability::LinkSource),
            DeviceKind::IntervalTimerSwitch => CapabilityFlags::NONE
                .with(Capability::TimerDriven)
                .with(Capability::LinkSource),
            DeviceKind::LinkRelay => CapabilityFlags::NONE
                .with(Capability::Bistable)
                .with(Capability::PowerRelay)
                .with(Capability::LinkSource)
                .with(Capability::LinkTarget),
        }
    }
}
