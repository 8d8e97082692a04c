//! Device instances and their persisted records.
//!
//! A [`Device`] is one placed switch/gauge in the world: identity,
//! position, kind tag, live [`SignalState`], kind-specific [`Tuning`]
//! and the link addresses it sources. [`DeviceRecord`] is its durable
//! form; every field the host may omit (older saves) carries a default.

use serde::{Deserialize, Serialize};

use crate::link::LinkAddress;
use crate::pos::{BlockPos, Face};
use crate::signal::{Capability, CapabilityFlags, DeviceKind, SignalState};

/// Host-assigned stable identity of one placed device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u64);

impl core::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Entity classes a contact switch can filter on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityClass {
    /// Anything that can stand on the plate, dropped items included.
    #[default]
    Everything,
    /// Any living entity.
    Living,
    Player,
    Monster,
    Animal,
    /// Dropped item stacks.
    Item,
}

impl EntityClass {
    /// Whether a filter set to `self` accepts an entity of `class`.
    pub fn accepts(self, class: EntityClass) -> bool {
        match self {
            EntityClass::Everything => true,
            EntityClass::Living => matches!(
                class,
                EntityClass::Player | EntityClass::Monster | EntityClass::Animal
            ),
            exact => exact == class,
        }
    }
}

/// One entity the host found inside a contact switch's detection volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityInfo {
    pub class: EntityClass,
    /// The host-side "does not trigger pressure plates" flag. Ignored
    /// by high-sensitivity switches.
    pub exempt: bool,
}

/// Which world condition an environmental switch watches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorKind {
    #[default]
    Light,
    Rain,
    Lightning,
}

impl SensorKind {
    pub const fn capability(self) -> Capability {
        match self {
            SensorKind::Light => Capability::LightSensor,
            SensorKind::Rain => Capability::RainSensor,
            SensorKind::Lightning => Capability::LightningSensor,
        }
    }
}

/// Kind-specific persisted tuning. Defaults are what a freshly placed
/// device of that kind starts with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum Tuning {
    /// Manual switches carry no extra tuning.
    #[default]
    None,
    Contact {
        filter: EntityClass,
        /// Minimum qualifying entity count to trigger.
        entity_threshold: u32,
        /// Ignore the pressure-plate exemption flag.
        high_sensitivity: bool,
        /// Configured pulse length in ticks; 0 = use the world default.
        on_time: u32,
    },
    Environmental {
        sensor: SensorKind,
        threshold_on: f32,
        threshold_off: f32,
        /// Debounce counter ceiling; 0 flips immediately.
        debounce: u8,
        /// Base evaluation interval in ticks (jitter is added on top).
        interval: u32,
    },
    Interval {
        /// Target power while the on-phase holds, 1..=15.
        p_set: u8,
        t_on: u32,
        t_off: u32,
        /// Power change per ramp step; 0 = jump instantaneously.
        ramp: u8,
        /// Internally tracked oscillator phase.
        phase_on: bool,
    },
    Relay {
        /// Which face the upstream power is read from.
        face: Face,
        /// Read the overall cube power instead of the single face.
        #[serde(default)]
        cube_input: bool,
    },
    Gauge {
        /// Ticks between display refreshes.
        sample_interval: u32,
    },
}

impl Tuning {
    /// The tuning a freshly placed device of `kind` starts with.
    pub fn default_for(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::BistableSwitch | DeviceKind::PulseSwitch => Tuning::None,
            DeviceKind::ContactSwitch => Tuning::Contact {
                filter: EntityClass::Everything,
                entity_threshold: 1,
                high_sensitivity: false,
                on_time: 0,
            },
            DeviceKind::EnvironmentalSwitch => Tuning::Environmental {
                sensor: SensorKind::Light,
                threshold_on: 7.0,
                threshold_off: 5.0,
                debounce: 2,
                interval: 10,
            },
            DeviceKind::IntervalTimerSwitch => Tuning::Interval {
                p_set: 15,
                t_on: 20,
                t_off: 20,
                ramp: 0,
                phase_on: false,
            },
            DeviceKind::LinkRelay => Tuning::Relay {
                face: Face::North,
                cube_input: false,
            },
            DeviceKind::Gauge => Tuning::Gauge {
                sample_interval: 10,
            },
            // Indicators refresh faster so lamps track power closely.
            DeviceKind::Indicator => Tuning::Gauge { sample_interval: 4 },
        }
    }
}

/// Per-direction power the host sampled around a device this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeighborPower {
    /// Directional (weak/strong already folded by the host) per face.
    pub faces: [u8; Face::COUNT],
    /// Overall incoming cube power.
    pub cube: u8,
}

impl NeighborPower {
    pub fn face(&self, face: Face) -> u8 {
        self.faces[face.index()]
    }
}

/// Everything the host sampled for one device tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorSample {
    /// Combined sky/block light at the device, 0..=15.
    pub light_level: u8,
    pub raining: bool,
    pub thundering: bool,
    /// Entities inside the detection volume (contact switches only;
    /// empty for everything else).
    pub entities: Vec<EntityInfo>,
    pub neighbor_power: NeighborPower,
}

/// One placed device.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: DeviceId,
    pub pos: BlockPos,
    /// Registry name, e.g. `switchlink:industrial_lever`. The optout
    /// filter and link-target verification match on this string.
    pub kind_name: String,
    pub kind: DeviceKind,
    pub signal: SignalState,
    pub tuning: Tuning,
    /// Link addresses this device sources on its own state edges.
    pub links: Vec<LinkAddress>,
    /// Set after a contained tick fault; the device sits out until its
    /// Interval timer runs down the retry back-off. Never persisted.
    pub fault_backoff: bool,
}

impl Device {
    /// Creates a fresh device with kind-default tuning and capability
    /// template. `extra_caps` carries per-variant flags the host knows
    /// at placement (inverted, blinking, decorative, shock-sensitive).
    pub fn new(
        id: DeviceId,
        pos: BlockPos,
        kind_name: impl Into<String>,
        kind: DeviceKind,
        extra_caps: CapabilityFlags,
    ) -> Self {
        let caps = CapabilityFlags::from_bits(kind.caps().bits() | extra_caps.bits());
        let mut device = Self {
            id,
            pos,
            kind_name: kind_name.into(),
            kind,
            signal: SignalState::new(caps),
            tuning: Tuning::default_for(kind),
            links: Vec::new(),
            fault_backoff: false,
        };
        device.sync_sensor_caps();
        device
    }

    /// Replaces the tuning and re-derives the sensor capability bit so
    /// flags and tuning never disagree.
    pub fn set_tuning(&mut self, tuning: Tuning) {
        self.tuning = tuning;
        self.sync_sensor_caps();
    }

    fn sync_sensor_caps(&mut self) {
        let mut caps = self
            .signal
            .caps()
            .without(Capability::LightSensor)
            .without(Capability::RainSensor)
            .without(Capability::LightningSensor);
        if let Tuning::Environmental { sensor, .. } = self.tuning {
            caps = caps.with(sensor.capability());
        }
        self.signal.set_caps(caps);
    }

    /// Display state of an indicator lamp at global tick `now`.
    /// Blinking indicators strobe at 1 Hz (10 ticks lit, 10 dark).
    pub fn lit(&self, now: u64) -> bool {
        if self.signal.power() == 0 {
            return false;
        }
        if self.signal.caps().is_blinking() {
            (now / 10) % 2 == 0
        } else {
            true
        }
    }

    pub fn to_record(&self) -> DeviceRecord {
        DeviceRecord {
            pos: self.pos,
            kind_name: self.kind_name.clone(),
            kind: self.kind,
            signal: self.signal.clone(),
            tuning: self.tuning,
            links: self.links.clone(),
        }
    }

    pub fn from_record(id: DeviceId, record: DeviceRecord) -> Self {
        let mut device = Self {
            id,
            pos: record.pos,
            kind_name: record.kind_name,
            kind: record.kind,
            signal: record.signal,
            tuning: record.tuning,
            links: record.links,
            fault_backoff: false,
        };
        // Older records may predate the tuning/caps coupling.
        device.sync_sensor_caps();
        device
    }
}

/// Durable form of a [`Device`]; the id is the storage key and lives
/// outside the blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(default)]
    pub pos: BlockPos,
    pub kind_name: String,
    pub kind: DeviceKind,
    #[serde(default)]
    pub signal: SignalState,
    #[serde(default)]
    pub tuning: Tuning,
    #[serde(default)]
    pub links: Vec<LinkAddress>,
}
