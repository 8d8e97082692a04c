//! Persisted per-device signal state.
//!
//! [`SignalState`] is the complete runtime record of one device: emitted
//! power, the ACTIVE flag, the countdown timer bank and the capability
//! bitfield. It is what gets serialized into the host save stream, so
//! decoding is forgiving: missing fields take defaults and out-of-range
//! power is clamped rather than rejected.

pub mod caps;

pub use caps::{Capability, CapabilityFlags, DeviceKind};

use serde::{Deserialize, Serialize};

/// Highest emittable power level.
pub const MAX_POWER: u8 = 15;

/// The countdown timers every device carries. Not all kinds use all
/// slots; unused slots stay at zero.
///
/// The sensor debounce level is deliberately *not* in this bank: it is
/// an accumulator stepped only at evaluation time, while everything
/// here decays once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Remaining ACTIVE ticks of a pulse device.
    OnTime,
    /// Ticks until the next scheduled evaluation (sensors, oscillators,
    /// gauge sampling, fault retry back-off).
    Interval,
    /// Interval-switch power ramp step clock.
    Ramp,
}

impl Timer {
    pub const COUNT: usize = 3;
    pub const ALL: [Timer; Self::COUNT] = [Timer::OnTime, Timer::Interval, Timer::Ramp];

    pub const fn index(self) -> usize {
        match self {
            Timer::OnTime => 0,
            Timer::Interval => 1,
            Timer::Ramp => 2,
        }
    }
}

/// Which timers crossed from positive to zero during one advance call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerExpiry(u8);

impl TimerExpiry {
    pub const fn expired(self, timer: Timer) -> bool {
        self.0 & (1 << timer.index()) != 0
    }

    pub const fn any(self) -> bool {
        self.0 != 0
    }

    fn mark(&mut self, timer: Timer) {
        self.0 |= 1 << timer.index();
    }
}

/// Runtime state of a single device.
///
/// `power` is kept private so the 0..=15 clamp cannot be bypassed; it
/// always holds the *emitted* level (inversion, where configured, is
/// applied before storing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSignalState")]
pub struct SignalState {
    power: u8,
    active: bool,
    timers: [u32; Timer::COUNT],
    /// Sensor oscillation-filter accumulator, stepped at evaluation time.
    debounce: u8,
    caps: CapabilityFlags,
}

impl Default for SignalState {
    fn default() -> Self {
        Self::new(CapabilityFlags::NONE)
    }
}

impl SignalState {
    pub fn new(caps: CapabilityFlags) -> Self {
        Self {
            power: 0,
            active: false,
            timers: [0; Timer::COUNT],
            debounce: 0,
            caps,
        }
    }

    pub const fn power(&self) -> u8 {
        self.power
    }

    /// Stores a power level, clamped to [`MAX_POWER`].
    pub fn set_power(&mut self, power: u8) {
        self.power = power.min(MAX_POWER);
    }

    pub const fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub const fn caps(&self) -> CapabilityFlags {
        self.caps
    }

    pub fn set_caps(&mut self, caps: CapabilityFlags) {
        self.caps = caps;
    }

    pub fn timer(&self, timer: Timer) -> u32 {
        self.timers[timer.index()]
    }

    pub fn set_timer(&mut self, timer: Timer, ticks: u32) {
        self.timers[timer.index()] = ticks;
    }

    pub fn clear_timer(&mut self, timer: Timer) {
        self.set_timer(timer, 0);
    }

    pub const fn debounce_level(&self) -> u8 {
        self.debounce
    }

    pub fn set_debounce_level(&mut self, level: u8) {
        self.debounce = level;
    }

    /// Advances every timer by `dt` ticks, flooring at zero.
    ///
    /// Returns the set of timers that crossed from positive to zero in
    /// this call. A timer already at zero never reports expiry, so a
    /// device observes each countdown end exactly once even when ticks
    /// were skipped and `dt > 1`.
    pub fn tick_advance(&mut self, dt: u32) -> TimerExpiry {
        let mut expiry = TimerExpiry::default();
        if dt == 0 {
            return expiry;
        }
        for timer in Timer::ALL {
            let remaining = self.timers[timer.index()];
            if remaining == 0 {
                continue;
            }
            let next = remaining.saturating_sub(dt);
            self.timers[timer.index()] = next;
            if next == 0 {
                expiry.mark(timer);
            }
        }
        expiry
    }
}

/// Decode-side mirror of [`SignalState`]. Tolerates records written by
/// older versions (missing fields default) and clamps what it reads.
#[derive(Deserialize)]
struct RawSignalState {
    #[serde(default)]
    power: u8,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    timers: [u32; Timer::COUNT],
    #[serde(default)]
    debounce: u8,
    #[serde(default)]
    caps: CapabilityFlags,
}

impl From<RawSignalState> for SignalState {
    fn from(raw: RawSignalState) -> Self {
        Self {
            power: raw.power.min(MAX_POWER),
            active: raw.active,
            timers: raw.timers,
            debounce: raw.debounce,
            caps: raw.caps,
        }
    }
}
