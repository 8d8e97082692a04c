//! Gauges and indicator lamps: display-only devices.
//!
//! A gauge mirrors the incoming cube power into its own `power` on a
//! fixed sample period; an upstream change event refreshes it at once.
//! Neither kind emits power or link edges - the only effect is a redraw.

use crate::signal::{Timer, TimerExpiry, MAX_POWER};

use super::device::{Device, SensorSample, Tuning};
use super::TickEffects;

pub(super) fn tick(device: &mut Device, expiry: TimerExpiry, sample: &SensorSample) -> TickEffects {
    let Tuning::Gauge { sample_interval } = device.tuning else {
        return TickEffects::default();
    };
    if expiry.expired(Timer::Interval) || device.signal.timer(Timer::Interval) == 0 {
        device
            .signal
            .set_timer(Timer::Interval, sample_interval.max(1));
        refresh(device, sample)
    } else {
        TickEffects::default()
    }
}

/// Re-reads the displayed power immediately (sample period untouched).
pub(super) fn refresh(device: &mut Device, sample: &SensorSample) -> TickEffects {
    let power = sample.neighbor_power.cube.min(MAX_POWER);
    if power == device.signal.power() {
        return TickEffects::default();
    }
    device.signal.set_power(power);
    device.signal.set_active(power != 0);
    TickEffects::redraw_only()
}
