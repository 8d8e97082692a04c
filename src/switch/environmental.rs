//! Environmental sensor switch tick function (light/rain/lightning).
//!
//! Evaluation is scheduled on the Interval timer with a random jitter so
//! a field of sensors placed in the same tick spreads its sampling cost.
//! Between evaluations the switch just holds state. An oscillation
//! filter (the debounce accumulator) absorbs flicker around the
//! thresholds: the switch goes ACTIVE only when the accumulator
//! saturates at its ceiling and INACTIVE only when it drains to zero.

use rand::rngs::SmallRng;
use rand::Rng;

use crate::config::SimConfig;
use crate::signal::{Timer, TimerExpiry};

use super::device::{Device, SensorKind, SensorSample, Tuning};
use super::{binary_power, TickEffects};

/// Oscillation-filter ceiling for the boolean weather sensors.
const WEATHER_DEBOUNCE_MAX: u8 = 4;

fn reload_interval(device: &mut Device, base: u32, cfg: &SimConfig, rng: &mut SmallRng) {
    let jitter = if cfg.env_jitter_ticks > 0 {
        rng.random_range(0..cfg.env_jitter_ticks)
    } else {
        0
    };
    device
        .signal
        .set_timer(Timer::Interval, base.max(1) + jitter);
}

/// Comparator step for the light sensor. `threshold_off >= threshold_on`
/// selects exact-match semantics; otherwise ordinary hysteresis.
fn light_step(measurement: u8, threshold_on: f32, threshold_off: f32) -> i8 {
    let m = f32::from(measurement.min(15));
    if threshold_off >= threshold_on {
        if m == threshold_on {
            1
        } else {
            -1
        }
    } else if m >= threshold_on {
        1
    } else if m <= threshold_off {
        -1
    } else {
        0
    }
}

pub(super) fn tick(
    device: &mut Device,
    expiry: TimerExpiry,
    sample: &SensorSample,
    cfg: &SimConfig,
    rng: &mut SmallRng,
) -> TickEffects {
    let Tuning::Environmental {
        sensor,
        threshold_on,
        threshold_off,
        debounce,
        interval,
    } = device.tuning
    else {
        return TickEffects::default();
    };

    if !expiry.expired(Timer::Interval) {
        if device.signal.timer(Timer::Interval) == 0 {
            // Freshly placed or loaded: schedule the first evaluation.
            reload_interval(device, interval, cfg, rng);
        }
        return TickEffects::default();
    }
    reload_interval(device, interval, cfg, rng);

    let (step, ceiling) = match sensor {
        SensorKind::Light => (
            light_step(sample.light_level, threshold_on, threshold_off),
            debounce,
        ),
        SensorKind::Rain => (
            if sample.raining { 1 } else { -1 },
            WEATHER_DEBOUNCE_MAX,
        ),
        SensorKind::Lightning => (
            if sample.thundering { 1 } else { -1 },
            WEATHER_DEBOUNCE_MAX,
        ),
    };

    let want_active = if ceiling == 0 {
        // No filtering: any nonzero step flips at once, zero holds.
        match step {
            1.. => true,
            0 => return TickEffects::default(),
            _ => false,
        }
    } else {
        let level = (i16::from(device.signal.debounce_level()) + i16::from(step))
            .clamp(0, i16::from(ceiling)) as u8;
        device.signal.set_debounce_level(level);
        if level >= ceiling {
            true
        } else if level == 0 {
            false
        } else {
            return TickEffects::default();
        }
    };

    if want_active == device.signal.is_active() {
        return TickEffects::default();
    }
    device.signal.set_active(want_active);
    device
        .signal
        .set_power(binary_power(want_active, device.signal.caps()));
    if want_active {
        TickEffects::rising()
    } else {
        TickEffects::falling()
    }
}
