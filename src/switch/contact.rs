//! Contact/pressure switch tick function.
//!
//! Samples the entities the host found in the detection volume and fires
//! a pulse while the footprint condition holds. Resampling while ACTIVE
//! is rate-limited to every fourth global tick; the on-timer alone keeps
//! the switch high in between.

use crate::config::SimConfig;
use crate::signal::{Timer, TimerExpiry};

use super::device::{Device, SensorSample, Tuning};
use super::{binary_power, pulse_on_ticks, TickEffects};

/// Resample-while-active gate: only ticks where `now & 0x3 == 0` pay for
/// an entity scan.
fn resample_due(now: u64) -> bool {
    now & 0x3 == 0
}

fn condition_satisfied(device: &Device, sample: &SensorSample) -> bool {
    let Tuning::Contact {
        filter,
        entity_threshold,
        high_sensitivity,
        ..
    } = device.tuning
    else {
        return false;
    };
    let qualifying = sample
        .entities
        .iter()
        .filter(|e| filter.accepts(e.class) && (high_sensitivity || !e.exempt))
        .count() as u32;
    qualifying >= entity_threshold.max(1)
}

pub(super) fn tick(
    device: &mut Device,
    now: u64,
    expiry: TimerExpiry,
    sample: &SensorSample,
    cfg: &SimConfig,
) -> TickEffects {
    let active = device.signal.is_active();

    // A zero timer with no expiry event only happens on restored records;
    // treat it the same as an expiry.
    if active && (expiry.expired(Timer::OnTime) || device.signal.timer(Timer::OnTime) == 0) {
        // Timer ran out: one last look decides re-arm vs release.
        if condition_satisfied(device, sample) {
            let ticks = pulse_on_ticks(device, cfg);
            device.signal.set_timer(Timer::OnTime, ticks);
            return TickEffects::default();
        }
        device.signal.set_active(false);
        device
            .signal
            .set_power(binary_power(false, device.signal.caps()));
        return TickEffects::falling();
    }

    if active && !resample_due(now) {
        // Held high by the on-timer; skip the entity scan.
        return TickEffects::default();
    }

    if condition_satisfied(device, sample) {
        let ticks = pulse_on_ticks(device, cfg);
        device.signal.set_timer(Timer::OnTime, ticks);
        if !active {
            device.signal.set_active(true);
            device
                .signal
                .set_power(binary_power(true, device.signal.caps()));
            return TickEffects::rising();
        }
    }
    TickEffects::default()
}
