//! Interval timer switch: a free-running power oscillator.
//!
//! The oscillator alternates between an on-phase at `p_set` and an
//! off-phase at zero, holding each for `t_on`/`t_off` ticks. A nonzero
//! `ramp` slews the output stepwise instead of jumping. The emitted
//! (stored) power is the complement of the internal level on inverted
//! devices; the level is recovered from the stored value, so the record
//! carries no extra field.

use rand::rngs::SmallRng;
use rand::Rng;

use crate::signal::{SignalState, Timer, MAX_POWER};

use super::device::{Device, Tuning};
use super::{Edge, TickEffects};

/// Ticks between ramp steps (a quarter second at 20 tps).
const RAMP_STEP_TICKS: u32 = 5;

/// Resync delay range after a phase/flag disagreement.
const RESYNC_TICKS: core::ops::RangeInclusive<u32> = 1..=20;

fn level_of(signal: &SignalState, inverted: bool) -> u8 {
    if inverted {
        MAX_POWER - signal.power()
    } else {
        signal.power()
    }
}

fn set_level(signal: &mut SignalState, level: u8, inverted: bool) {
    let level = level.min(MAX_POWER);
    signal.set_power(if inverted { MAX_POWER - level } else { level });
}

pub(super) fn tick(device: &mut Device, rng: &mut SmallRng) -> TickEffects {
    let caps = device.signal.caps();
    let inverted = caps.is_inverted();
    let Tuning::Interval {
        p_set,
        t_on,
        t_off,
        ramp,
        phase_on,
    } = &mut device.tuning
    else {
        return TickEffects::default();
    };
    let target = (*p_set).clamp(1, MAX_POWER);

    // A restored save can carry an ACTIVE flag the oscillator did not
    // produce. Adopt it, zero the level and restart on a short random
    // delay so a reloaded field of timers does not fire in lockstep.
    if device.signal.is_active() != *phase_on {
        *phase_on = device.signal.is_active();
        let before = device.signal.power();
        set_level(&mut device.signal, 0, inverted);
        device
            .signal
            .set_timer(Timer::Interval, rng.random_range(RESYNC_TICKS));
        device.signal.clear_timer(Timer::Ramp);
        return if device.signal.power() != before {
            TickEffects::power_changed()
        } else {
            TickEffects::default()
        };
    }

    if device.signal.timer(Timer::Interval) > 0 {
        // Holding the current phase.
        return TickEffects::default();
    }

    let cur = level_of(&device.signal, inverted);
    let (end, edge, hold) = if *phase_on {
        (0u8, Edge::Falling, (*t_off).max(1))
    } else {
        (target, Edge::Rising, (*t_on).max(1))
    };

    let next = if *ramp == 0 {
        end
    } else {
        if device.signal.timer(Timer::Ramp) > 0 {
            // Between ramp steps.
            return TickEffects::default();
        }
        if end > cur {
            cur.saturating_add(*ramp).min(end)
        } else {
            cur.saturating_sub(*ramp).max(end)
        }
    };
    set_level(&mut device.signal, next, inverted);

    if next == end {
        // Phase complete: flip and hold.
        *phase_on = !*phase_on;
        device.signal.set_active(*phase_on);
        device.signal.set_timer(Timer::Interval, hold);
        device.signal.clear_timer(Timer::Ramp);
        TickEffects {
            link_edge: Some(edge),
            ..TickEffects::power_changed()
        }
    } else {
        device.signal.set_timer(Timer::Ramp, RAMP_STEP_TICKS);
        TickEffects::power_changed()
    }
}
