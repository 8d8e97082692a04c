//! Fuzz target: optout pattern compilation and evaluation
//!
//! Feeds arbitrary UTF-8 into the include/exclude pattern lists and the
//! evaluated registry name. Checks:
//! - Malformed globs degrade to toggles-only filtering, never panic
//! - `is_enabled` is total over any name a host registry can produce
//! - Category toggles still bite when pattern matching is out of play
//!
//! cargo fuzz run fuzz_optout_patterns

#![no_main]

use libfuzzer_sys::fuzz_target;
use switchlink::config::OptoutSettings;
use switchlink::optout::OptoutFilter;
use switchlink::signal::DeviceKind;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    // Everything before the first comma names the device, the rest
    // feeds the comma-separated pattern lists.
    let (name, patterns) = text.split_once(',').unwrap_or((text, ""));

    let settings = OptoutSettings {
        pattern_includes: patterns.to_string(),
        pattern_excludes: patterns.chars().rev().collect(),
        without_gauges: true,
        ..OptoutSettings::default()
    };
    let filter = OptoutFilter::compile(&settings);

    for kind in [
        DeviceKind::Gauge,
        DeviceKind::BistableSwitch,
        DeviceKind::ContactSwitch,
        DeviceKind::LinkRelay,
    ] {
        let _ = filter.is_enabled(name, kind.caps());
    }

    // With empty pattern lists only the toggles decide; the gauge
    // toggle must hold for any name.
    let toggles_only = OptoutFilter::compile(&OptoutSettings {
        without_gauges: true,
        ..OptoutSettings::default()
    });
    assert!(!toggles_only.is_enabled(name, DeviceKind::Gauge.caps()));
    assert!(toggles_only.is_enabled(name, DeviceKind::BistableSwitch.caps()));
});
