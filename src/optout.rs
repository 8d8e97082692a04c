//! Feature opt-out filter.
//!
//! Server owners can disable whole device categories or pick individual
//! devices by registry-name glob. The filter is compiled once from
//! [`OptoutSettings`] and consulted before a device is ticked, placed or
//! link-targeted. Evaluation order (first match wins): include pattern,
//! exclude pattern, category toggle, default enabled.
//!
//! Pattern compilation must never take the simulation down: a malformed
//! glob logs a warning and disables pattern matching for the rest of the
//! session, leaving the category toggles in force.

use globset::{Glob, GlobSet, GlobSetBuilder};
use log::warn;

use crate::config::OptoutSettings;
use crate::signal::CapabilityFlags;

/// Compiled opt-out decision table. Pure function of configuration;
/// rebuild via [`OptoutFilter::compile`] whenever the config changes.
#[derive(Debug)]
pub struct OptoutFilter {
    include: GlobSet,
    exclude: GlobSet,
    /// Cleared when any pattern failed to compile.
    patterns_usable: bool,
    toggles: OptoutSettings,
}

impl Default for OptoutFilter {
    fn default() -> Self {
        Self::compile(&OptoutSettings::default())
    }
}

impl OptoutFilter {
    /// Builds the filter from raw settings. Never fails: unusable
    /// patterns degrade to toggles-only filtering.
    pub fn compile(settings: &OptoutSettings) -> Self {
        let mut patterns_usable = true;
        let include = build_globset(&settings.pattern_includes, &mut patterns_usable);
        let exclude = build_globset(&settings.pattern_excludes, &mut patterns_usable);
        Self {
            include,
            exclude,
            patterns_usable,
            toggles: settings.clone(),
        }
    }

    /// Whether the named device is enabled in this world.
    ///
    /// `name` is the device's registry name; `caps` its capability
    /// flags (the category toggles key off those, not the name).
    pub fn is_enabled(&self, name: &str, caps: CapabilityFlags) -> bool {
        let name = name.trim().to_ascii_lowercase();
        if self.patterns_usable {
            if self.include.is_match(&name) {
                return true;
            }
            if self.exclude.is_match(&name) {
                return false;
            }
        }
        !self.category_disabled(caps)
    }

    /// Category toggles, most specific kind first so every device falls
    /// into exactly one bucket. Decorative is an orthogonal veto.
    fn category_disabled(&self, caps: CapabilityFlags) -> bool {
        let t = &self.toggles;
        if t.without_decorative && caps.is_decorative() {
            return true;
        }
        if caps.is_gauge() {
            t.without_gauges
        } else if caps.is_indicator() {
            t.without_indicators
        } else if caps.is_contact_sensor() {
            t.without_contact_switches
        } else if caps.is_environmental() {
            t.without_automatic_switches
        } else if caps.is_timer_driven() {
            t.without_timer_switches
        } else if caps.is_pulse() {
            t.without_pulse_switches
        } else if caps.is_bistable() {
            t.without_bistable_switches
        } else {
            false
        }
    }
}

/// Splits a comma-separated pattern list, lower-cases and trims each
/// entry, and compiles the lot into one whole-string glob set. On any
/// compile failure the set comes back empty and `usable` is cleared.
fn build_globset(raw: &str, usable: &mut bool) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in raw
        .split(',')
        .map(|p| p.trim().to_ascii_lowercase())
        .filter(|p| !p.is_empty())
    {
        match Glob::new(&pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => {
                warn!("optout pattern '{}' rejected, pattern filtering disabled: {}", pattern, e);
                *usable = false;
                return GlobSet::empty();
            }
        }
    }
    match builder.build() {
        Ok(set) => set,
        Err(e) => {
            warn!("optout pattern set failed to build, pattern filtering disabled: {}", e);
            *usable = false;
            GlobSet::empty()
        }
    }
}
