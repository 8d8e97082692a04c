//! Simulation configuration parameters
//!
//! All world-level tunables for the switch simulation core. The host
//! loads these from its own config surface and hands them to
//! `SwitchService` at construction; `update_config` swaps them at
//! runtime and recompiles the optout filter.

use serde::{Deserialize, Serialize};

/// Core simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    // --- Switch linking ---
    /// Master switch for the link protocol; when off, every link
    /// request resolves to `Rejected`
    pub links_enabled: bool,
    /// Maximum straight-line link distance in blocks (0 = unlimited)
    pub max_link_distance: u32,
    /// Relay-hop budget per logical trigger; chains beyond this are
    /// dropped with a warning instead of recursing forever
    pub max_relay_hops: u32,

    // --- Timing ---
    /// Pulse on-time (ticks) for pulse switches with no configured value
    pub default_pulse_ticks: u32,
    /// Back-off (ticks) before re-ticking a device whose tick faulted
    pub fault_retry_ticks: u32,
    /// Upper bound (exclusive) of the random jitter added to sensor
    /// evaluation intervals
    pub env_jitter_ticks: u32,

    // --- Feature opt-outs ---
    pub optout: OptoutSettings,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            // Linking
            links_enabled: true,
            max_link_distance: 48,
            max_relay_hops: 64,

            // Timing
            default_pulse_ticks: 20, // 1 s at 20 tps
            fault_retry_ticks: 100,  // 5 s
            env_jitter_ticks: 5,

            optout: OptoutSettings::default(),
        }
    }
}

/// Raw optout configuration as the host hands it over. Pattern lists are
/// comma-separated glob strings; they are split, trimmed and lower-cased
/// when compiled into an `OptoutFilter`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptoutSettings {
    /// Force-include patterns; a match here overrides everything else
    #[serde(default)]
    pub pattern_includes: String,
    /// Exclude patterns, consulted after includes
    #[serde(default)]
    pub pattern_excludes: String,

    // --- Category toggles ---
    #[serde(default)]
    pub without_gauges: bool,
    #[serde(default)]
    pub without_indicators: bool,
    #[serde(default)]
    pub without_bistable_switches: bool,
    #[serde(default)]
    pub without_pulse_switches: bool,
    #[serde(default)]
    pub without_contact_switches: bool,
    /// Environmental (light/rain/lightning) sensor switches
    #[serde(default)]
    pub without_automatic_switches: bool,
    #[serde(default)]
    pub without_timer_switches: bool,
    #[serde(default)]
    pub without_decorative: bool,
}
