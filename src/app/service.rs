//! Switch service: the hexagonal core.
//!
//! [`SwitchService`] owns the device map, the simulation configuration,
//! the compiled optout filter and the link-resolution queue.  It exposes
//! a clean, host-agnostic API.  All I/O flows through port traits
//! injected at call sites, making the entire service testable with mock
//! adapters.
//!
//! ```text
//!   WorldPort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                 │      SwitchService      │
//!  NotifyPort ◀──│  devices · links · optout│
//! StoragePort ◀─▶└────────────────────────┘
//! ```
//!
//! Everything runs on the host's single simulation thread. Cross-device
//! link deliveries are queued and drained synchronously before control
//! returns, with a per-chain hop budget instead of unbounded re-entry.

use std::collections::{BTreeMap, VecDeque};

use log::{debug, error, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::SimConfig;
use crate::error::{Error, HostError, Result, TickFault};
use crate::link::{LinkAddress, LinkRequest, RequestKind, RequestResult, SwitchAction};
use crate::optout::OptoutFilter;
use crate::pos::BlockPos;
use crate::signal::{CapabilityFlags, DeviceKind, Timer};
use crate::switch::device::{Device, DeviceId, DeviceRecord, SensorSample};
use crate::switch::{self, TickEffects};

use super::commands::DeviceCommand;
use super::events::CoreEvent;
use super::ports::{EventSink, NotifyPort, StorageError, StoragePort, WorldPort};

/// Storage namespace for persisted device records.
const STORE_NAMESPACE: &str = "switch";

/// Generous ceiling for one encoded device record.
const RECORD_BUF_BYTES: usize = 8 * 1024;

fn record_key(id: DeviceId) -> String {
    format!("d{}", id.0)
}

/// One queued link delivery with its accumulated relay depth.
struct PendingLink {
    source: DeviceId,
    addr: LinkAddress,
    request: LinkRequest,
    hops: u32,
}

// ───────────────────────────────────────────────────────────────
// SwitchService
// ───────────────────────────────────────────────────────────────

/// The switch service orchestrates all domain logic.
pub struct SwitchService {
    config: SimConfig,
    filter: OptoutFilter,
    devices: BTreeMap<DeviceId, Device>,
    /// Link deliveries waiting to resolve this tick.
    pending: VecDeque<PendingLink>,
    /// Jitter source for sampling-interval desynchronisation.
    rng: SmallRng,
    last_tick: Option<u64>,
}

impl SwitchService {
    /// Construct the service from configuration, seeding the jitter
    /// source from OS entropy.
    pub fn new(config: SimConfig) -> Self {
        Self::with_rng(config, SmallRng::from_os_rng())
    }

    /// Construct with a deterministic jitter stream (tests, replays).
    pub fn seeded(config: SimConfig, seed: u64) -> Self {
        Self::with_rng(config, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(config: SimConfig, rng: SmallRng) -> Self {
        let filter = OptoutFilter::compile(&config.optout);
        Self {
            config,
            filter,
            devices: BTreeMap::new(),
            pending: VecDeque::new(),
            rng,
            last_tick: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce the service after the host has restored its devices.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&CoreEvent::Started {
            device_count: self.devices.len(),
        });
        info!("SwitchService started with {} devices", self.devices.len());
    }

    // ── Device lifecycle ──────────────────────────────────────

    /// Register a freshly placed device. Returns `false` (and registers
    /// nothing) when the optout filter disables the kind, so the host
    /// can cancel the placement. An existing device under the same id
    /// is replaced.
    pub fn place_device(
        &mut self,
        id: DeviceId,
        pos: BlockPos,
        kind_name: &str,
        kind: DeviceKind,
        extra_caps: CapabilityFlags,
    ) -> bool {
        let device = Device::new(id, pos, kind_name, kind, extra_caps);
        if !self.filter.is_enabled(&device.kind_name, device.signal.caps()) {
            info!("placement of {} at {} refused (opted out)", kind_name, pos);
            return false;
        }
        debug!("device {} placed at {} ({:?})", id, pos, kind);
        self.devices.insert(id, device);
        true
    }

    /// Drop a device and its persisted record.
    pub fn remove_device(&mut self, id: DeviceId, storage: &mut impl StoragePort) -> Result<()> {
        let device = self
            .devices
            .remove(&id)
            .ok_or(Error::UnknownDevice(id.0))?;
        if let Err(e) = storage.delete(STORE_NAMESPACE, &record_key(id)) {
            warn!("device {} record delete failed: {}", id, e);
        }
        debug!("device {} removed from {}", id, device.pos);
        Ok(())
    }

    // ── Persistence ───────────────────────────────────────────

    /// Restore one device from its stored record. A device whose kind
    /// has been opted out since the save still loads; it just stays
    /// dormant until the filter re-enables it.
    pub fn load_device(&mut self, id: DeviceId, storage: &impl StoragePort) -> Result<()> {
        let mut buf = vec![0u8; RECORD_BUF_BYTES];
        let len = storage
            .read(STORE_NAMESPACE, &record_key(id), &mut buf)
            .map_err(|e| {
                if e == StorageError::NotFound {
                    debug!("device {} has no stored record", id);
                } else {
                    warn!("device {} record read failed: {}", id, e);
                }
                Error::Host(HostError::StorageRead)
            })?;
        let record: DeviceRecord = postcard::from_bytes(&buf[..len]).map_err(|e| {
            error!("device {} record decode failed: {}", id, e);
            Error::Host(HostError::Decode)
        })?;
        let device = Device::from_record(id, record);
        debug!("device {} restored at {}", id, device.pos);
        self.devices.insert(id, device);
        Ok(())
    }

    /// Write one device's record to storage.
    pub fn persist_device(&self, id: DeviceId, storage: &mut impl StoragePort) -> Result<()> {
        let device = self.devices.get(&id).ok_or(Error::UnknownDevice(id.0))?;
        let bytes = postcard::to_allocvec(&device.to_record()).map_err(|e| {
            error!("device {} record encode failed: {}", id, e);
            Error::Host(HostError::Encode)
        })?;
        storage
            .write(STORE_NAMESPACE, &record_key(id), &bytes)
            .map_err(|e| {
                warn!("device {} record write failed: {}", id, e);
                Error::Host(HostError::StorageWrite)
            })?;
        Ok(())
    }

    /// Persist every device (host save event). A failed write is
    /// contained per device: logged, reported through the sink, and the
    /// remaining devices still persist. Returns the number written.
    pub fn persist_all(&self, storage: &mut impl StoragePort, sink: &mut impl EventSink) -> usize {
        let mut written = 0;
        for &id in self.devices.keys() {
            match self.persist_device(id, storage) {
                Ok(()) => written += 1,
                Err(Error::Host(e)) => {
                    sink.emit(&CoreEvent::TickFault {
                        id,
                        fault: TickFault::Persist(e),
                    });
                }
                Err(_) => {}
            }
        }
        written
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one simulation tick over every device.
    ///
    /// Each device is advanced and its side effects applied through the
    /// ports; link chains it starts are drained before the next device
    /// runs. A fault inside one device's tick is contained there: the
    /// device keeps its last-known-good state and sits out
    /// `fault_retry_ticks` before sampling again.
    pub fn tick(
        &mut self,
        world: &mut impl WorldPort,
        notify: &mut impl NotifyPort,
        sink: &mut impl EventSink,
    ) {
        let now = world.current_tick();
        let dt = match self.last_tick {
            // Host skipped ticks (lag spike): advance timers by the gap.
            Some(prev) => now.saturating_sub(prev).min(u64::from(u32::MAX)) as u32,
            None => 1,
        };
        self.last_tick = Some(now);

        let ids: Vec<DeviceId> = self.devices.keys().copied().collect();
        for id in ids {
            self.tick_one(id, now, dt, world, notify, sink);
            self.drain_links(world, notify, sink);
        }
    }

    fn tick_one(
        &mut self,
        id: DeviceId,
        now: u64,
        dt: u32,
        world: &mut impl WorldPort,
        notify: &mut impl NotifyPort,
        sink: &mut impl EventSink,
    ) {
        let Some(device) = self.devices.get_mut(&id) else {
            return;
        };

        // Opted-out devices stay placed but fully dormant.
        if !self.filter.is_enabled(&device.kind_name, device.signal.caps()) {
            return;
        }

        // Fault back-off: the whole device freezes (timers included)
        // until the retry delay runs down on its own.
        if device.fault_backoff {
            let left = device.signal.timer(Timer::Interval);
            if left <= dt {
                device.signal.clear_timer(Timer::Interval);
                device.fault_backoff = false;
                debug!("device {} resumes after fault back-off", id);
            } else {
                device.signal.set_timer(Timer::Interval, left - dt);
            }
            return;
        }

        // Only pay for a host sample (entity scans in particular) when
        // the tick function is going to read it.
        let sample = if switch::wants_sample(device, now, dt) {
            match world.sample(id, device.pos) {
                Ok(sample) => sample,
                Err(e) => {
                    let fault = TickFault::Sample(e);
                    error!(
                        "device {} tick fault: {} (retry in {} ticks)",
                        id, fault, self.config.fault_retry_ticks
                    );
                    device.fault_backoff = true;
                    device
                        .signal
                        .set_timer(Timer::Interval, self.config.fault_retry_ticks);
                    sink.emit(&CoreEvent::TickFault { id, fault });
                    return;
                }
            }
        } else {
            SensorSample::default()
        };

        let fx = switch::tick_device(device, now, dt, &sample, &self.config, &mut self.rng);
        self.apply_effects(id, fx, 0, notify, sink);
    }

    // ── Command handling ──────────────────────────────────────

    /// Process a discrete host event for one device.
    ///
    /// Activation paths (use, shock, neighbor refresh) are ignored while
    /// the device's kind is opted out; link and tuning edits still apply.
    pub fn handle_command(
        &mut self,
        cmd: DeviceCommand,
        world: &mut impl WorldPort,
        notify: &mut impl NotifyPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            DeviceCommand::Interact { id, actor } => {
                let Some(device) = self.devices.get_mut(&id) else {
                    return Err(Error::UnknownDevice(id.0));
                };
                if !self.filter.is_enabled(&device.kind_name, device.signal.caps()) {
                    debug!("device {} opted out; use ignored", id);
                    return Ok(());
                }
                debug!("device {} used by actor {}", id, actor.0);
                if let Some(fx) = switch::interact(device, &self.config) {
                    self.apply_effects(id, fx, 0, notify, sink);
                }
            }
            DeviceCommand::Shock { id } => {
                let Some(device) = self.devices.get_mut(&id) else {
                    return Err(Error::UnknownDevice(id.0));
                };
                if !self.filter.is_enabled(&device.kind_name, device.signal.caps()) {
                    return Ok(());
                }
                if let Some(fx) = switch::shock(device, &self.config) {
                    self.apply_effects(id, fx, 0, notify, sink);
                }
            }
            DeviceCommand::NeighborChanged { id } => {
                let Some(device) = self.devices.get_mut(&id) else {
                    return Err(Error::UnknownDevice(id.0));
                };
                if !self.filter.is_enabled(&device.kind_name, device.signal.caps()) {
                    return Ok(());
                }
                let sample = match world.sample(id, device.pos) {
                    Ok(sample) => sample,
                    Err(e) => {
                        // Same containment as a periodic tick.
                        let fault = TickFault::Sample(e);
                        error!(
                            "device {} neighbor refresh fault: {} (retry in {} ticks)",
                            id, fault, self.config.fault_retry_ticks
                        );
                        device.fault_backoff = true;
                        device
                            .signal
                            .set_timer(Timer::Interval, self.config.fault_retry_ticks);
                        sink.emit(&CoreEvent::TickFault { id, fault });
                        return Err(Error::Tick(fault));
                    }
                };
                let fx = switch::neighbor_changed(device, &sample, &self.config);
                self.apply_effects(id, fx, 0, notify, sink);
            }
            DeviceCommand::AddLink { id, link } => {
                let Some(device) = self.devices.get_mut(&id) else {
                    return Err(Error::UnknownDevice(id.0));
                };
                // Addresses are weak references: validity is judged at
                // resolve time, not here.
                if device.links.contains(&link) {
                    debug!("device {} already links {}", id, link.pos);
                } else {
                    debug!("device {} links {} ({:?})", id, link.pos, link.mode);
                    device.links.push(link);
                }
            }
            DeviceCommand::ClearLinks { id } => {
                let Some(device) = self.devices.get_mut(&id) else {
                    return Err(Error::UnknownDevice(id.0));
                };
                debug!("device {} cleared {} links", id, device.links.len());
                device.links.clear();
            }
            DeviceCommand::SetTuning { id, tuning } => {
                let Some(device) = self.devices.get_mut(&id) else {
                    return Err(Error::UnknownDevice(id.0));
                };
                device.set_tuning(tuning);
                debug!("device {} retuned", id);
            }
        }
        self.drain_links(world, notify, sink);
        Ok(())
    }

    // ── Link resolution ───────────────────────────────────────

    /// Resolve one request against a stored address right now (the
    /// linking tool's test fire), then drain any relay chain it starts.
    /// The returned result's `Display` text is the overlay feedback.
    pub fn resolve_link(
        &mut self,
        source: DeviceId,
        addr: &LinkAddress,
        request: LinkRequest,
        world: &mut impl WorldPort,
        notify: &mut impl NotifyPort,
        sink: &mut impl EventSink,
    ) -> RequestResult {
        let link = PendingLink {
            source,
            addr: addr.clone(),
            request,
            // A direct delivery counts as the chain's first hop.
            hops: 1,
        };
        let result = self.resolve_one(&link, world, notify, sink);
        sink.emit(&CoreEvent::LinkResolved {
            source,
            target: addr.clone(),
            result,
        });
        self.drain_links(world, notify, sink);
        result
    }

    /// Pops and resolves queued deliveries until the queue is empty.
    /// Deliveries a resolution enqueues (relay fan-out) run in arrival
    /// order within the same drain.
    fn drain_links(
        &mut self,
        world: &impl WorldPort,
        notify: &mut impl NotifyPort,
        sink: &mut impl EventSink,
    ) {
        while let Some(link) = self.pending.pop_front() {
            let result = self.resolve_one(&link, world, notify, sink);
            debug!(
                "link {} -> {}: {}",
                link.request.source, link.addr.pos, result
            );
            sink.emit(&CoreEvent::LinkResolved {
                source: link.source,
                target: link.addr,
                result,
            });
        }
    }

    /// The resolution ladder for one delivery. Every failure is a result
    /// code, not an error; severity increases down the ladder.
    fn resolve_one(
        &mut self,
        link: &PendingLink,
        world: &impl WorldPort,
        notify: &mut impl NotifyPort,
        sink: &mut impl EventSink,
    ) -> RequestResult {
        if !self.config.links_enabled {
            return RequestResult::Rejected;
        }
        if !link.addr.is_valid() {
            return RequestResult::InvalidLinkData;
        }
        let max = self.config.max_link_distance;
        if max > 0 && link.request.source.distance(link.addr.pos) > max {
            return RequestResult::TooFar;
        }

        let Some(handle) = world.device_at(link.addr.pos) else {
            return RequestResult::TargetUnavailable;
        };
        if handle.kind_name != link.addr.block {
            // The block at the address was replaced since link time.
            return RequestResult::TargetUnavailable;
        }
        let Some(target) = self.devices.get(&handle.id) else {
            return RequestResult::TargetUnavailable;
        };
        if !self.filter.is_enabled(&target.kind_name, target.signal.caps()) {
            return RequestResult::TargetUnavailable;
        }
        if !target.signal.caps().is_link_target() {
            return RequestResult::Rejected;
        }

        let action = if link.request.actor.is_some() {
            // A player-carried request bypasses mode gating.
            match link.request.kind {
                RequestKind::Activate => SwitchAction::Activate,
                RequestKind::Deactivate => SwitchAction::Deactivate,
            }
        } else {
            let gated = link.addr.mode.gate(
                link.request.kind,
                target.signal.is_active(),
                target.signal.caps().is_pulse(),
            );
            match gated {
                Some(action) => action,
                None => return RequestResult::NotMatched,
            }
        };

        let target_id = handle.id;
        let Some(device) = self.devices.get_mut(&target_id) else {
            return RequestResult::TargetUnavailable;
        };
        match switch::apply_action(device, action, &self.config) {
            Some(fx) => {
                self.apply_effects(target_id, fx, link.hops, notify, sink);
                RequestResult::Ok
            }
            None => RequestResult::Rejected,
        }
    }

    // ── Effects ───────────────────────────────────────────────

    /// Runs a device's tick effects through the ports and queues its
    /// link broadcast. `hops` is the relay depth of whatever caused the
    /// effects (0 for tick/command origins).
    fn apply_effects(
        &mut self,
        id: DeviceId,
        fx: TickEffects,
        hops: u32,
        notify: &mut impl NotifyPort,
        sink: &mut impl EventSink,
    ) {
        if fx.is_none() {
            return;
        }
        let Some(device) = self.devices.get(&id) else {
            return;
        };
        let pos = device.pos;
        let active = device.signal.is_active();
        let power = device.signal.power();
        let broadcast = match fx.link_edge {
            Some(edge) if device.signal.caps().is_link_source() && !device.links.is_empty() => {
                Some((edge, device.links.clone()))
            }
            _ => None,
        };

        if let Some(cue) = fx.sound {
            notify.play_sound(id, cue);
        }
        if fx.notify_neighbors {
            notify.notify_neighbors(id);
        }
        if fx.redraw {
            sink.emit(&CoreEvent::SwitchChanged { id, active, power });
        }

        if let Some((edge, links)) = broadcast {
            let next_hops = hops + 1;
            if next_hops > self.config.max_relay_hops {
                warn!(
                    "relay chain from {} cut at hop budget {}",
                    pos, self.config.max_relay_hops
                );
                sink.emit(&CoreEvent::HopBudgetExhausted { source: pos });
                return;
            }
            let request = LinkRequest::device(edge.request_kind(), pos);
            for addr in links {
                self.pending.push_back(PendingLink {
                    source: id,
                    addr,
                    request,
                    hops: next_hops,
                });
            }
        }
    }

    // ── Configuration ─────────────────────────────────────────

    /// Hot-swap the configuration and recompile the optout filter.
    pub fn update_config(&mut self, config: SimConfig) {
        self.filter = OptoutFilter::compile(&config.optout);
        self.config = config;
        info!("configuration updated at runtime");
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}
