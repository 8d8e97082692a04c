//! Integration tests for link routing: the resolution ladder, mode
//! gating against live targets, the player bypass and the relay hop
//! budget.

use crate::mock_hw::{EventLog, MockNotify, MockWorld};

use switchlink::app::commands::DeviceCommand;
use switchlink::app::service::SwitchService;
use switchlink::config::SimConfig;
use switchlink::link::{ActorId, LinkAddress, LinkRequest, RelayMode, RequestKind, RequestResult};
use switchlink::pos::BlockPos;
use switchlink::signal::{CapabilityFlags, DeviceKind, Timer};
use switchlink::switch::device::DeviceId;

fn harness() -> (SwitchService, MockWorld, MockNotify, EventLog) {
    (
        SwitchService::seeded(SimConfig::default(), 11),
        MockWorld::new(),
        MockNotify::new(),
        EventLog::new(),
    )
}

fn kind_name(kind: DeviceKind) -> &'static str {
    match kind {
        DeviceKind::Gauge => "switchlink:gauge",
        DeviceKind::Indicator => "switchlink:indicator",
        DeviceKind::BistableSwitch => "switchlink:lever",
        DeviceKind::PulseSwitch => "switchlink:button",
        DeviceKind::ContactSwitch => "switchlink:contact_mat",
        DeviceKind::EnvironmentalSwitch => "switchlink:day_sensor",
        DeviceKind::IntervalTimerSwitch => "switchlink:interval_timer",
        DeviceKind::LinkRelay => "switchlink:link_relay",
    }
}

fn place(
    svc: &mut SwitchService,
    world: &mut MockWorld,
    id: u64,
    pos: BlockPos,
    kind: DeviceKind,
) -> DeviceId {
    let id = DeviceId(id);
    assert!(svc.place_device(id, pos, kind_name(kind), kind, CapabilityFlags::NONE));
    world.put_device(pos, id, kind_name(kind));
    id
}

fn add_link(
    svc: &mut SwitchService,
    world: &mut MockWorld,
    notify: &mut MockNotify,
    log: &mut EventLog,
    id: DeviceId,
    target: BlockPos,
    block: &str,
    mode: RelayMode,
) {
    svc.handle_command(
        DeviceCommand::AddLink {
            id,
            link: LinkAddress::new(target, block, mode),
        },
        world,
        notify,
        log,
    )
    .unwrap();
}

fn flip(
    svc: &mut SwitchService,
    world: &mut MockWorld,
    notify: &mut MockNotify,
    log: &mut EventLog,
    id: DeviceId,
) {
    svc.handle_command(
        DeviceCommand::Interact {
            id,
            actor: ActorId(1),
        },
        world,
        notify,
        log,
    )
    .unwrap();
}

// ── Happy path and state gating ──────────────────────────────

#[test]
fn state_link_drives_remote_lever() {
    let (mut svc, mut world, mut notify, mut log) = harness();
    let pa = BlockPos::new(10, 64, 10);
    let pb = BlockPos::new(20, 64, 10);
    let a = place(&mut svc, &mut world, 1, pa, DeviceKind::BistableSwitch);
    let b = place(&mut svc, &mut world, 2, pb, DeviceKind::BistableSwitch);
    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        a,
        pb,
        "switchlink:lever",
        RelayMode::State,
    );

    flip(&mut svc, &mut world, &mut notify, &mut log, a);
    assert!(svc.device(b).unwrap().signal.is_active());
    assert_eq!(log.link_results(), vec![RequestResult::Ok]);

    flip(&mut svc, &mut world, &mut notify, &mut log, a);
    assert!(!svc.device(b).unwrap().signal.is_active());
    assert_eq!(
        log.link_results(),
        vec![RequestResult::Ok, RequestResult::Ok]
    );
}

#[test]
fn state_link_reports_unchanged_targets() {
    let (mut svc, mut world, mut notify, mut log) = harness();
    let pa = BlockPos::new(10, 64, 10);
    let pb = BlockPos::new(20, 64, 10);
    let a = place(&mut svc, &mut world, 1, pa, DeviceKind::BistableSwitch);
    let b = place(&mut svc, &mut world, 2, pb, DeviceKind::BistableSwitch);
    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        a,
        pb,
        "switchlink:lever",
        RelayMode::State,
    );

    // Target is already high when the rising edge arrives.
    flip(&mut svc, &mut world, &mut notify, &mut log, b);
    flip(&mut svc, &mut world, &mut notify, &mut log, a);

    assert_eq!(log.link_results(), vec![RequestResult::NotMatched]);
    assert!(svc.device(b).unwrap().signal.is_active());
}

#[test]
fn pulse_targets_never_take_link_deactivations() {
    let (mut svc, mut world, mut notify, mut log) = harness();
    let pa = BlockPos::new(10, 64, 10);
    let pb = BlockPos::new(16, 64, 10);
    let a = place(&mut svc, &mut world, 1, pa, DeviceKind::BistableSwitch);
    let b = place(&mut svc, &mut world, 2, pb, DeviceKind::PulseSwitch);
    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        a,
        pb,
        "switchlink:button",
        RelayMode::State,
    );

    // Rising edge fires the button.
    flip(&mut svc, &mut world, &mut notify, &mut log, a);
    assert!(svc.device(b).unwrap().signal.is_active());

    // Falling edge is dropped: only the on-timer may end a pulse.
    flip(&mut svc, &mut world, &mut notify, &mut log, a);
    assert!(svc.device(b).unwrap().signal.is_active());
    assert_eq!(
        log.link_results(),
        vec![RequestResult::Ok, RequestResult::NotMatched]
    );
}

#[test]
fn pulse_rearm_counts_as_applied_without_a_new_edge() {
    let (mut svc, mut world, mut notify, mut log) = harness();
    let pa = BlockPos::new(10, 64, 10);
    let pb = BlockPos::new(16, 64, 10);
    let a = place(&mut svc, &mut world, 1, pa, DeviceKind::BistableSwitch);
    let b = place(&mut svc, &mut world, 2, pb, DeviceKind::PulseSwitch);
    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        a,
        pb,
        "switchlink:button",
        RelayMode::Activate,
    );

    flip(&mut svc, &mut world, &mut notify, &mut log, b);
    for _ in 0..5 {
        world.advance(1);
        svc.tick(&mut world, &mut notify, &mut log);
    }
    let pulse = svc.config().default_pulse_ticks;
    assert_eq!(svc.device(b).unwrap().signal.timer(Timer::OnTime), pulse - 5);

    // The incoming activation reloads the timer but emits no edge.
    flip(&mut svc, &mut world, &mut notify, &mut log, a);
    assert_eq!(log.link_results(), vec![RequestResult::Ok]);
    assert_eq!(svc.device(b).unwrap().signal.timer(Timer::OnTime), pulse);
    assert_eq!(log.changes_for(b), 1, "re-arm is silent");
}

// ── Relay chains and the hop budget ──────────────────────────

#[test]
fn relay_passes_edges_downstream() {
    let (mut svc, mut world, mut notify, mut log) = harness();
    let pa = BlockPos::new(10, 64, 10);
    let pr = BlockPos::new(20, 64, 10);
    let pc = BlockPos::new(30, 64, 10);
    let a = place(&mut svc, &mut world, 1, pa, DeviceKind::BistableSwitch);
    let r = place(&mut svc, &mut world, 2, pr, DeviceKind::LinkRelay);
    let c = place(&mut svc, &mut world, 3, pc, DeviceKind::BistableSwitch);
    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        a,
        pr,
        "switchlink:link_relay",
        RelayMode::State,
    );
    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        r,
        pc,
        "switchlink:lever",
        RelayMode::State,
    );

    flip(&mut svc, &mut world, &mut notify, &mut log, a);
    assert!(svc.device(r).unwrap().signal.is_active());
    assert!(svc.device(c).unwrap().signal.is_active());
    assert_eq!(
        log.link_results(),
        vec![RequestResult::Ok, RequestResult::Ok]
    );

    flip(&mut svc, &mut world, &mut notify, &mut log, a);
    assert!(!svc.device(r).unwrap().signal.is_active());
    assert!(!svc.device(c).unwrap().signal.is_active());
    assert!(log.link_results().iter().all(|res| res.is_ok()));
}

#[test]
fn toggle_ring_stops_at_the_hop_budget() {
    let config = SimConfig {
        max_relay_hops: 8,
        ..SimConfig::default()
    };
    let mut svc = SwitchService::seeded(config, 11);
    let mut world = MockWorld::new();
    let mut notify = MockNotify::new();
    let mut log = EventLog::new();
    let pa = BlockPos::new(10, 64, 10);
    let pb = BlockPos::new(14, 64, 10);
    let a = place(&mut svc, &mut world, 1, pa, DeviceKind::BistableSwitch);
    let b = place(&mut svc, &mut world, 2, pb, DeviceKind::BistableSwitch);
    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        a,
        pb,
        "switchlink:lever",
        RelayMode::Toggle,
    );
    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        b,
        pa,
        "switchlink:lever",
        RelayMode::Toggle,
    );

    flip(&mut svc, &mut world, &mut notify, &mut log, a);

    // Exactly one delivery per hop, all applied, then the cut.
    let results = log.link_results();
    assert_eq!(results.len(), 8);
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(log.hop_cuts(), 1);

    // Eight toggles landed alternately: four on each device.
    assert!(svc.device(a).unwrap().signal.is_active());
    assert!(!svc.device(b).unwrap().signal.is_active());
    assert_eq!(log.changes_for(a), 5);
    assert_eq!(log.changes_for(b), 4);
}

#[test]
fn state_rings_terminate_by_gating_alone() {
    let (mut svc, mut world, mut notify, mut log) = harness();
    let pa = BlockPos::new(10, 64, 10);
    let pb = BlockPos::new(14, 64, 10);
    let a = place(&mut svc, &mut world, 1, pa, DeviceKind::BistableSwitch);
    let b = place(&mut svc, &mut world, 2, pb, DeviceKind::BistableSwitch);
    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        a,
        pb,
        "switchlink:lever",
        RelayMode::State,
    );
    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        b,
        pa,
        "switchlink:lever",
        RelayMode::State,
    );

    flip(&mut svc, &mut world, &mut notify, &mut log, a);
    flip(&mut svc, &mut world, &mut notify, &mut log, a);

    // Each edge crosses the ring once, then the echo is not matched.
    assert_eq!(
        log.link_results(),
        vec![
            RequestResult::Ok,
            RequestResult::NotMatched,
            RequestResult::Ok,
            RequestResult::NotMatched,
        ]
    );
    assert_eq!(log.hop_cuts(), 0);
    assert!(!svc.device(a).unwrap().signal.is_active());
    assert!(!svc.device(b).unwrap().signal.is_active());
}

// ── Resolution ladder failures ───────────────────────────────

#[test]
fn out_of_range_links_fail_until_range_is_lifted() {
    let (mut svc, mut world, mut notify, mut log) = harness();
    let pa = BlockPos::new(10, 64, 10);
    let pb = BlockPos::new(70, 64, 10);
    let a = place(&mut svc, &mut world, 1, pa, DeviceKind::BistableSwitch);
    let b = place(&mut svc, &mut world, 2, pb, DeviceKind::BistableSwitch);
    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        a,
        pb,
        "switchlink:lever",
        RelayMode::Toggle,
    );

    // 60 blocks apart, default ceiling is 48.
    flip(&mut svc, &mut world, &mut notify, &mut log, a);
    assert_eq!(log.link_results(), vec![RequestResult::TooFar]);
    assert!(!svc.device(b).unwrap().signal.is_active());

    // Zero means unlimited.
    svc.update_config(SimConfig {
        max_link_distance: 0,
        ..SimConfig::default()
    });
    flip(&mut svc, &mut world, &mut notify, &mut log, a);
    assert_eq!(
        log.link_results(),
        vec![RequestResult::TooFar, RequestResult::Ok]
    );
    assert!(svc.device(b).unwrap().signal.is_active());
}

#[test]
fn missing_replaced_and_unknown_targets_are_unavailable() {
    let (mut svc, mut world, mut notify, mut log) = harness();
    let pa = BlockPos::new(10, 64, 10);
    let a = place(&mut svc, &mut world, 1, pa, DeviceKind::BistableSwitch);

    // Nothing at the address at all.
    let empty = BlockPos::new(12, 64, 10);
    // A different block replaced the recorded one.
    let replaced = BlockPos::new(14, 64, 10);
    world.put_device(replaced, DeviceId(50), "switchlink:button");
    // The world sees a device the service never loaded.
    let unknown = BlockPos::new(16, 64, 10);
    world.put_device(unknown, DeviceId(77), "switchlink:lever");

    for pos in [empty, replaced, unknown] {
        add_link(
            &mut svc,
            &mut world,
            &mut notify,
            &mut log,
            a,
            pos,
            "switchlink:lever",
            RelayMode::State,
        );
    }

    flip(&mut svc, &mut world, &mut notify, &mut log, a);
    assert_eq!(
        log.link_results(),
        vec![RequestResult::TargetUnavailable; 3]
    );
}

#[test]
fn unusable_addresses_short_circuit() {
    let (mut svc, mut world, mut notify, mut log) = harness();
    let pa = BlockPos::new(10, 64, 10);
    let a = place(&mut svc, &mut world, 1, pa, DeviceKind::BistableSwitch);

    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        a,
        BlockPos::new(12, 64, 10),
        "",
        RelayMode::State,
    );
    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        a,
        BlockPos::ORIGIN,
        "switchlink:lever",
        RelayMode::State,
    );

    flip(&mut svc, &mut world, &mut notify, &mut log, a);
    assert_eq!(
        log.link_results(),
        vec![RequestResult::InvalidLinkData; 2]
    );
}

#[test]
fn disabled_linking_rejects_everything() {
    let config = SimConfig {
        links_enabled: false,
        ..SimConfig::default()
    };
    let mut svc = SwitchService::seeded(config, 11);
    let mut world = MockWorld::new();
    let mut notify = MockNotify::new();
    let mut log = EventLog::new();
    let pa = BlockPos::new(10, 64, 10);
    let pb = BlockPos::new(20, 64, 10);
    let a = place(&mut svc, &mut world, 1, pa, DeviceKind::BistableSwitch);
    let b = place(&mut svc, &mut world, 2, pb, DeviceKind::BistableSwitch);
    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        a,
        pb,
        "switchlink:lever",
        RelayMode::State,
    );

    flip(&mut svc, &mut world, &mut notify, &mut log, a);
    assert_eq!(log.link_results(), vec![RequestResult::Rejected]);
    assert!(!svc.device(b).unwrap().signal.is_active());
}

#[test]
fn non_target_kinds_reject_delivery() {
    let (mut svc, mut world, mut notify, mut log) = harness();
    let pa = BlockPos::new(10, 64, 10);
    let pm = BlockPos::new(14, 64, 10);
    let a = place(&mut svc, &mut world, 1, pa, DeviceKind::BistableSwitch);
    // Contact mats source links but never accept them.
    place(&mut svc, &mut world, 2, pm, DeviceKind::ContactSwitch);
    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        a,
        pm,
        "switchlink:contact_mat",
        RelayMode::State,
    );

    flip(&mut svc, &mut world, &mut notify, &mut log, a);
    assert_eq!(log.link_results(), vec![RequestResult::Rejected]);
}

#[test]
fn opted_out_targets_are_unavailable() {
    let (mut svc, mut world, mut notify, mut log) = harness();
    let pa = BlockPos::new(10, 64, 10);
    let pb = BlockPos::new(20, 64, 10);
    let a = place(&mut svc, &mut world, 1, pa, DeviceKind::PulseSwitch);
    let b = place(&mut svc, &mut world, 2, pb, DeviceKind::BistableSwitch);
    add_link(
        &mut svc,
        &mut world,
        &mut notify,
        &mut log,
        a,
        pb,
        "switchlink:lever",
        RelayMode::State,
    );

    let mut config = SimConfig::default();
    config.optout.without_bistable_switches = true;
    svc.update_config(config);

    flip(&mut svc, &mut world, &mut notify, &mut log, a);
    assert_eq!(log.link_results(), vec![RequestResult::TargetUnavailable]);
    assert!(!svc.device(b).unwrap().signal.is_active());
}

// ── The linking tool's test fire ─────────────────────────────

#[test]
fn player_test_fire_bypasses_mode_gating() {
    let (mut svc, mut world, mut notify, mut log) = harness();
    let pa = BlockPos::new(10, 64, 10);
    let pb = BlockPos::new(20, 64, 10);
    let a = place(&mut svc, &mut world, 1, pa, DeviceKind::BistableSwitch);
    let b = place(&mut svc, &mut world, 2, pb, DeviceKind::BistableSwitch);
    flip(&mut svc, &mut world, &mut notify, &mut log, b);

    // The stored mode only passes rising edges, but a player-carried
    // deactivation is delivered regardless.
    let addr = LinkAddress::new(pb, "switchlink:lever", RelayMode::Activate);
    let result = svc.resolve_link(
        a,
        &addr,
        LinkRequest::player(RequestKind::Deactivate, pa, ActorId(9)),
        &mut world,
        &mut notify,
        &mut log,
    );
    assert_eq!(result, RequestResult::Ok);
    assert!(!svc.device(b).unwrap().signal.is_active());

    // The same edge without a player behind it is gated out.
    flip(&mut svc, &mut world, &mut notify, &mut log, b);
    let result = svc.resolve_link(
        a,
        &addr,
        LinkRequest::device(RequestKind::Deactivate, pa),
        &mut world,
        &mut notify,
        &mut log,
    );
    assert_eq!(result, RequestResult::NotMatched);
    assert!(svc.device(b).unwrap().signal.is_active());
    assert_eq!(
        log.link_results(),
        vec![RequestResult::Ok, RequestResult::NotMatched]
    );
}
