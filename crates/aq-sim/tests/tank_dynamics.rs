//! Tank filling, draining, limit clamping and level-triggered rules.

use aq_controls::{Control, ControlAction, ControlCondition, Relation};
use aq_network::{LinkStatus, Network, NetworkBuilder};
use aq_sim::{SimOptions, Simulator};
use aq_results::BoundaryEventKind;

/// Reservoir filling a cylindrical tank through a long, narrow pipe.
fn fill_network() -> Network {
    let mut b = NetworkBuilder::new("fill");
    let r = b.add_reservoir("src", 30.0, None);
    let t = b.add_tank("tank", 0.0, 2.0, 0.0, 4.0, 2.0);
    b.add_pipe("fill", r, t, 500.0, 0.1, 130.0);
    b.build().unwrap()
}

#[test]
fn filling_tank_hits_its_limit_between_reports() {
    let network = fill_network();
    let tank_area = core::f64::consts::PI; // diameter 2

    let options = SimOptions {
        duration: 7200.0,
        ..SimOptions::default()
    };
    let mut sim = Simulator::new(&network, options, Vec::new()).unwrap();
    sim.run().unwrap();
    let results = sim.into_results();

    // The inflow at t=0 fixes when the level reaches the maximum.
    let q0 = results.records[0].flowrate[0];
    assert!(q0 > 0.0);
    let t_full = (4.0 - 2.0) * tank_area / q0;
    assert!(t_full < 3600.0, "expected the tank to fill mid-interval");

    let full_events: Vec<_> = results
        .events
        .iter()
        .filter(|e| matches!(e.kind, BoundaryEventKind::TankFull { .. }))
        .collect();
    assert_eq!(full_events.len(), 1);
    assert!(
        (full_events[0].time - t_full).abs() < 1e-6,
        "event at {} vs {}",
        full_events[0].time,
        t_full
    );

    // Clamped at the maximum from then on: head = elevation + max level.
    for rec in results.records.iter().filter(|r| r.time_s >= 3600.0) {
        assert!((rec.head[1] - 4.0).abs() < 1e-9);
    }
}

#[test]
fn draining_tank_clamps_at_its_minimum() {
    let mut b = NetworkBuilder::new("drain");
    let t = b.add_tank("tank", 20.0, 2.0, 0.5, 4.0, 2.0);
    let j = b.add_junction("city", 0.0, 0.005, None);
    b.add_pipe("out", t, j, 100.0, 0.3, 130.0);
    let network = b.build().unwrap();
    let tank_area = core::f64::consts::PI;

    let options = SimOptions {
        duration: 7200.0,
        ..SimOptions::default()
    };
    let mut sim = Simulator::new(&network, options, Vec::new()).unwrap();
    sim.run().unwrap();
    let results = sim.into_results();

    // Constant draw fixes the emptying time exactly.
    let t_empty = (2.0 - 0.5) * tank_area / 0.005;
    let empty_events: Vec<_> = results
        .events
        .iter()
        .filter(|e| matches!(e.kind, BoundaryEventKind::TankEmpty { .. }))
        .collect();
    assert_eq!(empty_events.len(), 1);
    assert!((empty_events[0].time - t_empty).abs() < 1e-6);

    for rec in results.records.iter().filter(|r| r.time_s > t_empty) {
        assert!((rec.head[0] - 20.5).abs() < 1e-9);
    }
}

#[test]
fn level_rule_stops_the_fill_at_its_threshold() {
    let network = fill_network();
    let tank = network.node_by_name("tank").unwrap();
    let fill = network.link_by_name("fill").unwrap();
    let tank_area = core::f64::consts::PI;

    let controls = vec![Control {
        name: "stop_fill_high".into(),
        condition: ControlCondition::TankLevel {
            tank,
            relation: Relation::Above,
            level: 3.0,
        },
        action: ControlAction::SetStatus {
            link: fill,
            status: LinkStatus::Closed,
        },
    }];

    let options = SimOptions {
        duration: 7200.0,
        ..SimOptions::default()
    };
    let mut sim = Simulator::new(&network, options, controls).unwrap();
    sim.run().unwrap();
    let results = sim.into_results();

    // The interval is truncated at the threshold crossing, so the rule
    // fires before the level ever exceeds 3.0.
    let q0 = results.records[0].flowrate[0];
    let t_cross = (3.0 - 2.0) * tank_area / q0;
    assert!(t_cross < 3600.0);

    for rec in results.records.iter().filter(|r| r.time_s >= 3600.0) {
        assert_eq!(rec.status[0], 0);
        assert!(rec.flowrate[0].abs() < 1e-9);
        assert!((rec.head[1] - 3.0).abs() < 1e-9);
    }

    // Never clamped at the physical maximum.
    assert!(results
        .events
        .iter()
        .all(|e| !matches!(e.kind, BoundaryEventKind::TankFull { .. })));
    // The closure shows up as a status event at the crossing time.
    assert!(results.events.iter().any(|e| matches!(
        &e.kind,
        BoundaryEventKind::StatusChanged { link, status: 0 } if link == "fill"
    ) && (e.time - t_cross).abs() < 1e-6));
}
