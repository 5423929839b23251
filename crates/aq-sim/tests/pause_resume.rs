//! Pausing a run, serializing the snapshot and resuming it must reproduce
//! an uninterrupted run.

use aq_controls::{Control, ControlAction, ControlCondition, Relation};
use aq_network::{LinkStatus, Network, NetworkBuilder};
use aq_results::BoundaryEventKind;
use aq_sim::{SimOptions, SimulationState, Simulator};

/// Diurnal-pattern network with a timed outage of the smaller main.
fn pattern_network() -> (Network, Vec<Control>) {
    let mut b = NetworkBuilder::new("pause");
    let pat = b.add_pattern("diurnal", 10_800.0, vec![0.7, 1.0, 1.3, 0.9]);
    let r = b.add_reservoir("src", 50.0, None);
    let j = b.add_junction("city", 0.0, 0.02, Some(pat));
    b.add_pipe("p1", r, j, 200.0, 0.3, 130.0);
    let p2 = b.add_pipe("p2", r, j, 200.0, 0.2, 110.0);
    let network = b.build().unwrap();

    let controls = vec![Control {
        name: "p2_out_at_noon".into(),
        condition: ControlCondition::SimTime { at: 43_200.0 },
        action: ControlAction::SetStatus {
            link: p2,
            status: LinkStatus::Closed,
        },
    }];
    (network, controls)
}

#[test]
fn resumed_run_matches_uninterrupted_run() {
    let (network, controls) = pattern_network();
    let options = SimOptions {
        duration: 86_400.0,
        ..SimOptions::default()
    };

    let mut full = Simulator::new(&network, options.clone(), controls.clone()).unwrap();
    full.run().unwrap();
    let full_results = full.into_results();

    // Pause exactly where the timed rule is due: the rule must fire once,
    // on the resumed half.
    let mut first = Simulator::new(&network, options, controls).unwrap();
    first.run_until(43_200.0).unwrap();
    let snapshot = first.snapshot();
    drop(first);

    let json = snapshot.to_json().unwrap();
    let restored = SimulationState::from_json(&json).unwrap();
    let mut second = Simulator::resume(&network, restored).unwrap();
    second.run().unwrap();
    let split_results = second.into_results();

    assert_eq!(full_results.len(), split_results.len());
    assert!(full_results.max_abs_diff(&split_results).unwrap() < 1e-7);
    assert_eq!(full_results.events, split_results.events);
    // The outage fired exactly once across the split.
    assert_eq!(
        split_results
            .events
            .iter()
            .filter(|e| matches!(e.kind, BoundaryEventKind::ControlFired { .. }))
            .count(),
        1
    );
}

#[test]
fn mid_interval_pause_reproduces_the_tank_trajectory() {
    // Wide tank, still filling for the whole run. Pausing in the middle of
    // an integration interval must not split it: the segment runs through
    // to the next committed step, keeping the grid of the full run.
    let mut b = NetworkBuilder::new("mid_pause");
    let r = b.add_reservoir("src", 30.0, None);
    let t = b.add_tank("tank", 0.0, 2.0, 0.0, 10.0, 10.0);
    b.add_pipe("fill", r, t, 500.0, 0.1, 130.0);
    let network = b.build().unwrap();
    let options = SimOptions {
        duration: 7200.0,
        ..SimOptions::default()
    };

    let mut full = Simulator::new(&network, options.clone(), Vec::new()).unwrap();
    full.run().unwrap();
    let full_results = full.into_results();

    let mut first = Simulator::new(&network, options, Vec::new()).unwrap();
    first.run_until(1800.0).unwrap();
    assert!((first.state().sim_time - 3600.0).abs() < 1e-9);

    let json = first.snapshot().to_json().unwrap();
    let mut second =
        Simulator::resume(&network, SimulationState::from_json(&json).unwrap()).unwrap();
    second.run().unwrap();
    let split_results = second.into_results();

    assert_eq!(full_results.len(), split_results.len());
    assert!(full_results.max_abs_diff(&split_results).unwrap() < 1e-7);
    assert_eq!(full_results.events, split_results.events);
}

#[test]
fn snapshot_carries_tank_levels_and_rule_bookkeeping() {
    let mut b = NetworkBuilder::new("tank_pause");
    let r = b.add_reservoir("src", 30.0, None);
    let t = b.add_tank("tank", 0.0, 2.0, 0.0, 4.0, 2.0);
    b.add_pipe("fill", r, t, 500.0, 0.1, 130.0);
    let network = b.build().unwrap();
    let fill = network.link_by_name("fill").unwrap();

    let controls = vec![Control {
        name: "stop_fill_high".into(),
        condition: ControlCondition::TankLevel {
            tank: network.node_by_name("tank").unwrap(),
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

    let mut full = Simulator::new(&network, options.clone(), controls.clone()).unwrap();
    full.run().unwrap();
    let full_results = full.into_results();

    // Pause after the rule has fired and flow has stopped.
    let mut first = Simulator::new(&network, options, controls).unwrap();
    first.run_until(1800.0).unwrap();
    let snapshot = first.snapshot();

    let json = snapshot.to_json().unwrap();
    let mut second =
        Simulator::resume(&network, SimulationState::from_json(&json).unwrap()).unwrap();
    second.run().unwrap();
    let split_results = second.into_results();

    assert!(full_results.max_abs_diff(&split_results).unwrap() < 1e-7);
    assert_eq!(full_results.events, split_results.events);
    // The edge-triggered rule did not re-fire after the resume.
    assert_eq!(split_results.status_series("fill"), Some(vec![1, 0, 0]));
}

#[test]
fn resume_rejects_a_mismatched_network() {
    let (network, controls) = pattern_network();
    let options = SimOptions::default();
    let sim = Simulator::new(&network, options, controls).unwrap();
    let snapshot = sim.snapshot();

    let mut b = NetworkBuilder::new("other");
    let r = b.add_reservoir("r", 10.0, None);
    let j = b.add_junction("j", 0.0, 0.001, None);
    b.add_pipe("p", r, j, 10.0, 0.1, 100.0);
    let other = b.build().unwrap();

    assert!(Simulator::resume(&other, snapshot).is_err());
}
