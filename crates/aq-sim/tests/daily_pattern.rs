//! 24-hour runs against independently computed hydraulics.

use aq_controls::{Control, ControlAction, ControlCondition};
use aq_network::{LinkStatus, NetworkBuilder, PumpCurve};
use aq_sim::{SimOptions, Simulator};
use aq_solver::headloss::{hazen_williams_k, HW_EXPONENT};
use aq_solver::DemandModel;

#[test]
fn daily_demand_pattern_tracks_reference() {
    let mut b = NetworkBuilder::new("daily");
    let pat = b.add_pattern("diurnal", 10_800.0, vec![0.6, 1.0, 1.4, 0.8]);
    let r = b.add_reservoir("src", 50.0, None);
    let j = b.add_junction("city", 0.0, 0.01, Some(pat));
    b.add_pipe("main", r, j, 100.0, 0.3, 130.0);
    let network = b.build().unwrap();

    let options = SimOptions {
        duration: 86_400.0,
        ..SimOptions::default()
    };
    let mut sim = Simulator::new(&network, options, Vec::new()).unwrap();
    sim.run().unwrap();
    let results = sim.into_results();

    // Hourly rows from 0 to 24 h inclusive, strictly increasing.
    assert_eq!(results.len(), 25);
    let times = results.times();
    assert!(times.windows(2).all(|w| w[0] < w[1]));

    // Single-pipe network: the reference solution is closed-form.
    let k = hazen_williams_k(100.0, 0.3, 130.0);
    let multipliers = [0.6, 1.0, 1.4, 0.8];
    for rec in &results.records {
        let step = (rec.time_s / 10_800.0).floor() as usize;
        let demand = 0.01 * multipliers[step % multipliers.len()];

        assert!((rec.expected_demand[1] - demand).abs() < 1e-12);
        assert!(
            (rec.flowrate[0] - demand).abs() < 1e-7,
            "t={}: flow {} vs {}",
            rec.time_s,
            rec.flowrate[0],
            demand
        );
        let head_ref = 50.0 - k * demand.powf(HW_EXPONENT);
        assert!(
            (rec.head[1] - head_ref).abs() < 1e-6,
            "t={}: head {} vs {}",
            rec.time_s,
            rec.head[1],
            head_ref
        );
        // Reservoirs report zero pressure.
        assert_eq!(rec.pressure[0], 0.0);
    }
}

#[test]
fn parallel_mains_conserve_mass_and_obey_timed_rule() {
    let demand = 0.03;
    let mut b = NetworkBuilder::new("parallel");
    let r = b.add_reservoir("src", 50.0, None);
    let j = b.add_junction("city", 0.0, demand, None);
    let p1 = b.add_pipe("p1", r, j, 200.0, 0.3, 130.0);
    let p2 = b.add_pipe("p2", r, j, 200.0, 0.2, 110.0);
    let network = b.build().unwrap();

    // Take the smaller main out of service at noon.
    let controls = vec![Control {
        name: "p2_out_at_noon".into(),
        condition: ControlCondition::SimTime { at: 43_200.0 },
        action: ControlAction::SetStatus {
            link: p2,
            status: LinkStatus::Closed,
        },
    }];

    let options = SimOptions {
        duration: 86_400.0,
        ..SimOptions::default()
    };
    let mut sim = Simulator::new(&network, options, controls).unwrap();
    sim.run().unwrap();
    let results = sim.into_results();

    for rec in &results.records {
        // Inflow balances demand at every reported instant.
        let total = rec.flowrate[p1.idx()] + rec.flowrate[p2.idx()];
        assert!(
            (total - demand).abs() < 1e-7,
            "t={}: total {}",
            rec.time_s,
            total
        );

        if rec.time_s <= 43_200.0 {
            // Both mains carry flow before the rule fires.
            assert_eq!(rec.status[p2.idx()], 1);
            assert!(rec.flowrate[p2.idx()] > 1e-4);
        } else {
            assert_eq!(rec.status[p2.idx()], 0);
            assert!(rec.flowrate[p2.idx()].abs() < 1e-7);
            assert!((rec.flowrate[p1.idx()] - demand).abs() < 1e-7);
        }
    }
}

/// Pump lifting between two reservoirs with a patterned draw at the suction
/// side junction. At each reported instant the pump flow satisfies one
/// scalar energy equation, solved here by bisection on the un-smoothed laws
/// as an independent reference.
#[test]
fn pumped_transfer_tracks_bisection_reference() {
    let curve = PumpCurve::single_point(0.05, 30.0).unwrap();
    let k = hazen_williams_k(100.0, 0.3, 130.0);

    let mut b = NetworkBuilder::new("pumped");
    let pat = b.add_pattern("draw", 21_600.0, vec![0.5, 1.0, 1.5, 1.0]);
    let r1 = b.add_reservoir("low", 10.0, None);
    let r2 = b.add_reservoir("high", 40.0, None);
    let a = b.add_junction("a", 10.0, 0.005, Some(pat));
    let c = b.add_junction("c", 10.0, 0.0, None);
    let pump = b.add_pump("pump", r1, a, curve);
    b.add_pipe("p1", a, c, 100.0, 0.3, 130.0);
    b.add_pipe("p2", c, r2, 100.0, 0.3, 130.0);
    let network = b.build().unwrap();

    let options = SimOptions {
        duration: 86_400.0,
        ..SimOptions::default()
    };
    let mut sim = Simulator::new(&network, options, Vec::new()).unwrap();
    sim.run().unwrap();
    let results = sim.into_results();
    assert_eq!(results.len(), 25);

    let multipliers = [0.5, 1.0, 1.5, 1.0];
    for rec in &results.records {
        let step = (rec.time_s / 21_600.0).floor() as usize;
        let draw = 0.005 * multipliers[step % multipliers.len()];

        // Energy along the path for pump flow q: the series pipes carry
        // q - draw, and heads at both ends are fixed.
        let excess = |q: f64| {
            let gain = curve.shutoff_head - curve.coeff * q * q;
            10.0 + gain - 2.0 * k * (q - draw).powf(HW_EXPONENT) - 40.0
        };
        let (mut lo, mut hi) = (draw, 0.08_f64);
        assert!(excess(lo) > 0.0 && excess(hi) < 0.0);
        while hi - lo > 1e-13 {
            let mid = 0.5 * (lo + hi);
            if excess(mid) > 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let q_ref = 0.5 * (lo + hi);

        assert!(
            (rec.flowrate[pump.idx()] - q_ref).abs() < 1e-6,
            "t={}: pump flow {} vs {}",
            rec.time_s,
            rec.flowrate[pump.idx()],
            q_ref
        );
        let gain_ref = curve.shutoff_head - curve.coeff * q_ref * q_ref;
        assert!((rec.head[a.idx()] - (10.0 + gain_ref)).abs() < 1e-5);
        // Both series pipes carry the pump flow minus the local draw.
        assert!((rec.flowrate[1] - (q_ref - draw)).abs() < 1e-6);
        assert!((rec.flowrate[2] - (q_ref - draw)).abs() < 1e-6);
    }
}

#[test]
fn pressure_driven_run_reduces_delivery() {
    let expected = 0.02;
    let mut b = NetworkBuilder::new("pdd");
    let r = b.add_reservoir("src", 15.0, None);
    let j = b.add_junction("city", 0.0, expected, None);
    b.add_pipe("main", r, j, 100.0, 0.3, 130.0);
    let network = b.build().unwrap();

    let options = SimOptions {
        duration: 3600.0,
        demand_model: DemandModel::PressureDriven {
            minimum_pressure: 0.0,
            required_pressure: 20.0,
        },
        ..SimOptions::default()
    };
    let mut sim = Simulator::new(&network, options, Vec::new()).unwrap();
    sim.run().unwrap();
    let results = sim.into_results();

    for rec in &results.records {
        assert!((rec.expected_demand[1] - expected).abs() < 1e-12);
        assert!(rec.demand[1] < expected);
        let frac = (rec.pressure[1] / 20.0).sqrt();
        assert!((rec.demand[1] - expected * frac).abs() < 1e-7);
    }
}
