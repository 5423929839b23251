use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use aq_results::{
    BoundaryEvent, BoundaryEventKind, RunManifest, RunStore, SimulationResults, TimeseriesRecord,
};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

fn sample_results() -> SimulationResults {
    let mut results = SimulationResults::new(
        vec!["src".to_string(), "j1".to_string()],
        vec!["p1".to_string()],
    );
    for step in 0..3 {
        let t = step as f64 * 3600.0;
        results
            .append_step(TimeseriesRecord {
                time_s: t,
                head: vec![50.0, 42.0 - step as f64],
                pressure: vec![0.0, 32.0 - step as f64],
                demand: vec![0.0, 0.01],
                expected_demand: vec![0.0, 0.01],
                flowrate: vec![0.01],
                velocity: vec![0.14],
                status: vec![1],
            })
            .expect("append failed");
    }
    results.record_event(BoundaryEvent {
        time: 3600.0,
        kind: BoundaryEventKind::TankFull {
            tank: "t1".to_string(),
        },
    });
    results
}

#[test]
fn save_list_load_roundtrip() {
    let root = unique_temp_dir("aq_results_store");
    fs::create_dir_all(&root).expect("failed to create temp dir");
    let store = RunStore::new(root).expect("failed to create run store");

    let results = sample_results();
    let manifest = RunManifest {
        run_id: "run-123".to_string(),
        network_name: "net1".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        duration_s: 7200.0,
        hydraulic_timestep_s: 3600.0,
        report_timestep_s: 3600.0,
        solver_version: "0.1.0".to_string(),
        node_names: results.node_names.clone(),
        link_names: results.link_names.clone(),
        events: results.events.clone(),
    };

    store.save_run(&manifest, &results).expect("failed to save");
    assert!(store.has_run("run-123"));

    let runs = store.list_runs("net1").expect("failed to list runs");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, "run-123");
    assert!(store.list_runs("other").expect("list").is_empty());

    let loaded = store.load_results("run-123").expect("failed to load");
    assert_eq!(loaded.max_abs_diff(&results).expect("diff"), 0.0);
    assert_eq!(loaded.events, results.events);
    assert_eq!(loaded.status_series("p1"), Some(vec![1, 1, 1]));

    store.delete_run("run-123").expect("delete");
    assert!(!store.has_run("run-123"));
    assert!(store.load_results("run-123").is_err());
}
