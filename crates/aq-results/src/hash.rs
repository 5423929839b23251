//! Content-based hashing for run IDs.

use sha2::{Digest, Sha256};

/// Derive a run ID from the network definition, the serialized run options
/// and the solver version. Identical inputs always map to the same ID, so a
/// cached run can be found again without re-simulating.
pub fn compute_run_id(network_json: &str, options_json: &str, solver_version: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(network_json.as_bytes());
    hasher.update(options_json.as_bytes());
    hasher.update(solver_version.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_stability() {
        let a = compute_run_id("{\"name\":\"net\"}", "{\"duration\":86400}", "0.1.0");
        let b = compute_run_id("{\"name\":\"net\"}", "{\"duration\":86400}", "0.1.0");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let a = compute_run_id("{\"name\":\"net\"}", "{\"duration\":86400}", "0.1.0");
        let b = compute_run_id("{\"name\":\"net\"}", "{\"duration\":86400}", "0.2.0");
        let c = compute_run_id("{\"name\":\"other\"}", "{\"duration\":86400}", "0.1.0");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
