//! Evaluation pass summary.

use std::ops::AddAssign;
use std::time::Duration;

use serde::Serialize;

/// Summary of one [`Graph::evaluate_graph`](super::Graph::evaluate_graph) pass.
///
/// Results add together, so a host can keep running totals:
///
/// ```rust,ignore
/// stats += graph.evaluate_graph(&mut nodes, false);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvaluateResult {
    /// Number of distinct nodes evaluated.
    pub node_count: usize,

    /// Wall time spent in the pass.
    pub total_time: Duration,
}

impl EvaluateResult {
    /// Wall time in fractional milliseconds.
    pub fn total_time_ms(&self) -> f64 {
        self.total_time.as_secs_f64() * 1000.0
    }
}

impl AddAssign for EvaluateResult {
    fn add_assign(&mut self, rhs: Self) {
        self.node_count += rhs.node_count;
        self.total_time += rhs.total_time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_accumulate() {
        let mut total = EvaluateResult::default();
        total += EvaluateResult {
            node_count: 3,
            total_time: Duration::from_millis(2),
        };
        total += EvaluateResult {
            node_count: 4,
            total_time: Duration::from_millis(5),
        };

        assert_eq!(total.node_count, 7);
        assert_eq!(total.total_time, Duration::from_millis(7));
        assert!((total.total_time_ms() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn serializes_for_instrumentation() {
        let result = EvaluateResult {
            node_count: 2,
            total_time: Duration::from_millis(1),
        };
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["node_count"], 2);
        assert_eq!(json["total_time"]["secs"], 0);
        assert_eq!(json["total_time"]["nanos"], 1_000_000);
    }
}
