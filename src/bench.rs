use std::time::Duration;

use tracing::debug;

use crate::classifier::{Classifier, Evaluation};
use crate::error::KnnError;
use crate::mnist::LabeledExample;

// Timing and accuracy of one pass over the query set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassStats {
    pub elapsed: Duration,
    pub ms_per_query: f64,
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
    // Mean ms_per_query over this pass and all earlier ones
    pub running_average_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct BenchReport {
    pub passes: Vec<PassStats>,
}

impl BenchReport {
    // Mean time per query over every pass
    pub fn average_ms_per_query(&self) -> f64 {
        self.passes
            .last()
            .map_or(0.0, |pass| pass.running_average_ms)
    }
}

// Classify the whole query set `passes` times, calling `on_pass` after each pass.
// Any error aborts the benchmark; no partial report is returned.
pub fn run_passes(
    classifier: &Classifier,
    queries: &[LabeledExample],
    passes: usize,
    parallel_queries: bool,
    mut on_pass: impl FnMut(usize, &PassStats),
) -> Result<BenchReport, KnnError> {
    let mut report = BenchReport::default();
    let mut sum_ms = 0.0;
    for pass in 1..=passes {
        let evaluation: Evaluation = if parallel_queries {
            classifier.par_evaluate(queries)?
        } else {
            classifier.evaluate(queries)?
        };

        let ms_per_query = evaluation.ms_per_query();
        sum_ms += ms_per_query;
        let stats = PassStats {
            elapsed: evaluation.elapsed(),
            ms_per_query,
            correct: evaluation.correct(),
            total: evaluation.total(),
            accuracy: evaluation.accuracy(),
            running_average_ms: sum_ms / pass as f64,
        };
        debug!(pass, ms_per_query, accuracy = stats.accuracy, "benchmark pass");
        on_pass(pass, &stats);
        report.passes.push(stats);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KnnConfig;
    use crate::context::Sequential;
    use crate::vector_store::VectorStore;

    #[test]
    fn test_runs_every_pass() {
        let data = vec![
            LabeledExample::new(0, vec![0, 0]),
            LabeledExample::new(1, vec![100, 100]),
        ];
        let store = VectorStore::from_examples(&data, 2).unwrap();
        let config = KnnConfig::new().with_dimensionality(2);
        let classifier = Classifier::new(&store, &Sequential, &config).unwrap();
        let queries = vec![
            LabeledExample::new(0, vec![1, 1]),
            LabeledExample::new(0, vec![99, 99]),
        ];

        let mut seen = Vec::new();
        let report = run_passes(&classifier, &queries, 3, false, |pass, _| seen.push(pass)).unwrap();
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(report.passes.len(), 3);
        for pass in &report.passes {
            assert_eq!(pass.correct, 1);
            assert_eq!(pass.total, 2);
            assert_eq!(pass.accuracy, 0.5);
        }
        assert!(report.average_ms_per_query() >= 0.0);
    }

    #[test]
    fn test_error_aborts() {
        let data = vec![LabeledExample::new(0, vec![0, 0])];
        let store = VectorStore::from_examples(&data, 2).unwrap();
        let config = KnnConfig::new().with_dimensionality(2);
        let classifier = Classifier::new(&store, &Sequential, &config).unwrap();
        let queries = vec![LabeledExample::new(0, vec![1])];
        assert!(run_passes(&classifier, &queries, 2, true, |_, _| {}).is_err());
    }

    #[test]
    fn test_zero_passes() {
        let report = BenchReport::default();
        assert_eq!(report.average_ms_per_query(), 0.0);
    }
}
