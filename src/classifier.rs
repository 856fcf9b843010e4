use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::{FailurePolicy, KnnConfig};
use crate::context::ExecutionContext;
use crate::engine::DistanceEngine;
use crate::error::KnnError;
use crate::mnist::LabeledExample;
use crate::reduce::argmin;
use crate::vector_store::VectorStore;
use crate::{Distance, DistanceArray, Pixel};

// The nearest training vector to a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    pub label: u8,
    // Index of the nearest training vector in the store
    pub index: usize,
    // Squared L2 distance to it
    pub distance: Distance,
}

// What happened to one query of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOutcome {
    pub expected: u8,
    // None when the query failed and was skipped
    pub prediction: Option<Prediction>,
}

impl QueryOutcome {
    pub fn is_correct(&self) -> bool {
        self.prediction
            .map_or(false, |prediction| prediction.label == self.expected)
    }

    pub fn is_skipped(&self) -> bool {
        self.prediction.is_none()
    }
}

// Result of classifying a batch of queries
#[derive(Debug, Clone)]
pub struct Evaluation {
    outcomes: Vec<QueryOutcome>,
    correct: usize,
    skipped: usize,
    elapsed: Duration,
}

impl Evaluation {
    fn new(outcomes: Vec<QueryOutcome>, elapsed: Duration) -> Self {
        let correct = outcomes.iter().filter(|o| o.is_correct()).count();
        let skipped = outcomes.iter().filter(|o| o.is_skipped()).count();
        Evaluation {
            outcomes,
            correct,
            skipped,
            elapsed,
        }
    }

    // One entry per query, in query order
    pub fn outcomes(&self) -> &[QueryOutcome] {
        &self.outcomes
    }

    pub fn correct(&self) -> usize {
        self.correct
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    // Fraction of queries classified correctly, 0 for an empty batch.
    // Both counts are exact integers, so this is exactly correct / total.
    pub fn accuracy(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.correct as f64 / self.outcomes.len() as f64
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn ms_per_query(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.elapsed.as_secs_f64() * 1000.0 / self.outcomes.len() as f64
    }
}

// Exact 1-nearest-neighbor classifier over a sealed vector store
pub struct Classifier<'a> {
    engine: DistanceEngine<'a>,
    failure_policy: FailurePolicy,
}

impl<'a> Classifier<'a> {
    pub fn new(
        store: &'a VectorStore,
        context: &'a dyn ExecutionContext,
        config: &KnnConfig,
    ) -> Result<Self, KnnError> {
        config.validate()?;
        if store.is_empty() {
            return Err(KnnError::EmptyInput);
        }
        if config.dimensionality() != store.dimensionality() {
            return Err(KnnError::InvalidConfig(format!(
                "configured dimensionality {} does not match the store's {}",
                config.dimensionality(),
                store.dimensionality()
            )));
        }
        let engine = DistanceEngine::new(store, context)
            .with_kernel(config.kernel())
            .with_max_dispatch_retries(config.max_dispatch_retries());
        Ok(Classifier {
            engine,
            failure_policy: config.failure_policy(),
        })
    }

    pub fn store(&self) -> &'a VectorStore {
        self.engine.store()
    }

    pub fn classify(&self, query: &LabeledExample) -> Result<Prediction, KnnError> {
        self.classify_pixels(&query.pixels)
    }

    pub fn classify_pixels(&self, pixels: &[Pixel]) -> Result<Prediction, KnnError> {
        let mut distances = DistanceArray::with_capacity(self.store().len());
        self.classify_with(pixels, &mut distances)
    }

    // Classify using a caller-owned distance buffer
    pub fn classify_with(
        &self,
        pixels: &[Pixel],
        distances: &mut DistanceArray,
    ) -> Result<Prediction, KnnError> {
        // Fan out over the training set, then reduce once every distance is in
        self.engine.compute_distances_into(pixels, distances)?;
        let index = argmin(distances)?;
        Ok(Prediction {
            label: self.store().label(index),
            index,
            distance: distances[index],
        })
    }

    // Classify every query in order, reusing one distance buffer
    pub fn evaluate(&self, queries: &[LabeledExample]) -> Result<Evaluation, KnnError> {
        let now = Instant::now();
        let mut distances = DistanceArray::with_capacity(self.store().len());
        let mut outcomes = Vec::with_capacity(queries.len());
        for (index, query) in queries.iter().enumerate() {
            let outcome = self.outcome(index, query, &mut distances)?;
            outcomes.push(outcome);
        }
        let evaluation = Evaluation::new(outcomes, now.elapsed());
        self.log_summary(&evaluation);
        Ok(evaluation)
    }

    // Same outcomes as evaluate, but queries are classified concurrently.
    // Each rayon worker keeps its own distance buffer as scratch space.
    pub fn par_evaluate(&self, queries: &[LabeledExample]) -> Result<Evaluation, KnnError> {
        let now = Instant::now();
        let n = self.store().len();
        let outcomes = queries
            .par_iter()
            .enumerate()
            .map_init(
                || DistanceArray::with_capacity(n),
                |distances, (index, query)| self.outcome(index, query, distances),
            )
            .collect::<Result<Vec<_>, _>>()?;
        let evaluation = Evaluation::new(outcomes, now.elapsed());
        self.log_summary(&evaluation);
        Ok(evaluation)
    }

    fn outcome(
        &self,
        index: usize,
        query: &LabeledExample,
        distances: &mut DistanceArray,
    ) -> Result<QueryOutcome, KnnError> {
        match self.classify_with(&query.pixels, distances) {
            Ok(prediction) => Ok(QueryOutcome {
                expected: query.label,
                prediction: Some(prediction),
            }),
            Err(e)
                if self.failure_policy == FailurePolicy::SkipAsIncorrect && e.is_per_query() =>
            {
                warn!(query = index, error = %e, "skipping query, counted as incorrect");
                Ok(QueryOutcome {
                    expected: query.label,
                    prediction: None,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn log_summary(&self, evaluation: &Evaluation) {
        info!(
            queries = evaluation.total(),
            correct = evaluation.correct(),
            skipped = evaluation.skipped(),
            accuracy = evaluation.accuracy(),
            elapsed_ms = evaluation.elapsed().as_millis() as u64,
            context = %self.engine.context().name(),
            "evaluation finished"
        );
    }
}
