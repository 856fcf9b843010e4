// Configuration for a classification run.

use crate::context::{ExecutionContext, Sequential, ThreadPool};
use crate::error::KnnError;
use crate::mnist::LoadOptions;
use crate::MNIST_DIMENSIONALITY;

// Retrying a flaky dispatch more often than this hides a real problem
const MAX_DISPATCH_RETRIES_LIMIT: u32 = 8;

// Which distance kernel the engine runs per work item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Kernel {
    // SIMD when every pixel of the corpus and the query is in 0..=255,
    // scalar otherwise.
    #[default]
    Auto,
    // Always the scalar 64-bit kernel.
    Scalar,
}

// What a batch evaluation does when a single query fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    // Stop and return the error; no accuracy is reported.
    #[default]
    Abort,
    // Count the query as incorrect, record it as skipped, and continue.
    // Corpus-level errors still abort.
    SkipAsIncorrect,
}

// Configuration for loading data and running the classifier.
#[derive(Debug, Clone)]
pub struct KnnConfig {
    dimensionality: usize,
    training_size: Option<usize>,
    has_headers: bool,
    threads: Option<usize>,
    sequential: bool,
    kernel: Kernel,
    failure_policy: FailurePolicy,
    max_dispatch_retries: u32,
}

impl KnnConfig {
    // Defaults: MNIST dimensionality, any training size, csv headers,
    // global rayon pool, automatic kernel, abort on failure, one retry.
    pub fn new() -> Self {
        Self {
            dimensionality: MNIST_DIMENSIONALITY,
            training_size: None,
            has_headers: true,
            threads: None,
            sequential: false,
            kernel: Kernel::Auto,
            failure_policy: FailurePolicy::Abort,
            max_dispatch_retries: 1,
        }
    }

    pub fn with_dimensionality(mut self, dimensionality: usize) -> Self {
        self.dimensionality = dimensionality;
        self
    }

    // Requires the training corpus to hold exactly this many examples.
    pub fn with_training_size(mut self, training_size: usize) -> Self {
        self.training_size = Some(training_size);
        self
    }

    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    // Uses a dedicated pool with this many threads instead of the global one.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    // Runs the distance phase on the calling thread.
    pub fn with_sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }

    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_max_dispatch_retries(mut self, retries: u32) -> Self {
        self.max_dispatch_retries = retries;
        self
    }

    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    pub fn training_size(&self) -> Option<usize> {
        self.training_size
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn max_dispatch_retries(&self) -> u32 {
        self.max_dispatch_retries
    }

    // Options for reading a dataset file with this configuration.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            dimensionality: self.dimensionality,
            has_headers: self.has_headers,
            n_examples: usize::MAX,
        }
    }

    // Builds the execution context this configuration asks for.
    pub fn execution_context(&self) -> Result<Box<dyn ExecutionContext>, KnnError> {
        if self.sequential {
            return Ok(Box::new(Sequential));
        }
        Ok(match self.threads {
            Some(threads) => Box::new(ThreadPool::with_threads(threads)?),
            None => Box::new(ThreadPool::global()),
        })
    }

    // Validates this configuration.
    pub fn validate(&self) -> Result<(), KnnError> {
        if self.dimensionality == 0 {
            return Err(KnnError::InvalidConfig(
                "dimensionality must be >= 1".to_string(),
            ));
        }
        if self.training_size == Some(0) {
            return Err(KnnError::InvalidConfig(
                "training size must be >= 1".to_string(),
            ));
        }
        if self.threads == Some(0) {
            return Err(KnnError::InvalidConfig("threads must be >= 1".to_string()));
        }
        if self.max_dispatch_retries > MAX_DISPATCH_RETRIES_LIMIT {
            return Err(KnnError::InvalidConfig(format!(
                "max dispatch retries must be <= {}, got {}",
                MAX_DISPATCH_RETRIES_LIMIT, self.max_dispatch_retries
            )));
        }
        Ok(())
    }
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = KnnConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dimensionality(), 784);
        assert_eq!(config.training_size(), None);
        assert_eq!(config.kernel(), Kernel::Auto);
        assert_eq!(config.failure_policy(), FailurePolicy::Abort);
        assert_eq!(config.max_dispatch_retries(), 1);
        assert!(config.load_options().has_headers);
    }

    #[test]
    fn builder_sets_fields() {
        let config = KnnConfig::new()
            .with_dimensionality(3)
            .with_training_size(5000)
            .with_headers(false)
            .with_threads(2)
            .with_kernel(Kernel::Scalar)
            .with_max_dispatch_retries(0);
        assert_eq!(config.dimensionality(), 3);
        assert_eq!(config.training_size(), Some(5000));
        assert_eq!(config.kernel(), Kernel::Scalar);
        let options = config.load_options();
        assert_eq!(options.dimensionality, 3);
        assert!(!options.has_headers);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(KnnConfig::new().with_dimensionality(0).validate().is_err());
        assert!(KnnConfig::new().with_training_size(0).validate().is_err());
        assert!(KnnConfig::new().with_threads(0).validate().is_err());
        assert!(KnnConfig::new()
            .with_max_dispatch_retries(9)
            .validate()
            .is_err());
    }

    #[test]
    fn execution_context_follows_config() {
        let context = KnnConfig::new().with_sequential(true).execution_context().unwrap();
        assert_eq!(context.name(), "sequential");
        let context = KnnConfig::new().with_threads(2).execution_context().unwrap();
        assert_eq!(context.name(), "thread pool (2 threads)");
    }
}
