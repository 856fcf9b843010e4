pub mod bench;
pub mod classifier;
pub mod config;
pub mod context;
pub mod distance;
pub mod engine;
pub mod error;
pub mod mnist;
pub mod reduce;
pub mod vector_store;

pub use classifier::{Classifier, Evaluation, Prediction, QueryOutcome};
pub use config::{FailurePolicy, Kernel, KnnConfig};
pub use context::{ExecutionContext, Sequential, ThreadPool};
pub use engine::DistanceEngine;
pub use error::KnnError;
pub use mnist::{load_mnist, LabeledExample};
pub use reduce::{argmin, par_argmin};
pub use vector_store::VectorStore;

// One pixel of a feature vector
pub type Pixel = i32;
// Squared L2 distances are accumulated in 64 bits so they cannot wrap
pub type Distance = i64;
// Index-aligned with the training corpus, recomputed for every query
pub type DistanceArray = Vec<Distance>;

// Pixels per image in the MNIST csv files (28x28)
pub const MNIST_DIMENSIONALITY: usize = 784;
// Size of the reference training sample
pub const MNIST_TRAINING_SIZE: usize = 5000;
