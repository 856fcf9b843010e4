// Error type for all fallible operations in the knn_mnist crate.
#[derive(Debug, thiserror::Error)]
pub enum KnnError {
    // Input data could not be turned into a corpus or query set.
    #[error("failed to load record {record}: {reason}")]
    Load {
        // 1-based record number, or 0 when the failure is not tied to a record.
        record: usize,
        // What was wrong with the input.
        reason: String,
    },

    // The dataset file could not be opened or read.
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    // A query vector does not have the corpus dimensionality.
    #[error("query has {actual} dimensions, corpus has {expected}")]
    DimensionMismatch {
        // Dimensionality of the corpus.
        expected: usize,
        // Length of the offending query.
        actual: usize,
    },

    // The corpus or distance array is empty, so there is no nearest neighbor.
    #[error("no training vectors to search")]
    EmptyInput,

    // The execution context failed to run a distance computation.
    #[error("distance dispatch failed: {reason}")]
    Dispatch {
        // Description of the failure.
        reason: String,
    },

    // A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl KnnError {
    pub(crate) fn load(record: usize, reason: impl Into<String>) -> Self {
        KnnError::Load {
            record,
            reason: reason.into(),
        }
    }

    // True for errors that only affect the query that produced them.
    pub fn is_per_query(&self) -> bool {
        matches!(
            self,
            KnnError::DimensionMismatch { .. } | KnnError::Dispatch { .. }
        )
    }
}
