use tracing::debug;

use crate::distance::in_byte_range;
use crate::error::KnnError;
use crate::mnist::LabeledExample;
use crate::Pixel;

// The training corpus, stored so that it can be scanned in parallel.
//
// All vectors live in one contiguous buffer: the vector for training index i
// occupies pixels[i * dimensionality..(i + 1) * dimensionality], and labels[i]
// is its class. Nothing can mutate the store once it has been built.
#[derive(Debug, Clone)]
pub struct VectorStore {
    pixels: Vec<Pixel>,
    labels: Vec<u8>,
    dimensionality: usize,
    // Every pixel is in 0..=255, so the SIMD kernel is exact
    byte_range: bool,
}

impl VectorStore {
    // Build a store from any number of examples, all of which must have
    // exactly `dimensionality` pixels
    pub fn from_examples(
        examples: &[LabeledExample],
        dimensionality: usize,
    ) -> Result<Self, KnnError> {
        if dimensionality == 0 {
            return Err(KnnError::load(0, "dimensionality must be at least 1"));
        }

        // Check every row before allocating, so the buffer size is bounded by real data
        if let Some((index, example)) = examples
            .iter()
            .enumerate()
            .find(|(_, example)| example.pixels.len() != dimensionality)
        {
            return Err(KnnError::load(
                index + 1,
                format!(
                    "expected {} pixels, found {}",
                    dimensionality,
                    example.pixels.len()
                ),
            ));
        }
        let capacity = examples.len().checked_mul(dimensionality).ok_or_else(|| {
            KnnError::load(
                0,
                format!(
                    "{} vectors of {} pixels overflow the store",
                    examples.len(),
                    dimensionality
                ),
            )
        })?;

        // Allocate the whole buffer up front and fill it row by row
        let mut pixels = Vec::with_capacity(capacity);
        let mut labels = Vec::with_capacity(examples.len());
        for example in examples {
            pixels.extend_from_slice(&example.pixels);
            labels.push(example.label);
        }

        let byte_range = in_byte_range(&pixels);
        debug!(
            vectors = labels.len(),
            dimensionality, byte_range, "sealed vector store"
        );
        Ok(VectorStore {
            pixels,
            labels,
            dimensionality,
            byte_range,
        })
    }

    // As above, but the corpus must also contain exactly `n_examples` vectors
    pub fn from_examples_exact(
        examples: &[LabeledExample],
        n_examples: usize,
        dimensionality: usize,
    ) -> Result<Self, KnnError> {
        if examples.len() != n_examples {
            return Err(KnnError::load(
                0,
                format!(
                    "expected {} training examples, found {}",
                    n_examples,
                    examples.len()
                ),
            ));
        }
        Self::from_examples(examples, dimensionality)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    // The training vector at `index`
    pub fn row(&self, index: usize) -> &[Pixel] {
        let start = index * self.dimensionality;
        &self.pixels[start..start + self.dimensionality]
    }

    pub fn label(&self, index: usize) -> u8 {
        self.labels[index]
    }

    pub fn is_byte_range(&self) -> bool {
        self.byte_range
    }
}
