use tracing::{trace, warn};

use crate::config::Kernel;
use crate::context::ExecutionContext;
use crate::distance::{in_byte_range, squared_l2, squared_l2_simd};
use crate::error::KnnError;
use crate::vector_store::VectorStore;
use crate::{Distance, DistanceArray, Pixel};

type KernelFn = fn(&[Pixel], &[Pixel]) -> Distance;

// Computes the distance from a query to every training vector.
// One work item per training vector, fanned out over the execution context.
pub struct DistanceEngine<'a> {
    store: &'a VectorStore,
    context: &'a dyn ExecutionContext,
    kernel: Kernel,
    max_dispatch_retries: u32,
}

impl<'a> DistanceEngine<'a> {
    pub fn new(store: &'a VectorStore, context: &'a dyn ExecutionContext) -> Self {
        DistanceEngine {
            store,
            context,
            kernel: Kernel::Auto,
            max_dispatch_retries: 1,
        }
    }

    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    // A failed dispatch is attempted again at most this many times
    pub fn with_max_dispatch_retries(mut self, retries: u32) -> Self {
        self.max_dispatch_retries = retries;
        self
    }

    pub fn store(&self) -> &'a VectorStore {
        self.store
    }

    pub fn context(&self) -> &'a dyn ExecutionContext {
        self.context
    }

    pub fn compute_distances(&self, query: &[Pixel]) -> Result<DistanceArray, KnnError> {
        let mut distances = DistanceArray::with_capacity(self.store.len());
        self.compute_distances_into(query, &mut distances)?;
        Ok(distances)
    }

    // Overwrite `distances` with one entry per training vector, reusing its allocation
    pub fn compute_distances_into(
        &self,
        query: &[Pixel],
        distances: &mut DistanceArray,
    ) -> Result<(), KnnError> {
        let dimensionality = self.store.dimensionality();
        if query.len() != dimensionality {
            return Err(KnnError::DimensionMismatch {
                expected: dimensionality,
                actual: query.len(),
            });
        }

        distances.clear();
        distances.resize(self.store.len(), 0);

        let kernel = self.select_kernel(query);
        let store = self.store;
        let work = move |index: usize| kernel(query, store.row(index));

        let mut attempt = 0;
        loop {
            match self.context.fill(distances, &work) {
                Ok(()) => break,
                Err(KnnError::Dispatch { reason }) if attempt < self.max_dispatch_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max = self.max_dispatch_retries,
                        %reason,
                        "retrying distance dispatch"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        debug_assert!(distances.iter().all(|&d| d >= 0));
        Ok(())
    }

    fn select_kernel(&self, query: &[Pixel]) -> KernelFn {
        match self.kernel {
            Kernel::Auto if self.store.is_byte_range() && in_byte_range(query) => {
                trace!("using simd kernel");
                squared_l2_simd
            }
            _ => squared_l2,
        }
    }
}
