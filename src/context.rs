// Execution contexts for the distance phase.
//
// The distance engine only needs a parallel map over an index range: run one
// independent work item per training vector and read the results back once
// all of them have finished. Which backend does the running is chosen here.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;

use crate::error::KnnError;
use crate::Distance;

// A backend able to run one work item per output slot.
pub trait ExecutionContext: Send + Sync {
    // Human-readable backend name, used in logs and reports.
    fn name(&self) -> String;

    // Sets `out[i] = work(i)` for every `i` in `0..out.len()`.
    //
    // Returns only after every work item has completed. A work item that
    // panics is reported as KnnError::Dispatch; `out` is unspecified in
    // that case.
    fn fill(
        &self,
        out: &mut [Distance],
        work: &(dyn Fn(usize) -> Distance + Sync),
    ) -> Result<(), KnnError>;
}

// Runs every work item on the calling thread, in index order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl ExecutionContext for Sequential {
    fn name(&self) -> String {
        "sequential".to_string()
    }

    fn fill(
        &self,
        out: &mut [Distance],
        work: &(dyn Fn(usize) -> Distance + Sync),
    ) -> Result<(), KnnError> {
        catch_unwind(AssertUnwindSafe(|| {
            out.iter_mut()
                .enumerate()
                .for_each(|(index, slot)| *slot = work(index));
        }))
        .map_err(dispatch_panic)
    }
}

// Runs work items on a rayon thread pool.
pub struct ThreadPool {
    // None means the global rayon pool
    pool: Option<rayon::ThreadPool>,
}

impl ThreadPool {
    // Uses the global rayon pool.
    pub fn global() -> Self {
        ThreadPool { pool: None }
    }

    // Builds a dedicated pool with `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self, KnnError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("knn-worker-{}", index))
            .build()
            .map_err(|e| KnnError::Dispatch {
                reason: format!("failed to build thread pool: {}", e),
            })?;
        Ok(ThreadPool { pool: Some(pool) })
    }

    // Number of worker threads that will run the work items.
    pub fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

impl ExecutionContext for ThreadPool {
    fn name(&self) -> String {
        format!("thread pool ({} threads)", self.threads())
    }

    fn fill(
        &self,
        out: &mut [Distance],
        work: &(dyn Fn(usize) -> Distance + Sync),
    ) -> Result<(), KnnError> {
        // A panicking work item resurfaces here once the whole batch has joined
        catch_unwind(AssertUnwindSafe(|| match &self.pool {
            Some(pool) => pool.install(|| par_fill(out, work)),
            None => par_fill(out, work),
        }))
        .map_err(dispatch_panic)
    }
}

fn par_fill(out: &mut [Distance], work: &(dyn Fn(usize) -> Distance + Sync)) {
    out.par_iter_mut()
        .enumerate()
        .for_each(|(index, slot)| *slot = work(index));
}

fn dispatch_panic(payload: Box<dyn Any + Send>) -> KnnError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    KnnError::Dispatch {
        reason: format!("work item panicked: {}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(index: usize) -> Distance {
        (index * index) as Distance
    }

    #[test]
    fn sequential_fills_every_slot() {
        let mut out = vec![-1; 10];
        Sequential.fill(&mut out, &square).unwrap();
        assert_eq!(out, (0..10).map(square).collect::<Vec<_>>());
    }

    #[test]
    fn thread_pool_matches_sequential() {
        let pool = ThreadPool::with_threads(3).unwrap();
        assert_eq!(pool.threads(), 3);
        let mut out = vec![-1; 1000];
        pool.fill(&mut out, &square).unwrap();
        let mut expected = vec![0; 1000];
        Sequential.fill(&mut expected, &square).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn global_pool_fills_every_slot() {
        let mut out = vec![-1; 100];
        ThreadPool::global().fill(&mut out, &square).unwrap();
        assert!(out.iter().all(|&d| d >= 0));
        assert_eq!(out[9], 81);
    }

    #[test]
    fn panicking_work_item_is_dispatch_error() {
        let pool = ThreadPool::with_threads(2).unwrap();
        let mut out = vec![0; 64];
        let work = |index: usize| -> Distance {
            if index == 17 {
                panic!("bad work item");
            }
            0
        };
        match pool.fill(&mut out, &work) {
            Err(KnnError::Dispatch { reason }) => assert!(reason.contains("bad work item")),
            other => panic!("expected dispatch error, got {:?}", other),
        }
        assert!(matches!(
            Sequential.fill(&mut out, &work),
            Err(KnnError::Dispatch { .. })
        ));
    }

    #[test]
    fn empty_output_is_fine() {
        let mut out: Vec<Distance> = Vec::new();
        Sequential.fill(&mut out, &square).unwrap();
        ThreadPool::global().fill(&mut out, &square).unwrap();
    }
}
