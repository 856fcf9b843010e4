use rayon::prelude::*;

use crate::error::KnnError;
use crate::Distance;

// Index of the smallest distance. On ties the lowest index wins, so the
// result depends only on the array contents.
pub fn argmin(distances: &[Distance]) -> Result<usize, KnnError> {
    let (first, rest) = distances.split_first().ok_or(KnnError::EmptyInput)?;
    let mut best_index = 0;
    let mut best = *first;
    for (index, &distance) in rest.iter().enumerate() {
        // Strictly smaller only, an equal value never displaces an earlier one
        if distance < best {
            best = distance;
            best_index = index + 1;
        }
    }
    Ok(best_index)
}

// Same result as argmin, computed as a tree of partial minimums on the rayon
// pool. Comparing (distance, index) pairs keeps the lowest-index tie-break.
pub fn par_argmin(distances: &[Distance]) -> Result<usize, KnnError> {
    distances
        .par_iter()
        .enumerate()
        .map(|(index, &distance)| (distance, index))
        .min()
        .map(|(_, index)| index)
        .ok_or(KnnError::EmptyInput)
}
