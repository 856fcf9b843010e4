use crate::{Distance, Pixel};

// SIMD register used by the fast kernel
pub type Lanes = wide::i32x8;
pub const LANES: usize = 8;

// A byte-range difference squared is at most 255^2 = 65025, so an i32 lane can
// absorb 32768 of them (2_130_739_200 < i32::MAX) before it has to be flushed
const FLUSH_CHUNKS: usize = 32768;

// Squared L2 distance between two equal-length vectors, accumulated in 64 bits.
// Exact for any i32 input.
#[inline]
pub fn squared_l2(a: &[Pixel], b: &[Pixel]) -> Distance {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as Distance - y as Distance;
            d * d
        })
        .sum()
}

// The same distance computed eight pixels at a time.
// Only exact when every value of both vectors is in 0..=255.
#[inline]
pub fn squared_l2_simd(a: &[Pixel], b: &[Pixel]) -> Distance {
    debug_assert_eq!(a.len(), b.len());
    let a_chunks = a.chunks_exact(LANES);
    let b_chunks = b.chunks_exact(LANES);
    // Whatever doesn't fill a whole register goes through the scalar kernel
    let tail = squared_l2(a_chunks.remainder(), b_chunks.remainder());

    let mut total: Distance = 0;
    let mut acc = Lanes::default();
    let mut pending = 0;
    for (x, y) in a_chunks.zip(b_chunks) {
        let d = load(x) - load(y);
        acc += d * d;
        pending += 1;
        if pending == FLUSH_CHUNKS {
            total += horizontal_sum(acc);
            acc = Lanes::default();
            pending = 0;
        }
    }
    total + horizontal_sum(acc) + tail
}

// True if the SIMD kernel is exact for these values
pub fn in_byte_range(values: &[Pixel]) -> bool {
    values.iter().all(|value| (0..=255).contains(value))
}

#[inline]
fn load(chunk: &[Pixel]) -> Lanes {
    Lanes::new(array_init::array_init(|i| chunk[i]))
}

#[inline]
fn horizontal_sum(x: Lanes) -> Distance {
    let r: &[Pixel; LANES] = x.as_array_ref();
    r.iter().map(|&lane| lane as Distance).sum()
}
