//! FIR filtering with interchangeable multiply-accumulate kernels.
//!
//! Each `FilterImplementation` computes the same dot product of coefficients and sample
//! history, differing only in how many independent accumulators (lanes) it keeps. Wider
//! lane counts give the compiler room to vectorize the inner loop; which one is fastest
//! depends on the host, so the choice is made once by the `calibrate` module and then
//! passed to every filter.

pub mod calibrate;
pub mod dcblock;
pub mod design;
pub mod halfband;

pub use self::calibrate::{CalibrationSet, CalibrationType, Calibrator};
pub use self::dcblock::DcBlocker;
pub use self::halfband::HalfBandDecimator;

/// A streaming filter over real samples. History carries across calls.
pub trait RealFilter {
    /// Filter the given samples, returning the output produced for them.
    fn filter(&mut self, samples: &[f32]) -> Vec<f32>;

    /// Clear all sample history.
    fn reset(&mut self);
}

/// Multiply-accumulate strategy for filter kernels.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FilterImplementation {
    /// One accumulator.
    Scalar,
    /// Two `f32` lanes.
    Simd64,
    /// Four `f32` lanes.
    Simd128,
    /// Eight `f32` lanes.
    Simd256,
    /// Sixteen `f32` lanes.
    Simd512,
    /// Widest lane count the target was compiled for.
    SimdPreferred,
}

impl Default for FilterImplementation {
    fn default() -> Self { FilterImplementation::Scalar }
}

impl FilterImplementation {
    /// Every implementation, in order of increasing width.
    pub fn all() -> &'static [FilterImplementation] {
        use self::FilterImplementation::*;
        &[Scalar, Simd64, Simd128, Simd256, Simd512, SimdPreferred]
    }

    /// Number of independent accumulators.
    pub fn lanes(self) -> usize {
        use self::FilterImplementation::*;

        match self {
            Scalar => 1,
            Simd64 => 2,
            Simd128 => 4,
            Simd256 => 8,
            Simd512 => 16,
            SimdPreferred => if cfg!(target_feature = "avx512f") {
                16
            } else if cfg!(target_feature = "avx") {
                8
            } else {
                4
            },
        }
    }

    /// Compute the dot product of the two equal-length slices.
    #[inline]
    pub fn dot(self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert!(a.len() == b.len());

        match self.lanes() {
            1 => dot_scalar(a, b),
            2 => dot_lanes::<2>(a, b),
            4 => dot_lanes::<4>(a, b),
            8 => dot_lanes::<8>(a, b),
            _ => dot_lanes::<16>(a, b),
        }
    }
}

fn dot_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).fold(0.0, |s, (&x, &y)| s + x * y)
}

/// Dot product accumulated in `N` lanes, with the leftover tail summed separately.
#[inline]
fn dot_lanes<const N: usize>(a: &[f32], b: &[f32]) -> f32 {
    let mut acc = [0.0f32; N];

    let ca = a.chunks_exact(N);
    let cb = b.chunks_exact(N);
    let tail = dot_scalar(ca.remainder(), cb.remainder());

    for (x, y) in ca.zip(cb) {
        for i in 0..N {
            acc[i] += x[i] * y[i];
        }
    }

    acc.iter().sum::<f32>() + tail
}

/// A FIR filter for convolving with a series of samples.
#[derive(Clone, Debug)]
pub struct FirFilter {
    /// Filter coefficients, reversed to line up with the oldest-first history window.
    coefs: Vec<f32>,
    /// Two copies of the sample ring, so the current window is always contiguous.
    history: Vec<f32>,
    /// Index of the oldest sample in the current window.
    idx: usize,
    imp: FilterImplementation,
}

impl FirFilter {
    /// Construct an order-N filter with the given N+1 coefficients, where `coefs[k]`
    /// multiplies the sample `k` steps in the past.
    pub fn new(coefs: &[f32], imp: FilterImplementation) -> FirFilter {
        assert!(!coefs.is_empty());

        FirFilter {
            coefs: coefs.iter().rev().cloned().collect(),
            history: vec![0.0; coefs.len() * 2],
            idx: 0,
            imp,
        }
    }

    pub fn implementation(&self) -> FilterImplementation { self.imp }
    pub fn taps(&self) -> usize { self.coefs.len() }

    /// Add a sample to the current history and calculate the convolution.
    pub fn feed(&mut self, sample: f32) -> f32 {
        let n = self.coefs.len();

        self.history[self.idx] = sample;
        self.history[self.idx + n] = sample;

        self.idx += 1;
        self.idx %= n;

        self.imp.dot(&self.coefs, &self.history[self.idx..self.idx + n])
    }
}

impl RealFilter for FirFilter {
    fn filter(&mut self, samples: &[f32]) -> Vec<f32> {
        samples.iter().map(|&s| self.feed(s)).collect()
    }

    fn reset(&mut self) {
        for s in self.history.iter_mut() {
            *s = 0.0;
        }

        self.idx = 0;
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    /// Deterministic test signal within [-1, 1].
    pub fn signal(len: usize) -> Vec<f32> {
        let mut state = 0x1234_5678u32;

        (0..len).map(|i| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let noise = (state >> 8) as f32 / (1 << 24) as f32 - 0.5;
            0.5 * (i as f32 * 0.05).sin() + noise
        }).collect()
    }

    #[test]
    fn test_fir() {
        let mut f = FirFilter::new(&[0.0, 1.0, 0.0, 1.0], FilterImplementation::Scalar);

        assert!(f.feed(100.0) == 0.0);
        assert!(f.feed(200.0) == 100.0);
        assert!(f.feed(300.0) == 200.0);
        assert!(f.feed(400.0) == 400.0);
        assert!(f.feed(0.0) == 600.0);
        assert!(f.feed(0.0) == 300.0);
        assert!(f.feed(0.0) == 400.0);
        assert!(f.feed(0.0) == 0.0);
        assert!(f.feed(0.0) == 0.0);
    }

    #[test]
    fn test_lanes() {
        let a: Vec<f32> = (0..37).map(|i| i as f32).collect();
        let b = vec![1.0; 37];

        for &imp in FilterImplementation::all() {
            assert_eq!(imp.dot(&a, &b), 666.0);
            assert_eq!(imp.dot(&a[..3], &b[..3]), 3.0);
            assert_eq!(imp.dot(&[], &[]), 0.0);
        }

        assert!(FilterImplementation::SimdPreferred.lanes() >= 4);
    }

    #[test]
    fn test_parity() {
        let coefs = design::lowpass(8000.0, 200.0, 300.0, design::Window::Hamming);
        let input = signal(3000);

        let mut reference = FirFilter::new(&coefs, FilterImplementation::Scalar);
        let expected = reference.filter(&input);

        for &imp in FilterImplementation::all() {
            let mut f = FirFilter::new(&coefs, imp);

            // Uneven buffer sizes exercise history across calls.
            let mut out = f.filter(&input[..1001]);
            out.extend(f.filter(&input[1001..1002]));
            out.extend(f.filter(&input[1002..]));

            assert_eq!(out.len(), expected.len());

            for (&x, &y) in out.iter().zip(expected.iter()) {
                assert_approx_eq!(x, y, 1e-5);
            }
        }
    }

    #[test]
    fn test_reset() {
        let mut f = FirFilter::new(&[0.5, 0.5], FilterImplementation::Simd128);

        assert_eq!(f.filter(&[1.0, 1.0]), vec![0.5, 1.0]);
        f.reset();
        assert_eq!(f.filter(&[1.0]), vec![0.5]);
        assert_eq!(f.taps(), 2);
        assert_eq!(f.implementation(), FilterImplementation::Simd128);
    }
}
