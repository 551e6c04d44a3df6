//! Running DC removal for the symbol path.

use std::f64::consts::PI;

use super::RealFilter;

/// Bounds on the pole, keeping the notch from swallowing the signal or never settling.
const MIN_ALPHA: f64 = 0.9;
const MAX_ALPHA: f64 = 0.99999;

/// Single-pole DC blocker, y[n] = x[n] - x[n-1] + αy[n-1].
///
/// State carries across buffers, so the result doesn't depend on how the input is
/// split up.
#[derive(Clone, Debug)]
pub struct DcBlocker {
    alpha: f32,
    prev_input: f32,
    prev_output: f32,
}

impl DcBlocker {
    /// Create a new `DcBlocker` with the given pole, clamped to `[0.9, 0.99999]`.
    pub fn new(alpha: f64) -> Self {
        DcBlocker {
            alpha: alpha.max(MIN_ALPHA).min(MAX_ALPHA) as f32,
            prev_input: 0.0,
            prev_output: 0.0,
        }
    }

    /// Create a new `DcBlocker` with its -3 dB corner near the given frequency.
    pub fn from_cutoff(cutoff: f64, sample_rate: f64) -> Self {
        DcBlocker::new(1.0 - 2.0 * PI * cutoff / sample_rate)
    }

    pub fn alpha(&self) -> f32 { self.alpha }

    pub fn feed(&mut self, sample: f32) -> f32 {
        let out = sample - self.prev_input + self.alpha * self.prev_output;

        self.prev_input = sample;
        self.prev_output = out;

        out
    }
}

impl RealFilter for DcBlocker {
    fn filter(&mut self, samples: &[f32]) -> Vec<f32> {
        samples.iter().map(|&s| self.feed(s)).collect()
    }

    fn reset(&mut self) {
        self.prev_input = 0.0;
        self.prev_output = 0.0;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_alpha() {
        assert_approx_eq!(DcBlocker::from_cutoff(2.0, 48000.0).alpha(), 0.999738, 1e-6);
        assert_eq!(DcBlocker::new(0.5).alpha(), 0.9);
        assert_eq!(DcBlocker::new(1.0).alpha(), 0.99999);
    }

    #[test]
    fn test_removes_offset() {
        let mut dc = DcBlocker::new(0.99);

        let input: Vec<f32> = (0..2000).map(|i| 0.3 + 0.5 * (i as f32 * 0.1).sin()).collect();
        let output = dc.filter(&input);

        let mean = output[1000..].iter().sum::<f32>() / 1000.0;
        assert!(mean.abs() < 0.02);
    }

    #[test]
    fn test_chunking() {
        let input: Vec<f32> = (0..1000).map(|i| 0.2 + (i as f32 * 0.37).cos()).collect();

        let mut whole = DcBlocker::new(0.995);
        let expect = whole.filter(&input);

        for &size in &[1, 10, 333] {
            let mut dc = DcBlocker::new(0.995);
            let out: Vec<f32> = input.chunks(size).flat_map(|c| dc.filter(c)).collect();

            assert_eq!(out, expect);
        }
    }

    #[test]
    fn test_reset() {
        let mut dc = DcBlocker::new(0.998);

        dc.filter(&[10.0; 100]);
        dc.reset();

        assert!(dc.filter(&[0.0; 10]).iter().all(|&s| s == 0.0));
    }
}
