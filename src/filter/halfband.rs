//! Decimation by two with a half-band filter.
//!
//! Half the taps of a half-band filter are zero and the rest are symmetric about the
//! center, so each output needs one multiply per pair of nonzero taps. Only every second
//! output is computed.

use crate::filter::{FilterImplementation, RealFilter};

pub struct HalfBandDecimator {
    /// Nonzero coefficients at odd offsets 1, 3, 5, ... from the center.
    coefs: Vec<f32>,
    /// Center coefficient.
    center: f32,
    /// Two copies of the sample ring, so the current window is always contiguous.
    history: Vec<f32>,
    /// Index of the oldest sample in the current window.
    idx: usize,
    /// Whether the next input completes an output pair.
    odd: bool,
    /// Folded sample pairs matching `coefs`.
    folded: Vec<f32>,
    imp: FilterImplementation,
}

impl HalfBandDecimator {
    /// Construct a decimator from the full half-band coefficients, as designed by
    /// `design::halfband`.
    pub fn new(coefs: &[f32], imp: FilterImplementation) -> HalfBandDecimator {
        assert!(coefs.len() % 4 == 3);

        let mid = coefs.len() / 2;
        let side: Vec<f32> = coefs[mid + 1..].iter().step_by(2).cloned().collect();

        HalfBandDecimator {
            folded: vec![0.0; side.len()],
            coefs: side,
            center: coefs[mid],
            history: vec![0.0; coefs.len() * 2],
            idx: 0,
            odd: false,
            imp,
        }
    }

    /// Add a sample to the history, returning an output after every second sample.
    pub fn feed(&mut self, sample: f32) -> Option<f32> {
        let n = self.history.len() / 2;

        self.history[self.idx] = sample;
        self.history[self.idx + n] = sample;

        self.idx += 1;
        self.idx %= n;

        self.odd = !self.odd;

        if self.odd {
            return None;
        }

        let window = &self.history[self.idx..self.idx + n];
        let mid = n / 2;

        for (k, f) in self.folded.iter_mut().enumerate() {
            let d = 2 * k + 1;
            *f = window[mid - d] + window[mid + d];
        }

        Some(self.center * window[mid] + self.imp.dot(&self.coefs, &self.folded))
    }
}

impl RealFilter for HalfBandDecimator {
    fn filter(&mut self, samples: &[f32]) -> Vec<f32> {
        samples.iter().filter_map(|&s| self.feed(s)).collect()
    }

    fn reset(&mut self) {
        for s in self.history.iter_mut() {
            *s = 0.0;
        }

        self.idx = 0;
        self.odd = false;
    }
}
