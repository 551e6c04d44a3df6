//! Symbol timing recovery from the frame sync waveform.
//!
//! The filtered samples are correlated, at symbol spacing, against the ideal sync
//! levels. Both sides have their mean removed first, which makes the score blind to DC
//! offset and gain. Every sync variant is then a scaled copy of the normal or negated
//! template, so one template finds them all, and the variant itself is left for the
//! frame synchronizer to resolve from the sliced symbols.
//!
//! A lock is declared at the sample where the correlation peaks, the center of the final
//! sync symbol, so the symbol clock can be aligned to it wherever the input started
//! relative to the transmitter's clock.

use crate::baseband::level;
use crate::consts::{SYMBOL_PERIOD, SYNC_SYMBOLS};
use crate::sync::STANDARD_TEMPLATES;

/// Minimum correlation magnitude considered a sync candidate.
pub const SYNC_CORRELATION: f32 = 0.9;

/// Samples from the center of the first sync symbol to the center of the last.
const SPAN: usize = (SYNC_SYMBOLS - 1) * SYMBOL_PERIOD + 1;

/// Samples kept, enough to look back over the whole sync after a late lock.
const HISTORY: usize = SPAN + SYMBOL_PERIOD;

/// Samples to wait past a candidate peak for a higher one.
const PEAK_WINDOW: usize = SYMBOL_PERIOD / 2;

/// Location of a correlation peak.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SyncLock {
    /// Correlation magnitude at the peak, in `[0, 1]`.
    pub score: f32,
    /// Samples fed since the peak.
    pub age: usize,
}

/// Remove the mean of the given values.
fn center(vals: &mut [f32; SYNC_SYMBOLS]) {
    let mean = vals.iter().sum::<f32>() / SYNC_SYMBOLS as f32;

    for v in vals.iter_mut() {
        *v -= mean;
    }
}

/// Searches the sample stream for the sync waveform.
pub struct SyncCorrelator {
    /// Zero-mean, unit-energy sync levels.
    template: [f32; SYNC_SYMBOLS],
    /// Ring of recent samples.
    history: [f32; HISTORY],
    /// Index the next sample is written to.
    pos: usize,
    /// Valid samples in the ring.
    fill: usize,
    /// Best candidate so far.
    peak: Option<SyncLock>,
}

impl SyncCorrelator {
    pub fn new() -> SyncCorrelator {
        let mut template = [0.0; SYNC_SYMBOLS];

        for (l, d) in template.iter_mut().zip(STANDARD_TEMPLATES[0].dibits()) {
            *l = level(d);
        }

        center(&mut template);

        let norm = template.iter().map(|l| l * l).sum::<f32>().sqrt();

        for l in template.iter_mut() {
            *l /= norm;
        }

        SyncCorrelator {
            template,
            history: [0.0; HISTORY],
            pos: 0,
            fill: 0,
            peak: None,
        }
    }

    /// Sample fed `back` samples before the most recent one.
    fn sample(&self, back: usize) -> f32 {
        debug_assert!(back < HISTORY);
        self.history[(self.pos + HISTORY - 1 - back) % HISTORY]
    }

    /// Add a sample to the history without searching it.
    pub fn record(&mut self, s: f32) {
        self.history[self.pos] = s;
        self.pos = (self.pos + 1) % HISTORY;

        if self.fill < HISTORY {
            self.fill += 1;
        }
    }

    /// Samples at symbol spacing ending `back` samples ago, first sync symbol first.
    fn taps(&self, back: usize) -> [f32; SYNC_SYMBOLS] {
        let mut taps = [0.0; SYNC_SYMBOLS];

        for (i, t) in taps.iter_mut().enumerate() {
            *t = self.sample(back + (SYNC_SYMBOLS - 1 - i) * SYMBOL_PERIOD);
        }

        taps
    }

    /// Correlation magnitude of the most recent samples, once enough have been fed.
    fn score(&self) -> Option<f32> {
        if self.fill < SPAN {
            return None;
        }

        let mut taps = self.taps(0);
        center(&mut taps);

        let energy = taps.iter().map(|t| t * t).sum::<f32>().sqrt();

        if energy < 1e-6 {
            return Some(0.0);
        }

        let dot: f32 = taps.iter().zip(self.template.iter()).map(|(t, l)| t * l).sum();

        Some((dot / energy).abs())
    }

    /// Feed in a filtered sample, returning a lock once a correlation peak has passed.
    pub fn feed(&mut self, s: f32) -> Option<SyncLock> {
        self.record(s);

        let score = self.score()?;

        match self.peak.take() {
            None => {
                if score >= SYNC_CORRELATION {
                    self.peak = Some(SyncLock { score, age: 0 });
                }

                None
            },
            Some(mut peak) => {
                peak.age += 1;

                if score > peak.score {
                    self.peak = Some(SyncLock { score, age: 0 });
                    None
                } else if score < peak.score || peak.age >= PEAK_WINDOW {
                    Some(peak)
                } else {
                    self.peak = Some(peak);
                    None
                }
            },
        }
    }

    /// Samples at each sync symbol center of the given lock, in receive order.
    pub fn sync_samples(&self, lock: &SyncLock) -> [f32; SYNC_SYMBOLS] {
        self.taps(lock.age)
    }

    /// Forget all history and any candidate peak.
    pub fn reset(&mut self) {
        self.history = [0.0; HISTORY];
        self.pos = 0;
        self.fill = 0;
        self.peak = None;
    }
}
