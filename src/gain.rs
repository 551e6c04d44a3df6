//! Amplitude normalization ahead of filtering and symbol decisions.

use num::complex::Complex32;

/// Smallest peak or envelope used as a gain divisor.
const MIN_LEVEL: f32 = 1e-6;

/// Parameters for `PeakGain`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeakGainConfig {
    /// Desired peak output amplitude.
    pub target: f32,
    /// Lower bound on the applied gain.
    pub min_gain: f32,
    /// Upper bound on the applied gain.
    pub max_gain: f32,
    /// Maximum change in gain from one sample to the next.
    pub max_step: f32,
    /// Fraction of the tracked peak lost at the start of each buffer.
    pub decay: f32,
    /// Output samples are clamped to `[-ceiling, ceiling]`.
    pub ceiling: f32,
    /// Whether to subtract each buffer's mean before measuring the peak.
    pub remove_dc: bool,
}

impl Default for PeakGainConfig {
    fn default() -> Self {
        PeakGainConfig {
            target: 0.75,
            min_gain: 1.0,
            max_gain: 25.0,
            max_step: 0.001,
            decay: 0.1,
            ceiling: 0.95,
            remove_dc: true,
        }
    }
}

impl PeakGainConfig {
    pub fn target(mut self, target: f32) -> Self {
        self.target = target;
        self
    }

    pub fn gain_range(mut self, min_gain: f32, max_gain: f32) -> Self {
        assert!(min_gain > 0.0 && min_gain <= max_gain);

        self.min_gain = min_gain;
        self.max_gain = max_gain;
        self
    }

    pub fn max_step(mut self, max_step: f32) -> Self {
        self.max_step = max_step;
        self
    }

    pub fn remove_dc(mut self, remove_dc: bool) -> Self {
        self.remove_dc = remove_dc;
        self
    }
}

/// Peak tracking gain for real audio-rate samples.
///
/// The peak amplitude seen so far decays at every buffer so a single spike loses its
/// influence over time. The gain slews toward `target / peak` by a bounded step each
/// sample rather than jumping, and the output is hard clamped to the ceiling.
#[derive(Clone, Debug)]
pub struct PeakGain {
    config: PeakGainConfig,
    /// Decayed peak absolute amplitude.
    peak: f32,
    /// Gain applied to the most recent sample.
    gain: f32,
}

impl PeakGain {
    pub fn new(config: PeakGainConfig) -> Self {
        PeakGain {
            config,
            peak: 0.0,
            gain: config.min_gain,
        }
    }

    pub fn config(&self) -> &PeakGainConfig { &self.config }
    pub fn gain(&self) -> f32 { self.gain }
    pub fn peak(&self) -> f32 { self.peak }

    /// Gain the current peak calls for, within the configured bounds.
    pub fn objective(&self) -> f32 {
        (self.config.target / self.peak.max(MIN_LEVEL))
            .max(self.config.min_gain)
            .min(self.config.max_gain)
    }

    /// Normalize the given buffer.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        if samples.is_empty() {
            return vec![];
        }

        let bias = if self.config.remove_dc {
            samples.iter().sum::<f32>() / samples.len() as f32
        } else {
            0.0
        };

        let max = samples.iter().fold(0.0f32, |max, &s| max.max((s - bias).abs()));

        self.peak *= 1.0 - self.config.decay;
        self.peak = self.peak.max(max);

        let objective = self.objective();
        let step = self.config.max_step;
        let ceiling = self.config.ceiling;

        samples.iter().map(|&s| {
            self.gain += (objective - self.gain).max(-step).min(step);
            ((s - bias) * self.gain).max(-ceiling).min(ceiling)
        }).collect()
    }

    pub fn reset(&mut self) {
        self.peak = 0.0;
        self.gain = self.config.min_gain;
    }
}

/// Feed-forward gain for complex baseband samples.
///
/// The gain scales the largest magnitude within a sliding window to the objective
/// envelope. It's only recalculated when the window maximum changes.
#[derive(Clone, Debug)]
pub struct EnvelopeGain {
    /// Magnitude history, overwritten circularly.
    window: Vec<f32>,
    /// Index of the oldest magnitude in `window`.
    pos: usize,
    /// Largest magnitude in `window`.
    max: f32,
    /// Desired output envelope.
    objective: f32,
    /// Floor on the window maximum.
    min_envelope: f32,
    gain: f32,
}

impl EnvelopeGain {
    /// Create a new `EnvelopeGain` over a window of the given number of samples.
    pub fn new(window: usize, objective: f32, min_envelope: f32) -> Self {
        assert!(window > 0);
        assert!(min_envelope > 0.0);

        let mut agc = EnvelopeGain {
            window: vec![0.0; window],
            pos: 0,
            max: 0.0,
            objective,
            min_envelope,
            gain: 0.0,
        };

        agc.update_gain();
        agc
    }

    pub fn gain(&self) -> f32 { self.gain }

    /// Normalize the given buffer.
    pub fn process(&mut self, samples: &[Complex32]) -> Vec<Complex32> {
        samples.iter().map(|&s| {
            self.feed(s.norm());
            s * self.gain
        }).collect()
    }

    fn feed(&mut self, mag: f32) {
        let ejected = self.window[self.pos];

        self.window[self.pos] = mag;
        self.pos = (self.pos + 1) % self.window.len();

        if mag > self.max {
            self.max = mag;
            self.update_gain();
        } else if ejected == self.max && mag < self.max {
            self.max = self.window.iter().fold(0.0, |max, &m| m.max(max));
            self.update_gain();
        }
    }

    fn update_gain(&mut self) {
        self.gain = self.objective / self.max.max(self.min_envelope);
    }

    pub fn reset(&mut self) {
        for m in self.window.iter_mut() {
            *m = 0.0;
        }

        self.pos = 0;
        self.max = 0.0;
        self.update_gain();
    }
}
