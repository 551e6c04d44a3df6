//! Decoding of the DCS sub-audible squelch code.
//!
//! DCS sends a 23-bit codeword continuously at 134.4 baud under the voice audio. The
//! decoder low-pass filters the audio and follows the least squares slope of the
//! filtered signal: a symbol transition is declared once the slope has peaked (its crest
//! passed the threshold) and started back toward the other polarity. Each baud period
//! the current symbol is shifted into a register, which is then looked up in the code
//! table.

pub mod codes;

use log::debug;

use crate::filter::design::{self, Window};
use crate::filter::{CalibrationSet, CalibrationType, FirFilter, HalfBandDecimator, RealFilter};

pub use self::codes::DcsCode;

/// DCS symbol rate.
pub const BAUD_RATE: f32 = 134.4;

/// Rate the decoder parameters were tuned at.
const REFERENCE_RATE: f32 = 8000.0;

/// Samples in the slope regression window.
const SLOPE_PERIOD: usize = 30;

/// Sum of squared deviations of the regression window positions.
const SLOPE_SUM_XX: f32 = 2247.5;

/// Longest legal run of one bits in a codeword.
const MAX_ONES: usize = 6;

/// Pass band edge of the pre-filter, Hz.
const PASS_BAND: f64 = 200.0;

/// Stop band edge of the pre-filter, Hz.
const STOP_BAND: f64 = 300.0;

/// Taps in each half-band decimation stage.
const HALF_BAND_TAPS: usize = 31;

/// Tone decoder parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToneConfig {
    /// Input sample rate, Hz.
    pub sample_rate: f32,
    /// Codes to report. All codes are reported if empty.
    pub targets: Vec<DcsCode>,
    /// Consecutive matches of a code before it's reported.
    pub confirmations: usize,
    /// Codeword periods without a match before a reported code is lost.
    pub loss_codewords: usize,
}

impl Default for ToneConfig {
    fn default() -> Self {
        ToneConfig {
            sample_rate: REFERENCE_RATE,
            targets: vec![],
            confirmations: 2,
            loss_codewords: 4,
        }
    }
}

impl ToneConfig {
    pub fn sample_rate(mut self, rate: f32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn targets(mut self, targets: Vec<DcsCode>) -> Self {
        self.targets = targets;
        self
    }

    pub fn confirmations(mut self, confirmations: usize) -> Self {
        assert!(confirmations > 0);

        self.confirmations = confirmations;
        self
    }
}

/// Tone decoding events, timestamped with the index of the input sample that completed
/// the codeword.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ToneEvent {
    /// A confirmed code was received again.
    Detected { code: DcsCode, timestamp: u64 },
    /// A reported code hasn't been received for several codeword periods.
    Lost { code: DcsCode, timestamp: u64 },
}

/// Filters and decimates audio ahead of the slope decoder.
pub struct ToneDecoder {
    /// Half-band stages taking the input down below 16 kHz.
    decimators: Vec<HalfBandDecimator>,
    lowpass: FirFilter,
    detector: DcsDetector,
    /// Input samples consumed so far.
    samples: u64,
}

impl ToneDecoder {
    pub fn new(config: ToneConfig, cal: &CalibrationSet) -> ToneDecoder {
        assert!(config.sample_rate >= 2.0 * STOP_BAND as f32);

        let halfband = design::halfband(HALF_BAND_TAPS, Window::Blackman);
        let mut decimators = vec![];
        let mut rate = config.sample_rate;

        while rate >= 2.0 * REFERENCE_RATE {
            decimators.push(HalfBandDecimator::new(&halfband,
                cal.get(CalibrationType::HalfBand)));
            rate /= 2.0;
        }

        let coefs = design::lowpass(rate as f64, PASS_BAND, STOP_BAND, Window::Hamming);

        debug!("tone decoder: {} decimation stages, {} Hz, {} taps", decimators.len(),
               rate, coefs.len());

        ToneDecoder {
            decimators,
            lowpass: FirFilter::new(&coefs, cal.get(CalibrationType::FirFilter)),
            detector: DcsDetector::new(rate, config),
            samples: 0,
        }
    }

    /// Currently confirmed code, if any.
    pub fn code(&self) -> Option<DcsCode> { self.detector.code() }

    /// Decode the given buffer of audio samples.
    pub fn process(&mut self, samples: &[f32]) -> Vec<ToneEvent> {
        let mut events = vec![];

        for &s in samples {
            let timestamp = self.samples;
            self.samples += 1;

            let mut sample = Some(s);

            for d in self.decimators.iter_mut() {
                sample = match sample {
                    Some(s) => d.feed(s),
                    None => break,
                };
            }

            if let Some(s) = sample {
                let filtered = self.lowpass.feed(s);

                if let Some(e) = self.detector.feed(filtered, timestamp) {
                    events.push(e);
                }
            }
        }

        events
    }

    pub fn reset(&mut self) {
        for d in self.decimators.iter_mut() {
            d.reset();
        }

        self.lowpass.reset();
        self.detector.reset();
        self.samples = 0;
    }
}

/// Slope-tracking DCS symbol and code decoder over low-pass filtered samples.
pub struct DcsDetector {
    config: ToneConfig,
    /// Samples per baud.
    baud_length: f32,
    /// Slope magnitude a crest must reach to count.
    threshold: f32,
    /// Samples to ignore after a transition.
    settle: usize,
    /// Earliest ideal position of a transition within a baud.
    ideal_min: f32,
    /// Latest ideal position of a transition within a baud.
    ideal_max: f32,

    /// Regression window, as a ring.
    window: [f32; SLOPE_PERIOD],
    /// Index of the oldest sample in `window`.
    pos: usize,
    /// Current symbol.
    symbol: bool,
    /// Extreme slope seen since the last transition.
    crest: f32,
    /// Position within the current baud.
    baud_counter: f32,
    /// Samples remaining to skip.
    skip: usize,
    /// Receive register.
    register: u32,
    /// Bauds in the current run of ones.
    ones: usize,

    /// Code being confirmed or tracked.
    tracking: Option<DcsCode>,
    /// Consecutive matches of `tracking`.
    matches: usize,
    /// Bauds since the last match.
    since_match: usize,
}

impl DcsDetector {
    /// Create a detector for samples at the given rate.
    pub fn new(sample_rate: f32, config: ToneConfig) -> DcsDetector {
        let scale = sample_rate / REFERENCE_RATE;

        DcsDetector {
            config,
            baud_length: sample_rate / BAUD_RATE,
            threshold: 0.00275 / scale,
            settle: (30.0 * scale) as usize,
            ideal_min: (11.0 * scale).floor(),
            ideal_max: (19.0 * scale).floor(),
            window: [0.0; SLOPE_PERIOD],
            pos: 0,
            symbol: false,
            crest: 0.0,
            baud_counter: 0.0,
            skip: 0,
            register: 0,
            ones: 0,
            tracking: None,
            matches: 0,
            since_match: 0,
        }
    }

    pub fn code(&self) -> Option<DcsCode> {
        if self.matches >= self.config.confirmations {
            self.tracking
        } else {
            None
        }
    }

    /// Least squares slope of the samples in the window.
    fn slope(&self) -> f32 {
        let mid = (SLOPE_PERIOD - 1) as f32 / 2.0;

        (0..SLOPE_PERIOD).fold(0.0, |sum, i| {
            let y = self.window[(self.pos + i) % SLOPE_PERIOD];
            sum + (i as f32 - mid) * y
        }) / SLOPE_SUM_XX
    }

    /// Process a filtered sample.
    pub fn feed(&mut self, sample: f32, timestamp: u64) -> Option<ToneEvent> {
        self.window[self.pos] = sample;
        self.pos = (self.pos + 1) % SLOPE_PERIOD;

        if self.skip > 0 {
            self.skip -= 1;
        } else {
            self.track(self.slope());
        }

        self.baud_counter += 1.0;

        if self.baud_counter <= self.baud_length {
            return None;
        }

        self.baud_counter -= self.baud_length;
        self.register = (self.register << 1 | self.symbol as u32) & codes::CODEWORD_MASK;

        let event = match DcsCode::from_value(self.register) {
            Some(code) => self.matched(code, timestamp),
            None => self.missed(timestamp),
        };

        if self.symbol {
            self.ones += 1;

            if self.ones > MAX_ONES {
                self.symbol = false;
                self.crest = -1.0;
                self.ones = 0;
            }
        } else {
            self.ones = 0;
        }

        event
    }

    /// Follow the slope crest and flip the symbol once it turns back.
    fn track(&mut self, slope: f32) {
        if self.symbol {
            if slope > self.crest && self.crest < -self.threshold {
                self.symbol = false;
                self.transition();
            } else if slope < self.crest {
                self.crest = slope;
            }
        } else {
            if slope < self.crest && self.crest > self.threshold {
                self.symbol = true;
                self.transition();
            } else if slope > self.crest {
                self.crest = slope;
            }
        }
    }

    /// Nudge baud timing toward putting transitions in the ideal window and start the
    /// settling skip.
    fn transition(&mut self) {
        let adjust: isize = if self.baud_counter < self.ideal_min {
            1
        } else if self.baud_counter > self.ideal_max {
            -1
        } else {
            0
        };

        self.baud_counter += adjust as f32;
        self.skip = (self.settle as isize + adjust) as usize;
    }

    fn matched(&mut self, code: DcsCode, timestamp: u64) -> Option<ToneEvent> {
        if !self.config.targets.is_empty() && !self.config.targets.contains(&code) {
            return None;
        }

        self.since_match = 0;

        match self.tracking {
            Some(t) if t == code => {
                self.matches = (self.matches + 1).min(self.config.confirmations);
            },
            Some(t) if t.is_alias(&code) => return None,
            _ => {
                debug!("tone: candidate {}", code);

                self.tracking = Some(code);
                self.matches = 1;
            },
        }

        if self.matches >= self.config.confirmations {
            Some(ToneEvent::Detected { code, timestamp })
        } else {
            None
        }
    }

    fn missed(&mut self, timestamp: u64) -> Option<ToneEvent> {
        let code = self.tracking?;

        self.since_match += 1;

        if self.since_match < self.config.loss_codewords * codes::CODEWORD_BITS {
            return None;
        }

        let reported = self.matches >= self.config.confirmations;

        self.tracking = None;
        self.matches = 0;
        self.since_match = 0;

        if reported {
            debug!("tone: lost {}", code);
            Some(ToneEvent::Lost { code, timestamp })
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.window = [0.0; SLOPE_PERIOD];
        self.pos = 0;
        self.symbol = false;
        self.crest = 0.0;
        self.baud_counter = 0.0;
        self.skip = 0;
        self.register = 0;
        self.ones = 0;
        self.tracking = None;
        self.matches = 0;
        self.since_match = 0;
    }
}
