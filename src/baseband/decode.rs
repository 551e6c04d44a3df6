use crate::bits::Dibit;
use crate::consts::SYMBOL_PERIOD;

/// Decodes symbol from sample at each symbol instant.
#[derive(Copy, Clone)]
pub struct Decoder {
    pos: usize,
    /// Sample within each symbol period that's decided.
    phase: usize,
    decider: Decider,
}

impl Decoder {
    /// Create a new `Decoder` with the given symbol decider, deciding the `phase`th
    /// sample of each symbol period counted from the first sample fed.
    pub fn new(decider: Decider, phase: usize) -> Decoder {
        assert!(phase < SYMBOL_PERIOD);

        Decoder {
            pos: 0,
            phase,
            decider,
        }
    }

    /// Examine the given sample and, based on the symbol clock, decode it a symbol or
    /// do nothing.
    pub fn feed(&mut self, s: f32) -> Option<Dibit> {
        let hit = self.pos == self.phase;

        self.pos += 1;
        self.pos %= SYMBOL_PERIOD;

        if hit {
            Some(self.decider.decide(s))
        } else {
            None
        }
    }

    /// Shift the symbol clock so the `wait`th sample from now is decided, with
    /// `wait` in `1..=SYMBOL_PERIOD`.
    pub fn align(&mut self, wait: usize) {
        assert!(wait >= 1 && wait <= SYMBOL_PERIOD);
        self.pos = (self.phase + SYMBOL_PERIOD + 1 - wait) % SYMBOL_PERIOD;
    }

    /// Restart the symbol clock.
    pub fn reset(&mut self) { self.pos = 0; }

    pub fn decider(&self) -> &Decider { &self.decider }
}

/// Decides which symbol a sample represents with a threshold method.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Decider {
    pthresh: f32,
    mthresh: f32,
    nthresh: f32,
}

impl Decider {
    /// Create a new Decider with the given positive threshold, mid threshold, and
    /// negative threshold.
    pub fn new(pthresh: f32, mthresh: f32, nthresh: f32) -> Decider {
        assert!(nthresh <= mthresh && mthresh <= pthresh);

        Decider {
            pthresh,
            mthresh,
            nthresh,
        }
    }

    /// Create a new Decider for a signal whose outer symbol levels sit at `+peak` and
    /// `-peak`. Thresholds fall halfway between adjacent levels.
    pub fn for_peak(peak: f32) -> Decider {
        Decider::new(peak * 2.0 / 3.0, 0.0, -peak * 2.0 / 3.0)
    }

    /// Decide which symbol the given sample looks closest to.
    pub fn decide(&self, sample: f32) -> Dibit {
        if sample > self.pthresh {
            Dibit::new(0b01)
        } else if sample > self.mthresh {
            Dibit::new(0b00)
        } else if sample > self.nthresh {
            Dibit::new(0b10)
        } else {
            Dibit::new(0b11)
        }
    }
}
