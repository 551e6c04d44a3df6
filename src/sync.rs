//! Frame synchronization against the known sync sequence and its phase/polarity
//! variants.

use crate::bits::{pack_dibits, Dibit, Dibits};
use crate::buffer::SymbolDelayLine;
use crate::consts::{SYNC_BIT_ERRORS, SYNC_LOSS_SYMBOLS, SYNC_SYMBOLS};

/// Frame sync sequence as transmitted with normal polarity and phase.
pub const SYNC_WORD: u64 = 0x5575F5FF77FF;

/// Received form of the sync sequence, which determines how the following symbols
/// must be corrected.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SyncPattern {
    /// Received as transmitted.
    Normal,
    /// Received with flipped deviation polarity.
    Inverted,
    /// Received with the carrier phase rotated a quarter turn counterclockwise.
    PlusNinety,
    /// Received with the carrier phase rotated a quarter turn clockwise.
    MinusNinety,
}

impl SyncPattern {
    /// Map a symbol transmitted normally into the symbol received under this pattern.
    pub fn apply(self, d: Dibit) -> Dibit {
        use self::SyncPattern::*;

        match self {
            Normal => d,
            Inverted => d.invert(),
            // A quarter turn moves every symbol to one of its allowable transitions.
            PlusNinety => d.transitions()[0],
            MinusNinety => d.transitions()[1],
        }
    }

    /// Map a symbol received under this pattern back into the transmitted symbol.
    pub fn correct(self, d: Dibit) -> Dibit {
        use self::SyncPattern::*;

        match self {
            Normal => d,
            Inverted => d.invert(),
            PlusNinety => d.transitions()[1],
            MinusNinety => d.transitions()[0],
        }
    }
}

/// A bit pattern to search for and the number of bit errors it tolerates.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SyncTemplate {
    /// Variant this template recognizes.
    pub pattern: SyncPattern,
    /// Template bits, first symbol in the highest position.
    pub bits: u64,
    /// Length of the template in symbols.
    pub symbols: usize,
    /// Maximum Hamming distance that still counts as a match.
    pub tolerance: u32,
}

impl SyncTemplate {
    /// Create a template for the standard sync sequence received with the given
    /// pattern.
    pub fn standard(pattern: SyncPattern) -> SyncTemplate {
        let bits = pack_dibits(sync_dibits(SYNC_WORD).map(|d| pattern.apply(d)));

        SyncTemplate {
            pattern,
            bits,
            symbols: SYNC_SYMBOLS,
            tolerance: SYNC_BIT_ERRORS,
        }
    }

    /// Number of bits differing between the template and the given word.
    pub fn distance(&self, word: u64) -> u32 {
        let mask = match self.symbols {
            32 => !0,
            n => (1u64 << (n * 2)) - 1,
        };

        ((word ^ self.bits) & mask).count_ones()
    }

    /// Check if the given word matches within the template's tolerance, returning the
    /// number of bit errors if so.
    pub fn check(&self, word: u64) -> Option<u32> {
        let dist = self.distance(word);

        if dist <= self.tolerance {
            Some(dist)
        } else {
            None
        }
    }

    /// The ideal symbols of the template, in receive order.
    pub fn dibits(&self) -> Vec<Dibit> {
        let shift = 64 - self.symbols * 2;
        Dibits::new((self.bits << shift).to_be_bytes().iter().cloned())
            .take(self.symbols)
            .collect()
    }
}

lazy_static! {
    /// Templates for every variant of the standard sync sequence, normal first.
    pub static ref STANDARD_TEMPLATES: [SyncTemplate; 4] = [
        SyncTemplate::standard(SyncPattern::Normal),
        SyncTemplate::standard(SyncPattern::Inverted),
        SyncTemplate::standard(SyncPattern::PlusNinety),
        SyncTemplate::standard(SyncPattern::MinusNinety),
    ];
}

/// Split the 24-symbol sync word into dibits in transmit order.
fn sync_dibits(word: u64) -> impl Iterator<Item = Dibit> {
    Dibits::new((word << 16).to_be_bytes().to_vec().into_iter()).take(SYNC_SYMBOLS)
}

/// Result of feeding a symbol to the synchronizer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SyncEvent {
    /// A template matched the most recent symbols.
    Detected {
        /// Variant that matched.
        pattern: SyncPattern,
        /// Number of bits in the window that differed from the template.
        bit_errors: u32,
    },
    /// No template has matched for the given number of symbols.
    Lost {
        /// Symbols since the last match.
        symbols: usize,
    },
}

/// Searches the most recent symbols of a delay line for frame sync.
pub struct FrameSynchronizer {
    /// Templates to search for, in priority order for equal distances.
    templates: Vec<SyncTemplate>,
    /// Symbols fed since the last match.
    unmatched: usize,
}

impl FrameSynchronizer {
    /// Create a new `FrameSynchronizer` searching for every standard sync variant.
    pub fn new() -> Self {
        Self::with_templates(STANDARD_TEMPLATES.to_vec())
    }

    /// Create a new `FrameSynchronizer` searching for the given templates.
    pub fn with_templates(templates: Vec<SyncTemplate>) -> Self {
        assert!(!templates.is_empty());
        assert!(templates.iter().all(|t| t.symbols <= 32));

        FrameSynchronizer {
            templates,
            unmatched: 0,
        }
    }

    /// Templates searched by this synchronizer.
    pub fn templates(&self) -> &[SyncTemplate] { &self.templates }

    /// Number of symbols fed since the last match.
    pub fn unmatched(&self) -> usize { self.unmatched }

    /// Find the closest template matching the most recent symbols of the given line.
    pub fn search(&self, line: &SymbolDelayLine) -> Option<(SyncTemplate, u32)> {
        self.templates
            .iter()
            .filter(|t| t.symbols <= line.len())
            .filter_map(|t| {
                let word = pack_dibits(line.recent(t.symbols));
                t.check(word).map(|dist| (*t, dist))
            })
            .fold(None, |best, (t, dist)| match best {
                Some((_, best_dist)) if best_dist <= dist => best,
                _ => Some((t, dist)),
            })
    }

    /// Check the line after a new symbol has been inserted.
    ///
    /// On a match the matched window is overwritten with the ideal template symbols.
    pub fn feed(&mut self, line: &mut SymbolDelayLine) -> Option<SyncEvent> {
        match self.search(line) {
            Some((template, bit_errors)) => {
                line.update(&template.dibits());
                self.unmatched = 0;

                Some(SyncEvent::Detected {
                    pattern: template.pattern,
                    bit_errors,
                })
            },
            None => {
                self.unmatched += 1;

                if self.unmatched % SYNC_LOSS_SYMBOLS == 0 {
                    Some(SyncEvent::Lost { symbols: self.unmatched })
                } else {
                    None
                }
            },
        }
    }

    /// Clear the loss of sync counter.
    pub fn reset(&mut self) { self.unmatched = 0; }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fill(line: &mut SymbolDelayLine, word: u64) {
        for d in sync_dibits(word) {
            line.insert(d);
        }
    }

    #[test]
    fn test_variants() {
        let t = &*STANDARD_TEMPLATES;

        assert_eq!(t[0].bits, 0x5575F5FF77FF);
        assert_eq!(t[1].bits, 0xFFDF5F55DD55);
        assert_eq!(t[2].bits, 0xFFEFAFAAEEAA);
        assert_eq!(t[3].bits, 0x001050551155);

        for a in t.iter() {
            for b in t.iter().filter(|b| b.pattern != a.pattern) {
                assert!(a.distance(b.bits) > 2 * SYNC_BIT_ERRORS);
            }
        }
    }

    #[test]
    fn test_correct() {
        for t in STANDARD_TEMPLATES.iter() {
            let corrected: Vec<Dibit> = t.dibits().into_iter()
                .map(|d| t.pattern.correct(d))
                .collect();

            assert_eq!(corrected, STANDARD_TEMPLATES[0].dibits());
        }

        // Quarter turns never skip past a neighboring point.
        for t in &STANDARD_TEMPLATES[2..] {
            assert!(STANDARD_TEMPLATES[0].dibits().into_iter().zip(t.dibits())
                .all(|(n, r)| n.allows(r)));
        }
    }

    #[test]
    fn test_threshold() {
        let mut sync = FrameSynchronizer::new();

        for errors in 0..=SYNC_BIT_ERRORS + 1 {
            // Flip the lowest `errors` bits.
            let word = SYNC_WORD ^ ((1 << errors) - 1);

            let mut line = SymbolDelayLine::new(SYNC_SYMBOLS);
            fill(&mut line, word);

            let event = sync.feed(&mut line);

            if errors <= SYNC_BIT_ERRORS {
                assert_eq!(event, Some(SyncEvent::Detected {
                    pattern: SyncPattern::Normal,
                    bit_errors: errors,
                }));

                // Snapped to the ideal sequence.
                assert_eq!(pack_dibits(line.recent(SYNC_SYMBOLS)), SYNC_WORD);
            } else {
                assert!(event.is_none());
                assert!(sync.search(&line).is_none());
            }
        }
    }

    #[test]
    fn test_patterns() {
        let mut sync = FrameSynchronizer::new();
        let mut line = SymbolDelayLine::new(48);

        fill(&mut line, 0xFFDF5F55DD55 ^ 0b101);

        assert!(if let Some(SyncEvent::Detected { pattern: SyncPattern::Inverted, bit_errors: 2 }) =
            sync.feed(&mut line) { true } else { false });

        fill(&mut line, 0x001050551155);

        assert!(if let Some(SyncEvent::Detected { pattern: SyncPattern::MinusNinety, bit_errors: 0 }) =
            sync.feed(&mut line) { true } else { false });
    }

    #[test]
    fn test_lost() {
        let mut sync = FrameSynchronizer::new();
        let mut line = SymbolDelayLine::new(SYNC_SYMBOLS);

        for _ in 0..SYNC_SYMBOLS {
            line.insert(Dibit::new(0b01));
        }

        for i in 1..SYNC_LOSS_SYMBOLS * 2 + 1 {
            line.insert(Dibit::new(0b01));
            let event = sync.feed(&mut line);

            if i % SYNC_LOSS_SYMBOLS == 0 {
                assert_eq!(event, Some(SyncEvent::Lost { symbols: i }));
            } else {
                assert!(event.is_none());
            }
        }

        fill(&mut line, SYNC_WORD);
        assert!(sync.feed(&mut line).is_some());
        assert_eq!(sync.unmatched(), 0);
    }

    #[test]
    fn test_custom_template() {
        let t = SyncTemplate {
            pattern: SyncPattern::Normal,
            bits: 0b01_11_01_11,
            symbols: 4,
            tolerance: 0,
        };

        let mut sync = FrameSynchronizer::with_templates(vec![t]);
        let mut line = SymbolDelayLine::new(8);

        for &b in &[0b01, 0b11, 0b01] {
            line.insert(Dibit::new(b));
            assert!(sync.feed(&mut line).is_none());
        }

        line.insert(Dibit::new(0b11));
        assert!(sync.feed(&mut line).is_some());
        assert_eq!(sync.templates().len(), 1);
    }
}
