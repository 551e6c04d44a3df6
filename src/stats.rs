//! Runtime statistics.

use crate::consts::{CODING_BITS, SYNC_BITS};
use crate::error::DecodeError;

/// Tracks stats for an error correction code.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeStats {
    /// Number of symbols per word.
    size: usize,
    /// Total number of received words.
    words: usize,
    /// Number of corrected symbols.
    fixed: usize,
    /// Number of unrecoverable words.
    err: usize,
}

impl CodeStats {
    /// Create a new `CodeStats` with empty counters for the code with the given number of
    /// symbols per word.
    fn new(size: usize) -> Self {
        CodeStats {
            size,
            words: 0,
            err: 0,
            fixed: 0,
        }
    }

    /// Record that a word was received with the given amount of corrected symbols.
    pub fn record_fixes(&mut self, err: usize) {
        debug_assert!(err <= self.size);

        self.words += 1;
        self.fixed += err;
    }

    /// Record that a word was received with an unrecoverable error.
    pub fn record_err(&mut self) {
        self.words += 1;
        self.err += 1;
    }

    /// Merge in the stats from the given object and clear the other stats.
    fn merge(&mut self, other: &mut CodeStats) {
        debug_assert!(self.size == other.size);

        self.words += other.words;
        self.err += other.err;
        self.fixed += other.fixed;

        other.clear();
    }

    /// Total number of received words.
    pub fn words(&self) -> usize { self.words }
    /// Number of corrected symbols across all words.
    pub fn fixed(&self) -> usize { self.fixed }
    /// Number of unrecoverable words.
    pub fn errors(&self) -> usize { self.err }

    /// Clear all stats.
    fn clear(&mut self) {
        self.words = 0;
        self.err = 0;
        self.fixed = 0;
    }
}

/// Records various runtime statistics.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Stats {
    /// Stats for the 1/2-rate (dibit) Viterbi code.
    pub viterbi_dibit: CodeStats,
    /// Stats for the 3/4-rate (tribit) Viterbi code.
    pub viterbi_tribit: CodeStats,
    /// Stats for the single-bit correcting header CRC-16.
    pub header_crc: CodeStats,
    /// Stats for the confirmed block CRC-9.
    pub block_crc: CodeStats,
    /// Stats for frame sync matching.
    pub sync: CodeStats,
    /// Stats for the NID BCH code.
    pub nid: CodeStats,
    /// Number of NIDs that didn't carry a known data unit.
    pub unknown_nid: usize,
    /// Number of packet sequences abandoned before completion.
    pub dropped_packets: usize,
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            viterbi_dibit: CodeStats::new(CODING_BITS),
            viterbi_tribit: CodeStats::new(CODING_BITS),
            header_crc: CodeStats::new(96),
            block_crc: CodeStats::new(144),
            sync: CodeStats::new(SYNC_BITS),
            nid: CodeStats::new(63),
            unknown_nid: 0,
            dropped_packets: 0,
        }
    }
}

impl Stats {
    /// Merge in the stats from the given object and reset the other stats back to
    /// default.
    pub fn merge<T: HasStats>(&mut self, other: &mut T) {
        let stats = other.stats();

        self.viterbi_dibit.merge(&mut stats.viterbi_dibit);
        self.viterbi_tribit.merge(&mut stats.viterbi_tribit);
        self.header_crc.merge(&mut stats.header_crc);
        self.block_crc.merge(&mut stats.block_crc);
        self.sync.merge(&mut stats.sync);
        self.nid.merge(&mut stats.nid);
        self.unknown_nid += stats.unknown_nid;
        self.dropped_packets += stats.dropped_packets;

        stats.unknown_nid = 0;
        stats.dropped_packets = 0;
    }

    /// Clear all stats.
    pub fn clear(&mut self) {
        *self = Stats::default();
    }

    /// Record the given error into the current stats.
    pub fn record_err(&mut self, err: DecodeError) {
        use crate::error::DecodeError::*;

        match err {
            // The decoder doesn't know which rate failed, and 1/2 rate is the common case.
            ViterbiUnrecoverable => self.viterbi_dibit.record_err(),
            HeaderCrc => self.header_crc.record_err(),
            BlockCrc { .. } => self.block_crc.record_err(),
            BchUnrecoverable => self.nid.record_err(),
            UnknownNid(_) => self.unknown_nid += 1,
            UnknownFormat(_) | SequenceOverflow { .. } => self.dropped_packets += 1,
        }
    }
}

/// Indicates that a type captures statistics.
pub trait HasStats {
    /// Retrieve captured statistics.
    fn stats(&mut self) -> &mut Stats;
}
