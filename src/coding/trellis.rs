//! Implements encoding and decoding of the "trellis" convolutional error correcting code
//! specified by P25. Encoding is done with a state machine and decoding is done with the
//! Viterbi algorithm over a whole coded block, with the Hamming distance between
//! received and expected dibit pairs as the branch metric.

use log::debug;

use crate::bits;
use crate::error::{DecodeError, Result};

/// Half-rate convolutional ("trellis") code state machine.
pub type DibitFSM = TrellisFSM<DibitStates>;

/// 3/4-rate convolutional ("trellis") code state machine.
pub type TribitFSM = TrellisFSM<TribitStates>;

/// Half-rate convolution ("trellis") code decoder.
pub type DibitDecoder = ViterbiDecoder<DibitStates>;

/// 3/4-rate convolution ("trellis") code decoder.
pub type TribitDecoder = ViterbiDecoder<TribitStates>;

pub trait States {
    /// Symbol type to use for states and input.
    type Symbol;

    /// Number of rows/columns in the state machine.
    fn size() -> usize;

    /// Get the "constallation point" on the transition from the current state to the next
    /// state.
    fn pair_idx(cur: usize, next: usize) -> usize;

    /// Convert the given symbol to a state.
    fn state(input: Self::Symbol) -> usize;
    /// Convert the given state to a symbol.
    fn symbol(state: usize) -> Self::Symbol;

    /// Get the "flushing" symbol fed in at the end of a stream.
    fn finisher() -> Self::Symbol;

    /// Get the dibit pair on the transition from the current state to the next state.
    fn pair(state: usize, next: usize) -> (bits::Dibit, bits::Dibit) {
        const PAIRS: [(u8, u8); 16] = [
            (0b00, 0b10),
            (0b10, 0b10),
            (0b01, 0b11),
            (0b11, 0b11),
            (0b11, 0b10),
            (0b01, 0b10),
            (0b10, 0b11),
            (0b00, 0b11),
            (0b11, 0b01),
            (0b01, 0b01),
            (0b10, 0b00),
            (0b00, 0b00),
            (0b00, 0b01),
            (0b10, 0b01),
            (0b01, 0b00),
            (0b11, 0b00),
        ];

        let (hi, lo) = PAIRS[Self::pair_idx(state, next)];
        (bits::Dibit::new(hi), bits::Dibit::new(lo))
    }
}

/// Half-rate state machine (dibit input).
pub struct DibitStates;

impl States for DibitStates {
    type Symbol = bits::Dibit;

    fn size() -> usize { 4 }

    fn pair_idx(cur: usize, next: usize) -> usize {
        const STATES: [[usize; 4]; 4] = [
            [0, 15, 12, 3],
            [4, 11, 8, 7],
            [13, 2, 1, 14],
            [9, 6, 5, 10],
        ];

        STATES[cur][next]
    }

    fn state(input: bits::Dibit) -> usize { input.bits() as usize }
    fn finisher() -> Self::Symbol { bits::Dibit::new(0b00) }
    fn symbol(state: usize) -> Self::Symbol { bits::Dibit::new(state as u8) }
}

/// 3/4-rate state machine (tribit input).
pub struct TribitStates;

impl States for TribitStates {
    type Symbol = bits::Tribit;

    fn size() -> usize { 8 }

    fn pair_idx(cur: usize, next: usize) -> usize {
        const STATES: [[usize; 8]; 8] = [
            [0,  8, 4, 12, 2, 10, 6, 14],
            [4, 12, 2, 10, 6, 14, 0,  8],
            [1,  9, 5, 13, 3, 11, 7, 15],
            [5, 13, 3, 11, 7, 15, 1,  9],
            [3, 11, 7, 15, 1,  9, 5, 13],
            [7, 15, 1,  9, 5, 13, 3, 11],
            [2, 10, 6, 14, 0,  8, 4, 12],
            [6, 14, 0,  8, 4, 12, 2, 10],
        ];

        STATES[cur][next]
    }

    fn state(input: bits::Tribit) -> usize { input.bits() as usize }
    fn finisher() -> Self::Symbol { bits::Tribit::new(0b000) }
    fn symbol(state: usize) -> Self::Symbol { bits::Tribit::new(state as u8) }
}

/// Convolutional code finite state machine with the given transition table. Each fed-in
/// symbol is used as the next state.
pub struct TrellisFSM<S: States> {
    states: std::marker::PhantomData<S>,
    /// Current state.
    state: usize,
}

impl<S: States> TrellisFSM<S> {
    /// Construct a new `TrellisFSM` at the initial state.
    pub fn new() -> TrellisFSM<S> {
        TrellisFSM {
            states: std::marker::PhantomData,
            state: 0,
        }
    }

    /// Apply the given symbol to the state machine and return the dibit pair on the
    /// transition.
    pub fn feed(&mut self, input: S::Symbol) -> (bits::Dibit, bits::Dibit) {
        let next = S::state(input);
        let pair = S::pair(self.state, next);

        self.state = next;

        pair
    }

    /// Flush the state machine with the finishing symbol and return the final transition.
    pub fn finish(&mut self) -> (bits::Dibit, bits::Dibit) {
        self.feed(S::finisher())
    }
}

/// Decodes a whole received block to the nearest codeword path that starts and ends in
/// state 0.
pub struct ViterbiDecoder<S: States> {
    states: std::marker::PhantomData<S>,
    /// Accumulated path metric of each state, `None` if unreachable.
    metrics: Vec<Option<usize>>,
    /// Surviving predecessor of each state at each step.
    preds: Vec<Vec<usize>>,
}

impl<S: States> ViterbiDecoder<S> {
    /// Construct a new `ViterbiDecoder` at the initial state.
    pub fn new() -> ViterbiDecoder<S> {
        let mut metrics = vec![None; S::size()];
        metrics[0] = Some(0);

        ViterbiDecoder {
            states: std::marker::PhantomData,
            metrics,
            preds: vec![],
        }
    }

    /// Decode the given block of dibit pairs, including the flushing pair. Return the
    /// decoded symbols (without the flushing symbol) and the number of bits that
    /// differed from the chosen codeword.
    pub fn decode(mut self, dibits: &[bits::Dibit]) -> Result<(Vec<S::Symbol>, usize)> {
        if dibits.is_empty() || dibits.len() % 2 != 0 {
            return Err(DecodeError::ViterbiUnrecoverable);
        }

        for pair in dibits.chunks(2) {
            self.step(Edge::new((pair[0], pair[1])));
        }

        // The flushing symbol always drives the coder back to state 0.
        let distance = self.metrics[0].ok_or(DecodeError::ViterbiUnrecoverable)?;

        // States along the chosen path, starting and ending at 0.
        let mut path = Vec::with_capacity(self.preds.len() + 1);
        path.push(0);

        for preds in self.preds.iter().rev() {
            let prev = preds[path[path.len() - 1]];
            path.push(prev);
        }

        path.reverse();
        debug_assert!(path[0] == 0);

        let coded = path.windows(2).flat_map(|w| {
            let (hi, lo) = S::pair(w[0], w[1]);
            vec![hi, lo]
        });

        let jumps = jumps(dibits, coded);

        if jumps > 0 {
            debug!("trellis path crossed {} non-adjacent symbols", jumps);
        }

        let mut symbols: Vec<S::Symbol> = path[1..].iter().map(|&s| S::symbol(s)).collect();
        symbols.pop();

        Ok((symbols, distance))
    }

    /// Extend every surviving path by one received dibit pair.
    fn step(&mut self, input: Edge) {
        let mut metrics = vec![None; S::size()];
        let mut preds = vec![0; S::size()];

        for next in 0..S::size() {
            for (prev, metric) in self.metrics.iter().enumerate() {
                let metric = match *metric {
                    Some(m) => m + input.distance(Edge::new(S::pair(prev, next))),
                    None => continue,
                };

                // Ties keep the lowest numbered predecessor.
                match metrics[next] {
                    Some(best) if best <= metric => {},
                    _ => {
                        metrics[next] = Some(metric);
                        preds[next] = prev;
                    },
                }
            }
        }

        self.metrics = metrics;
        self.preds.push(preds);
    }
}

/// Count the received symbols that are neither the coded symbol nor one of its allowable
/// transitions. A slicing error normally lands on an adjacent constellation point, so
/// these mark gross corruption of the sequence.
pub fn jumps<T>(received: &[bits::Dibit], coded: T) -> usize
    where T: IntoIterator<Item = bits::Dibit>
{
    received.iter()
        .zip(coded)
        .filter(|&(&r, c)| r != c && !c.allows(r))
        .count()
}

#[derive(Copy, Clone)]
struct Edge(u8);

impl Edge {
    pub fn new((hi, lo): (bits::Dibit, bits::Dibit)) -> Edge {
        Edge(hi.bits() << 2 | lo.bits())
    }

    pub fn distance(&self, other: Edge) -> usize {
        (self.0 ^ other.0).count_ones() as usize
    }
}
