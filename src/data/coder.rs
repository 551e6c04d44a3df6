//! Trellis coding of whole data blocks: encoders that fill a coded buffer of dibits and
//! decoders that recover the bytes and count the corrected bits.

use collect_slice::CollectSlice;

use crate::bits::{Dibit, DibitBytes, Dibits, TribitBytes, Tribits};
use crate::coding::trellis::{self, DibitDecoder, TribitDecoder};
use crate::consts::{CODING_DIBITS, HALF_RATE_BYTES, THREE_QUARTER_RATE_BYTES};
use crate::error::Result;

/// Half-rate (dibit) convolutional coder.
pub type DibitCoder = DataCoder<trellis::DibitStates>;

/// 3/4-rate (tribit) convolutional coder.
pub type TribitCoder = DataCoder<trellis::TribitStates>;

pub struct DataCoder<S: trellis::States> {
    /// Convolutional state machine.
    fsm: trellis::TrellisFSM<S>,
    /// Current coded buffer.
    buf: [Dibit; CODING_DIBITS],
    /// Current index into `buf`.
    pos: usize,
}

impl<S: trellis::States> DataCoder<S> {
    /// Construct a new `DataCoder` wrapping the given state machine.
    fn for_fsm(fsm: trellis::TrellisFSM<S>) -> DataCoder<S> {
        DataCoder {
            fsm,
            buf: [Dibit::default(); CODING_DIBITS],
            pos: 0,
        }
    }

    /// Flush the state machine and return the coded buffer of dibits.
    pub fn finish(mut self) -> [Dibit; CODING_DIBITS] {
        let pair = self.fsm.finish();
        self.append(pair);

        assert!(self.pos == self.buf.len());

        self.buf
    }

    /// Code the given symbol and add the result to the buffer.
    fn feed_symbol(&mut self, symbol: S::Symbol) {
        let pair = self.fsm.feed(symbol);
        self.append(pair);
    }

    /// Append the given dibit pair to the buffer.
    fn append(&mut self, (a, b): (Dibit, Dibit)) {
        self.buf[self.pos] = a;
        self.pos += 1;
        self.buf[self.pos] = b;
        self.pos += 1;
    }
}

impl DibitCoder {
    /// Construct a new `DibitCoder` for coding a dibit stream.
    pub fn new() -> DibitCoder {
        Self::for_fsm(trellis::DibitFSM::new())
    }

    /// Code the given bytes as dibits.
    pub fn feed_bytes<T: Iterator<Item = u8>>(mut self, bytes: T) -> Self {
        for dibit in Dibits::new(bytes) {
            self.feed_symbol(dibit);
        }

        self
    }
}

impl TribitCoder {
    /// Construct a new `TribitCoder` for coding a tribit stream.
    pub fn new() -> TribitCoder {
        Self::for_fsm(trellis::TribitFSM::new())
    }

    /// Code the given bytes as tribits.
    pub fn feed_bytes<T: Iterator<Item = u8>>(mut self, bytes: T) -> Self {
        for tribit in Tribits::new(bytes) {
            self.feed_symbol(tribit);
        }

        self
    }
}

/// Decode a 1/2-rate coded block (in coder order) into its 12 bytes. The returned count
/// is `prior` plus the number of bits corrected by this decode.
pub fn decode_half_rate(dibits: &[Dibit; CODING_DIBITS], prior: usize)
    -> Result<([u8; HALF_RATE_BYTES], usize)>
{
    let (symbols, fixed) = DibitDecoder::new().decode(&dibits[..])?;
    let mut bytes = [0; HALF_RATE_BYTES];

    DibitBytes::new(symbols.into_iter()).collect_slice_checked(&mut bytes[..]);

    Ok((bytes, prior + fixed))
}

/// Decode a 3/4-rate coded block (in coder order) into its 18 bytes. The returned count
/// is `prior` plus the number of bits corrected by this decode.
pub fn decode_three_quarter_rate(dibits: &[Dibit; CODING_DIBITS], prior: usize)
    -> Result<([u8; THREE_QUARTER_RATE_BYTES], usize)>
{
    let (symbols, fixed) = TribitDecoder::new().decode(&dibits[..])?;
    let mut bytes = [0; THREE_QUARTER_RATE_BYTES];

    TribitBytes::new(symbols.into_iter()).collect_slice_checked(&mut bytes[..]);

    Ok((bytes, prior + fixed))
}
