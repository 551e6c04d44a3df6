//! Baseband symbol levels and decoding.
//!
//! After the gain stage, the four C4FM deviation levels sit at fractions of the gain
//! target: `+3` at the target itself, `+1` at a third of it, and likewise for the
//! negative levels.

pub mod decode;
pub mod timing;

use crate::bits::Dibit;
use crate::consts::SYMBOL_PERIOD;

/// Normalized deviation level of the given symbol, in `[-1, 1]`.
pub fn level(d: Dibit) -> f32 {
    match d.bits() {
        0b01 => 1.0,
        0b00 => 1.0 / 3.0,
        0b10 => -1.0 / 3.0,
        _ => -1.0,
    }
}

/// Generate an ideal rectangular baseband waveform for the given symbols, each held for
/// one symbol period, with the outer levels at `peak`.
pub fn modulate<T: IntoIterator<Item = Dibit>>(dibits: T, peak: f32) -> Vec<f32> {
    dibits.into_iter()
        .flat_map(|d| std::iter::repeat(level(d) * peak).take(SYMBOL_PERIOD))
        .collect()
}
