//! Interleaving and deinterleaving for trellis coded data blocks.
//!
//! The 98 coded dibits are treated as 49 dibit pairs and transmitted in four columns:
//! pairs 0, 4, 8, ... first, then pairs 1, 5, 9, ..., and so on.

use crate::bits::Dibit;
use crate::consts::CODING_DIBITS;

lazy_static! {
    /// Index of the source dibit for each transmitted dibit.
    static ref INTERLEAVE: [usize; CODING_DIBITS] = {
        let mut redirects = [0; CODING_DIBITS];
        let mut idx = 0;

        for col in 0..4 {
            for pair in (col..CODING_DIBITS / 2).step_by(4) {
                redirects[idx] = pair * 2;
                redirects[idx + 1] = pair * 2 + 1;
                idx += 2;
            }
        }

        redirects
    };

    /// Index of the transmitted dibit for each source dibit.
    static ref DEINTERLEAVE: [usize; CODING_DIBITS] = {
        let mut redirects = [0; CODING_DIBITS];

        for (tx, &src) in INTERLEAVE.iter().enumerate() {
            redirects[src] = tx;
        }

        redirects
    };
}

/// Reorder a coded block into transmit order.
pub fn interleave(dibits: &[Dibit; CODING_DIBITS]) -> [Dibit; CODING_DIBITS] {
    redirect(dibits, &INTERLEAVE)
}

/// Undo the transmit ordering of a received block.
pub fn deinterleave(dibits: &[Dibit; CODING_DIBITS]) -> [Dibit; CODING_DIBITS] {
    redirect(dibits, &DEINTERLEAVE)
}

fn redirect(dibits: &[Dibit; CODING_DIBITS], table: &[usize; CODING_DIBITS])
    -> [Dibit; CODING_DIBITS]
{
    let mut out = [Dibit::default(); CODING_DIBITS];

    for (dest, &idx) in out.iter_mut().zip(table.iter()) {
        *dest = dibits[idx];
    }

    out
}
