//! The standard DCS codes and their 23-bit codewords.
//!
//! A DCS codeword is a Golay (23, 12) code over 12 data bits: the fixed prefix `100`
//! followed by the 9-bit octal code. It's sent least significant bit first, repeating,
//! so after 23 bauds a shift register that takes new bits at the bottom holds the
//! codeword with its bits reversed. Inverted codes are sent with every bit flipped.

use std::collections::HashMap;
use std::fmt;

use crate::coding::crc::golay_parity;

/// Bits in a DCS codeword.
pub const CODEWORD_BITS: usize = 23;

/// Mask of the codeword bits.
pub const CODEWORD_MASK: u32 = (1 << CODEWORD_BITS) - 1;

/// Octal code numbers of the standard DCS codes.
pub const CODES: [u16; 104] = [
    0o023, 0o025, 0o026, 0o031, 0o032, 0o036, 0o043, 0o047, 0o051, 0o053, 0o054, 0o065,
    0o071, 0o072, 0o073, 0o074, 0o114, 0o115, 0o116, 0o122, 0o125, 0o131, 0o132, 0o134,
    0o143, 0o145, 0o152, 0o155, 0o156, 0o162, 0o165, 0o172, 0o174, 0o205, 0o212, 0o223,
    0o225, 0o226, 0o243, 0o244, 0o245, 0o246, 0o251, 0o252, 0o255, 0o261, 0o263, 0o265,
    0o266, 0o271, 0o274, 0o306, 0o311, 0o315, 0o325, 0o331, 0o332, 0o343, 0o346, 0o351,
    0o356, 0o364, 0o365, 0o371, 0o411, 0o412, 0o413, 0o423, 0o431, 0o432, 0o445, 0o446,
    0o452, 0o454, 0o455, 0o462, 0o464, 0o465, 0o466, 0o503, 0o506, 0o516, 0o523, 0o526,
    0o532, 0o546, 0o565, 0o606, 0o612, 0o624, 0o627, 0o631, 0o632, 0o654, 0o662, 0o664,
    0o703, 0o712, 0o723, 0o731, 0o732, 0o734, 0o743, 0o754,
];

lazy_static! {
    /// Maps each register value to its code, in both polarities.
    static ref TABLE: HashMap<u32, DcsCode> = {
        CODES.iter().flat_map(|&number| {
            let normal = DcsCode::new(number, false);
            let inverted = DcsCode::new(number, true);

            vec![(normal.value(), normal), (inverted.value(), inverted)]
        }).collect()
    };
}

/// A DCS code and its polarity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct DcsCode {
    /// Octal code number.
    pub number: u16,
    /// Whether the codeword is sent inverted.
    pub inverted: bool,
}

impl DcsCode {
    pub fn new(number: u16, inverted: bool) -> DcsCode {
        assert!(number >> 9 == 0);
        DcsCode { number, inverted }
    }

    /// Look up the code held by a receive register.
    pub fn from_value(value: u32) -> Option<DcsCode> {
        TABLE.get(&value).cloned()
    }

    /// Codeword in transmit order: bit `i` is the `i`th bit sent.
    pub fn codeword(&self) -> u32 {
        let data = 0b100 << 9 | self.number;
        let word = (golay_parity(data) as u32) << 12 | data as u32;

        if self.inverted {
            word ^ CODEWORD_MASK
        } else {
            word
        }
    }

    /// Receive register value after a full codeword.
    pub fn value(&self) -> u32 {
        self.codeword().reverse_bits() >> (32 - CODEWORD_BITS)
    }

    /// Whether the other code's register value is a rotation of this one's, so it
    /// appears periodically in the register while this code is received.
    pub fn is_alias(&self, other: &DcsCode) -> bool {
        let value = self.value();

        (1..CODEWORD_BITS).any(|r| {
            (value << r | value >> (CODEWORD_BITS - r)) & CODEWORD_MASK == other.value()
        })
    }
}

impl fmt::Display for DcsCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:03o}{}", self.number, if self.inverted { "I" } else { "N" })
    }
}
