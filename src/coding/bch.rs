//! Encoding and decoding of the (63, 16, 23) BCH code protecting the NID.
//!
//! The error locator polynomial is built from the syndromes with the Berlekamp-Massey
//! algorithm over GF(2<sup>6</sup>), and its roots are found with a Chien search. Since
//! the code is binary, every located error is a single flipped bit and no error
//! evaluator is needed.

/// Generator polynomial g(x), with the LSB as the coefficient of the degree-0 term.
const GEN_POLY: u64 = 0o6331_1413_6723_5453;

/// Parity bits appended by g(x).
const PARITY_BITS: usize = 47;

/// Bits covered by the BCH code, which excludes the extra P25 parity bit.
const CODE_BITS: usize = 63;

/// Maximum number of correctable bit errors.
const MAX_ERRORS: usize = 11;

/// Number of syndromes needed to correct `MAX_ERRORS` errors.
const SYNDROMES: usize = MAX_ERRORS * 2;

/// GF(2<sup>6</sup>) characterized by α<sup>6</sup>+α+1, as power and log tables.
struct Field {
    exp: [u8; CODE_BITS],
    log: [u8; CODE_BITS + 1],
}

lazy_static! {
    static ref FIELD: Field = Field::new();
}

impl Field {
    fn new() -> Field {
        let mut exp = [0; CODE_BITS];
        let mut log = [0; CODE_BITS + 1];
        let mut x = 1u8;

        for (pow, e) in exp.iter_mut().enumerate() {
            *e = x;
            log[x as usize] = pow as u8;

            x <<= 1;

            if x >> 6 != 0 {
                x ^= 0b1000011;
            }
        }

        Field { exp, log }
    }

    /// Codeword for α<sup>pow</sup>.
    fn pow(&self, pow: usize) -> u8 { self.exp[pow % CODE_BITS] }

    fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            0
        } else {
            self.pow(self.log[a as usize] as usize + self.log[b as usize] as usize)
        }
    }

    fn div(&self, a: u8, b: u8) -> u8 {
        debug_assert!(b != 0);

        if a == 0 {
            0
        } else {
            self.pow(self.log[a as usize] as usize + CODE_BITS - self.log[b as usize] as usize)
        }
    }
}

/// Encode the given 16 data bits into a 64-bit codeword: the 16 data bits, 47 BCH parity
/// bits, then the P25 parity bit.
pub fn encode(word: u16) -> u64 {
    let data = (word as u64) << PARITY_BITS;
    let code = data | remainder(data);

    code << 1 | ((word ^ word >> 1) & 1) as u64
}

/// Try to decode the given 64-bit word to the nearest codeword, correcting up to 11
/// bit errors.
///
/// If decoding was successful, return `Some((data, err))`, where `data` is the 16 data
/// bits and `err` is the number of bits corrected. Otherwise, return `None` to indicate
/// an unrecoverable error.
pub fn decode(bits: u64) -> Option<(u16, usize)> {
    // The BCH code is only over the first 63 bits, so strip off the P25 parity bit.
    let word = bits >> 1;
    let syn = syndromes(word);

    if syn.iter().all(|&s| s == 0) {
        return Some(((word >> PARITY_BITS) as u16, 0));
    }

    let (loc, nerr) = locator(&syn)?;
    let field = &*FIELD;

    // Λ(α^-i) vanishes for every error location i.
    let errs: Vec<usize> = (0..CODE_BITS).filter(|&i| {
        (0..=nerr).fold(0, |v, k| v ^ field.mul(loc[k], field.pow((CODE_BITS - i) * k))) == 0
    }).collect();

    if errs.len() != nerr {
        return None;
    }

    let fixed = errs.iter().fold(word, |w, &i| w ^ 1 << i);

    Some(((fixed >> PARITY_BITS) as u16, nerr))
}

/// Compute r(x) mod g(x) for the given bitmap r(x).
fn remainder(mut bits: u64) -> u64 {
    for b in (PARITY_BITS..CODE_BITS).rev() {
        if bits >> b & 1 == 1 {
            bits ^= GEN_POLY << (b - PARITY_BITS);
        }
    }

    bits
}

/// Generate the syndromes s<sub>1</sub>, ..., s<sub>2t</sub> of the given received word
/// r(x), where s<sub>i</sub> = r(α<sup>i</sup>). The LSB of `word` maps to the
/// coefficient of the degree-0 term.
fn syndromes(word: u64) -> [u8; SYNDROMES] {
    let field = &*FIELD;
    let mut syn = [0; SYNDROMES];

    for (j, s) in syn.iter_mut().enumerate() {
        *s = (0..CODE_BITS)
            .filter(|&b| word >> b & 1 == 1)
            .fold(0, |acc, b| acc ^ field.pow(b * (j + 1)));
    }

    syn
}

/// Synthesize the error locator Λ(x) as the shortest LFSR generating the syndromes.
/// Return its coefficients and degree, or `None` if it locates more errors than the code
/// can correct.
fn locator(syn: &[u8; SYNDROMES]) -> Option<([u8; SYNDROMES + 1], usize)> {
    let field = &*FIELD;

    let mut cur = [0; SYNDROMES + 1];
    cur[0] = 1;

    let mut prev = cur;
    let mut len = 0;
    // Steps since `prev` was saved.
    let mut gap = 1;
    // Discrepancy when `prev` was saved.
    let mut last = 1;

    for n in 0..SYNDROMES {
        let disc = (1..=len).fold(syn[n], |d, i| d ^ field.mul(cur[i], syn[n - i]));

        if disc == 0 {
            gap += 1;
            continue;
        }

        let saved = cur;
        let coef = field.div(disc, last);

        for i in 0..=SYNDROMES - gap {
            cur[i + gap] ^= field.mul(coef, prev[i]);
        }

        if 2 * len <= n {
            len = n + 1 - len;
            prev = saved;
            last = disc;
            gap = 1;
        } else {
            gap += 1;
        }
    }

    if len > MAX_ERRORS {
        None
    } else {
        Some((cur, len))
    }
}
