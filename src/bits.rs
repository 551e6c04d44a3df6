//! Symbol types and utilities for packing/unpacking dibits and tribits into/out of bytes.

/// Iterate over the 2-bit symbols of a byte source, MSB to LSB.
pub type Dibits<T> = SubByteIter<DibitParams, T>;
/// Iterates over the 3-bit symbols of a byte source, MSB to LSB.
pub type Tribits<T> = SubByteIter<TribitParams, T>;

/// Groups dibits into full bytes. The source must be a multiple of 4 dibits.
pub type DibitBytes<T> = SubByteIter<DibitByteParams, T>;
/// Groups tribits into full bytes. The source must be a multiple of 8 tribits.
pub type TribitBytes<T> = SubByteIter<TribitByteParams, T>;

pub trait IterParams {
    /// Type to consume when buffering.
    type Input;
    /// Type to yield at each iteration.
    type Output;

    /// Number of bits to consume at each iteration.
    fn bits() -> usize;

    /// Number of input symbols to consume when buffering.
    fn buffer() -> usize;

    /// Amount to shift buffer after loading an input symbol.
    fn shift() -> usize;

    /// Amount to shift buffer after all buffering.
    fn post_shift() -> usize { 32 - Self::shift() * Self::buffer() }

    /// Number of iterations before buffering.
    fn iterations() -> usize { Self::shift() * Self::buffer() / Self::bits() }

    /// Convert input symbol to a byte.
    fn to_byte(input: Self::Input) -> u8;

    /// Convert bits to output type.
    fn to_output(bits: u8) -> Self::Output;

    /// Verify the parameters are supported.
    fn validate() {
        // Maximum buffer size is currently 32 bits.
        assert!(Self::buffer() * Self::shift() <= 32);
    }
}

/// Phase order of the four symbols around the constellation, starting at +45 degrees.
const PHASES: [u8; 4] = [0b00, 0b01, 0b11, 0b10];

/// Two bits, carried by one modulation symbol.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Hash)]
pub struct Dibit(u8);

impl Dibit {
    /// Construct a new `Dibit` with the two given bits in the LSB position.
    pub fn new(bits: u8) -> Dibit {
        assert!(bits >> 2 == 0);
        Dibit(bits)
    }

    /// Get the wrapped dibit, which is guaranteed to have only 2 LSBs.
    pub fn bits(&self) -> u8 { self.0 }
    /// Get the MSB.
    pub fn hi(&self) -> u8 { self.0 >> 1 }
    /// Get the LSB.
    pub fn lo(&self) -> u8 { self.0 & 1 }

    /// Number of differing bits between this and the given dibit.
    pub fn distance(&self, other: Dibit) -> u32 { (self.0 ^ other.0).count_ones() }

    /// Symbol received when the deviation polarity is flipped (+3 and -3 swap, as do +1
    /// and -1.)
    pub fn invert(self) -> Dibit { Dibit(self.0 ^ 0b10) }

    /// Symbol received when the carrier phase is rotated by the given number of quarter
    /// turns, positive being counterclockwise.
    pub fn rotate(self, quarters: i32) -> Dibit {
        let idx = PHASES.iter().position(|&p| p == self.0).unwrap_or(0) as i32;
        Dibit(PHASES[(idx + quarters).rem_euclid(4) as usize])
    }

    /// The two symbols reachable from this one by a single quarter-turn phase change.
    pub fn transitions(self) -> [Dibit; 2] { [self.rotate(1), self.rotate(-1)] }

    /// Whether the given symbol can directly follow this one.
    pub fn allows(self, next: Dibit) -> bool { self.transitions().contains(&next) }
}

/// Parameters for `Dibits` iterator.
pub struct DibitParams;

impl IterParams for DibitParams {
    type Input = u8;
    type Output = Dibit;

    fn bits() -> usize { 2 }
    fn buffer() -> usize { 1 }
    fn shift() -> usize { 8 }

    fn to_byte(input: Self::Input) -> u8 { input }
    fn to_output(bits: u8) -> Dibit { Dibit::new(bits) }
}

/// Three bits.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct Tribit(u8);

impl Tribit {
    /// Construct a new `Tribit` with the three given bits in the LSB position.
    pub fn new(bits: u8) -> Tribit {
        assert!(bits >> 3 == 0);
        Tribit(bits)
    }

    /// Get the wrapped tribit, which is guaranteed to have only 3 LSBs.
    pub fn bits(&self) -> u8 { self.0 }
}

/// Parameters for `Tribits` iterator.
pub struct TribitParams;

impl IterParams for TribitParams {
    type Input = u8;
    type Output = Tribit;

    fn bits() -> usize { 3 }
    fn buffer() -> usize { 3 }
    fn shift() -> usize { 8 }

    fn to_byte(input: Self::Input) -> u8 { input }
    fn to_output(bits: u8) -> Tribit { Tribit::new(bits) }
}

/// Parameters for `DibitBytes` iterator.
pub struct DibitByteParams;

impl IterParams for DibitByteParams {
    type Input = Dibit;
    type Output = u8;

    fn bits() -> usize { 8 }
    fn buffer() -> usize { 4 }
    fn shift() -> usize { 2 }

    fn to_byte(input: Self::Input) -> u8 { input.bits() }
    fn to_output(bits: u8) -> Self::Output { bits }
}

/// Parameters for `TribitBytes` iterator.
pub struct TribitByteParams;

impl IterParams for TribitByteParams {
    type Input = Tribit;
    type Output = u8;

    fn bits() -> usize { 8 }
    fn buffer() -> usize { 8 }
    fn shift() -> usize { 3 }

    fn to_byte(input: Self::Input) -> u8 { input.bits() }
    fn to_output(bits: u8) -> Self::Output { bits }
}

/// An iterator for sub-byte (bit-level) values.
pub struct SubByteIter<P, T> where
    P: IterParams, T: Iterator<Item = P::Input>
{
    params: std::marker::PhantomData<P>,
    /// Source of bytes.
    src: T,
    /// Current buffered bits.
    buf: u32,
    /// Current bit-level index into the current byte.
    idx: u8,
}

impl<P, T> SubByteIter<P, T> where
    P: IterParams, T: Iterator<Item = P::Input>
{
    /// Construct a new `SubByteIter` over the given symbol source.
    pub fn new(src: T) -> SubByteIter<P, T> {
        SubByteIter {
            params: std::marker::PhantomData,
            src,
            buf: 0,
            idx: 0,
        }
    }

    /// Consume one or more symbols to create a buffer of bits, filled starting from the
    /// MSB.
    fn buffer(&mut self) -> Option<u32> {
        let (buf, added) = (&mut self.src)
            .take(P::buffer())
            .fold((0, 0), |(buf, added), next| {
                (buf << P::shift() | P::to_byte(next) as u32, added + 1)
            });

        // It's okay if there are no more source symbols here, because we're on a safe
        // boundary.
        if added == 0 {
            return None;
        }

        assert!(added == P::buffer(), "incomplete source");

        Some(buf << P::post_shift())
    }
}

impl<P, T> Iterator for SubByteIter<P, T> where
    P: IterParams, T: Iterator<Item = P::Input>
{
    type Item = P::Output;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx == 0 {
            self.buf = self.buffer()?;
        }

        // Extract MSBs.
        let bits = self.buf >> (32 - P::bits());

        // Strip off the MSBs for the next iteration.
        self.buf <<= P::bits();

        // Move to the next item and reset after all have been visited.
        self.idx += 1;
        self.idx %= P::iterations() as u8;

        Some(P::to_output(bits as u8))
    }
}

/// Pack up to 32 dibits into a word, with the first dibit in the highest position.
pub fn pack_dibits<T: IntoIterator<Item = Dibit>>(dibits: T) -> u64 {
    dibits.into_iter().fold(0, |word, d| word << 2 | d.bits() as u64)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validate_params() {
        DibitParams::validate();
        TribitParams::validate();
        DibitByteParams::validate();
        TribitByteParams::validate();
    }

    #[test]
    fn test_dibits() {
        let bytes = [
            0b00110011,
            0b10011001,
            0b11111111,
        ];

        let d: Vec<u8> = Dibits::new(bytes.iter().cloned()).map(|d| d.bits()).collect();

        assert_eq!(d, vec![
            0b00, 0b11, 0b00, 0b11,
            0b10, 0b01, 0b10, 0b01,
            0b11, 0b11, 0b11, 0b11,
        ]);
    }

    #[test]
    fn test_dibit_bytes() {
        let dibits = [0b00, 0b11, 0b00, 0b11, 0b10, 0b01, 0b10, 0b01];
        let mut d = DibitBytes::new(dibits.iter().map(|&b| Dibit::new(b)));

        assert_eq!(d.next().unwrap(), 0b00110011);
        assert_eq!(d.next().unwrap(), 0b10011001);
        assert!(d.next().is_none());
    }

    #[test]
    #[should_panic]
    fn test_dibit_bytes_panic() {
        let dibits = [0b00, 0b11, 0b00, 0b11, 0b10];
        let mut d = DibitBytes::new(dibits.iter().map(|&b| Dibit::new(b)));

        d.next();
        d.next();
    }

    #[test]
    fn test_tribits() {
        let bytes = [
            0b00101001,
            0b11001011,
            0b10111000,
        ];

        let t: Vec<u8> = Tribits::new(bytes.iter().cloned()).map(|t| t.bits()).collect();
        assert_eq!(t, vec![0b001, 0b010, 0b011, 0b100, 0b101, 0b110, 0b111, 0b000]);
    }

    #[test]
    fn test_tribit_bytes() {
        let tribits = [0b001, 0b010, 0b011, 0b100, 0b101, 0b110, 0b111, 0b000];
        let mut t = TribitBytes::new(tribits.iter().map(|&b| Tribit::new(b)));

        assert_eq!(t.next().unwrap(), 0b00101001);
        assert_eq!(t.next().unwrap(), 0b11001011);
        assert_eq!(t.next().unwrap(), 0b10111000);
        assert!(t.next().is_none());
    }

    #[test]
    #[should_panic]
    fn test_tribits_panic() {
        let bytes = [1, 2, 3, 4];
        let t = Tribits::new(bytes.iter().cloned());

        for _ in t {}
    }

    #[test]
    fn test_invert() {
        assert_eq!(Dibit::new(0b01).invert(), Dibit::new(0b11));
        assert_eq!(Dibit::new(0b11).invert(), Dibit::new(0b01));
        assert_eq!(Dibit::new(0b00).invert(), Dibit::new(0b10));
        assert_eq!(Dibit::new(0b10).invert(), Dibit::new(0b00));
    }

    #[test]
    fn test_rotate() {
        assert_eq!(Dibit::new(0b01).rotate(1), Dibit::new(0b11));
        assert_eq!(Dibit::new(0b11).rotate(1), Dibit::new(0b10));
        assert_eq!(Dibit::new(0b01).rotate(-1), Dibit::new(0b00));
        assert_eq!(Dibit::new(0b11).rotate(-1), Dibit::new(0b01));
        assert_eq!(Dibit::new(0b10).rotate(4), Dibit::new(0b10));

        for b in 0..4 {
            let d = Dibit::new(b);
            assert_eq!(d.rotate(1).rotate(-1), d);
            assert_eq!(d.rotate(2), d.rotate(-2));
        }
    }

    #[test]
    fn test_transitions() {
        for b in 0..4 {
            let d = Dibit::new(b);
            let t = d.transitions();

            assert!(t[0] != t[1]);
            assert!(!d.allows(d));
            assert!(!d.allows(d.rotate(2)));
            assert!(d.allows(t[0]) && d.allows(t[1]));
            assert!(t[0].allows(d) && t[1].allows(d));
        }

        assert!(Dibit::new(0b01).allows(Dibit::new(0b00)));
        assert!(Dibit::new(0b01).allows(Dibit::new(0b11)));
        assert!(!Dibit::new(0b01).allows(Dibit::new(0b10)));
    }

    #[test]
    fn test_pack() {
        let d = [0b01, 0b01, 0b01, 0b01, 0b01, 0b11, 0b01, 0b01];
        assert_eq!(pack_dibits(d.iter().map(|&b| Dibit::new(b))), 0x5575);
        assert_eq!(Dibit::new(0b01).distance(Dibit::new(0b10)), 2);
    }
}
