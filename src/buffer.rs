//! Fixed-size symbol buffers.

use crate::bits::Dibit;
use crate::consts::CODING_DIBITS;

pub trait Storage {
    type Input: Copy;
    type Buf;

    fn size(&self) -> usize;
    fn buf(&mut self) -> &mut Self::Buf;
    fn add(&mut self, item: Self::Input, pos: usize);
    fn reset(&mut self) {}
}

macro_rules! storage_type {
    ($name: ident, [$input: ty; $size: expr]) => {
        pub struct $name([$input; $size]);

        impl $name {
            pub fn new() -> Self { $name([Default::default(); $size]) }
        }

        impl Storage for $name {
            type Input = $input;
            type Buf = [$input; $size];

            fn size(&self) -> usize { $size }
            fn buf(&mut self) -> &mut Self::Buf { &mut self.0 }
            fn add(&mut self, item: Self::Input, pos: usize) { self.0[pos] = item; }
        }
    };
}

storage_type!(CodingStorage, [Dibit; CODING_DIBITS]);

/// Collects items until the storage is full.
pub struct Buffer<S: Storage> {
    storage: S,
    pos: usize,
}

impl<S: Storage> Buffer<S> {
    pub fn new(storage: S) -> Buffer<S> {
        Buffer {
            storage,
            pos: 0,
        }
    }

    pub fn reset(&mut self) { self.pos = 0; }

    /// Number of items buffered so far.
    pub fn len(&self) -> usize { self.pos }

    /// the buffer is reset once `Some` is returned.
    pub fn feed(&mut self, item: S::Input) -> Option<&mut S::Buf> {
        if self.pos == 0 {
            self.storage.reset();
        }

        self.storage.add(item, self.pos);
        self.pos += 1;

        if self.pos == self.storage.size() {
            self.reset();
            Some(self.storage.buf())
        } else {
            None
        }
    }
}

/// Circular history of the most recently received symbols.
///
/// Logical index 0 is always the oldest symbol and `len() - 1` the most recent. The
/// write pointer addresses the next slot to be overwritten, which is also the oldest
/// symbol.
pub struct SymbolDelayLine {
    buf: Vec<Dibit>,
    pos: usize,
}

impl SymbolDelayLine {
    /// Create a new delay line holding `len` symbols, initially all zero.
    pub fn new(len: usize) -> Self {
        assert!(len > 0);

        SymbolDelayLine {
            buf: vec![Dibit::default(); len],
            pos: 0,
        }
    }

    /// Capacity of the line in symbols.
    pub fn len(&self) -> usize { self.buf.len() }

    /// Current write pointer, always in `[0, len)`.
    pub fn pointer(&self) -> usize { self.pos }

    /// Insert the given symbol as the most recent one and return the oldest symbol,
    /// which is pushed out.
    pub fn insert(&mut self, dibit: Dibit) -> Dibit {
        let ejected = std::mem::replace(&mut self.buf[self.pos], dibit);
        self.pos = (self.pos + 1) % self.buf.len();
        ejected
    }

    /// Overwrite the most recent `dibits.len()` symbols with the given ones, in order.
    pub fn update(&mut self, dibits: &[Dibit]) {
        assert!(dibits.len() <= self.buf.len());

        let start = self.buf.len() - dibits.len();

        for (i, &d) in dibits.iter().enumerate() {
            let idx = self.index(start + i);
            self.buf[idx] = d;
        }
    }

    /// Shift the write pointer to compensate for a timing slip.
    ///
    /// A positive offset stuffs symbols: the oldest ones are carried forward as if they
    /// had just been received. A negative offset deletes symbols: the next inserts
    /// overwrite the most recent ones.
    pub fn adjust_pointer(&mut self, offset: isize) {
        let len = self.buf.len() as isize;
        self.pos = (self.pos as isize + offset).rem_euclid(len) as usize;
    }

    /// Symbol at the given logical index, where 0 is the oldest.
    pub fn get(&self, idx: usize) -> Dibit {
        self.buf[self.index(idx)]
    }

    /// Iterate over `len` symbols in receive order, starting at logical index `start`.
    pub fn window(&self, start: usize, len: usize) -> impl Iterator<Item = Dibit> + '_ {
        assert!(start + len <= self.buf.len());
        (start..start + len).map(move |i| self.get(i))
    }

    /// Copy `len` symbols starting at logical index `start` into a new vector.
    pub fn extract(&self, start: usize, len: usize) -> Vec<Dibit> {
        self.window(start, len).collect()
    }

    /// Iterate over the `n` most recent symbols in receive order.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = Dibit> + '_ {
        self.window(self.buf.len() - n, n)
    }

    /// Reset all symbols to zero.
    pub fn clear(&mut self) {
        for d in self.buf.iter_mut() {
            *d = Dibit::default();
        }

        self.pos = 0;
    }

    fn index(&self, idx: usize) -> usize {
        (self.pos + idx) % self.buf.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dibits(bits: &[u8]) -> Vec<Dibit> {
        bits.iter().map(|&b| Dibit::new(b)).collect()
    }

    #[test]
    fn test_coding_storage() {
        let mut b = Buffer::new(CodingStorage::new());

        for i in 0..CODING_DIBITS - 1 {
            assert!(b.feed(Dibit::new(i as u8 % 4)).is_none());
        }

        let buf = b.feed(Dibit::new(0b11)).unwrap();
        assert_eq!(buf[0], Dibit::new(0));
        assert_eq!(buf[5], Dibit::new(1));
        assert_eq!(buf[CODING_DIBITS - 1], Dibit::new(0b11));
    }

    #[test]
    fn test_ring_invariant() {
        let src: Vec<Dibit> = (0..37).map(|i| Dibit::new((i * 7 % 4) as u8)).collect();

        for &len in &[1, 5, 24, 37] {
            let mut line = SymbolDelayLine::new(len);

            for &d in &src {
                line.insert(d);
                assert!(line.pointer() < len);
            }

            assert_eq!(&line.extract(0, len)[..], &src[src.len() - len..]);
        }
    }

    #[test]
    fn test_insert_ejects_oldest() {
        let mut line = SymbolDelayLine::new(3);

        assert_eq!(line.insert(Dibit::new(1)), Dibit::new(0));
        assert_eq!(line.insert(Dibit::new(2)), Dibit::new(0));
        assert_eq!(line.insert(Dibit::new(3)), Dibit::new(0));
        assert_eq!(line.insert(Dibit::new(0)), Dibit::new(1));
        assert_eq!(line.insert(Dibit::new(0)), Dibit::new(2));
        assert_eq!(line.get(0), Dibit::new(3));
    }

    #[test]
    fn test_update() {
        let mut line = SymbolDelayLine::new(5);

        for &b in &[1, 1, 1, 1, 1, 2, 2] {
            line.insert(Dibit::new(b));
        }

        line.update(&dibits(&[3, 0]));
        assert_eq!(line.extract(0, 5), dibits(&[1, 1, 1, 3, 0]));

        line.update(&dibits(&[2, 2, 2, 2, 2]));
        assert_eq!(line.extract(0, 5), dibits(&[2, 2, 2, 2, 2]));

        line.update(&[]);
        assert_eq!(line.recent(2).collect::<Vec<_>>(), dibits(&[2, 2]));
    }

    #[test]
    fn test_adjust_pointer() {
        let mut line = SymbolDelayLine::new(4);

        for &b in &[0, 1, 2, 3] {
            line.insert(Dibit::new(b));
        }

        // Stuff: oldest symbol becomes the most recent.
        line.adjust_pointer(1);
        assert_eq!(line.pointer(), 1);
        assert_eq!(line.extract(0, 4), dibits(&[1, 2, 3, 0]));

        // Delete: the next insert replaces the most recent symbol.
        line.adjust_pointer(-1);
        line.adjust_pointer(-1);
        assert_eq!(line.pointer(), 3);
        line.insert(Dibit::new(0));
        assert_eq!(line.extract(0, 4), dibits(&[0, 1, 2, 0]));

        line.adjust_pointer(-9);
        assert!(line.pointer() < 4);
    }

    #[test]
    fn test_window() {
        let mut line = SymbolDelayLine::new(6);

        for &b in &[3, 2, 1, 0, 1, 2, 3, 3] {
            line.insert(Dibit::new(b));
        }

        assert_eq!(line.extract(2, 3), dibits(&[1, 2, 3]));
        assert_eq!(line.recent(3).collect::<Vec<_>>(), dibits(&[2, 3, 3]));

        line.clear();
        assert_eq!(line.extract(0, 6), dibits(&[0; 6]));
    }
}
