//! Status symbols, which are sprinkled through every transmitted frame at a fixed
//! period counted from the start of frame sync.

use crate::bits::Dibit;
use crate::consts::STATUS_PERIOD;

/// A P25 status symbol.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StatusCode {
    /// Used by a repeater when the inbound channel is idle.
    InboundIdle,
    /// Used by a repeater when the inbound channel is busy.
    InboundBusy,
    /// Used when a subscriber is transmitting to a repeater.
    SubscriberRepeater,
    /// Used when a subscriber is transmitting directly to another subscriber.
    SubscriberDirect,
}

impl StatusCode {
    /// Parse a status code from the given dibit.
    pub fn from_dibit(d: Dibit) -> StatusCode {
        use self::StatusCode::*;

        match d.bits() {
            0b01 => InboundBusy,
            0b00 => SubscriberDirect,
            0b10 => SubscriberRepeater,
            _ => InboundIdle,
        }
    }

    /// Convert the status code into a dibit.
    pub fn to_dibit(self) -> Dibit {
        use self::StatusCode::*;

        Dibit::new(match self {
            InboundBusy => 0b01,
            SubscriberDirect => 0b00,
            SubscriberRepeater => 0b10,
            InboundIdle => 0b11,
        })
    }
}

/// A symbol in a transmitted stream.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StreamSymbol {
    /// Status symbol.
    Status(StatusCode),
    /// Data symbol.
    Data(Dibit),
}

/// Interleaves status symbols into a frame, starting with the first sync symbol.
///
/// When the source runs dry, the output is padded with zero symbols up to and including
/// the next status symbol.
pub struct StatusInterleaver<T: Iterator<Item = Dibit>> {
    src: T,
    status: StatusCode,
    /// Symbols output in the current status period.
    pos: usize,
}

impl<T: Iterator<Item = Dibit>> StatusInterleaver<T> {
    pub fn new(src: T, status: StatusCode) -> StatusInterleaver<T> {
        StatusInterleaver {
            src,
            status,
            pos: 0,
        }
    }
}

impl<T: Iterator<Item = Dibit>> Iterator for StatusInterleaver<T> {
    type Item = Dibit;

    fn next(&mut self) -> Option<Dibit> {
        self.pos = (self.pos + 1) % STATUS_PERIOD;

        if self.pos == 0 {
            return Some(self.status.to_dibit());
        }

        match self.src.next() {
            Some(d) => Some(d),
            None if self.pos == 1 => None,
            None => Some(Dibit::default()),
        }
    }
}

/// Separates status symbols from the data symbols following frame sync.
#[derive(Copy, Clone)]
pub struct StatusDeinterleaver {
    /// Symbols seen in the current status period, including the sync symbols.
    pos: usize,
}

impl StatusDeinterleaver {
    /// Create a new `StatusDeinterleaver` to be fed starting with the symbol at the given
    /// position, counted from the first sync symbol.
    pub fn at(pos: usize) -> StatusDeinterleaver {
        StatusDeinterleaver {
            pos: pos % STATUS_PERIOD,
        }
    }

    /// Classify the given symbol as a status or data symbol.
    pub fn feed(&mut self, d: Dibit) -> StreamSymbol {
        self.pos = (self.pos + 1) % STATUS_PERIOD;

        if self.pos == 0 {
            StreamSymbol::Status(StatusCode::from_dibit(d))
        } else {
            StreamSymbol::Data(d)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::consts::SYNC_SYMBOLS;
    use crate::bits::Dibit;

    #[test]
    fn test_status_code() {
        for b in 0..4 {
            let d = Dibit::new(b);
            assert_eq!(StatusCode::from_dibit(d).to_dibit(), d);
        }
    }

    #[test]
    fn test_interleave() {
        let src = std::iter::repeat(Dibit::new(0b10));
        let mut i = StatusInterleaver::new(src, StatusCode::InboundBusy);

        for _ in 0..2 {
            for _ in 0..35 {
                assert_eq!(i.next(), Some(Dibit::new(0b10)));
            }

            assert_eq!(i.next(), Some(Dibit::new(0b01)));
        }
    }

    #[test]
    fn test_interleave_pad() {
        let src = std::iter::repeat(Dibit::new(0b11)).take(40);
        let out: Vec<Dibit> = StatusInterleaver::new(src, StatusCode::SubscriberRepeater)
            .collect();

        assert_eq!(out.len(), 72);
        assert_eq!(out[35], Dibit::new(0b10));
        assert_eq!(out[40], Dibit::new(0b11));
        assert_eq!(out[41], Dibit::new(0b00));
        assert_eq!(out[71], Dibit::new(0b10));
    }

    #[test]
    fn test_deinterleave() {
        let mut d = StatusDeinterleaver::at(SYNC_SYMBOLS);

        for _ in 0..11 {
            assert_eq!(d.feed(Dibit::new(0)), StreamSymbol::Data(Dibit::new(0)));
        }

        assert_eq!(d.feed(Dibit::new(0b01)),
            StreamSymbol::Status(StatusCode::InboundBusy));

        for _ in 0..2 {
            for _ in 0..35 {
                assert_eq!(d.feed(Dibit::new(0)), StreamSymbol::Data(Dibit::new(0)));
            }

            assert_eq!(d.feed(Dibit::new(0)),
                StreamSymbol::Status(StatusCode::SubscriberDirect));
        }
    }

    #[test]
    fn test_at() {
        // Past the NID, whose span holds the first status symbol.
        let mut d = StatusDeinterleaver::at(57);

        for _ in 0..14 {
            assert_eq!(d.feed(Dibit::new(0b10)), StreamSymbol::Data(Dibit::new(0b10)));
        }

        assert_eq!(d.feed(Dibit::new(0b11)), StreamSymbol::Status(StatusCode::InboundIdle));

        let mut d = StatusDeinterleaver::at(STATUS_PERIOD * 3 - 1);
        assert_eq!(d.feed(Dibit::new(0b00)),
            StreamSymbol::Status(StatusCode::SubscriberDirect));
    }

    #[test]
    fn test_round_trip() {
        let data: Vec<Dibit> = (0..100).map(|i| Dibit::new(i % 4)).collect();
        let sync = std::iter::repeat(Dibit::new(0b01)).take(SYNC_SYMBOLS);
        let stream = StatusInterleaver::new(sync.chain(data.iter().cloned()),
            StatusCode::InboundIdle);

        let mut d = StatusDeinterleaver::at(SYNC_SYMBOLS);
        let recv: Vec<Dibit> = stream
            .skip(SYNC_SYMBOLS)
            .filter_map(|s| match d.feed(s) {
                StreamSymbol::Data(d) => Some(d),
                StreamSymbol::Status(s) => {
                    assert_eq!(s, StatusCode::InboundIdle);
                    None
                },
            })
            .collect();

        assert_eq!(&recv[..100], &data[..]);
        assert!(recv[100..].iter().all(|&d| d == Dibit::default()));
    }
}
