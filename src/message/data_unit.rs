//! General low-level receiver for all data units, covering frame synchronization up to
//! status symbol removal.

use log::debug;

use crate::bits::Dibit;
use crate::buffer::SymbolDelayLine;
use crate::consts::{NID_SYMBOLS, SYNC_SYMBOLS};
use crate::error::{DecodeError, Result};
use crate::message::nid::{NetworkAccessCode, NetworkId, NidReceiver};
use crate::message::status::{StatusDeinterleaver, StreamSymbol};
use crate::stats::{HasStats, Stats};
use crate::sync::{FrameSynchronizer, SyncEvent, SyncPattern};

use self::State::*;
use self::StateChange::*;

/// Symbols following the NID, corrected for the received sync pattern and split into
/// data and status symbols.
struct SymbolReceiver {
    pattern: SyncPattern,
    status: StatusDeinterleaver,
    /// Symbols taken in while locating the NID, which are processed ahead of each new
    /// symbol.
    delay: Option<SymbolDelayLine>,
}

impl SymbolReceiver {
    /// Create a new `SymbolReceiver` starting with the given corrected symbols that
    /// followed the NID.
    pub fn new(pattern: SyncPattern, overrun: &[Dibit]) -> SymbolReceiver {
        let delay = if overrun.is_empty() {
            None
        } else {
            let mut line = SymbolDelayLine::new(overrun.len());

            for &d in overrun {
                line.insert(d);
            }

            Some(line)
        };

        SymbolReceiver {
            pattern,
            status: StatusDeinterleaver::at(SYNC_SYMBOLS + NID_SYMBOLS),
            delay,
        }
    }

    pub fn feed(&mut self, d: Dibit) -> StreamSymbol {
        let d = self.pattern.correct(d);

        let d = match self.delay {
            Some(ref mut line) => line.insert(d),
            None => d,
        };

        self.status.feed(d)
    }

    /// Delayed symbols not yet processed, as they were received.
    pub fn pending(&self) -> Vec<Dibit> {
        match self.delay {
            Some(ref line) => line.window(0, line.len())
                .map(|d| self.pattern.apply(d))
                .collect(),
            None => vec![],
        }
    }
}

/// An event seen by the low-level receiver.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DataUnitEvent {
    /// Frame sync was found.
    SyncDetected {
        pattern: SyncPattern,
        bit_errors: u32,
    },
    /// Frame sync hasn't been seen for the given number of symbols.
    SyncLost {
        symbols: usize,
    },
    /// Decoded NID information.
    NetworkId(NetworkId),
    /// Data or status symbol.
    Symbol(StreamSymbol),
}

/// Internal state of the state machine.
enum State {
    /// Search for frame synchronization.
    Sync,
    /// Decode NID.
    DecodeNid(SyncPattern, NidReceiver),
    /// Decode data and status symbols.
    DecodePacket(SymbolReceiver),
    /// Flush pads at end of packet.
    FlushPads(SymbolReceiver),
}

/// Action the state machine should take.
enum StateChange {
    /// Change to the given state.
    Change(State),
    /// Propagate the given event.
    Event(DataUnitEvent),
    /// Change to the given state and propagate the given event.
    EventChange(DataUnitEvent, State),
    /// Propagate the given error.
    Error(DecodeError),
    /// No action necessary.
    NoChange,
}

impl State {
    /// Initial NID decode state, given the final sync symbol as received.
    pub fn decode_nid(pattern: SyncPattern, last: Dibit, nac: Option<NetworkAccessCode>)
        -> State
    {
        DecodeNid(pattern, NidReceiver::new(pattern.correct(last), nac))
    }

    /// Symbols taken in but not yet processed, as received.
    fn pending(&self) -> Vec<Dibit> {
        match *self {
            DecodePacket(ref recv) | FlushPads(ref recv) => recv.pending(),
            Sync | DecodeNid(..) => vec![],
        }
    }
}

/// State machine for low-level data unit reception.
///
/// The state machine consumes sliced symbols and performs the following steps common to
/// all data units:
///
/// 1. Lock onto frame synchronization
/// 2. Correct symbols for the received sync polarity and phase
/// 3. Decode NID information, compensating a symbol slipped around sync
/// 4. Deinterleave status symbols
/// 5. Pass through symbols until stopped
pub struct DataUnitReceiver {
    /// Current state.
    state: State,
    /// Recent symbols searched for sync.
    line: SymbolDelayLine,
    /// Symbols inserted into the line since the last reset, up to its length.
    fill: usize,
    sync: FrameSynchronizer,
    /// NAC of the last NID decoded on the channel.
    nac: Option<NetworkAccessCode>,
    stats: Stats,
}

impl DataUnitReceiver {
    /// Create a new `DataUnitReceiver` in the frame synchronization state.
    pub fn new() -> DataUnitReceiver {
        DataUnitReceiver::with_sync(FrameSynchronizer::new())
    }

    /// Create a new `DataUnitReceiver` using the given synchronizer.
    pub fn with_sync(sync: FrameSynchronizer) -> DataUnitReceiver {
        DataUnitReceiver {
            state: Sync,
            line: SymbolDelayLine::new(SYNC_SYMBOLS),
            fill: 0,
            sync,
            nac: None,
            stats: Stats::default(),
        }
    }

    /// Flush any remaining padding symbols at the end of the current packet, and reenter
    /// the frame synchronization state afterwards.
    pub fn flush_pads(&mut self) {
        match std::mem::replace(&mut self.state, Sync) {
            DecodePacket(recv) | FlushPads(recv) => self.state = FlushPads(recv),
            Sync => {},
            DecodeNid(..) => self.resync(),
        }
    }

    /// Force the receiver into frame synchronization.
    pub fn resync(&mut self) {
        self.state = Sync;
        self.restart_search();
    }

    fn restart_search(&mut self) {
        self.line.clear();
        self.fill = 0;
        self.sync.reset();
    }

    /// Whether the receiver is searching for frame sync.
    pub fn synchronizing(&self) -> bool {
        if let Sync = self.state { true } else { false }
    }

    /// Insert a symbol into the sync search line.
    fn insert(&mut self, d: Dibit) {
        self.line.insert(d);

        if self.fill < self.line.len() {
            self.fill += 1;
        }
    }

    /// Determine the next action to take based on the given symbol.
    fn handle(&mut self, d: Dibit) -> StateChange {
        match self.state {
            Sync => {
                self.insert(d);

                // Stale or zeroed symbols can partially match a sync variant, so only
                // search a line of fresh symbols.
                if self.fill < self.line.len() {
                    return NoChange;
                }

                match self.sync.feed(&mut self.line) {
                    Some(SyncEvent::Detected { pattern, bit_errors }) => {
                        self.stats.sync.record_fixes(bit_errors as usize);

                        EventChange(DataUnitEvent::SyncDetected { pattern, bit_errors },
                                    State::decode_nid(pattern, d, self.nac))
                    },
                    Some(SyncEvent::Lost { symbols }) =>
                        Event(DataUnitEvent::SyncLost { symbols }),
                    None => NoChange,
                }
            },
            DecodeNid(pattern, ref mut nid) => {
                let dec = match nid.feed(pattern.correct(d)) {
                    Some(Ok(dec)) => dec,
                    Some(Err(e)) => return Error(e),
                    None => return NoChange,
                };

                self.stats.nid.record_fixes(dec.bit_errors);

                if dec.slip != 0 {
                    debug!("NID slipped {} symbols from sync", dec.slip);
                }

                match dec.nid() {
                    Ok(nid) => {
                        self.nac = Some(nid.access_code);

                        EventChange(DataUnitEvent::NetworkId(nid),
                                    DecodePacket(SymbolReceiver::new(pattern, &dec.overrun)))
                    },
                    Err(e) => Error(e),
                }
            },
            DecodePacket(ref mut recv) => Event(DataUnitEvent::Symbol(recv.feed(d))),
            FlushPads(ref mut recv) => match recv.feed(d) {
                // The stream is padded until the next status symbol boundary.
                StreamSymbol::Status(_) => Change(Sync),
                _ => NoChange,
            },
        }
    }

    /// Feed in a sliced symbol, possibly producing a receiver event. Return
    /// `Some(Ok(event))` for any normal event, `Some(Err(err))` for any error, and `None`
    /// if no event occurred.
    ///
    /// After an error, the receiver goes back to searching for frame sync.
    pub fn feed(&mut self, d: Dibit) -> Option<Result<DataUnitEvent>> {
        match self.handle(d) {
            Change(state) => {
                let pending = self.state.pending();
                self.state = state;

                if self.synchronizing() {
                    debug!("pads flushed, searching for sync");
                    self.restart_search();

                    // Delayed symbols arrived after the final status symbol.
                    for d in pending {
                        self.insert(d);
                    }
                }

                None
            },
            Event(event) => Some(Ok(event)),
            EventChange(event, state) => {
                self.state = state;
                Some(Ok(event))
            },
            Error(err) => {
                self.stats.record_err(err);
                self.resync();
                Some(Err(err))
            },
            NoChange => None,
        }
    }
}

impl HasStats for DataUnitReceiver {
    fn stats(&mut self) -> &mut Stats { &mut self.stats }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bits::Dibits;
    use crate::coding::bch;
    use crate::consts::NID_STATUS_INDEX;
    use crate::message;
    use crate::message::nid::{DataUnit, NetworkAccessCode};
    use crate::message::status::StatusCode;
    use crate::consts::SYNC_LOSS_SYMBOLS;
    use crate::sync::STANDARD_TEMPLATES;

    /// Build a transmitted frame, as received under the given pattern.
    fn frame(pattern: SyncPattern, nid: NetworkId, payload: &[Dibit]) -> Vec<Dibit> {
        message::frame(nid, payload.iter().cloned(), StatusCode::InboundIdle)
            .into_iter()
            .map(|d| pattern.apply(d))
            .collect()
    }

    fn feed_all(recv: &mut DataUnitReceiver, dibits: &[Dibit]) -> Vec<Result<DataUnitEvent>> {
        dibits.iter().filter_map(|&d| recv.feed(d)).collect()
    }

    fn data(events: &[Result<DataUnitEvent>]) -> Vec<Dibit> {
        events.iter().filter_map(|e| match *e {
            Ok(DataUnitEvent::Symbol(StreamSymbol::Data(d))) => Some(d),
            _ => None,
        }).collect()
    }

    /// Overwrite the NID of the given normal frame with the given codeword.
    fn set_nid(dibits: &mut [Dibit], word: u64) {
        let mut nid: Vec<Dibit> = Dibits::new(word.to_be_bytes().to_vec().into_iter())
            .collect();

        nid.insert(NID_STATUS_INDEX, dibits[SYNC_SYMBOLS + NID_STATUS_INDEX]);
        dibits[SYNC_SYMBOLS..SYNC_SYMBOLS + NID_SYMBOLS].copy_from_slice(&nid);
    }

    fn nid() -> NetworkId {
        NetworkId::new(NetworkAccessCode::Default, DataUnit::DataPacket)
    }

    fn payload() -> Vec<Dibit> {
        (0..40).map(|i| Dibit::new(i as u8 % 4)).collect()
    }

    #[test]
    fn test_receive() {
        let payload = payload();

        for t in STANDARD_TEMPLATES.iter() {
            let mut recv = DataUnitReceiver::new();
            let events = feed_all(&mut recv, &frame(t.pattern, nid(), &payload));

            assert_eq!(events[0], Ok(DataUnitEvent::SyncDetected {
                pattern: t.pattern,
                bit_errors: 0,
            }));

            assert_eq!(events[1], Ok(DataUnitEvent::NetworkId(nid())));

            // Payload is followed by zero pads up to the next status symbol.
            let data = data(&events);
            assert_eq!(&data[..payload.len()], &payload[..]);
            assert!(data[payload.len()..].iter().all(|d| d.bits() == 0));

            // One status symbol within the payload and one after the pads. The one
            // within the NID isn't passed on.
            let status = events.iter().filter(|e| if let Ok(DataUnitEvent::Symbol(
                StreamSymbol::Status(StatusCode::InboundIdle))) = e {
                true
            } else {
                false
            }).count();

            assert_eq!(status, 2);
            assert_eq!(recv.stats().nid.words(), 1);
        }
    }

    #[test]
    fn test_flush_pads() {
        let mut recv = DataUnitReceiver::new();

        // Stop just after the NID.
        let dibits = frame(SyncPattern::Normal, nid(), &[Dibit::default(); 4]);
        feed_all(&mut recv, &dibits[..SYNC_SYMBOLS + 34]);

        recv.flush_pads();
        assert!(!recv.synchronizing());

        // Remaining symbols up to and including the status symbol are dropped.
        assert!(feed_all(&mut recv, &dibits[SYNC_SYMBOLS + 34..72]).is_empty());
        assert!(recv.synchronizing());

        // Sync is found again afterwards.
        let events = feed_all(&mut recv, &frame(SyncPattern::Normal, nid(), &[]));
        assert!(if let Ok(DataUnitEvent::SyncDetected { .. }) = events[0] {
            true
        } else {
            false
        });
    }

    #[test]
    fn test_nid_early() {
        let payload = payload();
        let mut dibits = frame(SyncPattern::Normal, nid(), &payload);

        // Lose the final sync symbol, so sync matches on the first NID symbol.
        dibits.remove(SYNC_SYMBOLS - 1);

        let mut recv = DataUnitReceiver::new();
        let events = feed_all(&mut recv, &dibits);

        assert_eq!(events[0], Ok(DataUnitEvent::SyncDetected {
            pattern: SyncPattern::Normal,
            bit_errors: 2,
        }));
        assert_eq!(events[1], Ok(DataUnitEvent::NetworkId(nid())));
        assert_eq!(&data(&events)[..payload.len()], &payload[..]);
        assert_eq!(recv.stats().nid.fixed(), 0);

        // The delayed symbols are pads and the final status symbol. Symbols after them
        // start the next search.
        recv.flush_pads();

        let events = feed_all(&mut recv, &frame(SyncPattern::Normal, nid(), &[]));
        assert_eq!(events[0], Ok(DataUnitEvent::SyncDetected {
            pattern: SyncPattern::Normal,
            bit_errors: 0,
        }));
        assert_eq!(events[1], Ok(DataUnitEvent::NetworkId(nid())));
    }

    #[test]
    fn test_nid_late() {
        let payload = payload();
        let mut dibits = frame(SyncPattern::Inverted, nid(), &payload);

        // Stuff a symbol between sync and the NID.
        dibits.insert(SYNC_SYMBOLS, Dibit::new(0b00));

        let mut recv = DataUnitReceiver::new();
        let events = feed_all(&mut recv, &dibits);

        assert_eq!(events[1], Ok(DataUnitEvent::NetworkId(nid())));
        assert_eq!(&data(&events)[..payload.len()], &payload[..]);
    }

    #[test]
    fn test_nid_errors() {
        let mut recv = DataUnitReceiver::new();
        feed_all(&mut recv, &frame(SyncPattern::Normal, nid(), &[]));
        recv.resync();

        // One bit error in each of three NID symbols.
        let mut dibits = frame(SyncPattern::Normal, nid(), &[]);

        for &i in &[26, 40, 50] {
            dibits[i] = Dibit::new(dibits[i].bits() ^ 0b01);
        }

        let events = feed_all(&mut recv, &dibits);
        assert_eq!(events[1], Ok(DataUnitEvent::NetworkId(nid())));
        assert_eq!(recv.stats().nid.words(), 2);
        assert_eq!(recv.stats().nid.fixed(), 3);
    }

    #[test]
    fn test_nid_unrecoverable() {
        let mut dibits = frame(SyncPattern::Normal, nid(), &payload());

        for d in &mut dibits[SYNC_SYMBOLS..SYNC_SYMBOLS + NID_SYMBOLS] {
            *d = d.invert();
        }

        let mut recv = DataUnitReceiver::new();
        let events = feed_all(&mut recv, &dibits[..SYNC_SYMBOLS + NID_SYMBOLS + 1]);

        assert_eq!(events.last(), Some(&Err(DecodeError::BchUnrecoverable)));
        assert_eq!(recv.stats().nid.errors(), 1);
        assert!(recv.synchronizing());
    }

    #[test]
    fn test_unknown_nid() {
        let mut recv = DataUnitReceiver::new();
        let mut dibits = frame(SyncPattern::Normal, nid(), &[]);

        // DUID 0b1001 isn't assigned.
        set_nid(&mut dibits, bch::encode(0x2939));

        let events = feed_all(&mut recv, &dibits);
        assert!(events.contains(&Err(DecodeError::UnknownNid(0b1001))));
        assert_eq!(recv.stats().unknown_nid, 1);
        assert_eq!(recv.stats().sync.words(), 1);
    }

    #[test]
    fn test_lost() {
        let mut recv = DataUnitReceiver::new();

        // The line is filled before the first search.
        let dibits = vec![Dibit::new(0b01); SYNC_SYMBOLS - 1 + SYNC_LOSS_SYMBOLS];

        assert_eq!(feed_all(&mut recv, &dibits), vec![Ok(DataUnitEvent::SyncLost {
            symbols: SYNC_LOSS_SYMBOLS,
        })]);
    }
}
