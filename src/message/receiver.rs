//! High-level receiver for assembling packet data units into packet sequences.

use log::debug;

use crate::bits::Dibit;
use crate::buffer::{Buffer, CodingStorage};
use crate::consts::CODING_DIBITS;
use crate::data::block::DataBlock;
use crate::data::coder;
use crate::data::header::PduHeader;
use crate::data::interleave::deinterleave;
use crate::data::sequence::PacketSequence;
use crate::error::{DecodeError, Result};
use crate::message::data_unit::{DataUnitEvent, DataUnitReceiver};
use crate::message::nid::{DataUnit, NetworkId};
use crate::message::status::StreamSymbol;
use crate::stats::{HasStats, Stats};
use crate::sync::SyncPattern;

/// Events that can occur when receiving messages.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MessageEvent {
    /// A runtime error occured. The receiver has gone back to searching for sync.
    Error(DecodeError),
    /// Frame sync was found with the given number of bit errors.
    SyncDetected {
        pattern: SyncPattern,
        bit_errors: u32,
    },
    /// Frame sync hasn't been seen for the given number of symbols.
    SyncLost {
        symbols: usize,
    },
    /// An NID at the start of a data unit was decoded.
    PacketNid(NetworkId),
    /// Every block declared by a packet header was received.
    Packet(PacketSequence),
}

/// Internal state of the state machine.
enum State {
    /// Waiting for an event from the lower-level state machine.
    Idle,
    /// Collecting the header block.
    DecodeHeader(Buffer<CodingStorage>),
    /// Collecting the data blocks declared by the header.
    DecodeBlocks(Buffer<CodingStorage>, PacketSequence),
}

impl State {
    pub fn decode_header() -> State {
        State::DecodeHeader(Buffer::new(CodingStorage::new()))
    }

    pub fn decode_blocks(seq: PacketSequence) -> State {
        State::DecodeBlocks(Buffer::new(CodingStorage::new()), seq)
    }
}

/// Action the state machine should take.
enum StateChange {
    /// Change state without an event.
    Change(State),
    /// Propagate an event.
    Event(MessageEvent),
    /// Propagate an event and change state.
    EventChange(MessageEvent, State),
    /// Propagate the sequence held by the current state and go idle.
    Finish,
    /// Do nothing.
    NoChange,
}

/// State machine for high-level message reception.
pub struct MessageReceiver {
    /// Lower-level stream receiver.
    recv: DataUnitReceiver,
    /// Current state.
    state: State,
    stats: Stats,
}

impl MessageReceiver {
    /// Create a new `MessageReceiver` in the initial state.
    pub fn new() -> MessageReceiver {
        MessageReceiver::with_receiver(DataUnitReceiver::new())
    }

    /// Create a new `MessageReceiver` on top of the given data unit receiver.
    pub fn with_receiver(recv: DataUnitReceiver) -> MessageReceiver {
        MessageReceiver {
            recv,
            state: State::Idle,
            stats: Stats::default(),
        }
    }

    /// Force the receiver into frame synchronization, abandoning any partial packet.
    pub fn resync(&mut self) {
        self.recv.resync();
        self.state = State::Idle;
    }

    /// Whether the receiver is searching for frame sync.
    pub fn synchronizing(&self) -> bool { self.recv.synchronizing() }

    /// Feed in a sliced symbol, possibly producing a new event or message.
    pub fn feed(&mut self, d: Dibit) -> Option<MessageEvent> {
        match self.handle(d) {
            StateChange::Change(s) => {
                self.state = s;
                None
            },
            StateChange::Event(e) => Some(e),
            StateChange::EventChange(e, s) => {
                self.state = s;
                Some(e)
            },
            StateChange::Finish => match std::mem::replace(&mut self.state, State::Idle) {
                State::DecodeBlocks(_, seq) => Some(MessageEvent::Packet(seq)),
                _ => None,
            },
            StateChange::NoChange => None,
        }
    }

    /// Process the given symbol and determine how to update state.
    fn handle(&mut self, d: Dibit) -> StateChange {
        use self::State::*;
        use self::StateChange::*;

        let event = self.recv.feed(d);
        self.stats.merge(&mut self.recv);

        let event = match event {
            Some(Ok(event)) => event,
            Some(Err(err)) => {
                self.recv.resync();
                return EventChange(MessageEvent::Error(err), Idle);
            },
            None => return NoChange,
        };

        let dibit = match event {
            DataUnitEvent::SyncDetected { pattern, bit_errors } =>
                return Event(MessageEvent::SyncDetected { pattern, bit_errors }),
            DataUnitEvent::SyncLost { symbols } =>
                return Event(MessageEvent::SyncLost { symbols }),
            DataUnitEvent::NetworkId(nid) => {
                let next = match nid.data_unit {
                    DataUnit::DataPacket => State::decode_header(),
                    _ => {
                        debug!("skipping {:?}", nid.data_unit);
                        self.recv.resync();
                        Idle
                    },
                };

                return EventChange(MessageEvent::PacketNid(nid), next);
            },
            DataUnitEvent::Symbol(StreamSymbol::Status(_)) => return NoChange,
            DataUnitEvent::Symbol(StreamSymbol::Data(dibit)) => dibit,
        };

        let next = match self.state {
            Idle => Ok(NoChange),
            DecodeHeader(ref mut buf) => {
                let block = match buf.feed(dibit) {
                    Some(block) => *block,
                    None => return NoChange,
                };

                match decode_header(&mut self.stats, &block) {
                    Ok(header) => {
                        debug!("packet header: {:?} with {} blocks", header.format,
                               header.blocks_to_follow);

                        let seq = PacketSequence::new(header);

                        if seq.is_complete() {
                            self.recv.flush_pads();
                            Ok(EventChange(MessageEvent::Packet(seq), Idle))
                        } else {
                            Ok(Change(State::decode_blocks(seq)))
                        }
                    },
                    Err(err) => Err(err),
                }
            },
            DecodeBlocks(ref mut buf, ref mut seq) => {
                let block = match buf.feed(dibit) {
                    Some(block) => *block,
                    None => return NoChange,
                };

                let added = decode_block(&mut self.stats, seq.header(), &block)
                    .and_then(|b| seq.add_block(b));

                match added {
                    Ok(()) if seq.is_complete() => {
                        self.recv.flush_pads();
                        Ok(Finish)
                    },
                    Ok(()) => Ok(NoChange),
                    Err(err) => {
                        self.stats.dropped_packets += 1;
                        Err(err)
                    },
                }
            },
        };

        match next {
            Ok(change) => change,
            Err(err) => {
                debug!("abandoning packet: {}", err);
                self.recv.resync();
                EventChange(MessageEvent::Error(err), Idle)
            },
        }
    }
}

impl HasStats for MessageReceiver {
    fn stats(&mut self) -> &mut Stats { &mut self.stats }
}

/// Decode a received header block, recording trellis and CRC stats.
fn decode_header(stats: &mut Stats, block: &[Dibit; CODING_DIBITS]) -> Result<PduHeader> {
    let (bytes, fixed) = match coder::decode_half_rate(&deinterleave(block), 0) {
        Ok(x) => x,
        Err(err) => {
            stats.viterbi_dibit.record_err();
            return Err(err);
        },
    };

    stats.viterbi_dibit.record_fixes(fixed);

    match PduHeader::decode(bytes, fixed) {
        Ok(header) => {
            stats.header_crc.record_fixes(header.bit_errors - fixed);
            Ok(header)
        },
        Err(err) => {
            stats.record_err(err);
            Err(err)
        },
    }
}

/// Decode a received data block at the rate given by the header, recording trellis and
/// CRC stats.
fn decode_block(stats: &mut Stats, header: &PduHeader, block: &[Dibit; CODING_DIBITS])
    -> Result<DataBlock>
{
    if !header.format.three_quarter_rate() {
        return match DataBlock::decode_unconfirmed(block, 0) {
            Ok(b) => {
                stats.viterbi_dibit.record_fixes(b.bit_errors);
                Ok(b)
            },
            Err(err) => {
                stats.viterbi_dibit.record_err();
                Err(err)
            },
        };
    }

    match DataBlock::decode_confirmed(block, 0) {
        Ok(b) => {
            stats.viterbi_tribit.record_fixes(b.bit_errors);
            stats.block_crc.record_fixes(0);
            Ok(b)
        },
        Err(DecodeError::ViterbiUnrecoverable) => {
            stats.viterbi_tribit.record_err();
            Err(DecodeError::ViterbiUnrecoverable)
        },
        Err(err) => {
            stats.record_err(err);
            Err(err)
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::consts::{CONFIRMED_DATA_BYTES, HALF_RATE_BYTES};
    use crate::coding::crc::crc32;
    use crate::data::fields::PacketFormat;
    use crate::data::interleave::interleave;
    use crate::message;
    use crate::message::nid::NetworkAccessCode;
    use crate::message::status::StatusCode;

    fn nid(data_unit: DataUnit) -> NetworkId {
        NetworkId::new(NetworkAccessCode::Default, data_unit)
    }

    fn transmit(header: &PduHeader, blocks: &[[Dibit; CODING_DIBITS]]) -> Vec<Dibit> {
        let symbols: Vec<Dibit> = header.encode().iter()
            .chain(blocks.iter().flat_map(|b| b.iter()))
            .cloned()
            .collect();

        message::frame(nid(DataUnit::DataPacket), symbols, StatusCode::InboundIdle)
    }

    fn feed_all(recv: &mut MessageReceiver, dibits: &[Dibit]) -> Vec<MessageEvent> {
        dibits.iter().filter_map(|&d| recv.feed(d)).collect()
    }

    /// Split user data into unconfirmed blocks, appending the packet CRC.
    fn unconfirmed(payload: &[u8]) -> Vec<[Dibit; CODING_DIBITS]> {
        let mut data = payload.to_vec();
        let crc = crc32(&data);
        data.extend_from_slice(&crc.to_be_bytes());

        assert!(data.len() % HALF_RATE_BYTES == 0);

        data.chunks(HALF_RATE_BYTES).map(|c| {
            let mut buf = [0; HALF_RATE_BYTES];
            buf.copy_from_slice(c);
            DataBlock::encode_unconfirmed(&buf)
        }).collect()
    }

    fn packet(events: &[MessageEvent]) -> Option<&PacketSequence> {
        events.iter().filter_map(|e| match *e {
            MessageEvent::Packet(ref seq) => Some(seq),
            _ => None,
        }).next()
    }

    #[test]
    fn test_unconfirmed() {
        let payload: Vec<u8> = (0..20).collect();
        let mut header = PduHeader::new(PacketFormat::Unconfirmed, 2);
        header.logical_link = 0xABCDEF;

        let mut recv = MessageReceiver::new();
        let events = feed_all(&mut recv, &transmit(&header, &unconfirmed(&payload)));

        assert_eq!(events[0], MessageEvent::SyncDetected {
            pattern: SyncPattern::Normal,
            bit_errors: 0,
        });

        assert_eq!(events[1], MessageEvent::PacketNid(nid(DataUnit::DataPacket)));

        let seq = packet(&events).unwrap();
        assert!(seq.is_complete());
        assert!(seq.packet_crc_valid());
        assert_eq!(seq.header().logical_link, 0xABCDEF);
        assert_eq!(seq.payload(), payload);
        assert_eq!(seq.bit_errors(), 0);

        let stats = recv.stats();
        assert_eq!(stats.viterbi_dibit.words(), 3);
        assert_eq!(stats.header_crc.words(), 1);
        assert_eq!(stats.sync.words(), 1);
        assert_eq!(stats.dropped_packets, 0);
    }

    #[test]
    fn test_confirmed() {
        let header = PduHeader::new(PacketFormat::Confirmed, 2);

        let blocks = vec![
            DataBlock::encode_confirmed(0, &[0x11; CONFIRMED_DATA_BYTES]),
            DataBlock::encode_confirmed(1, &[0x22; CONFIRMED_DATA_BYTES]),
        ];

        let mut recv = MessageReceiver::new();
        let events = feed_all(&mut recv, &transmit(&header, &blocks));

        let seq = packet(&events).unwrap();
        assert_eq!(seq.blocks().len(), 2);
        assert_eq!(seq.blocks()[0].serial, Some(0));
        assert_eq!(seq.blocks()[1].serial, Some(1));
        assert_eq!(&seq.blocks()[1].data[..], &[0x22; CONFIRMED_DATA_BYTES][..]);

        assert_eq!(recv.stats().viterbi_tribit.words(), 2);
        assert_eq!(recv.stats().block_crc.words(), 2);
    }

    #[test]
    fn test_back_to_back() {
        let header = PduHeader::new(PacketFormat::Unconfirmed, 1);
        let blocks = unconfirmed(&[0x55; 8]);

        let mut dibits = transmit(&header, &blocks);
        dibits.extend(transmit(&header, &blocks));

        let mut recv = MessageReceiver::new();
        let events = feed_all(&mut recv, &dibits);

        let packets = events.iter().filter(|e| if let MessageEvent::Packet(_) = e {
            true
        } else {
            false
        }).count();

        assert_eq!(packets, 2);
    }

    #[test]
    fn test_header_only() {
        let header = PduHeader::new(PacketFormat::Response, 0);

        let mut recv = MessageReceiver::new();
        let events = feed_all(&mut recv, &transmit(&header, &[]));

        let seq = packet(&events).unwrap();
        assert_eq!(seq.header().format, PacketFormat::Response);
        assert!(seq.blocks().is_empty());
    }

    #[test]
    fn test_header_crc() {
        let header = PduHeader::new(PacketFormat::Unconfirmed, 1);

        // Flip two adjacent header bits before coding, which the trellis can't see.
        let mut bytes = header.to_bytes();
        bytes[2] ^= 0b11;

        let coded = interleave(&coder::DibitCoder::new()
            .feed_bytes(bytes.iter().cloned())
            .finish());

        let symbols: Vec<Dibit> = coded.iter()
            .chain(unconfirmed(&[0; 8])[0].iter())
            .cloned()
            .collect();

        let dibits = message::frame(nid(DataUnit::DataPacket), symbols,
                                    StatusCode::InboundIdle);

        let mut recv = MessageReceiver::new();
        let events = feed_all(&mut recv, &dibits);

        assert!(events.contains(&MessageEvent::Error(DecodeError::HeaderCrc)));
        assert!(packet(&events).is_none());
        assert_eq!(recv.stats().header_crc.errors(), 1);
    }

    #[test]
    fn test_block_crc() {
        let header = PduHeader::new(PacketFormat::Confirmed, 2);

        let mut blocks = vec![
            DataBlock::encode_confirmed(0, &[0x11; CONFIRMED_DATA_BYTES]),
            DataBlock::encode_confirmed(1, &[0x22; CONFIRMED_DATA_BYTES]),
        ];

        // Flip a data bit of the second block before coding, which the trellis can't
        // see.
        let (mut bytes, _) = coder::decode_three_quarter_rate(&deinterleave(&blocks[1]), 0)
            .unwrap();
        bytes[5] ^= 0x01;

        blocks[1] = interleave(&coder::TribitCoder::new()
            .feed_bytes(bytes.iter().cloned())
            .finish());

        let mut recv = MessageReceiver::new();
        let events = feed_all(&mut recv, &transmit(&header, &blocks));

        assert!(events.contains(&MessageEvent::Error(DecodeError::BlockCrc { serial: 1 })));
        assert!(packet(&events).is_none());
        assert_eq!(recv.stats().block_crc.errors(), 1);
        assert_eq!(recv.stats().dropped_packets, 1);
    }

    #[test]
    fn test_other_data_unit() {
        let dibits = message::frame(nid(DataUnit::TrunkingSignaling),
                                    vec![Dibit::default(); 98],
                                    StatusCode::InboundIdle);

        let mut recv = MessageReceiver::new();
        let events = feed_all(&mut recv, &dibits);

        assert_eq!(events.len(), 2);
        assert_eq!(events[1], MessageEvent::PacketNid(nid(DataUnit::TrunkingSignaling)));
    }
}
