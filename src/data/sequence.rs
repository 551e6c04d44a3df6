//! Reassembly of a header and its data blocks into a packet.

use crate::coding::crc::crc32;
use crate::consts::{CODING_BITS, PACKET_CRC_BYTES};
use crate::data::block::DataBlock;
use crate::data::header::PduHeader;
use crate::error::{DecodeError, Result};

/// Progress of a packet sequence.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SequenceState {
    /// Only the header has been received.
    HeaderReceived,
    /// Some, but not all, declared blocks have been received.
    Accumulating,
    /// Every declared block has been received.
    Complete,
}

/// A packet header and the data blocks received for it so far.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PacketSequence {
    header: PduHeader,
    blocks: Vec<DataBlock>,
}

impl PacketSequence {
    /// Start a new sequence with the given header.
    pub fn new(header: PduHeader) -> PacketSequence {
        PacketSequence {
            header,
            blocks: Vec::with_capacity(header.blocks_to_follow as usize),
        }
    }

    pub fn header(&self) -> &PduHeader { &self.header }
    pub fn blocks(&self) -> &[DataBlock] { &self.blocks }

    /// Number of blocks declared by the header.
    pub fn declared(&self) -> usize { self.header.blocks_to_follow as usize }

    /// Append the next data block. Once every declared block has been received, further
    /// blocks are rejected with `Err(SequenceOverflow)` and not stored.
    pub fn add_block(&mut self, block: DataBlock) -> Result<()> {
        if self.is_complete() {
            return Err(DecodeError::SequenceOverflow { declared: self.declared() });
        }

        self.blocks.push(block);

        Ok(())
    }

    pub fn state(&self) -> SequenceState {
        if self.blocks.len() == self.declared() {
            SequenceState::Complete
        } else if self.blocks.is_empty() {
            SequenceState::HeaderReceived
        } else {
            SequenceState::Accumulating
        }
    }

    pub fn is_complete(&self) -> bool { self.state() == SequenceState::Complete }

    /// Bits corrected across the header and every block.
    pub fn bit_errors(&self) -> usize {
        self.blocks.iter().fold(self.header.bit_errors, |sum, b| sum + b.bit_errors)
    }

    /// Coded bits received for the header and every block.
    pub fn bits_processed(&self) -> usize {
        (1 + self.blocks.len()) * CODING_BITS
    }

    /// Data octets of every block in order, including pads and the packet CRC.
    fn data(&self) -> Vec<u8> {
        self.blocks.iter().flat_map(|b| b.data.iter().cloned()).collect()
    }

    /// User data of the packet: the data octets without the trailing packet CRC and
    /// pad octets.
    pub fn payload(&self) -> Vec<u8> {
        let mut data = self.data();
        let len = data.len().saturating_sub(PACKET_CRC_BYTES + self.header.pads());

        data.truncate(len);
        data
    }

    /// Check the CRC-32 carried in the last four octets of a complete packet.
    pub fn packet_crc_valid(&self) -> bool {
        if !self.is_complete() {
            return false;
        }

        let data = self.data();

        if data.len() < PACKET_CRC_BYTES {
            return false;
        }

        let (body, tail) = data.split_at(data.len() - PACKET_CRC_BYTES);
        let checksum = tail.iter().fold(0u32, |word, &b| word << 8 | b as u32);

        crc32(body) == checksum
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::fields::PacketFormat;

    fn block(data: &[u8], bit_errors: usize) -> DataBlock {
        DataBlock {
            serial: None,
            data: data.to_vec(),
            bit_errors,
        }
    }

    #[test]
    fn test_completeness() {
        let mut header = PduHeader::new(PacketFormat::Unconfirmed, 3);
        header.bit_errors = 1;

        let mut seq = PacketSequence::new(header);
        assert_eq!(seq.state(), SequenceState::HeaderReceived);
        assert!(!seq.is_complete());
        assert_eq!(seq.bits_processed(), 196);

        for i in 0..3 {
            assert!(!seq.is_complete());
            assert!(seq.add_block(block(&[i; 12], i as usize)).is_ok());

            if i < 2 {
                assert_eq!(seq.state(), SequenceState::Accumulating);
            }
        }

        assert!(seq.is_complete());
        assert_eq!(seq.state(), SequenceState::Complete);
        assert_eq!(seq.bit_errors(), 1 + 0 + 1 + 2);
        assert_eq!(seq.bits_processed(), 4 * 196);

        assert_eq!(seq.add_block(block(&[9; 12], 0)),
            Err(DecodeError::SequenceOverflow { declared: 3 }));
        assert_eq!(seq.blocks().len(), 3);
        assert_eq!(seq.bit_errors(), 4);
    }

    #[test]
    fn test_no_blocks() {
        let mut seq = PacketSequence::new(PduHeader::new(PacketFormat::Response, 0));

        assert!(seq.is_complete());
        assert!(seq.payload().is_empty());
        assert!(!seq.packet_crc_valid());
        assert!(seq.add_block(block(&[0; 12], 0)).is_err());
    }

    #[test]
    fn test_payload() {
        let msg = b"hello, trunked world";
        let mut data = msg.to_vec();

        // 20 octets + 0 pads + 4 CRC octets fill two blocks.
        let checksum = crc32(&data);
        data.extend_from_slice(&checksum.to_be_bytes());
        assert_eq!(data.len(), 24);

        let mut seq = PacketSequence::new(PduHeader::new(PacketFormat::Unconfirmed, 2));
        seq.add_block(block(&data[..12], 0)).unwrap();
        assert!(!seq.packet_crc_valid());
        seq.add_block(block(&data[12..], 0)).unwrap();

        assert!(seq.packet_crc_valid());
        assert_eq!(&seq.payload()[..], &msg[..]);
    }

    #[test]
    fn test_padding() {
        let mut header = PduHeader::new(PacketFormat::Unconfirmed, 1);
        header.pad_octets = 5;

        let mut data = vec![1, 2, 3, 0, 0, 0, 0, 0];
        let checksum = crc32(&data);
        data.extend_from_slice(&checksum.to_be_bytes());

        let mut seq = PacketSequence::new(header);
        seq.add_block(block(&data, 0)).unwrap();

        assert!(seq.packet_crc_valid());
        assert_eq!(seq.payload(), vec![1, 2, 3]);

        let mut bad = data.clone();
        bad[0] ^= 1;

        let mut seq = PacketSequence::new(header);
        seq.add_block(block(&bad, 0)).unwrap();
        assert!(!seq.packet_crc_valid());
    }
}
