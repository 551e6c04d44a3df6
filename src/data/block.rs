//! Data blocks following a packet header.

use crate::bits::Dibit;
use crate::coding::crc::CRC9;
use crate::consts::{CODING_DIBITS, CONFIRMED_DATA_BYTES, HALF_RATE_BYTES};
use crate::data::coder::{self, DibitCoder, TribitCoder};
use crate::data::interleave::{deinterleave, interleave};
use crate::error::{DecodeError, Result};

/// A decoded data block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DataBlock {
    /// Serial number of a confirmed block, `None` for unconfirmed blocks.
    pub serial: Option<u8>,
    /// User data octets carried by the block.
    pub data: Vec<u8>,
    /// Number of bits corrected while decoding the block.
    pub bit_errors: usize,
}

impl DataBlock {
    /// Decode a received (interleaved) 1/2-rate block.
    pub fn decode_unconfirmed(dibits: &[Dibit; CODING_DIBITS], prior: usize)
        -> Result<DataBlock>
    {
        let (bytes, bit_errors) = coder::decode_half_rate(&deinterleave(dibits), prior)?;

        Ok(DataBlock {
            serial: None,
            data: bytes.to_vec(),
            bit_errors,
        })
    }

    /// Decode a received (interleaved) 3/4-rate block and verify its CRC-9. A failed
    /// check returns `Err(BlockCrc)` with the received serial number.
    pub fn decode_confirmed(dibits: &[Dibit; CODING_DIBITS], prior: usize)
        -> Result<DataBlock>
    {
        let (bytes, bit_errors) =
            coder::decode_three_quarter_rate(&deinterleave(dibits), prior)?;

        let serial = bytes[0] >> 1;
        let checksum = (bytes[0] as u16 & 1) << 8 | bytes[1] as u16;
        let data = &bytes[2..];

        if block_crc(serial, data) != checksum {
            return Err(DecodeError::BlockCrc { serial });
        }

        Ok(DataBlock {
            serial: Some(serial),
            data: data.to_vec(),
            bit_errors,
        })
    }

    /// Code and interleave 12 octets as an unconfirmed block.
    pub fn encode_unconfirmed(data: &[u8; HALF_RATE_BYTES]) -> [Dibit; CODING_DIBITS] {
        interleave(&DibitCoder::new().feed_bytes(data.iter().cloned()).finish())
    }

    /// Code and interleave 16 octets as a confirmed block with the given serial number.
    pub fn encode_confirmed(serial: u8, data: &[u8; CONFIRMED_DATA_BYTES])
        -> [Dibit; CODING_DIBITS]
    {
        assert!(serial >> 7 == 0);

        let checksum = block_crc(serial, data);
        let head = [serial << 1 | (checksum >> 8) as u8, checksum as u8];

        interleave(&TribitCoder::new()
            .feed_bytes(head.iter().chain(data.iter()).cloned())
            .finish())
    }
}

/// Calculate the CRC-9 over a block's serial number and data.
fn block_crc(serial: u8, data: &[u8]) -> u16 {
    CRC9::new()
        .feed_bits(serial, 7)
        .feed_bytes(data.iter().cloned())
        .finish() as u16
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unconfirmed() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF, 0, 1, 2, 3, 4, 5, 6, 7];
        let mut coded = DataBlock::encode_unconfirmed(&data);

        let block = DataBlock::decode_unconfirmed(&coded, 0).unwrap();
        assert_eq!(block.serial, None);
        assert_eq!(&block.data[..], &data[..]);
        assert_eq!(block.bit_errors, 0);

        coded[40] = coded[40].invert();

        let block = DataBlock::decode_unconfirmed(&coded, 2).unwrap();
        assert_eq!(&block.data[..], &data[..]);
        assert_eq!(block.bit_errors, 3);
    }

    #[test]
    fn test_confirmed() {
        let data = [0x55; CONFIRMED_DATA_BYTES];
        let coded = DataBlock::encode_confirmed(0b1010101, &data);

        let block = DataBlock::decode_confirmed(&coded, 0).unwrap();
        assert_eq!(block.serial, Some(0b1010101));
        assert_eq!(&block.data[..], &data[..]);
        assert_eq!(block.bit_errors, 0);
    }

    #[test]
    fn test_confirmed_crc() {
        let data = [0x0F; CONFIRMED_DATA_BYTES];
        let checksum = block_crc(3, &data);

        // Valid coding of a block whose checksum doesn't match its data.
        let head = [3 << 1 | (checksum >> 8) as u8, checksum as u8 ^ 0b100];
        let coded = interleave(&TribitCoder::new()
            .feed_bytes(head.iter().chain(data.iter()).cloned())
            .finish());

        assert_eq!(DataBlock::decode_confirmed(&coded, 0),
            Err(DecodeError::BlockCrc { serial: 3 }));
    }

    #[test]
    fn test_block_crc() {
        let data = [0x12; CONFIRMED_DATA_BYTES];

        assert!(block_crc(1, &data) >> 9 == 0);
        assert!(block_crc(1, &data) != block_crc(2, &data));
        assert!(block_crc(1, &data) != block_crc(1, &[0x13; CONFIRMED_DATA_BYTES]));
    }
}
