//! The 96-bit header block that starts every data packet.
//!
//! A header has several fields followed by a 16-bit checksum over those fields. The
//! checksum is strong enough to locate and repair a single flipped bit anywhere in the
//! block.

use std::collections::HashMap;

use crate::bits::Dibit;
use crate::coding::crc::crc16;
use crate::consts::CODING_DIBITS;
use crate::data::coder::DibitCoder;
use crate::data::interleave::interleave;
use crate::data::fields::{PacketFormat, ServiceAccessPoint};
use crate::error::{DecodeError, Result};

/// Number of bytes in a header block.
pub const HEADER_BYTES: usize = 12;

/// Number of bytes covered by the header checksum.
const FIELD_BYTES: usize = 10;

lazy_static! {
    /// Maps the syndrome of each single bit error to the position of that bit.
    static ref SYNDROMES: HashMap<u16, usize> = {
        let zero = syndrome(&[0; HEADER_BYTES]);

        (0..HEADER_BYTES * 8).map(|bit| {
            let mut buf = [0; HEADER_BYTES];
            buf[bit / 8] ^= 0x80 >> (bit % 8);
            (syndrome(&buf) ^ zero, bit)
        }).collect()
    };
}

/// Difference between the received and calculated checksums.
fn syndrome(buf: &[u8; HEADER_BYTES]) -> u16 {
    let checksum = (buf[FIELD_BYTES] as u16) << 8 | buf[FIELD_BYTES + 1] as u16;
    crc16(&buf[..FIELD_BYTES]) ^ checksum
}

/// Verify the header checksum, repairing a single bit error in place. Return the number
/// of corrected bits, or `Err(HeaderCrc)` if the errors can't be repaired, in which case
/// the buffer is left untouched.
pub fn correct_header(buf: &mut [u8; HEADER_BYTES]) -> Result<usize> {
    let s = syndrome(buf);

    if s == 0 {
        return Ok(0);
    }

    match SYNDROMES.get(&s) {
        Some(&bit) => {
            buf[bit / 8] ^= 0x80 >> (bit % 8);
            Ok(1)
        },
        None => Err(DecodeError::HeaderCrc),
    }
}

/// Decoded packet data header.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PduHeader {
    /// Whether the packet requires confirmation.
    pub confirmed: bool,
    /// Whether the packet is outbound from the fixed station.
    pub outbound: bool,
    /// Packet format.
    pub format: PacketFormat,
    /// Raw service access point identifier.
    pub sap: u8,
    /// Manufacturer's ID.
    pub vendor: u8,
    /// Logical link ID of the source or destination subscriber.
    pub logical_link: u32,
    /// Whether this is the full message rather than a partial retransmission.
    pub full_message: bool,
    /// Number of data blocks following the header.
    pub blocks_to_follow: u8,
    /// Number of pad octets at the end of the data, or the opcode for trunking formats.
    pub pad_octets: u8,
    /// Whether the receiver should resynchronize its sequence numbers.
    pub resync: bool,
    /// Packet sequence number, N(S).
    pub packet_seq: u8,
    /// Fragment sequence number field.
    pub fragment_seq: u8,
    /// Byte offset where the data header ends and user data begins.
    pub data_offset: u8,
    /// Received checksum.
    pub crc: u16,
    /// Number of bits corrected while decoding the header block.
    pub bit_errors: usize,
}

impl PduHeader {
    /// Create a header for the given format and block count with every other field
    /// zeroed.
    pub fn new(format: PacketFormat, blocks_to_follow: u8) -> PduHeader {
        assert!(blocks_to_follow >> 7 == 0);

        PduHeader {
            confirmed: format == PacketFormat::Confirmed,
            outbound: false,
            format,
            sap: 0,
            vendor: 0,
            logical_link: 0,
            full_message: true,
            blocks_to_follow,
            pad_octets: 0,
            resync: false,
            packet_seq: 0,
            fragment_seq: 0,
            data_offset: 0,
            crc: 0,
            bit_errors: 0,
        }
    }

    /// Verify, repair, and parse the given header block. `prior` is the number of bits
    /// already corrected by the trellis decoder.
    pub fn decode(mut buf: [u8; HEADER_BYTES], prior: usize) -> Result<PduHeader> {
        let fixed = correct_header(&mut buf)?;

        let format = buf[0] & 0x1F;
        let format = PacketFormat::from_bits(format)
            .ok_or(DecodeError::UnknownFormat(format))?;

        Ok(PduHeader {
            confirmed: buf[0] & 0x40 != 0,
            outbound: buf[0] & 0x20 != 0,
            format,
            sap: buf[1] & 0x3F,
            vendor: buf[2],
            logical_link: (buf[3] as u32) << 16 | (buf[4] as u32) << 8 | buf[5] as u32,
            full_message: buf[6] & 0x80 != 0,
            blocks_to_follow: buf[6] & 0x7F,
            pad_octets: buf[7] & 0x3F,
            resync: buf[8] & 0x80 != 0,
            packet_seq: buf[8] >> 4 & 0b111,
            fragment_seq: buf[8] & 0xF,
            data_offset: buf[9] & 0x3F,
            crc: (buf[10] as u16) << 8 | buf[11] as u16,
            bit_errors: prior + fixed,
        })
    }

    /// Serialize the header fields and a freshly calculated checksum.
    pub fn to_bytes(&self) -> [u8; HEADER_BYTES] {
        assert!(self.logical_link >> 24 == 0);
        assert!(self.blocks_to_follow >> 7 == 0);
        assert!(self.pad_octets >> 6 == 0);
        assert!(self.packet_seq >> 3 == 0);
        assert!(self.fragment_seq >> 4 == 0);
        assert!(self.data_offset >> 6 == 0);

        let mut buf = [
            (self.confirmed as u8) << 6 | (self.outbound as u8) << 5 | self.format.to_bits(),
            0b1100_0000 | self.sap & 0x3F,
            self.vendor,
            (self.logical_link >> 16) as u8,
            (self.logical_link >> 8) as u8,
            self.logical_link as u8,
            (self.full_message as u8) << 7 | self.blocks_to_follow,
            self.pad_octets,
            (self.resync as u8) << 7 | self.packet_seq << 4 | self.fragment_seq,
            self.data_offset,
            0,
            0,
        ];

        let checksum = crc16(&buf[..FIELD_BYTES]);
        buf[FIELD_BYTES] = (checksum >> 8) as u8;
        buf[FIELD_BYTES + 1] = checksum as u8;

        buf
    }

    /// Code and interleave the header as a transmitted block.
    pub fn encode(&self) -> [Dibit; CODING_DIBITS] {
        interleave(&DibitCoder::new().feed_bytes(self.to_bytes().iter().cloned()).finish())
    }

    /// Parsed service access point, if it's a known one.
    pub fn service(&self) -> Option<ServiceAccessPoint> {
        ServiceAccessPoint::from_bits(self.sap)
    }

    /// Number of pad octets at the end of the data. Trunking formats reuse this field
    /// for the opcode, so they carry no padding.
    pub fn pads(&self) -> usize {
        match self.format {
            PacketFormat::Trunking => 0,
            _ => self.pad_octets as usize,
        }
    }
}
