//! Error correction and detection codes: the BCH code protecting the NID, the P25
//! trellis code, the packet data CRCs, and the Golay parity underlying DCS codewords.

pub mod bch;
pub mod crc;
pub mod trellis;
