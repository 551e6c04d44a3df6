//! Packet data units: header and data block decoding and reassembly of complete
//! packets.

pub mod block;
pub mod coder;
pub mod fields;
pub mod header;
pub mod interleave;
pub mod sequence;

pub use self::block::DataBlock;
pub use self::fields::{PacketFormat, ServiceAccessPoint};
pub use self::header::PduHeader;
pub use self::sequence::{PacketSequence, SequenceState};
