/// Symbols (dibits) per second.
pub const SYMBOL_RATE: usize = 4800;
/// Baseband samples per second
pub const SAMPLE_RATE: usize = 48000;
/// Baseband samples per symbol.
pub const SYMBOL_PERIOD: usize = SAMPLE_RATE / SYMBOL_RATE;
/// Number of symbols in the frame sync sequence.
pub const SYNC_SYMBOLS: usize = 24;
/// Number of bits in the frame sync sequence.
pub const SYNC_BITS: usize = SYNC_SYMBOLS * 2;
/// Maximum bit errors accepted when matching the frame sync sequence.
pub const SYNC_BIT_ERRORS: u32 = 9;
/// Number of symbols without a sync match between loss of sync reports (one second.)
pub const SYNC_LOSS_SYMBOLS: usize = SYMBOL_RATE;
/// Number of symbols per status period, including the status symbol.
pub const STATUS_PERIOD: usize = 36;
/// Number of dibits in a coded NID word.
pub const NID_DIBITS: usize = 32;
/// Number of symbols spanned by the NID, including the status symbol within it.
pub const NID_SYMBOLS: usize = NID_DIBITS + 1;
/// Position of the status symbol within the NID.
pub const NID_STATUS_INDEX: usize = STATUS_PERIOD - SYNC_SYMBOLS - 1;
/// Number of dibits that are input to the 1/2 or 3/4-rate trellis coder.
pub const CODING_DIBITS: usize = 98;
/// Number of bits in a trellis coded block.
pub const CODING_BITS: usize = CODING_DIBITS * 2;
/// Number of bytes carried by a 1/2-rate coded block.
pub const HALF_RATE_BYTES: usize = 12;
/// Number of bytes carried by a 3/4-rate coded block.
pub const THREE_QUARTER_RATE_BYTES: usize = 18;
/// Number of user data bytes in a confirmed data block.
pub const CONFIRMED_DATA_BYTES: usize = 16;
/// Number of bytes in the packet CRC-32 trailing the final data block.
pub const PACKET_CRC_BYTES: usize = 4;
