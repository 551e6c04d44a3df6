//! Frame-level reception of data units and the packets they carry.

pub mod data_unit;
pub mod nid;
pub mod receiver;
pub mod status;

use crate::bits::{Dibit, Dibits};
use crate::coding::bch;
use crate::consts::SYNC_SYMBOLS;
use crate::sync::SYNC_WORD;

use self::nid::NetworkId;
use self::status::{StatusCode, StatusInterleaver};

/// Build the transmitted symbols of a frame: sync, NID, then the given payload symbols,
/// with status symbols interleaved and zero pads up to the next status symbol.
pub fn frame<T>(nid: NetworkId, payload: T, status: StatusCode) -> Vec<Dibit>
    where T: IntoIterator<Item = Dibit>
{
    let sync = SYNC_WORD << 16;
    let nid = bch::encode(nid.to_bits());

    let symbols = Dibits::new(sync.to_be_bytes().to_vec().into_iter()).take(SYNC_SYMBOLS)
        .chain(Dibits::new(nid.to_be_bytes().to_vec().into_iter()))
        .chain(payload);

    StatusInterleaver::new(symbols, status).collect()
}
