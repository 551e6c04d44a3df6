//! Decoding of P25 packet data and DCS squelch codes from demodulated radio samples.

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate serde_derive;

pub mod baseband;
pub mod bits;
pub mod buffer;
pub mod coding;
pub mod consts;
pub mod data;
pub mod error;
pub mod filter;
pub mod gain;
pub mod message;
pub mod receiver;
pub mod stats;
pub mod sync;
pub mod tone;

pub use self::error::{CalibrationError, DecodeError};
pub use self::filter::{CalibrationSet, Calibrator};
pub use self::receiver::{ChannelReceiver, Listener, ReceiverConfig, ReceiverEvent};
