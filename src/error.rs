//! Standard errors that may occur while decoding.

use thiserror::Error;

/// Decoding errors. None of these stop a receiver: each is counted, reported, and the
/// receiver goes back to searching for frame sync.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum DecodeError {
    /// No trellis path survived a convolutional decode.
    #[error("no surviving trellis path in convolutional decode")]
    ViterbiUnrecoverable,
    /// Header CRC detected more than one bit error.
    #[error("header CRC failed with more than one bit error")]
    HeaderCrc,
    /// Confirmed data block failed its CRC-9.
    #[error("confirmed data block {serial} failed CRC-9")]
    BlockCrc {
        /// Serial number carried by the block.
        serial: u8,
    },
    /// Header carried a packet format that isn't supported.
    #[error("unknown packet format {0:#07b}")]
    UnknownFormat(u8),
    /// NID had more bit errors than its BCH code corrects, at every slip offset tried.
    #[error("unrecoverable NID codeword")]
    BchUnrecoverable,
    /// An unknown or corrupted NID was encountered.
    #[error("unknown data unit {0:#06b}")]
    UnknownNid(u8),
    /// More data blocks arrived than the header declared.
    #[error("packet sequence already holds all {declared} declared blocks")]
    SequenceOverflow {
        /// Number of blocks declared by the header.
        declared: usize,
    },
}

/// Standard result using `DecodeError`.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors from filter calibration and its persisted results.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// Reading or writing the calibration file failed.
    #[error("calibration file: {0}")]
    Io(#[from] std::io::Error),
    /// The calibration file isn't valid JSON for a calibration set.
    #[error("calibration file format: {0}")]
    Format(#[from] serde_json::Error),
    /// No usable filter could be designed for benchmarking.
    #[error("no valid filter design for {0}")]
    FilterDesign(&'static str),
}
