//! Network ID (NID), Network Access Code (NAC), and Data Unit utilities.

use crate::bits::{pack_dibits, Dibit};
use crate::buffer::SymbolDelayLine;
use crate::coding::bch;
use crate::consts::{NID_STATUS_INDEX, NID_SYMBOLS};
use crate::error::{DecodeError, Result};

/// "Digital squelch" NAC field of the NID.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NetworkAccessCode {
    /// Default P25 NAC.
    Default,
    /// Allows receiver to unsquelch on any NAC (shouldn't be transmitted.)
    ReceiveAny,
    /// Allows repeater to unsquelch/retransmit any NAC (shouldn't be transmitted.)
    RepeatAny,
    /// Custom NAC.
    Other(u16),
}

impl NetworkAccessCode {
    /// Parse 12 bits into a NAC.
    pub fn from_bits(bits: u16) -> NetworkAccessCode {
        use self::NetworkAccessCode::*;

        assert!(bits >> 12 == 0);

        match bits {
            0x293 => Default,
            0xF7E => ReceiveAny,
            0xF7F => RepeatAny,
            _ => Other(bits),
        }
    }

    /// Convert NAC to a 12-bit word.
    pub fn to_bits(self) -> u16 {
        use self::NetworkAccessCode::*;

        match self {
            Default => 0x293,
            ReceiveAny => 0xF7E,
            RepeatAny => 0xF7F,
            Other(bits) => bits,
        }
    }
}

/// Data unit carried after the NID.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DataUnit {
    /// Voice header packet.
    VoiceHeader,
    /// Simple terminator packet.
    VoiceSimpleTerminator,
    /// Terminator packet with link control word.
    VoiceLCTerminator,
    /// Link control voice frame group.
    VoiceLCFrameGroup,
    /// Crypto control voice frame group.
    VoiceCCFrameGroup,
    /// Confirmed/Unconfirmed data packet.
    DataPacket,
    /// Trunking signalling packet.
    TrunkingSignaling,
}

impl DataUnit {
    /// Parse 4 bits into a data unit type.
    pub fn from_bits(bits: u8) -> Option<DataUnit> {
        use self::DataUnit::*;

        assert!(bits >> 4 == 0);

        match bits {
            0b0000 => Some(VoiceHeader),
            0b0011 => Some(VoiceSimpleTerminator),
            0b1111 => Some(VoiceLCTerminator),
            0b0101 => Some(VoiceLCFrameGroup),
            0b1010 => Some(VoiceCCFrameGroup),
            0b1100 => Some(DataPacket),
            0b0111 => Some(TrunkingSignaling),
            _ => None,
        }
    }

    /// Convert data unit to 4-bit word.
    pub fn to_bits(self) -> u8 {
        use self::DataUnit::*;

        match self {
            VoiceHeader => 0b0000,
            VoiceSimpleTerminator => 0b0011,
            VoiceLCTerminator => 0b1111,
            VoiceLCFrameGroup => 0b0101,
            VoiceCCFrameGroup => 0b1010,
            DataPacket => 0b1100,
            TrunkingSignaling => 0b0111,
        }
    }
}

/// NID word following the frame sync of every data unit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NetworkId {
    /// NAC field.
    pub access_code: NetworkAccessCode,
    /// DUID field.
    pub data_unit: DataUnit,
}

impl NetworkId {
    /// Create an NID word from the given NAC and data unit.
    pub fn new(access_code: NetworkAccessCode, data_unit: DataUnit) -> NetworkId {
        NetworkId {
            access_code,
            data_unit,
        }
    }

    /// Parse NID from the given 16-bit word, returning `Err(UnknownNid)` with the DUID
    /// bits if the data unit isn't recognized.
    pub fn from_bits(bits: u16) -> Result<NetworkId> {
        let duid = bits as u8 & 0b1111;

        match DataUnit::from_bits(duid) {
            Some(du) => Ok(NetworkId::new(NetworkAccessCode::from_bits(bits >> 4), du)),
            None => Err(DecodeError::UnknownNid(duid)),
        }
    }

    /// Convert NID to 16-bit representation.
    pub fn to_bits(&self) -> u16 {
        self.access_code.to_bits() << 4 | self.data_unit.to_bits() as u16
    }
}

/// NID codeword decoded from the symbols following frame sync.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NidDecode {
    /// Decoded 16-bit NID word.
    pub word: u16,
    /// Bits corrected by the BCH code.
    pub bit_errors: usize,
    /// Symbols the codeword was found away from where frame sync placed it, negative if
    /// it started early.
    pub slip: isize,
    /// Symbols received after the codeword while searching for it, which belong to the
    /// data unit.
    pub overrun: Vec<Dibit>,
}

impl NidDecode {
    /// Parse the decoded word.
    pub fn nid(&self) -> Result<NetworkId> { NetworkId::from_bits(self.word) }

    pub fn access_code(&self) -> NetworkAccessCode {
        NetworkAccessCode::from_bits(self.word >> 4)
    }
}

/// Collects the 64-bit NID codeword after frame sync and decodes it with the BCH code,
/// skipping the status symbol within it.
///
/// A symbol slipped before sync was matched shows up as the codeword starting one
/// symbol early or late. The codeword where sync placed it is taken if it decodes
/// without errors or carries the expected NAC. Otherwise the windows one symbol either
/// way are decoded too and the best is taken, preferring the expected NAC and then the
/// fewest corrections. Since the code is cyclic, a shifted codeword is often close
/// to another codeword, so the expected NAC carries more weight than the correction
/// count.
pub struct NidReceiver {
    /// Final sync symbol followed by every symbol fed since.
    line: SymbolDelayLine,
    /// Symbols fed so far.
    count: usize,
    /// NAC seen in previous NIDs on the channel.
    expected: Option<NetworkAccessCode>,
}

impl NidReceiver {
    /// Create a new `NidReceiver` starting after the given final sync symbol.
    pub fn new(last_sync: Dibit, expected: Option<NetworkAccessCode>) -> NidReceiver {
        let mut line = SymbolDelayLine::new(NID_SYMBOLS + 2);
        line.insert(last_sync);

        NidReceiver {
            line,
            count: 0,
            expected,
        }
    }

    /// Feed in a symbol corrected for the sync pattern, possibly producing the decoded
    /// NID or `Err(BchUnrecoverable)`.
    pub fn feed(&mut self, dibit: Dibit) -> Option<Result<NidDecode>> {
        self.line.insert(dibit);
        self.count += 1;

        if self.count == NID_SYMBOLS {
            return match self.decode(0) {
                Some(dec) if dec.bit_errors == 0 || self.expects(&dec) => Some(Ok(dec)),
                _ => None,
            };
        }

        if self.count < NID_SYMBOLS + 1 {
            return None;
        }

        let mut found: Vec<NidDecode> = [0, -1, 1].iter()
            .filter_map(|&slip| self.decode(slip))
            .collect();

        // Stable, so ties keep the order above.
        found.sort_by_key(|dec| (!self.expects(dec), dec.bit_errors));

        if found.is_empty() {
            Some(Err(DecodeError::BchUnrecoverable))
        } else {
            Some(Ok(found.swap_remove(0)))
        }
    }

    fn expects(&self, dec: &NidDecode) -> bool {
        self.expected == Some(dec.access_code())
    }

    /// Decode the window offset by `slip` symbols from the one following sync.
    fn decode(&mut self, slip: isize) -> Option<NidDecode> {
        // Symbols received after the end of the window.
        let back = self.count as isize - NID_SYMBOLS as isize - slip;
        let overrun = self.line.recent(back as usize).collect();

        // Drop the trailing symbols so the window is the most recent one.
        self.line.adjust_pointer(-back);

        let window = self.line.extract(self.line.len() - NID_SYMBOLS, NID_SYMBOLS);
        self.line.adjust_pointer(back);

        let bits = pack_dibits(window.into_iter()
            .enumerate()
            .filter(|&(i, _)| i != NID_STATUS_INDEX)
            .map(|(_, d)| d));

        let (word, bit_errors) = bch::decode(bits)?;

        Some(NidDecode {
            word,
            bit_errors,
            slip,
            overrun,
        })
    }
}
