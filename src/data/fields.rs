//! Enumerated fields of the packet data header.

/// Format of a data packet, which determines how its blocks are coded.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PacketFormat {
    /// Confirmed delivery, 3/4-rate data blocks carrying serial numbers.
    Confirmed,
    /// Unconfirmed delivery, 1/2-rate data blocks.
    Unconfirmed,
    /// Response to a confirmed packet.
    Response,
    /// Alternate multiple block trunking control.
    Trunking,
}

impl PacketFormat {
    /// Convert a symbolic format to its associated identifier.
    pub fn to_bits(&self) -> u8 {
        use self::PacketFormat::*;

        match *self {
            Confirmed => 0b10110,
            Unconfirmed => 0b10101,
            Response => 0b00011,
            Trunking => 0b10111,
        }
    }

    /// Parse a packet format from the given 5 bits.
    pub fn from_bits(bits: u8) -> Option<PacketFormat> {
        use self::PacketFormat::*;

        assert!(bits >> 5 == 0);

        match bits {
            0b10110 => Some(Confirmed),
            0b10101 => Some(Unconfirmed),
            0b00011 => Some(Response),
            0b10111 => Some(Trunking),
            _ => None,
        }
    }

    /// Whether data blocks of this format use the 3/4-rate code.
    pub fn three_quarter_rate(&self) -> bool { *self == PacketFormat::Confirmed }
}

/// Destination service of a data packet.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ServiceAccessPoint {
    UnencryptedUserData,
    EncryptedUserData,
    CircuitData,
    CircuitDataControl,
    PacketData,
    ARP,
    SNDCPControl,
    ExtendedAddressing,
    RegistrationAuth,
    ChannelReassignment,
    SystemConfiguration,
    Loopback,
    Statistics,
    OutOfService,
    Paging,
    Configuration,
    UnencryptedKeyManagement,
    EncryptedKeyManagement,
    TrunkingControl,
    EncryptedTrunkingControl,
}

impl ServiceAccessPoint {
    pub fn from_bits(bits: u8) -> Option<ServiceAccessPoint> {
        use self::ServiceAccessPoint::*;

        assert!(bits >> 6 == 0);

        match bits {
            0x00 => Some(UnencryptedUserData),
            0x01 => Some(EncryptedUserData),
            0x02 => Some(CircuitData),
            0x03 => Some(CircuitDataControl),
            0x04 => Some(PacketData),
            0x05 => Some(ARP),
            0x06 => Some(SNDCPControl),
            0x1F => Some(ExtendedAddressing),
            0x20 => Some(RegistrationAuth),
            0x21 => Some(ChannelReassignment),
            0x22 => Some(SystemConfiguration),
            0x23 => Some(Loopback),
            0x24 => Some(Statistics),
            0x25 => Some(OutOfService),
            0x26 => Some(Paging),
            0x27 => Some(Configuration),
            0x28 => Some(UnencryptedKeyManagement),
            0x29 => Some(EncryptedKeyManagement),
            0x3D => Some(TrunkingControl),
            0x3F => Some(EncryptedTrunkingControl),
            _ => None,
        }
    }

    pub fn to_bits(&self) -> u8 {
        use self::ServiceAccessPoint::*;

        match *self {
            UnencryptedUserData => 0x00,
            EncryptedUserData => 0x01,
            CircuitData => 0x02,
            CircuitDataControl => 0x03,
            PacketData => 0x04,
            ARP => 0x05,
            SNDCPControl => 0x06,
            ExtendedAddressing => 0x1F,
            RegistrationAuth => 0x20,
            ChannelReassignment => 0x21,
            SystemConfiguration => 0x22,
            Loopback => 0x23,
            Statistics => 0x24,
            OutOfService => 0x25,
            Paging => 0x26,
            Configuration => 0x27,
            UnencryptedKeyManagement => 0x28,
            EncryptedKeyManagement => 0x29,
            TrunkingControl => 0x3D,
            EncryptedTrunkingControl => 0x3F,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(PacketFormat::from_bits(0b10110), Some(PacketFormat::Confirmed));
        assert_eq!(PacketFormat::from_bits(0b00000), None);
        assert!(PacketFormat::Confirmed.three_quarter_rate());
        assert!(!PacketFormat::Response.three_quarter_rate());

        for f in &[PacketFormat::Confirmed, PacketFormat::Unconfirmed,
                   PacketFormat::Response, PacketFormat::Trunking]
        {
            assert_eq!(PacketFormat::from_bits(f.to_bits()), Some(*f));
        }
    }

    #[test]
    fn test_sap() {
        assert_eq!(ServiceAccessPoint::from_bits(0x04), Some(ServiceAccessPoint::PacketData));
        assert_eq!(ServiceAccessPoint::from_bits(0x3D),
            Some(ServiceAccessPoint::TrunkingControl));
        assert_eq!(ServiceAccessPoint::from_bits(0x10), None);
        assert_eq!(ServiceAccessPoint::Paging.to_bits(), 0x26);
    }

    #[test]
    #[should_panic]
    fn test_sap_validate() {
        ServiceAccessPoint::from_bits(0b11111111);
    }
}
