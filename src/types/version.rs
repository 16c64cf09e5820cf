use std::fmt;

use nom::number::complete::be_u16;
use nom::IResult;

use crate::types::AlertDescription;
use crate::Error;

/// Protocol version on the wire.
///
/// Two families share this type: the stream family (SSL 3.0, TLS 1.x) with
/// ascending minor numbers, and the datagram family (DTLS) whose minor
/// numbers are 1-complement and therefore *descend* as the protocol ages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    SSLv3,
    TLSv1_0,
    TLSv1_1,
    TLSv1_2,
    DTLSv1_0,
    DTLSv1_2,
    /// A pair in a known family that we do not recognize.
    Unknown(u16),
}

const MAJOR_STREAM: u8 = 0x03;
const MAJOR_DATAGRAM: u8 = 0xFE;

impl ProtocolVersion {
    /// Look up a version by its (major, minor) pair.
    ///
    /// Unregistered pairs within the two known families come back as
    /// [`ProtocolVersion::Unknown`]. Any other major is an illegal parameter.
    pub fn get(major: u8, minor: u8) -> Result<ProtocolVersion, Error> {
        match major {
            MAJOR_STREAM | MAJOR_DATAGRAM => {
                Ok(Self::from_u16(u16::from_be_bytes([major, minor])))
            }
            _ => Err(Error::alert(
                AlertDescription::IllegalParameter,
                format!("Unknown protocol major version {:#04x}", major),
            )),
        }
    }

    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0300 => ProtocolVersion::SSLv3,
            0x0301 => ProtocolVersion::TLSv1_0,
            0x0302 => ProtocolVersion::TLSv1_1,
            0x0303 => ProtocolVersion::TLSv1_2,
            0xFEFF => ProtocolVersion::DTLSv1_0,
            0xFEFD => ProtocolVersion::DTLSv1_2,
            _ => ProtocolVersion::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            ProtocolVersion::SSLv3 => 0x0300,
            ProtocolVersion::TLSv1_0 => 0x0301,
            ProtocolVersion::TLSv1_1 => 0x0302,
            ProtocolVersion::TLSv1_2 => 0x0303,
            ProtocolVersion::DTLSv1_0 => 0xFEFF,
            ProtocolVersion::DTLSv1_2 => 0xFEFD,
            ProtocolVersion::Unknown(value) => *value,
        }
    }

    pub fn major(&self) -> u8 {
        (self.as_u16() >> 8) as u8
    }

    pub fn minor(&self) -> u8 {
        self.as_u16() as u8
    }

    pub fn is_dtls(&self) -> bool {
        self.major() == MAJOR_DATAGRAM
    }

    pub fn is_ssl(&self) -> bool {
        *self == ProtocolVersion::SSLv3
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ProtocolVersion::Unknown(_))
    }

    /// `self <= other`, only defined within one family.
    pub fn is_equal_or_earlier_version_of(&self, other: ProtocolVersion) -> bool {
        if self.major() != other.major() {
            return false;
        }
        let diff = other.minor() as i16 - self.minor() as i16;
        if self.is_dtls() {
            diff <= 0
        } else {
            diff >= 0
        }
    }

    /// `self > other`, only defined within one family.
    pub fn is_later_version_of(&self, other: ProtocolVersion) -> bool {
        if self.major() != other.major() {
            return false;
        }
        let diff = other.minor() as i16 - self.minor() as i16;
        if self.is_dtls() {
            diff > 0
        } else {
            diff < 0
        }
    }

    /// The stream-family version a datagram version is modelled on.
    ///
    /// Stream versions map to themselves.
    pub fn equivalent_stream_version(&self) -> ProtocolVersion {
        if !self.is_dtls() {
            return *self;
        }
        if *self == ProtocolVersion::DTLSv1_0 {
            ProtocolVersion::TLSv1_1
        } else {
            ProtocolVersion::TLSv1_2
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ProtocolVersion> {
        let (input, version) = be_u16(input)?;
        Ok((input, ProtocolVersion::from_u16(version)))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.as_u16().to_be_bytes());
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ProtocolVersion::*;
        let label = match self {
            SSLv3 => "SSL 3.0",
            TLSv1_0 => "TLS 1.0",
            TLSv1_1 => "TLS 1.1",
            TLSv1_2 => "TLS 1.2",
            DTLSv1_0 => "DTLS 1.0",
            DTLSv1_2 => "DTLS 1.2",
            Unknown(v) => return write!(f, "Unknown version {:#06x}", v),
        };
        write!(f, "{}", label)
    }
}
