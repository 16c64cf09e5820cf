use nom::number::complete::be_u8;
use nom::IResult;

/// Record content type. Part of the MAC and AEAD additional data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    ChangeCipherSpec,
    Alert,
    Handshake,
    ApplicationData,
    Unknown(u8),
}

impl ContentType {
    pub fn from_u8(value: u8) -> Self {
        use ContentType::*;
        match value {
            20 => ChangeCipherSpec,
            21 => Alert,
            22 => Handshake,
            23 => ApplicationData,
            _ => Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        use ContentType::*;
        match self {
            ChangeCipherSpec => 20,
            Alert => 21,
            Handshake => 22,
            ApplicationData => 23,
            Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ContentType> {
        let (input, value) = be_u8(input)?;
        Ok((input, ContentType::from_u8(value)))
    }
}
