use nom::combinator::all_consuming;
use nom::IResult;
use tinyvec::TinyVec;

use crate::message::{opaque8, ExtensionType, Extensions};
use crate::Error;

/// EC Point Format as defined in RFC 4492 Section 5.1.2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ECPointFormat {
    #[default]
    Uncompressed,
    AnsiX962CompressedPrime,
    AnsiX962CompressedChar2,
    Unknown(u8),
}

impl ECPointFormat {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => ECPointFormat::Uncompressed,
            0x01 => ECPointFormat::AnsiX962CompressedPrime,
            0x02 => ECPointFormat::AnsiX962CompressedChar2,
            _ => ECPointFormat::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            ECPointFormat::Uncompressed => 0x00,
            ECPointFormat::AnsiX962CompressedPrime => 0x01,
            ECPointFormat::AnsiX962CompressedChar2 => 0x02,
            ECPointFormat::Unknown(value) => *value,
        }
    }
}

/// ECPointFormats extension as defined in RFC 4492
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ECPointFormatsExtension {
    pub formats: TinyVec<[ECPointFormat; 3]>,
}

impl ECPointFormatsExtension {
    pub fn new(formats: &[ECPointFormat]) -> Self {
        ECPointFormatsExtension {
            formats: formats.iter().copied().collect(),
        }
    }

    /// The list we send: uncompressed only.
    pub fn uncompressed() -> Self {
        Self::new(&[ECPointFormat::Uncompressed])
    }

    /// Parse the extension data.
    ///
    /// The list may not be empty and must contain the uncompressed format,
    /// which every implementation is required to support.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let (_, list) = all_consuming(formats)(data)?;
        if list.is_empty() {
            return Err(Error::decode_error("Empty ec_point_formats list"));
        }

        let formats: Vec<_> = list.iter().map(|b| ECPointFormat::from_u8(*b)).collect();
        if !formats.contains(&ECPointFormat::Uncompressed) {
            return Err(Error::illegal_parameter(
                "ec_point_formats lacks uncompressed",
            ));
        }

        Ok(Self::new(&formats))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.push(self.formats.len() as u8);
        for format in &self.formats {
            output.push(format.as_u8());
        }
    }

    pub fn add_to(&self, extensions: &mut Extensions) {
        let mut data = Vec::new();
        self.serialize(&mut data);
        extensions.insert(ExtensionType::EcPointFormats, data);
    }

    pub fn from_extensions(extensions: &Extensions) -> Result<Option<Self>, Error> {
        extensions
            .get(ExtensionType::EcPointFormats)
            .map(Self::parse)
            .transpose()
    }
}

fn formats(input: &[u8]) -> IResult<&[u8], &[u8]> {
    opaque8(input)
}
