use crate::message::{ExtensionType, Extensions};
use crate::Error;

/// Maximum fragment length (RFC 6066 Section 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaxFragmentLength {
    Pow2_9 = 1,
    Pow2_10 = 2,
    Pow2_11 = 3,
    Pow2_12 = 4,
}

impl MaxFragmentLength {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(MaxFragmentLength::Pow2_9),
            2 => Some(MaxFragmentLength::Pow2_10),
            3 => Some(MaxFragmentLength::Pow2_11),
            4 => Some(MaxFragmentLength::Pow2_12),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Plaintext fragment limit in bytes.
    pub fn fragment_size(&self) -> usize {
        1 << (8 + self.as_u8() as usize)
    }

    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        if data.len() != 1 {
            return Err(Error::decode_error(
                "max_fragment_length data must be one byte",
            ));
        }
        Self::from_u8(data[0]).ok_or_else(|| {
            Error::illegal_parameter(format!("Invalid max_fragment_length {}", data[0]))
        })
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.push(self.as_u8());
    }

    pub fn add_to(&self, extensions: &mut Extensions) {
        extensions.insert(ExtensionType::MaxFragmentLength, vec![self.as_u8()]);
    }

    pub fn from_extensions(extensions: &Extensions) -> Result<Option<Self>, Error> {
        extensions
            .get(ExtensionType::MaxFragmentLength)
            .map(Self::parse)
            .transpose()
    }
}
