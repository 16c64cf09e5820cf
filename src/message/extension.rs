use std::collections::BTreeMap;

use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::IResult;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtensionType {
    ServerName,
    MaxFragmentLength,
    TruncatedHmac,
    StatusRequest,
    SupportedGroups,
    EcPointFormats,
    SignatureAlgorithms,
    UseSrtp,
    Heartbeat,
    ApplicationLayerProtocolNegotiation,
    Padding,
    EncryptThenMac,
    ExtendedMasterSecret,
    SessionTicket,
    RenegotiationInfo,
    Unknown(u16),
}

impl ExtensionType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0000 => ExtensionType::ServerName,
            0x0001 => ExtensionType::MaxFragmentLength,
            0x0004 => ExtensionType::TruncatedHmac,
            0x0005 => ExtensionType::StatusRequest,
            0x000A => ExtensionType::SupportedGroups,
            0x000B => ExtensionType::EcPointFormats,
            0x000D => ExtensionType::SignatureAlgorithms,
            0x000E => ExtensionType::UseSrtp,
            0x000F => ExtensionType::Heartbeat,
            0x0010 => ExtensionType::ApplicationLayerProtocolNegotiation,
            0x0015 => ExtensionType::Padding,
            0x0016 => ExtensionType::EncryptThenMac,
            0x0017 => ExtensionType::ExtendedMasterSecret,
            0x0023 => ExtensionType::SessionTicket,
            0xFF01 => ExtensionType::RenegotiationInfo,
            _ => ExtensionType::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            ExtensionType::ServerName => 0x0000,
            ExtensionType::MaxFragmentLength => 0x0001,
            ExtensionType::TruncatedHmac => 0x0004,
            ExtensionType::StatusRequest => 0x0005,
            ExtensionType::SupportedGroups => 0x000A,
            ExtensionType::EcPointFormats => 0x000B,
            ExtensionType::SignatureAlgorithms => 0x000D,
            ExtensionType::UseSrtp => 0x000E,
            ExtensionType::Heartbeat => 0x000F,
            ExtensionType::ApplicationLayerProtocolNegotiation => 0x0010,
            ExtensionType::Padding => 0x0015,
            ExtensionType::EncryptThenMac => 0x0016,
            ExtensionType::ExtendedMasterSecret => 0x0017,
            ExtensionType::SessionTicket => 0x0023,
            ExtensionType::RenegotiationInfo => 0xFF01,
            ExtensionType::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ExtensionType> {
        let (input, value) = be_u16(input)?;
        Ok((input, ExtensionType::from_u16(value)))
    }
}

/// Extension type to opaque extension data.
///
/// Iteration and encoding follow ascending type number so two maps with the
/// same content always encode to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions {
    entries: BTreeMap<u16, Vec<u8>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert extension data, returning what was previously stored.
    pub fn insert(&mut self, extension_type: ExtensionType, data: Vec<u8>) -> Option<Vec<u8>> {
        self.entries.insert(extension_type.as_u16(), data)
    }

    pub fn get(&self, extension_type: ExtensionType) -> Option<&[u8]> {
        self.entries
            .get(&extension_type.as_u16())
            .map(|d| d.as_slice())
    }

    pub fn contains(&self, extension_type: ExtensionType) -> bool {
        self.entries.contains_key(&extension_type.as_u16())
    }

    pub fn remove(&mut self, extension_type: ExtensionType) -> Option<Vec<u8>> {
        self.entries.remove(&extension_type.as_u16())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExtensionType, &[u8])> + '_ {
        self.entries
            .iter()
            .map(|(t, d)| (ExtensionType::from_u16(*t), d.as_slice()))
    }

    pub fn types(&self) -> impl Iterator<Item = ExtensionType> + '_ {
        self.entries.keys().map(|t| ExtensionType::from_u16(*t))
    }

    /// Encode as a u16-length-prefixed block of (type, opaque16 data) entries.
    ///
    /// On error `output` is left as it was.
    pub fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        let start = output.len();
        let result = self.serialize_block(output, start);
        if result.is_err() {
            output.truncate(start);
        }
        result
    }

    fn serialize_block(&self, output: &mut Vec<u8>, start: usize) -> Result<(), Error> {
        output.extend_from_slice(&[0, 0]);

        for (t, data) in &self.entries {
            let len = u16::try_from(data.len()).map_err(|_| {
                Error::InvalidArgument(format!("Extension {:#06x} data too long", t))
            })?;
            output.extend_from_slice(&t.to_be_bytes());
            output.extend_from_slice(&len.to_be_bytes());
            output.extend_from_slice(data);
        }

        let total = output.len() - start - 2;
        let total = u16::try_from(total)
            .map_err(|_| Error::InvalidArgument("Extensions block too long".into()))?;
        output[start..start + 2].copy_from_slice(&total.to_be_bytes());
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.serialize(&mut out)?;
        Ok(out)
    }

    /// Parse a u16-length-prefixed extensions block.
    ///
    /// The block must fill `input` exactly. An empty `input` means no
    /// extensions were sent. A repeated type is an illegal parameter.
    pub fn decode(input: &[u8]) -> Result<Extensions, Error> {
        if input.is_empty() {
            return Ok(Extensions::new());
        }

        let (rest, block) = length_prefixed(input)?;
        if !rest.is_empty() {
            return Err(Error::decode_error("Trailing data after extensions"));
        }

        let mut extensions = Extensions::new();
        let mut input = block;
        while !input.is_empty() {
            let (rest, (extension_type, data)) = entry(input)?;
            if extensions.insert(extension_type, data.to_vec()).is_some() {
                return Err(Error::illegal_parameter(format!(
                    "Repeated extension {:?}",
                    extension_type
                )));
            }
            input = rest;
        }

        Ok(extensions)
    }
}

fn length_prefixed(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, len) = be_u16(input)?;
    take(len as usize)(input)
}

fn entry(input: &[u8]) -> IResult<&[u8], (ExtensionType, &[u8])> {
    let (input, extension_type) = ExtensionType::parse(input)?;
    let (input, data) = length_prefixed(input)?;
    Ok((input, (extension_type, data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AlertDescription;

    const MESSAGE: &[u8] = &[
        0x00, 0x0E, // Block length
        0x00, 0x0A, // ExtensionType::SupportedGroups
        0x00, 0x06, // Extension length
        0x00, 0x04, 0x00, 0x17, 0x00, 0x18, // Extension data
        0x00, 0x16, // ExtensionType::EncryptThenMac
        0x00, 0x00, // Empty
    ];

    #[test]
    fn encode_orders_by_type() {
        let mut ext = Extensions::new();
        ext.insert(ExtensionType::EncryptThenMac, vec![]);
        ext.insert(
            ExtensionType::SupportedGroups,
            MESSAGE[6..12].to_vec(),
        );

        assert_eq!(ext.to_bytes().unwrap(), MESSAGE);

        let parsed = Extensions::decode(MESSAGE).unwrap();
        assert_eq!(parsed, ext);
        assert_eq!(
            parsed.types().collect::<Vec<_>>(),
            vec![ExtensionType::SupportedGroups, ExtensionType::EncryptThenMac]
        );
    }

    #[test]
    fn empty_input_is_no_extensions() {
        let ext = Extensions::decode(&[]).unwrap();
        assert!(ext.is_empty());
    }

    #[test]
    fn repeated_type_is_illegal() {
        let bytes = [0x00, 0x08, 0x00, 0x16, 0x00, 0x00, 0x00, 0x16, 0x00, 0x00];
        let err = Extensions::decode(&bytes).unwrap_err();
        assert_eq!(
            err.alert_description(),
            Some(AlertDescription::IllegalParameter)
        );
    }

    #[test]
    fn truncated_block_is_decode_error() {
        let err = Extensions::decode(&MESSAGE[..MESSAGE.len() - 1]).unwrap_err();
        assert_eq!(err.alert_description(), Some(AlertDescription::DecodeError));

        // Entry claims more data than the block holds
        let bytes = [0x00, 0x04, 0x00, 0x16, 0x00, 0x01];
        let err = Extensions::decode(&bytes).unwrap_err();
        assert_eq!(err.alert_description(), Some(AlertDescription::DecodeError));
    }

    #[test]
    fn failed_encode_leaves_output_alone() {
        let mut ext = Extensions::new();
        ext.insert(ExtensionType::EncryptThenMac, vec![]);
        ext.insert(ExtensionType::Padding, vec![0; 70_000]);
        let mut out = vec![1, 2, 3];
        assert!(matches!(ext.serialize(&mut out), Err(Error::InvalidArgument(_))));
        assert_eq!(out, [1, 2, 3]);

        // Each entry fits, the block does not
        let mut ext = Extensions::new();
        ext.insert(ExtensionType::Padding, vec![0; 40_000]);
        ext.insert(ExtensionType::Unknown(0x1234), vec![0; 40_000]);
        let mut out = vec![9];
        assert!(ext.serialize(&mut out).is_err());
        assert_eq!(out, [9]);
    }

    #[test]
    fn trailing_bytes_are_decode_error() {
        let mut bytes = MESSAGE.to_vec();
        bytes.push(0);
        let err = Extensions::decode(&bytes).unwrap_err();
        assert_eq!(err.alert_description(), Some(AlertDescription::DecodeError));
    }
}
