use nom::combinator::all_consuming;

use crate::message::{opaque8, ExtensionType, Extensions};
use crate::Error;

/// renegotiation_info (RFC 5746): opaque8 of the previous verify data.
///
/// On an initial handshake the connection is empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenegotiationInfoExtension {
    pub renegotiated_connection: Vec<u8>,
}

impl RenegotiationInfoExtension {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.renegotiated_connection.is_empty()
    }

    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let (_, connection) = all_consuming(opaque8)(data)?;
        Ok(RenegotiationInfoExtension {
            renegotiated_connection: connection.to_vec(),
        })
    }

    pub fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        let len = u8::try_from(self.renegotiated_connection.len())
            .map_err(|_| Error::InvalidArgument("renegotiated_connection too long".into()))?;
        output.push(len);
        output.extend_from_slice(&self.renegotiated_connection);
        Ok(())
    }

    pub fn add_to(&self, extensions: &mut Extensions) -> Result<(), Error> {
        let mut data = Vec::new();
        self.serialize(&mut data)?;
        extensions.insert(ExtensionType::RenegotiationInfo, data);
        Ok(())
    }

    pub fn from_extensions(extensions: &Extensions) -> Result<Option<Self>, Error> {
        extensions
            .get(ExtensionType::RenegotiationInfo)
            .map(Self::parse)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AlertDescription;

    #[test]
    fn empty_is_single_zero_byte() {
        let mut out = Vec::new();
        RenegotiationInfoExtension::empty()
            .serialize(&mut out)
            .unwrap();
        assert_eq!(out, [0x00]);
        assert!(RenegotiationInfoExtension::parse(&out).unwrap().is_empty());
    }

    #[test]
    fn length_must_match() {
        let parsed = RenegotiationInfoExtension::parse(&[0x02, 0xAA, 0xBB]).unwrap();
        assert_eq!(parsed.renegotiated_connection, [0xAA, 0xBB]);

        for bad in [&[][..], &[0x02, 0xAA], &[0x00, 0x00]] {
            let err = RenegotiationInfoExtension::parse(bad).unwrap_err();
            assert_eq!(err.alert_description(), Some(AlertDescription::DecodeError));
        }
    }
}
