use nom::bytes::complete::take;
use nom::combinator::all_consuming;
use nom::multi::many0;
use nom::number::complete::be_u24;
use nom::IResult;

use crate::Error;

const MAX_U24: usize = 0xFF_FFFF;

/// A certificate chain as carried in the Certificate message.
///
/// Only the wire framing is handled: a 24-bit total length followed by
/// 24-bit-length-prefixed DER blobs. The blobs themselves are opaque.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CertificateChain {
    pub certificate_list: Vec<Vec<u8>>,
}

impl CertificateChain {
    pub fn new(certificate_list: Vec<Vec<u8>>) -> Self {
        CertificateChain { certificate_list }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.certificate_list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.certificate_list.len()
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], CertificateChain> {
        let (input, total_len) = be_u24(input)?;
        let (input, list) = take(total_len as usize)(input)?;
        let (_, certs) = all_consuming(many0(asn1_cert))(list)?;

        let certificate_list = certs.into_iter().map(|c| c.to_vec()).collect();
        Ok((input, CertificateChain { certificate_list }))
    }

    /// Decode a chain that must fill `input` exactly.
    pub fn decode(input: &[u8]) -> Result<CertificateChain, Error> {
        let (_, chain) = all_consuming(Self::parse)(input)?;
        Ok(chain)
    }

    /// Each blob must be 1 to 2^24-1 bytes (`ASN.1Cert<1..2^24-1>`).
    pub fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        if let Some(i) = self.certificate_list.iter().position(|c| c.is_empty()) {
            return Err(Error::InvalidArgument(format!(
                "Certificate {} in chain is empty",
                i
            )));
        }

        let total_len: usize = self
            .certificate_list
            .iter()
            .map(|cert| 3 + cert.len())
            .sum();
        if total_len > MAX_U24 {
            return Err(Error::InvalidArgument(format!(
                "Certificate chain too long: {}",
                total_len
            )));
        }

        output.extend_from_slice(&(total_len as u32).to_be_bytes()[1..]);
        for cert in &self.certificate_list {
            output.extend_from_slice(&(cert.len() as u32).to_be_bytes()[1..]);
            output.extend_from_slice(cert);
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.serialize(&mut out)?;
        Ok(out)
    }
}

fn asn1_cert(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (rest, len) = be_u24(input)?;
    if len == 0 {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::LengthValue,
        )));
    }
    take(len as usize)(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AlertDescription;

    const MESSAGE: &[u8] = &[
        0x00, 0x00, 0x0D, // Total length
        0x00, 0x00, 0x04, // Certificate 1 length
        0x01, 0x02, 0x03, 0x04, // Certificate 1 data
        0x00, 0x00, 0x03, // Certificate 2 length
        0x05, 0x06, 0x07, // Certificate 2 data
    ];

    #[test]
    fn encode_then_decode() {
        let chain = CertificateChain::new(vec![MESSAGE[6..10].to_vec(), MESSAGE[13..16].to_vec()]);

        assert_eq!(chain.to_bytes().unwrap(), MESSAGE);

        let parsed = CertificateChain::decode(MESSAGE).unwrap();
        assert_eq!(parsed, chain);
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn empty_chain() {
        assert_eq!(CertificateChain::empty().to_bytes().unwrap(), [0, 0, 0]);
        assert!(CertificateChain::decode(&[0, 0, 0]).unwrap().is_empty());
    }

    #[test]
    fn inner_length_mismatch() {
        // Total length says 12, entries need 13
        let mut bad = MESSAGE.to_vec();
        bad[2] = 0x0C;
        bad.pop();
        let err = CertificateChain::decode(&bad).unwrap_err();
        assert_eq!(err.alert_description(), Some(AlertDescription::DecodeError));
    }

    #[test]
    fn truncated_and_trailing() {
        let err = CertificateChain::decode(&MESSAGE[..MESSAGE.len() - 1]).unwrap_err();
        assert_eq!(err.alert_description(), Some(AlertDescription::DecodeError));

        let mut long = MESSAGE.to_vec();
        long.push(0);
        let err = CertificateChain::decode(&long).unwrap_err();
        assert_eq!(err.alert_description(), Some(AlertDescription::DecodeError));
    }

    #[test]
    fn zero_length_entry_rejected() {
        let err = CertificateChain::decode(&[0, 0, 3, 0, 0, 0]).unwrap_err();
        assert_eq!(err.alert_description(), Some(AlertDescription::DecodeError));
    }

    #[test]
    fn empty_entry_is_not_encoded() {
        let chain = CertificateChain::new(vec![vec![1, 2], vec![]]);
        let mut out = vec![0xAA];
        let err = chain.serialize(&mut out).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(out, [0xAA]);
    }

    #[test]
    fn chains_of_k_blobs() {
        for k in 0..5u8 {
            let chain = CertificateChain::new((1..=k).map(|i| vec![i; i as usize * 7]).collect());
            let bytes = chain.to_bytes().unwrap();
            assert_eq!(CertificateChain::decode(&bytes).unwrap(), chain);
        }
    }

    #[test]
    fn oversized_chain_is_invalid_argument() {
        let chain = CertificateChain::new(vec![vec![0u8; MAX_U24]]);
        let err = chain.to_bytes().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
