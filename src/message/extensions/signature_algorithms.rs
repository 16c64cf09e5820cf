use nom::bytes::complete::take;
use nom::combinator::all_consuming;
use nom::multi::many1;
use nom::number::complete::be_u16;
use nom::IResult;
use tinyvec::TinyVec;

use crate::message::{ExtensionType, Extensions, SignatureAlgorithm, SignatureAndHashAlgorithm};
use crate::Error;

/// SignatureAlgorithms extension as defined in RFC 5246
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureAlgorithmsExtension {
    pub supported_signature_algorithms: TinyVec<[SignatureAndHashAlgorithm; 8]>,
}

impl SignatureAlgorithmsExtension {
    pub fn new(algorithms: &[SignatureAndHashAlgorithm]) -> Self {
        SignatureAlgorithmsExtension {
            supported_signature_algorithms: algorithms.iter().copied().collect(),
        }
    }

    /// Parse the extension data.
    ///
    /// The list must hold at least one pair and fill the data exactly.
    /// The anonymous signature algorithm is never acceptable here.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let (_, list) = all_consuming(list)(data)?;
        if list.len() < 2 || list.len() % 2 != 0 {
            return Err(Error::decode_error(format!(
                "Bad signature_algorithms list length {}",
                list.len()
            )));
        }

        let (_, algorithms) = all_consuming(many1(SignatureAndHashAlgorithm::parse))(list)?;
        if algorithms
            .iter()
            .any(|a| a.signature == SignatureAlgorithm::Anonymous)
        {
            return Err(Error::illegal_parameter(
                "Anonymous signature algorithm offered",
            ));
        }

        Ok(Self::new(&algorithms))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(
            &((self.supported_signature_algorithms.len() * 2) as u16).to_be_bytes(),
        );
        for alg in &self.supported_signature_algorithms {
            output.extend_from_slice(&alg.as_u16().to_be_bytes());
        }
    }

    pub fn add_to(&self, extensions: &mut Extensions) {
        let mut data = Vec::new();
        self.serialize(&mut data);
        extensions.insert(ExtensionType::SignatureAlgorithms, data);
    }

    pub fn from_extensions(extensions: &Extensions) -> Result<Option<Self>, Error> {
        extensions
            .get(ExtensionType::SignatureAlgorithms)
            .map(Self::parse)
            .transpose()
    }
}

fn list(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, len) = be_u16(input)?;
    take(len as usize)(input)
}
