use nom::bytes::complete::take;
use nom::combinator::all_consuming;
use nom::multi::many1;
use nom::number::complete::be_u16;
use nom::IResult;
use tinyvec::TinyVec;

use crate::message::{ExtensionType, Extensions, NamedCurve};
use crate::Error;

/// Supported Groups (previously known as EllipticCurves) extension
/// RFC 8422 Section 5.1.1
///
/// Unknown curves are kept so the list can be intersected with ours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedGroupsExtension {
    pub curves: TinyVec<[NamedCurve; 8]>,
}

impl SupportedGroupsExtension {
    pub fn new(curves: &[NamedCurve]) -> Self {
        SupportedGroupsExtension {
            curves: curves.iter().copied().collect(),
        }
    }

    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let (_, list) = all_consuming(list)(data)?;
        if list.len() < 2 || list.len() % 2 != 0 {
            return Err(Error::decode_error(format!(
                "Bad supported_groups list length {}",
                list.len()
            )));
        }
        let (_, curves) = all_consuming(many1(NamedCurve::parse))(list)?;
        Ok(Self::new(&curves))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        // Write the total length of all curves (2 bytes per curve)
        output.extend_from_slice(&((self.curves.len() * 2) as u16).to_be_bytes());
        for curve in &self.curves {
            output.extend_from_slice(&curve.as_u16().to_be_bytes());
        }
    }

    /// Whether any of the offered curves is in `ours`.
    pub fn has_any_of(&self, ours: &[NamedCurve]) -> bool {
        self.curves.iter().any(|c| ours.contains(c))
    }

    pub fn add_to(&self, extensions: &mut Extensions) {
        let mut data = Vec::new();
        self.serialize(&mut data);
        extensions.insert(ExtensionType::SupportedGroups, data);
    }

    pub fn from_extensions(extensions: &Extensions) -> Result<Option<Self>, Error> {
        extensions
            .get(ExtensionType::SupportedGroups)
            .map(Self::parse)
            .transpose()
    }
}

fn list(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, len) = be_u16(input)?;
    take(len as usize)(input)
}
