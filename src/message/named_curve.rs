use nom::number::complete::be_u16;
use nom::IResult;

/// Named elliptic curves (RFC 4492, RFC 8422).
///
/// Only the curves worth advertising have their own variants. Anything
/// else is carried through as [`NamedCurve::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedCurve {
    /// secp256r1 / P-256.
    Secp256r1,
    /// secp384r1 / P-384.
    Secp384r1,
    /// secp521r1 / P-521.
    Secp521r1,
    /// X25519.
    X25519,
    /// X448.
    X448,
    /// arbitrary_explicit_prime_curves.
    ArbitraryExplicitPrime,
    /// arbitrary_explicit_char2_curves.
    ArbitraryExplicitChar2,
    /// Unknown or unsupported curve.
    Unknown(u16),
}

impl Default for NamedCurve {
    fn default() -> Self {
        Self::Unknown(0)
    }
}

impl NamedCurve {
    pub fn from_u16(value: u16) -> Self {
        match value {
            23 => NamedCurve::Secp256r1,
            24 => NamedCurve::Secp384r1,
            25 => NamedCurve::Secp521r1,
            29 => NamedCurve::X25519,
            30 => NamedCurve::X448,
            0xFF01 => NamedCurve::ArbitraryExplicitPrime,
            0xFF02 => NamedCurve::ArbitraryExplicitChar2,
            _ => NamedCurve::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            NamedCurve::Secp256r1 => 23,
            NamedCurve::Secp384r1 => 24,
            NamedCurve::Secp521r1 => 25,
            NamedCurve::X25519 => 29,
            NamedCurve::X448 => 30,
            NamedCurve::ArbitraryExplicitPrime => 0xFF01,
            NamedCurve::ArbitraryExplicitChar2 => 0xFF02,
            NamedCurve::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], NamedCurve> {
        let (input, value) = be_u16(input)?;
        Ok((input, NamedCurve::from_u16(value)))
    }
}
