use std::fmt;
use std::ops::Deref;

use nom::bytes::complete::take;
use nom::error::{Error as NomError, ErrorKind};
use nom::number::complete::be_u8;
use nom::{Err, IResult};
use rand::Rng;

use crate::Error;

const MAX_LEN: usize = 32;

/// Session id as sent in the hellos: 0 to 32 opaque bytes.
///
/// An empty id means "no session".
#[derive(Clone, Copy)]
pub struct SessionId([u8; MAX_LEN], usize);

impl SessionId {
    pub fn empty() -> Self {
        SessionId([0; MAX_LEN], 0)
    }

    pub fn try_new(data: &[u8]) -> Result<Self, Error> {
        if data.len() > MAX_LEN {
            return Err(Error::InvalidArgument(format!(
                "Session id length {} exceeds {}",
                data.len(),
                MAX_LEN
            )));
        }
        let mut array = [0; MAX_LEN];
        array[..data.len()].copy_from_slice(data);
        Ok(SessionId(array, data.len()))
    }

    /// A fresh full-length id.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let mut array = [0; MAX_LEN];
        rng.fill(&mut array[..]);
        SessionId(array, MAX_LEN)
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, len) = be_u8(input)?;
        if len as usize > MAX_LEN {
            return Err(Err::Failure(NomError::new(input, ErrorKind::LengthValue)));
        }
        let (input, data) = take(len as usize)(input)?;
        let mut array = [0; MAX_LEN];
        array[..data.len()].copy_from_slice(data);
        Ok((input, SessionId(array, data.len())))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.push(self.1 as u8);
        output.extend_from_slice(self);
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({:02x?})", &self.0[..self.1])
    }
}

impl PartialEq for SessionId {
    fn eq(&self, other: &Self) -> bool {
        self.deref() == other.deref()
    }
}

impl Eq for SessionId {}

impl Deref for SessionId {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0[..self.1]
    }
}

impl<'a> TryFrom<&'a [u8]> for SessionId {
    type Error = Error;

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn lengths() {
        assert!(SessionId::try_new(&[]).unwrap().is_empty());
        assert_eq!(SessionId::try_new(&[7; 32]).unwrap().len(), 32);
        assert!(matches!(
            SessionId::try_new(&[7; 33]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn random_is_full_length() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = SessionId::random(&mut rng);
        let b = SessionId::random(&mut rng);
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn parse_and_serialize() {
        let (rest, id) = SessionId::parse(&[2, 0xAB, 0xCD, 9]).unwrap();
        assert_eq!(&*id, &[0xAB, 0xCD]);
        assert_eq!(rest, &[9]);

        let mut out = Vec::new();
        id.serialize(&mut out);
        assert_eq!(out, [2, 0xAB, 0xCD]);

        let mut too_long = vec![33];
        too_long.extend_from_slice(&[0; 33]);
        assert!(SessionId::parse(&too_long).is_err());
    }
}
