//! The hello subset both negotiators work on, and the outcome they agree on.

use nom::bytes::complete::take;
use nom::error::{Error as NomError, ErrorKind};
use nom::number::complete::{be_u16, be_u8};
use nom::{Err, IResult};

use crate::message::extensions::MaxFragmentLength;
use crate::message::{opaque8, Extensions, SessionId};
use crate::types::{CipherSuite, CompressionMethod, ProtocolVersion};
use crate::Error;

/// Length of the hello randoms.
pub const RANDOM_LEN: usize = 32;

/// Largest DTLS cookie (RFC 6347 Section 4.2.1).
const MAX_COOKIE_LEN: usize = 255;

/// The negotiable part of a ClientHello.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOffer {
    pub version: ProtocolVersion,
    pub random: [u8; RANDOM_LEN],
    pub session_id: SessionId,
    /// Only sent over DTLS.
    pub cookie: Vec<u8>,
    pub cipher_suites: Vec<CipherSuite>,
    pub compression_methods: Vec<CompressionMethod>,
    pub extensions: Extensions,
}

impl ClientOffer {
    /// Whether the offer carries TLS_EMPTY_RENEGOTIATION_INFO_SCSV.
    pub fn offers_scsv(&self) -> bool {
        self.cipher_suites.iter().any(|s| s.is_scsv())
    }

    /// Whether any offered suite is an EC suite.
    pub fn offers_ecc(&self) -> bool {
        self.cipher_suites.iter().any(|s| s.is_ecc())
    }

    pub fn offers_suite(&self, suite: CipherSuite) -> bool {
        self.cipher_suites.contains(&suite)
    }

    pub fn offers_compression(&self, compression: CompressionMethod) -> bool {
        self.compression_methods.contains(&compression)
    }

    /// Decode a ClientHello body.
    pub fn decode(input: &[u8]) -> Result<ClientOffer, Error> {
        check_version(input)?;
        let (rest, mut offer) = Self::parse(input)?;
        offer.extensions = Extensions::decode(rest)?;
        Ok(offer)
    }

    fn parse(input: &[u8]) -> IResult<&[u8], ClientOffer> {
        let (input, version) = ProtocolVersion::parse(input)?;
        let (input, random) = parse_random(input)?;
        let (input, session_id) = SessionId::parse(input)?;

        let (input, cookie) = if version.is_dtls() {
            let (input, cookie) = opaque8(input)?;
            (input, cookie.to_vec())
        } else {
            (input, Vec::new())
        };

        let (input, suites_len) = be_u16(input)?;
        if suites_len < 2 || suites_len % 2 != 0 {
            return Err(Err::Failure(NomError::new(input, ErrorKind::LengthValue)));
        }
        let (input, mut suites_data) = take(suites_len as usize)(input)?;
        let mut cipher_suites = Vec::with_capacity(suites_len as usize / 2);
        while !suites_data.is_empty() {
            let (rest, suite) = CipherSuite::parse(suites_data)?;
            cipher_suites.push(suite);
            suites_data = rest;
        }

        let (input, compression_len) = be_u8(input)?;
        if compression_len < 1 {
            return Err(Err::Failure(NomError::new(input, ErrorKind::LengthValue)));
        }
        let (input, compression_data) = take(compression_len as usize)(input)?;
        let compression_methods = compression_data
            .iter()
            .map(|b| CompressionMethod::from_u8(*b))
            .collect();

        Ok((
            input,
            ClientOffer {
                version,
                random,
                session_id,
                cookie,
                cipher_suites,
                compression_methods,
                extensions: Extensions::new(),
            },
        ))
    }

    /// Encode as a ClientHello body.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut output = Vec::new();
        self.version.serialize(&mut output);
        output.extend_from_slice(&self.random);
        self.session_id.serialize(&mut output);

        if self.version.is_dtls() {
            if self.cookie.len() > MAX_COOKIE_LEN {
                return Err(Error::InvalidArgument("Cookie too long".into()));
            }
            output.push(self.cookie.len() as u8);
            output.extend_from_slice(&self.cookie);
        }

        let suites_len = u16::try_from(self.cipher_suites.len() * 2)
            .map_err(|_| Error::InvalidArgument("Too many cipher suites".into()))?;
        if suites_len == 0 {
            return Err(Error::InvalidArgument("No cipher suites offered".into()));
        }
        output.extend_from_slice(&suites_len.to_be_bytes());
        for suite in &self.cipher_suites {
            suite.serialize(&mut output);
        }

        let compression_len = u8::try_from(self.compression_methods.len())
            .map_err(|_| Error::InvalidArgument("Too many compression methods".into()))?;
        if compression_len == 0 {
            return Err(Error::InvalidArgument(
                "No compression methods offered".into(),
            ));
        }
        output.push(compression_len);
        output.extend(self.compression_methods.iter().map(|c| c.as_u8()));

        if !self.extensions.is_empty() {
            self.extensions.serialize(&mut output)?;
        }

        Ok(output)
    }
}

/// The negotiable part of a ServerHello.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSelection {
    pub version: ProtocolVersion,
    pub random: [u8; RANDOM_LEN],
    pub session_id: SessionId,
    pub cipher_suite: CipherSuite,
    pub compression_method: CompressionMethod,
    pub extensions: Extensions,
}

impl ServerSelection {
    /// Decode a ServerHello body.
    pub fn decode(input: &[u8]) -> Result<ServerSelection, Error> {
        check_version(input)?;
        let (rest, mut selection) = Self::parse(input)?;
        selection.extensions = Extensions::decode(rest)?;
        Ok(selection)
    }

    fn parse(input: &[u8]) -> IResult<&[u8], ServerSelection> {
        let (input, version) = ProtocolVersion::parse(input)?;
        let (input, random) = parse_random(input)?;
        let (input, session_id) = SessionId::parse(input)?;
        let (input, cipher_suite) = CipherSuite::parse(input)?;
        let (input, compression_method) = CompressionMethod::parse(input)?;

        Ok((
            input,
            ServerSelection {
                version,
                random,
                session_id,
                cipher_suite,
                compression_method,
                extensions: Extensions::new(),
            },
        ))
    }

    /// Encode as a ServerHello body.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut output = Vec::new();
        self.version.serialize(&mut output);
        output.extend_from_slice(&self.random);
        self.session_id.serialize(&mut output);
        self.cipher_suite.serialize(&mut output);
        output.push(self.compression_method.as_u8());

        if !self.extensions.is_empty() {
            self.extensions.serialize(&mut output)?;
        }

        Ok(output)
    }
}

/// The leading version must be in a known family.
fn check_version(input: &[u8]) -> Result<ProtocolVersion, Error> {
    let (_, version) = ProtocolVersion::parse(input)?;
    ProtocolVersion::get(version.major(), version.minor())
}

fn parse_random(input: &[u8]) -> IResult<&[u8], [u8; RANDOM_LEN]> {
    let (input, data) = take(RANDOM_LEN)(input)?;
    let mut random = [0u8; RANDOM_LEN];
    random.copy_from_slice(data);
    Ok((input, random))
}

/// What a negotiation settled on.
///
/// A renegotiation produces a new value rather than changing this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    pub version: ProtocolVersion,
    pub cipher_suite: CipherSuite,
    pub compression: CompressionMethod,
    /// Extensions in the server's response.
    pub server_extensions: Extensions,
    pub session_id: SessionId,
    pub encrypt_then_mac: bool,
    pub truncated_hmac: bool,
    pub max_fragment_length: Option<MaxFragmentLength>,
    /// Both sides signalled RFC 5746 support.
    pub secure_renegotiation: bool,
    /// Abbreviated handshake from a stored session.
    pub resumed: bool,
}

impl Negotiated {
    /// The ServerHello that announces this outcome.
    pub fn server_selection(&self, random: [u8; RANDOM_LEN]) -> ServerSelection {
        ServerSelection {
            version: self.version,
            random,
            session_id: self.session_id,
            cipher_suite: self.cipher_suite,
            compression_method: self.compression,
            extensions: self.server_extensions.clone(),
        }
    }

    /// Largest plaintext fragment for records on this connection.
    pub fn max_plaintext_fragment(&self) -> usize {
        self.max_fragment_length
            .map(|m| m.fragment_size())
            .unwrap_or(1 << 14)
    }
}
