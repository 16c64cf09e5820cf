// Server side parameter negotiation:
//
// 1. Version: the client's offer if we support it, else our max.
// 2. EC capability from the offered suites and EC extensions.
// 3. signature_algorithms only with TLS 1.2 offers.
// 4. Cipher suite in our priority order.
// 5. Compression in our priority order.
// 6. Response extensions.
//
// Every step is a hard gate: the first failure ends the negotiation with
// the alert to send.

use std::sync::Arc;

use rand::rngs::OsRng;

use crate::message::extensions::{
    self, ECPointFormat, ECPointFormatsExtension, MaxFragmentLength,
    RenegotiationInfoExtension, SignatureAlgorithmsExtension, SupportedGroupsExtension,
};
use crate::message::{Extensions, SessionId};
use crate::negotiation::{ClientOffer, Negotiated};
use crate::session::{SessionParameters, TlsSession};
use crate::types::{AlertDescription, CipherSuite, CompressionMethod, ProtocolVersion};
use crate::{Config, Error};

/// Negotiates connection parameters for a server from a client's offer.
pub struct ServerNegotiator {
    config: Arc<Config>,
}

/// What the client asked for in its extensions.
struct OfferedExtensions {
    encrypt_then_mac: bool,
    truncated_hmac: bool,
    max_fragment_length: Option<MaxFragmentLength>,
    curves: Option<SupportedGroupsExtension>,
    point_formats: Option<ECPointFormatsExtension>,
    secure_renegotiation: bool,
}

impl ServerNegotiator {
    pub fn new(config: Arc<Config>) -> Self {
        ServerNegotiator { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Negotiate from a client offer.
    ///
    /// `session` is the stored session matching the offered session id, if
    /// the caller has one. It is resumed when it is still resumable and the
    /// client still offers its cipher suite and compression.
    pub fn negotiate(
        &self,
        offer: &ClientOffer,
        session: Option<&TlsSession>,
    ) -> Result<Negotiated, Error> {
        let version = self.select_version(offer.version)?;
        let offered = self.process_client_extensions(offer)?;

        if let Some(parameters) = self.resumable(offer, version, session) {
            return self.resume(offer, version, &offered, parameters);
        }

        let cipher_suite = self.select_cipher_suite(offer, version, &offered)?;
        let compression = self.select_compression(offer)?;

        let mut server_extensions = Extensions::new();
        self.add_renegotiation_info(&offered, &mut server_extensions)?;

        let encrypt_then_mac = offered.encrypt_then_mac
            && self.config.allow_encrypt_then_mac()
            && cipher_suite.encryption_algorithm().is_block();
        if encrypt_then_mac {
            extensions::add_encrypt_then_mac(&mut server_extensions);
        }

        if let Some(max_fragment_length) = offered.max_fragment_length {
            max_fragment_length.add_to(&mut server_extensions);
        }

        let truncated_hmac = offered.truncated_hmac && self.config.allow_truncated_hmac();
        if truncated_hmac {
            extensions::add_truncated_hmac(&mut server_extensions);
        }

        if offered.point_formats.is_some() && cipher_suite.is_ecc() {
            ECPointFormatsExtension::new(&[
                ECPointFormat::Uncompressed,
                ECPointFormat::AnsiX962CompressedPrime,
                ECPointFormat::AnsiX962CompressedChar2,
            ])
            .add_to(&mut server_extensions);
        }

        let session_id = SessionId::random(&mut OsRng);

        debug!(
            "Negotiated {} {:?} {:?} (encrypt-then-MAC: {}, truncated HMAC: {}, max fragment: {:?})",
            version,
            cipher_suite,
            compression,
            encrypt_then_mac,
            truncated_hmac,
            offered.max_fragment_length
        );

        Ok(Negotiated {
            version,
            cipher_suite,
            compression,
            server_extensions,
            session_id,
            encrypt_then_mac,
            truncated_hmac,
            max_fragment_length: offered.max_fragment_length,
            secure_renegotiation: offered.secure_renegotiation,
            resumed: false,
        })
    }

    fn select_version(&self, client_version: ProtocolVersion) -> Result<ProtocolVersion, Error> {
        let min = self.config.min_version();
        let max = self.config.max_version();

        if min.is_equal_or_earlier_version_of(client_version) {
            if client_version.is_equal_or_earlier_version_of(max) {
                return Ok(client_version);
            }
            if client_version.is_later_version_of(max) {
                return Ok(max);
            }
        }

        Err(Error::alert(
            AlertDescription::ProtocolVersion,
            format!("Client version {} outside {}..={}", client_version, min, max),
        ))
    }

    fn process_client_extensions(&self, offer: &ClientOffer) -> Result<OfferedExtensions, Error> {
        let ext = &offer.extensions;

        let curves = SupportedGroupsExtension::from_extensions(ext)?;
        let point_formats = ECPointFormatsExtension::from_extensions(ext)?;

        // RFC 4492 4. No EC extensions without EC cipher suites
        if !offer.offers_ecc() && (curves.is_some() || point_formats.is_some()) {
            return Err(Error::illegal_parameter(
                "EC extensions offered without EC cipher suites",
            ));
        }

        // RFC 5246 7.4.1.4.1. Not meaningful before TLS 1.2
        if SignatureAlgorithmsExtension::from_extensions(ext)?.is_some()
            && !signature_algorithms_allowed(offer.version)
        {
            return Err(Error::illegal_parameter(format!(
                "signature_algorithms offered with {}",
                offer.version
            )));
        }

        let renegotiation_info = RenegotiationInfoExtension::from_extensions(ext)?;
        if let Some(info) = &renegotiation_info {
            // RFC 5746 3.6. Initial handshake only
            if !info.is_empty() {
                return Err(Error::handshake_failure(
                    "Non-empty renegotiation_info on initial handshake",
                ));
            }
        }

        Ok(OfferedExtensions {
            encrypt_then_mac: extensions::has_encrypt_then_mac(ext)?,
            truncated_hmac: extensions::has_truncated_hmac(ext)?,
            max_fragment_length: MaxFragmentLength::from_extensions(ext)?,
            curves,
            point_formats,
            secure_renegotiation: offer.offers_scsv() || renegotiation_info.is_some(),
        })
    }

    fn select_cipher_suite(
        &self,
        offer: &ClientOffer,
        version: ProtocolVersion,
        offered: &OfferedExtensions,
    ) -> Result<CipherSuite, Error> {
        // RFC 4492 4. A client without the curves extension lets us pick any curve
        let ecc_enabled = match &offered.curves {
            None => true,
            Some(curves) => curves.has_any_of(self.config.named_curves()),
        };

        let selected = self.config.cipher_suites().iter().copied().find(|suite| {
            offer.offers_suite(*suite)
                && (ecc_enabled || !suite.is_ecc())
                && suite.is_valid_for_version(version)
        });

        match selected {
            Some(suite) => Ok(suite),
            None => {
                warn!(
                    "No cipher suite in common for {} (offered {})",
                    version,
                    offer.cipher_suites.len()
                );
                Err(Error::handshake_failure("No cipher suite in common"))
            }
        }
    }

    fn select_compression(&self, offer: &ClientOffer) -> Result<CompressionMethod, Error> {
        self.config
            .compression_methods()
            .iter()
            .copied()
            .find(|c| offer.offers_compression(*c))
            .ok_or_else(|| Error::handshake_failure("No compression method in common"))
    }

    fn add_renegotiation_info(
        &self,
        offered: &OfferedExtensions,
        server_extensions: &mut Extensions,
    ) -> Result<(), Error> {
        // RFC 5746 3.6. Echo an empty renegotiation_info, also to a bare SCSV
        if offered.secure_renegotiation {
            RenegotiationInfoExtension::empty().add_to(server_extensions)?;
        }
        Ok(())
    }

    fn resumable(
        &self,
        offer: &ClientOffer,
        version: ProtocolVersion,
        session: Option<&TlsSession>,
    ) -> Option<SessionParameters> {
        let session = session?;
        if offer.session_id.is_empty() || session.session_id() != offer.session_id {
            return None;
        }

        let parameters = session.export_session_parameters()?;
        let suite = parameters.cipher_suite();

        if !offer.offers_suite(suite)
            || !offer.offers_compression(parameters.compression_algorithm())
            || !suite.is_valid_for_version(version)
            || !self.config.cipher_suites().contains(&suite)
        {
            debug!("Session {} not resumable with this offer", offer.session_id);
            return None;
        }

        Some(parameters)
    }

    fn resume(
        &self,
        offer: &ClientOffer,
        version: ProtocolVersion,
        offered: &OfferedExtensions,
        parameters: SessionParameters,
    ) -> Result<Negotiated, Error> {
        let mut server_extensions = parameters.read_server_extensions()?;
        server_extensions.remove(crate::message::ExtensionType::RenegotiationInfo);
        self.add_renegotiation_info(offered, &mut server_extensions)?;

        let encrypt_then_mac = extensions::has_encrypt_then_mac(&server_extensions)?;
        let truncated_hmac = extensions::has_truncated_hmac(&server_extensions)?;
        let max_fragment_length = MaxFragmentLength::from_extensions(&server_extensions)?;

        debug!(
            "Resuming session {} with {} {:?}",
            offer.session_id,
            version,
            parameters.cipher_suite()
        );

        Ok(Negotiated {
            version,
            cipher_suite: parameters.cipher_suite(),
            compression: parameters.compression_algorithm(),
            server_extensions,
            session_id: offer.session_id,
            encrypt_then_mac,
            truncated_hmac,
            max_fragment_length,
            secure_renegotiation: offered.secure_renegotiation,
            resumed: true,
        })
    }
}

fn signature_algorithms_allowed(client_version: ProtocolVersion) -> bool {
    ProtocolVersion::TLSv1_2.is_equal_or_earlier_version_of(client_version.equivalent_stream_version())
}
