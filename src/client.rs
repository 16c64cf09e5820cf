use std::sync::Arc;

use crate::message::extensions::{
    self, ECPointFormatsExtension, MaxFragmentLength, RenegotiationInfoExtension,
    SignatureAlgorithmsExtension, SupportedGroupsExtension,
};
use crate::message::{ExtensionType, Extensions, SessionId};
use crate::negotiation::{ClientOffer, Negotiated, ServerSelection, RANDOM_LEN};
use crate::session::{SessionParameters, TlsSession};
use crate::types::{AlertDescription, CipherSuite, ProtocolVersion};
use crate::{Config, Error};

/// Builds a client's offer and checks the server's selection against it.
pub struct ClientNegotiator {
    config: Arc<Config>,
    /// Session we try to resume.
    session: Option<Arc<TlsSession>>,
    /// Parameters of `session`, if they fit our offer.
    session_parameters: Option<SessionParameters>,
    /// The last offer we built.
    offer: Option<ClientOffer>,
}

impl ClientNegotiator {
    pub fn new(config: Arc<Config>) -> Self {
        ClientNegotiator {
            config,
            session: None,
            session_parameters: None,
            offer: None,
        }
    }

    /// Try to resume `session` in the next offer.
    pub fn with_session(config: Arc<Config>, session: Arc<TlsSession>) -> Self {
        ClientNegotiator {
            session: Some(session),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The offer built by [`ClientNegotiator::build_offer`].
    pub fn offer(&self) -> Option<&ClientOffer> {
        self.offer.as_ref()
    }

    /// Parameters of the session being resumed. Use the master secret from
    /// these when the server accepted the resumption.
    pub fn resumed_session_parameters(&self) -> Option<&SessionParameters> {
        self.session_parameters.as_ref()
    }

    /// Build the initial offer.
    pub fn build_offer(&mut self, random: [u8; RANDOM_LEN]) -> Result<ClientOffer, Error> {
        let config = &self.config;
        let version = config.max_version();

        let mut cipher_suites = config.cipher_suites().to_vec();
        let compression_methods = config.compression_methods().to_vec();

        let mut session_id = SessionId::empty();
        self.session_parameters = None;
        if let Some(session) = &self.session {
            if let Some(parameters) = session.export_session_parameters() {
                // RFC 5246 7.4.1.2. The session's suite and compression must be offered
                if cipher_suites.contains(&parameters.cipher_suite())
                    && compression_methods.contains(&parameters.compression_algorithm())
                {
                    session_id = session.session_id();
                    self.session_parameters = Some(parameters);
                } else {
                    debug!("Session {} does not fit the offer", session.session_id());
                }
            }
        }

        let mut ext = Extensions::new();

        if config.offer_renegotiation_scsv() {
            cipher_suites.push(CipherSuite::TLS_EMPTY_RENEGOTIATION_INFO_SCSV);
        } else {
            RenegotiationInfoExtension::empty().add_to(&mut ext)?;
        }

        if config.allow_encrypt_then_mac() {
            extensions::add_encrypt_then_mac(&mut ext);
        }

        if let Some(max_fragment_length) = config.max_fragment_length() {
            max_fragment_length.add_to(&mut ext);
        }

        if config.allow_truncated_hmac() {
            extensions::add_truncated_hmac(&mut ext);
        }

        if ProtocolVersion::TLSv1_2.is_equal_or_earlier_version_of(version.equivalent_stream_version())
            && !config.signature_algorithms().is_empty()
        {
            SignatureAlgorithmsExtension::new(config.signature_algorithms()).add_to(&mut ext);
        }

        if config.has_ecc_suites() {
            SupportedGroupsExtension::new(config.named_curves()).add_to(&mut ext);
            ECPointFormatsExtension::uncompressed().add_to(&mut ext);
        }

        let offer = ClientOffer {
            version,
            random,
            session_id,
            cookie: Vec::new(),
            cipher_suites,
            compression_methods,
            extensions: ext,
        };

        debug!(
            "Offer {} with {} cipher suites, session {}",
            offer.version,
            offer.cipher_suites.len(),
            offer.session_id
        );

        self.offer = Some(offer.clone());
        Ok(offer)
    }

    /// Validate the server's selection against our offer.
    pub fn process_server_selection(
        &mut self,
        selection: &ServerSelection,
    ) -> Result<Negotiated, Error> {
        let offer = self
            .offer
            .as_ref()
            .ok_or_else(|| Error::IllegalState("No offer sent".into()))?;

        let version = selection.version;
        if version.is_dtls() != offer.version.is_dtls() {
            return Err(Error::illegal_parameter(format!(
                "Server version {} in wrong family for {}",
                version, offer.version
            )));
        }
        if !version.is_equal_or_earlier_version_of(offer.version)
            || !self.config.min_version().is_equal_or_earlier_version_of(version)
        {
            return Err(Error::alert(
                AlertDescription::ProtocolVersion,
                format!("Server selected unacceptable version {}", version),
            ));
        }

        let resumed = !selection.session_id.is_empty()
            && self.session_parameters.is_some()
            && selection.session_id == offer.session_id;

        let suite = selection.cipher_suite;
        if !offer.offers_suite(suite)
            || suite == CipherSuite::TLS_NULL_WITH_NULL_NULL
            || suite.is_scsv()
            || !suite.is_valid_for_version(version)
        {
            return Err(Error::illegal_parameter(format!(
                "Server selected invalid cipher suite {:?}",
                suite
            )));
        }

        let compression = selection.compression_method;
        if !offer.offers_compression(compression) {
            return Err(Error::illegal_parameter(format!(
                "Server selected compression {:?} we did not offer",
                compression
            )));
        }

        // RFC 5246 7.4.1.4. Only extensions we asked for, renegotiation_info excepted
        for extension_type in selection.extensions.types() {
            if extension_type == ExtensionType::RenegotiationInfo {
                continue;
            }
            if !offer.extensions.contains(extension_type) {
                return Err(Error::alert(
                    AlertDescription::UnsupportedExtension,
                    format!("Unsolicited {:?} extension", extension_type),
                ));
            }
        }

        // RFC 5746 3.4.
        let renegotiation_info = RenegotiationInfoExtension::from_extensions(&selection.extensions)?;
        if let Some(info) = &renegotiation_info {
            if !info.is_empty() {
                return Err(Error::handshake_failure(
                    "Non-empty renegotiation_info on initial handshake",
                ));
            }
        }
        let secure_renegotiation = renegotiation_info.is_some();

        let server_extensions = match (&self.session_parameters, resumed) {
            (Some(parameters), true) => {
                if suite != parameters.cipher_suite()
                    || compression != parameters.compression_algorithm()
                {
                    return Err(Error::illegal_parameter(
                        "Resumed session with different parameters",
                    ));
                }
                parameters.read_server_extensions()?
            }
            _ => selection.extensions.clone(),
        };

        let encrypt_then_mac = extensions::has_encrypt_then_mac(&server_extensions)?;
        // RFC 7366 3. Not with stream or AEAD ciphers
        if encrypt_then_mac && !suite.encryption_algorithm().is_block() {
            return Err(Error::illegal_parameter(
                "encrypt_then_mac with a non-block cipher suite",
            ));
        }

        let max_fragment_length = MaxFragmentLength::from_extensions(&server_extensions)?;
        if max_fragment_length.is_some()
            && !resumed
            && max_fragment_length != MaxFragmentLength::from_extensions(&offer.extensions)?
        {
            return Err(Error::illegal_parameter(
                "max_fragment_length differs from the requested one",
            ));
        }

        let truncated_hmac = extensions::has_truncated_hmac(&server_extensions)?;

        if !resumed {
            // A new session replaces the one we tried to resume
            if let Some(session) = &self.session {
                session.invalidate();
            }
            self.session_parameters = None;
        }

        debug!(
            "Server selected {} {:?} {:?} (resumed: {})",
            version, suite, compression, resumed
        );

        Ok(Negotiated {
            version,
            cipher_suite: suite,
            compression,
            server_extensions,
            session_id: selection.session_id,
            encrypt_then_mac,
            truncated_hmac,
            max_fragment_length,
            secure_renegotiation,
            resumed,
        })
    }
}
