use crate::message::{NamedCurve, SignatureAndHashAlgorithm};
use crate::message::extensions::MaxFragmentLength;
use crate::types::{CipherSuite, CompressionMethod, ProtocolVersion};
use crate::Error;

/// Cipher suites offered/accepted when none are configured, in priority order.
const DEFAULT_CIPHER_SUITES: &[CipherSuite] = &[
    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
    CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256,
    CipherSuite::TLS_RSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA256,
    CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA256,
    CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
    CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA,
];

/// Negotiation configuration, shared by both roles.
#[derive(Debug, Clone)]
pub struct Config {
    min_version: ProtocolVersion,
    max_version: ProtocolVersion,
    cipher_suites: Vec<CipherSuite>,
    compression_methods: Vec<CompressionMethod>,
    allow_encrypt_then_mac: bool,
    allow_truncated_hmac: bool,
    max_fragment_length: Option<MaxFragmentLength>,
    signature_algorithms: Vec<SignatureAndHashAlgorithm>,
    named_curves: Vec<NamedCurve>,
    offer_renegotiation_scsv: bool,
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            min_version: ProtocolVersion::TLSv1_0,
            max_version: ProtocolVersion::TLSv1_2,
            cipher_suites: DEFAULT_CIPHER_SUITES.to_vec(),
            compression_methods: vec![CompressionMethod::Null],
            allow_encrypt_then_mac: true,
            allow_truncated_hmac: false,
            max_fragment_length: None,
            signature_algorithms: SignatureAndHashAlgorithm::supported(),
            named_curves: vec![NamedCurve::Secp256r1, NamedCurve::Secp384r1],
            offer_renegotiation_scsv: true,
        }
    }

    /// Builder preset for DTLS 1.0 to DTLS 1.2.
    ///
    /// RC4 suites are never valid over DTLS and are left out.
    pub fn dtls_builder() -> ConfigBuilder {
        Config::builder().versions(ProtocolVersion::DTLSv1_0, ProtocolVersion::DTLSv1_2)
    }

    /// Lowest version we accept.
    #[inline(always)]
    pub fn min_version(&self) -> ProtocolVersion {
        self.min_version
    }

    /// Highest version we offer or select.
    #[inline(always)]
    pub fn max_version(&self) -> ProtocolVersion {
        self.max_version
    }

    /// Cipher suites in priority order.
    #[inline(always)]
    pub fn cipher_suites(&self) -> &[CipherSuite] {
        &self.cipher_suites
    }

    /// Compression methods in priority order.
    #[inline(always)]
    pub fn compression_methods(&self) -> &[CompressionMethod] {
        &self.compression_methods
    }

    /// Whether encrypt-then-MAC (rfc7366) is offered/accepted.
    #[inline(always)]
    pub fn allow_encrypt_then_mac(&self) -> bool {
        self.allow_encrypt_then_mac
    }

    /// Whether truncated HMAC (rfc6066) is offered/accepted.
    #[inline(always)]
    pub fn allow_truncated_hmac(&self) -> bool {
        self.allow_truncated_hmac
    }

    /// For a client, the max fragment length to request (rfc6066).
    #[inline(always)]
    pub fn max_fragment_length(&self) -> Option<MaxFragmentLength> {
        self.max_fragment_length
    }

    /// Signature and hash pairs sent with TLS 1.2 offers.
    #[inline(always)]
    pub fn signature_algorithms(&self) -> &[SignatureAndHashAlgorithm] {
        &self.signature_algorithms
    }

    /// Curves we support for EC cipher suites.
    #[inline(always)]
    pub fn named_curves(&self) -> &[NamedCurve] {
        &self.named_curves
    }

    /// For a client, whether initial offers carry the renegotiation SCSV.
    #[inline(always)]
    pub fn offer_renegotiation_scsv(&self) -> bool {
        self.offer_renegotiation_scsv
    }

    /// Whether any configured suite is an EC suite.
    pub fn has_ecc_suites(&self) -> bool {
        self.cipher_suites.iter().any(|s| s.is_ecc())
    }
}

/// Builder for the negotiation configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    min_version: ProtocolVersion,
    max_version: ProtocolVersion,
    cipher_suites: Vec<CipherSuite>,
    compression_methods: Vec<CompressionMethod>,
    allow_encrypt_then_mac: bool,
    allow_truncated_hmac: bool,
    max_fragment_length: Option<MaxFragmentLength>,
    signature_algorithms: Vec<SignatureAndHashAlgorithm>,
    named_curves: Vec<NamedCurve>,
    offer_renegotiation_scsv: bool,
}

impl ConfigBuilder {
    /// Set the accepted version range.
    ///
    /// Both ends must be in the same family (TLS or DTLS).
    /// Defaults to TLS 1.0 to TLS 1.2.
    pub fn versions(mut self, min: ProtocolVersion, max: ProtocolVersion) -> Self {
        self.min_version = min;
        self.max_version = max;
        self
    }

    /// Set the cipher suites in priority order.
    pub fn cipher_suites(mut self, suites: &[CipherSuite]) -> Self {
        self.cipher_suites = suites.to_vec();
        self
    }

    /// Set the compression methods in priority order.
    ///
    /// Defaults to only the null method.
    pub fn compression_methods(mut self, methods: &[CompressionMethod]) -> Self {
        self.compression_methods = methods.to_vec();
        self
    }

    /// Defaults to true.
    pub fn allow_encrypt_then_mac(mut self, allow: bool) -> Self {
        self.allow_encrypt_then_mac = allow;
        self
    }

    /// Defaults to false.
    pub fn allow_truncated_hmac(mut self, allow: bool) -> Self {
        self.allow_truncated_hmac = allow;
        self
    }

    /// Max fragment length a client requests. Defaults to none.
    pub fn max_fragment_length(mut self, length: Option<MaxFragmentLength>) -> Self {
        self.max_fragment_length = length;
        self
    }

    pub fn signature_algorithms(mut self, algorithms: &[SignatureAndHashAlgorithm]) -> Self {
        self.signature_algorithms = algorithms.to_vec();
        self
    }

    /// Defaults to secp256r1 and secp384r1.
    pub fn named_curves(mut self, curves: &[NamedCurve]) -> Self {
        self.named_curves = curves.to_vec();
        self
    }

    /// Defaults to true.
    pub fn offer_renegotiation_scsv(mut self, offer: bool) -> Self {
        self.offer_renegotiation_scsv = offer;
        self
    }

    /// Build the configuration.
    ///
    /// Fails with [`Error::InvalidArgument`] for an empty or inverted version
    /// range, SSL 3.0 at either end, versions from different families, an empty suite or
    /// compression list, or a suite that can never be negotiated.
    pub fn build(self) -> Result<Config, Error> {
        let (min, max) = (self.min_version, self.max_version);

        if min.is_unknown() || max.is_unknown() {
            return Err(Error::InvalidArgument(format!(
                "Unknown version in range {}..={}",
                min, max
            )));
        }
        if min.is_ssl() || max.is_ssl() {
            return Err(Error::InvalidArgument(format!(
                "SSL 3.0 has no key schedule: {}..={}",
                min, max
            )));
        }
        if min.is_dtls() != max.is_dtls() {
            return Err(Error::InvalidArgument(format!(
                "Version range mixes TLS and DTLS: {}..={}",
                min, max
            )));
        }
        if !min.is_equal_or_earlier_version_of(max) {
            return Err(Error::InvalidArgument(format!(
                "Min version {} is later than max version {}",
                min, max
            )));
        }

        if self.cipher_suites.is_empty() {
            return Err(Error::InvalidArgument("No cipher suites configured".into()));
        }
        if let Some(bad) = self
            .cipher_suites
            .iter()
            .find(|s| s.is_unknown() || s.is_scsv() || **s == CipherSuite::TLS_NULL_WITH_NULL_NULL)
        {
            return Err(Error::InvalidArgument(format!(
                "Cipher suite can not be negotiated: {:?}",
                bad
            )));
        }

        if self.compression_methods.is_empty() {
            return Err(Error::InvalidArgument(
                "No compression methods configured".into(),
            ));
        }

        let has_ecc = self.cipher_suites.iter().any(|s| s.is_ecc());
        if has_ecc && self.named_curves.is_empty() {
            return Err(Error::InvalidArgument(
                "EC cipher suites need at least one named curve".into(),
            ));
        }

        Ok(Config {
            min_version: min,
            max_version: max,
            cipher_suites: self.cipher_suites,
            compression_methods: self.compression_methods,
            allow_encrypt_then_mac: self.allow_encrypt_then_mac,
            allow_truncated_hmac: self.allow_truncated_hmac,
            max_fragment_length: self.max_fragment_length,
            signature_algorithms: self.signature_algorithms,
            named_curves: self.named_curves,
            offer_renegotiation_scsv: self.offer_renegotiation_scsv,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::builder()
            .build()
            .expect("Default config should always validate")
    }
}
