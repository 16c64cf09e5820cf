//! Per-connection security parameters and the key schedule built on them.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use zeroize::{Zeroize, Zeroizing};

use super::prf::prf;
use crate::message::extensions::MaxFragmentLength;
use crate::negotiation::Negotiated;
use crate::types::{CipherSuite, CompressionMethod, PrfAlgorithm, ProtocolVersion};
use crate::Error;

/// Length of the master secret.
pub const MASTER_SECRET_LEN: usize = 48;

/// Length of Finished verify data.
pub const VERIFY_DATA_LEN: usize = 12;

/// Which end of the connection we are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Client,
    Server,
}

/// What both sides agreed on, plus the randoms and the master secret.
///
/// Never shared between connections.
#[derive(Debug, Clone)]
pub struct SecurityParameters {
    pub entity: Role,
    pub client_random: [u8; 32],
    pub server_random: [u8; 32],
    pub version: Option<ProtocolVersion>,
    pub cipher_suite: CipherSuite,
    pub compression: CompressionMethod,
    pub encrypt_then_mac: bool,
    pub truncated_hmac: bool,
    pub max_fragment_length: Option<MaxFragmentLength>,
    master_secret: Option<Zeroizing<Vec<u8>>>,
}

/// Key schedule for one connection.
pub struct Context {
    params: SecurityParameters,
    rng: StdRng,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("entity", &self.params.entity)
            .field("version", &self.params.version)
            .field("cipher_suite", &self.params.cipher_suite)
            .field("has_master_secret", &self.params.master_secret.is_some())
            .finish()
    }
}

impl Context {
    /// New context seeded from OS entropy.
    pub fn new(entity: Role, client_random: [u8; 32], server_random: [u8; 32]) -> Self {
        Self::with_rng(entity, client_random, server_random, StdRng::from_entropy())
    }

    /// New context with a caller-provided entropy source.
    pub fn with_rng(
        entity: Role,
        client_random: [u8; 32],
        server_random: [u8; 32],
        rng: StdRng,
    ) -> Self {
        Context {
            params: SecurityParameters {
                entity,
                client_random,
                server_random,
                version: None,
                cipher_suite: CipherSuite::TLS_NULL_WITH_NULL_NULL,
                compression: CompressionMethod::Null,
                encrypt_then_mac: false,
                truncated_hmac: false,
                max_fragment_length: None,
                master_secret: None,
            },
            rng,
        }
    }

    /// A fresh hello random.
    pub fn generate_random<R: RngCore>(rng: &mut R) -> [u8; 32] {
        let mut random = [0u8; 32];
        rng.fill_bytes(&mut random);
        random
    }

    /// Take over the outcome of a negotiation.
    pub fn apply(&mut self, negotiated: &Negotiated) {
        self.params.version = Some(negotiated.version);
        self.params.cipher_suite = negotiated.cipher_suite;
        self.params.compression = negotiated.compression;
        self.params.encrypt_then_mac = negotiated.encrypt_then_mac;
        self.params.truncated_hmac = negotiated.truncated_hmac;
        self.params.max_fragment_length = negotiated.max_fragment_length;
    }

    pub fn set_version(&mut self, version: ProtocolVersion) {
        self.params.version = Some(version);
    }

    pub fn set_cipher_suite(&mut self, cipher_suite: CipherSuite) {
        self.params.cipher_suite = cipher_suite;
    }

    pub fn set_encrypt_then_mac(&mut self, on: bool) {
        self.params.encrypt_then_mac = on;
    }

    pub fn set_truncated_hmac(&mut self, on: bool) {
        self.params.truncated_hmac = on;
    }

    pub fn security_parameters(&self) -> &SecurityParameters {
        &self.params
    }

    pub fn entity(&self) -> Role {
        self.params.entity
    }

    pub fn is_server(&self) -> bool {
        self.params.entity == Role::Server
    }

    pub fn version(&self) -> Result<ProtocolVersion, Error> {
        self.params
            .version
            .ok_or_else(|| Error::IllegalState("No negotiated version".into()))
    }

    pub fn cipher_suite(&self) -> CipherSuite {
        self.params.cipher_suite
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// PRF for the negotiated version and suite. SSL 3.0 has none.
    pub fn prf_algorithm(&self) -> Result<PrfAlgorithm, Error> {
        let version = self.version()?;
        if version.is_ssl() || version.is_unknown() {
            return Err(Error::internal_error(format!(
                "No PRF defined for {}",
                version
            )));
        }
        Ok(self.params.cipher_suite.prf_algorithm(version))
    }

    pub fn has_master_secret(&self) -> bool {
        self.params.master_secret.is_some()
    }

    pub(crate) fn master_secret(&self) -> Result<&[u8], Error> {
        self.params
            .master_secret
            .as_deref()
            .map(|s| s.as_slice())
            .ok_or_else(|| Error::IllegalState("Master secret not established".into()))
    }

    /// Install a master secret taken from a resumed session.
    pub fn set_master_secret(&mut self, master_secret: &[u8]) -> Result<(), Error> {
        if master_secret.len() != MASTER_SECRET_LEN {
            return Err(Error::InvalidArgument(format!(
                "Master secret must be {} bytes, got {}",
                MASTER_SECRET_LEN,
                master_secret.len()
            )));
        }
        self.params.master_secret = Some(Zeroizing::new(master_secret.to_vec()));
        Ok(())
    }

    /// master_secret = PRF(pre_master_secret, "master secret",
    ///                     client_random + server_random)[0..47]
    ///
    /// The pre-master secret is zeroed afterwards, also on failure.
    pub fn establish_master_secret(&mut self, pre_master_secret: &mut [u8]) -> Result<(), Error> {
        let res = self.prf_algorithm().and_then(|alg| {
            let seed = build_seed(
                &self.params.client_random,
                &self.params.server_random,
                None,
            )?;
            prf(alg, pre_master_secret, "master secret", &seed, MASTER_SECRET_LEN)
        });
        pre_master_secret.zeroize();

        self.params.master_secret = Some(Zeroizing::new(res?));
        debug!("Master secret established ({:?})", self.params.entity);
        Ok(())
    }

    /// key_block = PRF(master_secret, "key expansion",
    ///                 server_random + client_random)
    pub fn calculate_key_block(&self, size: usize) -> Result<Zeroizing<Vec<u8>>, Error> {
        let seed = build_seed(
            &self.params.server_random,
            &self.params.client_random,
            None,
        )?;
        let block = prf(
            self.prf_algorithm()?,
            self.master_secret()?,
            "key expansion",
            &seed,
            size,
        )?;
        Ok(Zeroizing::new(block))
    }

    /// verify_data = PRF(master_secret, finished_label, handshake_hash)[0..11]
    pub fn calculate_verify_data(&self, label: &str, handshake_hash: &[u8]) -> Result<Vec<u8>, Error> {
        prf(
            self.prf_algorithm()?,
            self.master_secret()?,
            label,
            handshake_hash,
            VERIFY_DATA_LEN,
        )
    }

    /// Keying material exporter (RFC 5705).
    ///
    /// seed = client_random + server_random [+ uint16 length + context_value]
    pub fn export_keying_material(
        &self,
        label: &str,
        context_value: Option<&[u8]>,
        length: usize,
    ) -> Result<Vec<u8>, Error> {
        let seed = build_seed(
            &self.params.client_random,
            &self.params.server_random,
            context_value,
        )?;
        prf(
            self.prf_algorithm()?,
            self.master_secret()?,
            label,
            &seed,
            length,
        )
    }
}

/// Concatenate two randoms and an optional u16-length-prefixed context.
fn build_seed(first: &[u8], second: &[u8], context_value: Option<&[u8]>) -> Result<Vec<u8>, Error> {
    let mut seed = Vec::with_capacity(first.len() + second.len() + 2);
    seed.extend_from_slice(first);
    seed.extend_from_slice(second);

    if let Some(ctx) = context_value {
        let len = u16::try_from(ctx.len()).map_err(|_| {
            Error::InvalidArgument(format!(
                "Context value must be shorter than 2^16 bytes, got {}",
                ctx.len()
            ))
        })?;
        seed.extend_from_slice(&len.to_be_bytes());
        seed.extend_from_slice(ctx);
    }

    Ok(seed)
}
