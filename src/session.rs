//! Session resumption store.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{Context, MASTER_SECRET_LEN};
use crate::message::{CertificateChain, Extensions, SessionId};
use crate::negotiation::Negotiated;
use crate::types::{CipherSuite, CompressionMethod};
use crate::Error;

/// What is kept from a full handshake to allow an abbreviated one later.
///
/// The master secret is zeroed on drop.
#[derive(Clone)]
pub struct SessionParameters {
    cipher_suite: CipherSuite,
    compression: CompressionMethod,
    master_secret: Zeroizing<Vec<u8>>,
    peer_certificate: Option<CertificateChain>,
    encoded_server_extensions: Option<Vec<u8>>,
}

impl fmt::Debug for SessionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionParameters")
            .field("cipher_suite", &self.cipher_suite)
            .field("compression", &self.compression)
            .field("peer_certificate", &self.peer_certificate.as_ref().map(|c| c.len()))
            .field("has_server_extensions", &self.encoded_server_extensions.is_some())
            .finish()
    }
}

impl SessionParameters {
    pub fn builder() -> SessionParametersBuilder {
        SessionParametersBuilder::default()
    }

    /// Snapshot a connection after a full handshake.
    pub fn from_connection(
        ctx: &Context,
        negotiated: &Negotiated,
        peer_certificate: Option<CertificateChain>,
    ) -> Result<SessionParameters, Error> {
        let mut builder = SessionParameters::builder()
            .cipher_suite(negotiated.cipher_suite)
            .compression_algorithm(negotiated.compression)
            .master_secret(ctx.master_secret()?)
            .server_extensions(&negotiated.server_extensions)?;
        if let Some(chain) = peer_certificate {
            builder = builder.peer_certificate(chain);
        }
        builder.build()
    }

    pub fn cipher_suite(&self) -> CipherSuite {
        self.cipher_suite
    }

    pub fn compression_algorithm(&self) -> CompressionMethod {
        self.compression
    }

    pub fn master_secret(&self) -> &[u8] {
        &self.master_secret
    }

    pub fn peer_certificate(&self) -> Option<&CertificateChain> {
        self.peer_certificate.as_ref()
    }

    /// Decode the stored server extensions. None stored reads as empty.
    pub fn read_server_extensions(&self) -> Result<Extensions, Error> {
        match &self.encoded_server_extensions {
            Some(encoded) => Extensions::decode(encoded),
            None => Ok(Extensions::new()),
        }
    }

    /// Zero the master secret.
    pub fn clear(&mut self) {
        self.master_secret.as_mut_slice().zeroize();
    }

    /// Deep copy, including the master secret.
    pub fn copy(&self) -> SessionParameters {
        self.clone()
    }
}

/// Builder for [`SessionParameters`].
#[derive(Default)]
pub struct SessionParametersBuilder {
    cipher_suite: Option<CipherSuite>,
    compression: Option<CompressionMethod>,
    master_secret: Option<Zeroizing<Vec<u8>>>,
    peer_certificate: Option<CertificateChain>,
    encoded_server_extensions: Option<Vec<u8>>,
}

impl SessionParametersBuilder {
    pub fn cipher_suite(mut self, cipher_suite: CipherSuite) -> Self {
        self.cipher_suite = Some(cipher_suite);
        self
    }

    pub fn compression_algorithm(mut self, compression: CompressionMethod) -> Self {
        self.compression = Some(compression);
        self
    }

    /// The secret is copied.
    pub fn master_secret(mut self, master_secret: &[u8]) -> Self {
        self.master_secret = Some(Zeroizing::new(master_secret.to_vec()));
        self
    }

    pub fn peer_certificate(mut self, chain: CertificateChain) -> Self {
        self.peer_certificate = Some(chain);
        self
    }

    /// Store the server extensions in encoded form.
    pub fn server_extensions(mut self, extensions: &Extensions) -> Result<Self, Error> {
        self.encoded_server_extensions = if extensions.is_empty() {
            None
        } else {
            Some(extensions.to_bytes()?)
        };
        Ok(self)
    }

    pub fn build(self) -> Result<SessionParameters, Error> {
        let cipher_suite = self
            .cipher_suite
            .ok_or_else(|| Error::IllegalState("Session cipher suite not set".into()))?;
        let compression = self
            .compression
            .ok_or_else(|| Error::IllegalState("Session compression not set".into()))?;
        let master_secret = self
            .master_secret
            .ok_or_else(|| Error::IllegalState("Session master secret not set".into()))?;

        if master_secret.len() != MASTER_SECRET_LEN {
            return Err(Error::InvalidArgument(format!(
                "Master secret must be {} bytes, got {}",
                MASTER_SECRET_LEN,
                master_secret.len()
            )));
        }

        Ok(SessionParameters {
            cipher_suite,
            compression,
            master_secret,
            peer_certificate: self.peer_certificate,
            encoded_server_extensions: self.encoded_server_extensions,
        })
    }
}

/// A resumable session: an id and, until invalidated, its parameters.
///
/// Share between connections with an `Arc`. The lock is only held while
/// parameters are copied in or out.
pub struct TlsSession {
    session_id: SessionId,
    parameters: Mutex<Option<SessionParameters>>,
}

impl fmt::Debug for TlsSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsSession")
            .field("session_id", &self.session_id)
            .field("resumable", &self.is_resumable())
            .finish()
    }
}

impl TlsSession {
    /// The id must be 1 to 32 bytes.
    pub fn new(session_id: &[u8], parameters: Option<SessionParameters>) -> Result<Self, Error> {
        if session_id.is_empty() {
            return Err(Error::InvalidArgument("Session id must not be empty".into()));
        }
        let session_id = SessionId::try_new(session_id)?;

        debug!("New session {}", session_id);

        Ok(TlsSession {
            session_id,
            parameters: Mutex::new(parameters),
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Forget the parameters. The master secret is zeroed first.
    pub fn invalidate(&self) {
        let taken = self.lock().take();
        if let Some(mut parameters) = taken {
            parameters.clear();
            debug!("Invalidated session {}", self.session_id);
        }
    }

    pub fn is_resumable(&self) -> bool {
        self.lock().is_some()
    }

    /// A copy of the parameters, or None once invalidated.
    pub fn export_session_parameters(&self) -> Option<SessionParameters> {
        self.lock().as_ref().map(|p| p.copy())
    }

    fn lock(&self) -> MutexGuard<'_, Option<SessionParameters>> {
        // A panic while holding the lock can not leave the Option half-written.
        self.parameters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ExtensionType;
    use std::sync::Arc;

    fn parameters() -> SessionParameters {
        let mut extensions = Extensions::new();
        extensions.insert(ExtensionType::EncryptThenMac, Vec::new());
        SessionParameters::builder()
            .cipher_suite(CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA)
            .compression_algorithm(CompressionMethod::Null)
            .master_secret(&[0x42; 48])
            .peer_certificate(CertificateChain::new(vec![vec![1, 2, 3]]))
            .server_extensions(&extensions)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_fields() {
        let missing_suite = SessionParameters::builder()
            .compression_algorithm(CompressionMethod::Null)
            .master_secret(&[0; 48])
            .build();
        assert!(matches!(missing_suite, Err(Error::IllegalState(_))));

        let missing_secret = SessionParameters::builder()
            .cipher_suite(CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA)
            .compression_algorithm(CompressionMethod::Null)
            .build();
        assert!(matches!(missing_secret, Err(Error::IllegalState(_))));

        let short_secret = SessionParameters::builder()
            .cipher_suite(CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA)
            .compression_algorithm(CompressionMethod::Null)
            .master_secret(&[0; 47])
            .build();
        assert!(matches!(short_secret, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn copy_is_deep_and_clear_zeroes() {
        let mut original = parameters();
        let copy = original.copy();
        original.clear();

        assert_eq!(original.master_secret().len(), 48);
        assert!(original.master_secret().iter().all(|b| *b == 0));
        assert_eq!(copy.master_secret(), &[0x42; 48][..]);
        assert_eq!(copy.peer_certificate().unwrap().len(), 1);
    }

    #[test]
    fn server_extensions_round_trip() {
        let p = parameters();
        let ext = p.read_server_extensions().unwrap();
        assert!(ext.contains(ExtensionType::EncryptThenMac));
        assert_eq!(ext.len(), 1);

        let none = SessionParameters::builder()
            .cipher_suite(CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA)
            .compression_algorithm(CompressionMethod::Null)
            .master_secret(&[0; 48])
            .build()
            .unwrap();
        assert!(none.read_server_extensions().unwrap().is_empty());
    }

    #[test]
    fn snapshot_of_connection() {
        use crate::crypto::Role;

        let mut server_extensions = Extensions::new();
        server_extensions.insert(ExtensionType::TruncatedHmac, Vec::new());
        let negotiated = Negotiated {
            version: crate::types::ProtocolVersion::TLSv1_2,
            cipher_suite: CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA,
            compression: CompressionMethod::Null,
            server_extensions,
            session_id: SessionId::try_new(&[1; 32]).unwrap(),
            encrypt_then_mac: false,
            truncated_hmac: true,
            max_fragment_length: None,
            secure_renegotiation: true,
            resumed: false,
        };

        let mut ctx = Context::new(Role::Client, [0; 32], [1; 32]);
        assert!(matches!(
            SessionParameters::from_connection(&ctx, &negotiated, None),
            Err(Error::IllegalState(_))
        ));

        ctx.set_master_secret(&[0x55; 48]).unwrap();
        let p = SessionParameters::from_connection(&ctx, &negotiated, None).unwrap();
        assert_eq!(p.cipher_suite(), CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA);
        assert_eq!(p.master_secret(), &[0x55; 48][..]);
        assert!(p
            .read_server_extensions()
            .unwrap()
            .contains(ExtensionType::TruncatedHmac));
        assert!(p.peer_certificate().is_none());
    }

    #[test]
    fn session_id_bounds() {
        assert!(matches!(
            TlsSession::new(&[], Some(parameters())),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            TlsSession::new(&[0; 33], Some(parameters())),
            Err(Error::InvalidArgument(_))
        ));
        assert!(TlsSession::new(&[0; 32], Some(parameters())).is_ok());
        assert!(TlsSession::new(&[7], None).is_ok());
    }

    #[test]
    fn invalidate_and_export() {
        let session = TlsSession::new(&[1, 2, 3, 4], Some(parameters())).unwrap();
        assert!(session.is_resumable());

        let exported = session.export_session_parameters().unwrap();
        assert_eq!(exported.cipher_suite(), CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA);

        session.invalidate();
        assert!(!session.is_resumable());
        assert!(session.export_session_parameters().is_none());

        // The exported copy outlives the invalidation
        assert_eq!(exported.master_secret(), &[0x42; 48][..]);

        let empty = TlsSession::new(&[5], None).unwrap();
        assert!(!empty.is_resumable());
        empty.invalidate();
    }

    #[test]
    fn shared_across_threads() {
        let session = Arc::new(TlsSession::new(&[9; 16], Some(parameters())).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let s = Arc::clone(&session);
                std::thread::spawn(move || s.export_session_parameters().is_some())
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
        session.invalidate();
        assert!(!session.is_resumable());
    }
}
