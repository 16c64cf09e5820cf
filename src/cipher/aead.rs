//! AEAD records (RFC 5288): AES-GCM with a 4 byte implicit and an 8 byte
//! explicit nonce part.

use crate::crypto::engine::AesGcm;
use crate::crypto::{Context, Role};
use crate::types::{ContentType, ProtocolVersion};
use crate::Error;

/// Implicit (fixed) IV length taken from the key block.
pub(crate) const FIXED_IV_LEN: usize = 4;

/// Explicit nonce length, sent in front of every record.
pub(crate) const EXPLICIT_NONCE_LEN: usize = 8;

/// GCM authentication tag length.
pub(crate) const GCM_TAG_LEN: usize = 16;

/// Overhead per record (explicit nonce + tag).
pub(crate) const AEAD_OVERHEAD: usize = EXPLICIT_NONCE_LEN + GCM_TAG_LEN;

/// Full 12 byte GCM nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Nonce([u8; 12]);

impl Nonce {
    fn new(iv: &[u8; FIXED_IV_LEN], explicit_nonce: &[u8]) -> Self {
        let mut nonce = [0u8; 12];
        nonce[..FIXED_IV_LEN].copy_from_slice(iv);
        nonce[FIXED_IV_LEN..].copy_from_slice(explicit_nonce);
        Nonce(nonce)
    }
}

/// seq_num(8) + type(1) + version(2) + length(2)
fn additional_data(
    seq_no: u64,
    content_type: ContentType,
    version: ProtocolVersion,
    length: usize,
) -> [u8; 13] {
    let mut aad = [0u8; 13];
    aad[..8].copy_from_slice(&seq_no.to_be_bytes());
    aad[8] = content_type.as_u8();
    aad[9..11].copy_from_slice(&version.as_u16().to_be_bytes());
    aad[11..13].copy_from_slice(&(length as u16).to_be_bytes());
    aad
}

/// AEAD record protection.
#[derive(Debug)]
pub struct AeadCipher {
    version: ProtocolVersion,
    write_cipher: AesGcm,
    read_cipher: AesGcm,
    write_iv: [u8; FIXED_IV_LEN],
    read_iv: [u8; FIXED_IV_LEN],
}

impl AeadCipher {
    pub(crate) fn new(ctx: &mut Context, cipher_key_size: usize) -> Result<Self, Error> {
        let version = ctx.version()?;
        if !ProtocolVersion::TLSv1_2.is_equal_or_earlier_version_of(version.equivalent_stream_version())
        {
            return Err(Error::internal_error(format!(
                "AEAD ciphers need TLS 1.2 or later, negotiated {}",
                version
            )));
        }

        let key_block_size = 2 * cipher_key_size + 2 * FIXED_IV_LEN;
        let key_block = ctx.calculate_key_block(key_block_size)?;
        let (client_key, rest) = key_block.split_at(cipher_key_size);
        let (server_key, rest) = rest.split_at(cipher_key_size);
        let (client_iv, server_iv) = rest.split_at(FIXED_IV_LEN);

        let client_cipher = AesGcm::new(client_key)?;
        let server_cipher = AesGcm::new(server_key)?;

        let mut client_write_iv = [0u8; FIXED_IV_LEN];
        let mut server_write_iv = [0u8; FIXED_IV_LEN];
        client_write_iv.copy_from_slice(client_iv);
        server_write_iv.copy_from_slice(server_iv);

        debug!("AEAD cipher for {}: {:?}", version, client_cipher);

        let (write_cipher, read_cipher, write_iv, read_iv) = match ctx.entity() {
            Role::Server => (server_cipher, client_cipher, server_write_iv, client_write_iv),
            Role::Client => (client_cipher, server_cipher, client_write_iv, server_write_iv),
        };

        Ok(AeadCipher {
            version,
            write_cipher,
            read_cipher,
            write_iv,
            read_iv,
        })
    }

    pub fn plaintext_limit(&self, ciphertext_limit: usize) -> usize {
        ciphertext_limit.saturating_sub(AEAD_OVERHEAD)
    }

    pub fn encode_plaintext(
        &mut self,
        seq_no: u64,
        content_type: ContentType,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, Error> {
        // The sequence number is the explicit nonce
        let explicit_nonce = seq_no.to_be_bytes();
        let nonce = Nonce::new(&self.write_iv, &explicit_nonce);
        let aad = additional_data(seq_no, content_type, self.version, plaintext.len());

        let mut body = Vec::with_capacity(plaintext.len() + GCM_TAG_LEN);
        body.extend_from_slice(plaintext);
        self.write_cipher.seal(&nonce.0, &aad, &mut body)?;

        let mut out = Vec::with_capacity(EXPLICIT_NONCE_LEN + body.len());
        out.extend_from_slice(&explicit_nonce);
        out.extend_from_slice(&body);

        trace!(
            "Sealed {:?} record seq {}: {} -> {} bytes",
            content_type,
            seq_no,
            plaintext.len(),
            out.len()
        );

        Ok(out)
    }

    pub fn decode_ciphertext(
        &mut self,
        seq_no: u64,
        content_type: ContentType,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let Some(plaintext_len) = ciphertext.len().checked_sub(AEAD_OVERHEAD) else {
            return Err(Error::decode_error(format!(
                "AEAD record too short: {}",
                ciphertext.len()
            )));
        };

        let (explicit_nonce, body) = ciphertext.split_at(EXPLICIT_NONCE_LEN);
        let nonce = Nonce::new(&self.read_iv, explicit_nonce);
        let aad = additional_data(seq_no, content_type, self.version, plaintext_len);

        let mut buf = body.to_vec();
        self.read_cipher.open(&nonce.0, &aad, &mut buf)?;

        Ok(buf)
    }
}
