//! Stream cipher records: RC4 or NULL encryption with an HMAC.

use subtle::ConstantTimeEq;

use super::mac::TlsMac;
use crate::crypto::engine::{HmacEngine, StreamEngine};
use crate::crypto::{Context, Role};
use crate::types::{ContentType, MacAlgorithm};
use crate::Error;

/// Cipher with no key at all. Only the MAC protects the record.
pub(crate) const NULL_KEY_SIZE: usize = 0;

/// Stream cipher record protection.
///
/// The MAC is computed over the plaintext and encrypted along with it.
#[derive(Debug)]
pub struct StreamCipher {
    write_cipher: StreamEngine,
    read_cipher: StreamEngine,
    write_mac: TlsMac,
    read_mac: TlsMac,
}

impl StreamCipher {
    pub(crate) fn new(
        ctx: &mut Context,
        cipher_key_size: usize,
        mac_algorithm: MacAlgorithm,
    ) -> Result<Self, Error> {
        let version = ctx.version()?;
        let truncated = ctx.security_parameters().truncated_hmac;

        let mac_size = HmacEngine::output_size(mac_algorithm);
        let key_block_size = 2 * cipher_key_size + 2 * mac_size;

        let key_block = ctx.calculate_key_block(key_block_size)?;
        let (client_mac_key, rest) = key_block.split_at(mac_size);
        let (server_mac_key, rest) = rest.split_at(mac_size);
        let (client_key, server_key) = rest.split_at(cipher_key_size);

        let client_mac = TlsMac::new(mac_algorithm, client_mac_key, version, truncated)?;
        let server_mac = TlsMac::new(mac_algorithm, server_mac_key, version, truncated)?;

        let engine = |key: &[u8]| {
            if cipher_key_size == NULL_KEY_SIZE {
                Ok(StreamEngine::Null)
            } else {
                StreamEngine::rc4(key)
            }
        };
        let client_cipher = engine(client_key)?;
        let server_cipher = engine(server_key)?;

        debug!(
            "Stream cipher for {}: {:?}, {} byte MAC",
            version,
            client_cipher,
            client_mac.size()
        );

        let (write_cipher, read_cipher, write_mac, read_mac) = match ctx.entity() {
            Role::Server => (server_cipher, client_cipher, server_mac, client_mac),
            Role::Client => (client_cipher, server_cipher, client_mac, server_mac),
        };

        Ok(StreamCipher {
            write_cipher,
            read_cipher,
            write_mac,
            read_mac,
        })
    }

    pub fn plaintext_limit(&self, ciphertext_limit: usize) -> usize {
        ciphertext_limit.saturating_sub(self.write_mac.size())
    }

    pub fn encode_plaintext(
        &mut self,
        seq_no: u64,
        content_type: ContentType,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let mac = self.write_mac.calculate(seq_no, content_type, plaintext);

        let mut out = Vec::with_capacity(plaintext.len() + mac.len());
        out.extend_from_slice(plaintext);
        out.extend_from_slice(&mac);
        self.write_cipher.apply(&mut out);

        trace!(
            "Encoded {:?} record seq {}: {} -> {} bytes",
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
        let mac_size = self.read_mac.size();
        if ciphertext.len() < mac_size {
            return Err(Error::decode_error(format!(
                "Stream cipher record shorter than MAC: {} < {}",
                ciphertext.len(),
                mac_size
            )));
        }

        let mut buf = ciphertext.to_vec();
        self.read_cipher.apply(&mut buf);

        let plaintext_len = buf.len() - mac_size;
        let (plaintext, received) = buf.split_at(plaintext_len);
        let calculated = self.read_mac.calculate(seq_no, content_type, plaintext);

        if !bool::from(calculated.as_slice().ct_eq(received)) {
            return Err(Error::BadRecordMac);
        }

        buf.truncate(plaintext_len);
        Ok(buf)
    }
}
