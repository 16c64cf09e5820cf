//! CBC block cipher records with HMAC, for TLS 1.0-1.2 and DTLS.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::mac::TlsMac;
use crate::crypto::engine::{AesCbc, HmacEngine, AES_BLOCK_SIZE};
use crate::crypto::{Context, Role};
use crate::types::{AlertDescription, ContentType, MacAlgorithm, ProtocolVersion};
use crate::Error;

const BLOCK_SIZE: usize = AES_BLOCK_SIZE;

/// Block cipher record protection.
///
/// TLS 1.1 and later (and every DTLS version) send a random explicit IV in
/// front of each record. TLS 1.0 chains the CBC state across records from
/// an IV taken out of the key block.
pub struct BlockCipher {
    version: ProtocolVersion,
    use_explicit_iv: bool,
    encrypt_then_mac: bool,
    write_cipher: AesCbc,
    read_cipher: AesCbc,
    write_iv: [u8; BLOCK_SIZE],
    read_iv: [u8; BLOCK_SIZE],
    write_mac: TlsMac,
    read_mac: TlsMac,
    random_data: [u8; 256],
    rng: StdRng,
}

impl std::fmt::Debug for BlockCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockCipher")
            .field("version", &self.version)
            .field("use_explicit_iv", &self.use_explicit_iv)
            .field("encrypt_then_mac", &self.encrypt_then_mac)
            .field("cipher", &self.write_cipher)
            .field("mac_size", &self.write_mac.size())
            .finish()
    }
}

impl BlockCipher {
    pub(crate) fn new(
        ctx: &mut Context,
        cipher_key_size: usize,
        mac_algorithm: MacAlgorithm,
    ) -> Result<Self, Error> {
        let version = ctx.version()?;
        let params = ctx.security_parameters();
        let encrypt_then_mac = params.encrypt_then_mac;
        let truncated = params.truncated_hmac;
        let use_explicit_iv =
            ProtocolVersion::TLSv1_1.is_equal_or_earlier_version_of(version.equivalent_stream_version());

        let mac_size = HmacEngine::output_size(mac_algorithm);
        let mut key_block_size = 2 * cipher_key_size + 2 * mac_size;
        // From TLS 1.1 onwards, block ciphers don't need client_write_IV
        if !use_explicit_iv {
            key_block_size += 2 * BLOCK_SIZE;
        }

        let key_block = ctx.calculate_key_block(key_block_size)?;
        let (client_mac_key, rest) = key_block.split_at(mac_size);
        let (server_mac_key, rest) = rest.split_at(mac_size);
        let (client_key, rest) = rest.split_at(cipher_key_size);
        let (server_key, rest) = rest.split_at(cipher_key_size);

        let client_mac = TlsMac::new(mac_algorithm, client_mac_key, version, truncated)?;
        let server_mac = TlsMac::new(mac_algorithm, server_mac_key, version, truncated)?;
        let client_cipher = AesCbc::new(client_key)?;
        let server_cipher = AesCbc::new(server_key)?;

        let mut client_iv = [0u8; BLOCK_SIZE];
        let mut server_iv = [0u8; BLOCK_SIZE];
        if !use_explicit_iv {
            client_iv.copy_from_slice(&rest[..BLOCK_SIZE]);
            server_iv.copy_from_slice(&rest[BLOCK_SIZE..2 * BLOCK_SIZE]);
        }

        let mut rng = StdRng::from_rng(ctx.rng())
            .map_err(|e| Error::internal_error(format!("Entropy source failed: {}", e)))?;
        let mut random_data = [0u8; 256];
        rng.fill_bytes(&mut random_data);

        let (write_mac, read_mac, write_cipher, read_cipher, write_iv, read_iv) = match ctx.entity()
        {
            Role::Server => (
                server_mac,
                client_mac,
                server_cipher,
                client_cipher,
                server_iv,
                client_iv,
            ),
            Role::Client => (
                client_mac,
                server_mac,
                client_cipher,
                server_cipher,
                client_iv,
                server_iv,
            ),
        };
        client_iv.zeroize();
        server_iv.zeroize();

        debug!(
            "Block cipher for {}: explicit IV {}, encrypt-then-MAC {}",
            version, use_explicit_iv, encrypt_then_mac
        );

        Ok(BlockCipher {
            version,
            use_explicit_iv,
            encrypt_then_mac,
            write_cipher,
            read_cipher,
            write_iv,
            read_iv,
            write_mac,
            read_mac,
            random_data,
            rng,
        })
    }

    pub fn plaintext_limit(&self, ciphertext_limit: usize) -> usize {
        let mac_size = self.write_mac.size();
        let mut limit = ciphertext_limit;

        // An explicit IV consumes 1 block
        if self.use_explicit_iv {
            limit = limit.saturating_sub(BLOCK_SIZE);
        }

        // Leave room for the MAC, and require block-alignment
        if self.encrypt_then_mac {
            limit = limit.saturating_sub(mac_size);
            limit -= limit % BLOCK_SIZE;
        } else {
            limit -= limit % BLOCK_SIZE;
            limit = limit.saturating_sub(mac_size);
        }

        // Minimum 1 byte of padding
        limit.saturating_sub(1)
    }

    pub fn encode_plaintext(
        &mut self,
        seq_no: u64,
        content_type: ContentType,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let mac_size = self.write_mac.size();

        let mut enc_input_length = plaintext.len();
        if !self.encrypt_then_mac {
            enc_input_length += mac_size;
        }

        let mut padding_length = BLOCK_SIZE - 1 - (enc_input_length % BLOCK_SIZE);
        if !self.version.is_dtls() {
            // Add a random number of extra blocks worth of padding
            let max_extra_pad_blocks = (255 - padding_length) / BLOCK_SIZE;
            padding_length += self.choose_extra_pad_blocks(max_extra_pad_blocks) * BLOCK_SIZE;
        }

        let mut total_size = plaintext.len() + mac_size + padding_length + 1;
        if self.use_explicit_iv {
            total_size += BLOCK_SIZE;
        }
        let mut out = Vec::with_capacity(total_size);

        let iv = if self.use_explicit_iv {
            let mut explicit_iv = [0u8; BLOCK_SIZE];
            self.rng.fill_bytes(&mut explicit_iv);
            out.extend_from_slice(&explicit_iv);
            explicit_iv
        } else {
            self.write_iv
        };

        let blocks_start = out.len();
        out.extend_from_slice(plaintext);

        if !self.encrypt_then_mac {
            let mac = self.write_mac.calculate(seq_no, content_type, plaintext);
            out.extend_from_slice(&mac);
        }

        out.resize(out.len() + padding_length + 1, padding_length as u8);

        let last = self.write_cipher.encrypt(&iv, &mut out[blocks_start..]);
        if !self.use_explicit_iv {
            self.write_iv = last;
        }

        if self.encrypt_then_mac {
            let mac = self.write_mac.calculate(seq_no, content_type, &out);
            out.extend_from_slice(&mac);
        }

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
        let len = ciphertext.len();

        let mut min_len = BLOCK_SIZE;
        if self.encrypt_then_mac {
            min_len += mac_size;
        } else {
            min_len = min_len.max(mac_size + 1);
        }
        if self.use_explicit_iv {
            min_len += BLOCK_SIZE;
        }

        if len < min_len {
            return Err(Error::decode_error(format!(
                "Block cipher record too short: {} < {}",
                len, min_len
            )));
        }

        let mut blocks_length = len;
        if self.encrypt_then_mac {
            blocks_length -= mac_size;
        }

        if blocks_length % BLOCK_SIZE != 0 {
            return Err(Error::alert(
                AlertDescription::DecryptionFailed,
                "Ciphertext not block aligned",
            ));
        }

        if self.encrypt_then_mac {
            let received = &ciphertext[len - mac_size..];
            let calculated = self
                .read_mac
                .calculate(seq_no, content_type, &ciphertext[..len - mac_size]);
            if !bool::from(calculated.as_slice().ct_eq(received)) {
                return Err(Error::BadRecordMac);
            }
        }

        let mut buf = ciphertext[..blocks_length].to_vec();
        let mut offset = 0;
        let iv = if self.use_explicit_iv {
            let mut explicit_iv = [0u8; BLOCK_SIZE];
            explicit_iv.copy_from_slice(&buf[..BLOCK_SIZE]);
            offset = BLOCK_SIZE;
            blocks_length -= BLOCK_SIZE;
            explicit_iv
        } else {
            self.read_iv
        };

        let last = self
            .read_cipher
            .decrypt(&iv, &mut buf[offset..offset + blocks_length]);
        if !self.use_explicit_iv {
            self.read_iv = last;
        }

        let blocks = &buf[offset..offset + blocks_length];
        let mac_in_blocks = if self.encrypt_then_mac { 0 } else { mac_size };

        // If there's anything wrong with the padding, this will return zero
        let total_pad = self.check_padding_constant_time(blocks, mac_in_blocks);

        let mut dec_output_length = blocks_length - total_pad;

        if !self.encrypt_then_mac {
            dec_output_length -= mac_size;
            let received = &blocks[dec_output_length..dec_output_length + mac_size];
            let calculated = self.read_mac.calculate_constant_time(
                seq_no,
                content_type,
                &blocks[..dec_output_length],
                blocks_length - mac_size,
                &self.random_data,
            );

            let bad_mac = !bool::from(calculated.as_slice().ct_eq(received));
            if bad_mac || total_pad == 0 {
                return Err(Error::BadRecordMac);
            }
        } else if total_pad == 0 {
            return Err(Error::BadRecordMac);
        }

        trace!(
            "Decoded {:?} record seq {}: {} -> {} bytes",
            content_type,
            seq_no,
            len,
            dec_output_length
        );

        Ok(blocks[..dec_output_length].to_vec())
    }

    /// Total padding length including the length byte, or 0 when the
    /// padding is malformed. Always inspects 256 bytes.
    fn check_padding_constant_time(&mut self, buf: &[u8], mac_size: usize) -> usize {
        let len = buf.len();
        let last_byte = buf[len - 1];
        let mut total_pad = last_byte as usize + 1;

        let mut dummy_index = 0;
        let mut pad_diff = 0u8;

        if mac_size + total_pad > len {
            total_pad = 0;
        } else {
            for b in &buf[len - total_pad..] {
                pad_diff |= b ^ last_byte;
            }
            dummy_index = total_pad;

            if pad_diff != 0 {
                total_pad = 0;
            }
        }

        // Run some extra dummy checks so the number of checks is always constant
        while dummy_index < self.random_data.len() {
            pad_diff |= self.random_data[dummy_index] ^ last_byte;
            dummy_index += 1;
        }
        self.random_data[0] ^= pad_diff;

        total_pad
    }

    fn choose_extra_pad_blocks(&mut self, max: usize) -> usize {
        let x = self.rng.next_u32();
        (x.trailing_zeros() as usize).min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Role;
    use crate::types::CipherSuite;

    fn pair(version: ProtocolVersion, etm: bool) -> (BlockCipher, BlockCipher) {
        let make = |role: Role, seed: u64| {
            let mut ctx = Context::with_rng(role, [1; 32], [2; 32], StdRng::seed_from_u64(seed));
            ctx.set_version(version);
            ctx.set_cipher_suite(CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA);
            ctx.set_encrypt_then_mac(etm);
            ctx.set_master_secret(&[7u8; 48]).unwrap();
            BlockCipher::new(&mut ctx, 16, MacAlgorithm::HmacSha1).unwrap()
        };
        (make(Role::Client, 1), make(Role::Server, 2))
    }

    #[test]
    fn client_to_server_all_versions() {
        use ProtocolVersion::*;
        for version in [TLSv1_0, TLSv1_1, TLSv1_2, DTLSv1_0, DTLSv1_2] {
            for etm in [false, true] {
                let (mut client, mut server) = pair(version, etm);
                for seq in 0..3u64 {
                    let msg = vec![seq as u8; 37 + seq as usize];
                    let rec = client
                        .encode_plaintext(seq, ContentType::ApplicationData, &msg)
                        .unwrap();
                    let back = server
                        .decode_ciphertext(seq, ContentType::ApplicationData, &rec)
                        .unwrap();
                    assert_eq!(back, msg, "{} etm={}", version, etm);
                }
            }
        }
    }

    #[test]
    fn explicit_iv_only_from_tls11() {
        let (c10, _) = pair(ProtocolVersion::TLSv1_0, false);
        let (c11, _) = pair(ProtocolVersion::TLSv1_1, false);
        let (d10, _) = pair(ProtocolVersion::DTLSv1_0, false);
        assert!(!c10.use_explicit_iv);
        assert!(c11.use_explicit_iv);
        assert!(d10.use_explicit_iv);
    }

    #[test]
    fn dtls_padding_is_minimal() {
        let (mut client, _) = pair(ProtocolVersion::DTLSv1_2, false);
        // 16 IV + 11 data + 20 MAC + 1 padding = 48
        let rec = client
            .encode_plaintext(0, ContentType::ApplicationData, &[0u8; 11])
            .unwrap();
        assert_eq!(rec.len(), 48);
    }

    #[test]
    fn tampered_record_is_bad_mac() {
        for etm in [false, true] {
            let (mut client, mut server) = pair(ProtocolVersion::TLSv1_2, etm);
            let mut rec = client
                .encode_plaintext(0, ContentType::ApplicationData, b"hello world")
                .unwrap();
            let n = rec.len();
            rec[n - 20] ^= 0x01;
            let err = server
                .decode_ciphertext(0, ContentType::ApplicationData, &rec)
                .unwrap_err();
            assert_eq!(err, Error::BadRecordMac);
        }
    }

    #[test]
    fn wrong_sequence_is_bad_mac() {
        let (mut client, mut server) = pair(ProtocolVersion::TLSv1_1, false);
        let rec = client
            .encode_plaintext(4, ContentType::ApplicationData, b"data")
            .unwrap();
        let err = server
            .decode_ciphertext(5, ContentType::ApplicationData, &rec)
            .unwrap_err();
        assert_eq!(err, Error::BadRecordMac);
    }

    #[test]
    fn short_and_misaligned() {
        let (_, mut server) = pair(ProtocolVersion::TLSv1_2, false);
        let err = server
            .decode_ciphertext(0, ContentType::ApplicationData, &[0u8; 20])
            .unwrap_err();
        assert_eq!(err.alert_description(), Some(AlertDescription::DecodeError));

        let err = server
            .decode_ciphertext(0, ContentType::ApplicationData, &[0u8; 40])
            .unwrap_err();
        assert_eq!(
            err.alert_description(),
            Some(AlertDescription::DecryptionFailed)
        );
    }

    #[test]
    fn plaintext_limit_fits() {
        let (mut client, mut server) = pair(ProtocolVersion::TLSv1_2, true);
        let limit = client.plaintext_limit(16384 + 2048);
        assert!(limit > 16000);

        let (mut dclient, _) = pair(ProtocolVersion::DTLSv1_2, false);
        let dlimit = dclient.plaintext_limit(100);
        let rec = dclient
            .encode_plaintext(0, ContentType::ApplicationData, &vec![1u8; dlimit])
            .unwrap();
        assert!(rec.len() <= 100);

        let rec = client
            .encode_plaintext(0, ContentType::ApplicationData, &vec![1u8; 100])
            .unwrap();
        assert!(server
            .decode_ciphertext(0, ContentType::ApplicationData, &rec)
            .is_ok());
    }

    #[test]
    fn ssl3_is_rejected() {
        let mut ctx = Context::with_rng(Role::Client, [1; 32], [2; 32], StdRng::seed_from_u64(0));
        ctx.set_version(ProtocolVersion::SSLv3);
        ctx.set_master_secret(&[7u8; 48]).unwrap();
        let err = BlockCipher::new(&mut ctx, 16, MacAlgorithm::HmacSha1).unwrap_err();
        assert_eq!(err.alert_description(), Some(AlertDescription::InternalError));
    }
}
