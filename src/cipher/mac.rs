//! Record MAC (RFC 5246 Section 6.2.3.1).

use crate::crypto::engine::HmacEngine;
use crate::types::{ContentType, MacAlgorithm, ProtocolVersion};
use crate::Error;

/// Output length of a truncated HMAC (RFC 6066 Section 7).
pub const TRUNCATED_HMAC_LEN: usize = 10;

/// HMAC over seq_num + type + version + length + fragment.
#[derive(Debug, Clone)]
pub struct TlsMac {
    engine: HmacEngine,
    version: ProtocolVersion,
    size: usize,
}

impl TlsMac {
    pub fn new(
        algorithm: MacAlgorithm,
        key: &[u8],
        version: ProtocolVersion,
        truncated: bool,
    ) -> Result<Self, Error> {
        let engine = HmacEngine::new(algorithm, key)?;
        let full = HmacEngine::output_size(algorithm);
        let size = if truncated {
            TRUNCATED_HMAC_LEN.min(full)
        } else {
            full
        };
        Ok(TlsMac {
            engine,
            version,
            size,
        })
    }

    /// Bytes this MAC adds to a record.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn calculate(&self, seq_no: u64, content_type: ContentType, message: &[u8]) -> Vec<u8> {
        let header = header(seq_no, content_type, self.version, message.len());
        let mut mac = self.engine.compute(&[&header, message]);
        mac.truncate(self.size);
        mac
    }

    /// Like [`TlsMac::calculate`] but does the same amount of digest work
    /// whatever the real message length is within `full_length`.
    ///
    /// Extra compression-function blocks are fed from `dummy_data`. This
    /// removes the timing difference a bad padding length would otherwise
    /// cause in the MAC computation.
    pub fn calculate_constant_time(
        &self,
        seq_no: u64,
        content_type: ContentType,
        message: &[u8],
        full_length: usize,
        dummy_data: &[u8],
    ) -> Vec<u8> {
        let mac = self.calculate(seq_no, content_type, message);

        let header_length = HEADER_LEN;
        let extra = self
            .digest_block_count(header_length + full_length)
            .saturating_sub(self.digest_block_count(header_length + message.len()));

        let block_size = self.engine.block_size();
        let mut remaining = extra * block_size + 1;
        while remaining > 0 {
            let take = remaining.min(dummy_data.len());
            if take == 0 {
                break;
            }
            self.engine.burn(&dummy_data[..take]);
            remaining -= take;
        }

        mac
    }

    fn digest_block_count(&self, input_length: usize) -> usize {
        (input_length + self.engine.length_field_size()) / self.engine.block_size()
    }
}

const HEADER_LEN: usize = 13;

fn header(
    seq_no: u64,
    content_type: ContentType,
    version: ProtocolVersion,
    length: usize,
) -> [u8; HEADER_LEN] {
    let mut h = [0u8; HEADER_LEN];
    h[..8].copy_from_slice(&seq_no.to_be_bytes());
    h[8] = content_type.as_u8();
    h[9..11].copy_from_slice(&version.as_u16().to_be_bytes());
    h[11..13].copy_from_slice(&(length as u16).to_be_bytes());
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::{Hmac, Mac};
    use sha1::Sha1;

    #[test]
    fn mac_input_layout() {
        let mac = TlsMac::new(
            MacAlgorithm::HmacSha1,
            b"key",
            ProtocolVersion::TLSv1_2,
            false,
        )
        .unwrap();
        let out = mac.calculate(0x0102, ContentType::ApplicationData, b"hi");

        let mut h = <Hmac<Sha1> as Mac>::new_from_slice(b"key").unwrap();
        h.update(&[0, 0, 0, 0, 0, 0, 0x01, 0x02, 23, 0x03, 0x03, 0x00, 0x02]);
        h.update(b"hi");
        assert_eq!(out, h.finalize().into_bytes().to_vec());
        assert_eq!(mac.size(), 20);
    }

    #[test]
    fn truncated_is_prefix() {
        let full = TlsMac::new(MacAlgorithm::HmacSha256, b"k", ProtocolVersion::TLSv1_1, false)
            .unwrap();
        let short = TlsMac::new(MacAlgorithm::HmacSha256, b"k", ProtocolVersion::TLSv1_1, true)
            .unwrap();
        assert_eq!(short.size(), TRUNCATED_HMAC_LEN);

        let a = full.calculate(5, ContentType::Handshake, b"data");
        let b = short.calculate(5, ContentType::Handshake, b"data");
        assert_eq!(&a[..10], &b[..]);
    }

    #[test]
    fn constant_time_matches_plain() {
        let mac = TlsMac::new(MacAlgorithm::HmacSha384, b"k", ProtocolVersion::TLSv1_2, false)
            .unwrap();
        let dummy = [0xAAu8; 256];
        let a = mac.calculate(9, ContentType::Alert, b"abc");
        let b = mac.calculate_constant_time(9, ContentType::Alert, b"abc", 300, &dummy);
        assert_eq!(a, b);
    }

    #[test]
    fn sequence_and_type_matter() {
        let mac = TlsMac::new(MacAlgorithm::HmacMd5, b"k", ProtocolVersion::TLSv1_0, false)
            .unwrap();
        let base = mac.calculate(1, ContentType::ApplicationData, b"x");
        assert_ne!(base, mac.calculate(2, ContentType::ApplicationData, b"x"));
        assert_ne!(base, mac.calculate(1, ContentType::Handshake, b"x"));
    }
}
