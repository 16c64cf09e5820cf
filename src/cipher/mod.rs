//! Record protection: the per-record encryption and authentication built
//! from a negotiated cipher suite.

mod aead;
mod block;
mod factory;
mod mac;
mod null;
mod stream;

pub use aead::AeadCipher;
pub use block::BlockCipher;
pub use factory::create_cipher;
pub use mac::{TlsMac, TRUNCATED_HMAC_LEN};
pub use null::NullCipher;
pub use stream::StreamCipher;

use crate::types::ContentType;
use crate::Error;

/// The record protection strategies.
///
/// Each variant owns independent read and write keys for its direction.
#[derive(Debug)]
pub enum RecordProtection {
    /// No protection, before the first ChangeCipherSpec.
    Null(NullCipher),
    /// CBC block cipher with HMAC.
    Block(Box<BlockCipher>),
    /// RC4 or NULL encryption with HMAC.
    Stream(StreamCipher),
    /// AES-GCM.
    Aead(AeadCipher),
}

impl RecordProtection {
    /// Largest plaintext that encodes into at most `ciphertext_limit` bytes.
    ///
    /// A limit smaller than the per-record overhead gives 0, not a negative
    /// size. Nothing fits then, not even an empty fragment.
    pub fn plaintext_limit(&self, ciphertext_limit: usize) -> usize {
        match self {
            RecordProtection::Null(c) => c.plaintext_limit(ciphertext_limit),
            RecordProtection::Block(c) => c.plaintext_limit(ciphertext_limit),
            RecordProtection::Stream(c) => c.plaintext_limit(ciphertext_limit),
            RecordProtection::Aead(c) => c.plaintext_limit(ciphertext_limit),
        }
    }

    /// Protect one record fragment.
    pub fn encode_plaintext(
        &mut self,
        seq_no: u64,
        content_type: ContentType,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, Error> {
        match self {
            RecordProtection::Null(c) => c.encode_plaintext(seq_no, content_type, plaintext),
            RecordProtection::Block(c) => c.encode_plaintext(seq_no, content_type, plaintext),
            RecordProtection::Stream(c) => c.encode_plaintext(seq_no, content_type, plaintext),
            RecordProtection::Aead(c) => c.encode_plaintext(seq_no, content_type, plaintext),
        }
    }

    /// Authenticate and decrypt one record fragment.
    pub fn decode_ciphertext(
        &mut self,
        seq_no: u64,
        content_type: ContentType,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, Error> {
        match self {
            RecordProtection::Null(c) => c.decode_ciphertext(seq_no, content_type, ciphertext),
            RecordProtection::Block(c) => c.decode_ciphertext(seq_no, content_type, ciphertext),
            RecordProtection::Stream(c) => c.decode_ciphertext(seq_no, content_type, ciphertext),
            RecordProtection::Aead(c) => c.decode_ciphertext(seq_no, content_type, ciphertext),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RecordProtection::Null(_))
    }
}
