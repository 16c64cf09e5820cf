use crate::types::ContentType;
use crate::Error;

/// Pass-through protection for TLS_NULL_WITH_NULL_NULL.
///
/// This is what records travel under before the first ChangeCipherSpec.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCipher;

impl NullCipher {
    pub fn plaintext_limit(&self, ciphertext_limit: usize) -> usize {
        ciphertext_limit
    }

    pub fn encode_plaintext(
        &mut self,
        _seq_no: u64,
        _content_type: ContentType,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, Error> {
        Ok(plaintext.to_vec())
    }

    pub fn decode_ciphertext(
        &mut self,
        _seq_no: u64,
        _content_type: ContentType,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, Error> {
        Ok(ciphertext.to_vec())
    }
}
