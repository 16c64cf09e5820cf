//! Thin wrappers over the RustCrypto primitives the record layer uses.
//!
//! Every wrapper is an enum over the concrete key sizes / digests so that
//! the record protection code stays monomorphic.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, InnerIvInit, KeyInit};
use aes::{Aes128, Aes256, Block};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::AeadInPlace;
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use hmac::{Hmac, Mac};
use md5::Md5;
use rc4::consts::U16;
use rc4::{Rc4, StreamCipher};
use sha1::Sha1;
use sha2::{Sha256, Sha384};

use crate::types::MacAlgorithm;
use crate::Error;

pub(crate) const AES_BLOCK_SIZE: usize = 16;

/// AES in CBC mode.
///
/// Holds the expanded key only. Each call starts a fresh `cbc` chain from
/// the IV it is given.
pub(crate) enum AesCbc {
    Aes128(Box<Aes128>),
    Aes256(Box<Aes256>),
}

impl std::fmt::Debug for AesCbc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AesCbc::Aes128(_) => f.debug_tuple("AesCbc::Aes128").finish(),
            AesCbc::Aes256(_) => f.debug_tuple("AesCbc::Aes256").finish(),
        }
    }
}

impl AesCbc {
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        match key.len() {
            16 => Aes128::new_from_slice(key)
                .map(|c| AesCbc::Aes128(Box::new(c)))
                .map_err(|_| Error::internal_error("Bad AES-128 key")),
            32 => Aes256::new_from_slice(key)
                .map(|c| AesCbc::Aes256(Box::new(c)))
                .map_err(|_| Error::internal_error("Bad AES-256 key")),
            n => Err(Error::internal_error(format!("Invalid AES key size: {}", n))),
        }
    }

    /// Encrypt block-aligned `data` in place, chaining from `iv`.
    ///
    /// Returns the last ciphertext block, the IV for a continued chain.
    pub fn encrypt(&self, iv: &[u8; AES_BLOCK_SIZE], data: &mut [u8]) -> [u8; AES_BLOCK_SIZE] {
        let iv_block = Block::from_slice(iv);
        match self {
            AesCbc::Aes128(c) => {
                let enc = cbc::Encryptor::<Aes128>::inner_iv_init((**c).clone(), iv_block);
                encrypt_blocks(enc, data)
            }
            AesCbc::Aes256(c) => {
                let enc = cbc::Encryptor::<Aes256>::inner_iv_init((**c).clone(), iv_block);
                encrypt_blocks(enc, data)
            }
        }
        last_block(iv, data)
    }

    /// Decrypt block-aligned `data` in place, chaining from `iv`.
    ///
    /// Returns the last ciphertext block, the IV for a continued chain.
    pub fn decrypt(&self, iv: &[u8; AES_BLOCK_SIZE], data: &mut [u8]) -> [u8; AES_BLOCK_SIZE] {
        let next_iv = last_block(iv, data);
        let iv_block = Block::from_slice(iv);
        match self {
            AesCbc::Aes128(c) => {
                let dec = cbc::Decryptor::<Aes128>::inner_iv_init((**c).clone(), iv_block);
                decrypt_blocks(dec, data)
            }
            AesCbc::Aes256(c) => {
                let dec = cbc::Decryptor::<Aes256>::inner_iv_init((**c).clone(), iv_block);
                decrypt_blocks(dec, data)
            }
        }
        next_iv
    }
}

fn encrypt_blocks<E: BlockEncryptMut<BlockSize = U16>>(mut enc: E, data: &mut [u8]) {
    for chunk in data.chunks_exact_mut(AES_BLOCK_SIZE) {
        enc.encrypt_block_mut(Block::from_mut_slice(chunk));
    }
}

fn decrypt_blocks<D: BlockDecryptMut<BlockSize = U16>>(mut dec: D, data: &mut [u8]) {
    for chunk in data.chunks_exact_mut(AES_BLOCK_SIZE) {
        dec.decrypt_block_mut(Block::from_mut_slice(chunk));
    }
}

/// Last whole block of `data`, or `iv` when there is none.
fn last_block(iv: &[u8; AES_BLOCK_SIZE], data: &[u8]) -> [u8; AES_BLOCK_SIZE] {
    let whole = data.len() - data.len() % AES_BLOCK_SIZE;
    let mut out = *iv;
    if whole > 0 {
        out.copy_from_slice(&data[whole - AES_BLOCK_SIZE..whole]);
    }
    out
}

/// Keystream cipher for the stream+MAC records.
pub(crate) enum StreamEngine {
    Null,
    Rc4(Box<Rc4<U16>>),
}

impl std::fmt::Debug for StreamEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamEngine::Null => f.debug_tuple("StreamEngine::Null").finish(),
            StreamEngine::Rc4(_) => f.debug_tuple("StreamEngine::Rc4").finish(),
        }
    }
}

impl StreamEngine {
    pub fn rc4(key: &[u8]) -> Result<Self, Error> {
        Rc4::<U16>::new_from_slice(key)
            .map(|c| StreamEngine::Rc4(Box::new(c)))
            .map_err(|_| Error::internal_error(format!("Invalid RC4 key size: {}", key.len())))
    }

    pub fn apply(&mut self, data: &mut [u8]) {
        match self {
            StreamEngine::Null => {}
            StreamEngine::Rc4(c) => c.apply_keystream(data),
        }
    }
}

/// AES-GCM with a 16 byte tag.
pub(crate) enum AesGcm {
    Aes128(Box<Aes128Gcm>),
    Aes256(Box<Aes256Gcm>),
}

impl std::fmt::Debug for AesGcm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AesGcm::Aes128(_) => f.debug_tuple("AesGcm::Aes128").finish(),
            AesGcm::Aes256(_) => f.debug_tuple("AesGcm::Aes256").finish(),
        }
    }
}

impl AesGcm {
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        match key.len() {
            16 => Ok(AesGcm::Aes128(Box::new(Aes128Gcm::new(
                GenericArray::from_slice(key),
            )))),
            32 => Ok(AesGcm::Aes256(Box::new(Aes256Gcm::new(
                GenericArray::from_slice(key),
            )))),
            n => Err(Error::internal_error(format!(
                "Invalid key size for AES-GCM: {}",
                n
            ))),
        }
    }

    /// Encrypt in place and append the tag.
    pub fn seal(&self, nonce: &[u8; 12], aad: &[u8], data: &mut Vec<u8>) -> Result<(), Error> {
        let nonce = GenericArray::from_slice(nonce);
        let res = match self {
            AesGcm::Aes128(c) => c.encrypt_in_place(nonce, aad, data),
            AesGcm::Aes256(c) => c.encrypt_in_place(nonce, aad, data),
        };
        res.map_err(|_| Error::internal_error("AES-GCM encryption failed"))
    }

    /// Verify the trailing tag and decrypt in place, removing the tag.
    pub fn open(&self, nonce: &[u8; 12], aad: &[u8], data: &mut Vec<u8>) -> Result<(), Error> {
        let nonce = GenericArray::from_slice(nonce);
        let res = match self {
            AesGcm::Aes128(c) => c.decrypt_in_place(nonce, aad, data),
            AesGcm::Aes256(c) => c.decrypt_in_place(nonce, aad, data),
        };
        res.map_err(|_| Error::BadRecordMac)
    }
}

/// Keyed HMAC over one of the record MAC digests.
///
/// The keyed state is kept and cloned for every computation.
#[derive(Clone)]
pub(crate) enum HmacEngine {
    Md5(Hmac<Md5>),
    Sha1(Hmac<Sha1>),
    Sha256(Hmac<Sha256>),
    Sha384(Hmac<Sha384>),
}

impl std::fmt::Debug for HmacEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HmacEngine::Md5(_) => "HmacEngine::Md5",
            HmacEngine::Sha1(_) => "HmacEngine::Sha1",
            HmacEngine::Sha256(_) => "HmacEngine::Sha256",
            HmacEngine::Sha384(_) => "HmacEngine::Sha384",
        };
        f.debug_tuple(name).finish()
    }
}

macro_rules! keyed {
    ($variant:ident, $digest:ty, $key:expr) => {
        <Hmac<$digest> as Mac>::new_from_slice($key)
            .map(HmacEngine::$variant)
            .map_err(|_| Error::internal_error("Invalid HMAC key"))
    };
}

impl HmacEngine {
    pub fn new(algorithm: MacAlgorithm, key: &[u8]) -> Result<Self, Error> {
        match algorithm {
            MacAlgorithm::HmacMd5 => keyed!(Md5, Md5, key),
            MacAlgorithm::HmacSha1 => keyed!(Sha1, Sha1, key),
            MacAlgorithm::HmacSha256 => keyed!(Sha256, Sha256, key),
            MacAlgorithm::HmacSha384 => keyed!(Sha384, Sha384, key),
            other => Err(Error::internal_error(format!(
                "No HMAC for {:?}",
                other
            ))),
        }
    }

    /// Digest output length for a MAC algorithm, 0 for none.
    pub fn output_size(algorithm: MacAlgorithm) -> usize {
        match algorithm {
            MacAlgorithm::HmacMd5 => 16,
            MacAlgorithm::HmacSha1 => 20,
            MacAlgorithm::HmacSha256 => 32,
            MacAlgorithm::HmacSha384 => 48,
            _ => 0,
        }
    }

    /// Internal block size of the digest compression function.
    pub fn block_size(&self) -> usize {
        match self {
            HmacEngine::Sha384(_) => 128,
            _ => 64,
        }
    }

    /// Length of the padding-length field in the digest's final block.
    pub fn length_field_size(&self) -> usize {
        match self {
            HmacEngine::Sha384(_) => 16,
            _ => 8,
        }
    }

    pub fn compute(&self, parts: &[&[u8]]) -> Vec<u8> {
        match self {
            HmacEngine::Md5(m) => finish(m.clone(), parts),
            HmacEngine::Sha1(m) => finish(m.clone(), parts),
            HmacEngine::Sha256(m) => finish(m.clone(), parts),
            HmacEngine::Sha384(m) => finish(m.clone(), parts),
        }
    }

    /// Run the digest over `data` and throw the result away.
    pub fn burn(&self, data: &[u8]) {
        let _ = self.compute(&[data]);
    }
}

fn finish<M: Mac>(mut mac: M, parts: &[&[u8]]) -> Vec<u8> {
    for p in parts {
        mac.update(p);
    }
    mac.finalize().into_bytes().to_vec()
}
