//! TLS pseudo-random functions (RFC 2246 Section 5, RFC 5246 Section 5).

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha384};

use crate::types::PrfAlgorithm;
use crate::Error;

/// PRF(secret, label, seed) truncated to `output_len` bytes.
///
/// The seed is the seed data WITHOUT the label; the label is prepended here.
pub fn prf(
    algorithm: PrfAlgorithm,
    secret: &[u8],
    label: &str,
    seed: &[u8],
    output_len: usize,
) -> Result<Vec<u8>, Error> {
    let full_seed = compute_full_seed(label, seed)?;

    match algorithm {
        PrfAlgorithm::Legacy => prf_legacy(secret, &full_seed, output_len),
        PrfAlgorithm::Sha256 => p_hash::<Hmac<Sha256>>(secret, &full_seed, output_len),
        PrfAlgorithm::Sha384 => p_hash::<Hmac<Sha384>>(secret, &full_seed, output_len),
    }
}

fn compute_full_seed(label: &str, seed: &[u8]) -> Result<Vec<u8>, Error> {
    if !label.is_ascii() {
        return Err(Error::InvalidArgument(format!(
            "PRF label must be ASCII: {:?}",
            label
        )));
    }
    let mut full_seed = Vec::with_capacity(label.len() + seed.len());
    full_seed.extend_from_slice(label.as_bytes());
    full_seed.extend_from_slice(seed);
    Ok(full_seed)
}

/// TLS 1.0/1.1: P_MD5(S1, seed) XOR P_SHA1(S2, seed).
///
/// S1 and S2 are the two halves of the secret, sharing the middle byte
/// when the length is odd.
fn prf_legacy(secret: &[u8], full_seed: &[u8], output_len: usize) -> Result<Vec<u8>, Error> {
    let s_half = (secret.len() + 1) / 2;
    let s1 = &secret[..s_half];
    let s2 = &secret[secret.len() - s_half..];

    let mut out = p_hash::<Hmac<Md5>>(s1, full_seed, output_len)?;
    let sha = p_hash::<Hmac<Sha1>>(s2, full_seed, output_len)?;
    for (o, s) in out.iter_mut().zip(sha.iter()) {
        *o ^= s;
    }
    Ok(out)
}

/// P_hash as defined in RFC 5246 Section 5.
pub(crate) fn p_hash<M>(secret: &[u8], full_seed: &[u8], output_len: usize) -> Result<Vec<u8>, Error>
where
    M: Mac + KeyInit + Clone,
{
    let key = <M as KeyInit>::new_from_slice(secret)
        .map_err(|_| Error::internal_error("Invalid HMAC key length"))?;

    let mut out = Vec::with_capacity(output_len);

    // A(1) = HMAC_hash(secret, A(0)) where A(0) = seed
    let mut a = key.clone().chain_update(full_seed).finalize().into_bytes();

    while out.len() < output_len {
        // HMAC_hash(secret, A(i) + seed)
        let output = key
            .clone()
            .chain_update(&a)
            .chain_update(full_seed)
            .finalize()
            .into_bytes();

        let to_copy = std::cmp::min(output_len - out.len(), output.len());
        out.extend_from_slice(&output[..to_copy]);

        if out.len() < output_len {
            // A(i+1) = HMAC_hash(secret, A(i))
            a = key.clone().chain_update(&a).finalize().into_bytes();
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls12_sha256_known_answer() {
        let secret = [
            0x9b, 0xbe, 0x43, 0x6b, 0xa9, 0x40, 0xf0, 0x17, 0xb1, 0x76, 0x52, 0x84, 0x9a, 0x71,
            0xdb, 0x35,
        ];
        let seed = [
            0xa0, 0xba, 0x9f, 0x93, 0x6c, 0xda, 0x31, 0x18, 0x27, 0xa6, 0xf7, 0x96, 0xff, 0xd5,
            0x19, 0x8c,
        ];
        let expected_prefix = [
            0xe3, 0xf2, 0x29, 0xba, 0x72, 0x7b, 0xe1, 0x7b, 0x8d, 0x12, 0x26, 0x20, 0x55, 0x7c,
            0xd4, 0x53,
        ];

        let out = prf(PrfAlgorithm::Sha256, &secret, "test label", &seed, 100).unwrap();
        assert_eq!(out.len(), 100);
        assert_eq!(&out[..16], &expected_prefix);
    }

    #[test]
    fn output_is_prefix_stable() {
        for alg in [PrfAlgorithm::Legacy, PrfAlgorithm::Sha256, PrfAlgorithm::Sha384] {
            let long = prf(alg, b"secret", "label", b"seed", 150).unwrap();
            let short = prf(alg, b"secret", "label", b"seed", 13).unwrap();
            assert_eq!(long.len(), 150);
            assert_eq!(&long[..13], &short[..]);
        }
    }

    #[test]
    fn legacy_is_md5_xor_sha1_over_halves() {
        // Odd length: the middle byte is shared by both halves
        let secret = [1u8, 2, 3, 4, 5];
        let out = prf(PrfAlgorithm::Legacy, &secret, "lbl", b"sd", 40).unwrap();

        let md5 = p_hash::<Hmac<Md5>>(&secret[..3], b"lblsd", 40).unwrap();
        let sha = p_hash::<Hmac<Sha1>>(&secret[2..], b"lblsd", 40).unwrap();
        let expected: Vec<u8> = md5.iter().zip(sha.iter()).map(|(a, b)| a ^ b).collect();

        assert_eq!(out, expected);
    }

    #[test]
    fn algorithms_differ() {
        let a = prf(PrfAlgorithm::Sha256, b"k", "l", b"s", 32).unwrap();
        let b = prf(PrfAlgorithm::Sha384, b"k", "l", b"s", 32).unwrap();
        let c = prf(PrfAlgorithm::Legacy, b"k", "l", b"s", 32).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn non_ascii_label_rejected() {
        assert!(matches!(
            prf(PrfAlgorithm::Sha256, b"k", "läbel", b"s", 8),
            Err(Error::InvalidArgument(_))
        ));
    }
}
