use super::aead::AeadCipher;
use super::block::BlockCipher;
use super::null::NullCipher;
use super::stream::{StreamCipher, NULL_KEY_SIZE};
use super::RecordProtection;
use crate::crypto::Context;
use crate::types::{EncryptionAlgorithm, MacAlgorithm};
use crate::Error;

/// Build the record protection for a negotiated encryption and MAC algorithm.
///
/// The context must carry the negotiated version, the cipher suite (for the
/// PRF) and the master secret. AEAD algorithms ignore `mac_algorithm`.
pub fn create_cipher(
    ctx: &mut Context,
    encryption_algorithm: EncryptionAlgorithm,
    mac_algorithm: MacAlgorithm,
) -> Result<RecordProtection, Error> {
    debug!(
        "Create cipher {:?} with {:?} for {:?}",
        encryption_algorithm,
        mac_algorithm,
        ctx.entity()
    );

    let protection = match encryption_algorithm {
        EncryptionAlgorithm::Null => match mac_algorithm {
            MacAlgorithm::Null => RecordProtection::Null(NullCipher),
            mac => {
                check_hmac(mac)?;
                RecordProtection::Stream(StreamCipher::new(ctx, NULL_KEY_SIZE, mac)?)
            }
        },
        EncryptionAlgorithm::Rc4_128 => {
            check_hmac(mac_algorithm)?;
            RecordProtection::Stream(StreamCipher::new(ctx, 16, mac_algorithm)?)
        }
        EncryptionAlgorithm::Aes128Cbc => {
            check_hmac(mac_algorithm)?;
            RecordProtection::Block(Box::new(BlockCipher::new(ctx, 16, mac_algorithm)?))
        }
        EncryptionAlgorithm::Aes256Cbc => {
            check_hmac(mac_algorithm)?;
            RecordProtection::Block(Box::new(BlockCipher::new(ctx, 32, mac_algorithm)?))
        }
        EncryptionAlgorithm::Aes128Gcm => RecordProtection::Aead(AeadCipher::new(ctx, 16)?),
        EncryptionAlgorithm::Aes256Gcm => RecordProtection::Aead(AeadCipher::new(ctx, 32)?),
        EncryptionAlgorithm::Unknown(id) => {
            return Err(Error::internal_error(format!(
                "Unsupported encryption algorithm: {}",
                id
            )));
        }
    };

    Ok(protection)
}

fn check_hmac(mac_algorithm: MacAlgorithm) -> Result<(), Error> {
    match mac_algorithm {
        MacAlgorithm::HmacMd5
        | MacAlgorithm::HmacSha1
        | MacAlgorithm::HmacSha256
        | MacAlgorithm::HmacSha384 => Ok(()),
        other => Err(Error::internal_error(format!(
            "Unsupported MAC algorithm: {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Role;
    use crate::types::{AlertDescription, CipherSuite, ContentType, ProtocolVersion};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn context(role: Role, suite: CipherSuite, version: ProtocolVersion) -> Context {
        let mut ctx = Context::with_rng(role, [1; 32], [2; 32], StdRng::seed_from_u64(11));
        ctx.set_version(version);
        ctx.set_cipher_suite(suite);
        ctx.set_master_secret(&[0x33u8; 48]).unwrap();
        ctx
    }

    fn for_suite(role: Role, suite: CipherSuite, version: ProtocolVersion) -> RecordProtection {
        let mut ctx = context(role, suite, version);
        create_cipher(&mut ctx, suite.encryption_algorithm(), suite.mac_algorithm()).unwrap()
    }

    #[test]
    fn dispatch_table() {
        use CipherSuite::*;
        let v = ProtocolVersion::TLSv1_2;
        assert!(matches!(
            for_suite(Role::Client, TLS_NULL_WITH_NULL_NULL, v),
            RecordProtection::Null(_)
        ));
        assert!(matches!(
            for_suite(Role::Client, TLS_RSA_WITH_NULL_SHA256, v),
            RecordProtection::Stream(_)
        ));
        assert!(matches!(
            for_suite(Role::Client, TLS_RSA_WITH_RC4_128_SHA, v),
            RecordProtection::Stream(_)
        ));
        assert!(matches!(
            for_suite(Role::Client, TLS_RSA_WITH_AES_256_CBC_SHA256, v),
            RecordProtection::Block(_)
        ));
        assert!(matches!(
            for_suite(Role::Client, TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384, v),
            RecordProtection::Aead(_)
        ));
    }

    #[test]
    fn every_known_suite_talks_to_itself() {
        for suite in CipherSuite::all() {
            if suite.is_scsv() {
                continue;
            }
            let version = ProtocolVersion::TLSv1_2;
            let mut client = for_suite(Role::Client, *suite, version);
            let mut server = for_suite(Role::Server, *suite, version);

            let rec = client
                .encode_plaintext(7, ContentType::ApplicationData, b"round")
                .unwrap();
            let back = server
                .decode_ciphertext(7, ContentType::ApplicationData, &rec)
                .unwrap();
            assert_eq!(back, b"round", "{:?}", suite);
        }
    }

    #[test]
    fn aead_ignores_mac() {
        let mut ctx = context(
            Role::Server,
            CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256,
            ProtocolVersion::TLSv1_2,
        );
        let p = create_cipher(&mut ctx, EncryptionAlgorithm::Aes128Gcm, MacAlgorithm::Unknown(9));
        assert!(matches!(p, Ok(RecordProtection::Aead(_))));
    }

    #[test]
    fn unknown_algorithms_are_internal_errors() {
        let mut ctx = context(
            Role::Client,
            CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
            ProtocolVersion::TLSv1_2,
        );
        let err =
            create_cipher(&mut ctx, EncryptionAlgorithm::Unknown(42), MacAlgorithm::HmacSha1)
                .unwrap_err();
        assert_eq!(err.alert_description(), Some(AlertDescription::InternalError));

        let err = create_cipher(&mut ctx, EncryptionAlgorithm::Aes128Cbc, MacAlgorithm::Null)
            .unwrap_err();
        assert_eq!(err.alert_description(), Some(AlertDescription::InternalError));
    }

    #[test]
    fn gcm_below_tls12_fails() {
        let mut ctx = context(
            Role::Client,
            CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256,
            ProtocolVersion::TLSv1_0,
        );
        let err = create_cipher(&mut ctx, EncryptionAlgorithm::Aes128Gcm, MacAlgorithm::Null)
            .unwrap_err();
        assert_eq!(err.alert_description(), Some(AlertDescription::InternalError));
    }
}
