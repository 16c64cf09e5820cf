//! Cipher suite definitions and their algorithm breakdown.

use nom::number::complete::be_u16;
use nom::IResult;

use super::ProtocolVersion;

/// Bulk encryption algorithm of a cipher suite.
///
/// The numeric ids are the ones the cipher factory dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptionAlgorithm {
    Null,
    Rc4_128,
    Aes128Cbc,
    Aes256Cbc,
    Aes128Gcm,
    Aes256Gcm,
    Unknown(u8),
}

impl EncryptionAlgorithm {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => EncryptionAlgorithm::Null,
            2 => EncryptionAlgorithm::Rc4_128,
            8 => EncryptionAlgorithm::Aes128Cbc,
            9 => EncryptionAlgorithm::Aes256Cbc,
            10 => EncryptionAlgorithm::Aes128Gcm,
            11 => EncryptionAlgorithm::Aes256Gcm,
            _ => EncryptionAlgorithm::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            EncryptionAlgorithm::Null => 0,
            EncryptionAlgorithm::Rc4_128 => 2,
            EncryptionAlgorithm::Aes128Cbc => 8,
            EncryptionAlgorithm::Aes256Cbc => 9,
            EncryptionAlgorithm::Aes128Gcm => 10,
            EncryptionAlgorithm::Aes256Gcm => 11,
            EncryptionAlgorithm::Unknown(value) => *value,
        }
    }

    /// CBC mode, the only kind encrypt_then_mac applies to (RFC 7366).
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            EncryptionAlgorithm::Aes128Cbc | EncryptionAlgorithm::Aes256Cbc
        )
    }

    pub fn is_aead(&self) -> bool {
        matches!(
            self,
            EncryptionAlgorithm::Aes128Gcm | EncryptionAlgorithm::Aes256Gcm
        )
    }
}

/// Record MAC algorithm of a cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacAlgorithm {
    Null,
    HmacMd5,
    HmacSha1,
    HmacSha256,
    HmacSha384,
    Unknown(u8),
}

impl MacAlgorithm {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => MacAlgorithm::Null,
            1 => MacAlgorithm::HmacMd5,
            2 => MacAlgorithm::HmacSha1,
            3 => MacAlgorithm::HmacSha256,
            4 => MacAlgorithm::HmacSha384,
            _ => MacAlgorithm::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            MacAlgorithm::Null => 0,
            MacAlgorithm::HmacMd5 => 1,
            MacAlgorithm::HmacSha1 => 2,
            MacAlgorithm::HmacSha256 => 3,
            MacAlgorithm::HmacSha384 => 4,
            MacAlgorithm::Unknown(value) => *value,
        }
    }
}

/// Pseudo-random function used for the key schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrfAlgorithm {
    /// TLS 1.0 / 1.1: P_MD5 xor P_SHA1.
    Legacy,
    Sha256,
    Sha384,
}

macro_rules! cipher_suites {
    ($(
        $name:ident = $value:expr => ($enc:ident, $mac:ident, $ecc:expr, $tls12:expr)
    ),* $(,)?) => {
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum CipherSuite {
            $($name,)*
            Unknown(u16),
        }

        impl CipherSuite {
            pub fn from_u16(value: u16) -> Self {
                match value {
                    $($value => CipherSuite::$name,)*
                    _ => CipherSuite::Unknown(value),
                }
            }

            pub fn as_u16(&self) -> u16 {
                match self {
                    $(CipherSuite::$name => $value,)*
                    CipherSuite::Unknown(value) => *value,
                }
            }

            /// (encryption, mac, uses ECC, requires TLS 1.2)
            fn info(&self) -> Option<(EncryptionAlgorithm, MacAlgorithm, bool, bool)> {
                match self {
                    $(CipherSuite::$name => Some((
                        EncryptionAlgorithm::$enc,
                        MacAlgorithm::$mac,
                        $ecc,
                        $tls12,
                    )),)*
                    CipherSuite::Unknown(_) => None,
                }
            }

            /// Every suite this crate knows, in declaration order.
            pub fn all() -> &'static [CipherSuite] {
                &[$(CipherSuite::$name,)*]
            }
        }
    };
}

cipher_suites! {
    TLS_NULL_WITH_NULL_NULL = 0x0000 => (Null, Null, false, false),
    TLS_RSA_WITH_NULL_SHA = 0x0002 => (Null, HmacSha1, false, false),
    TLS_RSA_WITH_RC4_128_SHA = 0x0005 => (Rc4_128, HmacSha1, false, false),
    TLS_RSA_WITH_AES_128_CBC_SHA = 0x002F => (Aes128Cbc, HmacSha1, false, false),
    TLS_RSA_WITH_AES_256_CBC_SHA = 0x0035 => (Aes256Cbc, HmacSha1, false, false),
    TLS_RSA_WITH_NULL_SHA256 = 0x003B => (Null, HmacSha256, false, true),
    TLS_RSA_WITH_AES_128_CBC_SHA256 = 0x003C => (Aes128Cbc, HmacSha256, false, true),
    TLS_RSA_WITH_AES_256_CBC_SHA256 = 0x003D => (Aes256Cbc, HmacSha256, false, true),
    TLS_RSA_WITH_AES_128_GCM_SHA256 = 0x009C => (Aes128Gcm, Null, false, true),
    TLS_RSA_WITH_AES_256_GCM_SHA384 = 0x009D => (Aes256Gcm, Null, false, true),
    TLS_EMPTY_RENEGOTIATION_INFO_SCSV = 0x00FF => (Null, Null, false, false),
    TLS_ECDHE_ECDSA_WITH_RC4_128_SHA = 0xC007 => (Rc4_128, HmacSha1, true, false),
    TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA = 0xC009 => (Aes128Cbc, HmacSha1, true, false),
    TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA = 0xC00A => (Aes256Cbc, HmacSha1, true, false),
    TLS_ECDHE_RSA_WITH_RC4_128_SHA = 0xC011 => (Rc4_128, HmacSha1, true, false),
    TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA = 0xC013 => (Aes128Cbc, HmacSha1, true, false),
    TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA = 0xC014 => (Aes256Cbc, HmacSha1, true, false),
    TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256 = 0xC023 => (Aes128Cbc, HmacSha256, true, true),
    TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA384 = 0xC024 => (Aes256Cbc, HmacSha384, true, true),
    TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256 = 0xC027 => (Aes128Cbc, HmacSha256, true, true),
    TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384 = 0xC028 => (Aes256Cbc, HmacSha384, true, true),
    TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256 = 0xC02B => (Aes128Gcm, Null, true, true),
    TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384 = 0xC02C => (Aes256Gcm, Null, true, true),
    TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256 = 0xC02F => (Aes128Gcm, Null, true, true),
    TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384 = 0xC030 => (Aes256Gcm, Null, true, true),
}

impl CipherSuite {
    pub fn parse(input: &[u8]) -> IResult<&[u8], CipherSuite> {
        let (input, value) = be_u16(input)?;
        Ok((input, CipherSuite::from_u16(value)))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.as_u16().to_be_bytes());
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, CipherSuite::Unknown(_))
    }

    /// The signalling value for secure renegotiation. Never a real suite.
    pub fn is_scsv(&self) -> bool {
        *self == CipherSuite::TLS_EMPTY_RENEGOTIATION_INFO_SCSV
    }

    pub fn encryption_algorithm(&self) -> EncryptionAlgorithm {
        self.info()
            .map(|i| i.0)
            .unwrap_or(EncryptionAlgorithm::Unknown(0xFF))
    }

    pub fn mac_algorithm(&self) -> MacAlgorithm {
        self.info().map(|i| i.1).unwrap_or(MacAlgorithm::Unknown(0xFF))
    }

    /// Whether the suite uses an elliptic curve key exchange.
    pub fn is_ecc(&self) -> bool {
        self.info().map(|i| i.2).unwrap_or(false)
    }

    /// Oldest stream-family version this suite may be negotiated with.
    pub fn minimum_version(&self) -> ProtocolVersion {
        match self.info() {
            Some((_, _, _, true)) => ProtocolVersion::TLSv1_2,
            _ => ProtocolVersion::SSLv3,
        }
    }

    pub fn is_valid_for_version(&self, version: ProtocolVersion) -> bool {
        if self.is_unknown() || version.is_unknown() {
            return false;
        }
        if version.is_dtls() && self.encryption_algorithm() == EncryptionAlgorithm::Rc4_128 {
            return false;
        }
        self.minimum_version()
            .is_equal_or_earlier_version_of(version.equivalent_stream_version())
    }

    /// PRF selection for a negotiated version.
    pub fn prf_algorithm(&self, version: ProtocolVersion) -> PrfAlgorithm {
        let stream = version.equivalent_stream_version();
        if !ProtocolVersion::TLSv1_2.is_equal_or_earlier_version_of(stream) {
            return PrfAlgorithm::Legacy;
        }
        let name_ends_sha384 = matches!(
            self,
            CipherSuite::TLS_RSA_WITH_AES_256_GCM_SHA384
                | CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA384
                | CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384
                | CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384
                | CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384
        );
        if name_ends_sha384 {
            PrfAlgorithm::Sha384
        } else {
            PrfAlgorithm::Sha256
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values() {
        for suite in CipherSuite::all() {
            assert_eq!(CipherSuite::from_u16(suite.as_u16()), *suite);
        }
        assert_eq!(
            CipherSuite::from_u16(0xC02B),
            CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256
        );
        assert_eq!(CipherSuite::from_u16(0x1234), CipherSuite::Unknown(0x1234));
    }

    #[test]
    fn gcm_requires_tls12() {
        let s = CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256;
        assert!(!s.is_valid_for_version(ProtocolVersion::TLSv1_1));
        assert!(s.is_valid_for_version(ProtocolVersion::TLSv1_2));
        assert!(s.is_valid_for_version(ProtocolVersion::DTLSv1_2));
        assert!(!s.is_valid_for_version(ProtocolVersion::DTLSv1_0));
    }

    #[test]
    fn rc4_not_for_dtls() {
        let s = CipherSuite::TLS_RSA_WITH_RC4_128_SHA;
        assert!(s.is_valid_for_version(ProtocolVersion::TLSv1_0));
        assert!(!s.is_valid_for_version(ProtocolVersion::DTLSv1_0));
        assert!(!s.is_valid_for_version(ProtocolVersion::DTLSv1_2));
    }

    #[test]
    fn unknown_version_is_never_valid() {
        let s = CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA;
        assert!(!s.is_valid_for_version(ProtocolVersion::Unknown(0x0304)));
        assert!(!CipherSuite::Unknown(1).is_valid_for_version(ProtocolVersion::TLSv1_2));
    }

    #[test]
    fn prf_selection() {
        use ProtocolVersion::*;
        let gcm384 = CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384;
        let cbc = CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA;
        assert_eq!(gcm384.prf_algorithm(TLSv1_2), PrfAlgorithm::Sha384);
        assert_eq!(cbc.prf_algorithm(TLSv1_2), PrfAlgorithm::Sha256);
        assert_eq!(cbc.prf_algorithm(DTLSv1_2), PrfAlgorithm::Sha256);
        assert_eq!(cbc.prf_algorithm(TLSv1_1), PrfAlgorithm::Legacy);
        assert_eq!(cbc.prf_algorithm(DTLSv1_0), PrfAlgorithm::Legacy);
    }

    #[test]
    fn algorithm_breakdown() {
        let s = CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA384;
        assert_eq!(s.encryption_algorithm(), EncryptionAlgorithm::Aes256Cbc);
        assert_eq!(s.mac_algorithm(), MacAlgorithm::HmacSha384);
        assert!(s.is_ecc());
        assert!(!CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA.is_ecc());
        assert_eq!(EncryptionAlgorithm::from_u8(10), EncryptionAlgorithm::Aes128Gcm);
        assert_eq!(MacAlgorithm::HmacSha256.as_u8(), 3);
    }
}
