//! Client and server negotiating over the hello encoding, then exchanging
//! protected records.


use negotiation_common::*;
use tlsweave::message::extensions::MaxFragmentLength;
use tlsweave::{
    AlertDescription, CipherSuite, Config, ConnectionState, ContentType, ProtocolVersion, Role,
};

fn exchange(client: &mut ConnectionState, server: &mut ConnectionState) {
    for i in 0..4u8 {
        let data = vec![i; 100 + i as usize];
        let rec = client.encode(ContentType::ApplicationData, &data).unwrap();
        assert_eq!(server.decode(ContentType::ApplicationData, &rec).unwrap(), data);

        let rec = server.encode(ContentType::ApplicationData, &data).unwrap();
        assert_eq!(client.decode(ContentType::ApplicationData, &rec).unwrap(), data);
    }
}

#[test]
fn default_configs_agree() {
    let _ = env_logger::try_init();

    let mut c = client(Config::default());
    let s = server(Config::default());
    let outcome = negotiate(&mut c, &s, None).unwrap();

    assert_eq!(outcome.client.version, ProtocolVersion::TLSv1_2);
    assert_eq!(
        outcome.client.cipher_suite,
        CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256
    );
    assert_eq!(outcome.client.cipher_suite, outcome.server.cipher_suite);
    assert_eq!(outcome.client.session_id, outcome.server.session_id);
    assert!(outcome.client.secure_renegotiation);
    assert!(outcome.server.secure_renegotiation);
    // Not for AEAD suites
    assert!(!outcome.client.encrypt_then_mac);
    assert!(!outcome.client.resumed);

    let mut cctx = full_handshake_context(Role::Client, &outcome);
    let mut sctx = full_handshake_context(Role::Server, &outcome);
    let (mut cs, mut ss) = connection_states(&mut cctx, &mut sctx, &outcome);
    exchange(&mut cs, &mut ss);
}

#[test]
fn every_default_suite_at_every_version() {
    let _ = env_logger::try_init();

    let versions = [
        ProtocolVersion::TLSv1_0,
        ProtocolVersion::TLSv1_1,
        ProtocolVersion::TLSv1_2,
    ];

    for suite in Config::default().cipher_suites() {
        for version in versions {
            let config = Config::builder()
                .versions(ProtocolVersion::TLSv1_0, version)
                .cipher_suites(&[*suite])
                .build()
                .unwrap();

            let mut c = client(config.clone());
            let s = server(config);
            let result = negotiate(&mut c, &s, None);

            if !suite.is_valid_for_version(version) {
                let err = result.err().unwrap();
                assert_eq!(
                    err.alert_description(),
                    Some(AlertDescription::HandshakeFailure),
                    "{:?} {}",
                    suite,
                    version
                );
                continue;
            }

            let outcome = result.unwrap();
            assert_eq!(outcome.client.version, version);
            assert_eq!(outcome.client.encrypt_then_mac, suite.encryption_algorithm().is_block());

            let mut cctx = full_handshake_context(Role::Client, &outcome);
            let mut sctx = full_handshake_context(Role::Server, &outcome);
            let (mut cs, mut ss) = connection_states(&mut cctx, &mut sctx, &outcome);
            exchange(&mut cs, &mut ss);
        }
    }
}

#[test]
fn rc4_and_null_mac_suites() {
    let _ = env_logger::try_init();

    for suite in [
        CipherSuite::TLS_RSA_WITH_RC4_128_SHA,
        CipherSuite::TLS_ECDHE_RSA_WITH_RC4_128_SHA,
        CipherSuite::TLS_RSA_WITH_NULL_SHA,
    ] {
        let config = Config::builder().cipher_suites(&[suite]).build().unwrap();
        let mut c = client(config.clone());
        let s = server(config);
        let outcome = negotiate(&mut c, &s, None).unwrap();
        assert_eq!(outcome.client.cipher_suite, suite);
        assert!(!outcome.client.encrypt_then_mac);

        let mut cctx = full_handshake_context(Role::Client, &outcome);
        let mut sctx = full_handshake_context(Role::Server, &outcome);
        let (mut cs, mut ss) = connection_states(&mut cctx, &mut sctx, &outcome);
        exchange(&mut cs, &mut ss);
    }
}

#[test]
fn mac_then_encrypt_when_server_declines() {
    let suites = [CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA];
    let mut c = client(Config::builder().cipher_suites(&suites).build().unwrap());
    let s = server(
        Config::builder()
            .cipher_suites(&suites)
            .allow_encrypt_then_mac(false)
            .build()
            .unwrap(),
    );
    let outcome = negotiate(&mut c, &s, None).unwrap();
    assert!(!outcome.client.encrypt_then_mac);
    assert!(!outcome.server.encrypt_then_mac);

    let mut cctx = full_handshake_context(Role::Client, &outcome);
    let mut sctx = full_handshake_context(Role::Server, &outcome);
    let (mut cs, mut ss) = connection_states(&mut cctx, &mut sctx, &outcome);
    exchange(&mut cs, &mut ss);
}

#[test]
fn truncated_hmac_and_max_fragment_length() {
    let _ = env_logger::try_init();

    let suites = [CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA];
    let mut c = client(
        Config::builder()
            .cipher_suites(&suites)
            .allow_truncated_hmac(true)
            .max_fragment_length(Some(MaxFragmentLength::Pow2_10))
            .build()
            .unwrap(),
    );
    let s = server(
        Config::builder()
            .cipher_suites(&suites)
            .allow_truncated_hmac(true)
            .build()
            .unwrap(),
    );

    let outcome = negotiate(&mut c, &s, None).unwrap();
    assert!(outcome.client.truncated_hmac);
    assert!(outcome.server.truncated_hmac);
    assert_eq!(
        outcome.client.max_fragment_length,
        Some(MaxFragmentLength::Pow2_10)
    );
    assert_eq!(outcome.server.max_plaintext_fragment(), 1024);

    let mut cctx = full_handshake_context(Role::Client, &outcome);
    let mut sctx = full_handshake_context(Role::Server, &outcome);
    let (mut cs, mut ss) = connection_states(&mut cctx, &mut sctx, &outcome);
    exchange(&mut cs, &mut ss);

    assert!(cs.encode(ContentType::ApplicationData, &[0; 1025]).is_err());
    let rec = cs.encode(ContentType::ApplicationData, &[7; 1024]).unwrap();
    assert_eq!(ss.decode(ContentType::ApplicationData, &rec).unwrap(), vec![7; 1024]);
}

#[test]
fn older_client_gets_its_version() {
    let mut c = client(
        Config::builder()
            .versions(ProtocolVersion::TLSv1_0, ProtocolVersion::TLSv1_1)
            .build()
            .unwrap(),
    );
    let s = server(Config::default());
    let outcome = negotiate(&mut c, &s, None).unwrap();

    assert_eq!(outcome.client.version, ProtocolVersion::TLSv1_1);
    // GCM and SHA256 suites need TLS 1.2
    assert_eq!(
        outcome.client.cipher_suite,
        CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA
    );
    // Offers below TLS 1.2 carry no signature_algorithms
    let offer = c.offer().unwrap();
    assert!(!offer
        .extensions
        .contains(tlsweave::message::ExtensionType::SignatureAlgorithms));
}

#[test]
fn version_and_suite_failures() {
    let mut c = client(
        Config::builder()
            .versions(ProtocolVersion::TLSv1_0, ProtocolVersion::TLSv1_1)
            .build()
            .unwrap(),
    );
    let s = server(
        Config::builder()
            .versions(ProtocolVersion::TLSv1_2, ProtocolVersion::TLSv1_2)
            .build()
            .unwrap(),
    );
    let err = negotiate(&mut c, &s, None).err().unwrap();
    assert_eq!(err.alert_description(), Some(AlertDescription::ProtocolVersion));

    let mut c = client(
        Config::builder()
            .cipher_suites(&[CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA])
            .build()
            .unwrap(),
    );
    let s = server(
        Config::builder()
            .cipher_suites(&[CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA])
            .build()
            .unwrap(),
    );
    let err = negotiate(&mut c, &s, None).err().unwrap();
    assert_eq!(err.alert_description(), Some(AlertDescription::HandshakeFailure));
}

#[test]
fn both_sides_derive_the_same_secrets() {
    let mut c = client(Config::default());
    let s = server(Config::default());
    let outcome = negotiate(&mut c, &s, None).unwrap();

    let cctx = full_handshake_context(Role::Client, &outcome);
    let sctx = full_handshake_context(Role::Server, &outcome);

    let hash = [0x99; 32];
    assert_eq!(
        cctx.calculate_verify_data("client finished", &hash).unwrap(),
        sctx.calculate_verify_data("client finished", &hash).unwrap()
    );
    assert_ne!(
        cctx.calculate_verify_data("client finished", &hash).unwrap(),
        cctx.calculate_verify_data("server finished", &hash).unwrap()
    );

    let a = cctx
        .export_keying_material("EXTRACTOR-dtls_srtp", None, 60)
        .unwrap();
    let b = sctx
        .export_keying_material("EXTRACTOR-dtls_srtp", None, 60)
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 60);

    let with_context = cctx
        .export_keying_material("EXTRACTOR-dtls_srtp", Some(b"ctx"), 60)
        .unwrap();
    assert_ne!(a, with_context);
}
