//! TLS and DTLS parameter negotiation, record protection and session
//! resumption.
//!
//! A [`ClientNegotiator`] builds a [`ClientOffer`] and checks the
//! [`ServerSelection`] that a [`ServerNegotiator`] answers with. Both sides
//! end up with the same [`Negotiated`] outcome, which a [`Context`] turns into
//! keys and [`ConnectionState::from_negotiated`] into record protection.
//! Completed handshakes can be kept in a [`TlsSession`] for resumption.
//!
//! Transport, handshake framing and key exchange are left to the caller.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

#[macro_use]
extern crate log;

pub mod cipher;
pub mod crypto;
pub mod message;
pub mod negotiation;
pub mod types;

mod client;
mod config;
mod error;
mod server;
mod session;
mod state;
mod window;

pub use cipher::{create_cipher, RecordProtection};
pub use client::ClientNegotiator;
pub use config::{Config, ConfigBuilder};
pub use crypto::{Context, Role, SecurityParameters};
pub use error::Error;
pub use negotiation::{ClientOffer, Negotiated, ServerSelection};
pub use server::ServerNegotiator;
pub use session::{SessionParameters, SessionParametersBuilder, TlsSession};
pub use state::{ConnectionState, MAX_PLAINTEXT_FRAGMENT};
pub use types::{
    AlertDescription, CipherSuite, CompressionMethod, ContentType, EncryptionAlgorithm,
    MacAlgorithm, ProtocolVersion,
};
