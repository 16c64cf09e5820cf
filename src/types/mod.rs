mod alert;
pub use alert::AlertDescription;

mod cipher_suite;
pub use cipher_suite::{CipherSuite, EncryptionAlgorithm, MacAlgorithm, PrfAlgorithm};

mod comp_meth;
pub use comp_meth::CompressionMethod;

mod ctype;
pub use ctype::ContentType;

mod version;
pub use version::ProtocolVersion;
