//! Typed codecs for the extensions that take part in negotiation.
//!
//! Each codec reads and writes the extension *data*. The type and length
//! framing lives in [`Extensions`](super::Extensions).

pub mod ec_point_formats;
pub mod max_fragment_length;
pub mod renegotiation_info;
pub mod signature_algorithms;
pub mod supported_groups;

pub use ec_point_formats::{ECPointFormat, ECPointFormatsExtension};
pub use max_fragment_length::MaxFragmentLength;
pub use renegotiation_info::RenegotiationInfoExtension;
pub use signature_algorithms::SignatureAlgorithmsExtension;
pub use supported_groups::SupportedGroupsExtension;

use super::{ExtensionType, Extensions};
use crate::Error;

/// Add an extension with empty data, such as encrypt_then_mac.
pub fn add_empty(extensions: &mut Extensions, extension_type: ExtensionType) {
    extensions.insert(extension_type, Vec::new());
}

/// Whether an empty-data extension is present.
///
/// Present with data is an illegal parameter.
pub fn has_empty(extensions: &Extensions, extension_type: ExtensionType) -> Result<bool, Error> {
    match extensions.get(extension_type) {
        None => Ok(false),
        Some([]) => Ok(true),
        Some(_) => Err(Error::illegal_parameter(format!(
            "{:?} extension must be empty",
            extension_type
        ))),
    }
}

pub fn add_encrypt_then_mac(extensions: &mut Extensions) {
    add_empty(extensions, ExtensionType::EncryptThenMac);
}

pub fn has_encrypt_then_mac(extensions: &Extensions) -> Result<bool, Error> {
    has_empty(extensions, ExtensionType::EncryptThenMac)
}

pub fn add_truncated_hmac(extensions: &mut Extensions) {
    add_empty(extensions, ExtensionType::TruncatedHmac);
}

pub fn has_truncated_hmac(extensions: &Extensions) -> Result<bool, Error> {
    has_empty(extensions, ExtensionType::TruncatedHmac)
}
