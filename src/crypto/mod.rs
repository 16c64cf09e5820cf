//! Key schedule and the cryptographic engines the record layer is built on.

mod context;
pub(crate) mod engine;
pub mod prf;

pub use context::{Context, Role, SecurityParameters, MASTER_SECRET_LEN, VERIFY_DATA_LEN};
pub use prf::prf;
