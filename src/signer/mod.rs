//! Certificate loading, canonicalization, and XMLDSig signing (§4.6).

mod canonicalize;
mod error;
mod pkcs12;
mod xmldsig;

pub use canonicalize::canonicalize;
pub use error::SignerError;
pub use pkcs12::Keystore;
pub use xmldsig::{sign, verify, VerificationResult};
