//! Top-level error type unifying every subsystem (§7, §10.2).
//!
//! Each compiled-in feature contributes one variant. Callers who only need
//! `core` never see `SignerError`/`TransportError` in their error type,
//! since the variants are feature-gated the same as the modules they wrap.

use thiserror::Error;

/// The union of every subsystem's error type, for callers who want a single
/// error to propagate with `?` across module boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SifenError {
    #[cfg(feature = "core")]
    #[error(transparent)]
    Core(#[from] crate::core::CoreError),

    #[cfg(feature = "xml")]
    #[error(transparent)]
    Xml(#[from] crate::xml::XmlError),

    #[cfg(feature = "xml")]
    #[error(transparent)]
    Mapper(#[from] crate::xml::MapperError),

    #[cfg(feature = "signer")]
    #[error(transparent)]
    Signer(#[from] crate::signer::SignerError),

    #[cfg(feature = "transport")]
    #[error(transparent)]
    Transport(#[from] crate::transport::ClassifiedError),
}
