use thiserror::Error;

/// Distinct signing-error categories (§4.6) — kept separate rather than a
/// single opaque variant so callers can decide what is retriable (none of
/// these are) versus what needs operator attention (expired certs, bad
/// passphrases) versus what is a caller bug (malformed XML).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SignerError {
    #[error("PKCS#12 keystore could not be parsed: {0}")]
    KeystoreParse(String),

    #[error("PKCS#12 passphrase rejected")]
    BadPassphrase,

    #[error("certificate expired at {not_after}")]
    CertificateExpired { not_after: String },

    #[error("private key does not match the certificate's public key")]
    KeyCertMismatch,

    #[error("XML canonicalization failed: {0}")]
    Canonicalization(String),

    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("signature computation failed: {0}")]
    Signing(String),

    #[error("signature verification failed: {0}")]
    Verification(String),
}
