use openssl::pkey::{PKey, Private};
use openssl::x509::X509;

use super::error::SignerError;

/// A loaded end-entity certificate and its private key, extracted from a
/// PKCS#12 keystore (§4.6).
pub struct Keystore {
    pub certificate: X509,
    pub private_key: PKey<Private>,
}

impl Keystore {
    /// Parse a DER-encoded PKCS#12 blob with the given passphrase.
    pub fn load(der_bytes: &[u8], passphrase: &str) -> Result<Self, SignerError> {
        let pkcs12 = openssl::pkcs12::Pkcs12::from_der(der_bytes)
            .map_err(|e| SignerError::KeystoreParse(e.to_string()))?;
        let parsed = pkcs12
            .parse2(passphrase)
            .map_err(|_| SignerError::BadPassphrase)?;

        let certificate = parsed.cert.ok_or_else(|| {
            SignerError::KeystoreParse("keystore has no end-entity certificate".into())
        })?;
        let private_key = parsed
            .pkey
            .ok_or_else(|| SignerError::KeystoreParse("keystore has no private key".into()))?;

        ensure_key_matches_certificate(&certificate, &private_key)?;

        Ok(Self {
            certificate,
            private_key,
        })
    }

    /// Certificate subject distinguished name, as presented in `verify()`.
    pub fn subject(&self) -> String {
        self.certificate
            .subject_name()
            .entries()
            .filter_map(|entry| entry.data().as_utf8().ok().map(|s| s.to_string()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// RFC-2822-ish textual expiry, matching what OpenSSL prints for
    /// `notAfter`.
    pub fn not_after(&self) -> String {
        self.certificate.not_after().to_string()
    }

    /// Whether the certificate's `notAfter` has already passed.
    pub fn is_expired(&self) -> bool {
        self.certificate.not_after() < openssl::asn1::Asn1Time::days_from_now(0).unwrap().as_ref()
    }
}

fn ensure_key_matches_certificate(
    certificate: &X509,
    private_key: &PKey<Private>,
) -> Result<(), SignerError> {
    let cert_public = certificate
        .public_key()
        .map_err(|e| SignerError::KeystoreParse(e.to_string()))?;
    if cert_public.public_eq(private_key) {
        Ok(())
    } else {
        Err(SignerError::KeyCertMismatch)
    }
}
