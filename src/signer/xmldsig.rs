//! XMLDSig enveloped-signature production and verification (§4.6).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use openssl::hash::MessageDigest;
use openssl::sign::{Signer, Verifier};

use super::canonicalize::canonicalize;
use super::error::SignerError;
use super::pkcs12::Keystore;

const SIGNATURE_XMLNS: &str = "http://www.w3.org/2000/09/xmldsig#";
const C14N_ALGORITHM: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
const SIGNATURE_ALGORITHM: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
const DIGEST_ALGORITHM: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
const ENVELOPED_TRANSFORM: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

/// Result of [`verify`].
#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub valid: bool,
    pub subject: String,
    pub not_after: String,
}

/// Sign `xml` with `keystore`, returning the document with a `<Signature>`
/// element appended as the last child of the root.
///
/// Refuses to sign with an expired certificate (§4.6 failure modes).
pub fn sign(xml: &str, keystore: &Keystore) -> Result<String, SignerError> {
    if keystore.is_expired() {
        return Err(SignerError::CertificateExpired {
            not_after: keystore.not_after(),
        });
    }

    let canonical_document = canonicalize(xml)?;
    let digest = openssl::hash::hash(MessageDigest::sha256(), &canonical_document)
        .map_err(|e| SignerError::Signing(e.to_string()))?;
    let digest_b64 = BASE64.encode(digest);

    let signed_info = build_signed_info(&digest_b64);
    let canonical_signed_info = canonicalize(&signed_info)?;

    let mut signer = Signer::new(MessageDigest::sha256(), &keystore.private_key)
        .map_err(|e| SignerError::Signing(e.to_string()))?;
    signer
        .update(&canonical_signed_info)
        .map_err(|e| SignerError::Signing(e.to_string()))?;
    let signature = signer
        .sign_to_vec()
        .map_err(|e| SignerError::Signing(e.to_string()))?;
    let signature_b64 = BASE64.encode(signature);

    let cert_der = keystore
        .certificate
        .to_der()
        .map_err(|e| SignerError::Signing(e.to_string()))?;
    let cert_b64 = BASE64.encode(cert_der);

    let signature_element = format!(
        "<Signature xmlns=\"{SIGNATURE_XMLNS}\">{signed_info}\
         <SignatureValue>{signature_b64}</SignatureValue>\
         <KeyInfo><X509Data><X509Certificate>{cert_b64}</X509Certificate></X509Data></KeyInfo>\
         </Signature>"
    );

    insert_before_root_close(xml, &signature_element)
}

/// Verify a previously-signed document's `<Signature>` element against the
/// embedded certificate, and report the certificate's subject and expiry.
pub fn verify(signed_xml: &str) -> Result<VerificationResult, SignerError> {
    let signature_value = extract_element(signed_xml, "SignatureValue")?;
    let cert_b64 = extract_element(signed_xml, "X509Certificate")?;
    let signed_info = extract_signed_info(signed_xml)?;

    let cert_der = BASE64
        .decode(cert_b64.trim())
        .map_err(|e| SignerError::Verification(e.to_string()))?;
    let certificate = openssl::x509::X509::from_der(&cert_der)
        .map_err(|e| SignerError::Verification(e.to_string()))?;
    let public_key = certificate
        .public_key()
        .map_err(|e| SignerError::Verification(e.to_string()))?;

    let signature = BASE64
        .decode(signature_value.trim())
        .map_err(|e| SignerError::Verification(e.to_string()))?;
    let canonical_signed_info = canonicalize(&signed_info)?;

    let mut verifier = Verifier::new(MessageDigest::sha256(), &public_key)
        .map_err(|e| SignerError::Verification(e.to_string()))?;
    verifier
        .update(&canonical_signed_info)
        .map_err(|e| SignerError::Verification(e.to_string()))?;
    let valid = verifier
        .verify(&signature)
        .map_err(|e| SignerError::Verification(e.to_string()))?;

    let subject = certificate
        .subject_name()
        .entries()
        .filter_map(|entry| entry.data().as_utf8().ok().map(|s| s.to_string()))
        .collect::<Vec<_>>()
        .join(", ");
    let not_after = certificate.not_after().to_string();

    Ok(VerificationResult {
        valid,
        subject,
        not_after,
    })
}

fn build_signed_info(digest_b64: &str) -> String {
    format!(
        "<SignedInfo>\
         <CanonicalizationMethod Algorithm=\"{C14N_ALGORITHM}\"/>\
         <SignatureMethod Algorithm=\"{SIGNATURE_ALGORITHM}\"/>\
         <Reference URI=\"\">\
         <Transforms><Transform Algorithm=\"{ENVELOPED_TRANSFORM}\"/></Transforms>\
         <DigestMethod Algorithm=\"{DIGEST_ALGORITHM}\"/>\
         <DigestValue>{digest_b64}</DigestValue>\
         </Reference>\
         </SignedInfo>"
    )
}

/// Insert `fragment` as the last child before the outermost element's
/// closing tag. Assumes a single well-formed root, which is all the
/// assembler and mapper ever hand to the signer.
fn insert_before_root_close(xml: &str, fragment: &str) -> Result<String, SignerError> {
    let last_close = xml
        .rfind("</")
        .ok_or_else(|| SignerError::XmlParse("no closing tag found in document".into()))?;
    let mut out = String::with_capacity(xml.len() + fragment.len());
    out.push_str(&xml[..last_close]);
    out.push_str(fragment);
    out.push_str(&xml[last_close..]);
    Ok(out)
}

fn extract_element(xml: &str, name: &str) -> Result<String, SignerError> {
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    let start = xml
        .find(&open)
        .ok_or_else(|| SignerError::Verification(format!("missing <{name}>")))?
        + open.len();
    let end = xml[start..]
        .find(&close)
        .ok_or_else(|| SignerError::Verification(format!("unterminated <{name}>")))?
        + start;
    Ok(xml[start..end].to_string())
}

fn extract_signed_info(xml: &str) -> Result<String, SignerError> {
    let start = xml
        .find("<SignedInfo>")
        .ok_or_else(|| SignerError::Verification("missing <SignedInfo>".into()))?;
    let end = xml
        .find("</SignedInfo>")
        .ok_or_else(|| SignerError::Verification("unterminated <SignedInfo>".into()))?
        + "</SignedInfo>".len();
    Ok(xml[start..end].to_string())
}
