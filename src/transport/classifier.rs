//! Maps SET response codes to the §7 error taxonomy, reusing the code-range
//! table already built for [`crate::core::codes`].

use crate::core::SetCodeCategory;

use super::error::ErrorKind;
use super::response::Response;

fn remediation(category: SetCodeCategory) -> &'static str {
    match category {
        SetCodeCategory::SigningCertificate => "check certificate validity and key material",
        SetCodeCategory::CdcStructure => "regenerate the CDC from corrected document fields",
        SetCodeCategory::Timbrado => "verify timbrado validity window and sequence",
        SetCodeCategory::IssuerRuc => "verify the issuer RUC and check digit",
        SetCodeCategory::Dates => "verify issuance and associated-document dates",
        SetCodeCategory::Amounts => "recheck totals coherence and amount formatting",
        SetCodeCategory::Communication => "retry; transient communication error",
        SetCodeCategory::ServerUnavailable => "retry; SET is temporarily unavailable",
        SetCodeCategory::RateLimitRuc => "wait for the per-RUC rate-limit window to reopen",
        SetCodeCategory::RateLimitIp => "wait for the per-IP rate-limit window to reopen",
        SetCodeCategory::Accepted => "none; document accepted",
        SetCodeCategory::Unknown => "consult SET documentation for this code",
    }
}

fn kind_for(category: SetCodeCategory) -> ErrorKind {
    match category {
        SetCodeCategory::SigningCertificate => ErrorKind::Signing,
        SetCodeCategory::CdcStructure
        | SetCodeCategory::Timbrado
        | SetCodeCategory::IssuerRuc
        | SetCodeCategory::Dates
        | SetCodeCategory::Amounts => ErrorKind::Validation,
        SetCodeCategory::Communication | SetCodeCategory::ServerUnavailable => ErrorKind::Transient,
        SetCodeCategory::RateLimitRuc | SetCodeCategory::RateLimitIp => ErrorKind::Throttle,
        SetCodeCategory::Accepted => ErrorKind::Observations,
        SetCodeCategory::Unknown => ErrorKind::Rejected,
    }
}

/// Classify a parsed [`Response`] into the §7 taxonomy, attaching the
/// attempt count, elapsed time, and correlation fingerprint the retry
/// manager and caller need.
pub fn classify(
    response: &Response,
    attempt: u32,
    elapsed_ms: u64,
    fingerprint: &str,
) -> super::error::ClassifiedError {
    let category = crate::core::classify(response.code);
    let kind = if response.success {
        ErrorKind::Observations
    } else {
        kind_for(category)
    };

    super::error::ClassifiedError {
        kind,
        set_code: Some(response.code),
        message: response.message.clone(),
        remediation: remediation(category).to_string(),
        attempt,
        elapsed_ms,
        fingerprint: fingerprint.to_string(),
    }
}
