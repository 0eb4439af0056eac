//! SET response code classification table (§4.8).
//!
//! Maps the numeric codes SIFEN returns in a response envelope to a
//! category that the transport layer's error classifier and retry manager
//! act on. This module only knows the table; it carries no retry logic of
//! its own.

/// Category a SET response code falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SetCodeCategory {
    /// 0141-0149: signing/certificate problem, never retried.
    SigningCertificate,
    /// 1000-1099: CDC structure, never retried.
    CdcStructure,
    /// 1100-1199: timbrado, never retried.
    Timbrado,
    /// 1250-1299: issuer RUC, never retried.
    IssuerRuc,
    /// 1400-1499: dates, never retried.
    Dates,
    /// 1500-1599: amounts, never retried.
    Amounts,
    /// 4000-4999: communication, retried with backoff.
    Communication,
    /// 5000-5001: server/unavailable, retried.
    ServerUnavailable,
    /// 5002: per-RUC rate limit, retried after waiting for the local bucket.
    RateLimitRuc,
    /// 5003: per-IP rate limit, retried after waiting for the local bucket.
    RateLimitIp,
    /// 0260: accepted.
    Accepted,
    /// Any code outside the known ranges.
    Unknown,
}

impl SetCodeCategory {
    /// Whether this category is a validation-style failure: permanent,
    /// never retried, and caused by document content rather than transport.
    pub fn is_validation_failure(self) -> bool {
        matches!(
            self,
            SetCodeCategory::CdcStructure
                | SetCodeCategory::Timbrado
                | SetCodeCategory::IssuerRuc
                | SetCodeCategory::Dates
                | SetCodeCategory::Amounts
        )
    }

    /// Whether the retry manager should retry a response in this category.
    pub fn is_retriable(self) -> bool {
        matches!(
            self,
            SetCodeCategory::Communication
                | SetCodeCategory::ServerUnavailable
                | SetCodeCategory::RateLimitRuc
                | SetCodeCategory::RateLimitIp
        )
    }

    /// Whether this category represents a rate-limit throttle rather than a
    /// generic transient failure.
    pub fn is_throttle(self) -> bool {
        matches!(
            self,
            SetCodeCategory::RateLimitRuc | SetCodeCategory::RateLimitIp
        )
    }
}

/// Classify a SET response code per the §4.8 table.
pub fn classify(code: u32) -> SetCodeCategory {
    match code {
        141..=149 => SetCodeCategory::SigningCertificate,
        1000..=1099 => SetCodeCategory::CdcStructure,
        1100..=1199 => SetCodeCategory::Timbrado,
        1250..=1299 => SetCodeCategory::IssuerRuc,
        1400..=1499 => SetCodeCategory::Dates,
        1500..=1599 => SetCodeCategory::Amounts,
        4000..=4999 => SetCodeCategory::Communication,
        5000..=5001 => SetCodeCategory::ServerUnavailable,
        5002 => SetCodeCategory::RateLimitRuc,
        5003 => SetCodeCategory::RateLimitIp,
        260 => SetCodeCategory::Accepted,
        _ => SetCodeCategory::Unknown,
    }
}
