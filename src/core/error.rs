use thiserror::Error;

/// Errors that can occur while constructing or validating a document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// One or more validation rules failed; callers should consult
    /// [`crate::core::Document::validate`] for the structured list.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Builder encountered invalid or missing configuration.
    #[error("builder error: {0}")]
    Builder(String),

    /// RUC failed format or check-digit validation.
    #[error("invalid RUC: {0}")]
    Ruc(String),

    /// CDC failed format, decomposition, or check-digit validation.
    #[error("invalid CDC: {0}")]
    Cdc(String),

    /// Document totals or line arithmetic inconsistency.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),
}

/// The category of business rule a [`ValidationError`] belongs to.
///
/// Mirrors the invariant groups in the document model: format/structural
/// checks, cross-field coherence, and kind-specific sub-record checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ViolationKind {
    /// Document number, establishment, or expedition point format.
    DocumentNumber,
    /// Issuance timestamp out of the allowed window.
    IssuanceDate,
    /// Auto-invoice (AFE) issuer/receiver or foreign-seller record.
    AutoInvoice,
    /// Associated-document reference (NCE/NDE) missing or inconsistent.
    AssociatedDocument,
    /// Remission note (NRE) transport record.
    Transport,
    /// A single line item's quantity, price, or derived totals.
    LineItem,
    /// Document-level totals coherence.
    Totals,
    /// Amount precision or magnitude outside the allowed format.
    AmountFormat,
}

/// A single validation violation with a kind, field path, and message.
///
/// `validate()` never throws for data defects (§4.1): it always returns a
/// `Vec<ValidationError>`, empty when the document is admissible for
/// signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Which invariant group this violation belongs to.
    pub kind: ViolationKind,
    /// Dot-separated path to the invalid field (e.g. "lines[2].quantity").
    pub path: String,
    /// Human-readable description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}: {}", self.kind, self.path, self.message)
    }
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(kind: ViolationKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_path_and_message() {
        let err = ValidationError::new(ViolationKind::Totals, "totals.total_10", "mismatch");
        let rendered = err.to_string();
        assert!(rendered.contains("Totals"));
        assert!(rendered.contains("totals.total_10"));
        assert!(rendered.contains("mismatch"));
    }
}
