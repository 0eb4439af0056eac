//! Hybrid Validator (§4.5): runs modular (structural/business) validation
//! alongside a lightweight check of the official XML shape and reports
//! where the two disagree.

use std::collections::BTreeSet;

use crate::core::{validate as validate_modular, Document, ValidationError};

use super::assembly::to_modular_xml;
use super::error::MapperError;
use super::mapper::modular_to_official;

/// The set of paths flagged only by modular validation, only by official
/// shape inspection, or by both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffReport {
    pub modular_only: BTreeSet<String>,
    pub official_only: BTreeSet<String>,
    pub common: BTreeSet<String>,
}

impl DiffReport {
    /// No disagreement and nothing flagged on either side.
    pub fn is_clean(&self) -> bool {
        self.modular_only.is_empty() && self.official_only.is_empty() && self.common.is_empty()
    }

    /// Whether production-mode gating (official compliance) would block
    /// submission.
    pub fn blocks_production(&self) -> bool {
        !self.official_only.is_empty() || !self.common.is_empty()
    }

    /// Whether development-mode gating (modular compliance) would block
    /// submission.
    pub fn blocks_development(&self) -> bool {
        !self.modular_only.is_empty() || !self.common.is_empty()
    }
}

/// Required top-level groups under the official `rDE` root, used for a
/// lightweight structural check — this is not a full XSD validator, just
/// enough to surface divergence between the two shapes for the diff report.
const OFFICIAL_REQUIRED_GROUPS: &[&str] = &["gTimb", "gOpeDE", "gDtipDE"];

fn official_missing_groups(official_xml: &str) -> BTreeSet<String> {
    OFFICIAL_REQUIRED_GROUPS
        .iter()
        .filter(|group| !official_xml.contains(&format!("<{group}>")))
        .map(|group| format!("/rDE/{group}"))
        .collect()
}

fn path_for(error: &ValidationError) -> String {
    format!("/rDE/{}", error.path)
}

/// Run both validations and produce the divergence report for `doc`.
pub fn hybrid_validate(doc: &Document) -> Result<DiffReport, MapperError> {
    let modular_errors: BTreeSet<String> =
        validate_modular(doc).iter().map(path_for).collect();

    let modular_xml = to_modular_xml(doc, &"0".repeat(44)).map_err(MapperError::Xml)?;
    let official_xml = modular_to_official(&modular_xml)?;
    let official_errors = official_missing_groups(&official_xml);

    let common: BTreeSet<String> = modular_errors.intersection(&official_errors).cloned().collect();
    let modular_only: BTreeSet<String> =
        modular_errors.difference(&official_errors).cloned().collect();
    let official_only: BTreeSet<String> =
        official_errors.difference(&modular_errors).cloned().collect();

    Ok(DiffReport {
        modular_only,
        official_only,
        common,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn valid_doc() -> Document {
        let issuer = PartyBuilder::new(Ruc::new("80000001", 7).unwrap(), "Acme SA").build();
        let receiver = PartyBuilder::new(Ruc::new("80000002", 4).unwrap(), "Cliente").build();
        let line = LineItemBuilder::new("ITEM-1", "Widget", dec!(1), "77", dec!(1000)).build();

        DocumentBuilder::new()
            .issuer(issuer)
            .receiver(receiver)
            .add_line(line)
            .timbrado(TimbradoRef {
                numero: "12345678".into(),
                establecimiento: "001".into(),
                punto_expedicion: "001".into(),
            })
            .numero_documento("0000001")
            .issuance(
                NaiveDate::from_ymd_opt(2025, 1, 15)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
            )
            .security_code("000123456")
            .build_invoice()
            .unwrap()
    }

    #[test]
    fn clean_document_has_no_divergence() {
        let report = hybrid_validate(&valid_doc()).unwrap();
        assert!(report.is_clean());
        assert!(!report.blocks_production());
        assert!(!report.blocks_development());
    }
}
