//! CDC (Código de Control) generation, validation, and decomposition (§4.2).
//!
//! A CDC is exactly 44 decimal digits: issuer RUC (8) + issuer DV (1) +
//! document kind (2) + establishment (3) + expedition point (3) + document
//! number (7) + issuance date YYYYMMDD (8) + emission type (1) + security
//! code (9) + CDC check digit (1). The check digit uses the same
//! "less than 2 → 0" rule as the RUC, but with factors cycling 2..7 over the
//! 43-digit prefix rather than the RUC's fixed 8-factor table.
//!
//! Decomposition is a total function (§4.2): any 44-digit numeric string
//! parses into components. Only the check digit and field-range predicates
//! can fail.

use chrono::NaiveDate;

use super::error::CoreError;
use super::types::DocumentKind;

pub const CDC_LEN: usize = 44;

/// Whether the document was issued online (`Normal`) or recorded for later
/// submission (`Contingency`, §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionType {
    Normal,
    Contingency,
}

impl EmissionType {
    pub fn digit(self) -> u8 {
        match self {
            EmissionType::Normal => 1,
            EmissionType::Contingency => 2,
        }
    }

    pub fn from_digit(d: u8) -> Result<Self, CoreError> {
        match d {
            1 => Ok(EmissionType::Normal),
            2 => Ok(EmissionType::Contingency),
            other => Err(CoreError::Cdc(format!("unknown emission type {other}"))),
        }
    }
}

/// Inputs required to generate a CDC (§4.2).
#[derive(Debug, Clone)]
pub struct CdcGenerationRequest {
    pub ruc_base: String,
    pub ruc_dv: u8,
    pub kind: DocumentKind,
    pub establecimiento: String,
    pub punto_expedicion: String,
    pub numero_documento: String,
    pub fecha_emision: NaiveDate,
    pub emission_type: EmissionType,
    /// 9-digit security code, already formatted with leading zeros.
    pub security_code: String,
}

/// The 44-digit CDC decomposed back into its positional fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdcComponents {
    pub ruc_base: String,
    pub ruc_dv: u8,
    pub kind: DocumentKind,
    pub establecimiento: String,
    pub punto_expedicion: String,
    pub numero_documento: String,
    pub fecha_emision: NaiveDate,
    pub emission_type: EmissionType,
    pub security_code: String,
    pub check_digit: u8,
}

/// Generate a 44-digit CDC from `req`.
pub fn generate_cdc(req: &CdcGenerationRequest) -> Result<String, CoreError> {
    if req.ruc_base.len() != 8 || !req.ruc_base.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::Cdc("ruc_base must be 8 digits".into()));
    }
    if req.ruc_dv > 9 {
        return Err(CoreError::Cdc("ruc_dv must be a single digit".into()));
    }
    if req.establecimiento.len() != 3 || !req.establecimiento.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(CoreError::Cdc("establecimiento must be 3 digits".into()));
    }
    if req.punto_expedicion.len() != 3
        || !req.punto_expedicion.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(CoreError::Cdc("punto_expedicion must be 3 digits".into()));
    }
    if req.numero_documento.len() != 7
        || !req.numero_documento.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(CoreError::Cdc("numero_documento must be 7 digits".into()));
    }
    if req.security_code.len() != 9 || !req.security_code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::Cdc("security_code must be 9 digits".into()));
    }

    let prefix = format!(
        "{}{}{:02}{}{}{}{}{}{}",
        req.ruc_base,
        req.ruc_dv,
        req.kind.code(),
        req.establecimiento,
        req.punto_expedicion,
        req.numero_documento,
        req.fecha_emision.format("%Y%m%d"),
        req.emission_type.digit(),
        req.security_code,
    );
    debug_assert_eq!(prefix.len(), CDC_LEN - 1);

    let check_digit = check_digit_mod11(&prefix)?;
    Ok(format!("{prefix}{check_digit}"))
}

/// Decompose and validate a 44-digit CDC.
pub fn validate_cdc(cdc: &str) -> Result<CdcComponents, CoreError> {
    if cdc.len() != CDC_LEN || !cdc.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::Cdc(format!(
            "CDC must be {CDC_LEN} decimal digits, got {cdc:?}"
        )));
    }

    let prefix = &cdc[..CDC_LEN - 1];
    let expected = check_digit_mod11(prefix)?;
    let actual: u8 = cdc[CDC_LEN - 1..].parse().unwrap();
    if expected != actual {
        return Err(CoreError::Cdc(format!(
            "check digit mismatch: expected {expected}, got {actual}"
        )));
    }

    let ruc_base = cdc[0..8].to_string();
    let ruc_dv: u8 = cdc[8..9].parse().unwrap();
    let kind_code: u8 = cdc[9..11].parse().unwrap();
    let kind = DocumentKind::from_code(kind_code)?;
    let establecimiento = cdc[11..14].to_string();
    let punto_expedicion = cdc[14..17].to_string();
    let numero_documento = cdc[17..24].to_string();
    let fecha_emision = NaiveDate::parse_from_str(&cdc[24..32], "%Y%m%d")
        .map_err(|e| CoreError::Cdc(format!("invalid issuance date in CDC: {e}")))?;
    let emission_digit: u8 = cdc[32..33].parse().unwrap();
    let emission_type = EmissionType::from_digit(emission_digit)?;
    let security_code = cdc[33..42].to_string();
    let check_digit = actual;

    Ok(CdcComponents {
        ruc_base,
        ruc_dv,
        kind,
        establecimiento,
        punto_expedicion,
        numero_documento,
        fecha_emision,
        emission_type,
        security_code,
        check_digit,
    })
}

/// Paraguay modulo-11 check digit over `prefix`, factors cycling 2..7 from
/// right to left.
fn check_digit_mod11(prefix: &str) -> Result<u8, CoreError> {
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::Cdc("CDC prefix must be all digits".into()));
    }
    let mut factor = 2u32;
    let sum: u32 = prefix
        .bytes()
        .rev()
        .map(|b| {
            let digit = (b - b'0') as u32;
            let weighted = digit * factor;
            factor = if factor == 7 { 2 } else { factor + 1 };
            weighted
        })
        .sum();
    let r = sum % 11;
    Ok(if r < 2 { 0 } else { (11 - r) as u8 })
}
