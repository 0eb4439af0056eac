//! RUC (Registro Único del Contribuyente) validation and check-digit
//! computation.
//!
//! Paraguay's modulo-11 variant: factors 2,3,4,5,6,7,2,3 applied right to
//! left over the eight base digits. Let `r = sum mod 11`; if `r < 2`, the
//! check digit is 0, else `11 - r`.

use super::error::CoreError;

const FACTORS: [u32; 8] = [2, 3, 4, 5, 6, 7, 2, 3];

/// Compute the modulo-11 check digit for an 8-digit RUC base.
///
/// `base` must be exactly 8 ASCII digits.
pub fn compute_dv(base: &str) -> Result<u8, CoreError> {
    let digits = parse_digits(base, 8)?;
    let sum: u32 = digits
        .iter()
        .rev()
        .zip(FACTORS.iter())
        .map(|(d, f)| d * f)
        .sum();
    let r = sum % 11;
    Ok(if r < 2 { 0 } else { (11 - r) as u8 })
}

/// Validate a RUC base and check digit together.
pub fn validate(base: &str, dv: u8) -> Result<(), CoreError> {
    let expected = compute_dv(base)?;
    if expected != dv {
        return Err(CoreError::Ruc(format!(
            "check digit mismatch: expected {expected}, got {dv}"
        )));
    }
    Ok(())
}

/// Parse `"XXXXXXXX-D"` (or `"XXXXXXXXD"`) into `(base, dv)` and validate.
pub fn parse_and_validate(ruc: &str) -> Result<(String, u8), CoreError> {
    let (base, dv_str) = match ruc.split_once('-') {
        Some((b, d)) => (b, d),
        None if ruc.len() == 9 => ruc.split_at(8),
        None => return Err(CoreError::Ruc(format!("malformed RUC: {ruc}"))),
    };
    let dv: u8 = dv_str
        .parse()
        .map_err(|_| CoreError::Ruc(format!("malformed check digit: {dv_str}")))?;
    validate(base, dv)?;
    Ok((base.to_string(), dv))
}

/// Render `base`/`dv` in the normalized `XXXXXXXX-D` presentation.
pub fn format_ruc(base: &str, dv: u8) -> String {
    format!("{base}-{dv}")
}

fn parse_digits(s: &str, expected_len: usize) -> Result<Vec<u32>, CoreError> {
    if s.len() != expected_len || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::Ruc(format!(
            "expected {expected_len} digits, got {s:?}"
        )));
    }
    Ok(s.bytes().map(|b| (b - b'0') as u32).collect())
}
