use chrono::NaiveDate;

use super::error::CoreError;

/// SET-issued authorization envelope (§3.2).
///
/// A timbrado grants an issuer the right to emit documents from a given
/// (establishment, expedition point) pair within a validity window, and
/// carries the gapless sequence counter SET expects for that pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timbrado {
    /// 8-digit timbrado number.
    pub numero: String,
    /// 3-digit establishment code.
    pub establecimiento: String,
    /// 3-digit expedition point code.
    pub punto_expedicion: String,
    next_sequence: u32,
    pub valido_desde: NaiveDate,
    pub valido_hasta: NaiveDate,
}

impl Timbrado {
    /// Construct a timbrado starting its sequence at 1.
    pub fn new(
        numero: impl Into<String>,
        establecimiento: impl Into<String>,
        punto_expedicion: impl Into<String>,
        valido_desde: NaiveDate,
        valido_hasta: NaiveDate,
    ) -> Result<Self, CoreError> {
        Self::starting_at(
            numero,
            establecimiento,
            punto_expedicion,
            1,
            valido_desde,
            valido_hasta,
        )
    }

    /// Construct a timbrado continuing from a given sequence number.
    pub fn starting_at(
        numero: impl Into<String>,
        establecimiento: impl Into<String>,
        punto_expedicion: impl Into<String>,
        next_sequence: u32,
        valido_desde: NaiveDate,
        valido_hasta: NaiveDate,
    ) -> Result<Self, CoreError> {
        let numero = numero.into();
        let establecimiento = establecimiento.into();
        let punto_expedicion = punto_expedicion.into();
        if numero.len() != 8 || !numero.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoreError::Builder(
                "timbrado number must be 8 digits".into(),
            ));
        }
        if establecimiento.len() != 3 || !establecimiento.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoreError::Builder(
                "establecimiento must be 3 digits".into(),
            ));
        }
        if punto_expedicion.len() != 3 || !punto_expedicion.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoreError::Builder(
                "punto_expedicion must be 3 digits".into(),
            ));
        }
        if valido_hasta <= valido_desde {
            return Err(CoreError::Builder(
                "timbrado validity end must be after start".into(),
            ));
        }
        Ok(Self {
            numero,
            establecimiento,
            punto_expedicion,
            next_sequence,
            valido_desde,
            valido_hasta,
        })
    }

    /// Whether `date` falls within the timbrado's validity window.
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        date >= self.valido_desde && date <= self.valido_hasta
    }

    /// The next document number that will be issued, as `NNN-NNN-NNNNNNN`.
    pub fn peek_document_number(&self) -> String {
        format!(
            "{}-{}-{:07}",
            self.establecimiento, self.punto_expedicion, self.next_sequence
        )
    }

    /// Consume and return the next document number.
    pub fn next_document_number(&mut self) -> Result<String, CoreError> {
        if self.next_sequence == 0 {
            return Err(CoreError::Builder("sequence must be positive".into()));
        }
        let number = self.peek_document_number();
        self.next_sequence = self
            .next_sequence
            .checked_add(1)
            .ok_or_else(|| CoreError::Builder("timbrado sequence overflow".into()))?;
        Ok(number)
    }

    /// Validate that `document_number` (the `NNN-NNN-NNNNNNN` form) matches
    /// this timbrado's establishment and expedition point.
    pub fn matches(&self, document_number: &str) -> bool {
        let parts: Vec<&str> = document_number.split('-').collect();
        matches!((parts.as_slice()), [est, pe, _seq] if *est == self.establecimiento && *pe == self.punto_expedicion)
    }
}
