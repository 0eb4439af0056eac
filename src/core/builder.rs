use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::cdc::EmissionType;
use super::error::CoreError;
use super::types::*;
use super::validation;

/// Builder for a single [`LineItem`].
///
/// ```
/// use sifen::core::*;
/// use rust_decimal_macros::dec;
///
/// let line = LineItemBuilder::new("ITEM-1", "Widget", dec!(2), "77", dec!(50000))
///     .iva(IvaAffectation::Rate10)
///     .build();
/// ```
pub struct LineItemBuilder {
    code: String,
    description: String,
    quantity: Decimal,
    unit_code: String,
    unit_price: Decimal,
    iva_affectation: IvaAffectation,
    lot: Option<String>,
    serial: Option<String>,
    ncm: Option<String>,
    origin_country: Option<String>,
}

impl LineItemBuilder {
    pub fn new(
        code: impl Into<String>,
        description: impl Into<String>,
        quantity: Decimal,
        unit_code: impl Into<String>,
        unit_price: Decimal,
    ) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            quantity,
            unit_code: unit_code.into(),
            unit_price,
            iva_affectation: IvaAffectation::Rate10,
            lot: None,
            serial: None,
            ncm: None,
            origin_country: None,
        }
    }

    /// Set the IVA affectation. Defaults to `Rate10`.
    pub fn iva(mut self, affectation: IvaAffectation) -> Self {
        self.iva_affectation = affectation;
        self
    }

    pub fn lot(mut self, lot: impl Into<String>) -> Self {
        self.lot = Some(lot.into());
        self
    }

    pub fn serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    pub fn ncm(mut self, ncm: impl Into<String>) -> Self {
        self.ncm = Some(ncm.into());
        self
    }

    pub fn origin_country(mut self, code: impl Into<String>) -> Self {
        self.origin_country = Some(code.into());
        self
    }

    pub fn build(self) -> LineItem {
        LineItem {
            code: self.code,
            description: self.description,
            quantity: self.quantity,
            unit_code: self.unit_code,
            unit_price: self.unit_price,
            iva_affectation: self.iva_affectation,
            lot: self.lot,
            serial: self.serial,
            ncm: self.ncm,
            origin_country: self.origin_country,
            taxable_base: None,
            iva_amount: None,
            line_total: None,
        }
    }
}

/// Builder for the head shared by all five document kinds (§3.1), terminated
/// by one of the `build_*` kind constructors rather than a single `build()`.
///
/// ```
/// use sifen::core::*;
/// use chrono::NaiveDate;
///
/// let issuer = PartyBuilder::new(Ruc::new("80000001", 7).unwrap(), "Acme SA").build();
/// let receiver = PartyBuilder::new(Ruc::new("80000002", 4).unwrap(), "Cliente").build();
///
/// let doc = DocumentBuilder::new()
///     .issuer(issuer)
///     .receiver(receiver)
///     .timbrado(TimbradoRef { numero: "12345678".into(), establecimiento: "001".into(), punto_expedicion: "001".into() })
///     .numero_documento("0000001")
///     .issuance(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap().and_hms_opt(10, 0, 0).unwrap())
///     .security_code("000123456")
///     .build_invoice()
///     .unwrap();
/// ```
pub struct DocumentBuilder {
    issuer: Option<Party>,
    receiver: Option<Party>,
    lines: Vec<LineItem>,
    currency_code: String,
    exchange_rate: Option<Decimal>,
    timbrado: Option<TimbradoRef>,
    numero_documento: Option<String>,
    issuance: Option<NaiveDateTime>,
    security_code: Option<String>,
    emission_type: EmissionType,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self {
            issuer: None,
            receiver: None,
            lines: Vec::new(),
            currency_code: "PYG".to_string(),
            exchange_rate: None,
            timbrado: None,
            numero_documento: None,
            issuance: None,
            security_code: None,
            emission_type: EmissionType::Normal,
        }
    }

    pub fn issuer(mut self, party: Party) -> Self {
        self.issuer = Some(party);
        self
    }

    pub fn receiver(mut self, party: Party) -> Self {
        self.receiver = Some(party);
        self
    }

    pub fn add_line(mut self, line: LineItem) -> Self {
        self.lines.push(line);
        self
    }

    /// Set the document currency (ISO 4217). Defaults to `"PYG"`.
    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency_code = code.into();
        self
    }

    /// Required when the currency is not `PYG`.
    pub fn exchange_rate(mut self, rate: Decimal) -> Self {
        self.exchange_rate = Some(rate);
        self
    }

    pub fn timbrado(mut self, timbrado: TimbradoRef) -> Self {
        self.timbrado = Some(timbrado);
        self
    }

    pub fn numero_documento(mut self, numero: impl Into<String>) -> Self {
        self.numero_documento = Some(numero.into());
        self
    }

    pub fn issuance(mut self, at: NaiveDateTime) -> Self {
        self.issuance = Some(at);
        self
    }

    pub fn security_code(mut self, code: impl Into<String>) -> Self {
        self.security_code = Some(code.into());
        self
    }

    /// Mark this document as contingency-mode (offline) issuance;
    /// the CDC's emission-type digit becomes 2 (§4.10).
    pub fn contingency(mut self) -> Self {
        self.emission_type = EmissionType::Contingency;
        self
    }

    fn build_head(self) -> Result<DocumentHead, CoreError> {
        let issuer = self
            .issuer
            .ok_or_else(|| CoreError::Builder("issuer is required".into()))?;
        let receiver = self
            .receiver
            .ok_or_else(|| CoreError::Builder("receiver is required".into()))?;
        let timbrado = self
            .timbrado
            .ok_or_else(|| CoreError::Builder("timbrado is required".into()))?;
        let numero_documento = self
            .numero_documento
            .ok_or_else(|| CoreError::Builder("numero_documento is required".into()))?;
        let issuance = self
            .issuance
            .ok_or_else(|| CoreError::Builder("issuance timestamp is required".into()))?;
        let security_code = self
            .security_code
            .ok_or_else(|| CoreError::Builder("security_code is required".into()))?;
        if self.lines.is_empty() {
            return Err(CoreError::Builder("at least one line is required".into()));
        }
        if self.currency_code != "PYG" && self.exchange_rate.is_none() {
            return Err(CoreError::Builder(
                "exchange_rate is required for non-PYG documents".into(),
            ));
        }

        Ok(DocumentHead {
            issuer,
            receiver,
            lines: self.lines,
            totals: MonetaryTotals {
                subtotal_exempt: Decimal::ZERO,
                subtotal_5: Decimal::ZERO,
                subtotal_10: Decimal::ZERO,
                iva_5: Decimal::ZERO,
                iva_10: Decimal::ZERO,
                subtotal: Decimal::ZERO,
                total: Decimal::ZERO,
                currency_code: self.currency_code,
                exchange_rate: self.exchange_rate,
            },
            issuance,
            timbrado,
            numero_documento,
            security_code,
            emission_type: self.emission_type,
        })
    }

    fn finish(head: DocumentHead, detail: DocumentDetail) -> Document {
        let mut doc = Document { head, detail };
        validation::calculate_totals(&mut doc);
        doc
    }

    pub fn build_invoice(self) -> Result<Document, CoreError> {
        let head = self.build_head()?;
        Ok(Self::finish(head, DocumentDetail::Invoice))
    }

    pub fn build_auto_invoice(
        self,
        seller: ForeignSellerRecord,
    ) -> Result<Document, CoreError> {
        let head = self.build_head()?;
        Ok(Self::finish(head, DocumentDetail::AutoInvoice(seller)))
    }

    pub fn build_credit_note(
        self,
        reference: AssociatedDocumentReference,
    ) -> Result<Document, CoreError> {
        let head = self.build_head()?;
        Ok(Self::finish(head, DocumentDetail::CreditNote(reference)))
    }

    pub fn build_debit_note(
        self,
        reference: AssociatedDocumentReference,
    ) -> Result<Document, CoreError> {
        let head = self.build_head()?;
        Ok(Self::finish(head, DocumentDetail::DebitNote(reference)))
    }

    pub fn build_remission_note(
        self,
        transport: TransportRecord,
    ) -> Result<Document, CoreError> {
        let head = self.build_head()?;
        Ok(Self::finish(head, DocumentDetail::RemissionNote(transport)))
    }
}

/// Builder for a [`Party`] (issuer or receiver).
pub struct PartyBuilder {
    ruc: Ruc,
    name: String,
    address: Option<String>,
    city: Option<String>,
    country_code: Option<String>,
}

impl PartyBuilder {
    pub fn new(ruc: Ruc, name: impl Into<String>) -> Self {
        Self {
            ruc,
            name: name.into(),
            address: None,
            city: None,
            country_code: None,
        }
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn country(mut self, code: impl Into<String>) -> Self {
        self.country_code = Some(code.into());
        self
    }

    pub fn build(self) -> Party {
        Party {
            ruc: self.ruc,
            name: self.name,
            address: self.address,
            city: self.city,
            country_code: self.country_code,
        }
    }
}
