use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::CoreError;

/// The five SIFEN document kinds (§3.1), tagged by their SET numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// kind=1: Factura Electrónica — ordinary sale.
    Invoice,
    /// kind=4: Autofactura Electrónica — importer self-issues.
    AutoInvoice,
    /// kind=5: Nota de Crédito Electrónica.
    CreditNote,
    /// kind=6: Nota de Débito Electrónica.
    DebitNote,
    /// kind=7: Nota de Remisión Electrónica.
    RemissionNote,
}

impl DocumentKind {
    /// SET numeric kind code.
    pub fn code(self) -> u8 {
        match self {
            Self::Invoice => 1,
            Self::AutoInvoice => 4,
            Self::CreditNote => 5,
            Self::DebitNote => 6,
            Self::RemissionNote => 7,
        }
    }

    /// Parse from the SET numeric kind code.
    pub fn from_code(code: u8) -> Result<Self, CoreError> {
        match code {
            1 => Ok(Self::Invoice),
            4 => Ok(Self::AutoInvoice),
            5 => Ok(Self::CreditNote),
            6 => Ok(Self::DebitNote),
            7 => Ok(Self::RemissionNote),
            other => Err(CoreError::Cdc(format!("unknown document kind {other}"))),
        }
    }
}

/// IVA (VAT) affectation for a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IvaAffectation {
    /// Exempt from IVA.
    Exempt,
    /// Taxed at 5%.
    Rate5,
    /// Taxed at 10%.
    Rate10,
    /// Other affectation (e.g. export, not subject).
    Other,
}

impl IvaAffectation {
    /// The nominal IVA rate as a percentage, or `None` when not a fixed rate.
    pub fn rate(self) -> Option<Decimal> {
        match self {
            IvaAffectation::Exempt => None,
            IvaAffectation::Rate5 => Some(Decimal::from(5)),
            IvaAffectation::Rate10 => Some(Decimal::from(10)),
            IvaAffectation::Other => None,
        }
    }
}

/// A single RUC, stored as its 8-digit base and check digit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruc {
    pub base: String,
    pub dv: u8,
}

impl Ruc {
    /// Validate the check digit and wrap the RUC.
    pub fn new(base: impl Into<String>, dv: u8) -> Result<Self, CoreError> {
        let base = base.into();
        super::ruc::validate(&base, dv)?;
        Ok(Self { base, dv })
    }

    /// Normalized `XXXXXXXX-D` presentation.
    pub fn formatted(&self) -> String {
        super::ruc::format_ruc(&self.base, self.dv)
    }
}

/// A line item on any document kind (§3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Seller's item code.
    pub code: String,
    pub description: String,
    /// Non-negative, 4 fractional digits.
    pub quantity: Decimal,
    /// SET unit-of-measure code (`core::units`).
    pub unit_code: String,
    pub unit_price: Decimal,
    pub iva_affectation: IvaAffectation,
    pub lot: Option<String>,
    pub serial: Option<String>,
    /// NCM (Nomenclatura Común del Mercosur) tariff code.
    pub ncm: Option<String>,
    /// ISO 3166-1 alpha-2 origin country, for imported goods.
    pub origin_country: Option<String>,
    /// Taxable base for this line, set by [`crate::core::validation::calculate_totals`].
    pub taxable_base: Option<Decimal>,
    /// IVA amount for this line, set by `calculate_totals`.
    pub iva_amount: Option<Decimal>,
    /// quantity * unit_price, set by `calculate_totals`.
    pub line_total: Option<Decimal>,
}

/// Document-level monetary totals (§3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonetaryTotals {
    pub subtotal_exempt: Decimal,
    pub subtotal_5: Decimal,
    pub subtotal_10: Decimal,
    pub iva_5: Decimal,
    pub iva_10: Decimal,
    /// Sum of the three subtotals above.
    pub subtotal: Decimal,
    /// `subtotal + iva_5 + iva_10`.
    pub total: Decimal,
    /// ISO 4217 currency code; SIFEN amounts are PYG unless a foreign
    /// receiver is declared.
    pub currency_code: String,
    /// Required when `currency_code != "PYG"`.
    pub exchange_rate: Option<Decimal>,
}

/// A party identified by RUC, name, and address — either the issuer or the
/// receiver of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub ruc: Ruc,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
}

/// Timbrado coordinates carried on the document itself (the authorization
/// record's identity, not its remaining sequence state — see
/// [`crate::core::timbrado::Timbrado`] for the stateful counterpart).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimbradoRef {
    pub numero: String,
    pub establecimiento: String,
    pub punto_expedicion: String,
}

/// Fields shared by all five document kinds (§3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentHead {
    pub issuer: Party,
    pub receiver: Party,
    pub lines: Vec<LineItem>,
    pub totals: MonetaryTotals,
    pub issuance: NaiveDateTime,
    pub timbrado: TimbradoRef,
    /// 7-digit document sequence number within the timbrado.
    pub numero_documento: String,
    /// 9-digit security code (CSC), already padded with leading zeros.
    pub security_code: String,
    pub emission_type: super::cdc::EmissionType,
}

/// The seller-abroad sub-record required on auto-invoices (AFE, §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignSellerRecord {
    /// "1" natural person, "2" legal entity, per the SET catalog.
    pub naturaleza: String,
    pub document_type: String,
    pub document_number: String,
    pub name: String,
    pub address: String,
    pub country_code: String,
    pub transaction_city: String,
}

/// Reference to the document an NCE/NDE corrects (§3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociatedDocumentReference {
    /// 44-digit CDC of the referenced document.
    pub cdc: String,
    pub kind: DocumentKind,
    pub timbrado: TimbradoRef,
    pub fecha_emision: NaiveDate,
}

/// A vehicle entry on a remission note's transport record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub plate: String,
    pub driver_name: String,
    pub driver_document: String,
}

/// The mandatory transport sub-record on remission notes (NRE, §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportRecord {
    pub mode: TransportMode,
    pub responsible_party: String,
    pub start_address: String,
    pub end_address: String,
    pub vehicles: Vec<Vehicle>,
}

/// Who is responsible for the shipment on a remission note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportMode {
    Own,
    ThirdParty,
}

/// The kind-specific sub-record distinguishing the five document variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DocumentDetail {
    Invoice,
    AutoInvoice(ForeignSellerRecord),
    CreditNote(AssociatedDocumentReference),
    DebitNote(AssociatedDocumentReference),
    RemissionNote(TransportRecord),
}

impl DocumentDetail {
    pub fn kind(&self) -> DocumentKind {
        match self {
            DocumentDetail::Invoice => DocumentKind::Invoice,
            DocumentDetail::AutoInvoice(_) => DocumentKind::AutoInvoice,
            DocumentDetail::CreditNote(_) => DocumentKind::CreditNote,
            DocumentDetail::DebitNote(_) => DocumentKind::DebitNote,
            DocumentDetail::RemissionNote(_) => DocumentKind::RemissionNote,
        }
    }
}

/// A complete SIFEN document: shared head plus kind-specific detail (§9 —
/// tagged alternatives over a shared head, not an inheritance hierarchy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub head: DocumentHead,
    pub detail: DocumentDetail,
}

impl Document {
    pub fn kind(&self) -> DocumentKind {
        self.detail.kind()
    }

    /// Stable identifier derived from issuer, timbrado, sequence, and
    /// issuance timestamp (§4.1). Distinct from the CDC: the fingerprint is
    /// computed before CDC generation and is used to correlate retries
    /// without depending on the CSC.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.head.issuer.ruc.formatted(),
            self.head.timbrado.numero,
            self.head.timbrado.establecimiento,
            self.head.timbrado.punto_expedicion,
            self.head.issuance.format("%Y%m%d%H%M%S"),
        )
    }
}
