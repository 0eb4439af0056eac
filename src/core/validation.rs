use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::cdc;
use super::clock;
use super::currencies;
use super::error::{ValidationError, ViolationKind};
use super::types::{Document, DocumentDetail, DocumentKind, IvaAffectation, LineItem};

/// Validate `doc` against every invariant in the document model (§4.1).
///
/// Never panics or short-circuits on the first failure: every applicable
/// rule runs and contributes its own [`ValidationError`] to the result. An
/// empty vector means the document is admissible for signing.
pub fn validate(doc: &Document) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_document_number(doc, &mut errors);
    validate_issuance_date(doc, &mut errors);

    match &doc.detail {
        DocumentDetail::AutoInvoice(seller) => validate_auto_invoice(doc, seller, &mut errors),
        DocumentDetail::CreditNote(reference) | DocumentDetail::DebitNote(reference) => {
            validate_associated_document(doc, reference, &mut errors)
        }
        DocumentDetail::RemissionNote(transport) => {
            validate_remission_note(doc, transport, &mut errors)
        }
        DocumentDetail::Invoice => {}
    }

    validate_lines(doc, &mut errors);
    validate_totals_coherence(doc, &mut errors);
    validate_amount_format(doc, &mut errors);

    errors
}

fn validate_document_number(doc: &Document, errors: &mut Vec<ValidationError>) {
    let number = format!(
        "{}-{}-{}",
        doc.head.timbrado.establecimiento, doc.head.timbrado.punto_expedicion, doc.head.numero_documento
    );
    let parts: Vec<&str> = number.split('-').collect();
    let well_formed = matches!(parts.as_slice(), [est, pe, seq]
        if est.len() == 3 && pe.len() == 3 && seq.len() == 7
        && est.bytes().all(|b| b.is_ascii_digit())
        && pe.bytes().all(|b| b.is_ascii_digit())
        && seq.bytes().all(|b| b.is_ascii_digit()));
    if !well_formed {
        errors.push(ValidationError::new(
            ViolationKind::DocumentNumber,
            "head.numero_documento",
            "document number must match NNN-NNN-NNNNNNN",
        ));
    }
    match doc.head.numero_documento.parse::<u64>() {
        Ok(0) => errors.push(ValidationError::new(
            ViolationKind::DocumentNumber,
            "head.numero_documento",
            "sequence must be positive",
        )),
        Ok(_) => {}
        Err(_) => {}
    }
}

fn validate_issuance_date(doc: &Document, errors: &mut Vec<ValidationError>) {
    if clock::elapsed_since(doc.head.issuance) < chrono::Duration::zero() {
        errors.push(ValidationError::new(
            ViolationKind::IssuanceDate,
            "head.issuance",
            "issuance timestamp is in the future",
        ));
    }
}

fn validate_auto_invoice(
    doc: &Document,
    seller: &super::types::ForeignSellerRecord,
    errors: &mut Vec<ValidationError>,
) {
    if doc.head.issuer.ruc != doc.head.receiver.ruc {
        errors.push(ValidationError::new(
            ViolationKind::AutoInvoice,
            "head.receiver.ruc",
            "auto-invoice issuer RUC must equal receiver RUC",
        ));
    }
    let fields = [
        ("naturaleza", &seller.naturaleza),
        ("document_type", &seller.document_type),
        ("document_number", &seller.document_number),
        ("name", &seller.name),
        ("address", &seller.address),
        ("transaction_city", &seller.transaction_city),
    ];
    for (field, value) in fields {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(
                ViolationKind::AutoInvoice,
                format!("detail.foreign_seller.{field}"),
                "foreign seller record field must not be empty",
            ));
        }
    }
    if !super::countries::is_known_country_code(&seller.country_code) {
        errors.push(ValidationError::new(
            ViolationKind::AutoInvoice,
            "detail.foreign_seller.country_code",
            format!("unknown country code {}", seller.country_code),
        ));
    }
}

fn validate_associated_document(
    doc: &Document,
    reference: &super::types::AssociatedDocumentReference,
    errors: &mut Vec<ValidationError>,
) {
    match cdc::validate_cdc(&reference.cdc) {
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new(
            ViolationKind::AssociatedDocument,
            "detail.associated_document.cdc",
            format!("invalid associated-document CDC: {e}"),
        )),
    }
    if reference.fecha_emision >= doc.head.issuance.date() {
        errors.push(ValidationError::new(
            ViolationKind::AssociatedDocument,
            "detail.associated_document.fecha_emision",
            "associated document must be issued strictly before this document",
        ));
    }
}

fn validate_remission_note(
    doc: &Document,
    transport: &super::types::TransportRecord,
    errors: &mut Vec<ValidationError>,
) {
    let t = &doc.head.totals;
    if t.subtotal_exempt != Decimal::ZERO
        || t.subtotal_5 != Decimal::ZERO
        || t.subtotal_10 != Decimal::ZERO
        || t.iva_5 != Decimal::ZERO
        || t.iva_10 != Decimal::ZERO
        || t.subtotal != Decimal::ZERO
        || t.total != Decimal::ZERO
    {
        errors.push(ValidationError::new(
            ViolationKind::Transport,
            "head.totals",
            "remission note totals must be exactly zero",
        ));
    }
    if transport.vehicles.is_empty() {
        errors.push(ValidationError::new(
            ViolationKind::Transport,
            "detail.transport.vehicles",
            "at least one vehicle with a driver is required",
        ));
    }
    for (i, vehicle) in transport.vehicles.iter().enumerate() {
        if vehicle.driver_name.trim().is_empty() || vehicle.driver_document.trim().is_empty() {
            errors.push(ValidationError::new(
                ViolationKind::Transport,
                format!("detail.transport.vehicles[{i}]"),
                "vehicle entry must carry driver identity",
            ));
        }
    }
    if transport.start_address.trim().is_empty() {
        errors.push(ValidationError::new(
            ViolationKind::Transport,
            "detail.transport.start_address",
            "start address must not be empty",
        ));
    }
    if transport.end_address.trim().is_empty() {
        errors.push(ValidationError::new(
            ViolationKind::Transport,
            "detail.transport.end_address",
            "end address must not be empty",
        ));
    }
}

fn validate_lines(doc: &Document, errors: &mut Vec<ValidationError>) {
    let tolerance = line_tolerance(&doc.head.totals.currency_code);
    for (i, line) in doc.head.lines.iter().enumerate() {
        if line.quantity <= Decimal::ZERO {
            errors.push(ValidationError::new(
                ViolationKind::LineItem,
                format!("lines[{i}].quantity"),
                "quantity must be greater than zero",
            ));
        }
        if let Some(line_total) = line.line_total {
            let expected = line.quantity * line.unit_price;
            if (line_total - expected).abs() > tolerance {
                errors.push(ValidationError::new(
                    ViolationKind::LineItem,
                    format!("lines[{i}].line_total"),
                    "line total does not equal quantity times unit price",
                ));
            }
        }
    }
}

fn validate_totals_coherence(doc: &Document, errors: &mut Vec<ValidationError>) {
    if doc.kind() == DocumentKind::RemissionNote {
        return;
    }
    let tolerance = line_tolerance(&doc.head.totals.currency_code);
    let mut by_rate: HashMap<&'static str, Decimal> = HashMap::new();
    for line in &doc.head.lines {
        let Some(base) = line.taxable_base else {
            errors.push(ValidationError::new(
                ViolationKind::Totals,
                "head.totals",
                "totals have not been calculated for this document",
            ));
            return;
        };
        let key = match line.iva_affectation {
            IvaAffectation::Exempt => "exempt",
            IvaAffectation::Rate5 => "5",
            IvaAffectation::Rate10 => "10",
            IvaAffectation::Other => "exempt",
        };
        *by_rate.entry(key).or_insert(Decimal::ZERO) += base;
    }

    let exempt = *by_rate.get("exempt").unwrap_or(&Decimal::ZERO);
    let base5 = *by_rate.get("5").unwrap_or(&Decimal::ZERO);
    let base10 = *by_rate.get("10").unwrap_or(&Decimal::ZERO);

    check_close(
        exempt,
        doc.head.totals.subtotal_exempt,
        tolerance,
        "head.totals.subtotal_exempt",
        errors,
    );
    check_close(
        base5,
        doc.head.totals.subtotal_5,
        tolerance,
        "head.totals.subtotal_5",
        errors,
    );
    check_close(
        base10,
        doc.head.totals.subtotal_10,
        tolerance,
        "head.totals.subtotal_10",
        errors,
    );

    let expected_total = doc.head.totals.subtotal_exempt
        + doc.head.totals.subtotal_5
        + doc.head.totals.subtotal_10
        + doc.head.totals.iva_5
        + doc.head.totals.iva_10;
    check_close(
        expected_total,
        doc.head.totals.total,
        tolerance,
        "head.totals.total",
        errors,
    );
}

fn check_close(
    actual: Decimal,
    declared: Decimal,
    tolerance: Decimal,
    path: &str,
    errors: &mut Vec<ValidationError>,
) {
    if (actual - declared).abs() > tolerance {
        errors.push(ValidationError::new(
            ViolationKind::Totals,
            path,
            format!("declared {declared} does not match recomputed {actual}"),
        ));
    }
}

fn validate_amount_format(doc: &Document, errors: &mut Vec<ValidationError>) {
    let currency = &doc.head.totals.currency_code;
    match currencies::decimal_places(currency) {
        None => errors.push(ValidationError::new(
            ViolationKind::AmountFormat,
            "head.totals.currency_code",
            format!("unknown currency code {currency}"),
        )),
        Some(expected_dp) => {
            if doc.head.totals.total.scale() > expected_dp {
                errors.push(ValidationError::new(
                    ViolationKind::AmountFormat,
                    "head.totals.total",
                    format!("{currency} amounts must have exactly {expected_dp} fractional digits"),
                ));
            }
        }
    }
    let integer_digits = doc.head.totals.total.trunc().to_string().trim_start_matches('-').len();
    if integer_digits > 15 {
        errors.push(ValidationError::new(
            ViolationKind::AmountFormat,
            "head.totals.total",
            "integer part of total exceeds 15 digits",
        ));
    }
}

fn line_tolerance(currency_code: &str) -> Decimal {
    if currency_code == "PYG" {
        dec!(1)
    } else {
        dec!(0.01)
    }
}

/// Recompute every line's derived fields and the document's declared
/// totals from its current line items (§3.2, §4.1). Mutates `doc` in place;
/// callers that need the prior state should clone first.
pub fn calculate_totals(doc: &mut Document) {
    let dp = currencies::decimal_places(&doc.head.totals.currency_code).unwrap_or(2);
    for line in &mut doc.head.lines {
        recompute_line(line, dp);
    }

    let mut subtotal_exempt = Decimal::ZERO;
    let mut subtotal_5 = Decimal::ZERO;
    let mut subtotal_10 = Decimal::ZERO;
    let mut iva_5 = Decimal::ZERO;
    let mut iva_10 = Decimal::ZERO;

    for line in &doc.head.lines {
        let base = line.taxable_base.unwrap_or(Decimal::ZERO);
        let iva = line.iva_amount.unwrap_or(Decimal::ZERO);
        match line.iva_affectation {
            IvaAffectation::Exempt | IvaAffectation::Other => subtotal_exempt += base,
            IvaAffectation::Rate5 => {
                subtotal_5 += base;
                iva_5 += iva;
            }
            IvaAffectation::Rate10 => {
                subtotal_10 += base;
                iva_10 += iva;
            }
        }
    }

    let subtotal = subtotal_exempt + subtotal_5 + subtotal_10;
    let total = subtotal + iva_5 + iva_10;

    doc.head.totals.subtotal_exempt = subtotal_exempt;
    doc.head.totals.subtotal_5 = subtotal_5;
    doc.head.totals.subtotal_10 = subtotal_10;
    doc.head.totals.iva_5 = iva_5;
    doc.head.totals.iva_10 = iva_10;
    doc.head.totals.subtotal = subtotal;
    doc.head.totals.total = total;
}

fn recompute_line(line: &mut LineItem, dp: u32) {
    let base = round_half_up(line.quantity * line.unit_price, dp);
    let rate = line.iva_affectation.rate().unwrap_or(Decimal::ZERO);
    let iva = round_half_up(base * rate / dec!(100), dp);
    line.taxable_base = Some(base);
    line.iva_amount = Some(iva);
    line.line_total = Some(base);
}

/// Round a Decimal to `dp` decimal places using half-up (commercial rounding).
fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}
