use crate::core::{Document, DocumentDetail, IvaAffectation, TransportMode};

use super::error::XmlError;
use super::xml_utils::{format_amount, XmlWriter};

fn decimal_places(currency_code: &str) -> u32 {
    crate::core::decimal_places(currency_code).unwrap_or(2)
}

fn iva_affectation_code(affectation: IvaAffectation) -> &'static str {
    match affectation {
        IvaAffectation::Exempt => "3",
        IvaAffectation::Rate5 => "1",
        IvaAffectation::Rate10 => "1",
        IvaAffectation::Other => "4",
    }
}

fn iva_rate_text(affectation: IvaAffectation) -> &'static str {
    match affectation {
        IvaAffectation::Exempt => "0",
        IvaAffectation::Rate5 => "5",
        IvaAffectation::Rate10 => "10",
        IvaAffectation::Other => "0",
    }
}

/// Serialize a [`Document`] into the library's own ergonomic "modular"
/// XML shape (§4.3). This is not the wire format SIFEN accepts — see
/// [`super::mapper`] for the transform into the official `gOpeDE` shape.
pub fn to_modular_xml(doc: &Document, cdc: &str) -> Result<String, XmlError> {
    let mut w = XmlWriter::new()?;
    let dp = decimal_places(&doc.head.totals.currency_code);

    w.start_element_with_attrs("rDE", &[("Id", cdc)])?;

    write_gtimb(&mut w, doc)?;
    write_gdatgral(&mut w, doc, dp)?;
    write_gdtipde(&mut w, doc)?;

    match &doc.detail {
        DocumentDetail::AutoInvoice(seller) => write_sale_abroad(&mut w, seller)?,
        DocumentDetail::CreditNote(reference) | DocumentDetail::DebitNote(reference) => {
            write_gdocaso(&mut w, reference)?
        }
        DocumentDetail::RemissionNote(transport) => write_gcamtrans(&mut w, transport)?,
        DocumentDetail::Invoice => {}
    }

    w.end_element("rDE")?;
    w.into_string()
}

fn write_gtimb(w: &mut XmlWriter, doc: &Document) -> Result<(), XmlError> {
    w.start_element("gTimb")?;
    w.text_element("iTiDE", &doc.kind().code().to_string())?;
    w.text_element("dNumTim", &doc.head.timbrado.numero)?;
    w.text_element("dEst", &doc.head.timbrado.establecimiento)?;
    w.text_element("dPunExp", &doc.head.timbrado.punto_expedicion)?;
    w.text_element("dNumDoc", &doc.head.numero_documento)?;
    w.end_element("gTimb")
}

fn write_gdatgral(w: &mut XmlWriter, doc: &Document, dp: u32) -> Result<(), XmlError> {
    w.start_element("gDatGral")?;
    w.text_element("dFeEmiDE", &doc.head.issuance.format("%Y-%m-%dT%H:%M:%S").to_string())?;

    w.start_element("gDatEmi")?;
    w.text_element("dRucEm", &doc.head.issuer.ruc.base)?;
    w.text_element("dDVEmi", &doc.head.issuer.ruc.dv.to_string())?;
    w.text_element("dNomEmi", &doc.head.issuer.name)?;
    if let Some(address) = &doc.head.issuer.address {
        w.text_element("dDirEmi", address)?;
    }
    if let Some(city) = &doc.head.issuer.city {
        w.text_element("cCiudad", city)?;
    }
    w.end_element("gDatEmi")?;

    w.start_element("gDatRec")?;
    w.text_element("dRucRec", &doc.head.receiver.ruc.base)?;
    w.text_element("dDVRec", &doc.head.receiver.ruc.dv.to_string())?;
    w.text_element("dNomRec", &doc.head.receiver.name)?;
    if let Some(address) = &doc.head.receiver.address {
        w.text_element("dDirRec", address)?;
    }
    if let Some(country) = &doc.head.receiver.country_code {
        w.text_element("cPaisRec", country)?;
    }
    w.end_element("gDatRec")?;

    w.start_element("gItems")?;
    for line in &doc.head.lines {
        w.start_element("gItem")?;
        w.text_element("dCodInt", &line.code)?;
        w.text_element("dDesProSer", &line.description)?;
        w.text_element("cUniMed", &line.unit_code)?;
        w.text_element("dCantProSer", &format_amount(line.quantity, 4))?;
        w.text_element("dPUniProSer", &format_amount(line.unit_price, dp))?;
        w.text_element("iAfecIVA", iva_affectation_code(line.iva_affectation))?;
        w.text_element("dTasaIVA", iva_rate_text(line.iva_affectation))?;
        if let Some(taxable_base) = line.taxable_base {
            w.text_element("dBasGravIVA", &format_amount(taxable_base, dp))?;
        }
        if let Some(iva_amount) = line.iva_amount {
            w.text_element("dLiqIVAItem", &format_amount(iva_amount, dp))?;
        }
        if let Some(lot) = &line.lot {
            w.text_element("dNroLote", lot)?;
        }
        if let Some(serial) = &line.serial {
            w.text_element("dNroSerie", serial)?;
        }
        if let Some(ncm) = &line.ncm {
            w.text_element("dNCM", ncm)?;
        }
        if let Some(origin) = &line.origin_country {
            w.text_element("cPaisOrig", origin)?;
        }
        w.end_element("gItem")?;
    }
    w.end_element("gItems")?;

    w.start_element("gTotales")?;
    w.text_element("dSubExe", &format_amount(doc.head.totals.subtotal_exempt, dp))?;
    w.text_element("dSub5", &format_amount(doc.head.totals.subtotal_5, dp))?;
    w.text_element("dSub10", &format_amount(doc.head.totals.subtotal_10, dp))?;
    w.text_element("dIVA5", &format_amount(doc.head.totals.iva_5, dp))?;
    w.text_element("dIVA10", &format_amount(doc.head.totals.iva_10, dp))?;
    w.text_element("dTotGralOpe", &format_amount(doc.head.totals.subtotal, dp))?;
    w.text_element("dTotalGs", &format_amount(doc.head.totals.total, dp))?;
    w.text_element("cMoneOpe", &doc.head.totals.currency_code)?;
    if let Some(rate) = doc.head.totals.exchange_rate {
        w.text_element("dTipCam", &format_amount(rate, 4))?;
    }
    w.end_element("gTotales")?;

    w.end_element("gDatGral")
}

fn write_gdtipde(w: &mut XmlWriter, doc: &Document) -> Result<(), XmlError> {
    w.start_element("gDtipDE")?;
    w.text_element("cCodSeg", &doc.head.security_code)?;
    w.text_element("iTipEmi", &doc.head.emission_type.digit().to_string())?;
    w.end_element("gDtipDE")
}

fn write_sale_abroad(
    w: &mut XmlWriter,
    seller: &crate::core::ForeignSellerRecord,
) -> Result<(), XmlError> {
    w.start_element("gCamAE")?;
    w.text_element("iNatVen", &seller.naturaleza)?;
    w.text_element("iTipIDVen", &seller.document_type)?;
    w.text_element("dNumIDVen", &seller.document_number)?;
    w.text_element("dNomVen", &seller.name)?;
    w.text_element("dDirVen", &seller.address)?;
    w.text_element("cPaisVen", &seller.country_code)?;
    w.text_element("dCiudVen", &seller.transaction_city)?;
    w.end_element("gCamAE")
}

fn write_gdocaso(
    w: &mut XmlWriter,
    reference: &crate::core::AssociatedDocumentReference,
) -> Result<(), XmlError> {
    w.start_element("gDocAso")?;
    w.text_element("dCdCDERef", &reference.cdc)?;
    w.text_element("iTipDocAso", &reference.kind.code().to_string())?;
    w.text_element("dNTimDI", &reference.timbrado.numero)?;
    w.text_element("dEstDocAso", &reference.timbrado.establecimiento)?;
    w.text_element("dPExpDocAso", &reference.timbrado.punto_expedicion)?;
    w.text_element("dFeEmiDI", &reference.fecha_emision.format("%Y-%m-%d").to_string())?;
    w.end_element("gDocAso")
}

fn write_gcamtrans(
    w: &mut XmlWriter,
    transport: &crate::core::TransportRecord,
) -> Result<(), XmlError> {
    w.start_element("gCamTrans")?;
    w.text_element(
        "iModTrans",
        match transport.mode {
            TransportMode::Own => "1",
            TransportMode::ThirdParty => "2",
        },
    )?;
    w.text_element("dResponsable", &transport.responsible_party)?;
    w.text_element("dDirSalida", &transport.start_address)?;
    w.text_element("dDirLlegada", &transport.end_address)?;
    for vehicle in &transport.vehicles {
        w.start_element("gVehTras")?;
        w.text_element("dNroPlaca", &vehicle.plate)?;
        w.text_element("dNomCh", &vehicle.driver_name)?;
        w.text_element("dNumIDCh", &vehicle.driver_document)?;
        w.end_element("gVehTras")?;
    }
    w.end_element("gCamTrans")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn sample_doc() -> Document {
        let issuer = PartyBuilder::new(Ruc::new("80000001", 7).unwrap(), "Acme SA").build();
        let receiver = PartyBuilder::new(Ruc::new("80000002", 4).unwrap(), "Cliente").build();
        let line = LineItemBuilder::new("ITEM-1", "Widget", dec!(2), "77", dec!(50000))
            .iva(IvaAffectation::Rate10)
            .build();

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
    fn assembles_minimal_invoice() {
        let doc = sample_doc();
        let xml = to_modular_xml(&doc, &"0".repeat(44)).unwrap();
        assert!(xml.contains("<gTimb>"));
        assert!(xml.contains("<gItems>"));
        assert!(xml.contains("<dTotalGs>100000.00</dTotalGs>"));
        assert!(!xml.contains('\n'));
    }

    #[test]
    fn contingency_emission_type_is_reflected() {
        let issuer = PartyBuilder::new(Ruc::new("80000001", 7).unwrap(), "Acme SA").build();
        let receiver = PartyBuilder::new(Ruc::new("80000002", 4).unwrap(), "Cliente").build();
        let line = LineItemBuilder::new("ITEM-1", "Widget", dec!(1), "77", dec!(1000)).build();
        let doc = DocumentBuilder::new()
            .issuer(issuer)
            .receiver(receiver)
            .add_line(line)
            .timbrado(TimbradoRef {
                numero: "12345678".into(),
                establecimiento: "001".into(),
                punto_expedicion: "001".into(),
            })
            .numero_documento("0000002")
            .issuance(
                NaiveDate::from_ymd_opt(2025, 1, 15)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
            )
            .security_code("000123456")
            .contingency()
            .build_invoice()
            .unwrap();

        let xml = to_modular_xml(&doc, &"0".repeat(44)).unwrap();
        assert!(xml.contains("<iTipEmi>2</iTipEmi>"));
    }
}
