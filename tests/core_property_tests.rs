//! Property-based invariants for the primitives and document totals.
//!
//! Run with: `cargo test --features all --test core_property_tests`

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use sifen::core::*;

fn ruc_base_strategy() -> impl Strategy<Value = String> {
    (10_000_000u32..99_999_999u32).prop_map(|n| n.to_string())
}

proptest! {
    // Every base computed a check digit for validates against that same
    // check digit — generation and validation must agree with each other.
    #[test]
    fn ruc_check_digit_is_self_consistent(base in ruc_base_strategy()) {
        let dv = compute_dv(&base).unwrap();
        prop_assert!(validate_ruc(&base, dv).is_ok());

        let wrong_dv = (dv + 1) % 11;
        if wrong_dv != dv {
            prop_assert!(validate_ruc(&base, wrong_dv).is_err());
        }
    }

    // Any document number, establishment, and expedition point combination
    // that passes through `generate_cdc` decomposes back to the same
    // fields via `validate_cdc`.
    #[test]
    fn generated_cdc_decomposes_to_the_same_fields(
        ruc_digits in 10_000_000u32..99_999_999u32,
        establecimiento in 1u32..999u32,
        punto_expedicion in 1u32..999u32,
        numero in 1u32..9_999_999u32,
    ) {
        let ruc_base = ruc_digits.to_string();
        let ruc_dv = compute_dv(&ruc_base).unwrap();
        let request = CdcGenerationRequest {
            ruc_base: ruc_base.clone(),
            ruc_dv,
            kind: DocumentKind::Invoice,
            establecimiento: format!("{establecimiento:03}"),
            punto_expedicion: format!("{punto_expedicion:03}"),
            numero_documento: format!("{numero:07}"),
            fecha_emision: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            emission_type: EmissionType::Normal,
            security_code: "000000001".to_string(),
        };

        let cdc = generate_cdc(&request).unwrap();
        prop_assert_eq!(cdc.len(), CDC_LEN);

        let components = validate_cdc(&cdc).unwrap();
        prop_assert_eq!(components.ruc_base, ruc_base);
        prop_assert_eq!(components.numero_documento, format!("{numero:07}"));
    }

    // Document totals always equal the sum of each line's computed total,
    // regardless of quantity/price magnitude (within a sane range).
    #[test]
    fn document_totals_equal_the_sum_of_line_totals(
        quantity in 1i64..1000i64,
        unit_price in 1i64..10_000_000i64,
    ) {
        let issuer = PartyBuilder::new(Ruc::new("80000001", 7).unwrap(), "Prop Seller SA").build();
        let receiver = PartyBuilder::new(Ruc::new("80000002", 4).unwrap(), "Prop Buyer SRL").build();
        let line = LineItemBuilder::new(
            "SKU1",
            "Widget",
            Decimal::from(quantity),
            "77",
            Decimal::from(unit_price),
        )
        .iva(IvaAffectation::Rate10)
        .build();

        let doc = DocumentBuilder::new()
            .issuer(issuer)
            .receiver(receiver)
            .add_line(line)
            .timbrado(TimbradoRef {
                numero: "12345678".into(),
                establecimiento: "001".into(),
                punto_expedicion: "001".into(),
            })
            .numero_documento("0000001")
            .issuance(core::clock_util::now_local())
            .security_code("000000001")
            .build_invoice()
            .unwrap();

        let expected: Decimal = doc
            .head
            .lines
            .iter()
            .map(|l| l.taxable_base.unwrap_or_default() + l.iva_amount.unwrap_or_default())
            .sum();
        prop_assert_eq!(doc.head.totals.total, expected);
    }
}
