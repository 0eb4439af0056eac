use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::{X509Name, X509};
use rust_decimal_macros::dec;

use sifen::core::*;
use sifen::signer::{self, Keystore};
use sifen::xml::to_modular_xml;

fn sample_document() -> Document {
    let issuer = PartyBuilder::new(Ruc::new("80000001", 7).unwrap(), "Acme SA").build();
    let receiver = PartyBuilder::new(Ruc::new("80000002", 4).unwrap(), "Cliente").build();

    let mut builder = DocumentBuilder::new()
        .issuer(issuer)
        .receiver(receiver)
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
        .security_code("000123456");

    for i in 1..=10 {
        builder = builder.add_line(
            LineItemBuilder::new(format!("ITEM-{i}"), format!("Widget {i}"), dec!(2), "77", dec!(50000))
                .iva(IvaAffectation::Rate10)
                .build(),
        );
    }

    builder.build_invoice().unwrap()
}

fn sample_keystore() -> Keystore {
    let rsa = Rsa::generate(2048).unwrap();
    let private_key = PKey::from_rsa(rsa).unwrap();

    let mut name = X509Name::builder().unwrap();
    name.append_entry_by_text("CN", "Benchmark Issuer").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&private_key).unwrap();
    builder
        .set_not_before(&openssl::asn1::Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&openssl::asn1::Asn1Time::days_from_now(365).unwrap())
        .unwrap();
    builder.sign(&private_key, MessageDigest::sha256()).unwrap();
    let certificate = builder.build();

    Keystore {
        certificate,
        private_key,
    }
}

fn bench_assemble(c: &mut Criterion) {
    let doc = sample_document();
    c.bench_function("assemble_modular_xml_10_lines", |b| {
        b.iter(|| black_box(to_modular_xml(black_box(&doc), black_box(&"0".repeat(44)))));
    });
}

fn bench_sign(c: &mut Criterion) {
    let doc = sample_document();
    let xml = to_modular_xml(&doc, &"0".repeat(44)).unwrap();
    let keystore = sample_keystore();
    c.bench_function("sign_10_line_document", |b| {
        b.iter(|| black_box(signer::sign(black_box(&xml), black_box(&keystore))));
    });
}

fn bench_verify(c: &mut Criterion) {
    let doc = sample_document();
    let xml = to_modular_xml(&doc, &"0".repeat(44)).unwrap();
    let keystore = sample_keystore();
    let signed = signer::sign(&xml, &keystore).unwrap();
    c.bench_function("verify_10_line_document", |b| {
        b.iter(|| black_box(signer::verify(black_box(&signed))));
    });
}

criterion_group!(benches, bench_assemble, bench_sign, bench_verify);
criterion_main!(benches);
