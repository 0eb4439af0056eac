//! End-to-end scenarios for `DocumentSender` against `MockSet`, exercising
//! the full validate→sign→send→parse→classify→retry pipeline without any
//! network.

#![cfg(all(feature = "transport", feature = "mock"))]

use rust_decimal_macros::dec;
use sifen::core::*;
use sifen::mock::MockSet;
use sifen::signer::Keystore;
use sifen::transport::{DocumentSender, Environment, SenderConfig};

use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::{X509Name, X509};

fn self_signed_keystore() -> Keystore {
    let rsa = Rsa::generate(2048).unwrap();
    let private_key = PKey::from_rsa(rsa).unwrap();

    let mut name = X509Name::builder().unwrap();
    name.append_entry_by_text("CN", "Integration Test Issuer").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&private_key).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(365).unwrap()).unwrap();
    builder.sign(&private_key, MessageDigest::sha256()).unwrap();
    let certificate = builder.build();

    Keystore { certificate, private_key }
}

fn sender_config() -> SenderConfig {
    SenderConfig::builder(Environment::Test, "80000001")
        .certificate("unused.p12", "unused")
        .max_retries(3)
        .build()
        .unwrap()
}

fn seller() -> Party {
    PartyBuilder::new(Ruc::new("80000001", 7).unwrap(), "Integration Seller SA").build()
}

fn buyer() -> Party {
    PartyBuilder::new(Ruc::new("80000002", 4).unwrap(), "Integration Buyer SRL").build()
}

fn sample_invoice(numero: &str) -> Document {
    let line = LineItemBuilder::new("SKU1", "Widget", dec!(2), "77", dec!(50_000))
        .iva(IvaAffectation::Rate10)
        .build();

    DocumentBuilder::new()
        .issuer(seller())
        .receiver(buyer())
        .add_line(line)
        .timbrado(TimbradoRef {
            numero: "12345678".into(),
            establecimiento: "001".into(),
            punto_expedicion: "001".into(),
        })
        .numero_documento(numero)
        .issuance(core::clock_util::now_local())
        .security_code("123456789")
        .build_invoice()
        .unwrap()
}

// S1: happy path — a well-formed invoice is accepted on the first attempt.
#[tokio::test]
async fn happy_path_single_submission_is_accepted() {
    let mock = MockSet::always_succeeds();
    let sender = DocumentSender::new(sender_config(), mock, self_signed_keystore());

    let result = sender.send_one(&sample_invoice("0000001")).await.unwrap();
    assert!(result.success);
    assert_eq!(result.attempts, 1);
}

// A persistent communication-category failure is retried up to the
// configured maximum before surfacing as an error with every attempt
// accounted for.
#[tokio::test]
async fn persistent_transient_failure_exhausts_retries() {
    let mock = MockSet::always_fails(4500, "simulated communication failure");
    mock.configure(sifen::mock::MockSetConfig {
        simulate_latency: false,
        ..Default::default()
    });
    let sender = DocumentSender::new(sender_config(), mock, self_signed_keystore());

    let result = sender.send_one(&sample_invoice("0000002")).await;
    let err = result.unwrap_err();
    assert_eq!(err.set_code, Some(4500));
    assert_eq!(err.attempt, 3);
}

// S3: a document with an invalid total is rejected by validation before
// any signing or network call occurs.
#[tokio::test]
async fn invalid_document_is_rejected_before_signing() {
    let mock = MockSet::always_succeeds();
    let mut doc = sample_invoice("0000003");
    doc.head.lines[0].quantity = dec!(-1);

    let sender = DocumentSender::new(sender_config(), mock, self_signed_keystore());
    let result = sender.send_one(&doc).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err().attempt, 0);
}

// S4: a stale contingency-mode document (issued more than 30 days ago) is
// rejected locally without contacting SET at all.
#[tokio::test]
async fn stale_contingency_document_is_rejected_without_network() {
    let mock = MockSet::always_succeeds();
    let mut doc = sample_invoice("0000004");
    doc.head.emission_type = EmissionType::Contingency;
    doc.head.issuance -= chrono::Duration::hours(800);

    let sender = DocumentSender::new(sender_config(), mock, self_signed_keystore());
    let result = sender.send_one(&doc).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err().attempt, 0);
}

// S5: a batch with one malformed document is rejected in its entirety
// before any document in the batch is signed.
#[tokio::test]
async fn batch_with_one_invalid_document_is_rejected_whole() {
    let mock = MockSet::always_succeeds();
    let good = sample_invoice("0000005");
    let mut bad = sample_invoice("0000006");
    bad.head.lines[0].quantity = dec!(-1);

    let sender = DocumentSender::new(sender_config(), mock, self_signed_keystore());
    let result = sender.send_batch(&[good, bad]).await;

    assert!(result.is_err());
    assert!(result.unwrap_err().message.contains("index 1"));
}

// S6: tampering with a signed payload after signing is detected on verify.
#[test]
fn tampered_signature_fails_verification() {
    let keystore = self_signed_keystore();
    let xml = "<rDE Id=\"0100000012345670010010000000112345678\">\
               <gTimb><dNumTim>12345678</dNumTim></gTimb></rDE>";
    let signed = sifen::signer::sign(xml, &keystore).unwrap();

    let tampered = signed.replacen(
        "<dNumTim>12345678</dNumTim>",
        "<dNumTim>99999999</dNumTim>",
        1,
    );

    let result = sifen::signer::verify(&tampered).unwrap();
    assert!(!result.valid);
}
