//! `DocumentSender`: validate → sign → send → parse → classify → retry
//! (§4.9, §4.10).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rand::{thread_rng, Rng};
use tracing::{debug, error, info, info_span, warn};

use crate::core::{self, Document};
use crate::signer::{self, Keystore};
use crate::xml;

use super::classifier::classify;
use super::config::{Environment, SenderConfig};
use super::error::{ClassifiedError, ErrorKind, TransportError};
use super::rate_limit::RateLimiter;
use super::response::{parse_batch_response, parse_response, DocumentStatus};
use super::retry::{next_delay, RetryPolicy};
use super::soap::SetTransport;

const EXTEMPORANEOUS_HOURS: i64 = 72;
const CONTINGENCY_HARD_LIMIT_HOURS: i64 = 720;

/// Outcome of a single-document submission (§4.10).
#[derive(Debug, Clone)]
pub struct SendResult {
    pub success: bool,
    pub cdc: String,
    pub protocol: Option<String>,
    pub status: DocumentStatus,
    pub errors: Vec<String>,
    pub attempts: u32,
    pub duration_ms: u64,
}

/// Outcome of a `send_batch` call, with per-document sub-results in request
/// order and aggregate flags over them.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub results: Vec<SendResult>,
    pub all_accepted: bool,
    pub partially_accepted: bool,
    pub all_rejected: bool,
}

/// Outcome of a `query` lookup.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub status: DocumentStatus,
    pub protocol: Option<String>,
    pub errors: Vec<String>,
}

fn build_cdc(doc: &Document) -> Result<String, core::CoreError> {
    let request = core::CdcGenerationRequest {
        ruc_base: doc.head.issuer.ruc.base.clone(),
        ruc_dv: doc.head.issuer.ruc.dv,
        kind: doc.kind(),
        establecimiento: doc.head.timbrado.establecimiento.clone(),
        punto_expedicion: doc.head.timbrado.punto_expedicion.clone(),
        numero_documento: doc.head.numero_documento.clone(),
        fecha_emision: doc.head.issuance.date(),
        emission_type: doc.head.emission_type,
        security_code: doc.head.security_code.clone(),
    };
    core::generate_cdc(&request)
}

fn contingency_age_hours(doc: &Document) -> i64 {
    (core::clock_util::now_local() - doc.head.issuance).num_hours()
}

/// Log a classified outcome at the level §10.1 prescribes: validation
/// problems are expected caller-facing data issues (`debug`); transient and
/// throttle classifications are operationally interesting (`warn`);
/// rejections and system errors get an operator's attention (`error`).
fn log_classification(classified: &ClassifiedError) {
    match classified.kind {
        ErrorKind::Validation => {
            debug!(set_code = ?classified.set_code, message = %classified.message, "validation failure")
        }
        ErrorKind::Transient | ErrorKind::Throttle => {
            warn!(set_code = ?classified.set_code, kind = ?classified.kind, attempt = classified.attempt, "retriable failure")
        }
        ErrorKind::Rejected | ErrorKind::System | ErrorKind::Signing => {
            error!(set_code = ?classified.set_code, kind = ?classified.kind, message = %classified.message, "non-retriable failure")
        }
        ErrorKind::Cancelled => {
            warn!(attempt = classified.attempt, "submission cancelled")
        }
        ErrorKind::Observations => {
            info!(set_code = ?classified.set_code, "accepted")
        }
    }
}

/// Holds a claim on `pending` documents out of the sender's configured
/// `queue_depth` for as long as a submission is in flight; releases them on
/// drop regardless of how the submission ends.
struct QueueSlot<'a> {
    pending: &'a AtomicUsize,
    count: usize,
}

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        self.pending.fetch_sub(self.count, Ordering::SeqCst);
    }
}

/// Orchestrates the full submission pipeline against one `SetTransport`
/// backend. Generic rather than boxed: a sender is built against exactly
/// one backend (real [`super::SoapClient`] or a test double) for its
/// lifetime, so there is no need for dynamic dispatch.
pub struct DocumentSender<T: SetTransport> {
    config: SenderConfig,
    transport: T,
    keystore: Keystore,
    limiter: RateLimiter,
    retry_policy: RetryPolicy,
    pending: AtomicUsize,
}

impl<T: SetTransport> DocumentSender<T> {
    pub fn new(config: SenderConfig, transport: T, keystore: Keystore) -> Self {
        let limiter = RateLimiter::new(
            config.rate_limits.per_ruc_per_sec,
            config.rate_limits.per_ip_per_min,
            config.rate_limits.concurrent_per_ruc,
            config.rate_limits.batches_per_ruc_per_min,
        );
        let retry_policy = RetryPolicy::new(config.max_retries);
        Self {
            config,
            transport,
            keystore,
            limiter,
            retry_policy,
            pending: AtomicUsize::new(0),
        }
    }

    /// Claim `count` slots out of the configured `queue_depth`, atomically
    /// and without blocking (§5: "queue-overflow" is an immediate rejection,
    /// never a wait). `None` means the queue is full.
    fn try_enter_queue(&self, count: usize) -> Option<QueueSlot<'_>> {
        let mut current = self.pending.load(Ordering::SeqCst);
        loop {
            if current + count > self.config.queue_depth {
                return None;
            }
            match self.pending.compare_exchange(
                current,
                current + count,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    return Some(QueueSlot {
                        pending: &self.pending,
                        count,
                    })
                }
                Err(observed) => current = observed,
            }
        }
    }

    fn should_retry(&self, kind: ErrorKind, attempt: u32) -> bool {
        kind.is_retriable() && attempt < self.retry_policy.max_attempts as u32
    }

    /// Wait before the next attempt. Throttle classifications rely on the
    /// rate limiter's own token bucket (awaited again on the next loop
    /// iteration via `admit`) rather than sleeping blindly on top of it.
    async fn backoff(&self, kind: ErrorKind, delay: &mut Duration, rng: &mut impl Rng) {
        if kind != ErrorKind::Throttle {
            *delay = next_delay(*delay, rng);
            debug!(delay_ms = delay.as_millis() as u64, "backing off before retry");
            tokio::time::sleep(*delay).await;
        }
    }

    fn pre_network_error(
        &self,
        kind: ErrorKind,
        message: String,
        fingerprint: &str,
        start: Instant,
    ) -> ClassifiedError {
        let classified = ClassifiedError {
            kind,
            set_code: None,
            message,
            remediation: "correct the document before resubmitting".to_string(),
            attempt: 0,
            elapsed_ms: start.elapsed().as_millis() as u64,
            fingerprint: fingerprint.to_string(),
        };
        log_classification(&classified);
        classified
    }

    fn transport_error_to_classified(
        &self,
        err: TransportError,
        attempt: u32,
        elapsed_ms: u64,
        fingerprint: &str,
    ) -> ClassifiedError {
        let kind = match &err {
            TransportError::Http(_) | TransportError::Timeout(_) => ErrorKind::Transient,
            TransportError::Cancelled => ErrorKind::Cancelled,
            TransportError::QueueOverflow(_) | TransportError::BatchLimit(_) => ErrorKind::Rejected,
            TransportError::SoapFault(_) | TransportError::MalformedResponse(_) => ErrorKind::System,
        };
        ClassifiedError {
            kind,
            set_code: None,
            message: err.to_string(),
            remediation: "retry the request or inspect connectivity".to_string(),
            attempt,
            elapsed_ms,
            fingerprint: fingerprint.to_string(),
        }
    }

    /// Validate, sign, and submit one document, retrying transient and
    /// throttle classifications per the configured [`RetryPolicy`]. The
    /// signed bytes are produced once; a retry re-sends them unchanged so
    /// correlation by fingerprint still holds.
    pub async fn send_one(&self, doc: &Document) -> Result<SendResult, ClassifiedError> {
        let fingerprint = doc.fingerprint();
        let span = info_span!("send_one", fingerprint = %fingerprint);
        let _entered = span.enter();
        let start = Instant::now();

        let _queue_slot = self.try_enter_queue(1).ok_or_else(|| {
            self.pre_network_error(
                ErrorKind::Rejected,
                TransportError::QueueOverflow(self.config.queue_depth).to_string(),
                &fingerprint,
                start,
            )
        })?;

        let validation_errors = core::validate(doc);
        if !validation_errors.is_empty() {
            let joined = validation_errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(self.pre_network_error(ErrorKind::Validation, joined, &fingerprint, start));
        }

        if doc.head.emission_type == core::EmissionType::Contingency {
            let age = contingency_age_hours(doc);
            if age > CONTINGENCY_HARD_LIMIT_HOURS {
                return Err(self.pre_network_error(
                    ErrorKind::Rejected,
                    format!(
                        "contingency document is {age}h old, exceeds the {CONTINGENCY_HARD_LIMIT_HOURS}h hard limit"
                    ),
                    &fingerprint,
                    start,
                ));
            }
            if age > EXTEMPORANEOUS_HOURS {
                debug!(age, "contingency document is extemporaneous, submitting anyway");
            }
        }

        let cdc = build_cdc(doc)
            .map_err(|e| self.pre_network_error(ErrorKind::Validation, e.to_string(), &fingerprint, start))?;
        let modular = xml::to_modular_xml(doc, &cdc)
            .map_err(|e| self.pre_network_error(ErrorKind::System, e.to_string(), &fingerprint, start))?;
        let official = xml::modular_to_official(&modular)
            .map_err(|e| self.pre_network_error(ErrorKind::System, e.to_string(), &fingerprint, start))?;
        let signed_xml = signer::sign(&official, &self.keystore)
            .map_err(|e| self.pre_network_error(ErrorKind::Signing, e.to_string(), &fingerprint, start))?;

        let mut attempt = 0u32;
        let mut delay = Duration::ZERO;
        let mut rng = thread_rng();

        loop {
            attempt += 1;
            let permit = self.limiter.admit(&self.config.ruc_emisor).await;
            let raw_result = self.transport.send_single(&signed_xml).await;
            drop(permit);
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match raw_result.and_then(|body| parse_response(&body)) {
                Ok(response) => {
                    let classified = classify(&response, attempt, elapsed_ms, &fingerprint);
                    log_classification(&classified);
                    if self.should_retry(classified.kind, attempt) {
                        self.backoff(classified.kind, &mut delay, &mut rng).await;
                        continue;
                    }
                    if classified.kind == ErrorKind::Observations {
                        return Ok(SendResult {
                            success: true,
                            cdc,
                            protocol: response.protocol_number,
                            status: response.document_status,
                            errors: response.errors,
                            attempts: attempt,
                            duration_ms: elapsed_ms,
                        });
                    }
                    return Err(classified);
                }
                Err(e) => {
                    let classified = self.transport_error_to_classified(e, attempt, elapsed_ms, &fingerprint);
                    log_classification(&classified);
                    if self.should_retry(classified.kind, attempt) {
                        self.backoff(classified.kind, &mut delay, &mut rng).await;
                        continue;
                    }
                    return Err(classified);
                }
            }
        }
    }

    /// Blocking counterpart for callers without a runtime of their own.
    /// Spins up a dedicated Tokio runtime for the call; do not invoke this
    /// from inside an existing async context.
    pub fn send_one_blocking(&self, doc: &Document) -> Result<SendResult, ClassifiedError> {
        blocking_runtime().block_on(self.send_one(doc))
    }

    /// Validate and sign every document before submitting any of them as a
    /// single SET batch (S5: a malformed document anywhere in the batch
    /// rejects the whole batch with no HTTP request made).
    pub async fn send_batch(&self, docs: &[Document]) -> Result<BatchResult, ClassifiedError> {
        let fingerprint = format!("batch:{}", docs.len());
        let span = info_span!("send_batch", size = docs.len());
        let _entered = span.enter();
        let start = Instant::now();

        if docs.is_empty() {
            return Err(self.pre_network_error(
                ErrorKind::Validation,
                "batch must contain at least one document".to_string(),
                &fingerprint,
                start,
            ));
        }
        if docs.len() > self.config.max_batch_documents {
            return Err(self.pre_network_error(
                ErrorKind::Rejected,
                format!(
                    "batch of {} documents exceeds the {}-document limit",
                    docs.len(),
                    self.config.max_batch_documents
                ),
                &fingerprint,
                start,
            ));
        }
        if !self.limiter.try_admit_batch(&self.config.ruc_emisor) {
            return Err(self.pre_network_error(
                ErrorKind::Throttle,
                TransportError::BatchLimit(format!(
                    "RUC {} exceeded {} batches per minute",
                    self.config.ruc_emisor, self.config.rate_limits.batches_per_ruc_per_min
                ))
                .to_string(),
                &fingerprint,
                start,
            ));
        }
        let _queue_slot = self.try_enter_queue(docs.len()).ok_or_else(|| {
            self.pre_network_error(
                ErrorKind::Rejected,
                TransportError::QueueOverflow(self.config.queue_depth).to_string(),
                &fingerprint,
                start,
            )
        })?;

        for (index, doc) in docs.iter().enumerate() {
            let errors = core::validate(doc);
            if !errors.is_empty() {
                let joined = errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
                return Err(self.pre_network_error(
                    ErrorKind::Validation,
                    format!("document at index {index} failed validation: {joined}"),
                    &fingerprint,
                    start,
                ));
            }
        }

        let mut cdcs = Vec::with_capacity(docs.len());
        let mut signed = Vec::with_capacity(docs.len());
        let mut total_bytes: u64 = 0;

        for (index, doc) in docs.iter().enumerate() {
            let cdc = build_cdc(doc).map_err(|e| {
                self.pre_network_error(ErrorKind::Validation, format!("document at index {index}: {e}"), &fingerprint, start)
            })?;
            let modular = xml::to_modular_xml(doc, &cdc).map_err(|e| {
                self.pre_network_error(ErrorKind::System, format!("document at index {index}: {e}"), &fingerprint, start)
            })?;
            let official = xml::modular_to_official(&modular).map_err(|e| {
                self.pre_network_error(ErrorKind::System, format!("document at index {index}: {e}"), &fingerprint, start)
            })?;

            let size = official.len() as u64;
            if size > self.config.max_document_bytes {
                return Err(self.pre_network_error(
                    ErrorKind::Rejected,
                    format!(
                        "document at index {index} is {size} bytes, exceeds the {}-byte single-document limit",
                        self.config.max_document_bytes
                    ),
                    &fingerprint,
                    start,
                ));
            }
            total_bytes += size;
            if total_bytes > self.config.max_batch_bytes {
                return Err(self.pre_network_error(
                    ErrorKind::Rejected,
                    format!("batch total exceeds the {}-byte limit", self.config.max_batch_bytes),
                    &fingerprint,
                    start,
                ));
            }

            let signed_xml = signer::sign(&official, &self.keystore).map_err(|e| {
                self.pre_network_error(ErrorKind::Signing, format!("document at index {index}: {e}"), &fingerprint, start)
            })?;
            cdcs.push(cdc);
            signed.push(signed_xml);
        }

        // Same-(issuer, establishment, expedition-point) submissions serialize
        // in fingerprint order; the result array is remapped back to input order.
        let mut submit_order: Vec<usize> = (0..docs.len()).collect();
        submit_order.sort_by_key(|&i| docs[i].fingerprint());
        let ordered_signed: Vec<String> = submit_order.iter().map(|&i| signed[i].clone()).collect();

        let (responses, attempts) = self.submit_batch(&ordered_signed, &fingerprint, start).await?;
        if responses.len() != ordered_signed.len() {
            return Err(self.pre_network_error(
                ErrorKind::System,
                format!("SET returned {} results for a batch of {}", responses.len(), ordered_signed.len()),
                &fingerprint,
                start,
            ));
        }
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let mut by_original: Vec<Option<SendResult>> = (0..docs.len()).map(|_| None).collect();
        for (slot, &original_index) in submit_order.iter().enumerate() {
            let response = &responses[slot];
            by_original[original_index] = Some(SendResult {
                success: response.success,
                cdc: cdcs[original_index].clone(),
                protocol: response.protocol_number.clone(),
                status: response.document_status,
                errors: response.errors.clone(),
                attempts,
                duration_ms: elapsed_ms,
            });
        }
        let results: Vec<SendResult> = by_original
            .into_iter()
            .map(|r| r.expect("every submitted index is filled"))
            .collect();

        let all_accepted = results.iter().all(|r| r.success);
        let all_rejected = results.iter().all(|r| !r.success);
        Ok(BatchResult {
            all_accepted,
            all_rejected,
            partially_accepted: !all_accepted && !all_rejected,
            results,
        })
    }

    async fn submit_batch(
        &self,
        signed_xmls: &[String],
        fingerprint: &str,
        start: Instant,
    ) -> Result<(Vec<super::response::Response>, u32), ClassifiedError> {
        let mut attempt = 0u32;
        let mut delay = Duration::ZERO;
        let mut rng = thread_rng();

        loop {
            attempt += 1;
            let permit = self.limiter.admit(&self.config.ruc_emisor).await;
            let raw_result = self.transport.send_batch(signed_xmls).await;
            drop(permit);
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match raw_result.and_then(|body| parse_batch_response(&body)) {
                Ok(responses) => return Ok((responses, attempt)),
                Err(e) => {
                    let classified = self.transport_error_to_classified(e, attempt, elapsed_ms, fingerprint);
                    log_classification(&classified);
                    if self.should_retry(classified.kind, attempt) {
                        self.backoff(classified.kind, &mut delay, &mut rng).await;
                        continue;
                    }
                    return Err(classified);
                }
            }
        }
    }

    /// Look up a document's current state in SET by CDC.
    pub async fn query(&self, cdc: &str) -> Result<QueryResult, ClassifiedError> {
        let fingerprint = format!("query:{cdc}");
        let span = info_span!("query", cdc = %cdc);
        let _entered = span.enter();
        let start = Instant::now();

        let mut attempt = 0u32;
        let mut delay = Duration::ZERO;
        let mut rng = thread_rng();

        loop {
            attempt += 1;
            let permit = self.limiter.admit(&self.config.ruc_emisor).await;
            let raw_result = self.transport.query_by_cdc(cdc).await;
            drop(permit);
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match raw_result.and_then(|body| parse_response(&body)) {
                Ok(response) => {
                    let classified = classify(&response, attempt, elapsed_ms, &fingerprint);
                    log_classification(&classified);
                    if self.should_retry(classified.kind, attempt) {
                        self.backoff(classified.kind, &mut delay, &mut rng).await;
                        continue;
                    }
                    return Ok(QueryResult {
                        status: response.document_status,
                        protocol: response.protocol_number,
                        errors: response.errors,
                    });
                }
                Err(e) => {
                    let classified = self.transport_error_to_classified(e, attempt, elapsed_ms, &fingerprint);
                    log_classification(&classified);
                    if self.should_retry(classified.kind, attempt) {
                        self.backoff(classified.kind, &mut delay, &mut rng).await;
                        continue;
                    }
                    return Err(classified);
                }
            }
        }
    }

    /// Blocking counterpart of [`Self::query`].
    pub fn query_blocking(&self, cdc: &str) -> Result<QueryResult, ClassifiedError> {
        blocking_runtime().block_on(self.query(cdc))
    }
}

fn blocking_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().expect("failed to start a tokio runtime for the blocking wrapper")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DocumentBuilder, IvaAffectation, LineItemBuilder, PartyBuilder, Ruc, TimbradoRef};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct ScriptedTransport {
        responses: Vec<Result<String, TransportError>>,
        calls: Arc<AtomicU32>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<String, TransportError>>) -> Self {
            Self {
                responses,
                calls: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    impl SetTransport for ScriptedTransport {
        async fn send_single(&self, _signed_xml: &str) -> Result<String, TransportError> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            self.responses[index.min(self.responses.len() - 1)].clone()
        }

        async fn send_batch(&self, _signed_xmls: &[String]) -> Result<String, TransportError> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            self.responses[index.min(self.responses.len() - 1)].clone()
        }

        async fn query_by_cdc(&self, _cdc: &str) -> Result<String, TransportError> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            self.responses[index.min(self.responses.len() - 1)].clone()
        }

        async fn query_batch_status(&self, _batch_id: &str) -> Result<String, TransportError> {
            unreachable!("not exercised by these tests")
        }
    }

    fn sample_keystore() -> Keystore {
        use openssl::asn1::Asn1Time;
        use openssl::hash::MessageDigest;
        use openssl::pkey::PKey;
        use openssl::rsa::Rsa;
        use openssl::x509::{X509Name, X509};

        let rsa = Rsa::generate(2048).unwrap();
        let key = PKey::from_rsa(rsa).unwrap();
        let mut name = X509Name::builder().unwrap();
        name.append_entry_by_text("CN", "Test Issuer").unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(365).unwrap())
            .unwrap();
        builder.sign(&key, MessageDigest::sha256()).unwrap();
        let certificate = builder.build();

        Keystore { certificate, private_key: key }
    }

    fn sample_config() -> SenderConfig {
        SenderConfig::builder(Environment::Test, "80000001")
            .certificate("/tmp/cert.p12", "secret")
            .max_retries(3)
            .build()
            .unwrap()
    }

    fn sample_document() -> crate::core::Document {
        let issuer = PartyBuilder::new(Ruc::new("80000001", 7).unwrap(), "Seller SA").build();
        let receiver = PartyBuilder::new(Ruc::new("80000002", 4).unwrap(), "Buyer SRL").build();
        let line = LineItemBuilder::new("SKU1", "Widget", dec!(2), "77", dec!(50000))
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
            .issuance(core::clock_util::now_local())
            .security_code("123456789")
            .build_invoice()
            .unwrap()
    }

    #[tokio::test]
    async fn send_one_succeeds_on_accepted_response() {
        let transport = ScriptedTransport::new(vec![Ok(
            "<rRetEnviDe><dCodRes>260</dCodRes><dMsgRes>Aprobado</dMsgRes><dProtAut>99</dProtAut></rRetEnviDe>"
                .to_string(),
        )]);
        let sender = DocumentSender::new(sample_config(), transport, sample_keystore());
        let result = sender.send_one(&sample_document()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.protocol.as_deref(), Some("99"));
    }

    #[tokio::test]
    async fn send_one_retries_transient_error_then_succeeds() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Http("connection reset".into())),
            Ok("<rRetEnviDe><dCodRes>260</dCodRes><dMsgRes>Aprobado</dMsgRes></rRetEnviDe>".to_string()),
        ]);
        let sender = DocumentSender::new(sample_config(), transport, sample_keystore());
        let result = sender.send_one(&sample_document()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.attempts, 2);
    }

    #[tokio::test]
    async fn send_one_surfaces_validation_rejection_without_signing() {
        let transport = ScriptedTransport::new(vec![Ok(String::new())]);
        let sender = DocumentSender::new(sample_config(), transport, sample_keystore());

        let mut doc = sample_document();
        doc.head.lines[0].unit_price = dec!(-1);

        let err = sender.send_one(&doc).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.attempt, 0);
        assert_eq!(sender.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn send_one_rejects_stale_contingency_document() {
        let transport = ScriptedTransport::new(vec![Ok(String::new())]);
        let sender = DocumentSender::new(sample_config(), transport, sample_keystore());

        let mut doc = sample_document();
        doc.head.emission_type = crate::core::EmissionType::Contingency;
        doc.head.issuance = doc.head.issuance - chrono::Duration::hours(800);

        let err = sender.send_one(&doc).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Rejected);
        assert_eq!(sender.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn send_batch_rejects_before_signing_when_one_document_is_invalid() {
        let transport = ScriptedTransport::new(vec![Ok(String::new())]);
        let sender = DocumentSender::new(sample_config(), transport, sample_keystore());

        let good = sample_document();
        let mut bad = sample_document();
        bad.head.lines[0].unit_price = dec!(-1);

        let err = sender.send_batch(&[good, bad]).await.unwrap_err();
        assert!(err.message.contains("index 1"));
        assert_eq!(sender.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn send_batch_reports_per_document_results_in_request_order() {
        let raw = "<rRetEnviLoteDe>\
                   <gResProcLote><dCodRes>260</dCodRes><dMsgRes>Aprobado</dMsgRes></gResProcLote>\
                   <gResProcLote><dCodRes>920</dCodRes><dMsgRes>Rechazado</dMsgRes></gResProcLote>\
                   </rRetEnviLoteDe>";
        let transport = ScriptedTransport::new(vec![Ok(raw.to_string())]);
        let sender = DocumentSender::new(sample_config(), transport, sample_keystore());

        let first = sample_document();
        let mut second = sample_document();
        second.head.numero_documento = "0000002".to_string();

        let batch = sender.send_batch(&[first, second]).await.unwrap();
        assert_eq!(batch.results.len(), 2);
        assert!(batch.partially_accepted);
    }

    #[tokio::test]
    async fn send_one_is_rejected_when_the_submission_queue_is_full() {
        let transport = ScriptedTransport::new(vec![Ok(String::new())]);
        let config = SenderConfig::builder(Environment::Test, "80000001")
            .certificate("/tmp/cert.p12", "secret")
            .queue_depth(0)
            .build()
            .unwrap();
        let sender = DocumentSender::new(config, transport, sample_keystore());

        let err = sender.send_one(&sample_document()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Rejected);
        assert!(err.message.contains("queue"));
        assert_eq!(sender.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn send_batch_is_rejected_past_the_per_ruc_batch_rate() {
        let transport = ScriptedTransport::new(vec![
            Ok("<rRetEnviLoteDe><gResProcLote><dCodRes>260</dCodRes><dMsgRes>Aprobado</dMsgRes></gResProcLote></rRetEnviLoteDe>".to_string()),
        ]);
        let config = SenderConfig::builder(Environment::Test, "80000001")
            .certificate("/tmp/cert.p12", "secret")
            .build()
            .unwrap();
        assert_eq!(config.rate_limits.batches_per_ruc_per_min, 2);
        let sender = DocumentSender::new(config, transport, sample_keystore());

        sender.send_batch(&[sample_document()]).await.unwrap();
        sender.send_batch(&[sample_document()]).await.unwrap();
        let err = sender.send_batch(&[sample_document()]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Throttle);
        assert!(err.message.contains("batches per minute"));
    }
}
