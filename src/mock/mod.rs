//! Deterministic in-process fake SET server (§8, §10.4).
//!
//! `MockSet` implements [`crate::transport::SetTransport`] so a
//! [`crate::transport::DocumentSender`] can be exercised end to end without
//! a network. Behavior (latency, forced errors, timeouts, maintenance mode,
//! per-CDC and per-RUC overrides) is configured through interior-mutable
//! setters, since the trait's methods only take `&self`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;

use crate::transport::{SetTransport, TransportError};

const DEFAULT_PROTOCOL_PREFIX: &str = "MOCK";

/// One recorded call, kept for assertions in tests built against the mock.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub call_number: u32,
    pub cdc: Option<String>,
    pub ruc_emisor: Option<String>,
    pub set_code: u32,
    pub success: bool,
    pub response_time_ms: u64,
}

/// Tunable behavior for [`MockSet`].
#[derive(Debug, Clone, Copy)]
pub struct MockSetConfig {
    pub simulate_latency: bool,
    pub latency_range_ms: (u64, u64),
    /// Fraction of otherwise-successful calls that come back as a
    /// simulated SET-side rejection instead.
    pub failure_rate: f64,
    /// Fraction of calls that come back as a simulated timeout.
    pub timeout_rate: f64,
}

impl Default for MockSetConfig {
    fn default() -> Self {
        Self {
            simulate_latency: true,
            latency_range_ms: (50, 150),
            failure_rate: 0.0,
            timeout_rate: 0.0,
        }
    }
}

struct MockState {
    config: MockSetConfig,
    call_history: Vec<CallRecord>,
    force_error: Option<(u32, String)>,
    force_timeout: bool,
    maintenance_mode: bool,
    custom_responses_by_cdc: HashMap<String, (u32, String)>,
    behaviors_by_ruc: HashMap<String, (u32, String)>,
    batches: HashMap<String, String>,
    next_batch_id: u32,
}

impl MockState {
    fn fresh(config: MockSetConfig) -> Self {
        Self {
            config,
            call_history: Vec::new(),
            force_error: None,
            force_timeout: false,
            maintenance_mode: false,
            custom_responses_by_cdc: HashMap::new(),
            behaviors_by_ruc: HashMap::new(),
            batches: HashMap::new(),
            next_batch_id: 1,
        }
    }
}

/// A deterministic fake SET endpoint. Thread-safe: all configuration and
/// call-history state lives behind a `Mutex`.
pub struct MockSet {
    state: Mutex<MockState>,
}

impl Default for MockSet {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSet {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::fresh(MockSetConfig::default())),
        }
    }

    /// A mock that always accepts, with no simulated latency — the fast
    /// path for tests that only care about the happy path.
    pub fn always_succeeds() -> Self {
        let mock = Self::new();
        mock.configure(MockSetConfig {
            simulate_latency: false,
            ..MockSetConfig::default()
        });
        mock
    }

    /// A mock that always rejects with the given SET code and message.
    pub fn always_fails(code: u32, message: impl Into<String>) -> Self {
        let mock = Self::new();
        mock.configure(MockSetConfig {
            simulate_latency: false,
            ..MockSetConfig::default()
        });
        mock.force_error_response(code, message);
        mock
    }

    /// A mock that always times out.
    pub fn always_times_out() -> Self {
        let mock = Self::new();
        mock.configure(MockSetConfig {
            simulate_latency: false,
            ..MockSetConfig::default()
        });
        mock.force_timeout(true);
        mock
    }

    /// A mock simulating realistic SET conditions: occasional rejections,
    /// occasional timeouts, and noticeable latency.
    pub fn realistic() -> Self {
        let mock = Self::new();
        mock.configure(MockSetConfig {
            simulate_latency: true,
            latency_range_ms: (200, 800),
            failure_rate: 0.05,
            timeout_rate: 0.02,
        });
        mock
    }

    pub fn configure(&self, config: MockSetConfig) {
        self.state.lock().unwrap().config = config;
    }

    pub fn force_error_response(&self, code: u32, message: impl Into<String>) {
        self.state.lock().unwrap().force_error = Some((code, message.into()));
    }

    pub fn force_timeout(&self, enabled: bool) {
        self.state.lock().unwrap().force_timeout = enabled;
    }

    pub fn set_maintenance_mode(&self, enabled: bool) {
        self.state.lock().unwrap().maintenance_mode = enabled;
    }

    pub fn set_response_for_cdc(&self, cdc: impl Into<String>, code: u32, message: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .custom_responses_by_cdc
            .insert(cdc.into(), (code, message.into()));
    }

    pub fn set_behavior_for_ruc(&self, ruc: impl Into<String>, code: u32, message: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .behaviors_by_ruc
            .insert(ruc.into(), (code, message.into()));
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().call_history.len()
    }

    pub fn call_history(&self) -> Vec<CallRecord> {
        self.state.lock().unwrap().call_history.clone()
    }

    pub fn last_call(&self) -> Option<CallRecord> {
        self.state.lock().unwrap().call_history.last().cloned()
    }

    pub fn successful_calls(&self) -> Vec<CallRecord> {
        self.call_history().into_iter().filter(|c| c.success).collect()
    }

    pub fn failed_calls(&self) -> Vec<CallRecord> {
        self.call_history().into_iter().filter(|c| !c.success).collect()
    }

    pub fn clear_history(&self) {
        self.state.lock().unwrap().call_history.clear();
    }

    /// Clear history and drop every configured override, restoring the
    /// mock to its just-constructed defaults.
    pub fn reset_to_defaults(&self) {
        let mut state = self.state.lock().unwrap();
        *state = MockState::fresh(MockSetConfig::default());
    }

    async fn respond(&self, payload: &str) -> Result<(u32, String, Option<String>), TransportError> {
        let (config, force_error, force_timeout, maintenance) = {
            let state = self.state.lock().unwrap();
            (
                state.config,
                state.force_error.clone(),
                state.force_timeout,
                state.maintenance_mode,
            )
        };

        if maintenance {
            return Err(TransportError::Http("SET is in scheduled maintenance".into()));
        }
        if force_timeout {
            return Err(TransportError::Timeout(30_000));
        }

        if config.simulate_latency {
            let millis = rand::thread_rng().gen_range(config.latency_range_ms.0..=config.latency_range_ms.1);
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }

        if config.timeout_rate > 0.0 && rand::thread_rng().gen_bool(config.timeout_rate) {
            return Err(TransportError::Timeout(30_000));
        }

        let cdc = extract_attr(payload, "Id");
        let ruc_emisor = extract_tag(payload, "dRucEm");

        let (code, message) = if let Some((code, message)) = force_error {
            (code, message)
        } else if let Some(cdc) = cdc.as_deref() {
            if let Some((code, message)) = self.state.lock().unwrap().custom_responses_by_cdc.get(cdc).cloned() {
                (code, message)
            } else {
                self.default_outcome(ruc_emisor.as_deref(), config)
            }
        } else {
            self.default_outcome(ruc_emisor.as_deref(), config)
        };

        Ok((code, message, cdc))
    }

    fn default_outcome(&self, ruc_emisor: Option<&str>, config: MockSetConfig) -> (u32, String) {
        if let Some(ruc) = ruc_emisor {
            if let Some((code, message)) = self.state.lock().unwrap().behaviors_by_ruc.get(ruc).cloned() {
                return (code, message);
            }
        }
        if config.failure_rate > 0.0 && rand::thread_rng().gen_bool(config.failure_rate) {
            return (900, "Simulated random rejection".to_string());
        }
        (260, "Aprobado".to_string())
    }

    fn record_call(&self, cdc: Option<String>, ruc_emisor: Option<String>, code: u32, elapsed: Duration) -> u32 {
        let mut state = self.state.lock().unwrap();
        let call_number = state.call_history.len() as u32 + 1;
        state.call_history.push(CallRecord {
            call_number,
            cdc,
            ruc_emisor,
            set_code: code,
            success: code == 260 || (300..400).contains(&code),
            response_time_ms: elapsed.as_millis() as u64,
        });
        call_number
    }

    fn response_body(code: u32, message: &str, cdc: Option<&str>, protocol: Option<&str>) -> String {
        let mut body = format!("<rRetEnviDe><dCodRes>{code}</dCodRes><dMsgRes>{message}</dMsgRes>");
        if let Some(cdc) = cdc {
            body.push_str(&format!("<Id>{cdc}</Id>"));
        }
        if let Some(protocol) = protocol {
            body.push_str(&format!("<dProtAut>{protocol}</dProtAut>"));
        }
        if !(code == 260 || (300..400).contains(&code)) {
            body.push_str(&format!("<dMsgError>{message}</dMsgError>"));
        }
        body.push_str("</rRetEnviDe>");
        body
    }
}

fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(xml[start..end].to_string())
}

fn extract_attr(xml: &str, attr: &str) -> Option<String> {
    let needle = format!("{attr}=\"");
    let start = xml.find(&needle)? + needle.len();
    let end = xml[start..].find('"')? + start;
    Some(xml[start..end].to_string())
}

impl SetTransport for MockSet {
    async fn send_single(&self, signed_xml: &str) -> Result<String, TransportError> {
        let start = std::time::Instant::now();
        let (code, message, cdc) = self.respond(signed_xml).await?;
        let ruc_emisor = extract_tag(signed_xml, "dRucEm");
        let call_number = self.record_call(cdc.clone(), ruc_emisor, code, start.elapsed());
        let protocol = format!("{DEFAULT_PROTOCOL_PREFIX}-{call_number:010}");
        Ok(Self::response_body(code, &message, cdc.as_deref(), Some(&protocol)))
    }

    async fn send_batch(&self, signed_xmls: &[String]) -> Result<String, TransportError> {
        let mut body = String::from("<rRetEnviLoteDe>");
        for xml in signed_xmls {
            let raw = self.send_single(xml).await?;
            let code = extract_tag(&raw, "dCodRes").unwrap_or_default();
            let message = extract_tag(&raw, "dMsgRes").unwrap_or_default();
            let cdc = extract_tag(&raw, "Id");
            let protocol = extract_tag(&raw, "dProtAut");
            body.push_str("<gResProcLote>");
            body.push_str(&format!("<dCodRes>{code}</dCodRes><dMsgRes>{message}</dMsgRes>"));
            if let Some(cdc) = cdc {
                body.push_str(&format!("<Id>{cdc}</Id>"));
            }
            if let Some(protocol) = protocol {
                body.push_str(&format!("<dProtAut>{protocol}</dProtAut>"));
            }
            body.push_str("</gResProcLote>");
        }
        body.push_str("</rRetEnviLoteDe>");

        let batch_id = {
            let mut state = self.state.lock().unwrap();
            let id = format!("BATCH-{:06}", state.next_batch_id);
            state.next_batch_id += 1;
            state.batches.insert(id.clone(), body.clone());
            id
        };
        let _ = batch_id;
        Ok(body)
    }

    async fn query_by_cdc(&self, cdc: &str) -> Result<String, TransportError> {
        let record = self
            .state
            .lock()
            .unwrap()
            .call_history
            .iter()
            .rev()
            .find(|c| c.cdc.as_deref() == Some(cdc))
            .cloned();

        match record {
            Some(record) => Ok(Self::response_body(record.set_code, "consulta", Some(cdc), None)),
            None => Ok(Self::response_body(990, "CDC no encontrado", Some(cdc), None)),
        }
    }

    async fn query_batch_status(&self, batch_id: &str) -> Result<String, TransportError> {
        let body = self.state.lock().unwrap().batches.get(batch_id).cloned();
        match body {
            Some(body) => Ok(body),
            None => Ok(Self::response_body(990, "lote no encontrado", None, None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn basic_success_response_is_accepted() {
        let mock = MockSet::always_succeeds();
        let raw = mock
            .send_single("<rDE Id=\"012345\"><dRucEm>80000001</dRucEm></rDE>")
            .await
            .unwrap();
        assert!(raw.contains("<dCodRes>260</dCodRes>"));
        assert_eq!(mock.call_count(), 1);
        assert!(mock.last_call().unwrap().success);
    }

    #[tokio::test]
    async fn forced_error_overrides_default_outcome() {
        let mock = MockSet::always_fails(1250, "RUC forzado inexistente");
        let raw = mock.send_single("<rDE Id=\"012345\"/>").await.unwrap();
        assert!(raw.contains("<dCodRes>1250</dCodRes>"));
        assert!(!mock.last_call().unwrap().success);
    }

    #[tokio::test]
    async fn forced_timeout_surfaces_as_transport_error() {
        let mock = MockSet::always_times_out();
        let result = mock.send_single("<rDE Id=\"012345\"/>").await;
        assert!(matches!(result, Err(TransportError::Timeout(_))));
    }

    #[tokio::test]
    async fn maintenance_mode_rejects_every_call() {
        let mock = MockSet::new();
        mock.configure(MockSetConfig {
            simulate_latency: false,
            ..MockSetConfig::default()
        });
        mock.set_maintenance_mode(true);
        let result = mock.send_single("<rDE Id=\"012345\"/>").await;
        assert!(matches!(result, Err(TransportError::Http(_))));
    }

    #[tokio::test]
    async fn custom_response_for_cdc_takes_effect() {
        let mock = MockSet::always_succeeds();
        mock.set_response_for_cdc("012345", 1001, "CDC duplicado personalizado");
        let raw = mock.send_single("<rDE Id=\"012345\"/>").await.unwrap();
        assert!(raw.contains("<dCodRes>1001</dCodRes>"));
    }

    #[tokio::test]
    async fn behavior_for_ruc_takes_effect() {
        let mock = MockSet::always_succeeds();
        mock.set_behavior_for_ruc("80009999", 1000, "RUC no encontrado");
        let raw = mock
            .send_single("<rDE Id=\"012345\"><dRucEm>80009999</dRucEm></rDE>")
            .await
            .unwrap();
        assert!(raw.contains("<dCodRes>1000</dCodRes>"));
    }

    #[tokio::test]
    async fn call_history_tracks_every_call_in_order() {
        let mock = MockSet::always_succeeds();
        mock.send_single("<rDE Id=\"1\"/>").await.unwrap();
        mock.send_single("<rDE Id=\"2\"/>").await.unwrap();
        let history = mock.call_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].call_number, 1);
        assert_eq!(history[1].call_number, 2);
    }

    #[tokio::test]
    async fn reset_to_defaults_clears_history_and_overrides() {
        let mock = MockSet::always_fails(1000, "Error");
        mock.send_single("<rDE Id=\"1\"/>").await.unwrap();
        assert_eq!(mock.call_count(), 1);

        mock.reset_to_defaults();
        assert_eq!(mock.call_count(), 0);

        let raw = mock.send_single("<rDE Id=\"1\"/>").await.unwrap();
        assert!(raw.contains("<dCodRes>260</dCodRes>"));
    }

    #[tokio::test]
    async fn query_by_cdc_reflects_the_recorded_outcome() {
        let mock = MockSet::always_succeeds();
        mock.send_single("<rDE Id=\"012345\"/>").await.unwrap();
        let raw = mock.query_by_cdc("012345").await.unwrap();
        assert!(raw.contains("<dCodRes>260</dCodRes>"));

        let raw = mock.query_by_cdc("999999").await.unwrap();
        assert!(raw.contains("<dCodRes>990</dCodRes>"));
    }

    #[tokio::test]
    async fn send_batch_produces_one_block_per_document() {
        let mock = MockSet::always_succeeds();
        let raw = mock
            .send_batch(&["<rDE Id=\"1\"/>".to_string(), "<rDE Id=\"2\"/>".to_string()])
            .await
            .unwrap();
        assert_eq!(raw.matches("<gResProcLote>").count(), 2);
    }
}
