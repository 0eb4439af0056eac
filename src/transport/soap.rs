//! SOAP 1.2 envelope construction and the thin HTTP layer over it (§4.7).

use std::time::Duration;

use super::error::TransportError;

const SOAP_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

/// The four wire operations SIFEN exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapOperation {
    SendSingle,
    SendBatch,
    QueryByCdc,
    QueryBatchStatus,
}

impl SoapOperation {
    fn soap_action(self) -> &'static str {
        match self {
            SoapOperation::SendSingle => "rEnviDe",
            SoapOperation::SendBatch => "rEnviLoteDe",
            SoapOperation::QueryByCdc => "rConsDe",
            SoapOperation::QueryBatchStatus => "rConsLoteDe",
        }
    }
}

/// Wrap `payload` (already-signed document XML, or a CDC/batch id for
/// queries) in a minimal SOAP 1.2 envelope.
pub fn build_envelope(operation: SoapOperation, payload: &str) -> String {
    let action = operation.soap_action();
    format!(
        "<soap:Envelope xmlns:soap=\"{SOAP_ENVELOPE_NS}\">\
         <soap:Body><{action}>{payload}</{action}></soap:Body>\
         </soap:Envelope>"
    )
}

/// Any backend capable of executing the four SIFEN SOAP operations — real
/// ([`SoapClient`]) or a test double ([`crate::mock::MockSet`]). The
/// [`crate::transport::DocumentSender`] is generic over this trait rather
/// than boxing it, since every sender is built against exactly one backend
/// for its lifetime.
pub trait SetTransport {
    fn send_single(
        &self,
        signed_xml: &str,
    ) -> impl std::future::Future<Output = Result<String, TransportError>> + Send;

    fn send_batch(
        &self,
        signed_xmls: &[String],
    ) -> impl std::future::Future<Output = Result<String, TransportError>> + Send;

    fn query_by_cdc(
        &self,
        cdc: &str,
    ) -> impl std::future::Future<Output = Result<String, TransportError>> + Send;

    fn query_batch_status(
        &self,
        batch_id: &str,
    ) -> impl std::future::Future<Output = Result<String, TransportError>> + Send;
}

/// Thin HTTP client over `reqwest`, carrying the signed XML as a SOAP
/// payload element.
pub struct SoapClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl SoapClient {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64, verify_tls: bool) -> Self {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("reqwest client configuration is always valid");

        Self {
            http,
            base_url: base_url.into(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    async fn post(&self, operation: SoapOperation, payload: &str) -> Result<String, TransportError> {
        let envelope = build_envelope(operation, payload);
        let response = tokio::time::timeout(
            self.timeout,
            self.http
                .post(&self.base_url)
                .header("Content-Type", "application/soap+xml; charset=utf-8")
                .body(envelope)
                .send(),
        )
        .await
        .map_err(|_| TransportError::Timeout(self.timeout.as_millis() as u64))?
        .map_err(|e| TransportError::Http(e.to_string()))?;

        response
            .text()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))
    }
}

impl SetTransport for SoapClient {
    async fn send_single(&self, signed_xml: &str) -> Result<String, TransportError> {
        self.post(SoapOperation::SendSingle, signed_xml).await
    }

    async fn send_batch(&self, signed_xmls: &[String]) -> Result<String, TransportError> {
        let joined = signed_xmls.join("");
        self.post(SoapOperation::SendBatch, &joined).await
    }

    async fn query_by_cdc(&self, cdc: &str) -> Result<String, TransportError> {
        self.post(SoapOperation::QueryByCdc, cdc).await
    }

    async fn query_batch_status(&self, batch_id: &str) -> Result<String, TransportError> {
        self.post(SoapOperation::QueryBatchStatus, batch_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_wraps_payload_in_the_operation_element() {
        let envelope = build_envelope(SoapOperation::SendSingle, "<rDE/>");
        assert!(envelope.contains("<rEnviDe><rDE/></rEnviDe>"));
        assert!(envelope.starts_with("<soap:Envelope"));
    }
}
