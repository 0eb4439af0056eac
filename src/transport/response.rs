//! Parses raw SET SOAP responses into a normalized [`Response`] (§4.8).

use super::error::TransportError;

/// Document status taxonomy returned by SET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DocumentStatus {
    Accepted,
    AcceptedWithObservations,
    Pending,
    Processing,
    Rejected,
    Extemporaneous,
    Cancelled,
    Annulled,
    TechnicalError,
}

impl DocumentStatus {
    fn from_code(code: u32) -> Self {
        match code {
            260 => DocumentStatus::Accepted,
            300..=399 => DocumentStatus::AcceptedWithObservations,
            400..=499 => DocumentStatus::Pending,
            500..=599 => DocumentStatus::Processing,
            900..=999 => DocumentStatus::Rejected,
            700..=799 => DocumentStatus::Extemporaneous,
            800..=849 => DocumentStatus::Cancelled,
            850..=899 => DocumentStatus::Annulled,
            _ => DocumentStatus::TechnicalError,
        }
    }
}

/// A normalized SET response, independent of the raw SOAP envelope shape.
#[derive(Debug, Clone)]
pub struct Response {
    pub success: bool,
    pub code: u32,
    pub message: String,
    pub document_status: DocumentStatus,
    pub cdc: Option<String>,
    pub protocol_number: Option<String>,
    pub errors: Vec<String>,
}

fn extract(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(xml[start..end].to_string())
}

/// Parse a raw SOAP response body into a [`Response`].
pub fn parse_response(raw: &str) -> Result<Response, TransportError> {
    let code: u32 = extract(raw, "dCodRes")
        .ok_or_else(|| TransportError::MalformedResponse("missing dCodRes".into()))?
        .parse()
        .map_err(|_| TransportError::MalformedResponse("dCodRes is not numeric".into()))?;
    let message = extract(raw, "dMsgRes").unwrap_or_default();
    let cdc = extract(raw, "Id");
    let protocol_number = extract(raw, "dProtAut");
    let errors = extract_all(raw, "dMsgError");

    Ok(Response {
        success: code == 260 || (300..400).contains(&code),
        code,
        message,
        document_status: DocumentStatus::from_code(code),
        cdc,
        protocol_number,
        errors,
    })
}

/// Parse a batch response body into one [`Response`] per submitted
/// document, each wrapped in its own `gResProcLote` element.
pub fn parse_batch_response(raw: &str) -> Result<Vec<Response>, TransportError> {
    extract_all_blocks(raw, "gResProcLote")
        .iter()
        .map(|block| parse_response(block))
        .collect()
}

fn extract_all_blocks(xml: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut out = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find(&open) {
        let after_open = &rest[start + open.len()..];
        if let Some(end) = after_open.find(&close) {
            out.push(after_open[..end].to_string());
            rest = &after_open[end + close.len()..];
        } else {
            break;
        }
    }
    out
}

fn extract_all(xml: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut out = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find(&open) {
        let after_open = &rest[start + open.len()..];
        if let Some(end) = after_open.find(&close) {
            out.push(after_open[..end].to_string());
            rest = &after_open[end + close.len()..];
        } else {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_accepted_response() {
        let raw = "<rRetEnviDe><dCodRes>260</dCodRes><dMsgRes>Aprobado</dMsgRes>\
                   <dProtAut>12345</dProtAut><Id>0".to_string()
            + &"1".repeat(43)
            + "</Id></rRetEnviDe>";
        let response = parse_response(&raw).unwrap();
        assert!(response.success);
        assert_eq!(response.document_status, DocumentStatus::Accepted);
        assert_eq!(response.protocol_number.as_deref(), Some("12345"));
    }

    #[test]
    fn parses_rejected_response_with_errors() {
        let raw = "<rRetEnviDe><dCodRes>920</dCodRes><dMsgRes>Rechazado</dMsgRes>\
                   <dMsgError>RUC invalido</dMsgError><dMsgError>Fecha invalida</dMsgError>\
                   </rRetEnviDe>";
        let response = parse_response(raw).unwrap();
        assert!(!response.success);
        assert_eq!(response.document_status, DocumentStatus::Rejected);
        assert_eq!(response.errors.len(), 2);
    }

    #[test]
    fn missing_code_is_malformed() {
        let result = parse_response("<rRetEnviDe></rRetEnviDe>");
        assert!(result.is_err());
    }

    #[test]
    fn parses_one_response_per_batch_block() {
        let raw = "<rRetEnviLoteDe>\
                   <gResProcLote><dCodRes>260</dCodRes><dMsgRes>Aprobado</dMsgRes></gResProcLote>\
                   <gResProcLote><dCodRes>920</dCodRes><dMsgRes>Rechazado</dMsgRes></gResProcLote>\
                   </rRetEnviLoteDe>";
        let responses = parse_batch_response(raw).unwrap();
        assert_eq!(responses.len(), 2);
        assert!(responses[0].success);
        assert!(!responses[1].success);
    }
}
