//! SOAP transport: rate limiting, retry, response classification, and the
//! `DocumentSender` orchestrator (§4.7 – §4.10, §5).

mod classifier;
mod config;
mod error;
mod rate_limit;
mod response;
mod retry;
mod sender;
mod soap;

pub use classifier::classify;
pub use config::{CertificateConfig, Environment, RateLimits, SenderConfig, SenderConfigBuilder};
pub use error::{ClassifiedError, ConfigError, ErrorKind, TransportError};
pub use response::{parse_response, DocumentStatus, Response};
pub use sender::{BatchResult, DocumentSender, QueryResult, SendResult};
pub use soap::{SetTransport, SoapClient, SoapOperation};
