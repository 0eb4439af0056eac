use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Which SET endpoint family to target (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Test,
    Prod,
}

impl Environment {
    pub fn base_url(self) -> &'static str {
        match self {
            Environment::Test => "https://sifen-test.set.gov.py",
            Environment::Prod => "https://sifen.set.gov.py",
        }
    }
}

/// Client-side rate limits (§5), mirroring SET's published server-side
/// limits so the client never trips 5002/5003 by surprise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimits {
    pub per_ruc_per_sec: u32,
    pub per_ip_per_min: u32,
    pub concurrent_per_ruc: u32,
    pub batches_per_ruc_per_min: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            per_ruc_per_sec: 10,
            per_ip_per_min: 100,
            concurrent_per_ruc: 5,
            batches_per_ruc_per_min: 2,
        }
    }
}

/// PKCS#12 key material location (§6).
#[derive(Clone, Serialize, Deserialize)]
pub struct CertificateConfig {
    pub path: String,
    pub password: String,
}

/// Redact the passphrase so it never lands in a log line via `{:?}`/`?`
/// formatting, however `SenderConfig` itself gets printed (§10.1).
impl std::fmt::Debug for CertificateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateConfig")
            .field("path", &self.path)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sender-wide configuration (§6, §10.3). Built once per sender instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderConfig {
    pub environment: Environment,
    pub ruc_emisor: String,
    pub certificate: CertificateConfig,
    pub timeout_ms: u64,
    pub max_retries: u8,
    pub verify_tls: bool,
    pub rate_limits: RateLimits,
    pub queue_depth: usize,
    /// Maximum documents per `send_batch` call (§4.10, §9 open question).
    pub max_batch_documents: usize,
    /// Maximum total batch size in bytes.
    pub max_batch_bytes: u64,
    /// Maximum size of any single document in bytes.
    pub max_document_bytes: u64,
}

impl SenderConfig {
    pub fn builder(environment: Environment, ruc_emisor: impl Into<String>) -> SenderConfigBuilder {
        SenderConfigBuilder::new(environment, ruc_emisor)
    }
}

/// Fluent builder for [`SenderConfig`], mirroring the document builders in
/// `core::builder`.
pub struct SenderConfigBuilder {
    environment: Environment,
    ruc_emisor: String,
    certificate: Option<CertificateConfig>,
    timeout_ms: u64,
    max_retries: u8,
    verify_tls: bool,
    rate_limits: RateLimits,
    queue_depth: usize,
    max_batch_documents: usize,
    max_batch_bytes: u64,
    max_document_bytes: u64,
}

impl SenderConfigBuilder {
    pub fn new(environment: Environment, ruc_emisor: impl Into<String>) -> Self {
        Self {
            environment,
            ruc_emisor: ruc_emisor.into(),
            certificate: None,
            timeout_ms: 30_000,
            max_retries: 3,
            verify_tls: true,
            rate_limits: RateLimits::default(),
            queue_depth: 1000,
            max_batch_documents: 50,
            max_batch_bytes: 50 * 1024 * 1024,
            max_document_bytes: 10 * 1024 * 1024,
        }
    }

    pub fn certificate(mut self, path: impl Into<String>, password: impl Into<String>) -> Self {
        self.certificate = Some(CertificateConfig {
            path: path.into(),
            password: password.into(),
        });
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    pub fn max_retries(mut self, attempts: u8) -> Self {
        self.max_retries = attempts;
        self
    }

    /// Disabling TLS verification is only honored in `Environment::Test`.
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn rate_limits(mut self, limits: RateLimits) -> Self {
        self.rate_limits = limits;
        self
    }

    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    pub fn max_batch_documents(mut self, max: usize) -> Self {
        self.max_batch_documents = max;
        self
    }

    pub fn max_batch_bytes(mut self, max: u64) -> Self {
        self.max_batch_bytes = max;
        self
    }

    pub fn max_document_bytes(mut self, max: u64) -> Self {
        self.max_document_bytes = max;
        self
    }

    pub fn build(self) -> Result<SenderConfig, ConfigError> {
        let certificate = self
            .certificate
            .ok_or(ConfigError::MissingField("certificate"))?;
        if self.ruc_emisor.is_empty() {
            return Err(ConfigError::MissingField("ruc_emisor"));
        }
        if !self.verify_tls && matches!(self.environment, Environment::Prod) {
            return Err(ConfigError::InvalidValue {
                field: "verify_tls",
                message: "TLS verification cannot be disabled in the production environment"
                    .into(),
            });
        }
        if !(1..=10).contains(&self.max_retries) {
            return Err(ConfigError::InvalidValue {
                field: "max_retries",
                message: "must be between 1 and 10".into(),
            });
        }

        Ok(SenderConfig {
            environment: self.environment,
            ruc_emisor: self.ruc_emisor,
            certificate,
            timeout_ms: self.timeout_ms,
            max_retries: self.max_retries,
            verify_tls: self.verify_tls,
            rate_limits: self.rate_limits,
            queue_depth: self.queue_depth,
            max_batch_documents: self.max_batch_documents,
            max_batch_bytes: self.max_batch_bytes,
            max_document_bytes: self.max_document_bytes,
        })
    }

    /// Apply `SIFEN_`-prefixed environment variable overrides on top of the
    /// builder's current values (§10.3). Unset variables leave the current
    /// value untouched; malformed values are ignored rather than panicking.
    pub fn from_env(mut self) -> Self {
        if let Ok(v) = std::env::var("SIFEN_TIMEOUT_MS") {
            if let Ok(parsed) = v.parse() {
                self.timeout_ms = parsed;
            }
        }
        if let Ok(v) = std::env::var("SIFEN_MAX_RETRIES") {
            if let Ok(parsed) = v.parse() {
                self.max_retries = parsed;
            }
        }
        if let Ok(v) = std::env::var("SIFEN_VERIFY_TLS") {
            if let Ok(parsed) = v.parse() {
                self.verify_tls = parsed;
            }
        }
        if let Ok(v) = std::env::var("SIFEN_QUEUE_DEPTH") {
            if let Ok(parsed) = v.parse() {
                self.queue_depth = parsed;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_defaults() {
        let config = SenderConfig::builder(Environment::Test, "80000001")
            .certificate("/tmp/cert.p12", "secret")
            .build()
            .unwrap();
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.rate_limits.per_ruc_per_sec, 10);
    }

    #[test]
    fn missing_certificate_is_an_error() {
        let result = SenderConfig::builder(Environment::Test, "80000001").build();
        assert!(matches!(result, Err(ConfigError::MissingField("certificate"))));
    }

    #[test]
    fn prod_cannot_disable_tls_verification() {
        let result = SenderConfig::builder(Environment::Prod, "80000001")
            .certificate("/tmp/cert.p12", "secret")
            .verify_tls(false)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_apply_on_top_of_builder() {
        // SAFETY: test-only, single-threaded set/remove of a process-wide
        // variable this test owns exclusively for its duration.
        unsafe {
            std::env::set_var("SIFEN_TIMEOUT_MS", "5000");
        }
        let config = SenderConfig::builder(Environment::Test, "80000001")
            .certificate("/tmp/cert.p12", "secret")
            .from_env()
            .build()
            .unwrap();
        unsafe {
            std::env::remove_var("SIFEN_TIMEOUT_MS");
        }
        assert_eq!(config.timeout_ms, 5000);
    }
}
