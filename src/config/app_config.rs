use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub access_log: AccessLogConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Span export and Prometheus exposition
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub tracing: TracingConfig,
    pub metrics: MetricsConfig,
}

/// OTLP span export; off unless enabled
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    pub otlp_endpoint: String,
    /// Also used as the tracer name
    pub service_name: String,
    /// Clamped to always-on at 1.0 and always-off at 0.0
    pub sampling_ratio: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Served outside the filter chain
    pub path: String,
}

/// Full access log settings (request/response bodies in the access log line)
#[derive(Debug, Clone, Deserialize)]
pub struct AccessLogConfig {
    /// Log request and response bodies
    #[serde(default)]
    pub full_enabled: bool,
    /// Content types whose bodies are captured (substring match)
    #[serde(default = "default_supported_content_types")]
    pub supported_content_types: Vec<String>,
    /// Bodies larger than this are logged as `data too large`
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    #[serde(default = "default_true")]
    pub request_body_enabled: bool,
    #[serde(default = "default_true")]
    pub response_body_enabled: bool,
}

/// Cross-origin resource sharing settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub expose_headers: Vec<String>,
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// Exact origins, `*`, or `re:<regex>`; empty allows every origin
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    /// Preflight cache duration in seconds, 0 to omit the header
    #[serde(default)]
    pub max_age: u64,
    #[serde(default)]
    pub cookies_allowed: bool,
}

/// Token validation settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used when no JWKS is configured
    #[serde(default)]
    pub jwt_secret: Option<String>,
    /// URL of the token issuer's JWKS document
    #[serde(default)]
    pub jwks_url: Option<String>,
    /// Base URI of this service, used for audience validation
    #[serde(default)]
    pub client_base_uri: Option<String>,
    /// Realm this deployment runs in
    #[serde(default)]
    pub realm_name: Option<String>,
    /// Realms considered live
    #[serde(default = "default_realm_live")]
    pub realm_live: Vec<String>,
}

impl AuthConfig {
    /// Verbose authorization errors are only returned outside live realms.
    /// Without a realm name the deployment is treated as live.
    pub fn dev_stack_traceable(&self) -> bool {
        match &self.realm_name {
            Some(realm) => !self.realm_live.iter().any(|live| live == realm),
            None => false,
        }
    }
}

fn default_supported_content_types() -> Vec<String> {
    [
        "application/json",
        "application/xml",
        "application/x-www-form-urlencoded",
        "text/plain",
        "text/html",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_body_size() -> usize {
    10 << 10
}

fn default_true() -> bool {
    true
}

fn default_realm_live() -> Vec<String> {
    vec!["prod".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            full_enabled: false,
            supported_content_types: default_supported_content_types(),
            max_body_size: default_max_body_size(),
            request_body_enabled: true,
            response_body_enabled: true,
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: env!("CARGO_PKG_NAME").to_string(),
            sampling_ratio: 1.0,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwks_url: None,
            client_base_uri: None,
            realm_name: None,
            realm_live: default_realm_live(),
        }
    }
}

impl AppConfig {
    /// Load `config/default`, `config/local`, then `APP__` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(environment())
    }

    fn load_with(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(environment)
            .build()?
            .try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("APP")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("access_log.supported_content_types")
        .with_list_parse_key("cors.expose_headers")
        .with_list_parse_key("cors.allowed_headers")
        .with_list_parse_key("cors.allowed_domains")
        .with_list_parse_key("cors.allowed_methods")
        .with_list_parse_key("auth.realm_live")
        .try_parsing(true)
}
