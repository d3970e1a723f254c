//! Application configuration

mod app_config;

pub use app_config::{
    AccessLogConfig, AppConfig, AuthConfig, CorsConfig, LogFormat, LoggingConfig, MetricsConfig,
    ObservabilityConfig, ServerConfig, TracingConfig,
};
