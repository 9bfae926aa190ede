use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub places_api_key: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub places_base_url: String,
    pub performance_base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub probe_timeout_ms: u64,
    pub probe_delay_ms: u64,
    pub backoff_max_delay_ms: u64,
    pub max_consecutive_failures: u32,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub default_num_points: u32,
    pub default_radius_meters: f64,
    pub max_num_points: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("places_api_key", &"[redacted]")
            .field("places_base_url", &self.places_base_url)
            .field("performance_base_url", &self.performance_base_url)
            .field("user_agent", &self.user_agent)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("probe_timeout_ms", &self.probe_timeout_ms)
            .field("probe_delay_ms", &self.probe_delay_ms)
            .field("backoff_max_delay_ms", &self.backoff_max_delay_ms)
            .field("max_consecutive_failures", &self.max_consecutive_failures)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("default_num_points", &self.default_num_points)
            .field("default_radius_meters", &self.default_radius_meters)
            .field("max_num_points", &self.max_num_points)
            .finish()
    }
}
