use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    /// Base URL used when building links back to a request in mail bodies.
    pub public_base_url: String,

    // Auth
    pub session_secret: String,
    pub idp_shared_secret: String,

    // Mail relay (optional; notifications are dropped when unset)
    pub mail_api_url: Option<String>,
    pub mail_api_token: Option<String>,
    pub mail_from: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        let web_port: u16 = env::var("WEB_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .expect("WEB_PORT must be a number");

        Self {
            database_url: required_env("DATABASE_URL"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port,
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{web_port}")),
            session_secret: required_env("SESSION_SECRET"),
            idp_shared_secret: required_env("IDP_SHARED_SECRET"),
            mail_api_url: env::var("MAIL_API_URL").ok(),
            mail_api_token: env::var("MAIL_API_TOKEN").ok(),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "GatePass <no-reply@gatepass.local>".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
