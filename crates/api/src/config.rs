use std::time::Duration;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HS256 secret for the in-process token verifier.
    pub jwt_secret: String,

    /// Listen address for the HTTP server.
    pub bind_addr: String,

    /// Development mode: attach diagnostic detail to error responses.
    /// Never enable in production; detail otherwise goes to audit metadata only.
    pub dev_errors: bool,

    /// Fixed bound on identity-provider verification per request.
    pub verify_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            dev_errors: false,
            verify_timeout: Duration::from_secs(5),
        }
    }
}

impl AppConfig {
    /// Read configuration from the environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let jwt_secret = std::env::var("TRADEPOST_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("TRADEPOST_JWT_SECRET not set; using insecure dev default");
            defaults.jwt_secret.clone()
        });

        let bind_addr =
            std::env::var("TRADEPOST_BIND_ADDR").unwrap_or_else(|_| defaults.bind_addr.clone());

        let dev_errors = std::env::var("TRADEPOST_DEV_ERRORS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            jwt_secret,
            bind_addr,
            dev_errors,
            verify_timeout: defaults.verify_timeout,
        }
    }
}
