use std::path::PathBuf;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL_SAFE, Engine as _};
use uuid::Uuid;

/// Process-wide configuration, read once from the environment at startup and
/// shared read-only with every worker.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    /// Directory that holds attachment content, keyed by generated filename.
    pub content_root: PathBuf,
    /// Dev/test escape hatch: when true the auth guard passes every request.
    pub auth_disabled: bool,
    /// Symmetric secret for HS512 token signing.
    pub token_secret: String,
    /// Token lifetime expression, e.g. "900s", "15m", "2h", "1d".
    pub token_ttl: String,
    /// clamd TCP address; None disables scanning entirely (dev escape hatch).
    pub clamd_addr: Option<String>,
    pub scan_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let auth_disabled = std::env::var("AUTH_DISABLED").unwrap_or_default() == "true";

        // No configured secret means a fresh random one per process: issued
        // tokens die with the process, which is fine for single-node runs.
        let token_secret = std::env::var("TOKEN_SECRET").unwrap_or_else(|_| {
            let random_bytes: [u8; 16] = rand::random();
            format!(
                "{}{}",
                BASE64_URL_SAFE.encode(random_bytes),
                Uuid::new_v4().simple()
            )
        });

        let scan_timeout_ms = std::env::var("SCAN_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10_000);

        Config {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            database_url: std::env::var("DATABASE_URL").unwrap_or_else(|_| "reclamos.db".to_string()),
            content_root: std::env::var("CONTENT_ROOT")
                .unwrap_or_else(|_| "./content".to_string())
                .into(),
            auth_disabled,
            token_secret,
            token_ttl: std::env::var("TOKEN_TTL").unwrap_or_else(|_| "15m".to_string()),
            clamd_addr: std::env::var("CLAMD_ADDR").ok().filter(|v| !v.is_empty()),
            scan_timeout: Duration::from_millis(scan_timeout_ms),
        }
    }
}
