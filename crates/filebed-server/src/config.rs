use std::env;
use std::time::Duration;

use edge_response_cache::TtlPolicy;

use crate::error::{Result, ServerError};

/// Paths the router owns; the admin path may not shadow them
const RESERVED_PATHS: &[&str] = &["upload", "delete-images", "bing-images", "health"];

/// Headroom over the upload limit for multipart framing
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

const DEFAULT_BACKGROUND_BASE_URL: &str = "https://cn.bing.com";

/// Basic-Auth credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Relay credentials
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Public origin without a trailing slash, e.g. `https://files.example.com`
    pub origin: String,
    pub database_url: String,
    pub credentials: Option<Credentials>,
    pub admin_path: String,
    /// Gate the root page as well as the admin routes
    pub enable_auth: bool,
    pub telegram: Option<TelegramConfig>,
    pub max_upload_bytes: u64,
    /// Request body cap: the upload limit plus multipart framing
    pub body_limit_bytes: u64,
    /// Origin of the daily background image archive
    pub background_base_url: String,
    pub relay_timeout: Duration,
    pub request_timeout: Duration,
    pub ttl: TtlPolicy,
    pub cache_max_bytes: u64,
    pub notify_uploads: bool,
}

impl Config {
    /// Parse configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Parse configuration from any name → value lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let num = |name: &str, default: u64| -> Result<u64> {
            match var(name) {
                Some(v) => v
                    .trim()
                    .parse()
                    .map_err(|_| ServerError::Config(format!("{} must be a number, got {:?}", name, v))),
                None => Ok(default),
            }
        };

        let port = u16::try_from(num("PORT", 3000)?)
            .map_err(|_| ServerError::Config("PORT out of range".to_string()))?;

        let origin = match var("DOMAIN") {
            Some(domain) => normalize_origin(&domain)?,
            None => format!("http://localhost:{}", port),
        };

        let database_url = var("DATABASE_URL").unwrap_or_else(|| "sqlite://filebed.db".to_string());

        let credentials = match (var("USERNAME"), var("PASSWORD")) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            _ => None,
        };

        let admin_path = var("ADMIN_PATH")
            .unwrap_or_else(|| "admin".to_string())
            .trim_matches('/')
            .to_string();
        if admin_path.is_empty() || !admin_path.chars().all(is_path_char) {
            return Err(ServerError::Config(format!(
                "ADMIN_PATH {:?} must be a single path segment of letters, digits, '-', '_', '.' or '~'",
                admin_path
            )));
        }
        if RESERVED_PATHS.contains(&admin_path.as_str()) {
            return Err(ServerError::Config(format!(
                "ADMIN_PATH {:?} collides with a built-in route",
                admin_path
            )));
        }

        let telegram = match (var("TG_BOT_TOKEN"), var("TG_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
            _ => None,
        };

        let defaults = TtlPolicy::default();
        let html_secs = num("CACHE_HTML_TTL_SECS", defaults.html_secs)?;
        let ttl = TtlPolicy {
            html_secs,
            media_secs: num("CACHE_MEDIA_TTL_SECS", defaults.media_secs)?,
            api_secs: num("CACHE_API_TTL_SECS", defaults.api_secs)?,
            default_secs: num("CACHE_DEFAULT_TTL_SECS", html_secs)?,
        };

        let max_upload_mb = num("MAX_SIZE_MB", 20)?;
        if max_upload_mb == 0 {
            return Err(ServerError::Config("MAX_SIZE_MB must be positive".to_string()));
        }
        let too_large = || ServerError::Config(format!("MAX_SIZE_MB {} is too large", max_upload_mb));
        let max_upload_bytes = max_upload_mb.checked_mul(1024 * 1024).ok_or_else(too_large)?;
        let body_limit_bytes = max_upload_bytes
            .checked_add(MULTIPART_OVERHEAD)
            .ok_or_else(too_large)?;

        let background_base_url = var("BACKGROUND_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BACKGROUND_BASE_URL.to_string());

        Ok(Self {
            port,
            origin,
            database_url,
            credentials,
            admin_path,
            enable_auth: flag(var("ENABLE_AUTH")),
            telegram,
            max_upload_bytes,
            body_limit_bytes,
            background_base_url,
            relay_timeout: Duration::from_secs(num("RELAY_TIMEOUT_SECS", 15)?),
            request_timeout: Duration::from_secs(num("REQUEST_TIMEOUT_SECS", 60)?),
            ttl,
            cache_max_bytes: num("CACHE_MAX_BYTES", 256 * 1024 * 1024)?,
            notify_uploads: flag(var("NOTIFY_UPLOADS")),
        })
    }

    /// Public URL for a media key
    pub fn media_url(&self, key: &str) -> String {
        format!("{}/{}", self.origin, key)
    }
}

/// Unreserved URL characters; anything else could be read as route syntax
fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')
}

fn flag(value: Option<String>) -> bool {
    value
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Accept `files.example.com` or `https://files.example.com/`
fn normalize_origin(domain: &str) -> Result<String> {
    let domain = domain.trim().trim_end_matches('/');
    let candidate = if domain.contains("://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    };

    let parsed = url::Url::parse(&candidate)
        .map_err(|e| ServerError::Config(format!("invalid DOMAIN {:?}: {}", domain, e)))?;
    if parsed.host_str().is_none() {
        return Err(ServerError::Config(format!("DOMAIN {:?} has no host", domain)));
    }

    Ok(parsed.origin().ascii_serialization())
}
