use std::str::FromStr;

/// Default request body cap for image uploads (25 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Listener settings, loaded from `<PREFIX>_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind (default: all interfaces).
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Read `<prefix>_HOST`, `<prefix>_PORT` and `<prefix>_MAX_UPLOAD_BYTES`.
    pub fn from_env(prefix: &str, default_port: u16) -> Self {
        Self {
            host: env_string(&format!("{prefix}_HOST"), "0.0.0.0"),
            port: env_parse(&format!("{prefix}_PORT"), default_port),
            max_upload_bytes: env_parse(
                &format!("{prefix}_MAX_UPLOAD_BYTES"),
                DEFAULT_MAX_UPLOAD_BYTES,
            ),
        }
    }

    pub fn bind_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

/// Parse an environment variable, falling back to `default` when it is
/// unset or does not parse.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparsable environment value");
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
