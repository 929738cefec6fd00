//! Environment variable parsing helpers shared by service configs

use std::str::FromStr;

/// Parse an environment variable, falling back to `default` when unset or unparsable
///
/// # Example
/// ```ignore
/// let port: u16 = parse_env_with_default("API_PORT", 8080);
/// ```
pub fn parse_env_with_default<T: FromStr>(key: &str, default: T) -> T {
    parse_env_optional(key).unwrap_or(default)
}

/// Parse an environment variable, returning None if missing or invalid
pub fn parse_env_optional<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse a required environment variable
pub fn parse_env_required<T: FromStr>(key: &str) -> Result<T, String> {
    std::env::var(key)
        .map_err(|_| format!("{key} environment variable not set"))?
        .trim()
        .parse()
        .map_err(|_| format!("Failed to parse environment variable {key}"))
}
