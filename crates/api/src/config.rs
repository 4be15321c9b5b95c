//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LOOMI_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `LOOMI_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `LOOMI_HOST` - Bind address (default: 127.0.0.1)
//! - `LOOMI_PORT` - Listen port (default: 8000)
//! - `LOOMI_JWT_TTL_MINUTES` - Access token lifetime (default: 60)
//! - `LOOMI_CORS_ORIGINS` - Comma separated allowed origins (default: none)
//! - `LOOMI_RATE_LIMIT` - Per-IP limiter on register/login (default: true)
//! - `LOOMI_SCHEDULER` - Run the delivery scheduler in-process (default: true)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Substrings that mark a secret as copied from a template (case-insensitive).
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    pub jwt: JwtConfig,
    /// Origins allowed by CORS; empty disables the CORS layer
    pub cors_origins: Vec<String>,
    /// Whether register/login are rate limited per client IP
    pub rate_limit: bool,
    /// Whether the delivery scheduler runs inside the API process
    pub scheduler: bool,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Access token configuration. `Debug` redacts the secret.
#[derive(Clone)]
pub struct JwtConfig {
    /// HS256 signing secret
    pub secret: SecretString,
    pub ttl_minutes: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from the process environment, after `.env`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the JWT secret looks like a placeholder or has too little entropy.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_vars(&Vars::process())
    }

    fn from_vars(vars: &Vars<'_>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("LOOMI_DATABASE_URL")
            .or_else(|| vars.get("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("LOOMI_DATABASE_URL".to_string()))?;

        Ok(Self {
            database_url,
            host: vars.parse_or("LOOMI_HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: vars.parse_or("LOOMI_PORT", 8000)?,
            jwt: JwtConfig::from_vars(vars)?,
            cors_origins: vars
                .get("LOOMI_CORS_ORIGINS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            rate_limit: vars.flag_or("LOOMI_RATE_LIMIT", true)?,
            scheduler: vars.flag_or("LOOMI_SCHEDULER", true)?,
            sentry_dsn: vars.get("SENTRY_DSN"),
            sentry_environment: vars.get("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: vars.parse_or("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: vars.parse_or("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl JwtConfig {
    fn from_vars(vars: &Vars<'_>) -> Result<Self, ConfigError> {
        const KEY: &str = "LOOMI_JWT_SECRET";

        let secret = vars
            .get(KEY)
            .ok_or_else(|| ConfigError::MissingEnvVar(KEY.to_string()))?;
        check_secret(&secret).map_err(|reason| ConfigError::InsecureSecret(KEY.to_string(), reason))?;

        let ttl_minutes: i64 = vars.parse_or("LOOMI_JWT_TTL_MINUTES", 60)?;
        if ttl_minutes <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "LOOMI_JWT_TTL_MINUTES".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Self {
            secret: SecretString::from(secret),
            ttl_minutes,
        })
    }
}

/// Database URL from `primary_key`, falling back to `DATABASE_URL`.
///
/// Shared with the CLI so both binaries resolve the same database.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` naming `primary_key` when neither is set.
pub fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    let vars = Vars::process();
    vars.get(primary_key)
        .or_else(|| vars.get("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Variable source: the process environment, or a map in tests.
struct Vars<'a> {
    lookup: Box<dyn Fn(&str) -> Option<String> + 'a>,
}

impl<'a> Vars<'a> {
    fn process() -> Self {
        Self {
            lookup: Box::new(|key| std::env::var(key).ok()),
        }
    }

    #[cfg(test)]
    fn from_map(map: &'a HashMap<&str, &str>) -> Self {
        Self {
            lookup: Box::new(move |key| map.get(key).map(|v| (*v).to_owned())),
        }
    }

    /// The variable, unless unset or blank.
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// `true/false`, `1/0`, `yes/no` or `on/off`.
    fn flag_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("not a boolean: {raw}"),
            )),
        }
    }
}

/// Split a comma separated list, dropping empty entries.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Reject short, templated or low-entropy signing secrets.
fn check_secret(secret: &str) -> Result<(), String> {
    let length = secret.chars().count();
    if length < MIN_JWT_SECRET_LENGTH {
        return Err(format!(
            "must be at least {MIN_JWT_SECRET_LENGTH} characters (got {length})"
        ));
    }

    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(format!("appears to be a placeholder (contains '{pattern}')"));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(format!(
            "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
        ));
    }
    Ok(())
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0u32;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = f64::from(total);
    counts
        .values()
        .map(|&count| {
            let p = f64::from(count) / total;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const GOOD_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    fn load(pairs: &[(&'static str, &'static str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        ApiConfig::from_vars(&Vars::from_map(&map))
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/loomi"),
            ("LOOMI_JWT_SECRET", GOOD_SECRET),
        ])
        .unwrap();

        assert_eq!(config.database_url.expose_secret(), "postgres://localhost/loomi");
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8000");
        assert_eq!(config.jwt.ttl_minutes, 60);
        assert!(config.cors_origins.is_empty());
        assert!(config.rate_limit && config.scheduler);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("LOOMI_DATABASE_URL", "postgres://db/loomi"),
            ("DATABASE_URL", "postgres://ignored/other"),
            ("LOOMI_JWT_SECRET", GOOD_SECRET),
            ("LOOMI_PORT", "9000"),
            ("LOOMI_CORS_ORIGINS", "http://localhost:5173, https://loomi.fr,,"),
            ("LOOMI_RATE_LIMIT", " off "),
            ("LOOMI_SCHEDULER", "0"),
        ])
        .unwrap();

        assert_eq!(config.database_url.expose_secret(), "postgres://db/loomi");
        assert_eq!(config.port, 9000);
        assert_eq!(config.cors_origins, ["http://localhost:5173", "https://loomi.fr"]);
        assert!(!config.rate_limit);
        assert!(!config.scheduler);
    }

    #[test]
    fn test_invalid_values() {
        let missing_db = load(&[("LOOMI_JWT_SECRET", GOOD_SECRET)]);
        assert!(matches!(missing_db, Err(ConfigError::MissingEnvVar(k)) if k == "LOOMI_DATABASE_URL"));

        let bad_flag = load(&[
            ("DATABASE_URL", "postgres://localhost/loomi"),
            ("LOOMI_JWT_SECRET", GOOD_SECRET),
            ("LOOMI_SCHEDULER", "maybe"),
        ]);
        assert!(matches!(bad_flag, Err(ConfigError::InvalidEnvVar(k, _)) if k == "LOOMI_SCHEDULER"));

        let bad_ttl = load(&[
            ("DATABASE_URL", "postgres://localhost/loomi"),
            ("LOOMI_JWT_SECRET", GOOD_SECRET),
            ("LOOMI_JWT_TTL_MINUTES", "0"),
        ]);
        assert!(matches!(bad_ttl, Err(ConfigError::InvalidEnvVar(..))));
    }

    #[test]
    fn test_check_secret() {
        assert!(check_secret(GOOD_SECRET).is_ok());
        assert!(check_secret("short").unwrap_err().contains("at least 32"));
        assert!(check_secret("your-jwt-secret-goes-right-here-ok").unwrap_err().contains("placeholder"));
        assert!(check_secret(&"ab".repeat(20)).unwrap_err().contains("entropy"));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!(shannon_entropy("").abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_jwt_config_debug_redacts_secret() {
        let jwt = JwtConfig {
            secret: SecretString::from("super_secret_signing_key"),
            ttl_minutes: 60,
        };
        let debug_output = format!("{jwt:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_signing_key"));
    }
}
