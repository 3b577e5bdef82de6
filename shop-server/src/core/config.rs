use std::path::PathBuf;
use std::time::Duration;

use crate::auth::JwtConfig;
use crate::core::{Result, ServerError};
use crate::payment::VnpayConfig;

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Notes |
/// |----------|---------|-------|
/// | WORK_DIR | ./data | database and log files |
/// | HTTP_PORT | 3000 | |
/// | ENVIRONMENT | development | development, staging or production |
/// | LOG_LEVEL | info | |
/// | LOG_DIR | (unset) | enables daily rolling file output |
/// | CACHE_TTL_SECS | 300 | order read cache |
/// | AUDIT_BUFFER_SIZE | 1024 | audit channel capacity |
/// | JWT_SECRET | | required outside development |
/// | JWT_ISSUER | shop-auth | |
/// | JWT_AUDIENCE | shop-clients | |
/// | VNP_TMN_CODE | | required outside development |
/// | VNP_HASH_SECRET | | required outside development |
/// | VNP_URL | VNPay sandbox | |
/// | VNP_RETURN_URL | http://localhost:3000/api/payment/vnpay/return | |
/// | VNP_LOCALE | vn | |
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub http_port: u16,
    /// development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub cache_ttl_secs: u64,
    pub audit_buffer_size: usize,
    pub jwt: JwtConfig,
    pub vnpay: VnpayConfig,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(ServerError::Config(format!(
                        "{name} must be set in {environment} environment"
                    )));
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(ServerError::Config(format!(
                "{name} must not be empty in {environment} environment"
            )));
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let http_port = std::env::var("HTTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let mut jwt = JwtConfig::new(Self::require_secret("JWT_SECRET", &environment)?);
        if let Ok(issuer) = std::env::var("JWT_ISSUER") {
            jwt.issuer = issuer;
        }
        if let Ok(audience) = std::env::var("JWT_AUDIENCE") {
            jwt.audience = audience;
        }

        let defaults = VnpayConfig::default();
        let vnpay = VnpayConfig {
            tmn_code: Self::require_secret("VNP_TMN_CODE", &environment)?,
            hash_secret: Self::require_secret("VNP_HASH_SECRET", &environment)?,
            pay_url: std::env::var("VNP_URL").unwrap_or(defaults.pay_url),
            return_url: std::env::var("VNP_RETURN_URL").unwrap_or_else(|_| {
                format!("http://localhost:{http_port}/api/payment/vnpay/return")
            }),
            locale: std::env::var("VNP_LOCALE").unwrap_or(defaults.locale),
        };

        Ok(Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port,
            environment: environment.clone(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
            cache_ttl_secs: std::env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            audit_buffer_size: std::env::var("AUDIT_BUFFER_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1024),
            jwt,
            vnpay,
        })
    }

    /// Development configuration rooted at `work_dir`, ignoring the environment
    ///
    /// Used by tests and local tooling.
    pub fn development(work_dir: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            http_port: 3000,
            environment: "development".into(),
            log_level: "debug".into(),
            log_dir: None,
            cache_ttl_secs: 300,
            audit_buffer_size: 1024,
            jwt: JwtConfig::new("dev-JWT_SECRET-not-for-production"),
            vnpay: VnpayConfig {
                tmn_code: "DEVTMN01".into(),
                hash_secret: "dev-VNP_HASH_SECRET-not-for-production".into(),
                ..VnpayConfig::default()
            },
        }
    }

    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_dir().join("shop.redb")
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Create the work directory layout if missing
    pub fn ensure_work_dir_structure(&self) -> Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        if let Some(dir) = &self.log_dir {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_secret_in_development_falls_back() {
        let value = Config::require_secret("SHOP_TEST_UNSET_SECRET_A", "development").unwrap();
        assert_eq!(value, "dev-SHOP_TEST_UNSET_SECRET_A-not-for-production");
    }

    #[test]
    fn test_require_secret_outside_development_fails() {
        let err = Config::require_secret("SHOP_TEST_UNSET_SECRET_B", "production").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn test_development_paths() {
        let config = Config::development("/tmp/shop");
        assert!(config.is_development());
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/shop/database/shop.redb")
        );
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
    }
}
