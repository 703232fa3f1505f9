use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub filter: FilterConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub email: EmailConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Base URL used when building links sent by email. Falls back to the request host.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub default_limit: i64,
    pub max_limit: Option<i64>,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
    /// Requests allowed per client IP under `/api` in one window; 0 disables the limit
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expires_in_secs: i64,
    pub bcrypt_cost: u32,
    pub allow_signup_role: bool,
    pub reset_token_ttl_secs: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmailTransport {
    Smtp,
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub transport: EmailTransport,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub enabled: bool,
    pub log_path: String,
    pub movie_created_by: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),
}

const DEV_JWT_SECRET: &str = "development-only-secret-change-me";

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").or_else(|_| env::var("NODE_ENV")).as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    /// Reject configurations that cannot serve traffic safely.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if self.security.jwt_secret.is_empty()
            || (self.is_production() && self.security.jwt_secret == DEV_JWT_SECRET)
        {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("PUBLIC_URL") {
            self.server.public_url = Some(v.trim_end_matches('/').to_string());
        }

        // Filter overrides
        if let Ok(v) = env::var("FILTER_MAX_LIMIT") {
            self.filter.max_limit = v.parse().ok();
        }
        if let Ok(v) = env::var("FILTER_DEBUG_LOGGING") {
            self.filter.debug_logging = v.parse().unwrap_or(self.filter.debug_logging);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_MAX") {
            self.api.rate_limit_max = v.parse().unwrap_or(self.api.rate_limit_max);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_WINDOW_SECS") {
            self.api.rate_limit_window_secs = v.parse().unwrap_or(self.api.rate_limit_window_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRES_IN_SECS") {
            self.security.jwt_expires_in_secs = v.parse().unwrap_or(self.security.jwt_expires_in_secs);
        }
        if let Ok(v) = env::var("BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Ok(v) = env::var("SECURITY_ALLOW_SIGNUP_ROLE") {
            self.security.allow_signup_role = v.parse().unwrap_or(self.security.allow_signup_role);
        }

        // Email overrides
        if let Ok(v) = env::var("EMAIL_TRANSPORT") {
            self.email.transport = match v.to_ascii_lowercase().as_str() {
                "smtp" => EmailTransport::Smtp,
                "log" => EmailTransport::Log,
                _ => self.email.transport,
            };
        }
        if let Ok(v) = env::var("EMAIL_HOST") {
            self.email.host = v;
        }
        if let Ok(v) = env::var("EMAIL_PORT") {
            self.email.port = v.parse().unwrap_or(self.email.port);
        }
        if let Ok(v) = env::var("EMAIL_USER") {
            self.email.user = Some(v);
        }
        if let Ok(v) = env::var("EMAIL_PASSWORD") {
            self.email.password = Some(v);
        }
        if let Ok(v) = env::var("EMAIL_FROM") {
            self.email.from = v;
        }

        // Audit overrides
        if let Ok(v) = env::var("AUDIT_ENABLED") {
            self.audit.enabled = v.parse().unwrap_or(self.audit.enabled);
        }
        if let Ok(v) = env::var("AUDIT_LOG_PATH") {
            self.audit.log_path = v;
        }
        if let Ok(v) = env::var("MOVIE_CREATED_BY") {
            self.audit.movie_created_by = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                public_url: None,
            },
            filter: FilterConfig {
                default_limit: 10,
                max_limit: Some(1000),
                debug_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024, // 10KB
                rate_limit_max: 1000,
                rate_limit_window_secs: 60 * 60,
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expires_in_secs: 90 * 24 * 60 * 60, // 90 days
                bcrypt_cost: 4,
                allow_signup_role: true,
                reset_token_ttl_secs: 10 * 60,
            },
            email: EmailConfig {
                transport: EmailTransport::Log,
                host: "localhost".to_string(),
                port: 2525,
                user: None,
                password: None,
                from: "Movie Catalog <support@moviecatalog.local>".to_string(),
            },
            audit: AuditConfig {
                enabled: true,
                log_path: "./Log/Log.txt".to_string(),
                movie_created_by: "DIBAKAR".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                public_url: None,
            },
            filter: FilterConfig {
                default_limit: 10,
                max_limit: Some(100),
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 10 * 1024, // 10KB
                rate_limit_max: 1000,
                rate_limit_window_secs: 60 * 60,
            },
            security: SecurityConfig {
                enable_cors: false,
                jwt_secret: String::new(),
                jwt_expires_in_secs: 24 * 60 * 60, // 1 day
                bcrypt_cost: 12,
                allow_signup_role: false,
                reset_token_ttl_secs: 10 * 60,
            },
            email: EmailConfig {
                transport: EmailTransport::Smtp,
                host: "localhost".to_string(),
                port: 587,
                user: None,
                password: None,
                from: "Movie Catalog <support@moviecatalog.local>".to_string(),
            },
            audit: AuditConfig {
                enabled: true,
                log_path: "./Log/Log.txt".to_string(),
                movie_created_by: "DIBAKAR".to_string(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

// Helper macros for common checks
#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.filter.max_limit, Some(1000));
        assert_eq!(config.email.transport, EmailTransport::Log);
        assert!(config.security.allow_signup_role);
        assert!(!config.security.jwt_secret.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.filter.max_limit, Some(100));
        assert_eq!(config.security.bcrypt_cost, 12);
        assert!(!config.security.allow_signup_role);
        assert!(config.is_production());
    }

    #[test]
    fn production_requires_secret_and_database() {
        let mut config = AppConfig::production();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("DATABASE_URL"))));

        config.database.url = Some("postgres://localhost/movies".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Missing("JWT_SECRET"))));

        config.security.jwt_secret = DEV_JWT_SECRET.to_string();
        assert!(config.validate().is_err());

        config.security.jwt_secret = "a-real-secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reset_tokens_live_ten_minutes() {
        assert_eq!(AppConfig::development().security.reset_token_ttl_secs, 600);
        assert_eq!(AppConfig::production().security.reset_token_ttl_secs, 600);
    }
}
