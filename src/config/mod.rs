use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub tenancy: TenancyConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub populator: PopulatorConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub public_prefix: String,
    pub admin_prefix: String,
    pub health_prefix: String,
    /// Paths under this prefix manage tenants and are never tenant-filtered
    pub tenant_management_prefix: String,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    pub header_name: String,
    pub query_param: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub store: StoreKind,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    /// Static bearer tokens accepted for write requests
    pub api_tokens: Vec<String>,
    /// Accept unauthenticated writes when no token source is configured
    pub allow_anonymous_writes: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulatorConfig {
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Some(v) = env::var("CMS_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_PUBLIC_PREFIX") {
            self.api.public_prefix = v;
        }
        if let Ok(v) = env::var("API_ADMIN_PREFIX") {
            self.api.admin_prefix = v;
        }
        if let Ok(v) = env::var("API_HEALTH_PREFIX") {
            self.api.health_prefix = v;
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }

        // Tenancy overrides
        if let Ok(v) = env::var("TENANCY_HEADER") {
            self.tenancy.header_name = v.to_ascii_lowercase();
        }
        if let Ok(v) = env::var("TENANCY_QUERY_PARAM") {
            self.tenancy.query_param = v;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("CMS_STORE") {
            self.database.store = match v.to_ascii_lowercase().as_str() {
                "memory" => StoreKind::Memory,
                _ => StoreKind::Postgres,
            };
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }
        if let Ok(v) = env::var("CMS_API_TOKENS") {
            self.security.api_tokens = split_list(&v);
        }
        if let Ok(v) = env::var("SECURITY_ALLOW_ANONYMOUS_WRITES") {
            self.security.allow_anonymous_writes = v.parse().unwrap_or(self.security.allow_anonymous_writes);
        }

        // Populator overrides
        if let Ok(v) = env::var("POPULATOR_REQUEST_TIMEOUT_SECS") {
            self.populator.request_timeout_secs = v.parse().unwrap_or(self.populator.request_timeout_secs);
        }

        self
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            api: ApiConfig {
                port: 1337,
                public_prefix: "/api".to_string(),
                admin_prefix: "/admin".to_string(),
                health_prefix: "/_health".to_string(),
                tenant_management_prefix: "/api/applications".to_string(),
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                default_page_size: 25,
                max_page_size: 100,
            },
            tenancy: TenancyConfig {
                header_name: "x-application-id".to_string(),
                query_param: "applicationId".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                store: StoreKind::Postgres,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![],
                api_tokens: vec![],
                allow_anonymous_writes: false,
            },
            populator: PopulatorConfig {
                request_timeout_secs: 30,
            },
        }
    }

    pub fn development() -> Self {
        let mut config = Self::base(Environment::Development);
        config.security.cors_origins = vec![
            "http://localhost:3000".to_string(),
            "http://localhost:5173".to_string(),
        ];
        config.security.allow_anonymous_writes = true;
        config.api.max_page_size = 1000;
        config
    }

    pub fn staging() -> Self {
        let mut config = Self::base(Environment::Staging);
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.api.max_request_size_bytes = 5 * 1024 * 1024; // 5MB
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config
    }

    pub fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.api.enable_request_logging = false;
        config.api.max_request_size_bytes = 2 * 1024 * 1024; // 2MB
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.security.allow_anonymous_writes);
        assert_eq!(config.api.public_prefix, "/api");
        assert_eq!(config.tenancy.header_name, "x-application-id");
        assert_eq!(config.tenancy.query_param, "applicationId");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.security.allow_anonymous_writes);
        assert_eq!(config.database.max_connections, 50);
        assert!(!config.api.enable_request_logging);
    }

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(split_list("a, b,,c "), vec!["a", "b", "c"]);
    }
}
