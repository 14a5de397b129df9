use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub tenancy: TenancyConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the registry database and one database file per tenant
    pub data_root: PathBuf,
    /// File stem of the registry database (also the default, tenant-less binding)
    pub registry_name: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub busy_timeout_ms: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Explicit tenant-selection header, consulted when the principal has no tenant
    pub header_name: String,
    pub declarations_path: PathBuf,
    /// Identifier prefix of the tenant type family (never provisioned, never a FK target)
    pub tenant_family: String,
    /// Identifier prefixes of framework-internal families (never provisioned)
    pub internal_families: Vec<String>,
    pub registry_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub max_page_size: u32,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
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
        // Database overrides
        if let Ok(v) = env::var("DATABASE_DATA_ROOT") {
            self.database.data_root = PathBuf::from(v);
        }
        if let Ok(v) = env::var("DATABASE_REGISTRY_NAME") {
            self.database.registry_name = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_BUSY_TIMEOUT_MS") {
            self.database.busy_timeout_ms = v.parse().unwrap_or(self.database.busy_timeout_ms);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // Tenancy overrides
        if let Ok(v) = env::var("TENANCY_HEADER_NAME") {
            self.tenancy.header_name = v.to_ascii_lowercase();
        }
        if let Ok(v) = env::var("TENANCY_DECLARATIONS_PATH") {
            self.tenancy.declarations_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("TENANCY_TENANT_FAMILY") {
            self.tenancy.tenant_family = v;
        }
        if let Ok(v) = env::var("TENANCY_INTERNAL_FAMILIES") {
            self.tenancy.internal_families = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("TENANCY_REGISTRY_CACHE_TTL_SECS") {
            self.tenancy.registry_cache_ttl_secs = v.parse().unwrap_or(self.tenancy.registry_cache_ttl_secs);
        }

        // API overrides
        if let Ok(v) = env::var("MONK_API_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                data_root: PathBuf::from("data"),
                registry_name: "default".to_string(),
                max_connections: 5,
                connection_timeout: 30,
                busy_timeout_ms: 5_000,
                enable_query_logging: true,
            },
            tenancy: TenancyConfig::default(),
            api: ApiConfig {
                port: 3000,
                max_page_size: 1000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: "development-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                data_root: PathBuf::from("/var/lib/monk/data"),
                registry_name: "default".to_string(),
                max_connections: 10,
                connection_timeout: 10,
                busy_timeout_ms: 5_000,
                enable_query_logging: true,
            },
            tenancy: TenancyConfig {
                registry_cache_ttl_secs: 30,
                ..TenancyConfig::default()
            },
            api: ApiConfig {
                port: 3000,
                max_page_size: 500,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                data_root: PathBuf::from("/var/lib/monk/data"),
                registry_name: "default".to_string(),
                max_connections: 20,
                connection_timeout: 5,
                busy_timeout_ms: 10_000,
                enable_query_logging: false,
            },
            tenancy: TenancyConfig {
                registry_cache_ttl_secs: 60,
                ..TenancyConfig::default()
            },
            api: ApiConfig {
                port: 3000,
                max_page_size: 100,
                enable_request_logging: false,
            },
            security: SecurityConfig {
                enable_cors: false,
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
            },
        }
    }

    /// Development defaults rooted at `data_root`, ignoring the environment.
    pub fn for_data_root(data_root: impl Into<PathBuf>) -> Self {
        let mut config = Self::development();
        config.database.data_root = data_root.into();
        config.database.enable_query_logging = false;
        config
    }
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            header_name: "x-tenant".to_string(),
            declarations_path: PathBuf::from("content-types"),
            tenant_family: "api::tenant.".to_string(),
            internal_families: vec!["admin::".to_string(), "plugin::".to_string()],
            registry_cache_ttl_secs: 5,
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
        assert_eq!(config.database.registry_name, "default");
        assert_eq!(config.tenancy.header_name, "x-tenant");
        assert_eq!(config.api.max_page_size, 1000);
        assert!(!config.security.jwt_secret.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.database.enable_query_logging);
        assert_eq!(config.api.max_page_size, 100);
        assert!(config.security.jwt_secret.is_empty());
    }

    #[test]
    fn test_tenancy_families() {
        let tenancy = TenancyConfig::default();
        assert_eq!(tenancy.tenant_family, "api::tenant.");
        assert_eq!(tenancy.internal_families, vec!["admin::", "plugin::"]);
    }

    #[test]
    fn test_for_data_root_overrides_path() {
        let config = AppConfig::for_data_root("/tmp/monk-test");
        assert_eq!(config.database.data_root, PathBuf::from("/tmp/monk-test"));
    }
}
