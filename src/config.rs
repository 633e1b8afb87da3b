use anyhow::Result;
use std::env;

/// Selects the process-local store instead of Postgres.
pub const MEMORY_DATABASE_URL: &str = "memory";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_days: i64,
    pub bcrypt_cost: u32,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub client_base_url: String,
    pub admin_email: String,
    pub admin_password: String,
    pub manager_email: String,
    pub manager_password: String,
    pub mail_from: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_env_only()
    }

    /// Load configuration from environment variables only (without loading .env files)
    /// This is useful for testing where you want to control the environment directly
    pub fn from_env_only() -> Result<Self> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://@localhost:5432/ems".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                "your-super-secret-jwt-key-change-this-in-production-12345".to_string()
            }),
            jwt_expiration_days: env::var("JWT_EXPIRATION_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .unwrap_or(7),
            bcrypt_cost: env::var("BCRYPT_COST")
                .ok()
                .and_then(|cost| cost.parse().ok())
                .unwrap_or(bcrypt::DEFAULT_COST),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            client_base_url: env::var("CLIENT_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            admin_email: env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@ems.com".to_string()),
            admin_password: env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin123".to_string()),
            manager_email: env::var("MANAGER_EMAIL")
                .unwrap_or_else(|_| "manager@ems.com".to_string()),
            manager_password: env::var("MANAGER_PASSWORD")
                .unwrap_or_else(|_| "manager123".to_string()),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "EMS <no-reply@ems.local>".to_string()),
        })
    }

    /// Configuration for tests: in-memory storage and fixed credentials.
    pub fn test_config() -> Self {
        Config {
            database_url: MEMORY_DATABASE_URL.to_string(),
            jwt_secret: "test-secret-key-for-ems-tests".to_string(),
            jwt_expiration_days: 1,
            bcrypt_cost: 4,
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            client_base_url: "http://localhost:3000".to_string(),
            admin_email: "admin@ems.com".to_string(),
            admin_password: "admin123".to_string(),
            manager_email: "manager@ems.com".to_string(),
            manager_password: "manager123".to_string(),
            mail_from: "EMS <no-reply@ems.local>".to_string(),
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
