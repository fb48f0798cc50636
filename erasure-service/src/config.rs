// src/config.rs
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// 削除リクエストの保存先
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" | "in_memory" => Ok(Self::Memory),
            other => Err(format!("Unknown STORE_BACKEND value: {}", other)),
        }
    }
}

/// Erasure workflow tuning.
#[derive(Clone, Debug)]
pub struct ErasureConfig {
    pub grace_period_days: i64,
    pub batch_interval_secs: u64,
    pub batch_size: u64,
    pub stale_processing_threshold_secs: i64,
    pub db_timeout_secs: u64,
    pub notification_timeout_secs: u64,
    pub scheduler_enabled: bool,
}

impl Default for ErasureConfig {
    fn default() -> Self {
        Self {
            grace_period_days: 30,
            batch_interval_secs: 60 * 60,
            batch_size: 100,
            stale_processing_threshold_secs: 60 * 60,
            db_timeout_secs: 10,
            notification_timeout_secs: 15,
            scheduler_enabled: true,
        }
    }
}

impl ErasureConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        let config = Self {
            grace_period_days: parse_env("ERASURE_GRACE_PERIOD_DAYS", defaults.grace_period_days)?,
            batch_interval_secs: parse_env(
                "ERASURE_BATCH_INTERVAL_SECS",
                defaults.batch_interval_secs,
            )?,
            batch_size: parse_env("ERASURE_BATCH_SIZE", defaults.batch_size)?,
            stale_processing_threshold_secs: parse_env(
                "ERASURE_STALE_THRESHOLD_SECS",
                defaults.stale_processing_threshold_secs,
            )?,
            db_timeout_secs: parse_env("ERASURE_DB_TIMEOUT_SECS", defaults.db_timeout_secs)?,
            notification_timeout_secs: parse_env(
                "ERASURE_NOTIFICATION_TIMEOUT_SECS",
                defaults.notification_timeout_secs,
            )?,
            scheduler_enabled: parse_env(
                "ERASURE_SCHEDULER_ENABLED",
                defaults.scheduler_enabled,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// 設定の検証
    pub fn validate(&self) -> Result<(), String> {
        if self.grace_period_days < 0 {
            return Err(format!(
                "ERASURE_GRACE_PERIOD_DAYS must not be negative: {}",
                self.grace_period_days
            ));
        }
        if self.batch_interval_secs == 0 {
            return Err("ERASURE_BATCH_INTERVAL_SECS must be greater than 0".to_string());
        }
        if self.batch_size == 0 {
            return Err("ERASURE_BATCH_SIZE must be greater than 0".to_string());
        }
        if self.stale_processing_threshold_secs <= 0 {
            return Err("ERASURE_STALE_THRESHOLD_SECS must be greater than 0".to_string());
        }
        if self.db_timeout_secs == 0 {
            return Err("ERASURE_DB_TIMEOUT_SECS must be greater than 0".to_string());
        }
        if self.notification_timeout_secs == 0 {
            return Err("ERASURE_NOTIFICATION_TIMEOUT_SECS must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn grace_period(&self) -> chrono::Duration {
        chrono::Duration::days(self.grace_period_days)
    }

    pub fn stale_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_processing_threshold_secs)
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_secs(self.batch_interval_secs)
    }

    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_secs)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.notification_timeout_secs)
    }
}

/// 通知ゲートウェイ設定
#[derive(Clone, Debug)]
pub struct NotificationConfig {
    /// 開発モードではリンクをログに出すだけ
    pub development_mode: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
    /// Base URL the verify/cancel links point at.
    pub link_base_url: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            development_mode: true,
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "privacy@example.com".to_string(),
            from_name: "Rental Marketplace Privacy Team".to_string(),
            link_base_url: "http://localhost:3001".to_string(),
        }
    }
}

impl NotificationConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        let development_mode = parse_env("EMAIL_DEVELOPMENT_MODE", true)?;

        let config = Self {
            development_mode,
            smtp_host: env::var("SMTP_HOST").unwrap_or(defaults.smtp_host),
            smtp_port: parse_env("SMTP_PORT", defaults.smtp_port)?,
            smtp_username: env::var("SMTP_USERNAME").unwrap_or_default(),
            smtp_password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            from_email: env::var("FROM_EMAIL").unwrap_or(defaults.from_email),
            from_name: env::var("FROM_NAME").unwrap_or(defaults.from_name),
            link_base_url: env::var("FRONTEND_URL").unwrap_or(defaults.link_base_url),
        };
        config.validate()?;
        Ok(config)
    }

    /// 設定の検証
    pub fn validate(&self) -> Result<(), String> {
        if self.development_mode {
            return Ok(());
        }
        if self.smtp_host.is_empty() {
            return Err("SMTP_HOST is required".to_string());
        }
        if self.smtp_username.is_empty() || self.smtp_password.is_empty() {
            return Err("SMTP_USERNAME and SMTP_PASSWORD are required".to_string());
        }
        if !self.from_email.contains('@') {
            return Err(format!("Invalid FROM_EMAIL: {}", self.from_email));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub store_backend: StoreBackend,
    pub admin_api_token: String,
    pub erasure: ErasureConfig,
    pub notification: NotificationConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok(); // .env ファイルを読み込む (存在しなくてもエラーにしない)

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let store_backend: StoreBackend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;
        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err("DATABASE_URL must be set when STORE_BACKEND=postgres".to_string());
        }

        Ok(Self {
            environment,
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_env("PORT", 5000)?,
            database_url,
            store_backend,
            admin_api_token: env::var("ADMIN_API_TOKEN")
                .map_err(|_| "ADMIN_API_TOKEN must be set")?,
            erasure: ErasureConfig::from_env()?,
            notification: NotificationConfig::from_env()?,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// テスト用の設定を作成
    pub fn for_testing() -> Self {
        Self {
            environment: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5000,
            database_url: None,
            store_backend: StoreBackend::Memory,
            admin_api_token: "test-admin-token".to_string(),
            erasure: ErasureConfig {
                scheduler_enabled: false,
                ..Default::default()
            },
            notification: NotificationConfig::default(),
        }
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("Invalid {} value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}
