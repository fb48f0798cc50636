// src/db.rs
use crate::config::AppConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

pub type DbPool = DatabaseConnection;

pub async fn create_db_pool(config: &AppConfig) -> Result<DbPool, DbErr> {
    let url = config
        .database_url
        .clone()
        .ok_or_else(|| DbErr::Custom("DATABASE_URL is not configured".to_string()))?;

    let timeout = config.erasure.db_timeout();
    let mut opt = ConnectOptions::new(url);

    // 接続オプションを設定（全ての待ち時間に上限を設ける）
    opt.max_connections(20)
        .min_connections(2)
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(30 * 60))
        .sqlx_logging(config.is_development());

    Database::connect(opt).await
}
