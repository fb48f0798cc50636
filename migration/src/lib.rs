// migration/src/lib.rs
pub use sea_orm_migration::prelude::*;

// マーケットプレイス側のテーブル（削除計画の対象）
mod m20250801_000001_create_subject_profile_tables;
mod m20250801_000002_create_marketplace_tables;

// 削除リクエスト関連マイグレーション
mod m20250801_000003_create_deletion_requests_table;
mod m20250801_000004_create_erasure_audit_events_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            // 1. サブジェクトのプロフィール（依存関係なし）
            Box::new(m20250801_000001_create_subject_profile_tables::Migration),
            // 2. プロフィールを参照するマーケットプレイスのテーブル
            Box::new(m20250801_000002_create_marketplace_tables::Migration),
            // 3. 削除リクエストと監査イベント
            Box::new(m20250801_000003_create_deletion_requests_table::Migration),
            Box::new(m20250801_000004_create_erasure_audit_events_table::Migration),
        ]
    }
}
