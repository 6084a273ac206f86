/// 虚拟机与统计表

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use common::models::VmRecord;
use common::{Error, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::debug;

use super::{db_err, VmRepository};
use crate::db::models::{vm, vm_statistics};

pub struct DbVmRepository {
    db: DatabaseConnection,
}

impl DbVmRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VmRepository for DbVmRepository {
    async fn get_or_create(&self, remote_vm_id: &str, title: &str) -> Result<VmRecord> {
        // 唯一约束保证并发调用不会产生重复记录
        let row = vm::ActiveModel {
            vm_id: Set(remote_vm_id.to_string()),
            title: Set(title.to_string()),
            ..Default::default()
        };
        vm::Entity::insert(row)
            .on_conflict(OnConflict::column(vm::Column::VmId).do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;

        vm::Entity::find()
            .filter(vm::Column::VmId.eq(remote_vm_id))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(Into::into)
            .ok_or_else(|| Error::Database(format!("虚拟机记录 {} 写入后不存在", remote_vm_id)))
    }

    async fn bulk_create_statistics(&self, statistics: HashMap<i32, serde_json::Value>) -> Result<()> {
        if statistics.is_empty() {
            return Ok(());
        }

        let created_at = Utc::now().fixed_offset();
        let count = statistics.len();
        let rows = statistics.into_iter().map(|(vm_id, payload)| vm_statistics::ActiveModel {
            vm_id: Set(vm_id),
            statistics: Set(payload),
            created_at: Set(created_at),
            ..Default::default()
        });

        vm_statistics::Entity::insert_many(rows)
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        debug!("写入 {} 条虚拟机统计", count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::setup_db;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_or_create_keeps_first_title() {
        let repo = DbVmRepository::new(setup_db().await);
        let first = repo.get_or_create("6f1c", "web-01").await.unwrap();
        let second = repo.get_or_create("6f1c", "renamed").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.title, "web-01");
        assert_eq!(vm::Entity::find().all(&repo.db).await.unwrap().len(), 1);

        let other = repo.get_or_create("7a2d", "db-01").await.unwrap();
        assert_ne!(other.id, first.id);
    }

    #[tokio::test]
    async fn test_bulk_create_shares_timestamp() {
        let repo = DbVmRepository::new(setup_db().await);
        let a = repo.get_or_create("a", "vm-a").await.unwrap();
        let b = repo.get_or_create("b", "vm-b").await.unwrap();

        let mut batch = HashMap::new();
        batch.insert(a.id, json!([{"metric_name": "cpu.usage.average", "unit": "PERCENT", "value": "1.0"}]));
        batch.insert(b.id, json!([]));
        repo.bulk_create_statistics(batch).await.unwrap();

        let rows = vm_statistics::Entity::find().all(&repo.db).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].created_at, rows[1].created_at);
    }

    #[tokio::test]
    async fn test_bulk_create_empty_is_noop() {
        let repo = DbVmRepository::new(setup_db().await);
        repo.bulk_create_statistics(HashMap::new()).await.unwrap();
        assert!(vm_statistics::Entity::find().all(&repo.db).await.unwrap().is_empty());
    }
}
