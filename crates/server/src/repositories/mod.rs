/// 持久化接口
///
/// 服务层只依赖这些 trait，生产环境使用 SeaORM 实现，测试使用内存实现。

pub mod settings_repository;
pub mod template_catalog_repository;
pub mod vm_repository;

use std::collections::HashMap;

use async_trait::async_trait;
use common::models::{StoredCredentialState, TemplateCatalogEntry, VmRecord};
use common::{Error, Result};
use sea_orm::DbErr;

pub use settings_repository::DbSettingsRepository;
pub use template_catalog_repository::DbTemplateCatalogRepository;
pub use vm_repository::DbVmRepository;

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// 读取设置，不存在时创建空记录
    async fn get_or_create(&self) -> Result<StoredCredentialState>;

    /// 覆盖保存的 vCD 令牌
    async fn update_api_token(&self, token: &str) -> Result<()>;
}

#[async_trait]
pub trait TemplateCatalogRepository: Send + Sync {
    async fn get(&self, template_id: i32) -> Result<Option<TemplateCatalogEntry>>;
}

#[async_trait]
pub trait VmRepository: Send + Sync {
    /// 按远端 ID 取得或创建记录，已存在时不修改名称
    async fn get_or_create(&self, remote_vm_id: &str, title: &str) -> Result<VmRecord>;

    /// 一次写入多台虚拟机的统计，共用同一个时间戳
    async fn bulk_create_statistics(&self, statistics: HashMap<i32, serde_json::Value>) -> Result<()>;
}

pub(crate) fn db_err(err: DbErr) -> Error {
    Error::Database(err.to_string())
}
