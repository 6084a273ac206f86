/// 模板目录（只读）

use async_trait::async_trait;
use common::models::TemplateCatalogEntry;
use common::{Error, Result};
use sea_orm::{DatabaseConnection, EntityTrait};

use super::{db_err, TemplateCatalogRepository};
use crate::db::models::{catalog_template, template_catalog, vapp_template, vm_template};

pub struct DbTemplateCatalogRepository {
    db: DatabaseConnection,
}

impl DbTemplateCatalogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TemplateCatalogRepository for DbTemplateCatalogRepository {
    async fn get(&self, template_id: i32) -> Result<Option<TemplateCatalogEntry>> {
        let Some(entry) = template_catalog::Entity::find_by_id(template_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let catalog = catalog_template::Entity::find_by_id(entry.catalog_template_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        let vapp = vapp_template::Entity::find_by_id(entry.vapp_template_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        let vm = vm_template::Entity::find_by_id(entry.vm_template_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        match (catalog, vapp, vm) {
            (Some(catalog), Some(vapp), Some(vm)) => Ok(Some(TemplateCatalogEntry {
                id: entry.id,
                catalog_title: catalog.title,
                vapp_template_title: vapp.title,
                vm_template_title: vm.title,
            })),
            _ => Err(Error::Database(format!("模板目录 {} 引用了不存在的模板", template_id))),
        }
    }
}
