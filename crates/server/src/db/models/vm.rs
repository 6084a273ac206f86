/// 虚拟机数据模型

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 统计任务见过的虚拟机，vm_id 为 vCD 中的 ID
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vm")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub vm_id: String,
    pub title: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vm_statistics::Entity")]
    Statistics,
}

impl Related<super::vm_statistics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Statistics.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for common::models::VmRecord {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            remote_vm_id: model.vm_id,
            title: model.title,
        }
    }
}
