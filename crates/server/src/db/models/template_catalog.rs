/// 模板目录：本地 template_id → 目录 / vApp 模板 / 虚拟机模板

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "template_catalog")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub catalog_template_id: i32,
    pub vapp_template_id: i32,
    #[sea_orm(unique)]
    pub vm_template_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::catalog_template::Entity",
        from = "Column::CatalogTemplateId",
        to = "super::catalog_template::Column::Id"
    )]
    CatalogTemplate,

    #[sea_orm(
        belongs_to = "super::vapp_template::Entity",
        from = "Column::VappTemplateId",
        to = "super::vapp_template::Column::Id"
    )]
    VappTemplate,

    #[sea_orm(
        belongs_to = "super::vm_template::Entity",
        from = "Column::VmTemplateId",
        to = "super::vm_template::Column::Id"
    )]
    VmTemplate,
}

impl Related<super::catalog_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogTemplate.def()
    }
}

impl Related<super::vapp_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VappTemplate.def()
    }
}

impl Related<super::vm_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VmTemplate.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
