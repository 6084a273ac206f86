/// 虚拟机模板名称

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vm_template")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub title: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::template_catalog::Entity")]
    TemplateCatalog,
}

impl Related<super::template_catalog::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TemplateCatalog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
