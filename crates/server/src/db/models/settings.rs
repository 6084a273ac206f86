/// 网关设置（单行）

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 唯一的设置行固定使用该主键
pub const SETTINGS_ID: i32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    #[sea_orm(unique, column_type = "Text")]
    pub vcd_api_jwt: Option<String>,
    #[sea_orm(unique)]
    pub default_vdc: Option<String>,
    #[sea_orm(unique)]
    pub default_vapp: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for common::models::StoredCredentialState {
    fn from(model: Model) -> Self {
        Self {
            api_token: model.vcd_api_jwt,
            default_vdc_title: model.default_vdc,
            default_vapp_title: model.default_vapp,
        }
    }
}
