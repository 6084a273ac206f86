/// 设置表

use async_trait::async_trait;
use common::models::StoredCredentialState;
use common::{Error, Result};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::debug;

use super::{db_err, SettingsRepository};
use crate::db::models::settings::{self, SETTINGS_ID};

pub struct DbSettingsRepository {
    db: DatabaseConnection,
}

impl DbSettingsRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn ensure_row(&self) -> Result<settings::Model> {
        if let Some(model) = settings::Entity::find_by_id(SETTINGS_ID)
            .one(&self.db)
            .await
            .map_err(db_err)?
        {
            return Ok(model);
        }

        debug!("创建设置记录");
        let row = settings::ActiveModel {
            id: Set(SETTINGS_ID),
            ..Default::default()
        };
        settings::Entity::insert(row)
            .on_conflict(OnConflict::column(settings::Column::Id).do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;

        settings::Entity::find_by_id(SETTINGS_ID)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| Error::Database("设置记录创建后仍不存在".to_string()))
    }
}

#[async_trait]
impl SettingsRepository for DbSettingsRepository {
    async fn get_or_create(&self) -> Result<StoredCredentialState> {
        Ok(self.ensure_row().await?.into())
    }

    async fn update_api_token(&self, token: &str) -> Result<()> {
        self.ensure_row().await?;
        settings::Entity::update_many()
            .col_expr(settings::Column::VcdApiJwt, Expr::value(token.to_string()))
            .filter(settings::Column::Id.eq(SETTINGS_ID))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
