/// 应用全局状态

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::repositories::{
    DbSettingsRepository, DbTemplateCatalogRepository, DbVmRepository, SettingsRepository,
    TemplateCatalogRepository, VmRepository,
};
use crate::vcd::VcdConnector;

/// 应用状态
///
/// 只持有配置和依赖句柄，请求之间不共享任何可变状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub settings_repo: Arc<dyn SettingsRepository>,
    pub template_repo: Arc<dyn TemplateCatalogRepository>,
    pub vm_repo: Arc<dyn VmRepository>,
    /// 每个请求从这里拿一个新的 vCD 句柄
    pub connector: Arc<dyn VcdConnector>,
}

impl AppState {
    pub fn new(config: Config, db: DatabaseConnection, connector: Arc<dyn VcdConnector>) -> Self {
        Self {
            config: Arc::new(config),
            settings_repo: Arc::new(DbSettingsRepository::new(db.clone())),
            template_repo: Arc::new(DbTemplateCatalogRepository::new(db.clone())),
            vm_repo: Arc::new(DbVmRepository::new(db)),
            connector,
        }
    }
}
