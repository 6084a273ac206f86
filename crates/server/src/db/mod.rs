/// 数据库访问层

pub mod models;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend};
use sqlx::migrate::Migrator;
use tracing::info;

/// `migrations/` 下的 SQL 迁移，编译时嵌入
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// 建立数据库连接 (SeaORM)
pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, anyhow::Error> {
    info!("正在连接数据库");

    let mut options = ConnectOptions::new(database_url.to_string());
    options.sqlx_logging(false);

    let db = Database::connect(options).await?;
    info!("数据库连接成功");

    Ok(db)
}

/// 执行尚未应用的迁移，已执行过的由 `_sqlx_migrations` 表跳过
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), anyhow::Error> {
    let backend = db.get_database_backend();
    if backend != DbBackend::Postgres {
        anyhow::bail!("数据库迁移只支持 PostgreSQL，当前为 {:?}", backend);
    }

    MIGRATOR.run(db.get_postgres_connection_pool()).await?;
    info!("✅ 数据库迁移完成");

    Ok(())
}
