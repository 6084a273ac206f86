/// VCD Gateway - Server
///
/// vCloud Director 任务网关：HTTP 任务入口、控制台页面和周期性用量统计

mod api;
mod app_state;
mod config;
mod db;
mod repositories;
mod services;
mod vcd;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use common::constants::INTERNAL_SERVER_ERROR_MESSAGE;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::{
    app_state::AppState,
    db::{establish_connection, run_migrations},
    services::{start_statistics_collector, StatisticsService},
    vcd::HttpConnector,
};

/// 只执行一次统计任务后退出
const COLLECT_STATISTICS_COMMAND: &str = "collect-statistics";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    // 加载配置
    let cfg = config::Config::load()?;

    // 初始化日志
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level)),
        )
        .init();

    info!("🚀 启动 VCD Gateway Server...");
    info!(vcd = ?cfg.vcd, "✅ 配置加载成功");

    // 建立数据库连接 (SeaORM)
    let db = establish_connection(&cfg.database.url).await?;
    run_migrations(&db).await?;

    let connector = Arc::new(HttpConnector::new(&cfg.vcd)?);
    let app_state = AppState::new(cfg.clone(), db, connector);

    if std::env::args().nth(1).as_deref() == Some(COLLECT_STATISTICS_COMMAND) {
        let count = StatisticsService::new(app_state).run_statistics_collection().await?;
        info!("✅ 统计任务完成，写入 {} 条记录", count);
        return Ok(());
    }

    if cfg.statistics.enabled {
        start_statistics_collector(app_state.clone(), cfg.statistics.interval_secs);
        info!("✅ 统计任务已启动（每 {} 秒一次）", cfg.statistics.interval_secs);
    }

    // 设置CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 构建应用路由
    let app = api::routes(cfg.api_prefix().as_deref())
        .route("/health", get(health_handler))
        .nest_service("/static", ServeDir::new(&cfg.server.static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(app_state);

    // 启动服务器
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.server.port));
    info!("🎯 服务器监听在 http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler() -> &'static str {
    "OK"
}

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("❌ 请求处理崩溃: {}", detail);

    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_SERVER_ERROR_MESSAGE).into_response()
}
