/// HTTP 接口
///
/// 任务入口同时挂在 `/` 和带版本的前缀下，控制台页面挂在 `/console`。

pub mod console;
pub mod jobs;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{error, warn};

use crate::app_state::AppState;

/// API 错误响应
///
/// 状态码和消息都取自业务错误，内部错误只返回固定文本
#[derive(Debug)]
pub struct ApiError(common::Error);

impl From<common::Error> for ApiError {
    fn from(err: common::Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.0.is_internal() {
            error!("❌ 内部错误: {}", self.0);
        } else {
            warn!(status = status.as_u16(), "请求失败: {}", self.0);
        }

        (status, self.0.client_message()).into_response()
    }
}

/// 所有路由（统一入口）
pub fn routes(api_prefix: Option<&str>) -> Router<AppState> {
    let router = Router::new()
        .route("/", get(jobs::handle_job))
        .route("/console", get(console::vm_console));

    match api_prefix {
        Some(prefix) => router
            .route(prefix, get(jobs::handle_job))
            .route(&format!("{}/", prefix), get(jobs::handle_job)),
        None => router,
    }
}
