/// 任务接口

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use common::constants::JOB_TYPE_WAS_SENT;
use common::{Error, JobOutcome, JobQueryParams, JobRequest};
use tracing::{error, info};

use super::ApiError;
use crate::app_state::AppState;
use crate::services::JobService;

/// 执行一个 vCD 任务
///
/// 参数类型不合法（例如 CPU 不是数字）与缺少参数同样返回 422
pub async fn handle_job(
    State(state): State<AppState>,
    query: Result<Query<JobQueryParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = query.map_err(|e| {
        error!("查询参数解析失败: {}", e);
        Error::invalid_query_params()
    })?;
    info!(params = ?params, "收到任务请求");

    let request = JobRequest::try_from(params)?;
    let outcome = JobService::new(state).dispatch(request).await?;

    Ok(match outcome {
        JobOutcome::Done => JOB_TYPE_WAS_SENT.into_response(),
        JobOutcome::Text(text) => text.into_response(),
        JobOutcome::Usage(metrics) => Json(metrics).into_response(),
    })
}

#[cfg(test)]
mod tests {
    use crate::api::routes;
    use crate::testing::{entity, vm_resource, MockVcd, TestContext};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use tower::ServiceExt;

    fn app(ctx: &TestContext) -> Router {
        routes(Some("/api/v1")).with_state(ctx.state.clone())
    }

    fn context() -> TestContext {
        TestContext::new(MockVcd {
            issued_token: "token".into(),
            inventory: vec![(entity("vdc"), vec![(entity("vapp"), vec![vm_resource("42", 4, &[])])])],
            ..Default::default()
        })
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_unknown_job_type() {
        let ctx = context();
        let (status, body) = get(app(&ctx), "/?JOB_TYPE=DELETE_VM&VM_ID=42").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Invalid job type");
        assert!(ctx.vcd.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_params() {
        let ctx = context();
        let (status, body) = get(app(&ctx), "/?JOB_TYPE=START_VM").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, "Invalid query params");

        let (status, _) = get(app(&ctx), "/?JOB_TYPE=SET_VM_CPU&VM_ID=42&CPU=many").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_done_on_both_mounts() {
        let ctx = context();
        let (status, body) = get(app(&ctx), "/?JOB_TYPE=START_VM&VM_ID=42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "DONE");

        let (status, body) = get(app(&ctx), "/api/v1/?JOB_TYPE=STOP_VM&VM_ID=42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "DONE");
        let (status, _) = get(app(&ctx), "/api/v1?JOB_TYPE=RESET_VM&VM_ID=42").await;
        assert_eq!(status, StatusCode::OK);
        assert!(ctx.vcd.called("power_off:42"));
    }

    #[tokio::test]
    async fn test_power_status_is_plain_text() {
        let ctx = context();
        let (status, body) = get(app(&ctx), "/?JOB_TYPE=GET_VM_STATUS&VM_ID=42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "POWERED_ON");
    }

    #[tokio::test]
    async fn test_usage_is_json() {
        let ctx = context();
        let (status, body) = get(app(&ctx), "/?JOB_TYPE=GET_VM_USAGE&VM_ID=42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn test_missing_vm_keeps_remote_status() {
        let ctx = context();
        let (status, _) = get(app(&ctx), "/?JOB_TYPE=CREATE_SNAP&VM_ID=missing").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
