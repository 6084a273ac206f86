/// 虚拟机 Web 控制台页面

use axum::{extract::RawQuery, response::Html};
use common::utils::extract_console_query_params;
use common::Error;
use once_cell::sync::Lazy;
use tera::{Context, Tera};
use tracing::error;

use super::ApiError;

const CONSOLE_TEMPLATE: &str = "vm-console.html";

static CONSOLE_TERA: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_template(CONSOLE_TEMPLATE, include_str!("../../templates/vm-console.html"))
        .expect("控制台模板必须合法");
    tera
});

/// 渲染控制台页面，参数原样交给页面中的 WebMKS 客户端
pub async fn vm_console(RawQuery(query): RawQuery) -> Result<Html<String>, ApiError> {
    let params = extract_console_query_params(query.as_deref().unwrap_or_default())?;

    let mut context = Context::new();
    context.insert("hostname", &params.host);
    context.insert("port", &params.port);
    context.insert("ticket", &params.ticket);

    let page = CONSOLE_TERA.render(CONSOLE_TEMPLATE, &context).map_err(|e| {
        error!("控制台页面渲染失败: {}", e);
        Error::Internal(e.to_string())
    })?;
    Ok(Html(page))
}
