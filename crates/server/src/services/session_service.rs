/// vCD 会话建立
///
/// 优先复用保存的 JWT；无法复用时用用户名密码重新登录并保存新令牌。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::constants::{INVALID_FORMAT_VCD_JWT_MESSAGE, VCD_JWT_EXPIRED_MESSAGE};
use common::{Error, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::app_state::AppState;
use crate::vcd::{VcdApi, VcdError};

/// 令牌到期前的安全余量
const TOKEN_EXPIRY_MARGIN_MINUTES: i64 = 5;

/// 一次请求内已认证的 vCD 句柄，请求结束即丢弃
pub struct Session {
    api: Arc<dyn VcdApi>,
}

impl Session {
    pub fn api(&self) -> Arc<dyn VcdApi> {
        self.api.clone()
    }
}

/// vCD JWT 中用到的声明
#[derive(Debug, Deserialize)]
struct VcdClaims {
    exp: i64,
    /// 会话 ID，可用于恢复会话
    jti: String,
}

/// 只解析声明，不校验签名
///
/// 签名由 vCD 校验，网关只需要知道过期时间和会话 ID。
fn decode_claims(token: &str) -> std::result::Result<VcdClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<VcdClaims>(token, &DecodingKey::from_secret(&[]), &validation).map(|data| data.claims)
}

/// 距离过期还有超过安全余量
fn is_fresh(exp: i64, now: DateTime<Utc>) -> bool {
    (now + Duration::minutes(TOKEN_EXPIRY_MARGIN_MINUTES)).timestamp() < exp
}

/// vCD 拒绝凭据时返回 401，其它失败视为内部错误
fn auth_error(err: VcdError) -> Error {
    match err {
        VcdError::Unauthorized(msg) | VcdError::AccessForbidden(msg) => {
            error!("vCD 认证失败: {}", msg);
            Error::Authentication(msg)
        }
        other => other.into(),
    }
}

pub struct SessionService {
    state: AppState,
}

impl SessionService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// 建立会话，恢复和重新登录二者只执行其一，不重试
    pub async fn setup(&self) -> Result<Session> {
        let api = self.state.connector.connect()?;
        let stored = self.state.settings_repo.get_or_create().await?;

        let Some(token) = stored.api_token else {
            debug!("没有保存的 vCD 令牌，使用用户名密码登录");
            self.login_and_persist(api.as_ref()).await?;
            return Ok(Session { api });
        };

        match decode_claims(&token) {
            Err(e) => {
                error!(error = %e, "{}", INVALID_FORMAT_VCD_JWT_MESSAGE);
                self.login_and_persist(api.as_ref()).await?;
            }
            Ok(claims) if is_fresh(claims.exp, Utc::now()) => {
                debug!("复用保存的 vCD 会话");
                api.rehydrate_from_token(&claims.jti).await.map_err(auth_error)?;
            }
            Ok(claims) => {
                warn!(exp = claims.exp, "{}", VCD_JWT_EXPIRED_MESSAGE);
                self.login_and_persist(api.as_ref()).await?;
            }
        }

        Ok(Session { api })
    }

    async fn login_and_persist(&self, api: &dyn VcdApi) -> Result<()> {
        let vcd = &self.state.config.vcd;
        let token = api
            .login_basic(&vcd.organization, &vcd.username, &vcd.password)
            .await
            .map_err(auth_error)?;
        self.state.settings_repo.update_api_token(&token).await?;
        info!("✅ vCD 登录成功，已保存新令牌");
        Ok(())
    }
}
