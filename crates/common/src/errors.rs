use thiserror::Error;

use crate::constants::{
    INTERNAL_SERVER_ERROR_MESSAGE, INVALID_JOB_TYPE_MESSAGE, INVALID_QUERY_PARAMS_MESSAGE,
};

/// 统一错误类型
///
/// 每个业务错误都带有返回给调用方的消息和 HTTP 状态码
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{0}")]
    InvalidJobType(String),

    #[error("{message}")]
    InvalidQueryParams { message: String, status: u16 },

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    ResourceNotFound(String),

    /// 远端的 403/400/500 都归为此类，但保留原状态码
    #[error("{message}")]
    VmNotFound { message: String, status: u16 },

    #[error("{0}")]
    VmPowerState(String),

    #[error("{0}")]
    AnotherVmCreating(String),

    #[error("{0}")]
    VmCreating(String),

    #[error("{0}")]
    VcdBadRequest(String),

    #[error("{0}")]
    TemplateCatalogNotFound(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl Error {
    /// 未知的 JOB_TYPE
    pub fn invalid_job_type() -> Self {
        Error::InvalidJobType(INVALID_JOB_TYPE_MESSAGE.to_string())
    }

    /// 当前 JOB_TYPE 缺少必填参数
    pub fn invalid_query_params() -> Self {
        Error::InvalidQueryParams {
            message: INVALID_QUERY_PARAMS_MESSAGE.to_string(),
            status: 422,
        }
    }

    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidJobType(_) => 400,
            Error::InvalidQueryParams { status, .. } => *status,
            Error::Authentication(_) => 401,
            Error::ResourceNotFound(_) => 404,
            Error::VmNotFound { status, .. } => *status,
            Error::VmPowerState(_) => 409,
            Error::AnotherVmCreating(_) => 400,
            Error::VmCreating(_) => 400,
            Error::VcdBadRequest(_) => 400,
            Error::TemplateCatalogNotFound(_) => 404,
            Error::Database(_) | Error::Internal(_) => 500,
        }
    }

    /// 是否为未预期的内部错误
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Internal(_))
    }

    /// 返回给调用方的消息，内部错误不暴露细节
    pub fn client_message(&self) -> String {
        if self.is_internal() {
            INTERNAL_SERVER_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

/// 统一结果类型
pub type Result<T> = std::result::Result<T, Error>;
