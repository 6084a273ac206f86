/// vCloud Director 远端错误

use thiserror::Error;

/// 远端调用失败的分类（按 HTTP 状态码和缺失的操作链接划分）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VcdError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    AccessForbidden(String),

    #[error("{0}")]
    EntityNotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InternalServer(String),

    /// 资源当前没有提供所需的操作链接（例如已开机的虚拟机没有 powerOn）
    #[error("{0}")]
    OperationNotSupported(String),

    #[error("vCD API 错误 {status}: {message}")]
    Api { status: u16, message: String },

    #[error("vCD 连接失败: {0}")]
    Transport(String),

    #[error("vCD 响应解析失败: {0}")]
    Parse(String),
}

impl VcdError {
    /// 根据 HTTP 状态码分类
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 => VcdError::BadRequest(message),
            401 => VcdError::Unauthorized(message),
            403 => VcdError::AccessForbidden(message),
            404 => VcdError::EntityNotFound(message),
            409 => VcdError::Conflict(message),
            500 => VcdError::InternalServer(message),
            _ => VcdError::Api { status, message },
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        VcdError::Parse(message.into())
    }

    pub fn link_not_found(rel: &str) -> Self {
        VcdError::OperationNotSupported(format!("Link {} not found", rel))
    }
}

impl From<reqwest::Error> for VcdError {
    fn from(err: reqwest::Error) -> Self {
        VcdError::Transport(err.to_string())
    }
}

impl From<roxmltree::Error> for VcdError {
    fn from(err: roxmltree::Error) -> Self {
        VcdError::Parse(err.to_string())
    }
}

/// 未单独映射的远端错误一律视为内部错误
impl From<VcdError> for common::Error {
    fn from(err: VcdError) -> Self {
        common::Error::Internal(err.to_string())
    }
}

pub type VcdResult<T> = Result<T, VcdError>;
