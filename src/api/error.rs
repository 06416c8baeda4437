// ==========================================
// 智能传送带分拣系统 - API层错误类型
// ==========================================
// 职责: 定义调用边界错误类型，并转换为 JSON 错误信封
// 分类: InvalidInput / NoBayAvailable / StorageFailure
// 说明: 所有错误都不在内部重试；StorageFailure 携带 retryable 供调用方决定
// ==========================================

use crate::engine::error::ConveyorError;
use crate::repository::error::RepositoryError;
use serde::Serialize;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("无可用工位: {0}")]
    NoBayAvailable(String),

    // ==========================================
    // 存储错误
    // ==========================================
    #[error("存储失败: {message}")]
    StorageFailure { message: String, retryable: bool },

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::StorageFailure { retryable: true, .. })
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 调用方传入的 id 无法构成存储键
            RepositoryError::InvalidKey { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            other => ApiError::StorageFailure {
                retryable: other.is_retryable(),
                message: other.to_string(),
            },
        }
    }
}

// ==========================================
// 从 ConveyorError 转换
// ==========================================
impl From<ConveyorError> for ApiError {
    fn from(err: ConveyorError) -> Self {
        match err {
            ConveyorError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            ConveyorError::NotFound { entity, id } => {
                ApiError::InvalidInput(format!("{}(id={})不存在", entity, id))
            }
            e @ ConveyorError::InvalidStateTransition { .. } => ApiError::InvalidInput(e.to_string()),
            ConveyorError::NoBayAvailable { item_id, type_id } => {
                ApiError::NoBayAvailable(format!("item_id={}, type_id={}", item_id, type_id))
            }
            ConveyorError::Storage(e) => e.into(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidInput(format!("JSON 解析失败: {}", err))
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 错误信封
// ==========================================

/// 调用失败时返回给调用方的错误结构
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,

    /// 详细信息（可选）
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":"{}","message":"序列化错误信息失败"}}"#, self.code)
        })
    }
}

/// 将 ApiError 转换为错误信封
pub fn to_error_response(err: &ApiError) -> ErrorResponse {
    ErrorResponse {
        code: match err {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NoBayAvailable(_) => "NO_BAY_AVAILABLE",
            ApiError::StorageFailure { .. } => "STORAGE_FAILURE",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
        .to_string(),
        message: err.to_string(),
        details: match err {
            ApiError::StorageFailure { retryable, .. } => {
                Some(serde_json::json!({ "retryable": retryable }))
            }
            _ => None,
        },
    }
}
