// ==========================================
// 智能传送带分拣系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: NoBayAvailable 是分配请求唯一预期的业务拒绝
// ==========================================

use crate::domain::types::ItemState;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum ConveyorError {
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("无可用工位: item_id={item_id}, type_id={type_id}")]
    NoBayAvailable { item_id: String, type_id: String },

    #[error("无效的状态转换: item_id={item_id}, from={from} to={to}")]
    InvalidStateTransition {
        item_id: String,
        from: ItemState,
        to: ItemState,
    },

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

impl ConveyorError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        ConveyorError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// 是否可重试（仅存储层并发冲突）
    pub fn is_retryable(&self) -> bool {
        match self {
            ConveyorError::Storage(err) => err.is_retryable(),
            _ => false,
        }
    }
}

pub type ConveyorResult<T> = Result<T, ConveyorError>;
