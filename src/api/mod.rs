// ==========================================
// 智能传送带分拣系统 - API 层
// ==========================================
// 职责: 调用边界（函数名分发、JSON 入参/出参、错误信封）
// ==========================================

pub mod bootstrap;
pub mod conveyor_api;
pub mod dto;
pub mod error;
pub mod operation;

// 重导出核心类型
pub use bootstrap::{default_bays, SeedReport};
pub use conveyor_api::ConveyorApi;
pub use dto::{ReassignedItem, SweepSummary};
pub use error::{to_error_response, ApiError, ApiResult, ErrorResponse};
pub use operation::ConveyorOperation;
