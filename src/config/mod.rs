// ==========================================
// 智能传送带分拣系统 - 配置层
// ==========================================
// 职责: 系统配置管理（巡检超时、开关）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod conveyor_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use conveyor_config_trait::{ConfigResult, ConveyorConfigReader, DEFAULT_INACTIVITY_TIMEOUT_SECS};
