// ==========================================
// 智能传送带分拣系统 - 应用层
// ==========================================
// 职责: 组装存储、配置、事件通道与 API，供命令行入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
