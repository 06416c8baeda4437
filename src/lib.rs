// ==========================================
// 智能传送带分拣系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite (键值世界状态)
// 系统定位: 物品 → 出口工位的偏好感知负载均衡分配 + 工位无活动剔除
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 世界状态访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 调用边界
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ItemState, RecordKind};

// 领域实体
pub use domain::{Bay, ConveyorItem, ItemType};

// 引擎
pub use engine::{BayRegistry, InactivityMonitor, ItemLifecycle};

// API
pub use api::{ConveyorApi, ConveyorOperation};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "智能传送带分拣系统";
