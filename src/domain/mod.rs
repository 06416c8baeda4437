// ==========================================
// 智能传送带分拣系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod bay;
pub mod item;
pub mod item_type;
pub mod types;

// 重导出核心类型
pub use bay::{Bay, CapacityConstraint};
pub use item::{ConveyorItem, ItemBrief};
pub use item_type::{catalog, ItemType};
pub use types::{ItemState, RecordKind};
