// ==========================================
// 智能传送带分拣系统 - 引擎层
// ==========================================
// 职责: 工位选择、物品状态机、无活动巡检、事件快照
// 红线: Engine 不拼 SQL，所有读写经由调用级 TxContext
// ==========================================

pub mod bay_registry;
pub mod error;
pub mod events;
pub mod inactivity_monitor;
pub mod item_lifecycle;
pub mod time_provider;

// 重导出核心引擎
pub use bay_registry::{partition_candidates, pick_least_loaded, BayCandidates, BayRegistry};
pub use error::{ConveyorError, ConveyorResult};
pub use events::{
    BaySnapshot, ConveyorEvent, ConveyorEventPublisher, ConveyorEventType, NoOpEventPublisher,
    OptionalEventPublisher, TracingEventPublisher,
};
pub use inactivity_monitor::{InactivityMonitor, SweepReport, UnassignedItem};
pub use item_lifecycle::{Assignment, ItemLifecycle};
pub use time_provider::{ManualTimeProvider, SystemTimeProvider, TimeProvider};
