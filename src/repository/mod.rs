// ==========================================
// 智能传送带分拣系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 组合键构造、世界状态读写、调用级读写集
// 约束: 所有写入均为整条记录替换
// ==========================================

pub mod bay_repo;
pub mod error;
pub mod item_repo;
pub mod item_type_repo;
pub mod state_store;
pub mod tx_context;

// 重导出核心仓储
pub use bay_repo::BayRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use item_repo::ItemRepository;
pub use item_type_repo::ItemTypeRepository;
pub use state_store::{
    composite_key, composite_prefix, raw_key, split_composite_key, SqliteStateStore, StateStore,
    StateWrite, VersionedValue,
};
pub use tx_context::TxContext;
