// ==========================================
// 智能传送带分拣系统 - 物品仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 存储: 组合键 (ITEM, id)，整条记录替换
// ==========================================

use crate::domain::item::ConveyorItem;
use crate::domain::types::RecordKind;
use crate::repository::error::RepositoryResult;
use crate::repository::state_store::{composite_key, composite_prefix};
use crate::repository::tx_context::TxContext;

/// 物品仓储
#[derive(Debug, Clone, Default)]
pub struct ItemRepository;

impl ItemRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id(
        &self,
        tx: &mut TxContext<'_>,
        item_id: &str,
    ) -> RepositoryResult<Option<ConveyorItem>> {
        let key = composite_key(RecordKind::Item, item_id)?;
        tx.get_record(&key).await
    }

    /// 扫描全部物品（按键序）
    pub async fn list_all(&self, tx: &mut TxContext<'_>) -> RepositoryResult<Vec<ConveyorItem>> {
        tx.scan_records(&composite_prefix(RecordKind::Item)).await
    }

    pub fn save(&self, tx: &mut TxContext<'_>, item: &ConveyorItem) -> RepositoryResult<()> {
        let key = composite_key(RecordKind::Item, &item.id)?;
        tx.put_record(key, item)
    }
}
