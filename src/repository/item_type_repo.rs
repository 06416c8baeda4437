// ==========================================
// 智能传送带分拣系统 - 物品类型仓储
// ==========================================
// 存储: 直接以原始 id 为键（只做精确查找，不需要前缀扫描）
// ==========================================

use crate::domain::item_type::ItemType;
use crate::repository::error::RepositoryResult;
use crate::repository::state_store::raw_key;
use crate::repository::tx_context::TxContext;

/// 物品类型仓储
#[derive(Debug, Clone, Default)]
pub struct ItemTypeRepository;

impl ItemTypeRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id(
        &self,
        tx: &mut TxContext<'_>,
        type_id: &str,
    ) -> RepositoryResult<Option<ItemType>> {
        let key = raw_key(type_id)?;
        tx.get_record(&key).await
    }

    pub fn save(&self, tx: &mut TxContext<'_>, item_type: &ItemType) -> RepositoryResult<()> {
        let key = raw_key(&item_type.id)?;
        tx.put_record(key, item_type)
    }
}
