// ==========================================
// 智能传送带分拣系统 - 出口工位仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 存储: 组合键 (BAY, id)，整条记录替换
// ==========================================

use crate::domain::bay::Bay;
use crate::domain::types::RecordKind;
use crate::repository::error::RepositoryResult;
use crate::repository::state_store::{composite_key, composite_prefix};
use crate::repository::tx_context::TxContext;

// ==========================================
// BayRepository - 工位仓储
// ==========================================

/// 工位仓储
/// 职责: 工位记录的读取、全量扫描、整条写入
#[derive(Debug, Clone, Default)]
pub struct BayRepository;

impl BayRepository {
    pub fn new() -> Self {
        Self
    }

    /// 按 id 查询工位
    ///
    /// # 返回
    /// - Ok(Some(Bay)): 找到工位
    /// - Ok(None): 未找到
    /// - Err: 存储错误
    pub async fn find_by_id(&self, tx: &mut TxContext<'_>, bay_id: &str) -> RepositoryResult<Option<Bay>> {
        let key = composite_key(RecordKind::Bay, bay_id)?;
        tx.get_record(&key).await
    }

    /// 扫描全部工位（按键序）
    pub async fn list_all(&self, tx: &mut TxContext<'_>) -> RepositoryResult<Vec<Bay>> {
        tx.scan_records(&composite_prefix(RecordKind::Bay)).await
    }

    /// 写入整条工位记录
    pub fn save(&self, tx: &mut TxContext<'_>, bay: &Bay) -> RepositoryResult<()> {
        let key = composite_key(RecordKind::Bay, &bay.id)?;
        tx.put_record(key, bay)
    }
}
