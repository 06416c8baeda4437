// ==========================================
// 智能传送带分拣系统 - 工位巡检（无活动剔除）
// ==========================================
// 流程:
// 1) 扫描全部工位，last_activity 早于 now - timeout 的启用工位 → enabled=false
// 2) 对所有停用工位上仍为 ON_BELT 的物品逐个重新分配
// ==========================================
// 红线: 单个物品重分配失败不影响剔除，也不阻断其余物品
// 红线: IN_BAY / RELEASED 物品已脱离路由控制，不做处理
// ==========================================

use crate::domain::bay::Bay;
use crate::domain::types::ItemState;
use crate::engine::bay_registry::BayRegistry;
use crate::engine::error::ConveyorResult;
use crate::engine::item_lifecycle::{Assignment, ItemLifecycle};
use crate::repository::tx_context::TxContext;
use chrono::{DateTime, Duration, Utc};
use tracing::instrument;

/// 未能重新分配的物品（下次巡检会再次尝试）
#[derive(Debug, Clone, PartialEq)]
pub struct UnassignedItem {
    pub item_id: String,
    pub bay_id: String,
    pub reason: String,
}

/// 单次巡检结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    /// 本次被停用的工位（已写入 enabled=false）
    pub evicted_bays: Vec<Bay>,
    /// 成功重新分配的物品
    pub reassigned: Vec<Assignment>,
    /// 重新分配失败的物品
    pub unassigned: Vec<UnassignedItem>,
}

impl SweepReport {
    pub fn is_noop(&self) -> bool {
        self.evicted_bays.is_empty() && self.reassigned.is_empty()
    }
}

// ==========================================
// InactivityMonitor - 巡检器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct InactivityMonitor {
    registry: BayRegistry,
    lifecycle: ItemLifecycle,
}

impl InactivityMonitor {
    pub fn new(registry: BayRegistry, lifecycle: ItemLifecycle) -> Self {
        Self {
            registry,
            lifecycle,
        }
    }

    /// 执行一次巡检
    ///
    /// # 参数
    /// - `now`: 当前时间
    /// - `timeout`: 无活动超时
    ///
    /// # 返回
    /// 巡检结果；仅存储读取失败会整体返回错误
    #[instrument(skip(self, tx), fields(tx_id = %tx.tx_id(), timeout_secs = timeout.num_seconds()))]
    pub async fn sweep(
        &self,
        tx: &mut TxContext<'_>,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> ConveyorResult<SweepReport> {
        let mut report = SweepReport::default();

        // ===== 阶段1: 停用超时工位 =====
        let mut bays = self.registry.list_all(tx).await?;
        for bay in bays.iter_mut() {
            if bay.enabled && bay.is_inactive(now, timeout) {
                bay.enabled = false;
                self.registry.save(tx, bay)?;
                tracing::info!(
                    bay_id = %bay.id,
                    last_activity = %bay.last_activity,
                    "工位超时无活动，已停用"
                );
                report.evicted_bays.push(bay.clone());
            }
        }

        // ===== 阶段2: 重新分配停用工位上的在途物品 =====
        for bay in bays.iter().filter(|b| !b.enabled) {
            let orphans = self
                .lifecycle
                .query_by_bay(tx, &bay.id, ItemState::OnBelt)
                .await?;

            for item in orphans {
                let item_id = item.id.clone();
                match self.lifecycle.assign(tx, item).await {
                    Ok(assignment) => {
                        tracing::info!(
                            item_id = %item_id,
                            from_bay = %bay.id,
                            to_bay = %assignment.bay.id,
                            "在途物品已重新分配"
                        );
                        report.reassigned.push(assignment);
                    }
                    Err(e) => {
                        tracing::warn!(item_id = %item_id, bay_id = %bay.id, error = %e, "在途物品重新分配失败");
                        report.unassigned.push(UnassignedItem {
                            item_id,
                            bay_id: bay.id.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        tracing::debug!(
            evicted = report.evicted_bays.len(),
            reassigned = report.reassigned.len(),
            unassigned = report.unassigned.len(),
            "巡检完成"
        );
        Ok(report)
    }
}
