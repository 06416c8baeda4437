// ==========================================
// 智能传送带分拣系统 - 工位注册表
// ==========================================
// 职责: 工位读写 + 目标工位选择
// 规则:
// 1) 启用且未满 (load < capacity) 的工位才是候选
// 2) 偏好该类型的候选 (compatible) 永远优先于其他候选 (fallback)
// 3) 同一组内按 load 升序，load 相同保持扫描顺序（稳定排序）
// 4) 两组都为空 → NoBayAvailable
// ==========================================
// 红线: 选择是单次扫描快照上的纯函数，不保留跨调用的工位列表
// ==========================================

use crate::domain::bay::{Bay, CapacityConstraint};
use crate::domain::item_type::ItemType;
use crate::engine::error::{ConveyorError, ConveyorResult};
use crate::repository::bay_repo::BayRepository;
use crate::repository::tx_context::TxContext;
use chrono::{DateTime, Utc};

// ==========================================
// BayCandidates - 候选工位划分结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BayCandidates {
    /// 偏好该类型的候选
    pub compatible: Vec<Bay>,
    /// 不偏好该类型但仍有空位的候选
    pub fallback: Vec<Bay>,
}

impl BayCandidates {
    pub fn is_empty(&self) -> bool {
        self.compatible.is_empty() && self.fallback.is_empty()
    }
}

/// 按类型划分候选工位（停用或已满的工位两组都不进）
pub fn partition_candidates(bays: Vec<Bay>, type_id: &str) -> BayCandidates {
    let mut candidates = BayCandidates::default();
    for bay in bays {
        if !bay.enabled || !bay.has_spare_capacity() {
            continue;
        }
        if bay.prefers(type_id) {
            candidates.compatible.push(bay);
        } else {
            candidates.fallback.push(bay);
        }
    }
    candidates
}

/// 从候选中挑选目标工位
///
/// # 返回
/// - Some(Bay): compatible 非空时取其中 load 最小者，否则取 fallback 中 load 最小者
/// - None: 无候选
pub fn pick_least_loaded(candidates: BayCandidates) -> Option<Bay> {
    let pool = if candidates.compatible.is_empty() {
        candidates.fallback
    } else {
        candidates.compatible
    };

    // min_by_key 在相等时返回第一个元素，等价于稳定排序后取首位
    pool.into_iter().min_by_key(|bay| bay.load)
}

// ==========================================
// BayRegistry - 工位注册表
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct BayRegistry {
    bay_repo: BayRepository,
}

impl BayRegistry {
    pub fn new() -> Self {
        Self {
            bay_repo: BayRepository::new(),
        }
    }

    /// 全量扫描，不过滤
    pub async fn list_all(&self, tx: &mut TxContext<'_>) -> ConveyorResult<Vec<Bay>> {
        Ok(self.bay_repo.list_all(tx).await?)
    }

    pub async fn find(&self, tx: &mut TxContext<'_>, bay_id: &str) -> ConveyorResult<Option<Bay>> {
        Ok(self.bay_repo.find_by_id(tx, bay_id).await?)
    }

    /// 查询工位，不存在时报 NotFound
    pub async fn get(&self, tx: &mut TxContext<'_>, bay_id: &str) -> ConveyorResult<Bay> {
        self.find(tx, bay_id)
            .await?
            .ok_or_else(|| ConveyorError::not_found("Bay", bay_id))
    }

    /// 列出该类型的候选工位
    pub async fn list_enabled_candidates(
        &self,
        tx: &mut TxContext<'_>,
        item_type: &ItemType,
    ) -> ConveyorResult<BayCandidates> {
        let bays = self.list_all(tx).await?;
        Ok(partition_candidates(bays, &item_type.id))
    }

    /// 为该类型选择目标工位
    ///
    /// # 返回
    /// - Ok(Some(Bay)): 选中的工位（尚未修改负载）
    /// - Ok(None): 无可用工位，由调用方转换为 NoBayAvailable
    pub async fn select_bay(
        &self,
        tx: &mut TxContext<'_>,
        item_type: &ItemType,
    ) -> ConveyorResult<Option<Bay>> {
        let candidates = self.list_enabled_candidates(tx, item_type).await?;
        tracing::debug!(
            tx_id = %tx.tx_id(),
            type_id = %item_type.id,
            compatible = candidates.compatible.len(),
            fallback = candidates.fallback.len(),
            "候选工位划分完成"
        );
        Ok(pick_least_loaded(candidates))
    }

    /// 写入整条工位记录（内部使用，不做输入校验）
    pub fn save(&self, tx: &mut TxContext<'_>, bay: &Bay) -> ConveyorResult<()> {
        Ok(self.bay_repo.save(tx, bay)?)
    }

    /// 编辑工位（整条替换）
    ///
    /// 调用方提交的记录即工位自身的上报，因此刷新 last_activity。
    ///
    /// # 错误
    /// - InvalidInput: 未提供工位，或记录不合法
    pub fn edit(
        &self,
        tx: &mut TxContext<'_>,
        bay: Option<Bay>,
        now: DateTime<Utc>,
    ) -> ConveyorResult<Bay> {
        let mut bay = bay.ok_or_else(|| ConveyorError::InvalidInput("未提供工位记录".to_string()))?;
        bay.validate().map_err(ConveyorError::InvalidInput)?;

        bay.touch(now);
        self.save(tx, &bay)?;
        tracing::info!(tx_id = %tx.tx_id(), bay_id = %bay.id, enabled = bay.enabled, "工位记录已替换");
        Ok(bay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item_type::catalog;

    fn bay(id: &str, capacity: i64, load: i64, prefs: Vec<ItemType>) -> Bay {
        let mut bay = Bay::new(id, capacity, 1, Utc::now());
        bay.load = load;
        for pref in prefs {
            bay.add_preference(pref);
        }
        bay
    }

    #[test]
    fn test_compatible_outranks_less_loaded_fallback() {
        let bays = vec![
            bay("A", 10, 0, vec![]),
            bay("B", 10, 7, vec![catalog::oven()]),
        ];
        let selected = pick_least_loaded(partition_candidates(bays, "1")).unwrap();
        assert_eq!(selected.id, "B");
    }

    #[test]
    fn test_least_load_wins_and_ties_keep_scan_order() {
        let bays = vec![
            bay("A", 10, 5, vec![catalog::oven()]),
            bay("B", 10, 2, vec![catalog::oven()]),
            bay("C", 10, 2, vec![catalog::oven()]),
        ];
        let selected = pick_least_loaded(partition_candidates(bays, "1")).unwrap();
        assert_eq!(selected.id, "B");
    }

    #[test]
    fn test_full_and_disabled_bays_are_excluded() {
        let mut disabled = bay("C", 10, 0, vec![catalog::oven()]);
        disabled.enabled = false;
        let bays = vec![bay("A", 3, 3, vec![catalog::oven()]), disabled];

        let candidates = partition_candidates(bays, "1");
        assert!(candidates.is_empty());
        assert!(pick_least_loaded(candidates).is_none());
    }

    #[test]
    fn test_falls_back_when_preferred_bay_full() {
        let bays = vec![
            bay("1", 10, 10, vec![catalog::oven(), catalog::fridge()]),
            bay("2", 20, 4, vec![catalog::washing_machine()]),
        ];
        let candidates = partition_candidates(bays, "1");
        assert!(candidates.compatible.is_empty());
        assert_eq!(candidates.fallback.len(), 1);
        assert_eq!(pick_least_loaded(candidates).unwrap().id, "2");
    }
}
