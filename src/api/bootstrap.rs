// ==========================================
// 智能传送带分拣系统 - 初始数据
// ==========================================
// 默认目录: 1 Oven / 2 Fridge / 3 WashingMachine / 4 Dishwasher / 5 Dryer
// 默认工位: 1 {容量 10, 优先级 1, 偏好 Oven+Fridge}
//           2 {容量 20, 优先级 2, 偏好 WashingMachine+Dishwasher+Dryer}
// ==========================================
// 红线: 只写入不存在的记录，重复 init 不会重置在用工位的负载
// ==========================================

use crate::domain::bay::Bay;
use crate::domain::item_type::catalog;
use crate::engine::bay_registry::BayRegistry;
use crate::engine::error::ConveyorResult;
use crate::repository::item_type_repo::ItemTypeRepository;
use crate::repository::tx_context::TxContext;
use chrono::{DateTime, Utc};

/// 初始化结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub types_seeded: usize,
    pub bays_seeded: usize,
}

/// 默认工位
pub fn default_bays(now: DateTime<Utc>) -> Vec<Bay> {
    let mut bay_one = Bay::new("1", 10, 1, now);
    bay_one.add_preference(catalog::oven());
    bay_one.add_preference(catalog::fridge());

    let mut bay_two = Bay::new("2", 20, 2, now);
    bay_two.add_preference(catalog::washing_machine());
    bay_two.add_preference(catalog::dishwasher());
    bay_two.add_preference(catalog::dryer());

    vec![bay_one, bay_two]
}

/// 写入缺失的默认类型和工位
pub async fn seed_defaults(
    tx: &mut TxContext<'_>,
    registry: &BayRegistry,
    now: DateTime<Utc>,
) -> ConveyorResult<SeedReport> {
    let type_repo = ItemTypeRepository::new();
    let mut report = SeedReport::default();

    for item_type in catalog::default_item_types() {
        if type_repo.find_by_id(tx, &item_type.id).await?.is_none() {
            type_repo.save(tx, &item_type)?;
            report.types_seeded += 1;
        }
    }

    for bay in default_bays(now) {
        if registry.find(tx, &bay.id).await?.is_none() {
            registry.save(tx, &bay)?;
            report.bays_seeded += 1;
        }
    }

    tracing::info!(
        tx_id = %tx.tx_id(),
        types_seeded = report.types_seeded,
        bays_seeded = report.bays_seeded,
        "默认数据初始化完成"
    );
    Ok(report)
}
