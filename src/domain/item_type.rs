// ==========================================
// 智能传送带分拣系统 - 物品类型目录
// ==========================================
// 职责: 物品类别参考数据（烤箱、冰箱……）
// 红线: 启动时写入一次，之后不可修改
// ==========================================

use serde::{Deserialize, Serialize};

/// 物品类型
///
/// 以原始 id 作为存储键（不使用组合键），只按 id 精确查找
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemType {
    pub id: String,
    pub description: String,
}

impl ItemType {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

// ==========================================
// 默认目录
// ==========================================

pub mod catalog {
    use super::ItemType;

    pub const OVEN: (&str, &str) = ("1", "Oven");
    pub const FRIDGE: (&str, &str) = ("2", "Fridge");
    pub const WASHING_MACHINE: (&str, &str) = ("3", "WashingMachine");
    pub const DISHWASHER: (&str, &str) = ("4", "Dishwasher");
    pub const DRYER: (&str, &str) = ("5", "Dryer");

    pub fn oven() -> ItemType {
        ItemType::new(OVEN.0, OVEN.1)
    }

    pub fn fridge() -> ItemType {
        ItemType::new(FRIDGE.0, FRIDGE.1)
    }

    pub fn washing_machine() -> ItemType {
        ItemType::new(WASHING_MACHINE.0, WASHING_MACHINE.1)
    }

    pub fn dishwasher() -> ItemType {
        ItemType::new(DISHWASHER.0, DISHWASHER.1)
    }

    pub fn dryer() -> ItemType {
        ItemType::new(DRYER.0, DRYER.1)
    }

    /// 启动时写入的全部物品类型
    pub fn default_item_types() -> Vec<ItemType> {
        vec![oven(), fridge(), washing_machine(), dishwasher(), dryer()]
    }
}
