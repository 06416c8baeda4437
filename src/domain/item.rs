// ==========================================
// 智能传送带分拣系统 - 物品领域模型
// ==========================================
// 红线: 物品状态与所属工位负载必须一起变更
// ==========================================

use crate::domain::item_type::ItemType;
use crate::domain::types::ItemState;
use serde::{Deserialize, Serialize};

// ==========================================
// ConveyorItem - 传送带物品
// ==========================================
// 说明: assigned_bay 保存工位 id（引用），不内嵌工位副本，
//       避免工位记录更新后物品上残留过期快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConveyorItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub assigned_bay: String,
    pub state: ItemState,
}

impl ConveyorItem {
    /// 新物品（分配完成后处于 ON_BELT）
    pub fn on_belt(id: impl Into<String>, item_type: ItemType, bay_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            item_type,
            assigned_bay: bay_id.into(),
            state: ItemState::OnBelt,
        }
    }

    pub fn is_routed_to(&self, bay_id: &str, state: ItemState) -> bool {
        self.assigned_bay == bay_id && self.state == state
    }
}

// ==========================================
// ItemBrief - 快照中的物品摘要
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemBrief {
    pub id: String,
    pub type_id: String,
}

impl From<&ConveyorItem> for ItemBrief {
    fn from(item: &ConveyorItem) -> Self {
        Self {
            id: item.id.clone(),
            type_id: item.item_type.id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item_type::catalog;

    #[test]
    fn test_item_json_uses_type_field() {
        let item = ConveyorItem::on_belt("7784199", catalog::oven(), "1");
        let value = serde_json::to_value(&item).unwrap();

        assert_eq!(value["type"]["id"], "1");
        assert_eq!(value["type"]["description"], "Oven");
        assert_eq!(value["assigned_bay"], "1");
        assert_eq!(value["state"], "ON_BELT");
    }

    #[test]
    fn test_is_routed_to() {
        let item = ConveyorItem::on_belt("A", catalog::fridge(), "2");
        assert!(item.is_routed_to("2", ItemState::OnBelt));
        assert!(!item.is_routed_to("1", ItemState::OnBelt));
        assert!(!item.is_routed_to("2", ItemState::InBay));
    }
}
