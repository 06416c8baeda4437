// ==========================================
// 智能传送带分拣系统 - 领域类型定义
// ==========================================
// 职责: 物品状态机枚举、存储记录种类
// 红线: 状态只能前进 (ON_BELT → IN_BAY → RELEASED)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 物品状态 (Item State)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与存储一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemState {
    OnBelt,   // 在传送带上，已预占出口工位
    InBay,    // 已被工位捕获
    Released, // 已放行（终态）
}

impl ItemState {
    /// 状态机前进规则
    ///
    /// # 说明
    /// - ON_BELT → IN_BAY
    /// - IN_BAY → RELEASED
    /// - 回到 ON_BELT 只能通过重新分配（assign），不走此规则
    pub fn can_transition_to(&self, next: ItemState) -> bool {
        matches!(
            (self, next),
            (ItemState::OnBelt, ItemState::InBay) | (ItemState::InBay, ItemState::Released)
        )
    }

    /// 该状态转换对工位负载的影响
    ///
    /// 计负载规则: ON_BELT +1（预占），IN_BAY -1（捕获后释放预占），RELEASED 不变
    pub fn load_delta(&self) -> i64 {
        match self {
            ItemState::OnBelt => 1,
            ItemState::InBay => -1,
            ItemState::Released => 0,
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemState::OnBelt => write!(f, "ON_BELT"),
            ItemState::InBay => write!(f, "IN_BAY"),
            ItemState::Released => write!(f, "RELEASED"),
        }
    }
}

impl FromStr for ItemState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ON_BELT" => Ok(ItemState::OnBelt),
            "IN_BAY" => Ok(ItemState::InBay),
            "RELEASED" => Ok(ItemState::Released),
            other => Err(format!("未知物品状态: {}", other)),
        }
    }
}

// ==========================================
// 存储记录种类 (Record Kind)
// ==========================================
// 用途: 组合键前缀，支持按种类前缀扫描
// 说明: 物品类型 (ItemType) 直接以原始 id 存储，不走组合键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Bay,
    Item,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Bay => "BAY",
            RecordKind::Item => "ITEM",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
