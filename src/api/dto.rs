// ==========================================
// 智能传送带分拣系统 - 调用入参 DTO
// ==========================================
// 职责: 解析调用方 JSON，缺少必填字段 → InvalidInput
// 说明: 物品入参忽略未知字段，调用方可以直接回传完整物品记录；
//       工位入参是整条替换，字段必须齐全且不得有未知字段
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::bay::Bay;
use crate::domain::item_type::ItemType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 类型引用：可以是类型 id 字符串，也可以是 {id, description} 记录
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ItemTypeRef {
    Id(String),
    Record {
        id: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl ItemTypeRef {
    pub fn type_id(&self) -> &str {
        match self {
            ItemTypeRef::Id(id) => id,
            ItemTypeRef::Record { id, .. } => id,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            ItemTypeRef::Id(_) => None,
            ItemTypeRef::Record { description, .. } => description.as_deref(),
        }
    }
}

/// storeItem 入参
#[derive(Debug, Clone, Deserialize)]
pub struct StoreItemInput {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<ItemTypeRef>,
}

/// moveItemIntoBay / moveItemOutOfBay 入参（只用 id 定位已存储物品）
#[derive(Debug, Clone, Deserialize)]
pub struct ItemRefInput {
    pub id: Option<String>,
}

/// editBay 入参（整条记录；last_activity 由本次编辑刷新）
///
/// 除 last_activity 外全部必填；未知字段直接拒绝，避免拼错的字段被静默忽略后清空原值。
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BayInput {
    pub id: String,
    pub capacity: i64,
    pub load: i64,
    pub enabled: bool,
    pub priority: i64,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
    pub preferred_types: Vec<ItemType>,
}

impl BayInput {
    pub fn into_bay(self, now: DateTime<Utc>) -> Bay {
        Bay {
            id: self.id,
            capacity: self.capacity,
            load: self.load,
            enabled: self.enabled,
            priority: self.priority,
            last_activity: self.last_activity.unwrap_or(now),
            preferred_types: self.preferred_types,
        }
    }
}

/// controlBays 返回的巡检摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub evicted_bays: Vec<String>,
    pub reassigned: Vec<ReassignedItem>,
    pub unassigned: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReassignedItem {
    pub item_id: String,
    pub from_bay: Option<String>,
    pub to_bay: String,
}

/// 解析 JSON 入参
pub fn parse_json<'de, T: Deserialize<'de>>(raw: &'de str, what: &str) -> ApiResult<T> {
    if raw.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("缺少{}参数", what)));
    }
    serde_json::from_str(raw).map_err(|e| ApiError::InvalidInput(format!("{} JSON 解析失败: {}", what, e)))
}

/// 必填字段
pub fn require(field: Option<String>, name: &str) -> ApiResult<String> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApiError::InvalidInput(format!("缺少必填字段: {}", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_input_accepts_type_record_or_id() {
        let input: StoreItemInput =
            parse_json(r#"{"id":"I1","type":{"id":"1","description":"Oven"}}"#, "item").unwrap();
        assert_eq!(input.item_type.unwrap().type_id(), "1");

        let input: StoreItemInput = parse_json(r#"{"id":"I2","type":"3"}"#, "item").unwrap();
        assert_eq!(input.item_type.unwrap().type_id(), "3");
    }

    #[test]
    fn test_missing_fields_are_invalid_input() {
        let input: StoreItemInput = parse_json(r#"{"type":"3"}"#, "item").unwrap();
        assert!(matches!(require(input.id, "id"), Err(ApiError::InvalidInput(_))));

        assert!(matches!(
            parse_json::<BayInput>(r#"{"id":"1"}"#, "bay"),
            Err(ApiError::InvalidInput(_))
        ));
        // 缺少 preferred_types / 拼写不符的字段
        assert!(matches!(
            parse_json::<BayInput>(
                r#"{"id":"1","capacity":10,"load":0,"enabled":true,"priority":1}"#,
                "bay"
            ),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_json::<BayInput>(
                r#"{"id":"1","capacity":10,"load":0,"enabled":true,"priority":1,"preferred_types":[],"preferredTypes":[]}"#,
                "bay"
            ),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_json::<ItemRefInput>("", "item"),
            Err(ApiError::InvalidInput(_))
        ));
    }
}
