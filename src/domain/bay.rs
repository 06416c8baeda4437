// ==========================================
// 智能传送带分拣系统 - 出口工位领域模型
// ==========================================
// 红线: 停用工位 (enabled=false) 不得接受新分配
// 红线: 工位从不删除，只通过 enabled=false 退役
// ==========================================

use crate::domain::item_type::ItemType;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ==========================================
// Bay - 出口工位
// ==========================================
// 用途: 有容量上限、带类型偏好的出口
// 说明: load = 当前路由到或被该工位持有的物品数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bay {
    pub id: String,

    // ===== 容量 =====
    pub capacity: i64, // 容量上限
    pub load: i64,     // 当前负载

    // ===== 状态 =====
    pub enabled: bool,
    pub priority: i64,
    pub last_activity: DateTime<Utc>, // 工位最近一次上报活动的时间

    // ===== 偏好 =====
    pub preferred_types: Vec<ItemType>, // 有序，不允许重复 id
}

impl Bay {
    /// 创建新工位（负载为 0，启用，无偏好）
    pub fn new(id: impl Into<String>, capacity: i64, priority: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            capacity,
            load: 0,
            enabled: true,
            priority,
            last_activity: now,
            preferred_types: Vec::new(),
        }
    }

    /// 添加偏好类型
    ///
    /// # 返回
    /// - true: 已添加
    /// - false: 该类型已在偏好列表中（保持无重复）
    pub fn add_preference(&mut self, item_type: ItemType) -> bool {
        if self.prefers(&item_type.id) {
            return false;
        }
        self.preferred_types.push(item_type);
        true
    }

    /// 是否偏好该类型
    pub fn prefers(&self, type_id: &str) -> bool {
        self.preferred_types.iter().any(|t| t.id == type_id)
    }

    /// 可接受新分配：启用且未满
    pub fn is_eligible(&self) -> bool {
        self.enabled && self.has_spare_capacity()
    }

    /// 是否超过巡检超时未上报活动
    pub fn is_inactive(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.last_activity < now - timeout
    }

    /// 刷新活动时间
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// 按状态转换调整负载（下限为 0）
    ///
    /// # 返回
    /// 实际生效的变化量
    pub fn apply_load_delta(&mut self, delta: i64) -> i64 {
        let before = self.load;
        self.load = (self.load + delta).max(0);
        self.load - before
    }

    /// 开关标签
    pub fn status_label(&self) -> &'static str {
        if self.enabled {
            "ON"
        } else {
            "OFF"
        }
    }

    /// 整记录校验（编辑工位前调用）
    ///
    /// # 返回
    /// - Ok(()): 校验通过
    /// - Err(String): 违规原因
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("工位 id 不能为空".to_string());
        }
        if self.capacity < 0 {
            return Err(format!("工位 {} 容量不能为负: {}", self.id, self.capacity));
        }
        if self.load < 0 {
            return Err(format!("工位 {} 负载不能为负: {}", self.id, self.load));
        }

        let mut seen = HashSet::new();
        for item_type in &self.preferred_types {
            if !seen.insert(item_type.id.as_str()) {
                return Err(format!(
                    "工位 {} 偏好类型重复: {}",
                    self.id, item_type.id
                ));
            }
        }
        Ok(())
    }
}

// ==========================================
// Trait: CapacityConstraint
// ==========================================
// 用途: 工位选择与快照汇报的容量接口
pub trait CapacityConstraint {
    /// 是否还有空位（load < capacity）
    fn has_spare_capacity(&self) -> bool;

    /// 剩余空位
    fn remaining_slots(&self) -> i64;

    /// 负载率百分比（仅用于汇报，不参与选择）
    fn load_factor_pct(&self) -> f64;
}

impl CapacityConstraint for Bay {
    fn has_spare_capacity(&self) -> bool {
        self.load < self.capacity
    }

    fn remaining_slots(&self) -> i64 {
        (self.capacity - self.load).max(0)
    }

    /// # 返回
    /// load / capacity * 100；容量为 0 时返回 0
    fn load_factor_pct(&self) -> f64 {
        if self.capacity <= 0 {
            return 0.0;
        }
        self.load as f64 / self.capacity as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item_type::catalog;

    fn sample_bay(capacity: i64, load: i64) -> Bay {
        let mut bay = Bay::new("1", capacity, 1, Utc::now());
        bay.load = load;
        bay
    }

    #[test]
    fn test_add_preference_rejects_duplicates() {
        let mut bay = sample_bay(10, 0);
        assert!(bay.add_preference(catalog::oven()));
        assert!(bay.add_preference(catalog::fridge()));
        assert!(!bay.add_preference(catalog::oven()));

        assert_eq!(bay.preferred_types.len(), 2);
        assert!(bay.prefers("1"));
        assert!(!bay.prefers("3"));
    }

    #[test]
    fn test_capacity_filter() {
        let full = sample_bay(10, 10);
        assert!(!full.has_spare_capacity());
        assert!(!full.is_eligible());
        assert_eq!(full.remaining_slots(), 0);

        let mut disabled = sample_bay(10, 3);
        disabled.enabled = false;
        assert!(disabled.has_spare_capacity());
        assert!(!disabled.is_eligible());
    }

    #[test]
    fn test_load_factor_pct() {
        assert_eq!(sample_bay(20, 5).load_factor_pct(), 25.0);
        assert_eq!(sample_bay(0, 0).load_factor_pct(), 0.0);
    }

    #[test]
    fn test_apply_load_delta_floors_at_zero() {
        let mut bay = sample_bay(10, 0);
        assert_eq!(bay.apply_load_delta(1), 1);
        assert_eq!(bay.apply_load_delta(-1), -1);
        assert_eq!(bay.apply_load_delta(-1), 0);
        assert_eq!(bay.load, 0);
    }

    #[test]
    fn test_is_inactive() {
        let now = Utc::now();
        let mut bay = sample_bay(10, 0);
        bay.last_activity = now - Duration::seconds(16);
        assert!(bay.is_inactive(now, Duration::seconds(15)));

        bay.touch(now);
        assert!(!bay.is_inactive(now, Duration::seconds(15)));
    }

    #[test]
    fn test_validate() {
        let mut bay = sample_bay(10, 0);
        bay.preferred_types = vec![catalog::oven(), catalog::oven()];
        assert!(bay.validate().unwrap_err().contains("重复"));

        let mut bay = sample_bay(-1, 0);
        bay.preferred_types.clear();
        assert!(bay.validate().is_err());

        let mut bay = sample_bay(10, 0);
        bay.id = "  ".to_string();
        assert!(bay.validate().is_err());

        assert!(sample_bay(10, 2).validate().is_ok());
    }
}
