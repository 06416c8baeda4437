// ==========================================
// 智能传送带分拣系统 - 引擎层事件发布
// ==========================================
// 职责: 工位快照构建 + 事件发布 trait（依赖倒置）
// 说明: 引擎只负责产出快照，投递由外部通道实现
// 红线: 事件只在调用写集提交成功后发布；发布失败不影响操作结果
// ==========================================

use crate::domain::bay::{Bay, CapacityConstraint};
use crate::domain::item::{ConveyorItem, ItemBrief};
use crate::domain::types::ItemState;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 事件类型
// ==========================================

/// 传送带事件类型（同时作为发布主题）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConveyorEventType {
    /// 新物品已分配工位
    ItemStored,
    /// 物品被工位捕获
    ItemIntoBay,
    /// 物品被工位放行
    ItemOutOfBay,
    /// 工位记录被替换
    BayEdited,
    /// 工位因超时无活动被停用
    BayEvicted,
    /// 工位上报活动
    BayActivity,
}

impl ConveyorEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            ConveyorEventType::ItemStored => "ItemStored",
            ConveyorEventType::ItemIntoBay => "ItemIntoBay",
            ConveyorEventType::ItemOutOfBay => "ItemOutOfBay",
            ConveyorEventType::BayEdited => "BayEdited",
            ConveyorEventType::BayEvicted => "BayEvicted",
            ConveyorEventType::BayActivity => "BayActivity",
        }
    }
}

// ==========================================
// 工位快照
// ==========================================

/// 工位快照（对外观察者可见的精简视图）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaySnapshot {
    pub bay_id: String,
    /// 路由到该工位、仍在传送带上的物品
    pub items: Vec<ItemBrief>,
    /// 偏好类型 id
    pub preferences: Vec<String>,
    /// load / capacity * 100
    pub load_factor_pct: f64,
    /// "ON" / "OFF"
    pub status: String,
}

impl BaySnapshot {
    /// 从工位和物品列表构建快照（只保留该工位上 ON_BELT 的物品）
    pub fn build(bay: &Bay, items: &[ConveyorItem]) -> Self {
        Self {
            bay_id: bay.id.clone(),
            items: items
                .iter()
                .filter(|item| item.is_routed_to(&bay.id, ItemState::OnBelt))
                .map(ItemBrief::from)
                .collect(),
            preferences: bay.preferred_types.iter().map(|t| t.id.clone()).collect(),
            load_factor_pct: bay.load_factor_pct(),
            status: bay.status_label().to_string(),
        }
    }
}

/// 传送带事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConveyorEvent {
    /// 触发事件的调用 id
    pub tx_id: String,
    pub event_type: ConveyorEventType,
    pub snapshot: BaySnapshot,
}

impl ConveyorEvent {
    pub fn new(tx_id: impl Into<String>, event_type: ConveyorEventType, snapshot: BaySnapshot) -> Self {
        Self {
            tx_id: tx_id.into(),
            event_type,
            snapshot,
        }
    }

    /// 发布主题
    pub fn topic(&self) -> &str {
        self.event_type.as_str()
    }

    /// 序列化为发布负载（JSON）
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 通知通道
///
/// fire-and-forget：调用方只记录失败，不回滚、不重试
pub trait ConveyorEventPublisher: Send + Sync {
    /// 发布事件
    ///
    /// # 参数
    /// - `topic`: 事件主题（事件类型名）
    /// - `payload`: JSON 负载
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl ConveyorEventPublisher for NoOpEventPublisher {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(topic = topic, bytes = payload.len(), "NoOpEventPublisher: 跳过事件发布");
        Ok(())
    }
}

/// 日志事件发布者（命令行默认通道）
#[derive(Debug, Clone, Default)]
pub struct TracingEventPublisher;

impl ConveyorEventPublisher for TracingEventPublisher {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::info!(
            target: "smart_conveyor::events",
            topic = topic,
            payload = %String::from_utf8_lossy(payload),
            "事件已发布"
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn ConveyorEventPublisher>> 的使用，并统一吞掉发布失败
#[derive(Clone)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn ConveyorEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn ConveyorEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    ///
    /// # 返回
    /// - true: 已交给发布者且发布成功
    /// - false: 未配置发布者，或发布失败（已记录日志）
    pub fn publish(&self, event: &ConveyorEvent) -> bool {
        let Some(publisher) = &self.inner else {
            tracing::debug!(
                tx_id = %event.tx_id,
                topic = event.topic(),
                "OptionalEventPublisher: 未配置发布者，跳过事件"
            );
            return false;
        };

        let payload = match event.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(tx_id = %event.tx_id, error = %e, "事件序列化失败");
                return false;
            }
        };

        match publisher.publish(event.topic(), &payload) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(tx_id = %event.tx_id, topic = event.topic(), error = %e, "事件发布失败");
                false
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item_type::catalog;
    use chrono::Utc;

    struct FailingPublisher;

    impl ConveyorEventPublisher for FailingPublisher {
        fn publish(&self, _topic: &str, _payload: &[u8]) -> Result<(), Box<dyn Error + Send + Sync>> {
            Err("channel closed".into())
        }
    }

    fn sample_bay() -> Bay {
        let mut bay = Bay::new("1", 10, 1, Utc::now());
        bay.add_preference(catalog::oven());
        bay.add_preference(catalog::fridge());
        bay.load = 3;
        bay
    }

    #[test]
    fn test_snapshot_keeps_only_on_belt_items_of_bay() {
        let bay = sample_bay();
        let mut captured = ConveyorItem::on_belt("I2", catalog::oven(), "1");
        captured.state = ItemState::InBay;
        let items = vec![
            ConveyorItem::on_belt("I1", catalog::oven(), "1"),
            captured,
            ConveyorItem::on_belt("I3", catalog::dryer(), "2"),
        ];

        let snapshot = BaySnapshot::build(&bay, &items);
        assert_eq!(snapshot.bay_id, "1");
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].id, "I1");
        assert_eq!(snapshot.items[0].type_id, "1");
        assert_eq!(snapshot.preferences, vec!["1".to_string(), "2".to_string()]);
        assert!((snapshot.load_factor_pct - 30.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.status, "ON");
    }

    #[test]
    fn test_event_payload_carries_type_and_tx_id() {
        let event = ConveyorEvent::new(
            "tx-1",
            ConveyorEventType::BayEvicted,
            BaySnapshot::build(&sample_bay(), &[]),
        );
        assert_eq!(event.topic(), "BayEvicted");

        let payload: serde_json::Value = serde_json::from_slice(&event.to_payload().unwrap()).unwrap();
        assert_eq!(payload["tx_id"], "tx-1");
        assert_eq!(payload["event_type"], "BayEvicted");
        assert_eq!(payload["snapshot"]["status"], "ON");
    }

    #[test]
    fn test_optional_publisher_none() {
        let publisher = OptionalEventPublisher::none();
        assert!(!publisher.is_configured());

        let event = ConveyorEvent::new(
            "tx-1",
            ConveyorEventType::BayActivity,
            BaySnapshot::build(&sample_bay(), &[]),
        );
        assert!(!publisher.publish(&event));
    }

    #[test]
    fn test_optional_publisher_swallows_failures() {
        let publisher = OptionalEventPublisher::with_publisher(Arc::new(FailingPublisher));
        let event = ConveyorEvent::new(
            "tx-1",
            ConveyorEventType::ItemStored,
            BaySnapshot::build(&sample_bay(), &[]),
        );
        assert!(!publisher.publish(&event));

        let ok = OptionalEventPublisher::with_publisher(Arc::new(NoOpEventPublisher));
        assert!(ok.publish(&event));
    }
}
