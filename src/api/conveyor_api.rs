// ==========================================
// 智能传送带分拣系统 - 传送带 API
// ==========================================
// 职责: 调用边界。每次调用：
//   1) 物品变更类操作先巡检（独立 TxContext，先提交、先发布）
//   2) 在新的 TxContext 中执行自身状态转换
//   3) 一次性提交写集（版本冲突 → 可重试的 StorageFailure）
//   4) 提交成功后发布工位快照
// 红线: 巡检结果不随后续操作失败而回滚
// 红线: 不做跨调用加锁，不在内部重试
// ==========================================

use crate::api::bootstrap::{seed_defaults, SeedReport};
use crate::api::dto::{
    parse_json, require, BayInput, ItemRefInput, ReassignedItem, StoreItemInput, SweepSummary,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::operation::ConveyorOperation;
use crate::config::ConveyorConfigReader;
use crate::domain::bay::Bay;
use crate::domain::item::ConveyorItem;
use crate::domain::types::ItemState;
use crate::engine::bay_registry::BayRegistry;
use crate::engine::events::{BaySnapshot, ConveyorEvent, ConveyorEventType, OptionalEventPublisher};
use crate::engine::inactivity_monitor::{InactivityMonitor, SweepReport};
use crate::engine::item_lifecycle::ItemLifecycle;
use crate::engine::time_provider::TimeProvider;
use crate::repository::state_store::StateStore;
use crate::repository::tx_context::TxContext;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::error::Error;
use std::sync::Arc;
use tracing::instrument;

/// 待发布事件（提交前登记，提交后构建快照并发布）
type PendingEvent = (ConveyorEventType, String);

// ==========================================
// ConveyorApi - 传送带 API
// ==========================================
pub struct ConveyorApi {
    store: Arc<dyn StateStore>,
    config: Arc<dyn ConveyorConfigReader>,
    publisher: OptionalEventPublisher,
    clock: Arc<dyn TimeProvider>,
    registry: BayRegistry,
    lifecycle: ItemLifecycle,
    monitor: InactivityMonitor,
}

impl ConveyorApi {
    /// 创建新的 ConveyorApi 实例
    pub fn new(
        store: Arc<dyn StateStore>,
        config: Arc<dyn ConveyorConfigReader>,
        publisher: OptionalEventPublisher,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        let registry = BayRegistry::new();
        let lifecycle = ItemLifecycle::new(registry.clone());
        let monitor = InactivityMonitor::new(registry.clone(), lifecycle.clone());
        Self {
            store,
            config,
            publisher,
            clock,
            registry,
            lifecycle,
            monitor,
        }
    }

    // ==========================================
    // 调用分发
    // ==========================================

    /// 按函数名分发调用
    ///
    /// # 返回
    /// - Ok(Some(json)): 操作返回的 JSON 负载
    /// - Ok(None): 操作无返回负载（init）
    /// - Err(ApiError): 调用失败
    #[instrument(skip(self, function, args), fields(function = %function, argc = args.len()))]
    pub async fn invoke(&self, function: &str, args: &[String]) -> ApiResult<Option<String>> {
        let op: ConveyorOperation = function.parse().map_err(ApiError::InvalidInput)?;
        if args.len() != op.arity() {
            return Err(ApiError::InvalidInput(format!(
                "参数个数错误: {} 需要 {} 个参数，实际 {} 个",
                op,
                op.arity(),
                args.len()
            )));
        }
        tracing::debug!(operation = %op, mutating = op.is_mutating(), "分发调用");
        let arg = |index: usize| args.get(index).map(String::as_str).unwrap_or("");

        let payload = match op {
            ConveyorOperation::Init => {
                self.init().await?;
                None
            }
            ConveyorOperation::StoreItem => Some(to_payload(&self.store_item(arg(0)).await?)?),
            ConveyorOperation::EditBay => Some(to_payload(&self.edit_bay(arg(0)).await?)?),
            ConveyorOperation::MoveItemIntoBay => {
                Some(to_payload(&self.move_item_into_bay(arg(0)).await?)?)
            }
            ConveyorOperation::MoveItemOutOfBay => {
                Some(to_payload(&self.move_item_out_of_bay(arg(0)).await?)?)
            }
            ConveyorOperation::GetBays => Some(to_payload(&self.get_bays().await?)?),
            ConveyorOperation::GetItemsByBay => {
                Some(to_payload(&self.get_items_by_bay(arg(0)).await?)?)
            }
            ConveyorOperation::GetItemById => Some(to_payload(&self.get_item_by_id(arg(0)).await?)?),
            ConveyorOperation::GetItemsByDescription => {
                Some(to_payload(&self.get_items_by_description(arg(0)).await?)?)
            }
            ConveyorOperation::ControlBays => Some(to_payload(&self.control_bays().await?)?),
            ConveyorOperation::ReportBayActivity => {
                Some(to_payload(&self.report_bay_activity(arg(0)).await?)?)
            }
        };
        Ok(payload)
    }

    // ==========================================
    // 变更操作
    // ==========================================

    /// 初始化默认类型目录与工位（只补缺失记录）
    pub async fn init(&self) -> ApiResult<SeedReport> {
        let mut tx = self.begin();
        let report = seed_defaults(&mut tx, &self.registry, self.clock.utc_now()).await?;
        self.finish(tx, Vec::new()).await?;
        Ok(report)
    }

    /// 新物品上传送带并分配工位
    pub async fn store_item(&self, item_json: &str) -> ApiResult<ConveyorItem> {
        let input: StoreItemInput = parse_json(item_json, "item")?;
        let item_id = require(input.id, "id")?;
        let type_ref = input
            .item_type
            .ok_or_else(|| ApiError::InvalidInput("缺少必填字段: type".to_string()))?;

        let now = self.clock.utc_now();
        self.sweep_before_mutation(ConveyorOperation::StoreItem, now)
            .await?;

        let mut tx = self.begin();
        let assignment = self
            .lifecycle
            .store(&mut tx, &item_id, type_ref.type_id())
            .await?;
        if let Some(description) = type_ref.description() {
            if description != assignment.item.item_type.description {
                tracing::warn!(
                    item_id = %item_id,
                    supplied = description,
                    catalog = %assignment.item.item_type.description,
                    "调用方类型描述与目录不一致，以目录为准"
                );
            }
        }

        let pending = vec![(ConveyorEventType::ItemStored, assignment.bay.id.clone())];
        self.finish(tx, pending).await?;
        Ok(assignment.item)
    }

    /// 整条替换工位记录
    pub async fn edit_bay(&self, bay_json: &str) -> ApiResult<Bay> {
        let input: Option<BayInput> = parse_json(bay_json, "bay")?;
        let now = self.clock.utc_now();

        let mut tx = self.begin();
        let bay = self
            .registry
            .edit(&mut tx, input.map(|b| b.into_bay(now)), now)?;

        self.finish(tx, vec![(ConveyorEventType::BayEdited, bay.id.clone())])
            .await?;
        Ok(bay)
    }

    /// 工位捕获物品（ON_BELT → IN_BAY）
    pub async fn move_item_into_bay(&self, item_json: &str) -> ApiResult<ConveyorItem> {
        self.advance_item(item_json, ItemState::InBay).await
    }

    /// 工位放行物品（IN_BAY → RELEASED）
    pub async fn move_item_out_of_bay(&self, item_json: &str) -> ApiResult<ConveyorItem> {
        self.advance_item(item_json, ItemState::Released).await
    }

    async fn advance_item(&self, item_json: &str, target: ItemState) -> ApiResult<ConveyorItem> {
        let input: ItemRefInput = parse_json(item_json, "item")?;
        let item_id = require(input.id, "id")?;
        let op = match target {
            ItemState::Released => ConveyorOperation::MoveItemOutOfBay,
            _ => ConveyorOperation::MoveItemIntoBay,
        };

        let now = self.clock.utc_now();
        self.sweep_before_mutation(op, now).await?;

        let mut tx = self.begin();
        let (item, bay, event_type) = match target {
            ItemState::InBay => {
                let (item, bay) = self.lifecycle.receive_into_bay(&mut tx, &item_id, now).await?;
                (item, bay, ConveyorEventType::ItemIntoBay)
            }
            ItemState::Released => {
                let (item, bay) = self.lifecycle.release(&mut tx, &item_id, now).await?;
                (item, bay, ConveyorEventType::ItemOutOfBay)
            }
            ItemState::OnBelt => {
                return Err(ApiError::InternalError(
                    "ON_BELT 只能通过分配进入".to_string(),
                ))
            }
        };

        self.finish(tx, vec![(event_type, bay.id)]).await?;
        Ok(item)
    }

    /// 显式巡检（不受 sweep_enabled 开关影响）
    pub async fn control_bays(&self) -> ApiResult<SweepSummary> {
        let now = self.clock.utc_now();
        let timeout = self.inactivity_timeout().await?;

        let mut tx = self.begin();
        let report = self.monitor.sweep(&mut tx, now, timeout).await?;
        let summary = summarize(&report);

        let pending = evicted_events(&report);
        self.finish(tx, pending).await?;
        Ok(summary)
    }

    /// 工位心跳：刷新活动时间；被巡检停用的工位恢复启用
    pub async fn report_bay_activity(&self, bay_id: &str) -> ApiResult<Bay> {
        if bay_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("缺少必填字段: bayId".to_string()));
        }

        let now = self.clock.utc_now();
        let mut tx = self.begin();
        let mut bay = self.registry.get(&mut tx, bay_id).await?;
        bay.touch(now);
        if !bay.enabled {
            bay.enabled = true;
            tracing::info!(bay_id = %bay.id, "工位恢复上报，重新启用");
        }
        self.registry.save(&mut tx, &bay)?;

        self.finish(tx, vec![(ConveyorEventType::BayActivity, bay.id.clone())])
            .await?;
        Ok(bay)
    }

    // ==========================================
    // 查询操作（只读，不提交）
    // ==========================================

    pub async fn get_bays(&self) -> ApiResult<Vec<Bay>> {
        let mut tx = self.begin();
        Ok(self.registry.list_all(&mut tx).await?)
    }

    /// 路由到该工位、仍在传送带上的物品
    pub async fn get_items_by_bay(&self, bay_id: &str) -> ApiResult<Vec<ConveyorItem>> {
        let mut tx = self.begin();
        Ok(self
            .lifecycle
            .query_by_bay(&mut tx, bay_id, ItemState::OnBelt)
            .await?)
    }

    pub async fn get_item_by_id(&self, item_id: &str) -> ApiResult<ConveyorItem> {
        let mut tx = self.begin();
        Ok(self.lifecycle.get(&mut tx, item_id).await?)
    }

    pub async fn get_items_by_description(&self, description: &str) -> ApiResult<Vec<ConveyorItem>> {
        let mut tx = self.begin();
        Ok(self
            .lifecycle
            .query_by_description(&mut tx, description)
            .await?)
    }

    // ==========================================
    // 调用生命周期
    // ==========================================

    fn begin(&self) -> TxContext<'_> {
        TxContext::new(self.store.as_ref())
    }

    async fn inactivity_timeout(&self) -> ApiResult<Duration> {
        let secs = self
            .config
            .get_inactivity_timeout_secs()
            .await
            .map_err(config_error)?;
        Ok(Duration::seconds(secs))
    }

    /// 物品变更前的巡检（受 sweep_enabled 开关控制）
    ///
    /// 巡检使用独立的 TxContext 并立即提交，停用结果与 BayEvicted 事件
    /// 在随后的操作失败时依然保留。
    async fn sweep_before_mutation(&self, op: ConveyorOperation, now: DateTime<Utc>) -> ApiResult<()> {
        if !op.runs_sweep_first() {
            return Ok(());
        }
        if !self.config.is_sweep_enabled().await.map_err(config_error)? {
            tracing::debug!(operation = %op, "巡检已关闭，跳过");
            return Ok(());
        }

        let timeout = self.inactivity_timeout().await?;
        let mut tx = self.begin();
        let report = self.monitor.sweep(&mut tx, now, timeout).await?;
        if !report.is_noop() {
            tracing::info!(
                operation = %op,
                evicted = report.evicted_bays.len(),
                reassigned = report.reassigned.len(),
                "变更前巡检完成"
            );
        }
        self.finish(tx, evicted_events(&report)).await?;
        Ok(())
    }

    /// 提交写集，成功后发布事件
    async fn finish(&self, mut tx: TxContext<'_>, pending: Vec<PendingEvent>) -> ApiResult<usize> {
        let events = if pending.is_empty() || !self.publisher.is_configured() {
            Vec::new()
        } else if self.config.is_notify_enabled().await.map_err(config_error)? {
            self.build_events(&mut tx, pending).await?
        } else {
            Vec::new()
        };

        let tx_id = tx.tx_id().to_string();
        let written = tx.commit().await?;

        let published = events
            .iter()
            .filter(|event| self.publisher.publish(event))
            .count();
        tracing::debug!(tx_id = %tx_id, written, published, "调用已提交");
        Ok(written)
    }

    /// 基于本次调用的最新视图构建工位快照
    async fn build_events(
        &self,
        tx: &mut TxContext<'_>,
        pending: Vec<PendingEvent>,
    ) -> ApiResult<Vec<ConveyorEvent>> {
        let items = self.lifecycle.list_all(tx).await?;
        let mut events = Vec::with_capacity(pending.len());
        for (event_type, bay_id) in pending {
            if let Some(bay) = self.registry.find(tx, &bay_id).await? {
                events.push(ConveyorEvent::new(
                    tx.tx_id(),
                    event_type,
                    BaySnapshot::build(&bay, &items),
                ));
            }
        }
        Ok(events)
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn config_error(err: Box<dyn Error + Send + Sync>) -> ApiError {
    ApiError::InternalError(format!("读取配置失败: {}", err))
}

fn to_payload<T: Serialize>(value: &T) -> ApiResult<String> {
    serde_json::to_string(value).map_err(|e| ApiError::InternalError(format!("序列化返回值失败: {}", e)))
}

fn evicted_events(report: &SweepReport) -> Vec<PendingEvent> {
    report
        .evicted_bays
        .iter()
        .map(|bay| (ConveyorEventType::BayEvicted, bay.id.clone()))
        .collect()
}

fn summarize(report: &SweepReport) -> SweepSummary {
    SweepSummary {
        evicted_bays: report.evicted_bays.iter().map(|b| b.id.clone()).collect(),
        reassigned: report
            .reassigned
            .iter()
            .map(|a| ReassignedItem {
                item_id: a.item.id.clone(),
                from_bay: a.previous_bay.as_ref().map(|b| b.id.clone()),
                to_bay: a.bay.id.clone(),
            })
            .collect(),
        unassigned: report.unassigned.iter().map(|u| u.item_id.clone()).collect(),
    }
}
