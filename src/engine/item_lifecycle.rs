// ==========================================
// 智能传送带分拣系统 - 物品生命周期 / 状态机
// ==========================================
// 状态: ON_BELT → IN_BAY → RELEASED（只能前进）
// 负载: ON_BELT +1，IN_BAY -1，RELEASED 不变
// ==========================================
// 红线: 物品状态与工位负载只在 apply_transition 中一起变更
// 红线: 分配失败不得留下任何写入（先选工位，后改记录）
// ==========================================

use crate::domain::bay::Bay;
use crate::domain::item::ConveyorItem;
use crate::domain::types::ItemState;
use crate::engine::bay_registry::BayRegistry;
use crate::engine::error::{ConveyorError, ConveyorResult};
use crate::repository::item_repo::ItemRepository;
use crate::repository::item_type_repo::ItemTypeRepository;
use crate::repository::tx_context::TxContext;
use chrono::{DateTime, Utc};
use tracing::instrument;

// ==========================================
// Assignment - 分配结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// 已写入的物品记录（ON_BELT）
    pub item: ConveyorItem,
    /// 目标工位（负载已 +1）
    pub bay: Bay,
    /// 重新分配时被释放预占的原工位
    pub previous_bay: Option<Bay>,
}

// ==========================================
// ItemLifecycle - 物品生命周期
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ItemLifecycle {
    item_repo: ItemRepository,
    type_repo: ItemTypeRepository,
    registry: BayRegistry,
}

impl ItemLifecycle {
    pub fn new(registry: BayRegistry) -> Self {
        Self {
            item_repo: ItemRepository::new(),
            type_repo: ItemTypeRepository::new(),
            registry,
        }
    }

    // ==========================================
    // 入口操作
    // ==========================================

    /// 新物品上传送带
    ///
    /// # 校验
    /// - id / type_id 不能为空
    /// - 类型必须存在于类型目录（以目录记录为准）
    /// - id 不能与已存储物品重复
    pub async fn store(
        &self,
        tx: &mut TxContext<'_>,
        item_id: &str,
        type_id: &str,
    ) -> ConveyorResult<Assignment> {
        if item_id.trim().is_empty() {
            return Err(ConveyorError::InvalidInput("物品 id 不能为空".to_string()));
        }
        if type_id.trim().is_empty() {
            return Err(ConveyorError::InvalidInput("物品类型不能为空".to_string()));
        }

        let item_type = self
            .type_repo
            .find_by_id(tx, type_id)
            .await?
            .ok_or_else(|| ConveyorError::InvalidInput(format!("未知物品类型: {}", type_id)))?;

        if self.item_repo.find_by_id(tx, item_id).await?.is_some() {
            return Err(ConveyorError::InvalidInput(format!("物品已存在: {}", item_id)));
        }

        self.assign(tx, ConveyorItem::on_belt(item_id, item_type, String::new()))
            .await
    }

    /// 为物品分配出口工位
    ///
    /// 新物品 assigned_bay 为空；重新分配时 assigned_bay 为原工位，
    /// 原工位的预占会在同一次转换中释放（下限为 0）。
    ///
    /// # 错误
    /// - NoBayAvailable: 无启用且未满的工位，此时不产生任何写入
    #[instrument(skip(self, tx, item), fields(
        tx_id = %tx.tx_id(),
        item_id = %item.id,
        type_id = %item.item_type.id,
        previous_bay = %item.assigned_bay
    ))]
    pub async fn assign(
        &self,
        tx: &mut TxContext<'_>,
        mut item: ConveyorItem,
    ) -> ConveyorResult<Assignment> {
        let selected = self
            .registry
            .select_bay(tx, &item.item_type)
            .await?
            .ok_or_else(|| ConveyorError::NoBayAvailable {
                item_id: item.id.clone(),
                type_id: item.item_type.id.clone(),
            })?;

        let previous_bay_id = std::mem::take(&mut item.assigned_bay);
        let holds_reservation = item.state == ItemState::OnBelt && !previous_bay_id.is_empty();

        let mut previous_bay = None;
        let mut target = selected;
        if holds_reservation {
            if previous_bay_id == target.id {
                // 原地重分配：释放与预占相互抵消
                target.apply_load_delta(-ItemState::OnBelt.load_delta());
            } else if let Some(mut old) = self.registry.find(tx, &previous_bay_id).await? {
                let released = old.apply_load_delta(-ItemState::OnBelt.load_delta());
                self.registry.save(tx, &old)?;
                tracing::debug!(bay_id = %old.id, released, "释放原工位预占");
                previous_bay = Some(old);
            }
        }

        self.apply_transition(tx, &mut item, &mut target, ItemState::OnBelt)?;

        tracing::info!(bay_id = %target.id, load = target.load, capacity = target.capacity, "物品已分配工位");
        Ok(Assignment {
            item,
            bay: target,
            previous_bay,
        })
    }

    /// 状态转换（唯一同时修改物品状态与工位负载的位置）
    ///
    /// 先写物品记录，再写工位记录；两者同属当前调用的写集，一起提交。
    pub fn apply_transition(
        &self,
        tx: &mut TxContext<'_>,
        item: &mut ConveyorItem,
        bay: &mut Bay,
        new_state: ItemState,
    ) -> ConveyorResult<()> {
        let applied = bay.apply_load_delta(new_state.load_delta());
        if applied != new_state.load_delta() {
            tracing::warn!(
                bay_id = %bay.id,
                expected = new_state.load_delta(),
                applied,
                "工位负载已触底，按 0 截断"
            );
        }

        item.state = new_state;
        item.assigned_bay = bay.id.clone();

        self.item_repo.save(tx, item)?;
        self.registry.save(tx, bay)?;
        Ok(())
    }

    /// 工位捕获物品（ON_BELT → IN_BAY），并刷新工位活动时间
    pub async fn receive_into_bay(
        &self,
        tx: &mut TxContext<'_>,
        item_id: &str,
        now: DateTime<Utc>,
    ) -> ConveyorResult<(ConveyorItem, Bay)> {
        self.advance(tx, item_id, ItemState::InBay, now).await
    }

    /// 工位放行物品（IN_BAY → RELEASED），并刷新工位活动时间
    pub async fn release(
        &self,
        tx: &mut TxContext<'_>,
        item_id: &str,
        now: DateTime<Utc>,
    ) -> ConveyorResult<(ConveyorItem, Bay)> {
        self.advance(tx, item_id, ItemState::Released, now).await
    }

    async fn advance(
        &self,
        tx: &mut TxContext<'_>,
        item_id: &str,
        new_state: ItemState,
        now: DateTime<Utc>,
    ) -> ConveyorResult<(ConveyorItem, Bay)> {
        let mut item = self.get(tx, item_id).await?;
        if !item.state.can_transition_to(new_state) {
            return Err(ConveyorError::InvalidStateTransition {
                item_id: item.id,
                from: item.state,
                to: new_state,
            });
        }

        let mut bay = self.registry.get(tx, &item.assigned_bay).await?;
        bay.touch(now);
        self.apply_transition(tx, &mut item, &mut bay, new_state)?;

        tracing::info!(
            tx_id = %tx.tx_id(),
            item_id = %item.id,
            bay_id = %bay.id,
            state = %item.state,
            load = bay.load,
            "物品状态已前进"
        );
        Ok((item, bay))
    }

    // ==========================================
    // 查询
    // ==========================================

    pub async fn find(&self, tx: &mut TxContext<'_>, item_id: &str) -> ConveyorResult<Option<ConveyorItem>> {
        Ok(self.item_repo.find_by_id(tx, item_id).await?)
    }

    /// 查询物品，不存在时报 NotFound
    pub async fn get(&self, tx: &mut TxContext<'_>, item_id: &str) -> ConveyorResult<ConveyorItem> {
        if item_id.trim().is_empty() {
            return Err(ConveyorError::InvalidInput("物品 id 不能为空".to_string()));
        }
        self.find(tx, item_id)
            .await?
            .ok_or_else(|| ConveyorError::not_found("Item", item_id))
    }

    /// 全量物品（按键序）
    pub async fn list_all(&self, tx: &mut TxContext<'_>) -> ConveyorResult<Vec<ConveyorItem>> {
        Ok(self.item_repo.list_all(tx).await?)
    }

    /// 查询路由到该工位且处于指定状态的物品（空 bay_id 返回空列表）
    pub async fn query_by_bay(
        &self,
        tx: &mut TxContext<'_>,
        bay_id: &str,
        state: ItemState,
    ) -> ConveyorResult<Vec<ConveyorItem>> {
        if bay_id.is_empty() {
            return Ok(Vec::new());
        }
        let items = self.item_repo.list_all(tx).await?;
        Ok(items
            .into_iter()
            .filter(|item| item.is_routed_to(bay_id, state))
            .collect())
    }

    /// 按类型描述查询物品
    pub async fn query_by_description(
        &self,
        tx: &mut TxContext<'_>,
        description: &str,
    ) -> ConveyorResult<Vec<ConveyorItem>> {
        let items = self.item_repo.list_all(tx).await?;
        Ok(items
            .into_iter()
            .filter(|item| item.item_type.description == description)
            .collect())
    }
}
