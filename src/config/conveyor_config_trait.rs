// ==========================================
// 智能传送带分拣系统 - 配置读取 Trait
// ==========================================
// 职责: 定义引擎/API 所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

/// 配置读取结果
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// 巡检超时默认值（秒）
pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: i64 = 15;

// ==========================================
// ConveyorConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ConveyorConfigReader: Send + Sync {
    // ===== 巡检配置 =====

    /// 获取工位无活动超时（秒）
    ///
    /// # 默认值
    /// - 15
    async fn get_inactivity_timeout_secs(&self) -> ConfigResult<i64>;

    /// 是否在每次变更操作前执行巡检
    ///
    /// # 默认值
    /// - true
    async fn is_sweep_enabled(&self) -> ConfigResult<bool>;

    // ===== 通知配置 =====

    /// 是否发布工位快照事件
    ///
    /// # 默认值
    /// - true
    async fn is_notify_enabled(&self) -> ConfigResult<bool>;
}
