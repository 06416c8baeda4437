// ==========================================
// 智能传送带分拣系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享资源和 API 实例
// 说明: 世界状态与配置共用同一个 SQLite 连接
// ==========================================

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};

use crate::api::ConveyorApi;
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::{
    ConveyorEventPublisher, OptionalEventPublisher, SystemTimeProvider, TimeProvider,
    TracingEventPublisher,
};
use crate::repository::SqliteStateStore;

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 传送带 API
    pub conveyor_api: Arc<ConveyorApi>,
}

impl AppState {
    /// 创建新的 AppState 实例（日志通道发布事件，系统时钟）
    pub fn new(db_path: String) -> anyhow::Result<Self> {
        Self::with_components(
            db_path,
            Arc::new(TracingEventPublisher),
            Arc::new(SystemTimeProvider),
        )
    }

    /// 使用指定的事件发布者与时钟创建 AppState
    pub fn with_components(
        db_path: String,
        publisher: Arc<dyn ConveyorEventPublisher>,
        clock: Arc<dyn TimeProvider>,
    ) -> anyhow::Result<Self> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .with_context(|| format!("无法打开数据库: {}", db_path))?;
        init_schema(&conn).context("无法初始化数据库结构")?;
        let conn = Arc::new(Mutex::new(conn));

        let store = Arc::new(SqliteStateStore::from_connection(conn.clone()));
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| anyhow!("无法初始化ConfigManager: {}", e))?,
        );

        let conveyor_api = Arc::new(ConveyorApi::new(
            store,
            config_manager.clone(),
            OptionalEventPublisher::with_publisher(publisher),
            clock,
        ));

        tracing::info!("AppState初始化完成");
        Ok(Self {
            db_path,
            config_manager,
            conveyor_api,
        })
    }
}

/// 获取默认数据库路径
///
/// # 优先级
/// 1. 环境变量 SMART_CONVEYOR_DB_PATH
/// 2. 用户数据目录 smart-conveyor/smart_conveyor.db
/// 3. 当前目录 ./smart_conveyor.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("SMART_CONVEYOR_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./smart_conveyor.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("smart-conveyor");
        // 确保目录存在
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("smart_conveyor.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_app_state_wires_shared_database() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);

        state.conveyor_api.init().await.unwrap();
        assert_eq!(state.conveyor_api.get_bays().await.unwrap().len(), 2);
        assert!(state.config_manager.get_config_snapshot().is_ok());
    }

    #[test]
    fn test_unopenable_path_reports_context() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("missing").join("conveyor.db");

        let err = match AppState::new(db_path.to_string_lossy().to_string()) {
            Ok(_) => panic!("Expected open failure"),
            Err(e) => e,
        };
        assert!(format!("{:#}", err).contains("无法打开数据库"));
    }
}
