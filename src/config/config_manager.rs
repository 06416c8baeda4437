// ==========================================
// 智能传送带分拣系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::conveyor_config_trait::{
    ConfigResult, ConveyorConfigReader, DEFAULT_INACTIVITY_TIMEOUT_SECS,
};
use crate::db::configure_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    fn parse_bool(key: &str, raw: &str, default: bool) -> bool {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => {
                tracing::warn!(config_key = key, raw_value = %raw, "布尔配置格式错误，使用默认值");
                default
            }
        }
    }
}

// ==========================================
// ConveyorConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ConveyorConfigReader for ConfigManager {
    async fn get_inactivity_timeout_secs(&self) -> ConfigResult<i64> {
        let default = DEFAULT_INACTIVITY_TIMEOUT_SECS.to_string();
        let value = self.get_config_or_default(config_keys::INACTIVITY_TIMEOUT_SECS, &default)?;
        match value.trim().parse::<i64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => {
                tracing::warn!(
                    config_key = config_keys::INACTIVITY_TIMEOUT_SECS,
                    raw_value = %value,
                    "巡检超时配置非法，使用默认值"
                );
                Ok(DEFAULT_INACTIVITY_TIMEOUT_SECS)
            }
        }
    }

    async fn is_sweep_enabled(&self) -> ConfigResult<bool> {
        let value = self.get_config_or_default(config_keys::SWEEP_ENABLED, "true")?;
        Ok(Self::parse_bool(config_keys::SWEEP_ENABLED, &value, true))
    }

    async fn is_notify_enabled(&self) -> ConfigResult<bool> {
        let value = self.get_config_or_default(config_keys::NOTIFY_ENABLED, "true")?;
        Ok(Self::parse_bool(config_keys::NOTIFY_ENABLED, &value, true))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 巡检
    pub const INACTIVITY_TIMEOUT_SECS: &str = "inactivity_timeout_secs";
    pub const SWEEP_ENABLED: &str = "sweep_enabled";

    // 通知
    pub const NOTIFY_ENABLED: &str = "notify_enabled";
}
