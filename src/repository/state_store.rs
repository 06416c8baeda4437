// ==========================================
// 智能传送带分拣系统 - 世界状态存储
// ==========================================
// 职责: 键值读写 + 前缀扫描 + 带版本校验的批量提交
// 红线: Repository 不含业务逻辑
// ==========================================
// 组合键: U+0000 + kind + U+0000 + id + U+0000
// 版本: 每个键带 revision，不存在的键视为 revision=0
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::types::RecordKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// 组合键分隔符
pub const COMPOSITE_KEY_SEPARATOR: char = '\u{0}';

// ==========================================
// 组合键构造
// ==========================================

/// 构造组合键
///
/// # 返回
/// - Err(InvalidKey): id 为空或包含分隔符
pub fn composite_key(kind: RecordKind, id: &str) -> RepositoryResult<String> {
    validate_key_part("id", id)?;
    Ok(format!(
        "{sep}{kind}{sep}{id}{sep}",
        sep = COMPOSITE_KEY_SEPARATOR,
        kind = kind.as_str(),
        id = id
    ))
}

/// 某种记录的扫描前缀
pub fn composite_prefix(kind: RecordKind) -> String {
    format!(
        "{sep}{kind}{sep}",
        sep = COMPOSITE_KEY_SEPARATOR,
        kind = kind.as_str()
    )
}

/// 拆分组合键，返回 (kind, id)
pub fn split_composite_key(key: &str) -> Option<(&str, &str)> {
    let rest = key.strip_prefix(COMPOSITE_KEY_SEPARATOR)?;
    let rest = rest.strip_suffix(COMPOSITE_KEY_SEPARATOR)?;
    rest.split_once(COMPOSITE_KEY_SEPARATOR)
}

/// 原始键（物品类型使用），不得以分隔符开头
pub fn raw_key(id: &str) -> RepositoryResult<String> {
    validate_key_part("id", id)?;
    Ok(id.to_string())
}

fn validate_key_part(field: &str, value: &str) -> RepositoryResult<()> {
    if value.is_empty() {
        return Err(RepositoryError::InvalidKey {
            field: field.to_string(),
            message: "不能为空".to_string(),
        });
    }
    if value.contains(COMPOSITE_KEY_SEPARATOR) {
        return Err(RepositoryError::InvalidKey {
            field: field.to_string(),
            message: "不能包含 U+0000".to_string(),
        });
    }
    Ok(())
}

// ==========================================
// 存储接口
// ==========================================

/// 带版本号的值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub revision: i64,
}

/// 待提交的写入
///
/// expected_revision:
/// - None: 盲写（本次调用未读取过该键）
/// - Some(0): 读取时键不存在，提交时也必须不存在
/// - Some(n): 提交时 revision 必须仍为 n
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateWrite {
    pub key: String,
    pub value: Vec<u8>,
    pub expected_revision: Option<i64>,
}

impl StateWrite {
    pub fn blind(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            value,
            expected_revision: None,
        }
    }

    pub fn checked(key: impl Into<String>, value: Vec<u8>, expected_revision: i64) -> Self {
        Self {
            key: key.into(),
            value,
            expected_revision: Some(expected_revision),
        }
    }
}

/// 世界状态存储 Trait
///
/// 外部协作方提供的全部能力：按键读写、按前缀扫描、批量提交。
/// 实现必须保证 commit 原子：任一写入的版本校验失败，整批不生效。
#[async_trait]
pub trait StateStore: Send + Sync {
    /// 按键读取
    async fn get_state(&self, key: &str) -> RepositoryResult<Option<VersionedValue>>;

    /// 盲写单个键
    async fn put_state(&self, key: &str, value: &[u8]) -> RepositoryResult<()> {
        self.commit(vec![StateWrite::blind(key, value.to_vec())])
            .await
            .map(|_| ())
    }

    /// 按前缀扫描（按键序返回，保证选择时的确定性）
    async fn scan_by_prefix(&self, prefix: &str) -> RepositoryResult<Vec<(String, VersionedValue)>>;

    /// 原子提交一批写入
    ///
    /// # 返回
    /// - Ok(n): 写入条数
    /// - Err(OptimisticLockFailure): 某键版本已被其他调用修改（可重试）
    async fn commit(&self, writes: Vec<StateWrite>) -> RepositoryResult<usize>;
}

// ==========================================
// SqliteStateStore - SQLite 实现
// ==========================================

/// 基于 world_state 表的存储实现
pub struct SqliteStateStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStateStore {
    /// 打开数据库并确保表存在
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（调用方负责建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn decode_key(raw: Vec<u8>) -> RepositoryResult<String> {
        String::from_utf8(raw).map_err(|e| RepositoryError::InvalidKey {
            field: "state_key".to_string(),
            message: e.to_string(),
        })
    }

    /// 前缀扫描的上界：前缀字节 + 0xFF（UTF-8 中不会出现的字节）
    fn prefix_upper_bound(prefix: &str) -> Vec<u8> {
        let mut end = prefix.as_bytes().to_vec();
        end.push(0xFF);
        end
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get_state(&self, key: &str) -> RepositoryResult<Option<VersionedValue>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value, revision FROM world_state WHERE state_key = ?1",
                params![key.as_bytes()],
                |row| {
                    Ok(VersionedValue {
                        value: row.get(0)?,
                        revision: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(value)
    }

    async fn scan_by_prefix(&self, prefix: &str) -> RepositoryResult<Vec<(String, VersionedValue)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT state_key, value, revision
            FROM world_state
            WHERE state_key >= ?1 AND state_key < ?2
            ORDER BY state_key
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![prefix.as_bytes(), Self::prefix_upper_bound(prefix)],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        VersionedValue {
                            value: row.get(1)?,
                            revision: row.get(2)?,
                        },
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(raw_key, value)| Ok((Self::decode_key(raw_key)?, value)))
            .collect()
    }

    async fn commit(&self, writes: Vec<StateWrite>) -> RepositoryResult<usize> {
        if writes.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        let updated_at = Utc::now().to_rfc3339();

        for write in &writes {
            if let Some(expected) = write.expected_revision {
                let actual: i64 = tx
                    .query_row(
                        "SELECT revision FROM world_state WHERE state_key = ?1",
                        params![write.key.as_bytes()],
                        |row| row.get(0),
                    )
                    .optional()?
                    .unwrap_or(0);

                if actual != expected {
                    // tx 在此被丢弃 → 回滚，整批不生效
                    return Err(RepositoryError::OptimisticLockFailure {
                        key: write.key.replace(COMPOSITE_KEY_SEPARATOR, "/"),
                        expected,
                        actual,
                    });
                }
            }

            tx.execute(
                r#"
                INSERT INTO world_state (state_key, value, revision, updated_at)
                VALUES (?1, ?2, 1, ?3)
                ON CONFLICT(state_key) DO UPDATE SET
                    value = excluded.value,
                    revision = world_state.revision + 1,
                    updated_at = excluded.updated_at
                "#,
                params![write.key.as_bytes(), write.value, updated_at],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(writes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> SqliteStateStore {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        SqliteStateStore::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_composite_key_format() {
        let key = composite_key(RecordKind::Bay, "1").unwrap();
        assert_eq!(key, "\u{0}BAY\u{0}1\u{0}");
        assert!(key.starts_with(&composite_prefix(RecordKind::Bay)));
        assert!(!key.starts_with(&composite_prefix(RecordKind::Item)));
        assert_eq!(split_composite_key(&key), Some(("BAY", "1")));
    }

    #[test]
    fn test_composite_key_rejects_bad_ids() {
        assert!(composite_key(RecordKind::Item, "").is_err());
        assert!(composite_key(RecordKind::Item, "a\u{0}b").is_err());
        assert!(raw_key("").is_err());
    }

    #[tokio::test]
    async fn test_scan_by_prefix_is_key_ordered_and_kind_scoped() {
        let store = memory_store();
        for id in ["2", "1", "10"] {
            let key = composite_key(RecordKind::Bay, id).unwrap();
            store.put_state(&key, id.as_bytes()).await.unwrap();
        }
        let item_key = composite_key(RecordKind::Item, "1").unwrap();
        store.put_state(&item_key, b"item").await.unwrap();
        store.put_state("1", b"type").await.unwrap();

        let bays = store
            .scan_by_prefix(&composite_prefix(RecordKind::Bay))
            .await
            .unwrap();
        let ids: Vec<&str> = bays
            .iter()
            .filter_map(|(k, _)| split_composite_key(k).map(|(_, id)| id))
            .collect();
        assert_eq!(ids, vec!["1", "10", "2"]);
    }

    #[tokio::test]
    async fn test_revision_increments_on_each_write() {
        let store = memory_store();
        assert_eq!(store.get_state("k").await.unwrap(), None);

        store.put_state("k", b"v1").await.unwrap();
        store.put_state("k", b"v2").await.unwrap();

        let value = store.get_state("k").await.unwrap().unwrap();
        assert_eq!(value.value, b"v2".to_vec());
        assert_eq!(value.revision, 2);
    }

    #[tokio::test]
    async fn test_commit_rejects_stale_revision_atomically() {
        let store = memory_store();
        store.put_state("a", b"a1").await.unwrap();

        let result = store
            .commit(vec![
                StateWrite::checked("b", b"b1".to_vec(), 0),
                StateWrite::checked("a", b"a2".to_vec(), 7),
            ])
            .await;

        match result {
            Err(RepositoryError::OptimisticLockFailure { expected, actual, .. }) => {
                assert_eq!(expected, 7);
                assert_eq!(actual, 1);
            }
            other => panic!("Expected OptimisticLockFailure, got {:?}", other),
        }

        // 整批回滚：b 未写入，a 保持原值
        assert_eq!(store.get_state("b").await.unwrap(), None);
        assert_eq!(store.get_state("a").await.unwrap().unwrap().value, b"a1".to_vec());
    }
}
