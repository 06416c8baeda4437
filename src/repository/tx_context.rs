// ==========================================
// 智能传送带分拣系统 - 调用级事务上下文
// ==========================================
// 职责: 一次外部调用内的读写集管理
// - 读: 记录每个键首次读到的 revision（读集）
// - 写: 缓存整条记录（写集），本调用内可读到自己的写入
// - 提交: 写集一次性交给 StateStore::commit，带读集版本校验
// ==========================================
// 红线: 不做跨调用加锁；冲突由存储层的版本校验发现并上抛
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::state_store::{StateStore, StateWrite};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// 调用级事务上下文
pub struct TxContext<'a> {
    tx_id: String,
    store: &'a dyn StateStore,
    read_set: HashMap<String, i64>,
    write_set: BTreeMap<String, Vec<u8>>,
}

impl<'a> TxContext<'a> {
    /// 新建上下文（生成 tx_id）
    pub fn new(store: &'a dyn StateStore) -> Self {
        Self {
            tx_id: Uuid::new_v4().to_string(),
            store,
            read_set: HashMap::new(),
            write_set: BTreeMap::new(),
        }
    }

    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.write_set.is_empty()
    }

    // ==========================================
    // 原始字节读写
    // ==========================================

    /// 按键读取（优先返回本调用已写入的值）
    pub async fn get_state(&mut self, key: &str) -> RepositoryResult<Option<Vec<u8>>> {
        if let Some(pending) = self.write_set.get(key) {
            return Ok(Some(pending.clone()));
        }

        let found = self.store.get_state(key).await?;
        let revision = found.as_ref().map(|v| v.revision).unwrap_or(0);
        self.read_set.entry(key.to_string()).or_insert(revision);
        Ok(found.map(|v| v.value))
    }

    /// 写入写集（整条记录替换）
    pub fn put_state(&mut self, key: String, value: Vec<u8>) {
        self.write_set.insert(key, value);
    }

    /// 按前缀扫描，合并本调用写集，保持键序
    pub async fn scan_by_prefix(&mut self, prefix: &str) -> RepositoryResult<Vec<(String, Vec<u8>)>> {
        let stored = self.store.scan_by_prefix(prefix).await?;

        let mut merged: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for (key, versioned) in stored {
            self.read_set.entry(key.clone()).or_insert(versioned.revision);
            merged.insert(key, versioned.value);
        }
        for (key, value) in self.write_set.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            merged.insert(key.clone(), value.clone());
        }

        Ok(merged.into_iter().collect())
    }

    // ==========================================
    // 记录读写（JSON）
    // ==========================================

    pub async fn get_record<T: DeserializeOwned>(&mut self, key: &str) -> RepositoryResult<Option<T>> {
        match self.get_state(key).await? {
            Some(bytes) => Ok(Some(decode_record(key, &bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_record<T: Serialize>(&mut self, key: String, record: &T) -> RepositoryResult<()> {
        let bytes = serde_json::to_vec(record).map_err(|e| RepositoryError::SerializationError {
            key: key.clone(),
            message: e.to_string(),
        })?;
        self.put_state(key, bytes);
        Ok(())
    }

    pub async fn scan_records<T: DeserializeOwned>(&mut self, prefix: &str) -> RepositoryResult<Vec<T>> {
        self.scan_by_prefix(prefix)
            .await?
            .into_iter()
            .map(|(key, bytes)| decode_record(&key, &bytes))
            .collect()
    }

    // ==========================================
    // 提交
    // ==========================================

    /// 提交写集
    ///
    /// # 返回
    /// - Ok(n): 写入条数（无写入时为 0，不访问存储）
    /// - Err(OptimisticLockFailure): 读集中的键已被其他调用修改，整批不生效
    pub async fn commit(self) -> RepositoryResult<usize> {
        if self.write_set.is_empty() {
            return Ok(0);
        }

        let writes: Vec<StateWrite> = self
            .write_set
            .into_iter()
            .map(|(key, value)| match self.read_set.get(&key) {
                Some(revision) => StateWrite::checked(key, value, *revision),
                None => StateWrite::blind(key, value),
            })
            .collect();

        tracing::debug!(tx_id = %self.tx_id, writes = writes.len(), "提交写集");
        self.store.commit(writes).await
    }
}

fn decode_record<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> RepositoryResult<T> {
    serde_json::from_slice(bytes).map_err(|e| RepositoryError::SerializationError {
        key: key.replace(crate::repository::state_store::COMPOSITE_KEY_SEPARATOR, "/"),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::repository::state_store::SqliteStateStore;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn memory_store() -> SqliteStateStore {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        SqliteStateStore::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_reads_see_own_writes_before_commit() {
        let store = memory_store();
        let mut tx = TxContext::new(&store);

        tx.put_state("\u{0}BAY\u{0}1\u{0}".to_string(), b"1".to_vec());
        assert_eq!(tx.get_state("\u{0}BAY\u{0}1\u{0}").await.unwrap(), Some(b"1".to_vec()));

        let scanned = tx.scan_by_prefix("\u{0}BAY\u{0}").await.unwrap();
        assert_eq!(scanned.len(), 1);

        // 未提交前存储中不可见
        assert_eq!(store.get_state("\u{0}BAY\u{0}1\u{0}").await.unwrap(), None);

        assert_eq!(tx.commit().await.unwrap(), 1);
        assert!(store.get_state("\u{0}BAY\u{0}1\u{0}").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_read_then_write_conflicts() {
        let store = memory_store();
        store.put_state("k", b"0").await.unwrap();

        let mut first = TxContext::new(&store);
        let mut second = TxContext::new(&store);
        first.get_state("k").await.unwrap();
        second.get_state("k").await.unwrap();

        first.put_state("k".to_string(), b"1".to_vec());
        second.put_state("k".to_string(), b"1".to_vec());

        assert_eq!(first.commit().await.unwrap(), 1);
        let err = second.commit().await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_commit_without_writes_is_noop() {
        let store = memory_store();
        let mut tx = TxContext::new(&store);
        tx.get_state("missing").await.unwrap();
        assert!(!tx.has_pending_writes());
        assert_eq!(tx.commit().await.unwrap(), 0);
    }
}
