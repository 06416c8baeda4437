// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证跨调用冲突由存储层版本校验发现，并作为可重试错误上抛
// ==========================================


#[cfg(test)]
mod concurrent_control_test {
    use smart_conveyor::api::{to_error_response, ApiError};
    use smart_conveyor::api::bootstrap::seed_defaults;
    use smart_conveyor::engine::{BayRegistry, ItemLifecycle};
    use smart_conveyor::repository::{RepositoryError, SqliteStateStore, StateStore, TxContext};
    use std::sync::Arc;

    use crate::test_helpers::{create_test_db, fixed_start, item_json, TestHarness};

    async fn seeded_store() -> (tempfile::NamedTempFile, SqliteStateStore) {
        let (temp_file, db_path) = create_test_db().unwrap();
        let store = SqliteStateStore::new(&db_path).unwrap();

        let mut tx = TxContext::new(&store);
        seed_defaults(&mut tx, &BayRegistry::new(), fixed_start())
            .await
            .unwrap();
        tx.commit().await.unwrap();
        (temp_file, store)
    }

    // ==========================================
    // 测试用例
    // ==========================================

    #[tokio::test]
    async fn test_racing_assignments_to_same_bay_conflict() {
        let (_tmp, store) = seeded_store().await;
        let lifecycle = ItemLifecycle::new(BayRegistry::new());

        // 两个调用读到同一个工位负载
        let mut first = TxContext::new(&store);
        let mut second = TxContext::new(&store);
        let a = lifecycle.store(&mut first, "A", "1").await.unwrap();
        let b = lifecycle.store(&mut second, "B", "1").await.unwrap();
        assert_eq!(a.bay.id, "1");
        assert_eq!(b.bay.id, "1");
        assert_eq!(a.bay.load, 1);
        assert_eq!(b.bay.load, 1);

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(matches!(err, RepositoryError::OptimisticLockFailure { .. }));
        assert!(err.is_retryable());

        // 失败的写集整体不生效
        let mut check = TxContext::new(&store);
        let bay = BayRegistry::new().get(&mut check, "1").await.unwrap();
        assert_eq!(bay.load, 1);
        assert!(lifecycle.find(&mut check, "B").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retry_after_conflict_succeeds() {
        let (_tmp, store) = seeded_store().await;
        let lifecycle = ItemLifecycle::new(BayRegistry::new());

        let mut first = TxContext::new(&store);
        let mut second = TxContext::new(&store);
        lifecycle.store(&mut first, "A", "1").await.unwrap();
        lifecycle.store(&mut second, "B", "1").await.unwrap();
        first.commit().await.unwrap();
        assert!(second.commit().await.is_err());

        // 调用方整体重跑
        let mut retry = TxContext::new(&store);
        let assignment = lifecycle.store(&mut retry, "B", "1").await.unwrap();
        assert_eq!(assignment.bay.load, 2);
        retry.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_conflict_surfaces_as_retryable_storage_failure() {
        let err: ApiError = RepositoryError::OptimisticLockFailure {
            key: "BAY/1".to_string(),
            expected: 2,
            actual: 3,
        }
        .into();
        let response = to_error_response(&err);
        assert_eq!(response.code, "STORAGE_FAILURE");
        assert_eq!(response.details.unwrap()["retryable"], true);
    }

    #[tokio::test]
    async fn test_disjoint_invocations_do_not_conflict() {
        let (_tmp, store) = seeded_store().await;
        let registry = BayRegistry::new();

        // 只读取并修改各自的工位记录
        let mut first = TxContext::new(&store);
        let mut second = TxContext::new(&store);
        let mut one = registry.get(&mut first, "1").await.unwrap();
        let mut two = registry.get(&mut second, "2").await.unwrap();
        one.priority = 5;
        two.priority = 6;
        registry.save(&mut first, &one).unwrap();
        registry.save(&mut second, &two).unwrap();

        first.commit().await.unwrap();
        second.commit().await.unwrap();
        assert_eq!(store.get_state("\u{0}BAY\u{0}2\u{0}").await.unwrap().unwrap().revision, 2);
    }

    #[tokio::test]
    async fn test_parallel_api_calls_keep_load_consistent() {
        let harness = Arc::new(TestHarness::seeded().await);

        let mut handles = Vec::new();
        for n in 0..8 {
            let harness = harness.clone();
            handles.push(tokio::spawn(async move {
                harness
                    .api
                    .store_item(&item_json(&format!("P{}", n), "3", "WashingMachine"))
                    .await
            }));
        }

        let mut stored = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => stored += 1,
                Err(err) => assert!(err.is_retryable(), "unexpected error: {}", err),
            }
        }

        // 成功的调用数与工位负载一致
        let bays = harness.api.get_bays().await.unwrap();
        let total_load: i64 = bays.iter().map(|b| b.load).sum();
        assert_eq!(total_load, stored);
        assert_eq!(harness.api.get_items_by_description("WashingMachine").await.unwrap().len() as i64, stored);
    }
}
