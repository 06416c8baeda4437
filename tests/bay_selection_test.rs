// ==========================================
// 工位选择测试
// ==========================================
// 职责: 验证偏好优先、最小负载、容量过滤、无工位失败
// ==========================================


#[cfg(test)]
mod bay_selection_test {
    use smart_conveyor::api::ApiError;
    use smart_conveyor::domain::item_type::catalog;
    use smart_conveyor::domain::Bay;
    use smart_conveyor::engine::{BayRegistry, ConveyorError, ItemLifecycle};
    use smart_conveyor::repository::{ItemRepository, SqliteStateStore, TxContext};

    use crate::test_helpers::{create_test_db, fixed_start, item_json, TestHarness};

    // ==========================================
    // 测试辅助函数
    // ==========================================

    fn bay(id: &str, capacity: i64, load: i64, prefers_oven: bool) -> Bay {
        let mut bay = Bay::new(id, capacity, 1, fixed_start());
        bay.load = load;
        if prefers_oven {
            bay.add_preference(catalog::oven());
        } else {
            bay.add_preference(catalog::dryer());
        }
        bay
    }

    async fn seed_store(bays: Vec<Bay>) -> (tempfile::NamedTempFile, SqliteStateStore) {
        let (temp_file, db_path) = create_test_db().unwrap();
        let store = SqliteStateStore::new(&db_path).unwrap();
        let registry = BayRegistry::new();

        let mut tx = TxContext::new(&store);
        for bay in &bays {
            registry.save(&mut tx, bay).unwrap();
        }
        tx.commit().await.unwrap();
        (temp_file, store)
    }

    // ==========================================
    // 测试用例
    // ==========================================

    #[tokio::test]
    async fn test_preferred_bay_wins_over_emptier_fallback() {
        let (_tmp, store) = seed_store(vec![
            bay("A", 10, 0, false),
            bay("B", 10, 6, true),
        ])
        .await;

        let registry = BayRegistry::new();
        let mut tx = TxContext::new(&store);
        let selected = registry
            .select_bay(&mut tx, &catalog::oven())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(selected.id, "B");
    }

    #[tokio::test]
    async fn test_least_loaded_preferred_bay_wins() {
        let (_tmp, store) = seed_store(vec![
            bay("A", 10, 5, true),
            bay("B", 10, 2, true),
        ])
        .await;

        let registry = BayRegistry::new();
        let mut tx = TxContext::new(&store);
        let candidates = registry
            .list_enabled_candidates(&mut tx, &catalog::oven())
            .await
            .unwrap();
        assert_eq!(candidates.compatible.len(), 2);
        assert!(candidates.fallback.is_empty());

        let selected = registry
            .select_bay(&mut tx, &catalog::oven())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(selected.id, "B");
        assert_eq!(selected.load, 2);
    }

    #[tokio::test]
    async fn test_full_preferred_bay_is_never_selected() {
        let (_tmp, store) = seed_store(vec![
            bay("A", 4, 4, true),
            bay("B", 10, 9, false),
        ])
        .await;

        let registry = BayRegistry::new();
        let mut tx = TxContext::new(&store);
        let selected = registry
            .select_bay(&mut tx, &catalog::oven())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(selected.id, "B");
    }

    #[tokio::test]
    async fn test_no_bay_available_leaves_state_untouched() {
        let mut disabled = bay("B", 10, 0, true);
        disabled.enabled = false;
        let (_tmp, store) = seed_store(vec![bay("A", 2, 2, true), disabled]).await;

        // 类型目录
        let mut tx = TxContext::new(&store);
        smart_conveyor::repository::ItemTypeRepository::new()
            .save(&mut tx, &catalog::oven())
            .unwrap();
        tx.commit().await.unwrap();

        let lifecycle = ItemLifecycle::new(BayRegistry::new());
        let mut tx = TxContext::new(&store);
        let err = lifecycle.store(&mut tx, "I1", "1").await.unwrap_err();
        assert!(matches!(err, ConveyorError::NoBayAvailable { .. }));
        assert!(!tx.has_pending_writes());

        let mut tx = TxContext::new(&store);
        let bays = BayRegistry::new().list_all(&mut tx).await.unwrap();
        assert_eq!(bays[0].load, 2);
        assert_eq!(bays[1].load, 0);
        assert!(ItemRepository::new()
            .find_by_id(&mut tx, "I1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_all_bays_full_rejects_store_through_api() {
        let harness = TestHarness::seeded().await;
        for bay in harness.api.get_bays().await.unwrap() {
            let mut full = bay.clone();
            full.capacity = 0;
            harness
                .api
                .edit_bay(&serde_json::to_string(&full).unwrap())
                .await
                .unwrap();
        }
        harness.publisher.clear();

        let err = harness
            .api
            .store_item(&item_json("I1", "1", "Oven"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NoBayAvailable(_)));
        assert!(harness.publisher.topics().is_empty());
        assert!(harness.api.get_item_by_id("I1").await.is_err());
    }
}
