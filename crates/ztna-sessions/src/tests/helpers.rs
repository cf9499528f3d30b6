//! Test helpers for session service tests.

use crate::*;
use std::sync::Arc;
use tempfile::TempDir;
use ztna_storage::RocksDbStorage;

pub type TestService = SessionService<RocksDbStorage>;

/// Helper to create a session service over a fresh database
pub fn create_test_service() -> (Arc<TestService>, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage = RocksDbStorage::open(temp_dir.path()).unwrap();
    (Arc::new(SessionService::new(Arc::new(storage))), temp_dir)
}

/// Number of live sessions a user has
pub async fn live_count(service: &TestService, user_id: uuid::Uuid) -> usize {
    service
        .list_user_sessions(user_id)
        .await
        .unwrap()
        .iter()
        .filter(|s| s.is_live())
        .count()
}
