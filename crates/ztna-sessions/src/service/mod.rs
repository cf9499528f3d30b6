//! Session manager service implementation.

mod enforcement;
mod lifecycle;

use crate::{errors::*, traits::*, types::*};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;
use ztna_storage::{Storage, CF_SESSIONS};

/// How long an expired session stays in its user's index before
/// enforcement drops the entry
pub const DEFAULT_INDEX_RETENTION_SECONDS: u64 = 86_400;

type UserLocks = StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>;

/// Session manager service implementation
pub struct SessionService<S: Storage> {
    pub(super) storage: Arc<S>,
    /// One lock per user with a write in progress; every write to a user's
    /// sessions holds it
    user_locks: UserLocks,
    pub(super) index_retention_seconds: u64,
}

/// Held user lock. The map entry goes away with the last holder.
pub(super) struct UserLockGuard<'a> {
    locks: &'a UserLocks,
    user_id: Uuid,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Clones are only taken under the map lock: the map plus this guard
        // means nobody else is waiting
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.user_id);
        }
    }
}

impl<S: Storage + 'static> SessionService<S> {
    /// Create a new session service
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            user_locks: StdMutex::new(HashMap::new()),
            index_retention_seconds: DEFAULT_INDEX_RETENTION_SECONDS,
        }
    }

    /// Override how long expired sessions stay indexed under their user
    pub fn with_index_retention(mut self, seconds: u64) -> Self {
        self.index_retention_seconds = seconds;
        self
    }

    pub(super) async fn lock_user(&self, user_id: Uuid) -> UserLockGuard<'_> {
        let lock = {
            let mut locks = self.user_locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(user_id).or_default())
        };
        let guard = Arc::clone(&lock).lock_owned().await;

        UserLockGuard {
            locks: &self.user_locks,
            user_id,
            lock,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_user_locks(&self) -> usize {
        self.user_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub(super) async fn load_session(&self, session_id: Uuid) -> Result<Session> {
        self.storage
            .get(CF_SESSIONS, &session_id)
            .await?
            .ok_or(SessionError::SessionNotFound(session_id))
    }
}

#[async_trait]
impl<S: Storage + 'static> SessionManager for SessionService<S> {
    async fn create_session(&self, user_id: Uuid) -> Result<Session> {
        self.create_session_internal(user_id).await
    }

    async fn enforce_single_session(&self, user_id: Uuid, new_session_id: Uuid) -> Result<usize> {
        let _guard = self.lock_user(user_id).await;
        self.enforce_locked(user_id, new_session_id).await
    }

    async fn get_session(&self, session_id: Uuid) -> Result<Session> {
        self.load_session(session_id).await
    }

    async fn validate_session(&self, session_id: Uuid) -> Result<Session> {
        let session = self.load_session(session_id).await?;
        if session.expired {
            return Err(SessionError::SessionExpired {
                session_id,
                expired_at: session.expired_at.unwrap_or(session.issued_at),
            });
        }
        Ok(session)
    }

    async fn revoke_session(&self, session_id: Uuid) -> Result<()> {
        self.revoke_session_internal(session_id).await
    }

    async fn list_user_sessions(&self, user_id: Uuid) -> Result<Vec<Session>> {
        self.list_user_sessions_internal(user_id).await
    }
}
