//! Session lifecycle operations: create, list, revoke.

use crate::{errors::*, types::*};
use tracing::info;
use uuid::Uuid;
use ztna_crypto::current_timestamp;
use ztna_storage::{BatchExt, Storage, CF_SESSIONS, CF_SESSIONS_BY_USER};

use super::SessionService;

impl<S: Storage + 'static> SessionService<S> {
    pub(crate) async fn create_session_internal(&self, user_id: Uuid) -> Result<Session> {
        let _guard = self.lock_user(user_id).await;

        let session = Session::new(Uuid::new_v4(), user_id, current_timestamp());

        let mut batch = self.storage.batch();
        batch.put(CF_SESSIONS, &session.session_id, &session)?;
        batch.put(
            CF_SESSIONS_BY_USER,
            &(user_id, session.session_id),
            &session.session_id,
        )?;
        batch.commit().await?;

        // Same critical section as the insert: no other login for this user
        // can slip in between
        let invalidated = self.enforce_locked(user_id, session.session_id).await?;

        info!(
            user_id = %user_id,
            session_id = %session.session_id,
            invalidated,
            "Session created"
        );

        Ok(session)
    }

    /// Raw index keys of a user's sessions, each with the stored session
    pub(super) async fn user_index(&self, user_id: Uuid) -> Result<Vec<(Vec<u8>, Option<Session>)>> {
        let index: Vec<(Vec<u8>, Uuid)> = self
            .storage
            .get_by_prefix(CF_SESSIONS_BY_USER, &user_id)
            .await?;

        let mut entries = Vec::with_capacity(index.len());
        for (key, session_id) in index {
            let session = self.storage.get::<_, Session>(CF_SESSIONS, &session_id).await?;
            entries.push((key, session));
        }
        Ok(entries)
    }

    pub(crate) async fn list_user_sessions_internal(&self, user_id: Uuid) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .user_index(user_id)
            .await?
            .into_iter()
            .filter_map(|(_, session)| session)
            .collect();
        sessions.sort_by_key(|s| s.issued_at);
        Ok(sessions)
    }

    pub(crate) async fn revoke_session_internal(&self, session_id: Uuid) -> Result<()> {
        let user_id = self.load_session(session_id).await?.user_id;
        let _guard = self.lock_user(user_id).await;

        // Reload under the lock
        let mut session = self.load_session(session_id).await?;
        if session.revoked {
            return Ok(());
        }

        if !session.expired {
            session.expire(current_timestamp());
        }
        session.revoked = true;

        // The record stays for lookups; the user index forgets it
        let mut batch = self.storage.batch();
        batch.put(CF_SESSIONS, &session_id, &session)?;
        batch.delete(CF_SESSIONS_BY_USER, &(user_id, session_id))?;
        batch.commit().await?;

        info!(user_id = %user_id, session_id = %session_id, "Session revoked");
        Ok(())
    }
}
