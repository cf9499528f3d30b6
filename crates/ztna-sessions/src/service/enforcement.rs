//! Single-session enforcement.

use crate::{errors::*, types::*};
use tracing::{debug, warn};
use uuid::Uuid;
use ztna_crypto::current_timestamp;
use ztna_storage::{BatchExt, Storage, CF_SESSIONS, CF_SESSIONS_BY_USER};

use super::SessionService;

impl<S: Storage + 'static> SessionService<S> {
    /// Make `new_session_id` the only live session of `user_id`.
    ///
    /// Caller must hold the user's lock. A session that was superseded by an
    /// earlier enforcement is made live again, so the last enforcement always
    /// wins; a revoked session is not. Index entries of revoked sessions,
    /// missing sessions and sessions expired past the retention window are
    /// dropped on the way.
    pub(super) async fn enforce_locked(&self, user_id: Uuid, new_session_id: Uuid) -> Result<usize> {
        let mut survivor = self.load_session(new_session_id).await?;
        if survivor.user_id != user_id {
            return Err(SessionError::SessionOwnerMismatch {
                session_id: new_session_id,
                user_id,
            });
        }
        if survivor.revoked {
            return Err(SessionError::SessionExpired {
                session_id: new_session_id,
                expired_at: survivor.expired_at.unwrap_or(survivor.issued_at),
            });
        }

        let now = current_timestamp();
        let mut batch = self.storage.batch();
        let mut invalidated = 0;
        let mut pruned = 0;

        for (key, session) in self.user_index(user_id).await? {
            let Some(mut session) = session else {
                batch.delete_raw(CF_SESSIONS_BY_USER, key)?;
                pruned += 1;
                continue;
            };
            if session.session_id == new_session_id {
                continue;
            }
            if session.is_live() {
                session.expire(now);
                batch.put(CF_SESSIONS, &session.session_id, &session)?;
                invalidated += 1;
            } else if self.past_retention(&session, now) {
                batch.delete_raw(CF_SESSIONS_BY_USER, key)?;
                pruned += 1;
            }
        }

        if survivor.expired {
            warn!(
                user_id = %user_id,
                session_id = %new_session_id,
                "Reviving superseded session on enforcement"
            );
            survivor.expired = false;
            survivor.expired_at = None;
            batch.put(CF_SESSIONS, &new_session_id, &survivor)?;
            // Its index entry may already have been pruned
            batch.put(CF_SESSIONS_BY_USER, &(user_id, new_session_id), &new_session_id)?;
        }

        batch.commit().await?;

        if invalidated > 0 || pruned > 0 {
            debug!(
                user_id = %user_id,
                session_id = %new_session_id,
                invalidated,
                pruned,
                "Invalidated other sessions"
            );
        }
        Ok(invalidated)
    }

    fn past_retention(&self, session: &Session, now: u64) -> bool {
        session.revoked
            || session
                .expired_at
                .is_some_and(|at| now >= at.saturating_add(self.index_retention_seconds))
    }
}
