use crate::{Result, Session};
use async_trait::async_trait;
use uuid::Uuid;

/// Session manager trait
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Create a session for an authenticated user and make it the user's only
    /// live session
    async fn create_session(&self, user_id: Uuid) -> Result<Session>;

    /// Invalidate every other live session of `user_id`.
    ///
    /// Returns the number of sessions invalidated. Serialized per user: of
    /// concurrent calls, the one that runs last wins and its session is the
    /// single survivor.
    async fn enforce_single_session(&self, user_id: Uuid, new_session_id: Uuid) -> Result<usize>;

    /// Get a session, live or not
    async fn get_session(&self, session_id: Uuid) -> Result<Session>;

    /// Get a session, failing unless it is live
    async fn validate_session(&self, session_id: Uuid) -> Result<Session>;

    /// Invalidate a session
    async fn revoke_session(&self, session_id: Uuid) -> Result<()>;

    /// All sessions of a user, oldest first
    async fn list_user_sessions(&self, user_id: Uuid) -> Result<Vec<Session>>;
}
