use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Session expired: session_id={session_id}, expired_at={expired_at}")]
    SessionExpired { session_id: Uuid, expired_at: u64 },

    #[error("Session {session_id} does not belong to user {user_id}")]
    SessionOwnerMismatch { session_id: Uuid, user_id: Uuid },

    #[error("Storage error: {0}")]
    Storage(#[from] ztna_storage::StorageError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
