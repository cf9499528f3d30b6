use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session of an authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub issued_at: u64,
    /// Invalidated by a newer login or by revocation
    pub expired: bool,
    pub expired_at: Option<u64>,
    /// Explicitly revoked; a revoked session is never made live again
    pub revoked: bool,
}

impl Session {
    pub fn new(session_id: Uuid, user_id: Uuid, issued_at: u64) -> Self {
        Self {
            session_id,
            user_id,
            issued_at,
            expired: false,
            expired_at: None,
            revoked: false,
        }
    }

    pub(crate) fn expire(&mut self, now: u64) {
        self.expired = true;
        self.expired_at = Some(now);
    }

    pub fn is_live(&self) -> bool {
        !self.expired
    }
}
