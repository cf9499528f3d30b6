//! RocksDB column family definitions.

/// Device records: device_id → DeviceRecord
pub const CF_DEVICES: &str = "devices";

/// Device index: device_unique_id → device_id
pub const CF_DEVICES_BY_UNIQUE_ID: &str = "devices_by_unique_id";

/// Enrollment codes: code → EnrollmentCode
pub const CF_ENROLLMENT_CODES: &str = "enrollment_codes";

/// Posture history: (device_id, report_id) → PostureReport (append-only)
pub const CF_POSTURE_REPORTS: &str = "posture_reports";

/// Latest posture per device: device_id → PostureReport
pub const CF_LATEST_POSTURE: &str = "latest_posture";

/// Challenges: nonce → Challenge (TTL: challenge TTL, single use)
pub const CF_CHALLENGES: &str = "challenges";

/// Sessions: session_id → Session
pub const CF_SESSIONS: &str = "sessions";

/// Sessions by user: (user_id, session_id) → session_id
pub const CF_SESSIONS_BY_USER: &str = "sessions_by_user";

/// Get all column family names
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        CF_DEVICES,
        CF_DEVICES_BY_UNIQUE_ID,
        CF_ENROLLMENT_CODES,
        CF_POSTURE_REPORTS,
        CF_LATEST_POSTURE,
        CF_CHALLENGES,
        CF_SESSIONS,
        CF_SESSIONS_BY_USER,
    ]
}
