use anyhow::Result;
use std::sync::Arc;
use ztna_challenge::ChallengeService;
use ztna_devices::{DeviceConfig, DeviceService};
use ztna_policy::{PolicyConfig, PolicyDecisionPoint};
use ztna_sessions::SessionService;
use ztna_storage::RocksDbStorage;

use crate::config::Config;

pub type Devices = DeviceService<RocksDbStorage>;
pub type Challenges = ChallengeService<RocksDbStorage, Devices>;
pub type DecisionPoint = PolicyDecisionPoint<Devices, Challenges>;
pub type Sessions = SessionService<RocksDbStorage>;

/// Application state shared across all handlers
pub struct AppState {
    pub config: Config,
    pub device_service: Arc<Devices>,
    pub challenge_service: Arc<Challenges>,
    pub decision_point: Arc<DecisionPoint>,
    pub session_service: Arc<Sessions>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let storage = Arc::new(RocksDbStorage::open(&config.database_path)?);
        Ok(Self::with_storage(config, storage))
    }

    /// Wire the services over an already opened database
    pub fn with_storage(config: Config, storage: Arc<RocksDbStorage>) -> Self {
        let device_service = Arc::new(DeviceService::new(
            Arc::clone(&storage),
            DeviceConfig {
                auto_approve: config.auto_approve_devices,
                reenrollment: config.reenrollment_policy,
                compliance: config.compliance,
            },
        ));

        let challenge_service = Arc::new(ChallengeService::new(
            Arc::clone(&storage),
            Arc::clone(&device_service),
            config.challenge_ttl_seconds,
        ));

        let decision_point = Arc::new(PolicyDecisionPoint::new(
            Arc::clone(&device_service),
            Arc::clone(&challenge_service),
            PolicyConfig {
                freshness_seconds: config.posture_freshness_seconds,
                allow_step_up: config.allow_step_up,
            },
        ));

        let session_service = Arc::new(SessionService::new(storage));

        AppState {
            config,
            device_service,
            challenge_service,
            decision_point,
            session_service,
        }
    }
}
