pub mod access;
pub mod challenge;
pub mod devices;
pub mod enrollment;
pub mod health;
pub mod helpers;
pub mod posture;
pub mod sessions;
