//! Cryptographic constants and domain separation strings.
//!
//! Changing any of the domain strings invalidates every signature and sealed
//! key container produced with the previous value.

/// Size of Ed25519 public keys in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of Ed25519 private key seeds in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Size of Ed25519 signatures in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Size of XChaCha20-Poly1305 nonces in bytes (192 bits)
pub const NONCE_SIZE: usize = 24;

/// Size of XChaCha20-Poly1305 authentication tags in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of salt for Argon2id KEK derivation
pub const KEK_SALT_SIZE: usize = 32;

/// Size of random challenge nonces in bytes
pub const CHALLENGE_NONCE_SIZE: usize = 32;

/// Default challenge lifetime in seconds (5 minutes)
pub const CHALLENGE_TTL_SECONDS: u64 = 300;

/// Well-known name of the device key container
pub const KEY_CONTAINER_NAME: &str = "ztna-device-identity-key";

/// Domain separation for challenge signatures
pub const DOMAIN_CHALLENGE: &str = "ztna:challenge:v1";

/// Domain separation for posture report signatures
pub const DOMAIN_POSTURE_REPORT: &str = "ztna:posture-report:v1";

/// Domain separation for hardware fingerprint hashing
pub const DOMAIN_FINGERPRINT: &str = "ztna:device-fingerprint:v1";

/// Associated data for the sealed key container
pub const DOMAIN_KEY_CONTAINER_AAD: &str = "ztna:key-container:v1";

/// Argon2id parameters used for KEK derivation
pub mod argon2_params {
    /// Memory cost in KiB (64 MiB)
    pub const M_COST: u32 = 65_536;
    /// Iterations
    pub const T_COST: u32 = 3;
    /// Parallelism
    pub const P_COST: u32 = 4;
    /// Output length
    pub const OUTPUT_LEN: usize = 32;
}
