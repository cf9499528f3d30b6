//! # ztna-keystore
//!
//! Key custody for the device agent.
//!
//! The device owns exactly one Ed25519 keypair, kept in a protected key
//! container under a fixed well-known name. Callers only ever see signatures
//! and the public key:
//!
//! - [`FileKeyStore`] seals the key seed on disk under a KEK bound to the
//!   machine's hardware fingerprint
//! - [`SubprocessKeyStore`] talks to a separate signer process over the
//!   narrow exit-code contract in [`ipc`]
//! - [`KeyCustody`] wraps either one and serializes all signing

#![warn(clippy::all)]

pub mod custody;
pub mod errors;
pub mod file;
pub mod ipc;
pub mod subprocess;
pub mod traits;

pub use custody::KeyCustody;
pub use errors::{KeyStoreError, Result};
pub use file::{create_private_dir, remove_if_exists, write_private, FileKeyStore};
pub use subprocess::SubprocessKeyStore;
pub use traits::{KeyHandle, KeyStatus, KeyStore};
