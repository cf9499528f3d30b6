//! # ztna-crypto
//!
//! Cryptographic primitives for the ZTNA control plane.
//!
//! Both halves of the system build on this crate: the device agent uses it to
//! seal its signing key and to sign challenges and posture reports, and the
//! backend uses it to verify those signatures against the enrolled public key.
//!
//! ## Security Properties
//!
//! - Private key material is zeroized on drop
//! - Every signed message carries a domain separation prefix
//! - No unsafe code

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod encryption;
pub mod errors;
pub mod hashing;
pub mod keys;
pub mod signatures;
pub mod utils;

pub use constants::*;
pub use encryption::*;
pub use errors::{CryptoError, Result};
pub use hashing::*;
pub use keys::*;
pub use signatures::*;
pub use utils::*;
