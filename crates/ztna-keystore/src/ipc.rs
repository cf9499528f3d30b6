//! Signer subprocess contract.
//!
//! A signer is any executable invoked as `<command> <op>`:
//!
//! | op           | stdin        | stdout on success            |
//! |--------------|--------------|------------------------------|
//! | `ensure`     | -            | [`EnsureOutput`] JSON        |
//! | `status`     | -            | [`KeyStatus`] JSON           |
//! | `public-key` | -            | public key, hex              |
//! | `sign`       | payload, hex | signature, base64            |
//! | `delete`     | -            | [`DeleteOutput`] JSON        |
//!
//! Exit code [`EXIT_OK`] means success, [`EXIT_KEY_ABSENT`] means no key is
//! provisioned, anything else is a hard failure with a message on stderr.

use crate::{
    errors::KeyStoreError,
    traits::{KeyStatus, KeyStore},
};
use serde::{Deserialize, Serialize};
use ztna_crypto::encode_base64;

/// Success
pub const EXIT_OK: i32 = 0;

/// Hard failure
pub const EXIT_FAILURE: i32 = 1;

/// No key provisioned
pub const EXIT_KEY_ABSENT: i32 = 3;

/// Signer operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerOp {
    Ensure,
    Status,
    PublicKey,
    Sign,
    Delete,
}

impl SignerOp {
    /// Command-line spelling
    pub fn as_arg(&self) -> &'static str {
        match self {
            SignerOp::Ensure => "ensure",
            SignerOp::Status => "status",
            SignerOp::PublicKey => "public-key",
            SignerOp::Sign => "sign",
            SignerOp::Delete => "delete",
        }
    }
}

/// Output of `ensure`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsureOutput {
    pub container: String,
    /// Hex public key
    pub public_key: String,
    pub created: bool,
}

/// Output of `delete`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOutput {
    pub deleted: bool,
}

/// Result of serving one signer operation: exit code plus the text for stdout
/// (on success) or stderr (on failure)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerReply {
    pub exit_code: i32,
    pub output: String,
}

impl SignerReply {
    fn ok(output: String) -> Self {
        Self {
            exit_code: EXIT_OK,
            output,
        }
    }

    fn from_error(error: &KeyStoreError) -> Self {
        let exit_code = match error {
            KeyStoreError::KeyNotFound => EXIT_KEY_ABSENT,
            _ => EXIT_FAILURE,
        };
        Self {
            exit_code,
            output: error.to_string(),
        }
    }
}

/// Serve one signer operation against a local key store.
///
/// `input` is the raw stdin content; only `sign` reads it.
pub async fn serve(store: &dyn KeyStore, op: SignerOp, input: &str) -> SignerReply {
    match serve_inner(store, op, input).await {
        Ok(output) => SignerReply::ok(output),
        Err(e) => SignerReply::from_error(&e),
    }
}

async fn serve_inner(
    store: &dyn KeyStore,
    op: SignerOp,
    input: &str,
) -> Result<String, KeyStoreError> {
    match op {
        SignerOp::Ensure => {
            let handle = store.ensure_key_exists().await?;
            to_json(&EnsureOutput {
                container: handle.container,
                public_key: hex::encode(handle.public_key),
                created: handle.created,
            })
        }
        SignerOp::Status => to_json(&store.status().await?),
        SignerOp::PublicKey => Ok(hex::encode(store.public_key().await?)),
        SignerOp::Sign => {
            let payload = hex::decode(input.trim()).map_err(|e| {
                KeyStoreError::SigningUnavailable(format!("payload is not hex: {e}"))
            })?;
            Ok(encode_base64(&store.sign(&payload).await?))
        }
        SignerOp::Delete => to_json(&DeleteOutput {
            deleted: store.delete().await?,
        }),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, KeyStoreError> {
    serde_json::to_string(value).map_err(|e| KeyStoreError::SigningUnavailable(e.to_string()))
}

/// Parse a `status` reply
pub(crate) fn parse_status(output: &str) -> Result<KeyStatus, KeyStoreError> {
    serde_json::from_str(output.trim())
        .map_err(|e| KeyStoreError::SigningUnavailable(format!("bad status reply: {e}")))
}
