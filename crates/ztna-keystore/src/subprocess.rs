//! Key store backed by a separate signer process.

use crate::{
    errors::{KeyStoreError, Result},
    ipc::{self, DeleteOutput, EnsureOutput, SignerOp, EXIT_KEY_ABSENT, EXIT_OK},
    traits::{KeyHandle, KeyStatus, KeyStore},
};
use async_trait::async_trait;
use std::{path::PathBuf, process::Stdio, time::Duration};
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, warn};
use ztna_crypto::{decode_base64, parse_public_key, PUBLIC_KEY_SIZE, SIGNATURE_SIZE};

/// Client side of the signer contract in [`crate::ipc`]
#[derive(Debug, Clone)]
pub struct SubprocessKeyStore {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl SubprocessKeyStore {
    /// Signer invoked as `program args... <op>`
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Build from a whitespace separated command line such as
    /// `/usr/bin/ztna-agent signer`
    pub fn from_command_line(command: &str, timeout: Duration) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| {
            KeyStoreError::SigningUnavailable("empty signer command".to_string())
        })?;
        Ok(Self::new(program, parts.collect(), timeout))
    }

    async fn invoke(&self, op: SignerOp, input: Option<String>) -> Result<String> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(op.as_arg())
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            KeyStoreError::SigningUnavailable(format!(
                "failed to start signer {}: {e}",
                self.program.display()
            ))
        })?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| KeyStoreError::SigningUnavailable(format!("signer stdin: {e}")))?;
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                warn!(op = op.as_arg(), "Signer timed out");
                KeyStoreError::SigningUnavailable("signer timed out".to_string())
            })?
            .map_err(|e| KeyStoreError::SigningUnavailable(format!("signer failed: {e}")))?;

        debug!(op = op.as_arg(), code = ?output.status.code(), "Signer finished");

        match output.status.code() {
            Some(EXIT_OK) => Ok(String::from_utf8_lossy(&output.stdout).trim().to_string()),
            Some(EXIT_KEY_ABSENT) => Err(KeyStoreError::KeyNotFound),
            code => Err(KeyStoreError::SigningUnavailable(format!(
                "signer exited with {:?}: {}",
                code,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }
}

fn bad_reply(what: &str, e: impl std::fmt::Display) -> KeyStoreError {
    KeyStoreError::SigningUnavailable(format!("bad {what} reply: {e}"))
}

fn parse_hex_key(value: &str) -> Result<[u8; PUBLIC_KEY_SIZE]> {
    let bytes = hex::decode(value.trim()).map_err(|e| bad_reply("public key", e))?;
    Ok(parse_public_key(&bytes)?)
}

#[async_trait]
impl KeyStore for SubprocessKeyStore {
    async fn ensure_key_exists(&self) -> Result<KeyHandle> {
        let output = self.invoke(SignerOp::Ensure, None).await?;
        let ensured: EnsureOutput =
            serde_json::from_str(&output).map_err(|e| bad_reply("ensure", e))?;
        Ok(KeyHandle {
            container: ensured.container,
            public_key: parse_hex_key(&ensured.public_key)?,
            created: ensured.created,
        })
    }

    async fn sign(&self, payload: &[u8]) -> Result<[u8; SIGNATURE_SIZE]> {
        let output = self
            .invoke(SignerOp::Sign, Some(hex::encode(payload)))
            .await?;
        let signature = decode_base64(&output)?;
        signature
            .as_slice()
            .try_into()
            .map_err(|_| bad_reply("sign", format!("{} byte signature", signature.len())))
    }

    async fn public_key(&self) -> Result<[u8; PUBLIC_KEY_SIZE]> {
        let output = self.invoke(SignerOp::PublicKey, None).await?;
        parse_hex_key(&output)
    }

    async fn status(&self) -> Result<KeyStatus> {
        let output = self.invoke(SignerOp::Status, None).await?;
        ipc::parse_status(&output)
    }

    async fn delete(&self) -> Result<bool> {
        let output = self.invoke(SignerOp::Delete, None).await?;
        let deleted: DeleteOutput =
            serde_json::from_str(&output).map_err(|e| bad_reply("delete", e))?;
        Ok(deleted.deleted)
    }
}
