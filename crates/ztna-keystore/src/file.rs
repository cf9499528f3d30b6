//! File-backed key container.
//!
//! The Ed25519 seed is sealed with XChaCha20-Poly1305 under a KEK derived with
//! Argon2id from the container name and the machine's hardware fingerprint.
//! Copying the container to another machine yields files that cannot be
//! opened there.
//!
//! Layout inside the state directory:
//! - `<container>.salt` - 32 random bytes (Argon2id salt)
//! - `<container>.key`  - JSON: public key, nonce and ciphertext (hex)

use crate::{
    errors::{KeyStoreError, Result},
    traits::{KeyHandle, KeyStatus, KeyStore},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;
use ztna_crypto::{
    derive_kek, generate_random_bytes, open_secret, seal_secret, sign_message, CryptoError,
    DeviceSigningKey, SealedSecret, DOMAIN_KEY_CONTAINER_AAD, KEK_SALT_SIZE, KEY_CONTAINER_NAME,
    PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE, SIGNATURE_SIZE,
};

const CONTAINER_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct StoredContainer {
    version: u8,
    public_key: String,
    nonce: String,
    ciphertext: String,
}

/// Paths and secrets needed by the blocking helpers
#[derive(Clone)]
struct ContainerFiles {
    dir: PathBuf,
    container: String,
    binding: Zeroizing<Vec<u8>>,
}

/// Key store that keeps a sealed key container in a protected directory
pub struct FileKeyStore {
    files: ContainerFiles,
    unsealed: Mutex<Option<DeviceSigningKey>>,
}

impl FileKeyStore {
    /// Key store under the well-known container name
    ///
    /// # Arguments
    ///
    /// * `dir` - Protected state directory (created 0700 on first provision)
    /// * `fingerprint_hash` - Hardware fingerprint the container is bound to
    pub fn new(dir: impl Into<PathBuf>, fingerprint_hash: &str) -> Self {
        Self::with_container(dir, KEY_CONTAINER_NAME, fingerprint_hash)
    }

    /// Key store with an explicit container name
    pub fn with_container(
        dir: impl Into<PathBuf>,
        container: &str,
        fingerprint_hash: &str,
    ) -> Self {
        let binding = Zeroizing::new(format!("{container}:{fingerprint_hash}").into_bytes());
        Self {
            files: ContainerFiles {
                dir: dir.into(),
                container: container.to_string(),
                binding,
            },
            unsealed: Mutex::new(None),
        }
    }

    /// Path of the sealed key file
    pub fn key_path(&self) -> PathBuf {
        self.files.key_path()
    }

    /// Load the key into the cache slot if it is not there yet
    async fn load_cached<'a>(
        &self,
        slot: &'a mut Option<DeviceSigningKey>,
    ) -> Result<Option<&'a DeviceSigningKey>> {
        if slot.is_none() {
            let files = self.files.clone();
            *slot = run_blocking(move || files.load()).await?;
        }
        Ok(slot.as_ref())
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn ensure_key_exists(&self) -> Result<KeyHandle> {
        let mut slot = self.unsealed.lock().await;

        if let Some(key) = self.load_cached(&mut slot).await? {
            return Ok(KeyHandle {
                container: self.files.container.clone(),
                public_key: key.public_key_bytes(),
                created: false,
            });
        }

        let files = self.files.clone();
        let key = run_blocking(move || files.provision()).await?;
        let public_key = key.public_key_bytes();
        *slot = Some(key);

        info!(
            container = %self.files.container,
            public_key = %hex::encode(public_key),
            "Provisioned device key"
        );

        Ok(KeyHandle {
            container: self.files.container.clone(),
            public_key,
            created: true,
        })
    }

    async fn sign(&self, payload: &[u8]) -> Result<[u8; SIGNATURE_SIZE]> {
        let mut slot = self.unsealed.lock().await;
        let key = self
            .load_cached(&mut slot)
            .await?
            .ok_or(KeyStoreError::KeyNotFound)?;
        Ok(sign_message(key, payload))
    }

    async fn public_key(&self) -> Result<[u8; PUBLIC_KEY_SIZE]> {
        let mut slot = self.unsealed.lock().await;
        let key = self
            .load_cached(&mut slot)
            .await?
            .ok_or(KeyStoreError::KeyNotFound)?;
        Ok(key.public_key_bytes())
    }

    async fn status(&self) -> Result<KeyStatus> {
        if self.unsealed.lock().await.is_some() {
            return Ok(KeyStatus { exists: true });
        }
        let exists = tokio::fs::try_exists(self.files.key_path()).await?;
        Ok(KeyStatus { exists })
    }

    async fn delete(&self) -> Result<bool> {
        let mut slot = self.unsealed.lock().await;
        *slot = None;

        let existed = remove_if_exists(&self.files.key_path())?;
        remove_if_exists(&self.files.salt_path())?;

        if existed {
            warn!(container = %self.files.container, "Device key container deleted");
        }
        Ok(existed)
    }
}

impl ContainerFiles {
    fn key_path(&self) -> PathBuf {
        self.dir.join(format!("{}.key", self.container))
    }

    fn salt_path(&self) -> PathBuf {
        self.dir.join(format!("{}.salt", self.container))
    }

    fn aad(&self) -> Vec<u8> {
        let mut aad = DOMAIN_KEY_CONTAINER_AAD.as_bytes().to_vec();
        aad.extend_from_slice(self.container.as_bytes());
        aad
    }

    fn load(&self) -> Result<Option<DeviceSigningKey>> {
        let json = match fs::read_to_string(self.key_path()) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredContainer = serde_json::from_str(&json)
            .map_err(|e| KeyStoreError::Corrupted(format!("container: {e}")))?;
        if stored.version != CONTAINER_VERSION {
            return Err(KeyStoreError::Corrupted(format!(
                "unsupported container version {}",
                stored.version
            )));
        }

        let salt = fs::read(self.salt_path())
            .map_err(|e| KeyStoreError::Corrupted(format!("salt: {e}")))?;
        let sealed = SealedSecret {
            nonce: decode_hex(&stored.nonce)?,
            ciphertext: decode_hex(&stored.ciphertext)?,
        };

        let kek = derive_kek(&self.binding, &salt)?;
        let seed = open_secret(&kek, &sealed, &self.aad()).map_err(|e| match e {
            CryptoError::DecryptionFailed(_) => KeyStoreError::SigningUnavailable(
                "key container cannot be unsealed on this hardware".to_string(),
            ),
            other => other.into(),
        })?;

        let seed: Zeroizing<[u8; PRIVATE_KEY_SIZE]> = Zeroizing::new(
            seed.as_slice()
                .try_into()
                .map_err(|_| KeyStoreError::Corrupted("seed length".to_string()))?,
        );
        let key = DeviceSigningKey::from_seed(&seed);

        if hex::encode(key.public_key_bytes()) != stored.public_key {
            return Err(KeyStoreError::Corrupted(
                "public key does not match sealed seed".to_string(),
            ));
        }

        debug!(container = %self.container, "Unsealed device key");
        Ok(Some(key))
    }

    fn provision(&self) -> Result<DeviceSigningKey> {
        create_private_dir(&self.dir)?;

        let salt = generate_random_bytes::<KEK_SALT_SIZE>()?;
        let kek = derive_kek(&self.binding, &salt)?;
        let key = DeviceSigningKey::generate()?;
        let sealed = seal_secret(&kek, key.seed().as_slice(), &self.aad())?;

        let stored = StoredContainer {
            version: CONTAINER_VERSION,
            public_key: hex::encode(key.public_key_bytes()),
            nonce: hex::encode(&sealed.nonce),
            ciphertext: hex::encode(&sealed.ciphertext),
        };
        let json = serde_json::to_vec_pretty(&stored)
            .map_err(|e| KeyStoreError::Corrupted(e.to_string()))?;

        write_private(&self.salt_path(), &salt)?;
        write_private(&self.key_path(), &json)?;

        Ok(key)
    }
}

fn decode_hex(value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|e| KeyStoreError::Corrupted(e.to_string()))
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| KeyStoreError::SigningUnavailable(format!("key store task failed: {e}")))?
}

/// Create a directory readable only by its owner
pub fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

/// Write a file with 0600 permissions, replacing any previous file atomically
pub fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let tmp = path.with_extension("tmp");
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&tmp)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
    }
    fs::rename(&tmp, path)
}

/// Remove a file; `Ok(false)` if it was not there
pub fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
