//! Pre-shared key storage.
//!
//! Two 32-byte keys live side by side in the key partition: the key this
//! target sends to prove its own identity (`local_key`), and the key it
//! expects the loader to present (`peer_expected_key`). Both round-trip
//! through flat files rather than a structured format - the partition is
//! small, dedicated, and never holds anything else.

use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{CryptoError, Result};

/// Size in bytes of each stored key.
pub const KEY_SIZE: usize = 32;

/// Default mount point of the key partition.
pub const DEFAULT_KEYS_MOUNT_POINT: &str = "/keys";

const LOCAL_KEY_FILE: &str = "bc_key.bin";
const PEER_KEY_FILE: &str = "gse_key.bin";

/// Compiled-in initial key material, written once when the partition has
/// never been provisioned. Real deployments overwrite these at manufacture
/// time; they exist so a freshly formatted partition is never left without
/// keys at all.
const STATIC_LOCAL_KEY: &[u8; KEY_SIZE] = b"BC_SECRET_KEY_32_BYTES_EXACTLY!!";
const STATIC_PEER_EXPECTED_KEY: &[u8; KEY_SIZE] = b"GSE_SECRET_KEY_32_BYTES_EXACTLY!";

/// The two keys held in memory during a handshake.
///
/// Zeroized on drop, and `clear` zeroizes explicitly so a caller can wipe
/// the buffer the instant authentication concludes rather than waiting on
/// scope exit.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct AuthKeys {
    /// Key this target presents to the loader to prove its own identity.
    pub local_key: [u8; KEY_SIZE],
    /// Key this target expects the loader to present.
    pub peer_expected_key: [u8; KEY_SIZE],
}

impl AuthKeys {
    /// Overwrite both keys with zero bytes.
    pub fn clear(&mut self) {
        self.zeroize();
    }
}

/// Key partition mounted at a fixed path holding two 32-byte files.
pub struct KeyStore {
    root: PathBuf,
}

impl KeyStore {
    /// Open a key store rooted at `root` (typically [`DEFAULT_KEYS_MOUNT_POINT`]).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn local_key_path(&self) -> PathBuf {
        self.root.join(LOCAL_KEY_FILE)
    }

    fn peer_key_path(&self) -> PathBuf {
        self.root.join(PEER_KEY_FILE)
    }

    /// Idempotently provision the compiled-in static keys if the partition
    /// does not already hold key files.
    ///
    /// # Errors
    ///
    /// [`CryptoError::FileOpen`] if either file cannot be created or
    /// written.
    pub fn write_static_keys(&self) -> Result<()> {
        if self.root.join(LOCAL_KEY_FILE).exists() && self.root.join(PEER_KEY_FILE).exists() {
            return Ok(());
        }
        write_key_file(&self.local_key_path(), STATIC_LOCAL_KEY)?;
        write_key_file(&self.peer_key_path(), STATIC_PEER_EXPECTED_KEY)?;
        Ok(())
    }

    /// Load both keys from the partition.
    ///
    /// # Errors
    ///
    /// [`CryptoError::FileOpen`] if a key file cannot be opened, or
    /// [`CryptoError::ShortRead`] if a key file does not contain exactly
    /// [`KEY_SIZE`] bytes.
    pub fn load_keys(&self) -> Result<AuthKeys> {
        let local_key = read_key_file(&self.local_key_path())?;
        let peer_expected_key = read_key_file(&self.peer_key_path())?;
        Ok(AuthKeys { local_key, peer_expected_key })
    }
}

fn write_key_file(path: &Path, key: &[u8; KEY_SIZE]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| CryptoError::FileOpen { path: path.display().to_string(), source })?;
    }
    let mut file = fs::File::create(path)
        .map_err(|source| CryptoError::FileOpen { path: path.display().to_string(), source })?;
    file.write_all(key)
        .map_err(|source| CryptoError::FileOpen { path: path.display().to_string(), source })?;
    Ok(())
}

fn read_key_file(path: &Path) -> Result<[u8; KEY_SIZE]> {
    let mut file = fs::File::open(path)
        .map_err(|source| CryptoError::FileOpen { path: path.display().to_string(), source })?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)
        .map_err(|source| CryptoError::FileOpen { path: path.display().to_string(), source })?;
    let actual = buf.len();
    buf.try_into().map_err(|_| CryptoError::ShortRead { path: path.display().to_string(), actual })
}
