use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::serial::SerializedSpace;
use crate::util::write_atomic;

/// Persists [`SerializedSpace`] snapshots to disk using JSON + atomic writes.
/// 以 JSON 搭配原子寫入方式儲存 [`SerializedSpace`] 快照。
#[derive(Debug)]
pub struct SpaceStore {
    path: PathBuf,
}

impl SpaceStore {
    /// Constructs a store bound to the provided path.
    /// 建立綁定至指定路徑的儲存器。
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the backing path used for persistence.
    /// 取得此儲存器使用的檔案路徑。
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads a snapshot from disk, returning `Ok(None)` when the file is
    /// absent.
    /// 從磁碟載入快照；若檔案不存在則回傳 `Ok(None)`。
    pub fn load(&self) -> Result<Option<SerializedSpace>, SpaceStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let space = serde_json::from_str(&contents)
                    .map_err(|err| SpaceStoreError::Invalid(err.to_string()))?;
                Ok(Some(space))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(SpaceStoreError::Io(err)),
        }
    }

    /// Saves the provided snapshot atomically to disk.
    /// 將傳入的快照以原子方式寫入磁碟。
    pub fn save(&self, space: &SerializedSpace) -> Result<(), SpaceStoreError> {
        let payload = serde_json::to_vec_pretty(space)
            .map_err(|err| SpaceStoreError::Invalid(err.to_string()))?;
        write_atomic(&self.path, &payload).map_err(SpaceStoreError::Io)
    }
}

/// Errors emitted by [`SpaceStore`].
/// [`SpaceStore`] 可能拋出的錯誤。
#[derive(Debug, Error)]
pub enum SpaceStoreError {
    #[error("space store IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid space payload: {0}")]
    Invalid(String),
}
