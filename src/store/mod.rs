//! Storage of MV grid definitions.
//!
//! Grids are stored as one file per grid, `ding0_grids__<id>.pkl`, in a single
//! directory. The files are opaque to this crate; only the analysis engine
//! reads them.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::domain::{TargetDefinition, TargetId};

const FILE_PREFIX: &str = "ding0_grids__";
const FILE_SUFFIX: &str = ".pkl";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot read grid storage at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Every grid available at the storage location, ascending by id
    async fn discover(&self) -> Result<Vec<TargetId>, StoreError>;

    /// Definition of one grid, `None` if it is not stored
    async fn locate(&self, target_id: TargetId) -> Result<Option<TargetDefinition>, StoreError>;
}

/// Grid files in a local directory
#[derive(Debug, Clone)]
pub struct FileTargetStore {
    base_dir: PathBuf,
}

impl FileTargetStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn path_for(&self, target_id: TargetId) -> PathBuf {
        self.base_dir
            .join(format!("{FILE_PREFIX}{}{FILE_SUFFIX}", target_id))
    }

    fn parse_file_name(name: &str) -> Option<TargetId> {
        name.strip_prefix(FILE_PREFIX)?
            .strip_suffix(FILE_SUFFIX)?
            .parse()
            .ok()
    }
}

#[async_trait]
impl TargetStore for FileTargetStore {
    async fn discover(&self) -> Result<Vec<TargetId>, StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.base_dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.base_dir).await.map_err(io_err)?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let name = entry.file_name();
            match name.to_str().and_then(Self::parse_file_name) {
                Some(id) => ids.push(id),
                None => debug!(file = ?name, "skipping non-grid file"),
            }
        }
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn locate(&self, target_id: TargetId) -> Result<Option<TargetDefinition>, StoreError> {
        let path = self.path_for(target_id);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(TargetDefinition { target_id, path })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}
