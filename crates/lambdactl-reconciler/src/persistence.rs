use std::path::{Path, PathBuf};

use lambdactl_core::{ObjectMeta, ResourceKind};
use serde_json::Value;

use crate::error::ReconcileError;
use crate::manager::BoxFuture;

/// Where the outcome of each pass is written back: the persisted spec,
/// the observed status and the condition list.
pub trait StatusStore: Send + Sync {
    fn load<'a>(
        &'a self,
        kind: ResourceKind,
        meta: &'a ObjectMeta,
    ) -> BoxFuture<'a, Result<Option<Value>, ReconcileError>>;

    fn save<'a>(
        &'a self,
        kind: ResourceKind,
        meta: &'a ObjectMeta,
        record: &'a Value,
    ) -> BoxFuture<'a, Result<(), ReconcileError>>;

    /// Forget an object whose remote counterpart is gone.
    fn remove<'a>(&'a self, kind: ResourceKind, meta: &'a ObjectMeta) -> BoxFuture<'a, Result<(), ReconcileError>>;
}

/// One JSON file per object under `<root>/<kind>/<namespace>/<name>.json`.
pub struct FileStatusStore {
    root: PathBuf,
}

impl FileStatusStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, kind: ResourceKind, meta: &ObjectMeta) -> PathBuf {
        self.root
            .join(kind.as_str())
            .join(&meta.namespace)
            .join(format!("{}.json", meta.name))
    }

    fn read_record(path: &Path) -> Result<Option<Value>, ReconcileError> {
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read(path)?;
        let record = serde_json::from_slice(&json)?;
        tracing::debug!(path = %path.display(), "status loaded");
        Ok(Some(record))
    }

    /// Atomic write: tmp file + rename.
    fn write_record(path: &Path, record: &Value) -> Result<(), ReconcileError> {
        let json = serde_json::to_vec_pretty(record)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, path)?;
        tracing::debug!(path = %path.display(), "status flushed to disk");
        Ok(())
    }
}

impl StatusStore for FileStatusStore {
    fn load<'a>(
        &'a self,
        kind: ResourceKind,
        meta: &'a ObjectMeta,
    ) -> BoxFuture<'a, Result<Option<Value>, ReconcileError>> {
        let path = self.path_for(kind, meta);
        Box::pin(async move { Self::read_record(&path) })
    }

    fn save<'a>(
        &'a self,
        kind: ResourceKind,
        meta: &'a ObjectMeta,
        record: &'a Value,
    ) -> BoxFuture<'a, Result<(), ReconcileError>> {
        let path = self.path_for(kind, meta);
        Box::pin(async move {
            Self::write_record(&path, record)
                .map_err(|e| ReconcileError::Persistence(format!("{}: {e}", path.display())))
        })
    }

    fn remove<'a>(&'a self, kind: ResourceKind, meta: &'a ObjectMeta) -> BoxFuture<'a, Result<(), ReconcileError>> {
        let path = self.path_for(kind, meta);
        Box::pin(async move {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "status removed");
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(ReconcileError::Persistence(format!("{}: {e}", path.display()))),
            }
        })
    }
}
