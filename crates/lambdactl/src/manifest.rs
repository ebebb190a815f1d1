//! Declared objects on disk.
//!
//! Every `*.json` file under the manifest directory holds one object or an
//! array of objects shaped `{kind, metadata, spec, status}`. Lambda kinds
//! are reconciled; anything else (roles, buckets, secrets...) is only
//! there to be referenced.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use eyre::WrapErr;
use lambdactl_core::{ObjectMeta, ResourceKind};
use lambdactl_reconciler::{Declared, StatusStore};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

impl Manifest {
    pub fn document(&self) -> Value {
        let mut doc = self.rest.clone();
        doc.insert("kind".into(), Value::String(self.kind.clone()));
        // Serializing a derived record with string keys cannot fail.
        doc.insert(
            "metadata".into(),
            serde_json::to_value(&self.metadata).unwrap_or(Value::Null),
        );
        Value::Object(doc)
    }
}

#[derive(Debug, Default)]
pub struct Loaded {
    /// Lambda objects, with the last persisted status laid over them.
    pub declared: Vec<Declared>,
    /// Everything else, keyed by kind as written.
    pub others: Vec<Manifest>,
}

/// Read every manifest under `dir`, in file name order.
pub async fn load(dir: &Path, store: &dyn StatusStore) -> eyre::Result<Loaded> {
    let mut loaded = Loaded::default();
    for path in json_files(dir)? {
        let contents = std::fs::read_to_string(&path)
            .wrap_err_with(|| format!("failed to read manifest {}", path.display()))?;
        let value: Value = serde_json::from_str(&contents)
            .wrap_err_with(|| format!("invalid JSON in {}", path.display()))?;
        let items = match value {
            Value::Array(items) => items,
            single => vec![single],
        };
        for item in items {
            let manifest: Manifest = serde_json::from_value(item)
                .wrap_err_with(|| format!("malformed object in {}", path.display()))?;
            match ResourceKind::from_str(&manifest.kind) {
                Ok(kind) => {
                    let document = with_status(kind, &manifest, store).await?;
                    loaded.declared.push(Declared { kind, document });
                }
                Err(_) => loaded.others.push(manifest),
            }
        }
        tracing::debug!(path = %path.display(), "manifest loaded");
    }
    tracing::info!(
        declared = loaded.declared.len(),
        others = loaded.others.len(),
        dir = %dir.display(),
        "manifests loaded"
    );
    Ok(loaded)
}

/// The user owns the spec; the status comes from the last pass.
async fn with_status(kind: ResourceKind, manifest: &Manifest, store: &dyn StatusStore) -> eyre::Result<Value> {
    let mut document = manifest.document();
    let persisted = store
        .load(kind, &manifest.metadata)
        .await
        .wrap_err_with(|| format!("failed to load status for {kind} {}", manifest.metadata.name))?;
    if let (Some(status), Value::Object(doc)) = (persisted.and_then(|r| r.get("status").cloned()), &mut document) {
        doc.insert("status".into(), status);
    }
    Ok(document)
}

fn json_files(dir: &Path) -> eyre::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .wrap_err_with(|| format!("failed to list manifest directory {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
