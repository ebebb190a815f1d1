//! Reference lookups for the runner: Lambda kinds come from the status
//! store so a function synced earlier in the run is visible to the objects
//! that point at it, everything else from the loaded manifests.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine;
use lambdactl_core::{Condition, ObjectMeta, ResourceKind};
use lambdactl_reconciler::StatusStore;
use lambdactl_reconciler::manager::BoxFuture;
use lambdactl_reconciler::references::{LookupError, ReferenceReader, ReferencedObject, TargetKind};
use serde_json::Value;

use crate::manifest::Manifest;

type Key = (String, String, String);

pub struct StoreReferences {
    store: Arc<dyn StatusStore>,
    documents: HashMap<Key, Value>,
}

impl StoreReferences {
    pub fn new(store: Arc<dyn StatusStore>, manifests: &[Manifest]) -> Self {
        let documents = manifests
            .iter()
            .map(|m| {
                (
                    (m.kind.clone(), m.metadata.namespace.clone(), m.metadata.name.clone()),
                    m.document(),
                )
            })
            .collect();
        Self { store, documents }
    }
}

fn conditions_of(document: &Value) -> Result<Vec<Condition>, LookupError> {
    match document.pointer("/status/conditions") {
        Some(list) => Ok(serde_json::from_value(list.clone())?),
        None => Ok(Vec::new()),
    }
}

/// `stringData` holds plain values; `data` holds base64.
fn secret_value(document: &Value, key: &str) -> Result<Option<String>, LookupError> {
    if let Some(plain) = document.pointer("/stringData").and_then(|d| d.get(key)).and_then(Value::as_str) {
        return Ok(Some(plain.to_string()));
    }
    let Some(encoded) = document.pointer("/data").and_then(|d| d.get(key)).and_then(Value::as_str) else {
        return Ok(None);
    };
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
    Ok(Some(String::from_utf8(bytes)?))
}

impl ReferenceReader for StoreReferences {
    fn get<'a>(
        &'a self,
        target: &'a TargetKind,
        namespace: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<ReferencedObject>, LookupError>> {
        Box::pin(async move {
            let document = match ResourceKind::from_str(target.kind) {
                Ok(kind) => {
                    let meta = ObjectMeta {
                        name: name.to_string(),
                        namespace: namespace.to_string(),
                        deletion_requested: false,
                    };
                    self.store.load(kind, &meta).await?
                }
                Err(_) => self
                    .documents
                    .get(&(target.kind.to_string(), namespace.to_string(), name.to_string()))
                    .cloned(),
            };
            let Some(document) = document else {
                return Ok(None);
            };
            Ok(Some(ReferencedObject {
                conditions: conditions_of(&document)?,
                document,
            }))
        })
    }

    fn secret<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, LookupError>> {
        Box::pin(async move {
            match self
                .documents
                .get(&("Secret".to_string(), namespace.to_string(), name.to_string()))
            {
                Some(document) => secret_value(document, key),
                None => Ok(None),
            }
        })
    }
}
