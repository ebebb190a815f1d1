//! Layer versions. A published layer version cannot be changed; a new one
//! is published under the same layer name instead.

use std::sync::Arc;

use lambdactl_core::ResourceKind;
use lambdactl_core::models::layer_version::{LayerVersion, LayerVersionSpec, LayerVersionStatus};
use tokio_util::sync::CancellationToken;

use crate::api::{LambdaApi, absent_on};
use crate::config::Timing;
use crate::delta::{Delta, DeltaPolicy, Structural};
use crate::error::{ReconcileError, codes};
use crate::manager::{BoxFuture, ResourceManager, merge_remote};
use crate::resources::classify_api_error;

pub struct LayerVersionManager {
    api: Arc<dyn LambdaApi>,
    timing: Timing,
}

impl LayerVersionManager {
    pub fn new(api: Arc<dyn LambdaApi>, timing: Timing) -> Self {
        Self { api, timing }
    }

    async fn all_versions(&self, layer_name: &str) -> Result<Vec<i64>, ReconcileError> {
        let mut versions = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let page = self
                .api
                .list_layer_versions(layer_name, marker.as_deref())
                .await?;
            versions.extend(page.versions);
            match page.next_marker {
                Some(next) if !next.is_empty() => marker = Some(next),
                _ => break,
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }
}

fn layer_name(layer: &LayerVersion) -> &str {
    layer
        .spec
        .layer_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(&layer.metadata.name)
}

impl ResourceManager for LayerVersionManager {
    type Spec = LayerVersionSpec;
    type Status = LayerVersionStatus;

    fn kind(&self) -> ResourceKind {
        ResourceKind::LayerVersion
    }

    fn delta_policy(&self) -> &dyn DeltaPolicy<LayerVersionSpec> {
        &Structural
    }

    fn terminal_codes(&self) -> &'static [&'static str] {
        &[codes::INVALID_PARAMETER_VALUE]
    }

    fn read<'a>(&'a self, desired: &'a LayerVersion) -> BoxFuture<'a, Result<Option<LayerVersion>, ReconcileError>> {
        Box::pin(async move {
            let Some(version) = desired.status.version_number else {
                return Ok(None);
            };
            let name = layer_name(desired);
            let Some(remote) = absent_on(
                self.api.get_layer_version(name, version).await,
                &[codes::RESOURCE_NOT_FOUND],
            )?
            else {
                return Ok(None);
            };

            // The package is not echoed back.
            let mut spec = remote.spec;
            spec.layer_name = desired.spec.layer_name.clone();
            spec.content = desired.spec.content.clone();

            Ok(Some(merge_remote(desired, spec, remote.status)))
        })
    }

    fn create<'a>(&'a self, desired: &'a LayerVersion) -> BoxFuture<'a, Result<LayerVersion, ReconcileError>> {
        Box::pin(async move {
            let name = layer_name(desired);
            let mut request = desired.spec.clone();
            request.layer_name = Some(name.to_string());
            tracing::info!(layer_name = name, "publishing layer version");
            let published = self
                .api
                .publish_layer_version(&request)
                .await
                .map_err(|e| classify_api_error(e, &self.timing))?;
            tracing::info!(layer_name = name, version = ?published.status.version_number, "layer version published");
            Ok(merge_remote(desired, desired.spec.clone(), published.status))
        })
    }

    fn update<'a>(
        &'a self,
        desired: &'a LayerVersion,
        _observed: &'a LayerVersion,
        delta: &'a Delta,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<LayerVersion, ReconcileError>> {
        Box::pin(async move {
            tracing::warn!(layer_name = layer_name(desired), delta = %delta, "layer version changed after publish");
            Err(ReconcileError::Terminal(format!(
                "layer versions are immutable, create a new LayerVersion instead (changed: {})",
                delta.paths().collect::<Vec<_>>().join(", ")
            )))
        })
    }

    /// Removes every version of the layer older than the newest one, then
    /// this object's own version.
    fn delete<'a>(&'a self, observed: &'a LayerVersion) -> BoxFuture<'a, Result<(), ReconcileError>> {
        Box::pin(async move {
            let name = layer_name(observed);
            let versions = self.all_versions(name).await?;
            let older = versions.split_last().map(|(_, older)| older).unwrap_or_default();
            tracing::debug!(layer_name = name, count = older.len(), "deleting previous layer versions");

            let delete = |version: i64| async move {
                tracing::info!(layer_name = name, version, "deleting layer version");
                match self.api.delete_layer_version(name, version).await {
                    Err(e) if e.is_not_found() => Ok(()),
                    other => other.map_err(|e| classify_api_error(e, &self.timing)),
                }
            };
            for &version in older {
                delete(version).await?;
            }
            if let Some(own) = observed.status.version_number.filter(|v| !older.contains(v)) {
                delete(own).await?;
            }
            Ok(())
        })
    }
}
