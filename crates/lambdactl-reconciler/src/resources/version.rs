//! Published function versions.
//!
//! A version is immutable once published; the only thing that can change
//! afterwards is its asynchronous invocation config. The server-assigned
//! version number in status is the object's remote identity.

use std::sync::Arc;

use lambdactl_core::ResourceKind;
use lambdactl_core::models::function::STATE_PENDING;
use lambdactl_core::models::version::{Version, VersionSpec, VersionStatus};
use tokio_util::sync::CancellationToken;

use crate::api::{FunctionDescription, LambdaApi, PublishVersion, absent_on};
use crate::config::Timing;
use crate::delta::{Delta, DeltaPolicy, Structural};
use crate::error::{ReconcileError, codes};
use crate::manager::{BoxFuture, ResourceManager, merge_remote};
use crate::references::ReferenceResolver;
use crate::requeue::RequeueDirective;
use crate::resources::{
    classify_api_error, read_event_invoke_config, require_function_name, resolve_function_name,
    sync_event_invoke_config,
};

pub struct VersionManager {
    api: Arc<dyn LambdaApi>,
    timing: Timing,
}

impl VersionManager {
    pub fn new(api: Arc<dyn LambdaApi>, timing: Timing) -> Self {
        Self { api, timing }
    }

    fn pending(&self, version: &Version) -> Option<RequeueDirective> {
        (version.status.state.as_deref() == Some(STATE_PENDING)).then(|| {
            RequeueDirective::after(
                "version in 'Pending' state, cannot be modified",
                self.timing.pending(),
            )
        })
    }
}

fn version_status(remote: FunctionDescription, version: &str) -> VersionStatus {
    let status = remote.status;
    VersionStatus {
        ack_resource_metadata: status.ack_resource_metadata,
        conditions: Vec::new(),
        code_sha256: status.code_sha256,
        last_modified: status.last_modified,
        last_update_status: status.last_update_status,
        state: status.state,
        state_reason: status.state_reason,
        version: status.version.or_else(|| Some(version.to_string())),
    }
}

impl ResourceManager for VersionManager {
    type Spec = VersionSpec;
    type Status = VersionStatus;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Version
    }

    fn delta_policy(&self) -> &dyn DeltaPolicy<VersionSpec> {
        &Structural
    }

    fn terminal_codes(&self) -> &'static [&'static str] {
        &[codes::INVALID_PARAMETER_VALUE]
    }

    fn resolve_references<'a>(
        &'a self,
        resolver: &'a ReferenceResolver,
        desired: &'a Version,
    ) -> BoxFuture<'a, Result<(Version, bool), ReconcileError>> {
        Box::pin(async move {
            let mut resolved = desired.clone();
            resolved.spec.function_name = resolve_function_name(
                resolver,
                &desired.metadata.namespace,
                desired.spec.function_name.as_ref(),
                desired.spec.function_ref.as_ref(),
            )
            .await?;
            Ok((resolved, desired.spec.function_ref.is_some()))
        })
    }

    fn clear_references(&self, original: &VersionSpec, resolved: &VersionSpec) -> VersionSpec {
        VersionSpec {
            function_name: original.function_name.clone(),
            ..resolved.clone()
        }
    }

    fn read<'a>(&'a self, desired: &'a Version) -> BoxFuture<'a, Result<Option<Version>, ReconcileError>> {
        Box::pin(async move {
            // Not published yet.
            let Some(version) = desired.status.version.as_deref() else {
                return Ok(None);
            };
            let function_name = require_function_name(desired.spec.function_name.as_ref())?;

            let Some(remote) = absent_on(
                self.api
                    .get_function_configuration(function_name, Some(version))
                    .await,
                &[codes::RESOURCE_NOT_FOUND],
            )?
            else {
                return Ok(None);
            };

            // Publish-time inputs are never echoed back and cannot change.
            let mut spec = desired.spec.clone();
            spec.function_event_invoke_config =
                read_event_invoke_config(self.api.as_ref(), function_name, Some(version)).await?;

            Ok(Some(merge_remote(desired, spec, version_status(remote, version))))
        })
    }

    fn create<'a>(&'a self, desired: &'a Version) -> BoxFuture<'a, Result<Version, ReconcileError>> {
        Box::pin(async move {
            let function_name = require_function_name(desired.spec.function_name.as_ref())?;
            let request = PublishVersion {
                function_name: function_name.to_string(),
                code_sha256: desired.spec.code_sha256.clone(),
                description: desired.spec.description.clone(),
                revision_id: desired.spec.revision_id.clone(),
            };
            tracing::info!(function_name, "publishing version");
            let published = self
                .api
                .publish_version(&request)
                .await
                .map_err(|e| classify_api_error(e, &self.timing))?;

            let version = published.status.version.clone().ok_or_else(|| {
                ReconcileError::UpdateFailed("PublishVersion returned no version number".to_string())
            })?;
            tracing::info!(function_name, version = %version, "version published");

            // The version exists from here on; a failed side call must not
            // lose its number. The next pass sees the missing config as drift.
            let mut spec = desired.spec.clone();
            if let Some(config) = &desired.spec.function_event_invoke_config {
                if let Err(e) =
                    sync_event_invoke_config(self.api.as_ref(), &self.timing, function_name, Some(&version), Some(config))
                        .await
                {
                    tracing::warn!(function_name, version = %version, error = %e, "async invoke config not applied");
                    spec.function_event_invoke_config = None;
                }
            }

            Ok(merge_remote(desired, spec, version_status(published, &version)))
        })
    }

    fn update<'a>(
        &'a self,
        desired: &'a Version,
        observed: &'a Version,
        delta: &'a Delta,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Version, ReconcileError>> {
        Box::pin(async move {
            if let Some(directive) = self.pending(observed) {
                return Err(directive.into());
            }
            let function_name = require_function_name(desired.spec.function_name.as_ref())?;

            if delta.different_at("functionEventInvokeConfig") {
                if let Some(version) = observed.status.version.as_deref() {
                    sync_event_invoke_config(
                        self.api.as_ref(),
                        &self.timing,
                        function_name,
                        Some(version),
                        desired.spec.function_event_invoke_config.as_ref(),
                    )
                    .await?;
                }
            }

            self.read(desired).await?.ok_or_else(|| ReconcileError::NotFound {
                kind: ResourceKind::Version,
                name: desired.metadata.name.clone(),
            })
        })
    }

    fn delete<'a>(&'a self, observed: &'a Version) -> BoxFuture<'a, Result<(), ReconcileError>> {
        Box::pin(async move {
            let Some(version) = observed.status.version.as_deref() else {
                return Ok(());
            };
            let function_name = require_function_name(observed.spec.function_name.as_ref())?;
            tracing::info!(function_name, version, "deleting version");
            match self.api.delete_function(function_name, Some(version)).await {
                Err(e) if e.is_not_found() => Ok(()),
                other => other.map_err(|e| classify_api_error(e, &self.timing)),
            }
        })
    }

    fn settling(&self, latest: &Version) -> Option<RequeueDirective> {
        self.pending(latest)
    }
}
