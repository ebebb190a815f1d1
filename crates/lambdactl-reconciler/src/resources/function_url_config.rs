//! Public HTTPS endpoints for a function or one of its aliases.

use std::sync::Arc;

use lambdactl_core::ResourceKind;
use lambdactl_core::models::function_url_config::{
    Cors, FunctionUrlConfig, FunctionUrlConfigSpec, FunctionUrlConfigStatus,
};
use tokio_util::sync::CancellationToken;

use crate::api::{LambdaApi, absent_on};
use crate::config::Timing;
use crate::delta::{Delta, DeltaPolicy, Structural};
use crate::error::{ReconcileError, codes};
use crate::manager::{BoxFuture, ResourceManager, merge_remote};
use crate::references::ReferenceResolver;
use crate::resources::{classify_api_error, require_function_name, resolve_function_name};

pub struct FunctionUrlConfigManager {
    api: Arc<dyn LambdaApi>,
    timing: Timing,
}

impl FunctionUrlConfigManager {
    pub fn new(api: Arc<dyn LambdaApi>, timing: Timing) -> Self {
        Self { api, timing }
    }
}

impl ResourceManager for FunctionUrlConfigManager {
    type Spec = FunctionUrlConfigSpec;
    type Status = FunctionUrlConfigStatus;

    fn kind(&self) -> ResourceKind {
        ResourceKind::FunctionUrlConfig
    }

    fn delta_policy(&self) -> &dyn DeltaPolicy<FunctionUrlConfigSpec> {
        &Structural
    }

    fn terminal_codes(&self) -> &'static [&'static str] {
        &[codes::INVALID_PARAMETER_VALUE]
    }

    fn resolve_references<'a>(
        &'a self,
        resolver: &'a ReferenceResolver,
        desired: &'a FunctionUrlConfig,
    ) -> BoxFuture<'a, Result<(FunctionUrlConfig, bool), ReconcileError>> {
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

    fn clear_references(&self, original: &FunctionUrlConfigSpec, resolved: &FunctionUrlConfigSpec) -> FunctionUrlConfigSpec {
        FunctionUrlConfigSpec {
            function_name: original.function_name.clone(),
            ..resolved.clone()
        }
    }

    fn read<'a>(
        &'a self,
        desired: &'a FunctionUrlConfig,
    ) -> BoxFuture<'a, Result<Option<FunctionUrlConfig>, ReconcileError>> {
        Box::pin(async move {
            let function_name = require_function_name(desired.spec.function_name.as_ref())?;
            let qualifier = desired.spec.qualifier.as_deref();
            let Some(remote) = absent_on(
                self.api.get_function_url_config(function_name, qualifier).await,
                &[codes::RESOURCE_NOT_FOUND],
            )?
            else {
                return Ok(None);
            };

            let mut spec = remote.spec;
            spec.function_name = desired.spec.function_name.clone();
            spec.function_ref = desired.spec.function_ref.clone();
            spec.qualifier = desired.spec.qualifier.clone();

            Ok(Some(merge_remote(desired, spec, remote.status)))
        })
    }

    fn create<'a>(
        &'a self,
        desired: &'a FunctionUrlConfig,
    ) -> BoxFuture<'a, Result<FunctionUrlConfig, ReconcileError>> {
        Box::pin(async move {
            let function_name = require_function_name(desired.spec.function_name.as_ref())?;
            tracing::info!(
                function_name,
                qualifier = ?desired.spec.qualifier,
                auth_type = ?desired.spec.auth_type,
                "creating function URL"
            );
            let created = self
                .api
                .create_function_url_config(&desired.spec)
                .await
                .map_err(|e| classify_api_error(e, &self.timing))?;
            tracing::info!(function_name, url = ?created.status.function_url, "function URL created");
            Ok(merge_remote(desired, desired.spec.clone(), created.status))
        })
    }

    fn update<'a>(
        &'a self,
        desired: &'a FunctionUrlConfig,
        _observed: &'a FunctionUrlConfig,
        delta: &'a Delta,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<FunctionUrlConfig, ReconcileError>> {
        Box::pin(async move {
            let function_name = require_function_name(desired.spec.function_name.as_ref())?;
            let mut request = desired.spec.clone();
            // Omitting CORS keeps the current settings.
            if delta.different_at("cors") && request.cors.is_none() {
                request.cors = Some(Cors::default());
            }
            tracing::info!(function_name, qualifier = ?desired.spec.qualifier, "updating function URL");
            self.api
                .update_function_url_config(&request)
                .await
                .map_err(|e| classify_api_error(e, &self.timing))?;

            self.read(desired).await?.ok_or_else(|| ReconcileError::NotFound {
                kind: ResourceKind::FunctionUrlConfig,
                name: desired.metadata.name.clone(),
            })
        })
    }

    fn delete<'a>(&'a self, observed: &'a FunctionUrlConfig) -> BoxFuture<'a, Result<(), ReconcileError>> {
        Box::pin(async move {
            let function_name = require_function_name(observed.spec.function_name.as_ref())?;
            let qualifier = observed.spec.qualifier.as_deref();
            tracing::info!(function_name, qualifier = ?qualifier, "deleting function URL");
            match self.api.delete_function_url_config(function_name, qualifier).await {
                Err(e) if e.is_not_found() => Ok(()),
                other => other.map_err(|e| classify_api_error(e, &self.timing)),
            }
        })
    }
}
