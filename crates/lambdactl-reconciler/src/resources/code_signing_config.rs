//! Code signing configs. AWS names them only by ARN, so an object without
//! one in its status has not been created yet.

use std::sync::Arc;

use lambdactl_core::ResourceKind;
use lambdactl_core::models::code_signing_config::{
    CodeSigningConfig, CodeSigningConfigSpec, CodeSigningConfigStatus,
};
use tokio_util::sync::CancellationToken;

use crate::api::{LambdaApi, absent_on};
use crate::config::Timing;
use crate::delta::{Delta, DeltaPolicy, Structural};
use crate::error::{ReconcileError, codes};
use crate::manager::{BoxFuture, ResourceManager, merge_remote};
use crate::resources::classify_api_error;

pub struct CodeSigningConfigManager {
    api: Arc<dyn LambdaApi>,
    timing: Timing,
}

impl CodeSigningConfigManager {
    pub fn new(api: Arc<dyn LambdaApi>, timing: Timing) -> Self {
        Self { api, timing }
    }
}

fn require_arn(config: &CodeSigningConfig) -> Result<&str, ReconcileError> {
    config.arn().ok_or_else(|| ReconcileError::NotFound {
        kind: ResourceKind::CodeSigningConfig,
        name: config.metadata.name.clone(),
    })
}

impl ResourceManager for CodeSigningConfigManager {
    type Spec = CodeSigningConfigSpec;
    type Status = CodeSigningConfigStatus;

    fn kind(&self) -> ResourceKind {
        ResourceKind::CodeSigningConfig
    }

    fn delta_policy(&self) -> &dyn DeltaPolicy<CodeSigningConfigSpec> {
        &Structural
    }

    fn terminal_codes(&self) -> &'static [&'static str] {
        &[codes::INVALID_PARAMETER_VALUE]
    }

    fn read<'a>(
        &'a self,
        desired: &'a CodeSigningConfig,
    ) -> BoxFuture<'a, Result<Option<CodeSigningConfig>, ReconcileError>> {
        Box::pin(async move {
            let Some(arn) = desired.arn() else {
                return Ok(None);
            };
            let Some(remote) = absent_on(
                self.api.get_code_signing_config(arn).await,
                &[codes::RESOURCE_NOT_FOUND],
            )?
            else {
                return Ok(None);
            };
            Ok(Some(merge_remote(desired, remote.spec, remote.status)))
        })
    }

    fn create<'a>(
        &'a self,
        desired: &'a CodeSigningConfig,
    ) -> BoxFuture<'a, Result<CodeSigningConfig, ReconcileError>> {
        Box::pin(async move {
            tracing::info!(name = %desired.metadata.name, "creating code signing config");
            let created = self
                .api
                .create_code_signing_config(&desired.spec)
                .await
                .map_err(|e| classify_api_error(e, &self.timing))?;
            tracing::info!(
                id = ?created.status.code_signing_config_id,
                "code signing config created"
            );
            Ok(merge_remote(desired, desired.spec.clone(), created.status))
        })
    }

    fn update<'a>(
        &'a self,
        desired: &'a CodeSigningConfig,
        observed: &'a CodeSigningConfig,
        delta: &'a Delta,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<CodeSigningConfig, ReconcileError>> {
        Box::pin(async move {
            let arn = require_arn(observed)?;
            tracing::info!(arn, differences = delta.len(), "updating code signing config");
            let updated = self
                .api
                .update_code_signing_config(arn, &desired.spec)
                .await
                .map_err(|e| classify_api_error(e, &self.timing))?;
            Ok(merge_remote(desired, updated.spec, updated.status))
        })
    }

    fn delete<'a>(&'a self, observed: &'a CodeSigningConfig) -> BoxFuture<'a, Result<(), ReconcileError>> {
        Box::pin(async move {
            let arn = require_arn(observed)?;
            tracing::info!(arn, "deleting code signing config");
            match self.api.delete_code_signing_config(arn).await {
                Err(e) if e.is_not_found() => Ok(()),
                other => other.map_err(|e| classify_api_error(e, &self.timing)),
            }
        })
    }
}
