//! Ordered update calls for a function.
//!
//! Side configurations (tags, concurrency, async invoke, code signing) go
//! first. Then code and configuration: the service rejects a configuration
//! change while a code change is still being applied, so when both are
//! needed the code update is submitted, awaited until the function reports
//! `Successful`, and only then is the configuration update sent.

use std::collections::BTreeMap;

use lambdactl_core::models::function::{
    DeadLetterConfig, EphemeralStorage, Environment, Function, FunctionSpec, LAST_UPDATE_FAILED,
    LAST_UPDATE_IN_PROGRESS, LAST_UPDATE_SUCCESSFUL, STATE_PENDING, SnapStart, TracingConfig, VpcConfig,
};
use lambdactl_core::models::invoke::EventInvokeConfig;
use tokio_util::sync::CancellationToken;

use crate::api::{CodeUpdate, LambdaApi};
use crate::config::Timing;
use crate::delta::Delta;
use crate::error::ReconcileError;
use crate::requeue::RequeueDirective;
use crate::resources::{TagChanges, classify_api_error};
use crate::wait::poll_until;

/// Returned by UpdateFunctionCode while a pushed image has not reached the
/// registry yet.
const SOURCE_IMAGE_MISSING: &str = "Provide a valid source image.";

/// Subtrees with their own calls. Anything else is configuration.
const NON_CONFIGURATION_PATHS: &[&str] = &[
    "code",
    "tags",
    "reservedConcurrentExecutions",
    "functionEventInvokeConfig",
    "codeSigningConfigARN",
    "architectures",
];

#[derive(Debug, Clone, PartialEq)]
pub enum PlanStep {
    Untag(Vec<String>),
    Tag(BTreeMap<String, String>),
    PutConcurrency(i64),
    DeleteConcurrency,
    PutEventInvokeConfig(EventInvokeConfig),
    DeleteEventInvokeConfig,
    PutCodeSigning(String),
    DeleteCodeSigning,
    UpdateCode(CodeUpdate),
    /// Block until the last update reports `Successful`.
    AwaitUpdateSuccessful,
    /// Only the fields set on the patch are sent.
    UpdateConfiguration(FunctionSpec),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePlan {
    pub steps: Vec<PlanStep>,
}

impl UpdatePlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Decide which calls move `observed` to `desired`. Makes no calls.
pub fn plan(
    function_name: &str,
    desired: &FunctionSpec,
    observed: &Function,
    delta: &Delta,
    timing: &Timing,
) -> Result<UpdatePlan, ReconcileError> {
    if let Some(directive) = pending(observed, timing) {
        return Err(directive.into());
    }

    let mut steps = Vec::new();

    if delta.different_at("tags") {
        let changes = TagChanges::between(observed.spec.tags.as_ref(), desired.tags.as_ref());
        if !changes.untag.is_empty() {
            steps.push(PlanStep::Untag(changes.untag));
        }
        if !changes.tag.is_empty() {
            steps.push(PlanStep::Tag(changes.tag));
        }
    }

    if delta.different_at("reservedConcurrentExecutions") {
        steps.push(match desired.reserved_concurrent_executions {
            Some(reserved) => PlanStep::PutConcurrency(reserved),
            None => PlanStep::DeleteConcurrency,
        });
    }

    if delta.different_at("functionEventInvokeConfig") {
        steps.push(match &desired.function_event_invoke_config {
            Some(config) => PlanStep::PutEventInvokeConfig(config.clone()),
            None => PlanStep::DeleteEventInvokeConfig,
        });
    }

    if delta.different_at("codeSigningConfigARN") {
        match desired.code_signing_config() {
            Some(_) if desired.is_image() => {
                return Err(ReconcileError::Terminal(
                    "cannot set a code signing config on a function with package type Image".to_string(),
                ));
            }
            Some(arn) => steps.push(PlanStep::PutCodeSigning(arn.to_string())),
            None => steps.push(PlanStep::DeleteCodeSigning),
        }
    }

    let code_changed = desired.code.is_some()
        && (delta.different_at("code.imageURI")
            || delta.different_at("code.sha256")
            || delta.different_at("architectures"));
    let patch = if delta.different_except(NON_CONFIGURATION_PATHS) {
        configuration_patch(function_name, desired, delta)
    } else {
        None
    };

    if code_changed {
        steps.push(PlanStep::UpdateCode(code_update(function_name, desired, &observed.spec, delta)));
        if patch.is_some() {
            steps.push(PlanStep::AwaitUpdateSuccessful);
        }
    }
    if let Some(patch) = patch {
        steps.push(PlanStep::UpdateConfiguration(patch));
    }

    Ok(UpdatePlan { steps })
}

/// A function that is still being created or updated accepts no changes.
pub(crate) fn pending(observed: &Function, timing: &Timing) -> Option<RequeueDirective> {
    let status = &observed.status;
    let busy = status.state.as_deref() == Some(STATE_PENDING)
        || status.last_update_status.as_deref() == Some(LAST_UPDATE_IN_PROGRESS);
    busy.then(|| {
        RequeueDirective::after(
            "function in 'Pending' state, cannot be modified or deleted",
            timing.pending(),
        )
    })
}

/// Every code call must name a package, so when only the architecture
/// changed the package the function already runs is submitted again.
fn code_update(function_name: &str, desired: &FunctionSpec, observed: &FunctionSpec, delta: &Delta) -> CodeUpdate {
    let mut update = CodeUpdate {
        function_name: function_name.to_string(),
        architectures: desired.architectures.clone(),
        ..Default::default()
    };
    let Some(code) = &desired.code else {
        return update;
    };

    if delta.different_at("code.sha256") && code.sha256.is_some() {
        update.s3_bucket = code.s3_bucket.clone();
        update.s3_key = code.s3_key.clone();
        update.s3_object_version = code.s3_object_version.clone();
        update.zip_file = code.zip_file.clone();
    } else if delta.different_at("code.imageURI") && code.image_uri.is_some() {
        update.image_uri = code.image_uri.clone();
    } else if let Some(current) = &observed.code {
        if observed.is_image() {
            update.image_uri = current.image_uri.clone();
        } else {
            update.s3_bucket = current.s3_bucket.clone();
            update.s3_key = current.s3_key.clone();
            update.s3_object_version = current.s3_object_version.clone();
            update.zip_file = current.zip_file.clone();
        }
    }
    update
}

/// Build a configuration update carrying only the fields that changed.
/// A field the user removed is sent as its empty value so the service
/// clears it. `None` when nothing updatable changed.
fn configuration_patch(function_name: &str, desired: &FunctionSpec, delta: &Delta) -> Option<FunctionSpec> {
    let base = FunctionSpec {
        name: Some(function_name.to_string()),
        ..Default::default()
    };
    let mut patch = base.clone();
    let changed = |path: &str| delta.different_at(path);

    if changed("deadLetterConfig") {
        patch.dead_letter_config = Some(desired.dead_letter_config.clone().unwrap_or(DeadLetterConfig::default()));
    }
    if changed("description") {
        patch.description = Some(desired.description.clone().unwrap_or_default());
    }
    if changed("environment") {
        patch.environment = Some(Environment {
            variables: desired.environment.as_ref().and_then(|e| e.variables.clone()),
            variables_from_secret_refs: None,
        });
    }
    if changed("ephemeralStorage") {
        patch.ephemeral_storage = Some(desired.ephemeral_storage.clone().unwrap_or(EphemeralStorage::default()));
    }
    if changed("fileSystemConfigs") {
        patch.file_system_configs = Some(desired.file_system_configs.clone().unwrap_or_default());
    }
    if changed("handler") {
        patch.handler = Some(desired.handler.clone().unwrap_or_default());
    }
    if changed("imageConfig") {
        let has_image = desired
            .code
            .as_ref()
            .and_then(|c| c.image_uri.as_deref())
            .is_some_and(|uri| !uri.is_empty());
        if has_image {
            patch.image_config = desired.image_config.clone();
        }
    }
    if changed("kmsKeyARN") {
        patch.kms_key_arn = Some(desired.kms_key_arn.clone().unwrap_or_default());
    }
    if changed("layers") {
        patch.layers = Some(desired.layers.clone().unwrap_or_default());
    }
    if changed("loggingConfig") {
        patch.logging_config = desired.logging_config.clone();
    }
    if changed("memorySize") {
        patch.memory_size = Some(desired.memory_size.unwrap_or(0));
    }
    if changed("role") {
        patch.role = Some(desired.role.clone().unwrap_or_default());
    }
    if changed("runtime") {
        patch.runtime = Some(desired.runtime.clone().unwrap_or_default());
    }
    if changed("snapStart") {
        patch.snap_start = Some(desired.snap_start.clone().unwrap_or(SnapStart::default()));
    }
    if changed("timeout") {
        patch.timeout = Some(desired.timeout.unwrap_or(0));
    }
    if changed("tracingConfig") {
        patch.tracing_config = Some(desired.tracing_config.clone().unwrap_or(TracingConfig::default()));
    }
    if changed("vpcConfig") {
        let vpc = desired.vpc_config.as_ref();
        patch.vpc_config = Some(VpcConfig {
            subnet_ids: Some(vpc.and_then(|v| v.subnet_ids.clone()).unwrap_or_default()),
            security_group_ids: Some(vpc.and_then(|v| v.security_group_ids.clone()).unwrap_or_default()),
            ..Default::default()
        });
    }

    (patch != base).then_some(patch)
}

/// Run `plan` in order. The first failure stops the run.
pub(crate) async fn execute(
    api: &dyn LambdaApi,
    timing: &Timing,
    cancel: &CancellationToken,
    function_name: &str,
    arn: Option<&str>,
    plan: &UpdatePlan,
) -> Result<(), ReconcileError> {
    for step in &plan.steps {
        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }
        run_step(api, timing, cancel, function_name, arn, step).await?;
    }
    Ok(())
}

async fn run_step(
    api: &dyn LambdaApi,
    timing: &Timing,
    cancel: &CancellationToken,
    function_name: &str,
    arn: Option<&str>,
    step: &PlanStep,
) -> Result<(), ReconcileError> {
    let classify = |e| classify_api_error(e, timing);
    match step {
        PlanStep::Untag(keys) => {
            let arn = require_arn(arn)?;
            tracing::info!(function_name, keys = ?keys, "removing function tags");
            api.untag_resource(arn, keys).await.map_err(classify)
        }
        PlanStep::Tag(tags) => {
            let arn = require_arn(arn)?;
            tracing::info!(function_name, keys = ?tags.keys().collect::<Vec<_>>(), "adding function tags");
            api.tag_resource(arn, tags).await.map_err(classify)
        }
        PlanStep::PutConcurrency(reserved) => {
            tracing::info!(function_name, reserved, "setting reserved concurrency");
            api.put_function_concurrency(function_name, *reserved).await.map_err(classify)
        }
        PlanStep::DeleteConcurrency => {
            tracing::info!(function_name, "removing reserved concurrency");
            api.delete_function_concurrency(function_name).await.map_err(classify)
        }
        PlanStep::PutEventInvokeConfig(config) => {
            crate::resources::sync_event_invoke_config(api, timing, function_name, None, Some(config)).await
        }
        PlanStep::DeleteEventInvokeConfig => {
            crate::resources::sync_event_invoke_config(api, timing, function_name, None, None).await
        }
        PlanStep::PutCodeSigning(config_arn) => {
            tracing::info!(function_name, code_signing_config = %config_arn, "associating code signing config");
            api.put_function_code_signing_config(function_name, config_arn)
                .await
                .map_err(classify)
        }
        PlanStep::DeleteCodeSigning => {
            tracing::info!(function_name, "removing code signing config");
            api.delete_function_code_signing_config(function_name)
                .await
                .map_err(classify)
        }
        PlanStep::UpdateCode(update) => {
            tracing::info!(
                function_name,
                image_uri = ?update.image_uri,
                s3_key = ?update.s3_key,
                "updating function code"
            );
            match api.update_function_code(update).await {
                Err(e) if e.message.contains(SOURCE_IMAGE_MISSING) => {
                    tracing::warn!(function_name, "source image not available yet");
                    Err(RequeueDirective::after(e.to_string(), timing.source_image()).into())
                }
                other => other.map_err(classify),
            }
        }
        PlanStep::AwaitUpdateSuccessful => {
            await_update_successful(api, timing, cancel, function_name).await
        }
        PlanStep::UpdateConfiguration(patch) => {
            tracing::info!(function_name, "updating function configuration");
            api.update_function_configuration(patch).await.map_err(classify)
        }
    }
}

async fn await_update_successful(
    api: &dyn LambdaApi,
    timing: &Timing,
    cancel: &CancellationToken,
    function_name: &str,
) -> Result<(), ReconcileError> {
    poll_until(
        "function code update",
        timing.poll_interval(),
        timing.poll_deadline(),
        cancel,
        move || async move {
            let current = api.get_function(function_name).await?;
            match current.status.last_update_status.as_deref() {
                Some(LAST_UPDATE_SUCCESSFUL) => Ok(Some(())),
                Some(LAST_UPDATE_FAILED) => Err(ReconcileError::UpdateFailed(
                    current
                        .status
                        .last_update_status_reason
                        .unwrap_or_else(|| "code update failed".to_string()),
                )),
                _ => Ok(None),
            }
        },
    )
    .await
}

fn require_arn(arn: Option<&str>) -> Result<&str, ReconcileError> {
    arn.ok_or_else(|| ReconcileError::UpdateFailed("function has no ARN recorded".to_string()))
}
