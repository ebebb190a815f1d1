//! Lambda functions.

pub mod delta;
pub mod plan;
mod read;

use std::sync::Arc;

use lambdactl_core::ResourceKind;
use lambdactl_core::models::function::{Function, FunctionSpec, FunctionStatus};
use tokio_util::sync::CancellationToken;

use crate::api::LambdaApi;
use crate::config::Timing;
use crate::delta::{Delta, DeltaPolicy};
use crate::error::{ReconcileError, codes};
use crate::manager::{BoxFuture, ResourceManager, merge_remote};
use crate::references::{ReferenceResolver, targets};
use crate::requeue::RequeueDirective;
use crate::resources::classify_api_error;

use self::delta::FunctionDeltaPolicy;

pub struct FunctionManager {
    api: Arc<dyn LambdaApi>,
    timing: Timing,
}

impl FunctionManager {
    pub fn new(api: Arc<dyn LambdaApi>, timing: Timing) -> Self {
        Self { api, timing }
    }
}

/// The remote name: `spec.name`, falling back to the object's own name.
/// `None` when neither is set.
pub(crate) fn function_name(function: &Function) -> Option<&str> {
    function
        .spec
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .or_else(|| Some(function.metadata.name.as_str()).filter(|n| !n.is_empty()))
}

fn require_name(function: &Function) -> Result<&str, ReconcileError> {
    function_name(function).ok_or_else(|| ReconcileError::Terminal("function name is required".to_string()))
}

impl ResourceManager for FunctionManager {
    type Spec = FunctionSpec;
    type Status = FunctionStatus;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Function
    }

    fn delta_policy(&self) -> &dyn DeltaPolicy<FunctionSpec> {
        &FunctionDeltaPolicy
    }

    fn terminal_codes(&self) -> &'static [&'static str] {
        &[codes::INVALID_PARAMETER_VALUE]
    }

    fn resolve_references<'a>(
        &'a self,
        resolver: &'a ReferenceResolver,
        desired: &'a Function,
    ) -> BoxFuture<'a, Result<(Function, bool), ReconcileError>> {
        Box::pin(async move {
            let namespace = desired.metadata.namespace.as_str();
            let want = &desired.spec;
            let mut resolved = desired.clone();
            let spec = &mut resolved.spec;
            let mut used = false;

            spec.role = resolver
                .resolve_field(
                    namespace,
                    "role",
                    "roleRef",
                    want.role.as_ref(),
                    want.role_ref.as_ref(),
                    &targets::ROLE,
                    true,
                )
                .await?;
            used |= want.role_ref.is_some();

            spec.kms_key_arn = resolver
                .resolve_field(
                    namespace,
                    "kmsKeyARN",
                    "kmsKeyRef",
                    want.kms_key_arn.as_ref(),
                    want.kms_key_ref.as_ref(),
                    &targets::KMS_KEY,
                    false,
                )
                .await?;
            used |= want.kms_key_ref.is_some();

            if let (Some(code), Some(resolved_code)) = (&want.code, spec.code.as_mut()) {
                resolved_code.s3_bucket = resolver
                    .resolve_field(
                        namespace,
                        "code.s3Bucket",
                        "code.s3BucketRef",
                        code.s3_bucket.as_ref(),
                        code.s3_bucket_ref.as_ref(),
                        &targets::BUCKET,
                        false,
                    )
                    .await?;
                used |= code.s3_bucket_ref.is_some();
            }

            if let (Some(vpc), Some(resolved_vpc)) = (&want.vpc_config, spec.vpc_config.as_mut()) {
                resolved_vpc.subnet_ids = resolver
                    .resolve_list(
                        namespace,
                        "vpcConfig.subnetIDs",
                        "vpcConfig.subnetRefs",
                        vpc.subnet_ids.as_ref(),
                        vpc.subnet_refs.as_ref(),
                        &targets::SUBNET,
                    )
                    .await?;
                resolved_vpc.security_group_ids = resolver
                    .resolve_list(
                        namespace,
                        "vpcConfig.securityGroupIDs",
                        "vpcConfig.securityGroupRefs",
                        vpc.security_group_ids.as_ref(),
                        vpc.security_group_refs.as_ref(),
                        &targets::SECURITY_GROUP,
                    )
                    .await?;
                used |= vpc.subnet_refs.as_ref().is_some_and(|r| !r.is_empty())
                    || vpc.security_group_refs.as_ref().is_some_and(|r| !r.is_empty());
            }

            // Plain variables win over values pulled from secrets.
            if let Some(env) = spec.environment.as_mut() {
                if let Some(secret_refs) = env.variables_from_secret_refs.as_ref().filter(|r| !r.is_empty()) {
                    let variables = env.variables.get_or_insert_with(Default::default);
                    for (key, selector) in secret_refs {
                        if variables.contains_key(key) {
                            continue;
                        }
                        let value = resolver.resolve_secret(namespace, selector).await?;
                        variables.insert(key.clone(), value);
                    }
                    used = true;
                }
            }

            Ok((resolved, used))
        })
    }

    fn clear_references(&self, original: &FunctionSpec, resolved: &FunctionSpec) -> FunctionSpec {
        let mut spec = resolved.clone();
        spec.role = original.role.clone();
        spec.kms_key_arn = original.kms_key_arn.clone();
        spec.environment = original.environment.clone();
        if let (Some(code), Some(orig)) = (spec.code.as_mut(), original.code.as_ref()) {
            code.s3_bucket = orig.s3_bucket.clone();
        }
        if let (Some(vpc), Some(orig)) = (spec.vpc_config.as_mut(), original.vpc_config.as_ref()) {
            vpc.subnet_ids = orig.subnet_ids.clone();
            vpc.security_group_ids = orig.security_group_ids.clone();
        }
        spec
    }

    fn read<'a>(&'a self, desired: &'a Function) -> BoxFuture<'a, Result<Option<Function>, ReconcileError>> {
        Box::pin(async move {
            // Nothing to look up yet; create reports the missing name.
            let Some(name) = function_name(desired) else {
                return Ok(None);
            };
            Ok(read::read_function(self.api.as_ref(), desired, name).await?)
        })
    }

    fn create<'a>(&'a self, desired: &'a Function) -> BoxFuture<'a, Result<Function, ReconcileError>> {
        Box::pin(async move {
            let name = require_name(desired)?;
            tracing::info!(function_name = name, package_type = ?desired.spec.package_type, "creating function");
            let mut request = desired.spec.clone();
            request.name = Some(name.to_string());
            let created = self
                .api
                .create_function(&request)
                .await
                .map_err(|e| classify_api_error(e, &self.timing))?;
            tracing::info!(function_name = name, state = ?created.status.state, "function created");
            Ok(merge_remote(desired, desired.spec.clone(), created.status))
        })
    }

    fn update<'a>(
        &'a self,
        desired: &'a Function,
        observed: &'a Function,
        delta: &'a Delta,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Function, ReconcileError>> {
        Box::pin(async move {
            let name = require_name(desired)?;
            let plan = plan::plan(name, &desired.spec, observed, delta, &self.timing)?;
            if plan.is_empty() {
                tracing::debug!(function_name = name, delta = %delta, "no updatable field changed");
                return Ok(observed.clone());
            }
            tracing::info!(function_name = name, steps = plan.steps.len(), "updating function");
            plan::execute(self.api.as_ref(), &self.timing, cancel, name, observed.arn(), &plan).await?;

            read::read_function(self.api.as_ref(), desired, name)
                .await?
                .ok_or_else(|| ReconcileError::NotFound {
                    kind: ResourceKind::Function,
                    name: name.to_string(),
                })
        })
    }

    fn delete<'a>(&'a self, observed: &'a Function) -> BoxFuture<'a, Result<(), ReconcileError>> {
        Box::pin(async move {
            if let Some(directive) = plan::pending(observed, &self.timing) {
                return Err(directive.into());
            }
            let name = require_name(observed)?;
            tracing::info!(function_name = name, "deleting function");
            match self.api.delete_function(name, None).await {
                Err(e) if e.is_not_found() => Ok(()),
                other => other.map_err(|e| classify_api_error(e, &self.timing)),
            }
        })
    }

    fn settling(&self, latest: &Function) -> Option<RequeueDirective> {
        plan::pending(latest, &self.timing)
    }
}
