use std::collections::BTreeMap;

use lambdactl_core::models::function::{Environment, Function, FunctionCode, FunctionSpec};

use crate::api::{FunctionDescription, LambdaApi, absent_on};
use crate::error::{ApiError, codes};
use crate::manager::merge_remote;
use crate::resources::read_event_invoke_config;

/// Read the function and the side configurations GetFunction leaves out.
///
/// Reads run in a fixed order: reserved concurrency, async invoke config,
/// then code signing (zip packages only). "Not configured" answers become
/// empty values; any other failure aborts the read.
pub(crate) async fn read_function(
    api: &dyn LambdaApi,
    desired: &Function,
    function_name: &str,
) -> Result<Option<Function>, ApiError> {
    let Some(remote) = absent_on(api.get_function(function_name).await, &[codes::RESOURCE_NOT_FOUND])?
    else {
        return Ok(None);
    };

    let FunctionDescription { spec: remote_spec, status } = remote;
    let mut spec = observed_spec(&desired.spec, remote_spec, status.code_sha256.as_deref());

    spec.reserved_concurrent_executions = api.get_function_concurrency(function_name).await?;
    spec.function_event_invoke_config = read_event_invoke_config(api, function_name, None).await?;
    spec.code_signing_config_arn = if spec.is_zip() {
        absent_on(
            api.get_function_code_signing_config(function_name).await,
            &[codes::RESOURCE_NOT_FOUND],
        )?
        .flatten()
    } else {
        None
    };

    Ok(Some(merge_remote(desired, spec, status)))
}

/// Project the remote description onto the shape of `desired`.
///
/// Fields the service never echoes (references, package locators, the
/// publish flag) are carried over from `desired` so they never show up as
/// drift.
fn observed_spec(desired: &FunctionSpec, remote: FunctionSpec, code_sha256: Option<&str>) -> FunctionSpec {
    let mut spec = remote;
    spec.name = desired.name.clone();
    spec.publish = desired.publish;
    spec.role_ref = desired.role_ref.clone();
    spec.kms_key_ref = desired.kms_key_ref.clone();
    spec.code = observed_code(desired.code.as_ref(), spec.code.take(), code_sha256);

    if let Some(want) = &desired.environment {
        let variables = spec.environment.take().and_then(|e| e.variables);
        spec.environment = Some(Environment {
            variables,
            variables_from_secret_refs: want.variables_from_secret_refs.clone(),
        });
    }

    if let (Some(want), Some(vpc)) = (&desired.vpc_config, spec.vpc_config.as_mut()) {
        vpc.subnet_refs = want.subnet_refs.clone();
        vpc.security_group_refs = want.security_group_refs.clone();
    }

    spec.tags = align_empty(desired.tags.as_ref(), spec.tags.take());
    spec
}

fn observed_code(
    desired: Option<&FunctionCode>,
    remote: Option<FunctionCode>,
    code_sha256: Option<&str>,
) -> Option<FunctionCode> {
    let want = desired?;
    let remote = remote.unwrap_or_default();
    Some(FunctionCode {
        image_uri: remote.image_uri,
        s3_bucket: want.s3_bucket.clone(),
        s3_bucket_ref: want.s3_bucket_ref.clone(),
        s3_key: want.s3_key.clone(),
        s3_object_version: want.s3_object_version.clone(),
        sha256: want.sha256.as_ref().and(code_sha256.map(str::to_string)),
        zip_file: want.zip_file.clone(),
    })
}

/// The service reports no tags as an empty map; keep whichever empty form
/// the user wrote.
fn align_empty(
    desired: Option<&BTreeMap<String, String>>,
    observed: Option<BTreeMap<String, String>>,
) -> Option<BTreeMap<String, String>> {
    match observed.filter(|m| !m.is_empty()) {
        Some(tags) => Some(tags),
        None => desired.filter(|m| m.is_empty()).cloned(),
    }
}
