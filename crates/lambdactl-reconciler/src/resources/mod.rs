//! One [`crate::manager::ResourceManager`] per Lambda object kind, plus
//! the side-configuration helpers several kinds share.

pub mod alias;
pub mod code_signing_config;
pub mod event_source_mapping;
pub mod function;
pub mod function_url_config;
pub mod layer_version;
pub mod version;

use std::collections::BTreeMap;

use lambdactl_core::models::invoke::EventInvokeConfig;
use lambdactl_core::models::reference::ResourceReference;

use crate::api::{LambdaApi, absent_on};
use crate::config::Timing;
use crate::delta::compare_maps;
use crate::error::{ApiError, ReconcileError, codes};
use crate::references::{ReferenceError, ReferenceResolver, targets};
use crate::requeue::RequeueDirective;

/// Map a failed mutating call onto the pass outcome: bad input is terminal,
/// a busy object is requeued, anything else propagates unchanged.
pub(crate) fn classify_api_error(err: ApiError, timing: &Timing) -> ReconcileError {
    if err.is(codes::INVALID_PARAMETER_VALUE) {
        return ReconcileError::Terminal(err.to_string());
    }
    if err.is(codes::RESOURCE_CONFLICT) || err.is(codes::RESOURCE_NOT_READY) {
        tracing::warn!(operation = %err.operation, code = %err.code, "remote object busy");
        return RequeueDirective::after(err.to_string(), timing.busy()).into();
    }
    ReconcileError::Api(err)
}

/// Reads whose "not configured" answer is an empty value.
pub(crate) async fn read_event_invoke_config(
    api: &dyn LambdaApi,
    function_name: &str,
    qualifier: Option<&str>,
) -> Result<Option<EventInvokeConfig>, ApiError> {
    absent_on(
        api.get_function_event_invoke_config(function_name, qualifier).await,
        &[codes::EVENT_INVOKE_CONFIG_NOT_FOUND, codes::RESOURCE_NOT_FOUND],
    )
}

/// Put the desired async-invoke config, or delete it when the user removed it.
pub(crate) async fn sync_event_invoke_config(
    api: &dyn LambdaApi,
    timing: &Timing,
    function_name: &str,
    qualifier: Option<&str>,
    desired: Option<&EventInvokeConfig>,
) -> Result<(), ReconcileError> {
    match desired {
        Some(config) => {
            tracing::info!(function_name, qualifier = ?qualifier, "putting event invoke config");
            api.put_function_event_invoke_config(function_name, qualifier, config)
                .await
                .map_err(|e| classify_api_error(e, timing))
        }
        None => {
            tracing::info!(function_name, qualifier = ?qualifier, "deleting event invoke config");
            match api.delete_function_event_invoke_config(function_name, qualifier).await {
                Err(e) if e.is(codes::EVENT_INVOKE_CONFIG_NOT_FOUND) => Ok(()),
                other => other.map_err(|e| classify_api_error(e, timing)),
            }
        }
    }
}

/// The tag calls needed to move `observed` to `desired`.
///
/// There is no call that updates a tag in place, so a changed value is
/// untagged and then tagged again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagChanges {
    pub untag: Vec<String>,
    pub tag: BTreeMap<String, String>,
}

impl TagChanges {
    pub fn between(
        observed: Option<&BTreeMap<String, String>>,
        desired: Option<&BTreeMap<String, String>>,
    ) -> Self {
        let empty = BTreeMap::new();
        let (added, removed, updated) =
            compare_maps(observed.unwrap_or(&empty), desired.unwrap_or(&empty));
        let mut untag = removed;
        untag.extend(updated.keys().cloned());
        untag.sort();
        let mut tag = added;
        tag.extend(updated);
        Self { untag, tag }
    }

    pub fn is_empty(&self) -> bool {
        self.untag.is_empty() && self.tag.is_empty()
    }
}

pub(crate) async fn apply_tag_changes(
    api: &dyn LambdaApi,
    timing: &Timing,
    arn: &str,
    changes: &TagChanges,
) -> Result<(), ReconcileError> {
    if !changes.untag.is_empty() {
        tracing::info!(arn, keys = ?changes.untag, "removing tags");
        api.untag_resource(arn, &changes.untag)
            .await
            .map_err(|e| classify_api_error(e, timing))?;
    }
    if !changes.tag.is_empty() {
        tracing::info!(arn, keys = ?changes.tag.keys().collect::<Vec<_>>(), "adding tags");
        api.tag_resource(arn, &changes.tag)
            .await
            .map_err(|e| classify_api_error(e, timing))?;
    }
    Ok(())
}

/// Resolve the `functionName`/`functionRef` pair shared by every kind that
/// hangs off a function.
pub(crate) async fn resolve_function_name(
    resolver: &ReferenceResolver,
    namespace: &str,
    literal: Option<&String>,
    reference: Option<&ResourceReference>,
) -> Result<Option<String>, ReferenceError> {
    resolver
        .resolve_field(
            namespace,
            "functionName",
            "functionRef",
            literal,
            reference,
            &targets::FUNCTION,
            true,
        )
        .await
}

/// The function a dependent object belongs to, after references resolved.
pub(crate) fn require_function_name(function_name: Option<&String>) -> Result<&str, ReconcileError> {
    function_name
        .map(String::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ReconcileError::Terminal("functionName is required".to_string()))
}
