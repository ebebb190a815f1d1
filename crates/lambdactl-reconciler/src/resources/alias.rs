//! Function aliases and the configuration hanging off them: async invoke
//! config, provisioned concurrency and the alias's resource policy.

use std::collections::BTreeMap;
use std::sync::Arc;

use lambdactl_core::ResourceKind;
use lambdactl_core::models::alias::{Alias, AliasSpec, AliasStatus, Permission};
use lambdactl_core::models::invoke::ProvisionedConcurrencyConfig;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::api::{LambdaApi, absent_on};
use crate::config::Timing;
use crate::delta::{Delta, DeltaPolicy};
use crate::error::{ApiError, ReconcileError, codes};
use crate::manager::{BoxFuture, ResourceManager, merge_remote};
use crate::references::ReferenceResolver;
use crate::resources::{
    classify_api_error, read_event_invoke_config, require_function_name, resolve_function_name,
    sync_event_invoke_config,
};

/// Fields with their own calls; everything else goes through UpdateAlias.
const SIDE_PATHS: &[&str] = &["functionEventInvokeConfig", "provisionedConcurrencyConfig", "permissions"];

pub struct AliasManager {
    api: Arc<dyn LambdaApi>,
    timing: Timing,
}

impl AliasManager {
    pub fn new(api: Arc<dyn LambdaApi>, timing: Timing) -> Self {
        Self { api, timing }
    }
}

fn alias_name(alias: &Alias) -> &str {
    alias
        .spec
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(&alias.metadata.name)
}

/// Permissions are compared as a set keyed by statement id.
pub struct AliasDeltaPolicy;

impl DeltaPolicy<AliasSpec> for AliasDeltaPolicy {
    fn custom_paths(&self) -> &[&'static str] {
        &["permissions"]
    }

    fn custom_compare(&self, delta: &mut Delta, desired: &AliasSpec, observed: &AliasSpec) {
        let want = desired.permissions.as_deref().unwrap_or_default();
        let have = observed.permissions.as_deref().unwrap_or_default();
        let (remove, add) = permission_changes(want, have);
        if !remove.is_empty() || !add.is_empty() {
            delta.add(
                "permissions",
                serde_json::to_value(want).ok(),
                serde_json::to_value(have).ok(),
            );
        }
    }
}

/// Statements to remove and to add so `observed` matches `desired`.
///
/// A statement whose content changed is removed and added again. Entries
/// without a statement id cannot be addressed and are ignored.
pub fn permission_changes(desired: &[Permission], observed: &[Permission]) -> (Vec<Permission>, Vec<Permission>) {
    let by_id = |perms: &[Permission]| -> BTreeMap<String, Permission> {
        perms
            .iter()
            .filter_map(|p| p.statement_id.clone().map(|id| (id, p.clone())))
            .collect()
    };
    let want = by_id(desired);
    let have = by_id(observed);

    let mut remove = Vec::new();
    let mut add = Vec::new();
    for (id, perm) in &want {
        match have.get(id) {
            None => add.push(perm.clone()),
            Some(current) if !perm.same_statement(current) => {
                remove.push(current.clone());
                add.push(perm.clone());
            }
            Some(_) => {}
        }
    }
    for (id, current) in &have {
        if !want.contains_key(id) {
            remove.push(current.clone());
        }
    }
    (remove, add)
}

/// Extract permissions from a resource policy document. Statements without
/// a `Sid` are skipped.
pub fn parse_policy(document: &str) -> Result<Vec<Permission>, serde_json::Error> {
    let policy: Value = serde_json::from_str(document)?;
    let statements = match policy.get("Statement") {
        Some(Value::Array(items)) => items.clone(),
        Some(single @ Value::Object(_)) => vec![single.clone()],
        _ => Vec::new(),
    };

    let permissions = statements
        .iter()
        .filter_map(|stmt| {
            let sid = stmt.get("Sid").and_then(Value::as_str).filter(|s| !s.is_empty())?;
            let principal = stmt.get("Principal").and_then(|p| match p {
                Value::Object(map) => map
                    .get("Service")
                    .and_then(first_str)
                    .or_else(|| map.get("AWS").and_then(first_str)),
                other => first_str(other),
            });
            let condition = |operator: &str, key: &str| {
                stmt.pointer(&format!("/Condition/{operator}"))
                    .and_then(|c| c.get(key))
                    .and_then(first_str)
            };
            Some(Permission {
                statement_id: Some(sid.to_string()),
                action: stmt.get("Action").and_then(first_str),
                principal,
                source_arn: condition("ArnLike", "AWS:SourceArn"),
                source_account: condition("StringEquals", "AWS:SourceAccount"),
                event_source_token: condition("StringEquals", "lambda:EventSourceToken"),
                principal_org_id: condition("StringEquals", "aws:PrincipalOrgID"),
                function_url_auth_type: None,
            })
        })
        .collect();
    Ok(permissions)
}

/// Policy values may be a single string or a list of strings.
fn first_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

impl AliasManager {
    async fn read_permissions(&self, function_name: &str, alias: &str) -> Result<Vec<Permission>, ReconcileError> {
        let qualified = format!("{function_name}:{alias}");
        match absent_on(self.api.get_policy(&qualified, None).await, &[codes::RESOURCE_NOT_FOUND])? {
            None => Ok(Vec::new()),
            Some(document) => Ok(parse_policy(&document)?),
        }
    }

    async fn read_provisioned_concurrency(
        &self,
        function_name: &str,
        alias: &str,
    ) -> Result<Option<ProvisionedConcurrencyConfig>, ApiError> {
        let requested = absent_on(
            self.api.get_provisioned_concurrency_config(function_name, alias).await,
            &[codes::PROVISIONED_CONCURRENCY_CONFIG_NOT_FOUND, codes::RESOURCE_NOT_FOUND],
        )?
        .flatten();
        Ok(requested.map(|executions| ProvisionedConcurrencyConfig {
            provisioned_concurrent_executions: Some(executions),
        }))
    }

    async fn sync_provisioned_concurrency(
        &self,
        function_name: &str,
        alias: &str,
        desired: Option<&ProvisionedConcurrencyConfig>,
    ) -> Result<(), ReconcileError> {
        let requested = desired.and_then(|c| c.provisioned_concurrent_executions);
        let result = match requested {
            Some(executions) => {
                tracing::info!(function_name, alias, executions, "setting provisioned concurrency");
                self.api
                    .put_provisioned_concurrency_config(function_name, alias, executions)
                    .await
            }
            None => {
                tracing::info!(function_name, alias, "removing provisioned concurrency");
                match self.api.delete_provisioned_concurrency_config(function_name, alias).await {
                    Err(e) if e.is(codes::PROVISIONED_CONCURRENCY_CONFIG_NOT_FOUND) => Ok(()),
                    other => other,
                }
            }
        };
        result.map_err(|e| classify_api_error(e, &self.timing))
    }

    /// Removals run before additions so a changed statement can reuse its id.
    async fn sync_permissions(
        &self,
        function_name: &str,
        alias: &str,
        desired: &[Permission],
        observed: &[Permission],
    ) -> Result<(), ReconcileError> {
        let (remove, add) = permission_changes(desired, observed);
        for perm in &remove {
            let Some(statement_id) = perm.statement_id.as_deref() else {
                continue;
            };
            tracing::info!(function_name, alias, statement_id, "removing permission");
            match self.api.remove_permission(function_name, Some(alias), statement_id).await {
                Err(e) if e.is_not_found() => {}
                other => other.map_err(|e| classify_api_error(e, &self.timing))?,
            }
        }
        let qualified = format!("{function_name}:{alias}");
        for perm in &add {
            tracing::info!(function_name, alias, statement_id = ?perm.statement_id, "adding permission");
            self.api
                .add_permission(&qualified, None, perm)
                .await
                .map_err(|e| classify_api_error(e, &self.timing))?;
        }
        Ok(())
    }
}

impl ResourceManager for AliasManager {
    type Spec = AliasSpec;
    type Status = AliasStatus;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Alias
    }

    fn delta_policy(&self) -> &dyn DeltaPolicy<AliasSpec> {
        &AliasDeltaPolicy
    }

    fn terminal_codes(&self) -> &'static [&'static str] {
        &[codes::INVALID_PARAMETER_VALUE]
    }

    fn resolve_references<'a>(
        &'a self,
        resolver: &'a ReferenceResolver,
        desired: &'a Alias,
    ) -> BoxFuture<'a, Result<(Alias, bool), ReconcileError>> {
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

    fn clear_references(&self, original: &AliasSpec, resolved: &AliasSpec) -> AliasSpec {
        AliasSpec {
            function_name: original.function_name.clone(),
            ..resolved.clone()
        }
    }

    fn read<'a>(&'a self, desired: &'a Alias) -> BoxFuture<'a, Result<Option<Alias>, ReconcileError>> {
        Box::pin(async move {
            let function_name = require_function_name(desired.spec.function_name.as_ref())?;
            let alias = alias_name(desired);

            let Some(remote) = absent_on(
                self.api.get_alias(function_name, alias).await,
                &[codes::RESOURCE_NOT_FOUND],
            )?
            else {
                return Ok(None);
            };

            let mut spec = remote.spec;
            spec.name = desired.spec.name.clone();
            spec.function_name = desired.spec.function_name.clone();
            spec.function_ref = desired.spec.function_ref.clone();
            spec.function_event_invoke_config =
                read_event_invoke_config(self.api.as_ref(), function_name, Some(alias)).await?;
            spec.provisioned_concurrency_config = self.read_provisioned_concurrency(function_name, alias).await?;
            spec.permissions = Some(self.read_permissions(function_name, alias).await?);

            Ok(Some(merge_remote(desired, spec, remote.status)))
        })
    }

    fn create<'a>(&'a self, desired: &'a Alias) -> BoxFuture<'a, Result<Alias, ReconcileError>> {
        Box::pin(async move {
            let function_name = require_function_name(desired.spec.function_name.as_ref())?;
            let alias = alias_name(desired);
            let mut request = desired.spec.clone();
            request.name = Some(alias.to_string());

            tracing::info!(function_name, alias, version = ?desired.spec.function_version, "creating alias");
            let created = self
                .api
                .create_alias(&request)
                .await
                .map_err(|e| classify_api_error(e, &self.timing))?;

            if let Some(config) = &desired.spec.function_event_invoke_config {
                sync_event_invoke_config(self.api.as_ref(), &self.timing, function_name, Some(alias), Some(config))
                    .await?;
            }
            if desired.spec.provisioned_concurrency_config.is_some() {
                self.sync_provisioned_concurrency(
                    function_name,
                    alias,
                    desired.spec.provisioned_concurrency_config.as_ref(),
                )
                .await?;
            }
            if let Some(permissions) = &desired.spec.permissions {
                self.sync_permissions(function_name, alias, permissions, &[]).await?;
            }

            Ok(merge_remote(desired, desired.spec.clone(), created.status))
        })
    }

    fn update<'a>(
        &'a self,
        desired: &'a Alias,
        observed: &'a Alias,
        delta: &'a Delta,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Alias, ReconcileError>> {
        Box::pin(async move {
            let function_name = require_function_name(desired.spec.function_name.as_ref())?;
            let alias = alias_name(desired);

            if delta.different_except(SIDE_PATHS) {
                let mut request = desired.spec.clone();
                request.name = Some(alias.to_string());
                tracing::info!(function_name, alias, "updating alias");
                self.api
                    .update_alias(&request)
                    .await
                    .map_err(|e| classify_api_error(e, &self.timing))?;
            }
            if delta.different_at("functionEventInvokeConfig") {
                sync_event_invoke_config(
                    self.api.as_ref(),
                    &self.timing,
                    function_name,
                    Some(alias),
                    desired.spec.function_event_invoke_config.as_ref(),
                )
                .await?;
            }
            if delta.different_at("provisionedConcurrencyConfig") {
                self.sync_provisioned_concurrency(
                    function_name,
                    alias,
                    desired.spec.provisioned_concurrency_config.as_ref(),
                )
                .await?;
            }
            if delta.different_at("permissions") {
                self.sync_permissions(
                    function_name,
                    alias,
                    desired.spec.permissions.as_deref().unwrap_or_default(),
                    observed.spec.permissions.as_deref().unwrap_or_default(),
                )
                .await?;
            }

            self.read(desired).await?.ok_or_else(|| ReconcileError::NotFound {
                kind: ResourceKind::Alias,
                name: alias.to_string(),
            })
        })
    }

    fn delete<'a>(&'a self, observed: &'a Alias) -> BoxFuture<'a, Result<(), ReconcileError>> {
        Box::pin(async move {
            let function_name = require_function_name(observed.spec.function_name.as_ref())?;
            let alias = alias_name(observed);
            tracing::info!(function_name, alias, "deleting alias");
            match self.api.delete_alias(function_name, alias).await {
                Err(e) if e.is_not_found() => Ok(()),
                other => other.map_err(|e| classify_api_error(e, &self.timing)),
            }
        })
    }
}
