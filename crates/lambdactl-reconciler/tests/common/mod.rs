//! In-memory stand-ins for the Lambda service and the reference store.
#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use lambdactl_core::models::alias::{AliasSpec, AliasStatus, Permission};
use lambdactl_core::models::code_signing_config::{CodeSigningConfigSpec, CodeSigningConfigStatus};
use lambdactl_core::models::event_source_mapping::{EventSourceMappingSpec, EventSourceMappingStatus};
use lambdactl_core::models::function::{FunctionSpec, FunctionStatus};
use lambdactl_core::models::function_url_config::{FunctionUrlConfigSpec, FunctionUrlConfigStatus};
use lambdactl_core::models::invoke::EventInvokeConfig;
use lambdactl_core::models::layer_version::{LayerVersionSpec, LayerVersionStatus};
use lambdactl_core::{Condition, ConditionStatus, ConditionType, ResourceMetadata};
use lambdactl_reconciler::Timing;
use lambdactl_reconciler::api::{
    AliasDescription, ApiResult, CodeSigningConfigDescription, CodeUpdate, Described, EventSourceMappingDescription,
    FunctionDescription, FunctionUrlConfigDescription, LambdaApi, LayerVersionDescription,
    LayerVersionPage, PublishVersion,
};
use lambdactl_reconciler::error::{ApiError, codes};
use lambdactl_reconciler::manager::BoxFuture;
use lambdactl_reconciler::references::{LookupError, ReferenceReader, ReferencedObject, TargetKind};
use serde_json::Value;

pub const ACCOUNT: &str = "123456789012";

pub fn function_arn(name: &str) -> String {
    format!("arn:aws:lambda:us-west-2:{ACCOUNT}:function:{name}")
}

pub fn fast_timing() -> Timing {
    Timing {
        poll_interval_ms: 1,
        poll_deadline_secs: 1,
        ..Timing::default()
    }
}

fn not_found(operation: &str, what: &str) -> ApiError {
    ApiError::new(operation, codes::RESOURCE_NOT_FOUND, format!("{what} not found"))
}

#[derive(Default)]
pub struct FakeState {
    pub functions: BTreeMap<String, FunctionDescription>,
    pub versions: BTreeMap<(String, String), FunctionDescription>,
    pub tags: BTreeMap<String, BTreeMap<String, String>>,
    pub concurrency: BTreeMap<String, i64>,
    pub event_invoke: BTreeMap<(String, Option<String>), EventInvokeConfig>,
    pub aliases: BTreeMap<(String, String), AliasDescription>,
    pub permissions: BTreeMap<String, Vec<Permission>>,
    pub mappings: BTreeMap<String, EventSourceMappingDescription>,
    pub layers: BTreeMap<String, Vec<i64>>,
    pub layer_specs: BTreeMap<(String, i64), LayerVersionSpec>,
    pub urls: BTreeMap<(String, Option<String>), FunctionUrlConfigDescription>,
    /// Keyed by ARN.
    pub code_signing_configs: BTreeMap<String, CodeSigningConfigDescription>,
    /// Every call in order, as `Operation` or `Operation:detail`.
    pub calls: Vec<String>,
    /// Error codes returned for matching calls until healed.
    pub failures: BTreeMap<String, String>,
    /// `LastUpdateStatus` values handed out by successive GetFunction calls
    /// after a code update; empty means the update completes at once.
    pub update_statuses: VecDeque<String>,
}

#[derive(Default)]
pub struct FakeLambda {
    pub state: Mutex<FakeState>,
}

impl FakeLambda {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed a function the service already has.
    pub fn with_function(&self, mut spec: FunctionSpec, status: FunctionStatus) {
        let name = spec.name.clone().unwrap_or_default();
        if let Some(tags) = spec.tags.take() {
            self.state.lock().unwrap().tags.insert(function_arn(&name), tags);
        }
        let status = FunctionStatus {
            ack_resource_metadata: Some(ResourceMetadata {
                arn: Some(function_arn(&name)),
                owner_account_id: Some(ACCOUNT.into()),
                region: Some("us-west-2".into()),
            }),
            ..status
        };
        self.state
            .lock()
            .unwrap()
            .functions
            .insert(name, Described { spec, status });
    }

    pub fn set_function_state(&self, name: &str, state: &str) {
        let mut s = self.state.lock().unwrap();
        if let Some(f) = s.functions.get_mut(name) {
            f.status.state = Some(state.to_string());
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls that change remote state.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !(c.starts_with("Get") || c.starts_with("List")))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Fail every call matching `call` (`Operation` or `Operation:detail`)
    /// with `code` until [`FakeLambda::heal`].
    pub fn fail(&self, call: &str, code: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(call.to_string(), code.to_string());
    }

    pub fn heal(&self, call: &str) {
        self.state.lock().unwrap().failures.remove(call);
    }

    /// Make the next code update report these statuses, one per GetFunction.
    pub fn script_update_statuses(&self, statuses: &[&str]) {
        self.state.lock().unwrap().update_statuses = statuses.iter().map(|s| s.to_string()).collect();
    }

    fn record(&self, call: impl Into<String>) -> std::sync::MutexGuard<'_, FakeState> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(call.into());
        s
    }

    /// Record a call and answer with an injected failure if one matches.
    fn attempt(&self, call: impl Into<String>) -> Result<std::sync::MutexGuard<'_, FakeState>, ApiError> {
        let call = call.into();
        let s = self.record(call.clone());
        let injected = s
            .failures
            .iter()
            .find(|(key, _)| {
                call == **key || call.strip_prefix(key.as_str()).is_some_and(|rest| rest.starts_with(':'))
            })
            .map(|(_, code)| code.clone());
        match injected {
            Some(code) => {
                let operation = call.split(':').next().unwrap_or_default().to_string();
                Err(ApiError::new(operation, code, "simulated failure"))
            }
            None => Ok(s),
        }
    }
}

macro_rules! attempt {
    ($fake:expr, $call:expr) => {
        match $fake.attempt($call) {
            Ok(s) => s,
            Err(e) => return ready(Err(e)),
        }
    };
}

/// Overwrite every field set on `patch`.
fn apply_patch(spec: &FunctionSpec, patch: &FunctionSpec) -> FunctionSpec {
    let mut base = serde_json::to_value(spec).unwrap();
    if let (Value::Object(base), Value::Object(patch)) = (&mut base, serde_json::to_value(patch).unwrap()) {
        for (k, v) in patch {
            if k != "name" && !v.is_null() {
                base.insert(k, v);
            }
        }
    }
    serde_json::from_value(base).unwrap()
}

fn ready<T: Send + 'static>(value: T) -> BoxFuture<'static, T> {
    Box::pin(async move { value })
}

impl LambdaApi for FakeLambda {
    fn get_function<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ApiResult<FunctionDescription>> {
        let mut s = attempt!(self, "GetFunction");
        let in_progress = s
            .functions
            .get(name)
            .is_some_and(|f| f.status.last_update_status.as_deref() == Some("InProgress"));
        if in_progress {
            let next = s.update_statuses.pop_front().unwrap_or_else(|| "Successful".to_string());
            if let Some(f) = s.functions.get_mut(name) {
                if next == "Failed" {
                    f.status.last_update_status_reason = Some("package could not be unzipped".into());
                }
                f.status.last_update_status = Some(next);
            }
        }
        let result = s.functions.get(name).cloned().map(|mut f| {
            let arn = function_arn(name);
            f.spec.tags = s.tags.get(&arn).filter(|t| !t.is_empty()).cloned();
            f
        });
        ready(result.ok_or_else(|| not_found("GetFunction", name)))
    }

    fn get_function_configuration<'a>(
        &'a self,
        name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<FunctionDescription>> {
        let s = self.record("GetFunctionConfiguration");
        let result = match qualifier {
            Some(q) => s.versions.get(&(name.to_string(), q.to_string())).cloned(),
            None => s.functions.get(name).cloned(),
        };
        ready(result.ok_or_else(|| not_found("GetFunctionConfiguration", name)))
    }

    fn create_function<'a>(&'a self, spec: &'a FunctionSpec) -> BoxFuture<'a, ApiResult<FunctionDescription>> {
        let mut s = self.record("CreateFunction");
        let name = spec.name.clone().unwrap_or_default();
        let arn = function_arn(&name);
        if let Some(tags) = &spec.tags {
            s.tags.insert(arn.clone(), tags.clone());
        }
        let stored = FunctionSpec {
            code: None,
            publish: None,
            tags: None,
            memory_size: spec.memory_size.or(Some(128)),
            timeout: spec.timeout.or(Some(3)),
            package_type: spec.package_type.clone().or(Some("Zip".into())),
            ..spec.clone()
        };
        let described = Described {
            spec: stored,
            status: FunctionStatus {
                ack_resource_metadata: Some(ResourceMetadata {
                    arn: Some(arn),
                    owner_account_id: Some(ACCOUNT.into()),
                    region: Some("us-west-2".into()),
                }),
                state: Some("Pending".into()),
                code_sha256: Some("sha:initial".into()),
                ..Default::default()
            },
        };
        s.functions.insert(name, described.clone());
        ready(Ok(described))
    }

    fn update_function_code<'a>(&'a self, update: &'a CodeUpdate) -> BoxFuture<'a, ApiResult<()>> {
        let mut s = attempt!(self, "UpdateFunctionCode");
        let completes = s.update_statuses.is_empty();
        let result = match s.functions.get_mut(&update.function_name) {
            Some(f) => {
                let locator = update
                    .s3_key
                    .clone()
                    .or_else(|| update.image_uri.clone())
                    .unwrap_or_default();
                f.status.code_sha256 = Some(format!("sha:{locator}"));
                f.status.last_update_status = Some(if completes { "Successful" } else { "InProgress" }.into());
                if let Some(arch) = &update.architectures {
                    f.spec.architectures = Some(arch.clone());
                }
                Ok(())
            }
            None => Err(not_found("UpdateFunctionCode", &update.function_name)),
        };
        ready(result)
    }

    fn update_function_configuration<'a>(&'a self, patch: &'a FunctionSpec) -> BoxFuture<'a, ApiResult<()>> {
        let mut s = attempt!(self, "UpdateFunctionConfiguration");
        let name = patch.name.clone().unwrap_or_default();
        let result = match s.functions.get_mut(&name) {
            Some(f) => {
                f.spec = apply_patch(&f.spec, patch);
                Ok(())
            }
            None => Err(not_found("UpdateFunctionConfiguration", &name)),
        };
        ready(result)
    }

    fn delete_function<'a>(&'a self, name: &'a str, qualifier: Option<&'a str>) -> BoxFuture<'a, ApiResult<()>> {
        let mut s = self.record(format!("DeleteFunction:{}", qualifier.unwrap_or("$LATEST")));
        let removed = match qualifier {
            Some(q) => s.versions.remove(&(name.to_string(), q.to_string())).is_some(),
            None => s.functions.remove(name).is_some(),
        };
        ready(if removed { Ok(()) } else { Err(not_found("DeleteFunction", name)) })
    }

    fn get_function_concurrency<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ApiResult<Option<i64>>> {
        let s = self.record("GetFunctionConcurrency");
        ready(Ok(s.concurrency.get(name).copied()))
    }

    fn put_function_concurrency<'a>(&'a self, name: &'a str, reserved: i64) -> BoxFuture<'a, ApiResult<()>> {
        let mut s = attempt!(self, "PutFunctionConcurrency");
        s.concurrency.insert(name.to_string(), reserved);
        ready(Ok(()))
    }

    fn delete_function_concurrency<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ApiResult<()>> {
        let mut s = self.record("DeleteFunctionConcurrency");
        s.concurrency.remove(name);
        ready(Ok(()))
    }

    fn get_function_code_signing_config<'a>(&'a self, _name: &'a str) -> BoxFuture<'a, ApiResult<Option<String>>> {
        let _s = self.record("GetFunctionCodeSigningConfig");
        ready(Ok(None))
    }

    fn put_function_code_signing_config<'a>(&'a self, _name: &'a str, _arn: &'a str) -> BoxFuture<'a, ApiResult<()>> {
        let _s = self.record("PutFunctionCodeSigningConfig");
        ready(Ok(()))
    }

    fn delete_function_code_signing_config<'a>(&'a self, _name: &'a str) -> BoxFuture<'a, ApiResult<()>> {
        let _s = self.record("DeleteFunctionCodeSigningConfig");
        ready(Ok(()))
    }

    fn get_function_event_invoke_config<'a>(
        &'a self,
        name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<EventInvokeConfig>> {
        let s = self.record("GetFunctionEventInvokeConfig");
        let key = (name.to_string(), qualifier.map(str::to_string));
        ready(s.event_invoke.get(&key).cloned().ok_or_else(|| {
            ApiError::new(
                "GetFunctionEventInvokeConfig",
                codes::EVENT_INVOKE_CONFIG_NOT_FOUND,
                "no config",
            )
        }))
    }

    fn put_function_event_invoke_config<'a>(
        &'a self,
        name: &'a str,
        qualifier: Option<&'a str>,
        config: &'a EventInvokeConfig,
    ) -> BoxFuture<'a, ApiResult<()>> {
        let mut s = attempt!(self, format!("PutFunctionEventInvokeConfig:{}", qualifier.unwrap_or("$LATEST")));
        s.event_invoke
            .insert((name.to_string(), qualifier.map(str::to_string)), config.clone());
        ready(Ok(()))
    }

    fn delete_function_event_invoke_config<'a>(
        &'a self,
        name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<()>> {
        let mut s = attempt!(self, "DeleteFunctionEventInvokeConfig");
        s.event_invoke
            .remove(&(name.to_string(), qualifier.map(str::to_string)));
        ready(Ok(()))
    }

    fn list_tags<'a>(&'a self, arn: &'a str) -> BoxFuture<'a, ApiResult<BTreeMap<String, String>>> {
        let s = self.record("ListTags");
        ready(Ok(s.tags.get(arn).cloned().unwrap_or_default()))
    }

    fn tag_resource<'a>(&'a self, arn: &'a str, tags: &'a BTreeMap<String, String>) -> BoxFuture<'a, ApiResult<()>> {
        let mut s = attempt!(self, format!(
            "TagResource:{}",
            tags.keys().cloned().collect::<Vec<_>>().join(",")
        ));
        s.tags.entry(arn.to_string()).or_default().extend(tags.clone());
        ready(Ok(()))
    }

    fn untag_resource<'a>(&'a self, arn: &'a str, keys: &'a [String]) -> BoxFuture<'a, ApiResult<()>> {
        let mut s = attempt!(self, format!("UntagResource:{}", keys.join(",")));
        if let Some(tags) = s.tags.get_mut(arn) {
            for key in keys {
                tags.remove(key);
            }
        }
        ready(Ok(()))
    }

    fn publish_version<'a>(&'a self, request: &'a PublishVersion) -> BoxFuture<'a, ApiResult<FunctionDescription>> {
        let mut s = attempt!(self, "PublishVersion");
        let Some(function) = s.functions.get(&request.function_name).cloned() else {
            return ready(Err(not_found("PublishVersion", &request.function_name)));
        };
        let number = s
            .versions
            .keys()
            .filter(|(f, _)| *f == request.function_name)
            .count()
            + 1;
        let version = number.to_string();
        let described = Described {
            spec: FunctionSpec {
                description: request.description.clone(),
                ..function.spec
            },
            status: FunctionStatus {
                ack_resource_metadata: Some(ResourceMetadata {
                    arn: Some(format!("{}:{version}", function_arn(&request.function_name))),
                    ..Default::default()
                }),
                state: Some("Active".into()),
                version: Some(version.clone()),
                code_sha256: function.status.code_sha256,
                ..Default::default()
            },
        };
        s.versions
            .insert((request.function_name.clone(), version), described.clone());
        ready(Ok(described))
    }

    fn create_alias<'a>(&'a self, spec: &'a AliasSpec) -> BoxFuture<'a, ApiResult<AliasDescription>> {
        let mut s = self.record("CreateAlias");
        let function_name = spec.function_name.clone().unwrap_or_default();
        let name = spec.name.clone().unwrap_or_default();
        let described = Described {
            spec: AliasSpec {
                name: spec.name.clone(),
                description: spec.description.clone(),
                function_version: spec.function_version.clone(),
                routing_config: spec.routing_config.clone(),
                ..Default::default()
            },
            status: AliasStatus {
                ack_resource_metadata: Some(ResourceMetadata {
                    arn: Some(format!("{}:{name}", function_arn(&function_name))),
                    ..Default::default()
                }),
                revision_id: Some("r1".into()),
                ..Default::default()
            },
        };
        s.aliases.insert((function_name, name), described.clone());
        ready(Ok(described))
    }

    fn get_alias<'a>(&'a self, function_name: &'a str, name: &'a str) -> BoxFuture<'a, ApiResult<AliasDescription>> {
        let s = self.record("GetAlias");
        ready(
            s.aliases
                .get(&(function_name.to_string(), name.to_string()))
                .cloned()
                .ok_or_else(|| not_found("GetAlias", name)),
        )
    }

    fn update_alias<'a>(&'a self, spec: &'a AliasSpec) -> BoxFuture<'a, ApiResult<AliasDescription>> {
        let mut s = self.record("UpdateAlias");
        let key = (
            spec.function_name.clone().unwrap_or_default(),
            spec.name.clone().unwrap_or_default(),
        );
        let result = match s.aliases.get_mut(&key) {
            Some(alias) => {
                alias.spec.description = spec.description.clone();
                alias.spec.function_version = spec.function_version.clone();
                alias.spec.routing_config = spec.routing_config.clone();
                Ok(alias.clone())
            }
            None => Err(not_found("UpdateAlias", &key.1)),
        };
        ready(result)
    }

    fn delete_alias<'a>(&'a self, function_name: &'a str, name: &'a str) -> BoxFuture<'a, ApiResult<()>> {
        let mut s = self.record("DeleteAlias");
        s.aliases.remove(&(function_name.to_string(), name.to_string()));
        ready(Ok(()))
    }

    fn get_provisioned_concurrency_config<'a>(
        &'a self,
        _function_name: &'a str,
        _qualifier: &'a str,
    ) -> BoxFuture<'a, ApiResult<Option<i64>>> {
        let _s = self.record("GetProvisionedConcurrencyConfig");
        ready(Err(ApiError::new(
            "GetProvisionedConcurrencyConfig",
            codes::PROVISIONED_CONCURRENCY_CONFIG_NOT_FOUND,
            "no config",
        )))
    }

    fn put_provisioned_concurrency_config<'a>(
        &'a self,
        _function_name: &'a str,
        _qualifier: &'a str,
        _executions: i64,
    ) -> BoxFuture<'a, ApiResult<()>> {
        let _s = self.record("PutProvisionedConcurrencyConfig");
        ready(Ok(()))
    }

    fn delete_provisioned_concurrency_config<'a>(
        &'a self,
        _function_name: &'a str,
        _qualifier: &'a str,
    ) -> BoxFuture<'a, ApiResult<()>> {
        let _s = self.record("DeleteProvisionedConcurrencyConfig");
        ready(Ok(()))
    }

    fn get_policy<'a>(&'a self, function_name: &'a str, _qualifier: Option<&'a str>) -> BoxFuture<'a, ApiResult<String>> {
        let s = self.record("GetPolicy");
        let result = match s.permissions.get(function_name).filter(|p| !p.is_empty()) {
            None => Err(not_found("GetPolicy", function_name)),
            Some(perms) => {
                let statements: Vec<Value> = perms
                    .iter()
                    .map(|p| {
                        serde_json::json!({
                            "Sid": p.statement_id,
                            "Effect": "Allow",
                            "Principal": {"Service": p.principal},
                            "Action": p.action,
                        })
                    })
                    .collect();
                Ok(serde_json::json!({"Version": "2012-10-17", "Statement": statements}).to_string())
            }
        };
        ready(result)
    }

    fn add_permission<'a>(
        &'a self,
        function_name: &'a str,
        _qualifier: Option<&'a str>,
        permission: &'a Permission,
    ) -> BoxFuture<'a, ApiResult<()>> {
        let mut s = self.record(format!("AddPermission:{function_name}"));
        s.permissions
            .entry(function_name.to_string())
            .or_default()
            .push(permission.clone());
        ready(Ok(()))
    }

    fn remove_permission<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: Option<&'a str>,
        statement_id: &'a str,
    ) -> BoxFuture<'a, ApiResult<()>> {
        let qualified = match qualifier {
            Some(q) => format!("{function_name}:{q}"),
            None => function_name.to_string(),
        };
        let mut s = self.record(format!("RemovePermission:{qualified}:{statement_id}"));
        if let Some(perms) = s.permissions.get_mut(&qualified) {
            perms.retain(|p| p.statement_id.as_deref() != Some(statement_id));
        }
        ready(Ok(()))
    }

    fn create_event_source_mapping<'a>(
        &'a self,
        spec: &'a EventSourceMappingSpec,
    ) -> BoxFuture<'a, ApiResult<EventSourceMappingDescription>> {
        let mut s = self.record("CreateEventSourceMapping");
        let uuid = format!("esm-{}", s.mappings.len() + 1);
        let function_name = spec.function_name.clone().unwrap_or_default();
        let described = Described {
            spec: EventSourceMappingSpec {
                function_name: Some(function_arn(&function_name)),
                function_ref: None,
                batch_size: spec.batch_size.or(Some(10)),
                ..spec.clone()
            },
            status: EventSourceMappingStatus {
                function_arn: Some(function_arn(&function_name)),
                state: Some("Creating".into()),
                uuid: Some(uuid.clone()),
                ..Default::default()
            },
        };
        s.mappings.insert(uuid, described.clone());
        ready(Ok(described))
    }

    fn get_event_source_mapping<'a>(&'a self, uuid: &'a str) -> BoxFuture<'a, ApiResult<EventSourceMappingDescription>> {
        let s = self.record("GetEventSourceMapping");
        ready(s.mappings.get(uuid).cloned().ok_or_else(|| not_found("GetEventSourceMapping", uuid)))
    }

    fn update_event_source_mapping<'a>(
        &'a self,
        uuid: &'a str,
        spec: &'a EventSourceMappingSpec,
        clear_filters: bool,
    ) -> BoxFuture<'a, ApiResult<EventSourceMappingDescription>> {
        let mut s = self.record(format!("UpdateEventSourceMapping:clear_filters={clear_filters}"));
        let result = match s.mappings.get_mut(uuid) {
            Some(m) => {
                let function_name = m.spec.function_name.clone();
                m.spec = EventSourceMappingSpec {
                    function_name,
                    function_ref: None,
                    filter_criteria: if clear_filters { None } else { spec.filter_criteria.clone() },
                    ..spec.clone()
                };
                m.status.state = Some("Updating".into());
                Ok(m.clone())
            }
            None => Err(not_found("UpdateEventSourceMapping", uuid)),
        };
        ready(result)
    }

    fn delete_event_source_mapping<'a>(&'a self, uuid: &'a str) -> BoxFuture<'a, ApiResult<()>> {
        let mut s = self.record("DeleteEventSourceMapping");
        if let Some(m) = s.mappings.get_mut(uuid) {
            m.status.state = Some("Deleting".into());
        }
        ready(Ok(()))
    }

    fn publish_layer_version<'a>(&'a self, spec: &'a LayerVersionSpec) -> BoxFuture<'a, ApiResult<LayerVersionDescription>> {
        let mut s = self.record("PublishLayerVersion");
        let name = spec.layer_name.clone().unwrap_or_default();
        let versions = s.layers.entry(name.clone()).or_default();
        let version = versions.iter().max().copied().unwrap_or(0) + 1;
        versions.push(version);
        s.layer_specs.insert((name.clone(), version), spec.clone());
        ready(Ok(layer_description(&name, spec, version)))
    }

    fn get_layer_version<'a>(&'a self, layer_name: &'a str, version: i64) -> BoxFuture<'a, ApiResult<LayerVersionDescription>> {
        let s = self.record("GetLayerVersion");
        let exists = s.layers.get(layer_name).is_some_and(|v| v.contains(&version));
        ready(if exists {
            let spec = s
                .layer_specs
                .get(&(layer_name.to_string(), version))
                .cloned()
                .unwrap_or_default();
            Ok(layer_description(layer_name, &spec, version))
        } else {
            Err(not_found("GetLayerVersion", layer_name))
        })
    }

    /// Pages of two, newest first.
    fn list_layer_versions<'a>(
        &'a self,
        layer_name: &'a str,
        marker: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<LayerVersionPage>> {
        let s = attempt!(self, format!("ListLayerVersions:{}", marker.unwrap_or("first")));
        let mut all = s.layers.get(layer_name).cloned().unwrap_or_default();
        all.sort_unstable_by(|a, b| b.cmp(a));
        let start: usize = marker.and_then(|m| m.parse().ok()).unwrap_or(0);
        let end = (start + 2).min(all.len());
        ready(Ok(LayerVersionPage {
            versions: all[start..end].to_vec(),
            next_marker: (end < all.len()).then(|| end.to_string()),
        }))
    }

    fn delete_layer_version<'a>(&'a self, layer_name: &'a str, version: i64) -> BoxFuture<'a, ApiResult<()>> {
        let mut s = attempt!(self, format!("DeleteLayerVersion:{version}"));
        if let Some(versions) = s.layers.get_mut(layer_name) {
            versions.retain(|v| *v != version);
        }
        ready(Ok(()))
    }

    fn create_function_url_config<'a>(
        &'a self,
        spec: &'a FunctionUrlConfigSpec,
    ) -> BoxFuture<'a, ApiResult<FunctionUrlConfigDescription>> {
        let mut s = self.record("CreateFunctionUrlConfig");
        let function_name = spec.function_name.clone().unwrap_or_default();
        let described = url_description(&function_name, spec);
        s.urls.insert((function_name, spec.qualifier.clone()), described.clone());
        ready(Ok(described))
    }

    fn get_function_url_config<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<FunctionUrlConfigDescription>> {
        let s = self.record("GetFunctionUrlConfig");
        ready(
            s.urls
                .get(&(function_name.to_string(), qualifier.map(str::to_string)))
                .cloned()
                .ok_or_else(|| not_found("GetFunctionUrlConfig", function_name)),
        )
    }

    fn update_function_url_config<'a>(
        &'a self,
        spec: &'a FunctionUrlConfigSpec,
    ) -> BoxFuture<'a, ApiResult<FunctionUrlConfigDescription>> {
        let mut s = self.record("UpdateFunctionUrlConfig");
        let function_name = spec.function_name.clone().unwrap_or_default();
        let mut described = url_description(&function_name, spec);
        // An empty CORS block clears the settings.
        if described.spec.cors.as_ref().is_some_and(|c| *c == Default::default()) {
            described.spec.cors = None;
        }
        s.urls.insert((function_name, spec.qualifier.clone()), described.clone());
        ready(Ok(described))
    }

    fn delete_function_url_config<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<()>> {
        let mut s = self.record("DeleteFunctionUrlConfig");
        s.urls.remove(&(function_name.to_string(), qualifier.map(str::to_string)));
        ready(Ok(()))
    }

    fn create_code_signing_config<'a>(
        &'a self,
        spec: &'a CodeSigningConfigSpec,
    ) -> BoxFuture<'a, ApiResult<CodeSigningConfigDescription>> {
        let mut s = attempt!(self, "CreateCodeSigningConfig");
        if spec.allowed_publishers.is_none() {
            return ready(Err(ApiError::new(
                "CreateCodeSigningConfig",
                codes::INVALID_PARAMETER_VALUE,
                "allowedPublishers is required",
            )));
        }
        let id = format!("csc-{:04}", s.code_signing_configs.len() + 1);
        let described = csc_description(&id, spec);
        s.code_signing_configs.insert(csc_arn(&id), described.clone());
        ready(Ok(described))
    }

    fn get_code_signing_config<'a>(&'a self, arn: &'a str) -> BoxFuture<'a, ApiResult<CodeSigningConfigDescription>> {
        let s = attempt!(self, "GetCodeSigningConfig");
        ready(
            s.code_signing_configs
                .get(arn)
                .cloned()
                .ok_or_else(|| not_found("GetCodeSigningConfig", arn)),
        )
    }

    fn update_code_signing_config<'a>(
        &'a self,
        arn: &'a str,
        spec: &'a CodeSigningConfigSpec,
    ) -> BoxFuture<'a, ApiResult<CodeSigningConfigDescription>> {
        let mut s = attempt!(self, "UpdateCodeSigningConfig");
        let Some(existing) = s.code_signing_configs.get(arn) else {
            return ready(Err(not_found("UpdateCodeSigningConfig", arn)));
        };
        let id = existing.status.code_signing_config_id.clone().unwrap_or_default();
        let described = csc_description(&id, spec);
        s.code_signing_configs.insert(arn.to_string(), described.clone());
        ready(Ok(described))
    }

    fn delete_code_signing_config<'a>(&'a self, arn: &'a str) -> BoxFuture<'a, ApiResult<()>> {
        let mut s = attempt!(self, "DeleteCodeSigningConfig");
        ready(match s.code_signing_configs.remove(arn) {
            Some(_) => Ok(()),
            None => Err(not_found("DeleteCodeSigningConfig", arn)),
        })
    }
}

pub fn csc_arn(id: &str) -> String {
    format!("arn:aws:lambda:us-west-2:123456789012:code-signing-config:{id}")
}

fn csc_description(id: &str, spec: &CodeSigningConfigSpec) -> CodeSigningConfigDescription {
    Described {
        spec: CodeSigningConfigSpec {
            description: spec.description.clone().filter(|d| !d.is_empty()),
            ..spec.clone()
        },
        status: CodeSigningConfigStatus {
            ack_resource_metadata: Some(ResourceMetadata {
                arn: Some(csc_arn(id)),
                owner_account_id: Some("123456789012".into()),
                region: Some("us-west-2".into()),
            }),
            code_signing_config_id: Some(id.to_string()),
            last_modified: Some("2026-10-17T00:00:00Z".into()),
            ..Default::default()
        },
    }
}

fn layer_description(name: &str, spec: &LayerVersionSpec, version: i64) -> LayerVersionDescription {
    let layer_arn = format!("arn:aws:lambda:us-west-2:{ACCOUNT}:layer:{name}");
    Described {
        spec: LayerVersionSpec {
            layer_name: None,
            content: None,
            ..spec.clone()
        },
        status: LayerVersionStatus {
            ack_resource_metadata: Some(ResourceMetadata {
                arn: Some(format!("{layer_arn}:{version}")),
                ..Default::default()
            }),
            layer_arn: Some(layer_arn),
            version_number: Some(version),
            ..Default::default()
        },
    }
}

fn url_description(function_name: &str, spec: &FunctionUrlConfigSpec) -> FunctionUrlConfigDescription {
    Described {
        spec: FunctionUrlConfigSpec {
            auth_type: spec.auth_type.clone(),
            cors: spec.cors.clone(),
            ..Default::default()
        },
        status: FunctionUrlConfigStatus {
            function_arn: Some(function_arn(function_name)),
            function_url: Some(format!("https://{function_name}.lambda-url.us-west-2.on.aws/")),
            ..Default::default()
        },
    }
}

/// Referenced objects and secrets keyed by `(kind, namespace, name)`.
#[derive(Default)]
pub struct FakeReferences {
    pub objects: Mutex<BTreeMap<(String, String, String), ReferencedObject>>,
    pub secrets: Mutex<BTreeMap<(String, String, String), String>>,
}

impl FakeReferences {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, kind: &str, name: &str, conditions: Vec<Condition>, document: Value) {
        self.objects.lock().unwrap().insert(
            (kind.to_string(), "default".to_string(), name.to_string()),
            ReferencedObject { conditions, document },
        );
    }

    pub fn insert_secret(&self, name: &str, key: &str, value: &str) {
        self.secrets.lock().unwrap().insert(
            ("default".to_string(), name.to_string(), key.to_string()),
            value.to_string(),
        );
    }
}

impl ReferenceReader for FakeReferences {
    fn get<'a>(
        &'a self,
        target: &'a TargetKind,
        namespace: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<ReferencedObject>, LookupError>> {
        let found = self
            .objects
            .lock()
            .unwrap()
            .get(&(target.kind.to_string(), namespace.to_string(), name.to_string()))
            .cloned();
        Box::pin(async move { Ok(found) })
    }

    fn secret<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, LookupError>> {
        let found = self
            .secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string(), key.to_string()))
            .cloned();
        Box::pin(async move { Ok(found) })
    }
}

pub fn condition(type_: ConditionType, status: ConditionStatus) -> Condition {
    Condition::new(type_, status, None)
}

pub fn synced() -> Vec<Condition> {
    vec![condition(ConditionType::ResourceSynced, ConditionStatus::True)]
}

pub fn find(conditions: &[Condition], type_: ConditionType) -> Option<&Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}
