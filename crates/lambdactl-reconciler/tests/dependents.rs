mod common;

use std::sync::Arc;

use lambdactl_core::models::alias::{Alias, AliasSpec, Permission};
use lambdactl_core::models::code_signing_config::{
    AllowedPublishers, CodeSigningConfig, CodeSigningConfigSpec, CodeSigningPolicies,
};
use lambdactl_core::models::event_source_mapping::{EventSourceMapping, EventSourceMappingSpec};
use lambdactl_core::models::function::{FunctionSpec, FunctionStatus};
use lambdactl_core::models::function_url_config::{Cors, FunctionUrlConfig, FunctionUrlConfigSpec};
use lambdactl_core::models::invoke::EventInvokeConfig;
use lambdactl_core::models::layer_version::{LayerVersion, LayerVersionSpec, LayerVersionStatus};
use lambdactl_core::models::reference::ResourceReference;
use lambdactl_core::models::version::{Version, VersionSpec};
use lambdactl_core::{ConditionStatus, ConditionType, ObjectMeta, Resource, ResourceKind};
use lambdactl_reconciler::resources::alias::AliasManager;
use lambdactl_reconciler::resources::code_signing_config::CodeSigningConfigManager;
use lambdactl_reconciler::resources::event_source_mapping::EventSourceMappingManager;
use lambdactl_reconciler::resources::function_url_config::FunctionUrlConfigManager;
use lambdactl_reconciler::resources::layer_version::LayerVersionManager;
use lambdactl_reconciler::resources::version::VersionManager;
use lambdactl_reconciler::{
    Disposition, FileStatusStore, ReferenceResolver, Reconciler, ResourceManager, StatusStore,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::{FakeLambda, FakeReferences, csc_arn, fast_timing, find, function_arn, synced};

fn meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: name.into(),
        namespace: "default".into(),
        deletion_requested: false,
    }
}

fn object<S, T: Default>(name: &str, spec: S) -> Resource<S, T> {
    Resource {
        metadata: meta(name),
        spec,
        status: T::default(),
    }
}

fn reconciler<M: ResourceManager>(
    manager: M,
    references: Arc<FakeReferences>,
    dir: &tempfile::TempDir,
) -> (Reconciler<M>, Arc<FileStatusStore>) {
    let store = Arc::new(FileStatusStore::new(dir.path()));
    let reconciler = Reconciler::new(
        manager,
        ReferenceResolver::new(references),
        store.clone(),
        fast_timing(),
    );
    (reconciler, store)
}

fn seed_function(api: &FakeLambda) {
    api.with_function(
        FunctionSpec {
            name: Some("f".into()),
            role: Some("arn:aws:iam::123456789012:role/exec".into()),
            memory_size: Some(128),
            ..Default::default()
        },
        FunctionStatus {
            state: Some("Active".into()),
            code_sha256: Some("sha:v1.zip".into()),
            ..Default::default()
        },
    );
}

// ── Versions ───────────────────────────────────────────────────────

#[tokio::test]
async fn version_is_published_once() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeLambda::new();
    seed_function(&api);
    let (reconciler, _) = reconciler(
        VersionManager::new(api.clone(), fast_timing()),
        FakeReferences::new(),
        &dir,
    );
    let cancel = CancellationToken::new();
    let desired: Version = object(
        "f-v1",
        VersionSpec {
            function_name: Some("f".into()),
            description: Some("first".into()),
            function_event_invoke_config: Some(EventInvokeConfig {
                maximum_retry_attempts: Some(1),
                ..Default::default()
            }),
            ..Default::default()
        },
    );

    let first = reconciler.reconcile(&desired, &cancel).await.unwrap();
    assert_eq!(first.disposition, Disposition::Done);
    assert_eq!(
        api.mutations(),
        vec!["PublishVersion", "PutFunctionEventInvokeConfig:1"]
    );
    assert_eq!(first.object.status.version.as_deref(), Some("1"));

    api.clear_calls();
    let second = reconciler.reconcile(&first.object, &cancel).await.unwrap();
    assert_eq!(second.disposition, Disposition::Done);
    assert!(api.mutations().is_empty(), "{:?}", api.mutations());
    assert_eq!(api.state.lock().unwrap().versions.len(), 1);
}

#[tokio::test]
async fn published_version_survives_a_failed_invoke_config() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeLambda::new();
    seed_function(&api);
    let (reconciler, store) = reconciler(
        VersionManager::new(api.clone(), fast_timing()),
        FakeReferences::new(),
        &dir,
    );
    let cancel = CancellationToken::new();
    let desired: Version = object(
        "f-v1",
        VersionSpec {
            function_name: Some("f".into()),
            function_event_invoke_config: Some(EventInvokeConfig {
                maximum_retry_attempts: Some(1),
                ..Default::default()
            }),
            ..Default::default()
        },
    );
    api.fail("PutFunctionEventInvokeConfig", "ServiceException");

    let first = reconciler.reconcile(&desired, &cancel).await.unwrap();
    assert_eq!(first.disposition, Disposition::RequeueAfter(fast_timing().pending()));
    assert_eq!(first.object.status.version.as_deref(), Some("1"));
    assert!(first.object.spec.function_event_invoke_config.is_some());
    let record = store.load(ResourceKind::Version, &desired.metadata).await.unwrap().unwrap();
    assert_eq!(record["status"]["version"], json!("1"));

    api.heal("PutFunctionEventInvokeConfig");
    api.clear_calls();
    let second = reconciler.reconcile(&first.object, &cancel).await.unwrap();
    assert_eq!(second.disposition, Disposition::Done);
    assert_eq!(api.mutations(), vec!["PutFunctionEventInvokeConfig:1"]);
    assert_eq!(api.state.lock().unwrap().versions.len(), 1);
}

#[tokio::test]
async fn version_function_ref_waits_for_the_function() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeLambda::new();
    let references = FakeReferences::new();
    let (reconciler, _) = reconciler(
        VersionManager::new(api.clone(), fast_timing()),
        references.clone(),
        &dir,
    );
    let desired: Version = object(
        "f-v1",
        VersionSpec {
            function_ref: Some(ResourceReference::named("f")),
            ..Default::default()
        },
    );

    let outcome = reconciler.reconcile(&desired, &CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.disposition, Disposition::RetryWithBackoff(fast_timing().error_backoff()));
    assert!(api.calls().is_empty());

    seed_function(&api);
    references.insert("Function", "f", synced(), json!({"spec": {"name": "f"}}));
    let outcome = reconciler.reconcile(&outcome.object, &CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.disposition, Disposition::Done);
    assert_eq!(api.mutations(), vec!["PublishVersion"]);
    assert_eq!(outcome.object.spec.function_name, None);
    assert!(find(&outcome.object.status.conditions, ConditionType::Recoverable)
        .is_some_and(|c| c.status == ConditionStatus::False));
}

// ── Aliases ────────────────────────────────────────────────────────

fn invoke_from_s3() -> Permission {
    Permission {
        statement_id: Some("s3-invoke".into()),
        action: Some("lambda:InvokeFunction".into()),
        principal: Some("s3.amazonaws.com".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn alias_permissions_are_added_on_the_qualified_function() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeLambda::new();
    seed_function(&api);
    let (reconciler, _) = reconciler(
        AliasManager::new(api.clone(), fast_timing()),
        FakeReferences::new(),
        &dir,
    );
    let cancel = CancellationToken::new();
    let desired: Alias = object(
        "live",
        AliasSpec {
            name: Some("live".into()),
            function_name: Some("f".into()),
            function_version: Some("1".into()),
            permissions: Some(vec![invoke_from_s3()]),
            ..Default::default()
        },
    );

    let first = reconciler.reconcile(&desired, &cancel).await.unwrap();
    assert_eq!(first.disposition, Disposition::Done);
    assert_eq!(api.mutations(), vec!["CreateAlias", "AddPermission:f:live"]);

    api.clear_calls();
    let second = reconciler.reconcile(&first.object, &cancel).await.unwrap();
    assert_eq!(second.disposition, Disposition::Done);
    assert!(api.mutations().is_empty(), "{:?}", api.mutations());

    // Dropping the statement removes it by id on the alias qualifier.
    api.clear_calls();
    let mut without = second.object.clone();
    without.spec.permissions = Some(Vec::new());
    let third = reconciler.reconcile(&without, &cancel).await.unwrap();
    assert_eq!(third.disposition, Disposition::Done);
    assert_eq!(api.mutations(), vec!["RemovePermission:f:live:s3-invoke"]);
}

// ── Event source mappings ──────────────────────────────────────────

#[tokio::test]
async fn mapping_in_transition_is_requeued() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeLambda::new();
    let timing = fast_timing();
    let (reconciler, _) = reconciler(
        EventSourceMappingManager::new(api.clone(), timing.clone()),
        FakeReferences::new(),
        &dir,
    );
    let cancel = CancellationToken::new();
    let desired: EventSourceMapping = object(
        "queue",
        EventSourceMappingSpec {
            function_name: Some("f".into()),
            event_source_arn: Some("arn:aws:sqs:us-west-2:123456789012:jobs".into()),
            batch_size: Some(5),
            ..Default::default()
        },
    );

    let created = reconciler.reconcile(&desired, &cancel).await.unwrap();
    assert_eq!(created.disposition, Disposition::RequeueAfter(timing.esm_transitional()));
    let uuid = created.object.status.uuid.clone().unwrap();
    // The persisted spec keeps the name as written, not the ARN.
    assert_eq!(created.object.spec.function_name.as_deref(), Some("f"));

    // Still creating: a change has to wait.
    let mut bigger = created.object.clone();
    bigger.spec.batch_size = Some(50);
    api.clear_calls();
    let waiting = reconciler.reconcile(&bigger, &cancel).await.unwrap();
    assert_eq!(waiting.disposition, Disposition::RequeueAfter(timing.esm_transitional()));
    assert!(api.mutations().is_empty());

    api.state.lock().unwrap().mappings.get_mut(&uuid).unwrap().status.state = Some("Enabled".into());
    let updated = reconciler.reconcile(&bigger, &cancel).await.unwrap();
    assert_eq!(api.mutations(), vec!["UpdateEventSourceMapping:clear_filters=false"]);
    // The update itself puts the mapping back into a transitional state.
    assert_eq!(updated.disposition, Disposition::RequeueAfter(timing.esm_transitional()));
    assert_eq!(api.state.lock().unwrap().mappings[&uuid].spec.batch_size, Some(50));
}

// ── Layer versions ─────────────────────────────────────────────────

#[tokio::test]
async fn layer_delete_removes_older_versions_first() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeLambda::new();
    api.state
        .lock()
        .unwrap()
        .layers
        .insert("deps".into(), vec![1, 2, 3]);
    let (reconciler, store) = reconciler(
        LayerVersionManager::new(api.clone(), fast_timing()),
        FakeReferences::new(),
        &dir,
    );
    let mut layer: LayerVersion = object(
        "deps",
        LayerVersionSpec {
            layer_name: Some("deps".into()),
            ..Default::default()
        },
    );
    layer.status = LayerVersionStatus {
        version_number: Some(3),
        ..Default::default()
    };
    let record = serde_json::to_value(&layer).unwrap();
    store.save(ResourceKind::LayerVersion, &layer.metadata, &record).await.unwrap();

    layer.metadata.deletion_requested = true;
    let outcome = reconciler.reconcile(&layer, &CancellationToken::new()).await.unwrap();

    assert!(outcome.deleted);
    assert_eq!(
        api.mutations(),
        vec!["DeleteLayerVersion:1", "DeleteLayerVersion:2", "DeleteLayerVersion:3"]
    );
    assert!(store.load(ResourceKind::LayerVersion, &layer.metadata).await.unwrap().is_none());
}

/// A stored layer at version 3 with deletion requested.
async fn layer_marked_for_deletion(store: &FileStatusStore) -> LayerVersion {
    let mut layer: LayerVersion = object(
        "deps",
        LayerVersionSpec {
            layer_name: Some("deps".into()),
            ..Default::default()
        },
    );
    layer.status = LayerVersionStatus {
        version_number: Some(3),
        ..Default::default()
    };
    let record = serde_json::to_value(&layer).unwrap();
    store.save(ResourceKind::LayerVersion, &layer.metadata, &record).await.unwrap();
    layer.metadata.deletion_requested = true;
    layer
}

#[tokio::test]
async fn failed_layer_delete_keeps_the_record() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeLambda::new();
    api.state.lock().unwrap().layers.insert("deps".into(), vec![1, 2, 3]);
    api.fail("DeleteLayerVersion:2", "ServiceException");
    let (reconciler, store) = reconciler(
        LayerVersionManager::new(api.clone(), fast_timing()),
        FakeReferences::new(),
        &dir,
    );
    let layer = layer_marked_for_deletion(&store).await;

    let outcome = reconciler.reconcile(&layer, &CancellationToken::new()).await.unwrap();

    assert!(!outcome.deleted);
    assert_eq!(outcome.disposition, Disposition::RetryWithBackoff(fast_timing().error_backoff()));
    assert_eq!(api.mutations(), vec!["DeleteLayerVersion:1", "DeleteLayerVersion:2"]);
    assert_eq!(api.state.lock().unwrap().layers["deps"], vec![2, 3]);
    let recoverable = find(&outcome.object.status.conditions, ConditionType::Recoverable).unwrap();
    assert!(recoverable.message.as_deref().unwrap().contains("ServiceException"));
    assert!(store.load(ResourceKind::LayerVersion, &layer.metadata).await.unwrap().is_some());
}

#[tokio::test]
async fn failed_layer_listing_deletes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeLambda::new();
    api.state.lock().unwrap().layers.insert("deps".into(), vec![1, 2, 3]);
    // The second page, after versions 3 and 2.
    api.fail("ListLayerVersions:2", "ServiceException");
    let (reconciler, store) = reconciler(
        LayerVersionManager::new(api.clone(), fast_timing()),
        FakeReferences::new(),
        &dir,
    );
    let layer = layer_marked_for_deletion(&store).await;

    let outcome = reconciler.reconcile(&layer, &CancellationToken::new()).await.unwrap();

    assert!(!outcome.deleted);
    assert_eq!(outcome.disposition, Disposition::RetryWithBackoff(fast_timing().error_backoff()));
    assert!(api.calls().contains(&"ListLayerVersions:2".to_string()));
    assert!(api.mutations().is_empty(), "{:?}", api.mutations());
    assert_eq!(api.state.lock().unwrap().layers["deps"], vec![1, 2, 3]);
}

#[tokio::test]
async fn changed_layer_is_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeLambda::new();
    let (reconciler, _) = reconciler(
        LayerVersionManager::new(api.clone(), fast_timing()),
        FakeReferences::new(),
        &dir,
    );
    let cancel = CancellationToken::new();
    let desired: LayerVersion = object(
        "deps",
        LayerVersionSpec {
            layer_name: Some("deps".into()),
            description: Some("one".into()),
            ..Default::default()
        },
    );

    let first = reconciler.reconcile(&desired, &cancel).await.unwrap();
    assert_eq!(first.disposition, Disposition::Done);
    assert_eq!(first.object.status.version_number, Some(1));

    let mut changed = first.object.clone();
    changed.spec.description = Some("two".into());
    let second = reconciler.reconcile(&changed, &cancel).await.unwrap();
    assert_eq!(second.disposition, Disposition::Terminal);
    assert!(find(&second.object.status.conditions, ConditionType::Terminal).is_some_and(|c| c.is_true()));
    assert_eq!(api.mutations(), vec!["PublishLayerVersion"]);
}

// ── Function URLs ──────────────────────────────────────────────────

#[tokio::test]
async fn removed_cors_is_cleared() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeLambda::new();
    let (reconciler, _) = reconciler(
        FunctionUrlConfigManager::new(api.clone(), fast_timing()),
        FakeReferences::new(),
        &dir,
    );
    let cancel = CancellationToken::new();
    let desired: FunctionUrlConfig = object(
        "f-url",
        FunctionUrlConfigSpec {
            function_name: Some("f".into()),
            auth_type: Some("NONE".into()),
            cors: Some(Cors {
                allow_origins: Some(vec!["https://example.com".into()]),
                ..Default::default()
            }),
            ..Default::default()
        },
    );

    let first = reconciler.reconcile(&desired, &cancel).await.unwrap();
    assert_eq!(first.disposition, Disposition::Done);
    assert_eq!(
        first.object.status.function_arn.as_deref(),
        Some(function_arn("f").as_str())
    );

    let mut without = first.object.clone();
    without.spec.cors = None;
    api.clear_calls();
    let second = reconciler.reconcile(&without, &cancel).await.unwrap();
    assert_eq!(second.disposition, Disposition::Done);
    assert_eq!(api.mutations(), vec!["UpdateFunctionUrlConfig"]);
    assert_eq!(api.state.lock().unwrap().urls[&("f".to_string(), None)].spec.cors, None);
}

// ── Code signing configs ───────────────────────────────────────────

fn signing_spec(description: &str) -> CodeSigningConfigSpec {
    CodeSigningConfigSpec {
        allowed_publishers: Some(AllowedPublishers {
            signing_profile_version_arns: vec![
                "arn:aws:signer:us-west-2:123456789012:/signing-profiles/p/1".into(),
            ],
        }),
        code_signing_policies: Some(CodeSigningPolicies {
            untrusted_artifact_on_deployment: Some("Warn".into()),
        }),
        description: Some(description.into()),
    }
}

#[tokio::test]
async fn code_signing_config_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeLambda::new();
    let (reconciler, store) = reconciler(
        CodeSigningConfigManager::new(api.clone(), fast_timing()),
        FakeReferences::new(),
        &dir,
    );
    let cancel = CancellationToken::new();
    let desired: CodeSigningConfig = object("signed", signing_spec("first"));

    let created = reconciler.reconcile(&desired, &cancel).await.unwrap();
    assert_eq!(created.disposition, Disposition::Done);
    assert_eq!(created.object.arn(), Some(csc_arn("csc-0001").as_str()));
    assert_eq!(created.object.status.code_signing_config_id.as_deref(), Some("csc-0001"));

    let mut changed = created.object.clone();
    changed.spec.description = Some("new description".into());
    let updated = reconciler.reconcile(&changed, &cancel).await.unwrap();
    assert_eq!(updated.disposition, Disposition::Done);
    assert_eq!(
        api.state.lock().unwrap().code_signing_configs[&csc_arn("csc-0001")]
            .spec
            .description
            .as_deref(),
        Some("new description")
    );

    let mut doomed = updated.object.clone();
    doomed.metadata.deletion_requested = true;
    let deleted = reconciler.reconcile(&doomed, &cancel).await.unwrap();
    assert!(deleted.deleted);
    assert_eq!(
        api.mutations(),
        vec!["CreateCodeSigningConfig", "UpdateCodeSigningConfig", "DeleteCodeSigningConfig"]
    );
    assert!(api.state.lock().unwrap().code_signing_configs.is_empty());
    assert!(store.load(ResourceKind::CodeSigningConfig, &doomed.metadata).await.unwrap().is_none());
}

#[tokio::test]
async fn code_signing_config_without_arn_is_created_not_looked_up() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeLambda::new();
    let (reconciler, _) = reconciler(
        CodeSigningConfigManager::new(api.clone(), fast_timing()),
        FakeReferences::new(),
        &dir,
    );
    let desired: CodeSigningConfig = object("signed", signing_spec("first"));

    reconciler.reconcile(&desired, &CancellationToken::new()).await.unwrap();

    assert_eq!(api.calls(), vec!["CreateCodeSigningConfig"]);
}

#[tokio::test]
async fn code_signing_config_without_publishers_is_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeLambda::new();
    let (reconciler, _) = reconciler(
        CodeSigningConfigManager::new(api.clone(), fast_timing()),
        FakeReferences::new(),
        &dir,
    );
    let desired: CodeSigningConfig = object(
        "signed",
        CodeSigningConfigSpec {
            description: Some("no publishers".into()),
            ..Default::default()
        },
    );

    let outcome = reconciler.reconcile(&desired, &CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.disposition, Disposition::Terminal);
    assert!(outcome.object.arn().is_none());
    assert!(find(&outcome.object.status.conditions, ConditionType::Terminal).is_some_and(|c| c.is_true()));
}
