use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use lambdactl_core::ResourceKind;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::api::LambdaApi;
use crate::config::Timing;
use crate::error::ReconcileError;
use crate::persistence::StatusStore;
use crate::reconcile::{Disposition, KindReconciler, PassReport, Reconciler};
use crate::references::ReferenceResolver;
use crate::resources::alias::AliasManager;
use crate::resources::code_signing_config::CodeSigningConfigManager;
use crate::resources::event_source_mapping::EventSourceMappingManager;
use crate::resources::function::FunctionManager;
use crate::resources::function_url_config::FunctionUrlConfigManager;
use crate::resources::layer_version::LayerVersionManager;
use crate::resources::version::VersionManager;

/// A declared object as loaded by the caller, before its kind is known to
/// the type system.
#[derive(Debug, Clone, PartialEq)]
pub struct Declared {
    pub kind: ResourceKind,
    pub document: Value,
}

/// One reconciler per kind, sharing the API client, resolver and store.
pub struct Registry {
    reconcilers: HashMap<ResourceKind, Box<dyn KindReconciler>>,
}

impl Registry {
    pub fn new(
        api: Arc<dyn LambdaApi>,
        resolver: ReferenceResolver,
        store: Arc<dyn StatusStore>,
        timing: Timing,
    ) -> Self {
        let mut reconcilers: HashMap<ResourceKind, Box<dyn KindReconciler>> = HashMap::new();
        let mut register = |r: Box<dyn KindReconciler>| {
            reconcilers.insert(r.kind(), r);
        };
        register(Box::new(Reconciler::new(
            CodeSigningConfigManager::new(api.clone(), timing.clone()),
            resolver.clone(),
            store.clone(),
            timing.clone(),
        )));
        register(Box::new(Reconciler::new(
            FunctionManager::new(api.clone(), timing.clone()),
            resolver.clone(),
            store.clone(),
            timing.clone(),
        )));
        register(Box::new(Reconciler::new(
            VersionManager::new(api.clone(), timing.clone()),
            resolver.clone(),
            store.clone(),
            timing.clone(),
        )));
        register(Box::new(Reconciler::new(
            AliasManager::new(api.clone(), timing.clone()),
            resolver.clone(),
            store.clone(),
            timing.clone(),
        )));
        register(Box::new(Reconciler::new(
            EventSourceMappingManager::new(api.clone(), timing.clone()),
            resolver.clone(),
            store.clone(),
            timing.clone(),
        )));
        register(Box::new(Reconciler::new(
            LayerVersionManager::new(api.clone(), timing.clone()),
            resolver.clone(),
            store.clone(),
            timing.clone(),
        )));
        register(Box::new(Reconciler::new(
            FunctionUrlConfigManager::new(api, timing.clone()),
            resolver,
            store,
            timing,
        )));
        Self { reconcilers }
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&dyn KindReconciler> {
        self.reconcilers.get(&kind).map(|r| r.as_ref())
    }
}

/// Where a run left each object.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Objects that converged, were deleted or went terminal.
    pub settled: Vec<PassReport>,
    /// Objects still waiting on a requeue or retry when the run stopped.
    pub unsettled: Vec<PassReport>,
    pub passes: u32,
}

/// Reconcile `objects` until each one settles, honouring requeue delays
/// between passes, for at most `max_passes` passes.
///
/// Objects are visited in kind order so that a code signing config is
/// synced before the functions that name it, and a function before the
/// versions and aliases that reference it.
pub async fn run(
    registry: &Registry,
    mut objects: Vec<Declared>,
    max_passes: u32,
    cancel: &CancellationToken,
) -> Result<RunSummary, ReconcileError> {
    objects.sort_by_key(|o| ResourceKind::ALL.iter().position(|k| *k == o.kind));
    let mut summary = RunSummary::default();

    while !objects.is_empty() && summary.passes < max_passes {
        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }
        summary.passes += 1;
        tracing::info!(pass = summary.passes, objects = objects.len(), "starting pass");

        let mut again = Vec::new();
        let mut unsettled = Vec::new();
        let mut wait: Option<Duration> = None;
        for object in objects {
            let reconciler = registry
                .get(object.kind)
                .ok_or_else(|| ReconcileError::Config(format!("no reconciler for kind {}", object.kind)))?;
            let report = reconciler.reconcile_document(object.document, cancel).await?;
            match report.disposition {
                Disposition::RequeueAfter(delay) | Disposition::RetryWithBackoff(delay) => {
                    wait = Some(wait.map_or(delay, |w| w.min(delay)));
                    again.push(Declared {
                        kind: report.kind,
                        document: report.object.clone(),
                    });
                    unsettled.push(report);
                }
                Disposition::Done | Disposition::Terminal => summary.settled.push(report),
            }
        }

        objects = again;
        summary.unsettled = unsettled;
        if objects.is_empty() || summary.passes >= max_passes {
            break;
        }
        if let Some(delay) = wait {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "waiting before next pass");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(ReconcileError::Cancelled),
            }
        }
    }

    if !summary.unsettled.is_empty() {
        tracing::warn!(
            unsettled = summary.unsettled.len(),
            passes = summary.passes,
            "pass limit reached with objects still requeued"
        );
    }
    Ok(summary)
}
