//! One reconciliation pass: resolve references, read, create or diff and
//! update, then project the outcome onto conditions and persist it.
//!
//! A pass never loops. Anything that needs another look later comes back
//! as a [`Disposition`] for the caller's scheduler.

use std::sync::Arc;
use std::time::Duration;

use lambdactl_core::models::meta::ObjectStatus;
use lambdactl_core::{Resource, ResourceKind};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::conditions::{self, ErrorClass};
use crate::config::Timing;
use crate::delta;
use crate::error::ReconcileError;
use crate::manager::{BoxFuture, Object, ResourceManager};
use crate::persistence::StatusStore;
use crate::references::ReferenceResolver;
use crate::requeue::RequeueDirective;

/// What the scheduler should do with the object after this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Converged. Nothing to do until the object changes.
    Done,
    /// Look again after the delay; not an error.
    RequeueAfter(Duration),
    /// A recoverable error; retry after the delay.
    RetryWithBackoff(Duration),
    /// Only a change to the object can help.
    Terminal,
}

#[derive(Debug, Clone)]
pub struct Outcome<S, T> {
    pub object: Resource<S, T>,
    pub disposition: Disposition,
    /// The remote object is gone and the stored record was removed.
    pub deleted: bool,
}

/// Runs passes for one resource kind.
pub struct Reconciler<M: ResourceManager> {
    manager: M,
    resolver: ReferenceResolver,
    store: Arc<dyn StatusStore>,
    timing: Timing,
}

impl<M: ResourceManager> Reconciler<M> {
    pub fn new(manager: M, resolver: ReferenceResolver, store: Arc<dyn StatusStore>, timing: Timing) -> Self {
        Self {
            manager,
            resolver,
            store,
            timing,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.manager.kind()
    }

    /// Run one pass over `desired`. Pass failures end up in the returned
    /// object's conditions; only a failure to persist them is an `Err`.
    pub async fn reconcile(
        &self,
        desired: &Object<M>,
        cancel: &CancellationToken,
    ) -> Result<Outcome<M::Spec, M::Status>, ReconcileError> {
        let kind = self.manager.kind();
        let span = tracing::info_span!(
            "reconcile",
            kind = %kind,
            namespace = %desired.metadata.namespace,
            name = %desired.metadata.name,
        );
        async move {
            if desired.metadata.deletion_requested {
                return self.finalize(desired).await;
            }

            let (object, result) = match self.converge(desired, cancel).await {
                Ok((object, settling)) => (object, Ok(settling)),
                Err(e) => (desired.clone(), Err(e)),
            };
            let (object, disposition) = self.conclude(object, result);
            self.persist(&object).await?;
            Ok(Outcome {
                object,
                disposition,
                deleted: false,
            })
        }
        .instrument(span)
        .await
    }

    async fn converge(
        &self,
        desired: &Object<M>,
        cancel: &CancellationToken,
    ) -> Result<(Object<M>, Option<RequeueDirective>), ReconcileError> {
        let manager = &self.manager;
        let kind = manager.kind();
        let name = desired.metadata.name.as_str();
        let policy = manager.delta_policy();

        let (resolved, uses_references) = manager
            .resolve_references(&self.resolver, desired)
            .await
            .map_err(|e| e.with_resource(kind, name))?;
        if uses_references {
            tracing::debug!("references resolved");
        }

        let mut unfinished = None;
        let latest = match manager.read(&resolved).await.map_err(|e| e.with_resource(kind, name))? {
            None => {
                tracing::info!("remote object not found, creating");
                let created = manager.create(&resolved).await.map_err(|e| e.with_resource(kind, name))?;
                // Identifiers are kept even when part of the create fell short.
                let remaining = delta::compute(
                    policy,
                    &policy.late_initialize(&resolved.spec, &created.spec),
                    &created.spec,
                );
                if !remaining.is_empty() {
                    tracing::warn!(delta = %remaining, "created object not fully configured");
                    unfinished = Some(RequeueDirective::after(
                        format!("created, {} field(s) left for the next pass", remaining.len()),
                        self.timing.pending(),
                    ));
                }
                created
            }
            Some(observed) => {
                let target = Resource {
                    metadata: resolved.metadata.clone(),
                    spec: policy.late_initialize(&resolved.spec, &observed.spec),
                    status: resolved.status.clone(),
                };
                let delta = delta::compute(policy, &target.spec, &observed.spec);
                if delta.is_empty() {
                    tracing::debug!("in sync");
                    observed
                } else {
                    tracing::info!(differences = delta.len(), delta = %delta, "remote object differs");
                    manager
                        .update(&target, &observed, &delta, cancel)
                        .await
                        .map_err(|e| e.with_resource(kind, name))?
                }
            }
        };

        let settling = manager.settling(&latest).or(unfinished);
        // Persist what the user asked for plus server defaults, never the
        // values found through references.
        let spec = manager.clear_references(&desired.spec, &policy.late_initialize(&resolved.spec, &latest.spec));
        let object = Resource {
            metadata: desired.metadata.clone(),
            spec,
            status: latest.status,
        };
        Ok((object, settling))
    }

    async fn finalize(&self, desired: &Object<M>) -> Result<Outcome<M::Spec, M::Status>, ReconcileError> {
        let result = async {
            let (resolved, _) = self.manager.resolve_references(&self.resolver, desired).await?;
            match self.manager.read(&resolved).await? {
                Some(observed) => self.manager.delete(&observed).await,
                None => {
                    tracing::debug!("remote object already gone");
                    Ok(())
                }
            }
        }
        .await;

        match result {
            Ok(()) => {
                tracing::info!("deleted");
                self.store.remove(self.manager.kind(), &desired.metadata).await?;
                Ok(Outcome {
                    object: desired.clone(),
                    disposition: Disposition::Done,
                    deleted: true,
                })
            }
            Err(e) => {
                let (object, disposition) = self.conclude(desired.clone(), Err(e));
                self.persist(&object).await?;
                Ok(Outcome {
                    object,
                    disposition,
                    deleted: false,
                })
            }
        }
    }

    /// Project the pass result onto conditions and pick the disposition.
    fn conclude(
        &self,
        mut object: Object<M>,
        result: Result<Option<RequeueDirective>, ReconcileError>,
    ) -> (Object<M>, Disposition) {
        let terminal_codes = self.manager.terminal_codes();
        let err = result.as_ref().err();
        let (mut list, changed) = conditions::project(object.status.conditions(), err, terminal_codes);

        let disposition = match &result {
            Ok(None) => {
                conditions::set_synced(&mut list, true, None);
                Disposition::Done
            }
            Ok(Some(settling)) => {
                tracing::debug!(cause = %settling.cause, delay_ms = settling.delay.as_millis() as u64, "settling");
                conditions::set_synced(&mut list, false, Some(settling.cause.clone()));
                Disposition::RequeueAfter(settling.delay)
            }
            Err(e) => {
                conditions::set_synced(&mut list, false, Some(e.to_string()));
                match (e.requeue_directive(), conditions::classify(e, terminal_codes)) {
                    (Some(directive), _) => {
                        tracing::info!(cause = %directive.cause, delay_ms = directive.delay.as_millis() as u64, "requeue");
                        Disposition::RequeueAfter(directive.delay)
                    }
                    (None, Some(ErrorClass::Terminal)) => {
                        tracing::error!(error = %e, "terminal error");
                        Disposition::Terminal
                    }
                    (None, _) => {
                        if conditions::is_reference_pending(e) {
                            tracing::info!(error = %e, "waiting for referenced object");
                        } else {
                            tracing::warn!(error = %e, "recoverable error");
                        }
                        Disposition::RetryWithBackoff(self.timing.error_backoff())
                    }
                }
            }
        };
        if changed {
            tracing::debug!("error conditions changed");
        }
        object.status.set_conditions(list);
        (object, disposition)
    }

    async fn persist(&self, object: &Object<M>) -> Result<(), ReconcileError> {
        let record = serde_json::to_value(object)?;
        self.store.save(self.manager.kind(), &object.metadata, &record).await
    }
}

/// Summary of a pass for callers that only hold a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
    pub disposition: Disposition,
    pub deleted: bool,
    /// The object as persisted, or the last known form when deleted.
    pub object: Value,
}

/// A [`Reconciler`] with its kind erased, so one map can hold all kinds.
pub trait KindReconciler: Send + Sync {
    fn kind(&self) -> ResourceKind;

    fn reconcile_document<'a>(
        &'a self,
        document: Value,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<PassReport, ReconcileError>>;
}

impl<M: ResourceManager + 'static> KindReconciler for Reconciler<M> {
    fn kind(&self) -> ResourceKind {
        self.manager.kind()
    }

    fn reconcile_document<'a>(
        &'a self,
        document: Value,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<PassReport, ReconcileError>> {
        Box::pin(async move {
            let desired: Object<M> = serde_json::from_value(document)?;
            let outcome = self.reconcile(&desired, cancel).await?;
            Ok(PassReport {
                kind: self.manager.kind(),
                namespace: outcome.object.metadata.namespace.clone(),
                name: outcome.object.metadata.name.clone(),
                disposition: outcome.disposition,
                deleted: outcome.deleted,
                object: serde_json::to_value(&outcome.object)?,
            })
        })
    }
}
