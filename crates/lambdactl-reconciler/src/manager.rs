use std::future::Future;
use std::pin::Pin;

use lambdactl_core::models::meta::ObjectStatus;
use lambdactl_core::{Resource, ResourceKind};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::delta::{Delta, DeltaPolicy};
use crate::error::ReconcileError;
use crate::references::ReferenceResolver;
use crate::requeue::RequeueDirective;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The declared object a manager works on.
pub type Object<M> = Resource<<M as ResourceManager>::Spec, <M as ResourceManager>::Status>;

/// One impl per resource kind. Selected by kind when the reconciler is built.
pub trait ResourceManager: Send + Sync + Sized {
    type Spec: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static;
    type Status: ObjectStatus + Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static;

    fn kind(&self) -> ResourceKind;

    fn delta_policy(&self) -> &dyn DeltaPolicy<Self::Spec>;

    /// Service error codes that no retry can fix.
    fn terminal_codes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Replace symbolic references with concrete values. The flag reports
    /// whether the spec used any references at all.
    fn resolve_references<'a>(
        &'a self,
        _resolver: &'a ReferenceResolver,
        desired: &'a Object<Self>,
    ) -> BoxFuture<'a, Result<(Object<Self>, bool), ReconcileError>> {
        let resolved = desired.clone();
        Box::pin(async move { Ok((resolved, false)) })
    }

    /// Put the symbolic form of every referenced field from `original` back
    /// into `resolved`, so concrete values found through references are
    /// never persisted.
    fn clear_references(&self, _original: &Self::Spec, resolved: &Self::Spec) -> Self::Spec {
        resolved.clone()
    }

    /// Read current state from AWS. None = doesn't exist yet.
    fn read<'a>(
        &'a self,
        desired: &'a Object<Self>,
    ) -> BoxFuture<'a, Result<Option<Object<Self>>, ReconcileError>>;

    fn create<'a>(&'a self, desired: &'a Object<Self>) -> BoxFuture<'a, Result<Object<Self>, ReconcileError>>;

    /// Converge `observed` toward `desired` given their `delta`, then re-read.
    fn update<'a>(
        &'a self,
        desired: &'a Object<Self>,
        observed: &'a Object<Self>,
        delta: &'a Delta,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Object<Self>, ReconcileError>>;

    fn delete<'a>(&'a self, observed: &'a Object<Self>) -> BoxFuture<'a, Result<(), ReconcileError>>;

    /// `Some` while the remote object is still settling after a successful pass.
    fn settling(&self, _latest: &Object<Self>) -> Option<RequeueDirective> {
        None
    }
}

/// Build an object that keeps `base`'s identity and conditions but carries
/// the given spec and the remote status fields of `remote`.
pub fn merge_remote<S: Clone, T: ObjectStatus + Clone>(
    base: &Resource<S, T>,
    spec: S,
    remote: T,
) -> Resource<S, T> {
    let mut status = remote;
    status.set_conditions(base.status.conditions().to_vec());
    if status.resource_metadata().is_none() {
        if let Some(meta) = base.status.resource_metadata() {
            *status.resource_metadata_mut() = meta.clone();
        }
    }
    Resource {
        metadata: base.metadata.clone(),
        spec,
        status,
    }
}
