//! lambdactl-reconciler
//!
//! Reconciliation core for declared AWS Lambda objects: functions,
//! versions, aliases, event source mappings, layer versions and function
//! URLs.
//!
//! Public API:
//! - [`Reconciler::reconcile`]: one pass over one object (resolve
//!   references, read, create or diff and update, project conditions)
//! - [`schedule::run`]: drive a set of objects until they settle
//! - [`LambdaApi`]: the remote surface, with [`AwsLambdaApi`] over the SDK
//! - [`StatusStore`]: where each pass writes its outcome

pub mod api;
pub mod aws;
pub mod conditions;
pub mod config;
pub mod delta;
pub mod error;
pub mod manager;
pub mod persistence;
pub mod reconcile;
pub mod references;
pub mod requeue;
pub mod resources;
pub mod schedule;
pub mod wait;

pub use crate::api::LambdaApi;
pub use crate::aws::AwsLambdaApi;
pub use crate::config::{ReconcilerConfig, Timing};
pub use crate::delta::{Delta, DeltaPolicy};
pub use crate::error::{ApiError, ReconcileError};
pub use crate::manager::ResourceManager;
pub use crate::persistence::{FileStatusStore, StatusStore};
pub use crate::reconcile::{Disposition, KindReconciler, Outcome, PassReport, Reconciler};
pub use crate::references::{ReferenceReader, ReferenceResolver};
pub use crate::requeue::RequeueDirective;
pub use crate::schedule::{Declared, Registry, RunSummary};
