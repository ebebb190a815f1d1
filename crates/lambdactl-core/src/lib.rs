//! lambdactl-core
//!
//! Plain records for the Lambda reconciler: object metadata, status
//! conditions, cross-object references, and the Spec/Status shapes of every
//! managed resource kind. Nothing here talks to AWS; the reconciler crate
//! and whatever persists the objects share these types.

pub mod error;
pub mod models;

pub use crate::error::CoreError;
pub use crate::models::condition::{Condition, ConditionStatus, ConditionType};
pub use crate::models::meta::{ObjectMeta, ObjectStatus, Resource, ResourceKind, ResourceMetadata};
