//! Turns symbolic references to other declared objects into concrete values.
//!
//! Lookups are read-only. A referenced object must be synced and must not
//! be terminal; a terminal target is reported as such even when it is also
//! unsynced, because retrying cannot help.

use std::sync::Arc;

use lambdactl_core::models::condition;
use lambdactl_core::models::reference::{ResourceReference, SecretKeyReference};
use lambdactl_core::{Condition, ConditionType};
use serde_json::Value;
use thiserror::Error;

use crate::error::format_err_chain;
use crate::manager::BoxFuture;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("{field} and {reference_field} cannot both be set")]
    BothSet {
        field: String,
        reference_field: String,
    },

    #[error("one of {field} or {reference_field} is required")]
    Missing {
        field: String,
        reference_field: String,
    },

    #[error("provided resource reference is nil or empty: {reference_field}")]
    EmptyName { reference_field: String },

    #[error("referenced {kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("referenced {kind} {namespace}/{name} is not synced yet")]
    NotSynced {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("referenced {kind} {namespace}/{name} is in a terminal state")]
    Terminal {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("referenced {kind} {namespace}/{name} has no value at {pointer}")]
    MissingTargetField {
        kind: String,
        namespace: String,
        name: String,
        pointer: String,
    },

    #[error("failed to read referenced {kind} {namespace}/{name}: {message}")]
    Lookup {
        kind: String,
        namespace: String,
        name: String,
        message: String,
    },
}

impl ReferenceError {
    /// Errors only the user can fix.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::BothSet { .. } | Self::Missing { .. } | Self::EmptyName { .. } | Self::Terminal { .. }
        )
    }
}

/// What kind of object a reference points at and where its value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetKind {
    pub group: &'static str,
    pub kind: &'static str,
    /// JSON pointer into the referenced object's document.
    pub pointer: &'static str,
}

pub mod targets {
    use super::TargetKind;

    pub const ROLE: TargetKind = TargetKind {
        group: "iam.services.k8s.aws",
        kind: "Role",
        pointer: "/status/ackResourceMetadata/arn",
    };
    pub const BUCKET: TargetKind = TargetKind {
        group: "s3.services.k8s.aws",
        kind: "Bucket",
        pointer: "/spec/name",
    };
    pub const KMS_KEY: TargetKind = TargetKind {
        group: "kms.services.k8s.aws",
        kind: "Key",
        pointer: "/status/ackResourceMetadata/arn",
    };
    pub const SUBNET: TargetKind = TargetKind {
        group: "ec2.services.k8s.aws",
        kind: "Subnet",
        pointer: "/status/subnetID",
    };
    pub const SECURITY_GROUP: TargetKind = TargetKind {
        group: "ec2.services.k8s.aws",
        kind: "SecurityGroup",
        pointer: "/status/id",
    };
    pub const FUNCTION: TargetKind = TargetKind {
        group: "lambda.services.k8s.aws",
        kind: "Function",
        pointer: "/spec/name",
    };
}

/// A referenced object as read from its owning store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferencedObject {
    pub conditions: Vec<Condition>,
    /// The whole object, including `spec` and `status`.
    pub document: Value,
}

pub type LookupError = Box<dyn std::error::Error + Send + Sync>;

/// Read access to other declared objects and secrets.
pub trait ReferenceReader: Send + Sync {
    fn get<'a>(
        &'a self,
        target: &'a TargetKind,
        namespace: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<ReferencedObject>, LookupError>>;

    fn secret<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, LookupError>>;
}

#[derive(Clone)]
pub struct ReferenceResolver {
    reader: Arc<dyn ReferenceReader>,
}

impl ReferenceResolver {
    pub fn new(reader: Arc<dyn ReferenceReader>) -> Self {
        Self { reader }
    }

    /// Resolve a literal field and its reference counterpart. Returns the
    /// literal when no reference is set.
    #[allow(clippy::too_many_arguments)]
    pub async fn resolve_field(
        &self,
        namespace: &str,
        field: &str,
        reference_field: &str,
        literal: Option<&String>,
        reference: Option<&ResourceReference>,
        target: &TargetKind,
        required: bool,
    ) -> Result<Option<String>, ReferenceError> {
        let reference_field = reference_field.to_string();
        match (literal, reference) {
            (Some(_), Some(_)) => Err(ReferenceError::BothSet {
                field: field.to_string(),
                reference_field,
            }),
            (None, Some(r)) => self
                .resolve_reference(namespace, &reference_field, r, target)
                .await
                .map(Some),
            (None, None) if required => Err(ReferenceError::Missing {
                field: field.to_string(),
                reference_field,
            }),
            (literal, None) => Ok(literal.cloned()),
        }
    }

    /// Resolve a list field backed by a parallel list of references.
    pub async fn resolve_list(
        &self,
        namespace: &str,
        field: &str,
        reference_field: &str,
        literals: Option<&Vec<String>>,
        references: Option<&Vec<ResourceReference>>,
        target: &TargetKind,
    ) -> Result<Option<Vec<String>>, ReferenceError> {
        let literals = literals.filter(|l| !l.is_empty());
        let references = references.filter(|r| !r.is_empty());
        match (literals, references) {
            (Some(_), Some(_)) => Err(ReferenceError::BothSet {
                field: field.to_string(),
                reference_field: reference_field.to_string(),
            }),
            (None, Some(refs)) => {
                let mut values = Vec::with_capacity(refs.len());
                for r in refs {
                    values.push(self.resolve_reference(namespace, reference_field, r, target).await?);
                }
                Ok(Some(values))
            }
            (literals, None) => Ok(literals.cloned()),
        }
    }

    pub async fn resolve_reference(
        &self,
        namespace: &str,
        reference_field: &str,
        reference: &ResourceReference,
        target: &TargetKind,
    ) -> Result<String, ReferenceError> {
        let from = reference.from.as_ref();
        let name = from
            .and_then(|f| f.name.as_deref())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ReferenceError::EmptyName {
                reference_field: reference_field.to_string(),
            })?;
        let namespace = from
            .and_then(|f| f.namespace.as_deref())
            .filter(|n| !n.is_empty())
            .unwrap_or(namespace);

        let ident = || (target.kind.to_string(), namespace.to_string(), name.to_string());

        let object = self
            .reader
            .get(target, namespace, name)
            .await
            .map_err(|e| {
                let (kind, namespace, name) = ident();
                ReferenceError::Lookup {
                    kind,
                    namespace,
                    name,
                    message: format_err_chain(e.as_ref()),
                }
            })?
            .ok_or_else(|| {
                let (kind, namespace, name) = ident();
                ReferenceError::NotFound { kind, namespace, name }
            })?;

        if condition::is_true(&object.conditions, ConditionType::Terminal) {
            let (kind, namespace, name) = ident();
            return Err(ReferenceError::Terminal { kind, namespace, name });
        }
        if !condition::is_true(&object.conditions, ConditionType::ResourceSynced) {
            let (kind, namespace, name) = ident();
            return Err(ReferenceError::NotSynced { kind, namespace, name });
        }

        let value = object
            .document
            .pointer(target.pointer)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                let (kind, namespace, name) = ident();
                ReferenceError::MissingTargetField {
                    kind,
                    namespace,
                    name,
                    pointer: target.pointer.to_string(),
                }
            })?;

        tracing::debug!(
            kind = target.kind,
            namespace,
            name,
            field = reference_field,
            "resolved reference"
        );
        Ok(value.to_string())
    }

    pub async fn resolve_secret(
        &self,
        namespace: &str,
        selector: &SecretKeyReference,
    ) -> Result<String, ReferenceError> {
        let namespace = selector
            .namespace
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(namespace);
        let ident = || ("Secret".to_string(), namespace.to_string(), selector.name.clone());
        self.reader
            .secret(namespace, &selector.name, &selector.key)
            .await
            .map_err(|e| {
                let (kind, namespace, name) = ident();
                ReferenceError::Lookup {
                    kind,
                    namespace,
                    name,
                    message: format_err_chain(e.as_ref()),
                }
            })?
            .ok_or_else(|| {
                let (kind, namespace, name) = ident();
                ReferenceError::MissingTargetField {
                    kind,
                    namespace,
                    name,
                    pointer: format!("/data/{}", selector.key),
                }
            })
    }
}
