use lambdactl_core::ResourceKind;
use thiserror::Error;

use crate::references::ReferenceError;
use crate::requeue::RequeueDirective;

/// Lambda service error codes the reconciler reacts to.
pub mod codes {
    pub const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";
    pub const INVALID_PARAMETER_VALUE: &str = "InvalidParameterValueException";
    pub const RESOURCE_CONFLICT: &str = "ResourceConflictException";
    pub const RESOURCE_NOT_READY: &str = "ResourceNotReadyException";
    pub const EVENT_INVOKE_CONFIG_NOT_FOUND: &str = "EventInvokeConfigNotFoundException";
    pub const PROVISIONED_CONCURRENCY_CONFIG_NOT_FOUND: &str =
        "ProvisionedConcurrencyConfigNotFoundException";
}

/// A failed call to the remote service, reduced to its machine-readable code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation}: {code}: {message}")]
pub struct ApiError {
    pub operation: String,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }

    pub fn is_not_found(&self) -> bool {
        self.is(codes::RESOURCE_NOT_FOUND)
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("resource not found: {kind}/{name}")]
    NotFound { kind: ResourceKind, name: String },

    #[error("terminal error: {0}")]
    Terminal(String),

    #[error("{0}")]
    Requeue(RequeueDirective),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("update failed: {0}")]
    UpdateFailed(String),

    #[error("reconciliation cancelled")]
    Cancelled,

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RequeueDirective> for ReconcileError {
    fn from(directive: RequeueDirective) -> Self {
        Self::Requeue(directive)
    }
}

impl ReconcileError {
    /// Prepend resource identity to the error message.
    pub fn with_resource(self, kind: ResourceKind, name: &str) -> Self {
        match self {
            Self::Terminal(msg) => Self::Terminal(format!("{kind} ({name}): {msg}")),
            Self::UpdateFailed(msg) => Self::UpdateFailed(format!("{kind} ({name}): {msg}")),
            Self::Persistence(msg) => Self::Persistence(format!("{kind} ({name}): {msg}")),
            other => other,
        }
    }

    pub fn requeue_directive(&self) -> Option<&RequeueDirective> {
        match self {
            Self::Requeue(directive) => Some(directive),
            _ => None,
        }
    }
}

/// Walk the full error chain and join all causes into one string.
///
/// AWS SDK errors often have terse `Display` impls (e.g. "service error")
/// but useful detail in the source chain.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
