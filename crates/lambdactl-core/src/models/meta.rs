use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::condition::Condition;

/// The seven Lambda object kinds the reconciler manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Function,
    Version,
    Alias,
    EventSourceMapping,
    LayerVersion,
    FunctionUrlConfig,
    CodeSigningConfig,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        Self::CodeSigningConfig,
        Self::Function,
        Self::Version,
        Self::Alias,
        Self::EventSourceMapping,
        Self::LayerVersion,
        Self::FunctionUrlConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "Function",
            Self::Version => "Version",
            Self::Alias => "Alias",
            Self::EventSourceMapping => "EventSourceMapping",
            Self::LayerVersion => "LayerVersion",
            Self::FunctionUrlConfig => "FunctionURLConfig",
            Self::CodeSigningConfig => "CodeSigningConfig",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownKind(s.to_string()))
    }
}

/// Identity of a declared object in its owning store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Set by the owner when the object should be removed remotely.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deletion_requested: bool,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Remote identity recorded once the object exists in AWS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(default, rename = "ownerAccountID", skip_serializing_if = "Option::is_none")]
    pub owner_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// A declared object: who it is, what the user wants, what we last saw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource<S, T> {
    pub metadata: ObjectMeta,
    pub spec: S,
    #[serde(default)]
    pub status: T,
}

impl<S, T: ObjectStatus> Resource<S, T> {
    pub fn conditions(&self) -> &[Condition] {
        self.status.conditions()
    }

    pub fn arn(&self) -> Option<&str> {
        self.status
            .resource_metadata()
            .and_then(|m| m.arn.as_deref())
    }
}

/// Status fields shared by every kind.
pub trait ObjectStatus {
    fn conditions(&self) -> &[Condition];
    fn set_conditions(&mut self, conditions: Vec<Condition>);
    fn resource_metadata(&self) -> Option<&ResourceMetadata>;
    fn resource_metadata_mut(&mut self) -> &mut ResourceMetadata;
}

/// Implement [`ObjectStatus`] for a status struct carrying `conditions` and
/// `ack_resource_metadata` fields.
#[macro_export]
macro_rules! impl_object_status {
    ($ty:ty) => {
        impl $crate::models::meta::ObjectStatus for $ty {
            fn conditions(&self) -> &[$crate::models::condition::Condition] {
                &self.conditions
            }

            fn set_conditions(&mut self, conditions: Vec<$crate::models::condition::Condition>) {
                self.conditions = conditions;
            }

            fn resource_metadata(&self) -> Option<&$crate::models::meta::ResourceMetadata> {
                self.ack_resource_metadata.as_ref()
            }

            fn resource_metadata_mut(&mut self) -> &mut $crate::models::meta::ResourceMetadata {
                self.ack_resource_metadata.get_or_insert_with(Default::default)
            }
        }
    };
}
