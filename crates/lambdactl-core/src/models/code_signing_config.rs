use serde::{Deserialize, Serialize};

use crate::impl_object_status;
use crate::models::condition::Condition;
use crate::models::meta::{Resource, ResourceMetadata};

pub type CodeSigningConfig = Resource<CodeSigningConfigSpec, CodeSigningConfigStatus>;

/// Trusted publishers and deployment policy that functions can point at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSigningConfigSpec {
    pub allowed_publishers: Option<AllowedPublishers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_signing_policies: Option<CodeSigningPolicies>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedPublishers {
    #[serde(default, rename = "signingProfileVersionARNs")]
    pub signing_profile_version_arns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSigningPolicies {
    /// `Warn` or `Enforce`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub untrusted_artifact_on_deployment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSigningConfigStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_resource_metadata: Option<ResourceMetadata>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, rename = "codeSigningConfigID", skip_serializing_if = "Option::is_none")]
    pub code_signing_config_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl_object_status!(CodeSigningConfigStatus);
