use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::impl_object_status;
use crate::models::condition::Condition;
use crate::models::invoke::{EventInvokeConfig, ProvisionedConcurrencyConfig};
use crate::models::meta::{Resource, ResourceMetadata};
use crate::models::reference::ResourceReference;

pub type Alias = Resource<AliasSpec, AliasStatus>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasSpec {
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_event_invoke_config: Option<EventInvokeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_ref: Option<ResourceReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioned_concurrency_config: Option<ProvisionedConcurrencyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_config: Option<AliasRoutingConfig>,
}

/// Weighted traffic shifting to a second version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasRoutingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_version_weights: Option<BTreeMap<String, f64>>,
}

/// One statement of the alias's resource-based policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(default, rename = "statementID", skip_serializing_if = "Option::is_none")]
    pub statement_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_source_token: Option<String>,
    #[serde(default, rename = "functionURLAuthType", skip_serializing_if = "Option::is_none")]
    pub function_url_auth_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
    #[serde(default, rename = "principalOrgID", skip_serializing_if = "Option::is_none")]
    pub principal_org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_account: Option<String>,
    #[serde(default, rename = "sourceARN", skip_serializing_if = "Option::is_none")]
    pub source_arn: Option<String>,
}

impl Permission {
    /// Statements are equal when every field the policy document can
    /// express matches. The auth type is write-only.
    pub fn same_statement(&self, other: &Permission) -> bool {
        self.statement_id == other.statement_id
            && self.action == other.action
            && self.principal == other.principal
            && self.source_arn == other.source_arn
            && self.source_account == other.source_account
            && self.event_source_token == other.event_source_token
            && self.principal_org_id == other.principal_org_id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_resource_metadata: Option<ResourceMetadata>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, rename = "revisionID", skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
}

impl_object_status!(AliasStatus);
