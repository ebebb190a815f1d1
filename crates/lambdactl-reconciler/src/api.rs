//! The remote service as the reconciler sees it.
//!
//! Requests and responses are expressed in the record types of
//! `lambdactl-core`; [`crate::aws::AwsLambdaApi`] maps them onto the SDK.
//! Every failure carries the service's error code so callers can decide
//! what "not configured" or "busy" means for them.

use std::collections::BTreeMap;

use lambdactl_core::models::alias::{AliasSpec, AliasStatus, Permission};
use lambdactl_core::models::code_signing_config::{CodeSigningConfigSpec, CodeSigningConfigStatus};
use lambdactl_core::models::event_source_mapping::{
    EventSourceMappingSpec, EventSourceMappingStatus,
};
use lambdactl_core::models::function::{FunctionSpec, FunctionStatus};
use lambdactl_core::models::function_url_config::{
    FunctionUrlConfigSpec, FunctionUrlConfigStatus,
};
use lambdactl_core::models::invoke::EventInvokeConfig;
use lambdactl_core::models::layer_version::{LayerVersionSpec, LayerVersionStatus};

use crate::error::ApiError;
use crate::manager::BoxFuture;

pub type ApiResult<T> = Result<T, ApiError>;

/// A spec/status pair as projected from one remote response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Described<S, T> {
    pub spec: S,
    pub status: T,
}

pub type FunctionDescription = Described<FunctionSpec, FunctionStatus>;
pub type AliasDescription = Described<AliasSpec, AliasStatus>;
pub type EventSourceMappingDescription = Described<EventSourceMappingSpec, EventSourceMappingStatus>;
pub type LayerVersionDescription = Described<LayerVersionSpec, LayerVersionStatus>;
pub type FunctionUrlConfigDescription = Described<FunctionUrlConfigSpec, FunctionUrlConfigStatus>;
pub type CodeSigningConfigDescription = Described<CodeSigningConfigSpec, CodeSigningConfigStatus>;

/// Payload of an UpdateFunctionCode call. Exactly one locator is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeUpdate {
    pub function_name: String,
    pub image_uri: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_key: Option<String>,
    pub s3_object_version: Option<String>,
    /// Base64-encoded archive.
    pub zip_file: Option<String>,
    pub architectures: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishVersion {
    pub function_name: String,
    pub code_sha256: Option<String>,
    pub description: Option<String>,
    pub revision_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerVersionPage {
    pub versions: Vec<i64>,
    pub next_marker: Option<String>,
}

/// The Lambda control-plane operations the reconciler depends on.
pub trait LambdaApi: Send + Sync {
    // Functions

    fn get_function<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ApiResult<FunctionDescription>>;

    /// Configuration of a single qualified version.
    fn get_function_configuration<'a>(
        &'a self,
        name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<FunctionDescription>>;

    fn create_function<'a>(
        &'a self,
        spec: &'a FunctionSpec,
    ) -> BoxFuture<'a, ApiResult<FunctionDescription>>;

    fn update_function_code<'a>(&'a self, update: &'a CodeUpdate) -> BoxFuture<'a, ApiResult<()>>;

    /// Submit the fields set on `patch`; unset fields are left as they are.
    fn update_function_configuration<'a>(
        &'a self,
        patch: &'a FunctionSpec,
    ) -> BoxFuture<'a, ApiResult<()>>;

    fn delete_function<'a>(
        &'a self,
        name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<()>>;

    /// Reserved concurrency; `None` when unreserved.
    fn get_function_concurrency<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ApiResult<Option<i64>>>;

    fn put_function_concurrency<'a>(&'a self, name: &'a str, reserved: i64) -> BoxFuture<'a, ApiResult<()>>;

    fn delete_function_concurrency<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ApiResult<()>>;

    fn get_function_code_signing_config<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, ApiResult<Option<String>>>;

    fn put_function_code_signing_config<'a>(
        &'a self,
        name: &'a str,
        arn: &'a str,
    ) -> BoxFuture<'a, ApiResult<()>>;

    fn delete_function_code_signing_config<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ApiResult<()>>;

    // Asynchronous invocation

    fn get_function_event_invoke_config<'a>(
        &'a self,
        name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<EventInvokeConfig>>;

    fn put_function_event_invoke_config<'a>(
        &'a self,
        name: &'a str,
        qualifier: Option<&'a str>,
        config: &'a EventInvokeConfig,
    ) -> BoxFuture<'a, ApiResult<()>>;

    fn delete_function_event_invoke_config<'a>(
        &'a self,
        name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<()>>;

    // Tags

    fn list_tags<'a>(&'a self, arn: &'a str) -> BoxFuture<'a, ApiResult<BTreeMap<String, String>>>;

    fn tag_resource<'a>(
        &'a self,
        arn: &'a str,
        tags: &'a BTreeMap<String, String>,
    ) -> BoxFuture<'a, ApiResult<()>>;

    fn untag_resource<'a>(&'a self, arn: &'a str, keys: &'a [String]) -> BoxFuture<'a, ApiResult<()>>;

    // Versions

    fn publish_version<'a>(
        &'a self,
        request: &'a PublishVersion,
    ) -> BoxFuture<'a, ApiResult<FunctionDescription>>;

    // Aliases

    fn create_alias<'a>(&'a self, spec: &'a AliasSpec) -> BoxFuture<'a, ApiResult<AliasDescription>>;

    fn get_alias<'a>(
        &'a self,
        function_name: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, ApiResult<AliasDescription>>;

    fn update_alias<'a>(&'a self, spec: &'a AliasSpec) -> BoxFuture<'a, ApiResult<AliasDescription>>;

    fn delete_alias<'a>(&'a self, function_name: &'a str, name: &'a str) -> BoxFuture<'a, ApiResult<()>>;

    /// Requested provisioned concurrency for a qualifier.
    fn get_provisioned_concurrency_config<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: &'a str,
    ) -> BoxFuture<'a, ApiResult<Option<i64>>>;

    fn put_provisioned_concurrency_config<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: &'a str,
        executions: i64,
    ) -> BoxFuture<'a, ApiResult<()>>;

    fn delete_provisioned_concurrency_config<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: &'a str,
    ) -> BoxFuture<'a, ApiResult<()>>;

    /// Raw resource-based policy document for a qualified function.
    fn get_policy<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<String>>;

    fn add_permission<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: Option<&'a str>,
        permission: &'a Permission,
    ) -> BoxFuture<'a, ApiResult<()>>;

    fn remove_permission<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: Option<&'a str>,
        statement_id: &'a str,
    ) -> BoxFuture<'a, ApiResult<()>>;

    // Event source mappings

    fn create_event_source_mapping<'a>(
        &'a self,
        spec: &'a EventSourceMappingSpec,
    ) -> BoxFuture<'a, ApiResult<EventSourceMappingDescription>>;

    fn get_event_source_mapping<'a>(
        &'a self,
        uuid: &'a str,
    ) -> BoxFuture<'a, ApiResult<EventSourceMappingDescription>>;

    /// `clear_filters` sends an explicit empty filter list.
    fn update_event_source_mapping<'a>(
        &'a self,
        uuid: &'a str,
        spec: &'a EventSourceMappingSpec,
        clear_filters: bool,
    ) -> BoxFuture<'a, ApiResult<EventSourceMappingDescription>>;

    fn delete_event_source_mapping<'a>(&'a self, uuid: &'a str) -> BoxFuture<'a, ApiResult<()>>;

    // Layers

    fn publish_layer_version<'a>(
        &'a self,
        spec: &'a LayerVersionSpec,
    ) -> BoxFuture<'a, ApiResult<LayerVersionDescription>>;

    fn get_layer_version<'a>(
        &'a self,
        layer_name: &'a str,
        version: i64,
    ) -> BoxFuture<'a, ApiResult<LayerVersionDescription>>;

    fn list_layer_versions<'a>(
        &'a self,
        layer_name: &'a str,
        marker: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<LayerVersionPage>>;

    fn delete_layer_version<'a>(&'a self, layer_name: &'a str, version: i64) -> BoxFuture<'a, ApiResult<()>>;

    // Function URLs

    fn create_function_url_config<'a>(
        &'a self,
        spec: &'a FunctionUrlConfigSpec,
    ) -> BoxFuture<'a, ApiResult<FunctionUrlConfigDescription>>;

    fn get_function_url_config<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<FunctionUrlConfigDescription>>;

    fn update_function_url_config<'a>(
        &'a self,
        spec: &'a FunctionUrlConfigSpec,
    ) -> BoxFuture<'a, ApiResult<FunctionUrlConfigDescription>>;

    fn delete_function_url_config<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<()>>;

    // Code signing configs

    fn create_code_signing_config<'a>(
        &'a self,
        spec: &'a CodeSigningConfigSpec,
    ) -> BoxFuture<'a, ApiResult<CodeSigningConfigDescription>>;

    fn get_code_signing_config<'a>(&'a self, arn: &'a str) -> BoxFuture<'a, ApiResult<CodeSigningConfigDescription>>;

    fn update_code_signing_config<'a>(
        &'a self,
        arn: &'a str,
        spec: &'a CodeSigningConfigSpec,
    ) -> BoxFuture<'a, ApiResult<CodeSigningConfigDescription>>;

    fn delete_code_signing_config<'a>(&'a self, arn: &'a str) -> BoxFuture<'a, ApiResult<()>>;
}

/// Treat the listed "not configured" codes as an empty result.
pub fn absent_on<T>(result: ApiResult<T>, codes: &[&str]) -> ApiResult<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if codes.iter().any(|c| e.is(c)) => Ok(None),
        Err(e) => Err(e),
    }
}
