//! [`LambdaApi`] over the AWS SDK.
//!
//! Responses are projected onto the record types of `lambdactl-core`.
//! Empty strings and empty lists the service uses for "unset" come back as
//! `None`, so they compare equal to a field the user left out.

use std::collections::BTreeMap;

use aws_sdk_lambda::Client;
use aws_sdk_lambda::error::{BuildError, ProvideErrorMetadata, SdkError};
use aws_sdk_lambda::primitives::{Blob, DateTime};
use aws_sdk_lambda::types as sdk;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use lambdactl_core::ResourceMetadata;
use lambdactl_core::models::alias::{AliasRoutingConfig, AliasSpec, AliasStatus, Permission};
use lambdactl_core::models::code_signing_config::{
    AllowedPublishers, CodeSigningConfigSpec, CodeSigningConfigStatus, CodeSigningPolicies,
};
use lambdactl_core::models::event_source_mapping::{
    EventSourceMappingSpec, EventSourceMappingStatus, Filter, FilterCriteria, ScalingConfig,
    SourceAccessConfiguration,
};
use lambdactl_core::models::function::{
    DeadLetterConfig, Environment, EphemeralStorage, FileSystemConfig, FunctionCode, FunctionSpec,
    FunctionStatus, ImageConfig, LayerStatus, LoggingConfig, SnapStart, TracingConfig, VpcConfig,
};
use lambdactl_core::models::function_url_config::{Cors, FunctionUrlConfigSpec, FunctionUrlConfigStatus};
use lambdactl_core::models::invoke::{DestinationConfig, EventInvokeConfig, OnFailure, OnSuccess};
use lambdactl_core::models::layer_version::{LayerVersionSpec, LayerVersionStatus};

use crate::api::{
    AliasDescription, ApiResult, CodeSigningConfigDescription, CodeUpdate, EventSourceMappingDescription,
    FunctionDescription, FunctionUrlConfigDescription, LambdaApi, LayerVersionDescription,
    LayerVersionPage, PublishVersion,
};
use crate::error::{ApiError, codes, format_err_chain};
use crate::manager::BoxFuture;

pub struct AwsLambdaApi {
    client: Client,
}

impl AwsLambdaApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential chain, pinned to `region`
    /// when one is given.
    pub async fn from_env(region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let config = loader.load().await;
        Self::new(Client::new(&config))
    }
}

// ── Error mapping ──────────────────────────────────────────────────────────

fn api_error<E, R>(operation: &str, err: SdkError<E, R>) -> ApiError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().unwrap_or("Unknown").to_string();
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| format_err_chain(&err));
    ApiError::new(operation, code, message)
}

/// A request the SDK refused to build is a malformed spec.
fn build_error(operation: &str, err: BuildError) -> ApiError {
    ApiError::new(operation, codes::INVALID_PARAMETER_VALUE, err.to_string())
}

fn decode_zip(operation: &str, encoded: Option<&String>) -> ApiResult<Option<Blob>> {
    encoded
        .filter(|z| !z.is_empty())
        .map(|z| {
            BASE64
                .decode(z)
                .map(Blob::new)
                .map_err(|e| ApiError::new(operation, codes::INVALID_PARAMETER_VALUE, format!("zipFile: {e}")))
        })
        .transpose()
}

// ── Value conversion ───────────────────────────────────────────────────────

fn text<'a>(value: impl Into<Option<&'a str>>) -> Option<String> {
    value.into().filter(|s| !s.is_empty()).map(str::to_string)
}

fn num<T: Into<i64>>(value: Option<T>) -> Option<i64> {
    value.map(Into::into)
}

fn narrow(value: Option<i64>) -> Option<i32> {
    value.map(|v| v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
}

fn strings(items: &[String]) -> Option<Vec<String>> {
    (!items.is_empty()).then(|| items.to_vec())
}

fn enum_strings<T>(items: &[T], as_str: impl Fn(&T) -> &str) -> Option<Vec<String>> {
    (!items.is_empty()).then(|| items.iter().map(|i| as_str(i).to_string()).collect())
}

/// Enum-typed request fields; an empty value is treated as unset.
fn enum_value<T: for<'a> From<&'a str>>(value: Option<&String>) -> Option<T> {
    value.filter(|v| !v.is_empty()).map(|v| T::from(v.as_str()))
}

fn enum_values<T: for<'a> From<&'a str>>(values: Option<&Vec<String>>) -> Option<Vec<T>> {
    values.map(|v| v.iter().map(|s| T::from(s.as_str())).collect())
}

/// Region and account are read back from the ARN.
fn resource_metadata(arn: Option<String>) -> Option<ResourceMetadata> {
    let arn = arn?;
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    Some(ResourceMetadata {
        owner_account_id: parts.get(4).and_then(|a| text(*a)),
        region: parts.get(3).and_then(|r| text(*r)),
        arn: Some(arn),
    })
}

fn timestamp(value: Option<&DateTime>) -> Option<jiff::Timestamp> {
    value.and_then(|dt| jiff::Timestamp::new(dt.secs(), dt.subsec_nanos() as i32).ok())
}

fn date_time(value: Option<&jiff::Timestamp>) -> Option<DateTime> {
    value.map(|ts| DateTime::from_secs_and_nanos(ts.as_second(), ts.subsec_nanosecond().max(0) as u32))
}

fn hash_map(map: &BTreeMap<String, String>) -> std::collections::HashMap<String, String> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

// ── Shared sub-configurations ──────────────────────────────────────────────

fn destination_config_from(c: Option<&sdk::DestinationConfig>) -> Option<DestinationConfig> {
    let c = c?;
    let on_success = c
        .on_success()
        .and_then(|s| text(s.destination()))
        .map(|d| OnSuccess { destination: Some(d) });
    let on_failure = c
        .on_failure()
        .and_then(|f| text(f.destination()))
        .map(|d| OnFailure { destination: Some(d) });
    (on_success.is_some() || on_failure.is_some()).then_some(DestinationConfig { on_failure, on_success })
}

fn destination_config_to(c: Option<&DestinationConfig>) -> Option<sdk::DestinationConfig> {
    c.map(|c| {
        sdk::DestinationConfig::builder()
            .set_on_success(c.on_success.as_ref().map(|s| {
                sdk::OnSuccess::builder()
                    .set_destination(s.destination.clone())
                    .build()
            }))
            .set_on_failure(c.on_failure.as_ref().map(|f| {
                sdk::OnFailure::builder()
                    .set_destination(f.destination.clone())
                    .build()
            }))
            .build()
    })
}

// ── Functions ──────────────────────────────────────────────────────────────

/// The configuration accessors shared by every function-shaped response
/// (GetFunctionConfiguration, CreateFunction, PublishVersion, and the
/// configuration block of GetFunction).
macro_rules! function_description {
    ($c:expr) => {{
        let c = $c;
        let image_config = c.image_config_response().and_then(|r| r.image_config()).and_then(|i| {
            let config = ImageConfig {
                command: strings(i.command()),
                entry_point: strings(i.entry_point()),
                working_directory: text(i.working_directory()),
            };
            (config != ImageConfig::default()).then_some(config)
        });
        let vpc_config = c.vpc_config().and_then(|v| {
            let config = VpcConfig {
                security_group_ids: strings(v.security_group_ids()),
                subnet_ids: strings(v.subnet_ids()),
                ..Default::default()
            };
            (config != VpcConfig::default()).then_some(config)
        });
        let variables = c
            .environment()
            .and_then(|e| e.variables())
            .filter(|v| !v.is_empty())
            .map(|v| v.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<BTreeMap<_, _>>());
        let logging_config = c.logging_config().map(|l| LoggingConfig {
            application_log_level: l.application_log_level().map(|v| v.as_str().to_string()),
            log_format: l.log_format().map(|v| v.as_str().to_string()),
            log_group: text(l.log_group()),
            system_log_level: l.system_log_level().map(|v| v.as_str().to_string()),
        });
        let layers = c.layers();

        FunctionDescription {
            spec: FunctionSpec {
                name: text(c.function_name()),
                architectures: enum_strings(c.architectures(), |a| a.as_str()),
                dead_letter_config: c
                    .dead_letter_config()
                    .and_then(|d| text(d.target_arn()))
                    .map(|arn| DeadLetterConfig { target_arn: Some(arn) }),
                description: text(c.description()),
                environment: variables.map(|v| Environment {
                    variables: Some(v),
                    variables_from_secret_refs: None,
                }),
                ephemeral_storage: c.ephemeral_storage().map(|e| EphemeralStorage {
                    size: num(Some(e.size())),
                }),
                file_system_configs: (!c.file_system_configs().is_empty()).then(|| {
                    c.file_system_configs()
                        .iter()
                        .map(|f| FileSystemConfig {
                            arn: text(f.arn()),
                            local_mount_path: text(f.local_mount_path()),
                        })
                        .collect()
                }),
                handler: text(c.handler()),
                image_config,
                kms_key_arn: text(c.kms_key_arn()),
                layers: (!layers.is_empty()).then(|| layers.iter().filter_map(|l| text(l.arn())).collect()),
                logging_config,
                memory_size: num(c.memory_size()),
                package_type: c.package_type().map(|p| p.as_str().to_string()),
                role: text(c.role()),
                runtime: c.runtime().map(|r| r.as_str().to_string()),
                snap_start: c
                    .snap_start()
                    .and_then(|s| s.apply_on())
                    .map(|a| SnapStart { apply_on: Some(a.as_str().to_string()) }),
                timeout: num(c.timeout()),
                tracing_config: c
                    .tracing_config()
                    .and_then(|t| t.mode())
                    .map(|m| TracingConfig { mode: Some(m.as_str().to_string()) }),
                vpc_config,
                ..Default::default()
            },
            status: FunctionStatus {
                ack_resource_metadata: resource_metadata(text(c.function_arn())),
                code_sha256: text(c.code_sha256()),
                code_size: num(Some(c.code_size())),
                last_modified: text(c.last_modified()),
                last_update_status: c.last_update_status().map(|s| s.as_str().to_string()),
                last_update_status_reason: text(c.last_update_status_reason()),
                layer_statuses: (!layers.is_empty()).then(|| {
                    layers
                        .iter()
                        .map(|l| LayerStatus {
                            arn: text(l.arn()),
                            code_size: num(Some(l.code_size())),
                        })
                        .collect()
                }),
                revision_id: text(c.revision_id()),
                state: c.state().map(|s| s.as_str().to_string()),
                state_reason: text(c.state_reason()),
                version: text(c.version()),
                ..Default::default()
            },
        }
    }};
}

fn function_code(operation: &str, code: Option<&FunctionCode>) -> ApiResult<sdk::FunctionCode> {
    let code = code.cloned().unwrap_or_default();
    Ok(sdk::FunctionCode::builder()
        .set_image_uri(code.image_uri.filter(|u| !u.is_empty()))
        .set_s3_bucket(code.s3_bucket.filter(|b| !b.is_empty()))
        .set_s3_key(code.s3_key.filter(|k| !k.is_empty()))
        .set_s3_object_version(code.s3_object_version.filter(|v| !v.is_empty()))
        .set_zip_file(decode_zip(operation, code.zip_file.as_ref())?)
        .build())
}

fn environment(spec: &FunctionSpec) -> Option<sdk::Environment> {
    spec.environment.as_ref().map(|e| {
        sdk::Environment::builder()
            .set_variables(Some(e.variables.as_ref().map(hash_map).unwrap_or_default()))
            .build()
    })
}

fn vpc_config(spec: &FunctionSpec) -> Option<sdk::VpcConfig> {
    spec.vpc_config.as_ref().map(|v| {
        sdk::VpcConfig::builder()
            .set_subnet_ids(v.subnet_ids.clone())
            .set_security_group_ids(v.security_group_ids.clone())
            .build()
    })
}

fn dead_letter_config(spec: &FunctionSpec) -> Option<sdk::DeadLetterConfig> {
    spec.dead_letter_config.as_ref().map(|d| {
        sdk::DeadLetterConfig::builder()
            .set_target_arn(Some(d.target_arn.clone().unwrap_or_default()))
            .build()
    })
}

fn tracing_config(spec: &FunctionSpec) -> Option<sdk::TracingConfig> {
    spec.tracing_config.as_ref().map(|t| {
        sdk::TracingConfig::builder()
            .set_mode(enum_value(t.mode.as_ref()))
            .build()
    })
}

fn image_config(spec: &FunctionSpec) -> Option<sdk::ImageConfig> {
    spec.image_config.as_ref().map(|i| {
        sdk::ImageConfig::builder()
            .set_command(i.command.clone())
            .set_entry_point(i.entry_point.clone())
            .set_working_directory(i.working_directory.clone())
            .build()
    })
}

fn snap_start(spec: &FunctionSpec) -> Option<sdk::SnapStart> {
    spec.snap_start.as_ref().map(|s| {
        sdk::SnapStart::builder()
            .set_apply_on(Some(enum_value(s.apply_on.as_ref()).unwrap_or(sdk::SnapStartApplyOn::None)))
            .build()
    })
}

fn logging_config(spec: &FunctionSpec) -> Option<sdk::LoggingConfig> {
    spec.logging_config.as_ref().map(|l| {
        sdk::LoggingConfig::builder()
            .set_application_log_level(enum_value(l.application_log_level.as_ref()))
            .set_log_format(enum_value(l.log_format.as_ref()))
            .set_log_group(l.log_group.clone())
            .set_system_log_level(enum_value(l.system_log_level.as_ref()))
            .build()
    })
}

fn ephemeral_storage(operation: &str, spec: &FunctionSpec) -> ApiResult<Option<sdk::EphemeralStorage>> {
    spec.ephemeral_storage
        .as_ref()
        .and_then(|e| narrow(e.size))
        .map(|size| {
            sdk::EphemeralStorage::builder()
                .size(size)
                .build()
                .map_err(|e| build_error(operation, e))
        })
        .transpose()
}

fn file_system_configs(operation: &str, spec: &FunctionSpec) -> ApiResult<Option<Vec<sdk::FileSystemConfig>>> {
    spec.file_system_configs
        .as_ref()
        .map(|configs| {
            configs
                .iter()
                .map(|f| {
                    sdk::FileSystemConfig::builder()
                        .set_arn(f.arn.clone())
                        .set_local_mount_path(f.local_mount_path.clone())
                        .build()
                        .map_err(|e| build_error(operation, e))
                })
                .collect()
        })
        .transpose()
}

// ── Aliases ────────────────────────────────────────────────────────────────

macro_rules! alias_description {
    ($c:expr) => {{
        let c = $c;
        let weights = c
            .routing_config()
            .and_then(|r| r.additional_version_weights())
            .filter(|w| !w.is_empty())
            .map(|w| w.iter().map(|(k, v)| (k.clone(), *v)).collect::<BTreeMap<_, _>>());
        AliasDescription {
            spec: AliasSpec {
                name: text(c.name()),
                description: text(c.description()),
                function_version: text(c.function_version()),
                routing_config: weights.map(|w| AliasRoutingConfig {
                    additional_version_weights: Some(w),
                }),
                ..Default::default()
            },
            status: AliasStatus {
                ack_resource_metadata: resource_metadata(text(c.alias_arn())),
                revision_id: text(c.revision_id()),
                ..Default::default()
            },
        }
    }};
}

fn routing_config(spec: &AliasSpec) -> Option<sdk::AliasRoutingConfiguration> {
    spec.routing_config.as_ref().map(|r| {
        sdk::AliasRoutingConfiguration::builder()
            .set_additional_version_weights(Some(
                r.additional_version_weights
                    .iter()
                    .flatten()
                    .map(|(k, v)| (k.clone(), *v))
                    .collect(),
            ))
            .build()
    })
}

// ── Event source mappings ──────────────────────────────────────────────────

macro_rules! event_source_mapping_description {
    ($c:expr) => {{
        let c = $c;
        let state = c.state().and_then(|s| text(s));
        let filters: Vec<Filter> = c
            .filter_criteria()
            .map(|f| f.filters())
            .unwrap_or_default()
            .iter()
            .map(|f| Filter { pattern: text(f.pattern()) })
            .collect();
        EventSourceMappingDescription {
            spec: EventSourceMappingSpec {
                batch_size: num(c.batch_size()),
                bisect_batch_on_function_error: c.bisect_batch_on_function_error(),
                destination_config: destination_config_from(c.destination_config()),
                enabled: state.as_deref().and_then(enabled_from_state),
                event_source_arn: text(c.event_source_arn()),
                filter_criteria: (!filters.is_empty()).then(|| FilterCriteria { filters: Some(filters) }),
                function_name: text(c.function_arn()),
                function_response_types: enum_strings(c.function_response_types(), |t| t.as_str()),
                maximum_batching_window_in_seconds: num(c.maximum_batching_window_in_seconds()),
                maximum_record_age_in_seconds: num(c.maximum_record_age_in_seconds()),
                maximum_retry_attempts: num(c.maximum_retry_attempts()),
                parallelization_factor: num(c.parallelization_factor()),
                queues: strings(c.queues()),
                scaling_config: c.scaling_config().map(|s| ScalingConfig {
                    maximum_concurrency: num(s.maximum_concurrency()),
                }),
                source_access_configurations: (!c.source_access_configurations().is_empty()).then(|| {
                    c.source_access_configurations()
                        .iter()
                        .map(|s| SourceAccessConfiguration {
                            type_: s.r#type().map(|t| t.as_str().to_string()),
                            uri: text(s.uri()),
                        })
                        .collect()
                }),
                starting_position: c.starting_position().map(|p| p.as_str().to_string()),
                starting_position_timestamp: timestamp(c.starting_position_timestamp()),
                topics: strings(c.topics()),
                tumbling_window_in_seconds: num(c.tumbling_window_in_seconds()),
                ..Default::default()
            },
            status: EventSourceMappingStatus {
                ack_resource_metadata: resource_metadata(text(c.event_source_mapping_arn())),
                function_arn: text(c.function_arn()),
                last_modified: timestamp(c.last_modified()),
                last_processing_result: text(c.last_processing_result()),
                state,
                state_transition_reason: text(c.state_transition_reason()),
                uuid: text(c.uuid()),
                ..Default::default()
            },
        }
    }};
}

/// The response carries no enabled flag; the state implies it.
fn enabled_from_state(state: &str) -> Option<bool> {
    match state {
        "Enabled" | "Enabling" | "Creating" | "Updating" => Some(true),
        "Disabled" | "Disabling" => Some(false),
        _ => None,
    }
}

fn filter_criteria(spec: &EventSourceMappingSpec, clear: bool) -> Option<sdk::FilterCriteria> {
    if clear {
        return Some(sdk::FilterCriteria::builder().set_filters(Some(Vec::new())).build());
    }
    spec.filter_criteria.as_ref().filter(|c| !c.is_empty()).map(|c| {
        sdk::FilterCriteria::builder()
            .set_filters(Some(
                c.filters
                    .iter()
                    .flatten()
                    .map(|f| sdk::Filter::builder().set_pattern(f.pattern.clone()).build())
                    .collect(),
            ))
            .build()
    })
}

fn scaling_config(spec: &EventSourceMappingSpec) -> Option<sdk::ScalingConfig> {
    spec.scaling_config.as_ref().map(|s| {
        sdk::ScalingConfig::builder()
            .set_maximum_concurrency(narrow(s.maximum_concurrency))
            .build()
    })
}

fn source_access_configurations(spec: &EventSourceMappingSpec) -> Option<Vec<sdk::SourceAccessConfiguration>> {
    spec.source_access_configurations.as_ref().map(|configs| {
        configs
            .iter()
            .map(|s| {
                sdk::SourceAccessConfiguration::builder()
                    .set_type(enum_value(s.type_.as_ref()))
                    .set_uri(s.uri.clone())
                    .build()
            })
            .collect()
    })
}

// ── Layers ─────────────────────────────────────────────────────────────────

macro_rules! layer_version_description {
    ($c:expr) => {{
        let c = $c;
        LayerVersionDescription {
            spec: LayerVersionSpec {
                compatible_architectures: enum_strings(c.compatible_architectures(), |a| a.as_str()),
                compatible_runtimes: enum_strings(c.compatible_runtimes(), |r| r.as_str()),
                description: text(c.description()),
                license_info: text(c.license_info()),
                ..Default::default()
            },
            status: LayerVersionStatus {
                ack_resource_metadata: resource_metadata(text(c.layer_version_arn())),
                created_date: text(c.created_date()),
                layer_arn: text(c.layer_arn()),
                version_number: num(Some(c.version())),
                ..Default::default()
            },
        }
    }};
}

// ── Function URLs ──────────────────────────────────────────────────────────

macro_rules! function_url_config_description {
    ($c:expr) => {{
        let c = $c;
        let cors = c.cors().map(|c| Cors {
            allow_credentials: c.allow_credentials(),
            allow_headers: strings(c.allow_headers()),
            allow_methods: strings(c.allow_methods()),
            allow_origins: strings(c.allow_origins()),
            expose_headers: strings(c.expose_headers()),
            max_age: num(c.max_age()),
        });
        let auth_type: Option<&sdk::FunctionUrlAuthType> = Option::from(c.auth_type());
        FunctionUrlConfigDescription {
            spec: FunctionUrlConfigSpec {
                auth_type: auth_type.map(|a| a.as_str().to_string()),
                cors: cors.filter(|c| *c != Cors::default()),
                ..Default::default()
            },
            status: FunctionUrlConfigStatus {
                ack_resource_metadata: resource_metadata(text(c.function_arn())),
                creation_time: text(c.creation_time()),
                function_arn: text(c.function_arn()),
                function_url: text(c.function_url()),
                ..Default::default()
            },
        }
    }};
}

fn cors(spec: &FunctionUrlConfigSpec) -> Option<sdk::Cors> {
    spec.cors.as_ref().map(|c| {
        sdk::Cors::builder()
            .set_allow_credentials(c.allow_credentials)
            .set_allow_headers(c.allow_headers.clone())
            .set_allow_methods(c.allow_methods.clone())
            .set_allow_origins(c.allow_origins.clone())
            .set_expose_headers(c.expose_headers.clone())
            .set_max_age(narrow(c.max_age))
            .build()
    })
}

// ── Code signing configs ───────────────────────────────────────────────────

fn code_signing_config_description(
    operation: &str,
    c: Option<&sdk::CodeSigningConfig>,
) -> ApiResult<CodeSigningConfigDescription> {
    let c = c.ok_or_else(|| ApiError::new(operation, "MissingConfiguration", "response has no code signing config"))?;
    let policy: Option<&sdk::CodeSigningPolicy> = c
        .code_signing_policies()
        .and_then(|p| Option::from(p.untrusted_artifact_on_deployment()));
    Ok(CodeSigningConfigDescription {
        spec: CodeSigningConfigSpec {
            allowed_publishers: c.allowed_publishers().map(|p| AllowedPublishers {
                signing_profile_version_arns: p.signing_profile_version_arns().to_vec(),
            }),
            code_signing_policies: policy.map(|p| CodeSigningPolicies {
                untrusted_artifact_on_deployment: Some(p.as_str().to_string()),
            }),
            description: text(c.description()),
        },
        status: CodeSigningConfigStatus {
            ack_resource_metadata: resource_metadata(text(c.code_signing_config_arn())),
            code_signing_config_id: text(c.code_signing_config_id()),
            last_modified: text(c.last_modified()),
            ..Default::default()
        },
    })
}

fn allowed_publishers(operation: &str, spec: &CodeSigningConfigSpec) -> ApiResult<sdk::AllowedPublishers> {
    sdk::AllowedPublishers::builder()
        .set_signing_profile_version_arns(
            spec.allowed_publishers
                .as_ref()
                .map(|p| p.signing_profile_version_arns.clone()),
        )
        .build()
        .map_err(|e| build_error(operation, e))
}

fn code_signing_policies(spec: &CodeSigningConfigSpec) -> Option<sdk::CodeSigningPolicies> {
    spec.code_signing_policies.as_ref().map(|p| {
        sdk::CodeSigningPolicies::builder()
            .set_untrusted_artifact_on_deployment(enum_value(p.untrusted_artifact_on_deployment.as_ref()))
            .build()
    })
}

impl LambdaApi for AwsLambdaApi {
    fn get_function<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ApiResult<FunctionDescription>> {
        Box::pin(async move {
            let resp = self
                .client
                .get_function()
                .function_name(name)
                .send()
                .await
                .map_err(|e| api_error("GetFunction", e))?;
            let configuration = resp
                .configuration()
                .ok_or_else(|| ApiError::new("GetFunction", "MissingConfiguration", "response has no configuration"))?;
            let mut described = function_description!(configuration);
            described.spec.code = resp.code().and_then(|c| text(c.image_uri())).map(|uri| FunctionCode {
                image_uri: Some(uri),
                ..Default::default()
            });
            described.spec.tags = resp.tags().map(|t| t.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
            Ok(described)
        })
    }

    fn get_function_configuration<'a>(
        &'a self,
        name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<FunctionDescription>> {
        Box::pin(async move {
            let resp = self
                .client
                .get_function_configuration()
                .function_name(name)
                .set_qualifier(qualifier.map(str::to_string))
                .send()
                .await
                .map_err(|e| api_error("GetFunctionConfiguration", e))?;
            Ok(function_description!(&resp))
        })
    }

    fn create_function<'a>(&'a self, spec: &'a FunctionSpec) -> BoxFuture<'a, ApiResult<FunctionDescription>> {
        Box::pin(async move {
            const OP: &str = "CreateFunction";
            let resp = self
                .client
                .create_function()
                .set_function_name(spec.name.clone())
                .set_architectures(enum_values(spec.architectures.as_ref()))
                .code(function_code(OP, spec.code.as_ref())?)
                .set_code_signing_config_arn(spec.code_signing_config_arn.clone().filter(|a| !a.is_empty()))
                .set_dead_letter_config(dead_letter_config(spec))
                .set_description(spec.description.clone())
                .set_environment(environment(spec))
                .set_ephemeral_storage(ephemeral_storage(OP, spec)?)
                .set_file_system_configs(file_system_configs(OP, spec)?)
                .set_handler(spec.handler.clone())
                .set_image_config(image_config(spec))
                .set_kms_key_arn(spec.kms_key_arn.clone().filter(|k| !k.is_empty()))
                .set_layers(spec.layers.clone())
                .set_logging_config(logging_config(spec))
                .set_memory_size(narrow(spec.memory_size))
                .set_package_type(enum_value(spec.package_type.as_ref()))
                .set_publish(spec.publish)
                .set_role(spec.role.clone())
                .set_runtime(enum_value(spec.runtime.as_ref()))
                .set_snap_start(snap_start(spec))
                .set_tags(spec.tags.as_ref().map(hash_map))
                .set_timeout(narrow(spec.timeout))
                .set_tracing_config(tracing_config(spec))
                .set_vpc_config(vpc_config(spec))
                .send()
                .await
                .map_err(|e| api_error(OP, e))?;
            Ok(function_description!(&resp))
        })
    }

    fn update_function_code<'a>(&'a self, update: &'a CodeUpdate) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            const OP: &str = "UpdateFunctionCode";
            self.client
                .update_function_code()
                .function_name(&update.function_name)
                .set_image_uri(update.image_uri.clone())
                .set_s3_bucket(update.s3_bucket.clone())
                .set_s3_key(update.s3_key.clone())
                .set_s3_object_version(update.s3_object_version.clone())
                .set_zip_file(decode_zip(OP, update.zip_file.as_ref())?)
                .set_architectures(enum_values(update.architectures.as_ref()))
                .send()
                .await
                .map_err(|e| api_error(OP, e))?;
            Ok(())
        })
    }

    fn update_function_configuration<'a>(&'a self, patch: &'a FunctionSpec) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            const OP: &str = "UpdateFunctionConfiguration";
            self.client
                .update_function_configuration()
                .set_function_name(patch.name.clone())
                .set_dead_letter_config(dead_letter_config(patch))
                .set_description(patch.description.clone())
                .set_environment(environment(patch))
                .set_ephemeral_storage(ephemeral_storage(OP, patch)?)
                .set_file_system_configs(file_system_configs(OP, patch)?)
                .set_handler(patch.handler.clone())
                .set_image_config(image_config(patch))
                .set_kms_key_arn(patch.kms_key_arn.clone())
                .set_layers(patch.layers.clone())
                .set_logging_config(logging_config(patch))
                .set_memory_size(narrow(patch.memory_size.filter(|m| *m > 0)))
                .set_role(patch.role.clone().filter(|r| !r.is_empty()))
                .set_runtime(enum_value(patch.runtime.as_ref()))
                .set_snap_start(snap_start(patch))
                .set_timeout(narrow(patch.timeout.filter(|t| *t > 0)))
                .set_tracing_config(tracing_config(patch))
                .set_vpc_config(vpc_config(patch))
                .send()
                .await
                .map_err(|e| api_error(OP, e))?;
            Ok(())
        })
    }

    fn delete_function<'a>(&'a self, name: &'a str, qualifier: Option<&'a str>) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .delete_function()
                .function_name(name)
                .set_qualifier(qualifier.map(str::to_string))
                .send()
                .await
                .map_err(|e| api_error("DeleteFunction", e))?;
            Ok(())
        })
    }

    fn get_function_concurrency<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ApiResult<Option<i64>>> {
        Box::pin(async move {
            let resp = self
                .client
                .get_function_concurrency()
                .function_name(name)
                .send()
                .await
                .map_err(|e| api_error("GetFunctionConcurrency", e))?;
            Ok(num(resp.reserved_concurrent_executions()))
        })
    }

    fn put_function_concurrency<'a>(&'a self, name: &'a str, reserved: i64) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .put_function_concurrency()
                .function_name(name)
                .set_reserved_concurrent_executions(narrow(Some(reserved)))
                .send()
                .await
                .map_err(|e| api_error("PutFunctionConcurrency", e))?;
            Ok(())
        })
    }

    fn delete_function_concurrency<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .delete_function_concurrency()
                .function_name(name)
                .send()
                .await
                .map_err(|e| api_error("DeleteFunctionConcurrency", e))?;
            Ok(())
        })
    }

    fn get_function_code_signing_config<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ApiResult<Option<String>>> {
        Box::pin(async move {
            let resp = self
                .client
                .get_function_code_signing_config()
                .function_name(name)
                .send()
                .await
                .map_err(|e| api_error("GetFunctionCodeSigningConfig", e))?;
            Ok(text(resp.code_signing_config_arn()))
        })
    }

    fn put_function_code_signing_config<'a>(&'a self, name: &'a str, arn: &'a str) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .put_function_code_signing_config()
                .function_name(name)
                .code_signing_config_arn(arn)
                .send()
                .await
                .map_err(|e| api_error("PutFunctionCodeSigningConfig", e))?;
            Ok(())
        })
    }

    fn delete_function_code_signing_config<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .delete_function_code_signing_config()
                .function_name(name)
                .send()
                .await
                .map_err(|e| api_error("DeleteFunctionCodeSigningConfig", e))?;
            Ok(())
        })
    }

    fn get_function_event_invoke_config<'a>(
        &'a self,
        name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<EventInvokeConfig>> {
        Box::pin(async move {
            let resp = self
                .client
                .get_function_event_invoke_config()
                .function_name(name)
                .set_qualifier(qualifier.map(str::to_string))
                .send()
                .await
                .map_err(|e| api_error("GetFunctionEventInvokeConfig", e))?;
            Ok(EventInvokeConfig {
                destination_config: destination_config_from(resp.destination_config()),
                maximum_event_age_in_seconds: num(resp.maximum_event_age_in_seconds()),
                maximum_retry_attempts: num(resp.maximum_retry_attempts()),
            })
        })
    }

    fn put_function_event_invoke_config<'a>(
        &'a self,
        name: &'a str,
        qualifier: Option<&'a str>,
        config: &'a EventInvokeConfig,
    ) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .put_function_event_invoke_config()
                .function_name(name)
                .set_qualifier(qualifier.map(str::to_string))
                .set_destination_config(destination_config_to(config.destination_config.as_ref()))
                .set_maximum_event_age_in_seconds(narrow(config.maximum_event_age_in_seconds))
                .set_maximum_retry_attempts(narrow(config.maximum_retry_attempts))
                .send()
                .await
                .map_err(|e| api_error("PutFunctionEventInvokeConfig", e))?;
            Ok(())
        })
    }

    fn delete_function_event_invoke_config<'a>(
        &'a self,
        name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .delete_function_event_invoke_config()
                .function_name(name)
                .set_qualifier(qualifier.map(str::to_string))
                .send()
                .await
                .map_err(|e| api_error("DeleteFunctionEventInvokeConfig", e))?;
            Ok(())
        })
    }

    fn list_tags<'a>(&'a self, arn: &'a str) -> BoxFuture<'a, ApiResult<BTreeMap<String, String>>> {
        Box::pin(async move {
            let resp = self
                .client
                .list_tags()
                .resource(arn)
                .send()
                .await
                .map_err(|e| api_error("ListTags", e))?;
            Ok(resp
                .tags()
                .map(|t| t.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default())
        })
    }

    fn tag_resource<'a>(&'a self, arn: &'a str, tags: &'a BTreeMap<String, String>) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .tag_resource()
                .resource(arn)
                .set_tags(Some(hash_map(tags)))
                .send()
                .await
                .map_err(|e| api_error("TagResource", e))?;
            Ok(())
        })
    }

    fn untag_resource<'a>(&'a self, arn: &'a str, keys: &'a [String]) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .untag_resource()
                .resource(arn)
                .set_tag_keys(Some(keys.to_vec()))
                .send()
                .await
                .map_err(|e| api_error("UntagResource", e))?;
            Ok(())
        })
    }

    fn publish_version<'a>(&'a self, request: &'a PublishVersion) -> BoxFuture<'a, ApiResult<FunctionDescription>> {
        Box::pin(async move {
            let resp = self
                .client
                .publish_version()
                .function_name(&request.function_name)
                .set_code_sha256(request.code_sha256.clone())
                .set_description(request.description.clone())
                .set_revision_id(request.revision_id.clone())
                .send()
                .await
                .map_err(|e| api_error("PublishVersion", e))?;
            Ok(function_description!(&resp))
        })
    }

    fn create_alias<'a>(&'a self, spec: &'a AliasSpec) -> BoxFuture<'a, ApiResult<AliasDescription>> {
        Box::pin(async move {
            let resp = self
                .client
                .create_alias()
                .set_function_name(spec.function_name.clone())
                .set_name(spec.name.clone())
                .set_function_version(spec.function_version.clone())
                .set_description(spec.description.clone())
                .set_routing_config(routing_config(spec))
                .send()
                .await
                .map_err(|e| api_error("CreateAlias", e))?;
            Ok(alias_description!(&resp))
        })
    }

    fn get_alias<'a>(&'a self, function_name: &'a str, name: &'a str) -> BoxFuture<'a, ApiResult<AliasDescription>> {
        Box::pin(async move {
            let resp = self
                .client
                .get_alias()
                .function_name(function_name)
                .name(name)
                .send()
                .await
                .map_err(|e| api_error("GetAlias", e))?;
            Ok(alias_description!(&resp))
        })
    }

    fn update_alias<'a>(&'a self, spec: &'a AliasSpec) -> BoxFuture<'a, ApiResult<AliasDescription>> {
        Box::pin(async move {
            // Omitting the routing config keeps the current weights.
            let routing = routing_config(spec)
                .or_else(|| Some(sdk::AliasRoutingConfiguration::builder().build()));
            let resp = self
                .client
                .update_alias()
                .set_function_name(spec.function_name.clone())
                .set_name(spec.name.clone())
                .set_function_version(spec.function_version.clone())
                .set_description(Some(spec.description.clone().unwrap_or_default()))
                .set_routing_config(routing)
                .send()
                .await
                .map_err(|e| api_error("UpdateAlias", e))?;
            Ok(alias_description!(&resp))
        })
    }

    fn delete_alias<'a>(&'a self, function_name: &'a str, name: &'a str) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .delete_alias()
                .function_name(function_name)
                .name(name)
                .send()
                .await
                .map_err(|e| api_error("DeleteAlias", e))?;
            Ok(())
        })
    }

    fn get_provisioned_concurrency_config<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: &'a str,
    ) -> BoxFuture<'a, ApiResult<Option<i64>>> {
        Box::pin(async move {
            let resp = self
                .client
                .get_provisioned_concurrency_config()
                .function_name(function_name)
                .qualifier(qualifier)
                .send()
                .await
                .map_err(|e| api_error("GetProvisionedConcurrencyConfig", e))?;
            Ok(num(resp.requested_provisioned_concurrent_executions()))
        })
    }

    fn put_provisioned_concurrency_config<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: &'a str,
        executions: i64,
    ) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .put_provisioned_concurrency_config()
                .function_name(function_name)
                .qualifier(qualifier)
                .set_provisioned_concurrent_executions(narrow(Some(executions)))
                .send()
                .await
                .map_err(|e| api_error("PutProvisionedConcurrencyConfig", e))?;
            Ok(())
        })
    }

    fn delete_provisioned_concurrency_config<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: &'a str,
    ) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .delete_provisioned_concurrency_config()
                .function_name(function_name)
                .qualifier(qualifier)
                .send()
                .await
                .map_err(|e| api_error("DeleteProvisionedConcurrencyConfig", e))?;
            Ok(())
        })
    }

    fn get_policy<'a>(&'a self, function_name: &'a str, qualifier: Option<&'a str>) -> BoxFuture<'a, ApiResult<String>> {
        Box::pin(async move {
            let resp = self
                .client
                .get_policy()
                .function_name(function_name)
                .set_qualifier(qualifier.map(str::to_string))
                .send()
                .await
                .map_err(|e| api_error("GetPolicy", e))?;
            Ok(resp.policy().unwrap_or_default().to_string())
        })
    }

    fn add_permission<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: Option<&'a str>,
        permission: &'a Permission,
    ) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .add_permission()
                .function_name(function_name)
                .set_qualifier(qualifier.map(str::to_string))
                .set_statement_id(permission.statement_id.clone())
                .set_action(permission.action.clone())
                .set_principal(permission.principal.clone())
                .set_source_arn(permission.source_arn.clone())
                .set_source_account(permission.source_account.clone())
                .set_event_source_token(permission.event_source_token.clone())
                .set_principal_org_id(permission.principal_org_id.clone())
                .set_function_url_auth_type(enum_value(permission.function_url_auth_type.as_ref()))
                .send()
                .await
                .map_err(|e| api_error("AddPermission", e))?;
            Ok(())
        })
    }

    fn remove_permission<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: Option<&'a str>,
        statement_id: &'a str,
    ) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .remove_permission()
                .function_name(function_name)
                .set_qualifier(qualifier.map(str::to_string))
                .statement_id(statement_id)
                .send()
                .await
                .map_err(|e| api_error("RemovePermission", e))?;
            Ok(())
        })
    }

    fn create_event_source_mapping<'a>(
        &'a self,
        spec: &'a EventSourceMappingSpec,
    ) -> BoxFuture<'a, ApiResult<EventSourceMappingDescription>> {
        Box::pin(async move {
            let resp = self
                .client
                .create_event_source_mapping()
                .set_function_name(spec.function_name.clone())
                .set_event_source_arn(spec.event_source_arn.clone())
                .set_enabled(spec.enabled)
                .set_batch_size(narrow(spec.batch_size))
                .set_bisect_batch_on_function_error(spec.bisect_batch_on_function_error)
                .set_destination_config(destination_config_to(spec.destination_config.as_ref()))
                .set_filter_criteria(filter_criteria(spec, false))
                .set_function_response_types(enum_values(spec.function_response_types.as_ref()))
                .set_maximum_batching_window_in_seconds(narrow(spec.maximum_batching_window_in_seconds))
                .set_maximum_record_age_in_seconds(narrow(spec.maximum_record_age_in_seconds))
                .set_maximum_retry_attempts(narrow(spec.maximum_retry_attempts))
                .set_parallelization_factor(narrow(spec.parallelization_factor))
                .set_queues(spec.queues.clone())
                .set_scaling_config(scaling_config(spec))
                .set_source_access_configurations(source_access_configurations(spec))
                .set_starting_position(enum_value(spec.starting_position.as_ref()))
                .set_starting_position_timestamp(date_time(spec.starting_position_timestamp.as_ref()))
                .set_topics(spec.topics.clone())
                .set_tumbling_window_in_seconds(narrow(spec.tumbling_window_in_seconds))
                .send()
                .await
                .map_err(|e| api_error("CreateEventSourceMapping", e))?;
            Ok(event_source_mapping_description!(&resp))
        })
    }

    fn get_event_source_mapping<'a>(&'a self, uuid: &'a str) -> BoxFuture<'a, ApiResult<EventSourceMappingDescription>> {
        Box::pin(async move {
            let resp = self
                .client
                .get_event_source_mapping()
                .uuid(uuid)
                .send()
                .await
                .map_err(|e| api_error("GetEventSourceMapping", e))?;
            Ok(event_source_mapping_description!(&resp))
        })
    }

    fn update_event_source_mapping<'a>(
        &'a self,
        uuid: &'a str,
        spec: &'a EventSourceMappingSpec,
        clear_filters: bool,
    ) -> BoxFuture<'a, ApiResult<EventSourceMappingDescription>> {
        Box::pin(async move {
            let resp = self
                .client
                .update_event_source_mapping()
                .uuid(uuid)
                .set_function_name(spec.function_name.clone())
                .set_enabled(spec.enabled)
                .set_batch_size(narrow(spec.batch_size))
                .set_bisect_batch_on_function_error(spec.bisect_batch_on_function_error)
                .set_destination_config(destination_config_to(spec.destination_config.as_ref()))
                .set_filter_criteria(filter_criteria(spec, clear_filters))
                .set_function_response_types(enum_values(spec.function_response_types.as_ref()))
                .set_maximum_batching_window_in_seconds(narrow(spec.maximum_batching_window_in_seconds))
                .set_maximum_record_age_in_seconds(narrow(spec.maximum_record_age_in_seconds))
                .set_maximum_retry_attempts(narrow(spec.maximum_retry_attempts))
                .set_parallelization_factor(narrow(spec.parallelization_factor))
                .set_scaling_config(scaling_config(spec))
                .set_source_access_configurations(source_access_configurations(spec))
                .set_tumbling_window_in_seconds(narrow(spec.tumbling_window_in_seconds))
                .send()
                .await
                .map_err(|e| api_error("UpdateEventSourceMapping", e))?;
            Ok(event_source_mapping_description!(&resp))
        })
    }

    fn delete_event_source_mapping<'a>(&'a self, uuid: &'a str) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .delete_event_source_mapping()
                .uuid(uuid)
                .send()
                .await
                .map_err(|e| api_error("DeleteEventSourceMapping", e))?;
            Ok(())
        })
    }

    fn publish_layer_version<'a>(&'a self, spec: &'a LayerVersionSpec) -> BoxFuture<'a, ApiResult<LayerVersionDescription>> {
        Box::pin(async move {
            const OP: &str = "PublishLayerVersion";
            let content = spec.content.clone().unwrap_or_default();
            let resp = self
                .client
                .publish_layer_version()
                .set_layer_name(spec.layer_name.clone())
                .set_description(spec.description.clone())
                .set_license_info(spec.license_info.clone())
                .set_compatible_architectures(enum_values(spec.compatible_architectures.as_ref()))
                .set_compatible_runtimes(enum_values(spec.compatible_runtimes.as_ref()))
                .content(
                    sdk::LayerVersionContentInput::builder()
                        .set_s3_bucket(content.s3_bucket)
                        .set_s3_key(content.s3_key)
                        .set_s3_object_version(content.s3_object_version)
                        .set_zip_file(decode_zip(OP, content.zip_file.as_ref())?)
                        .build(),
                )
                .send()
                .await
                .map_err(|e| api_error(OP, e))?;
            Ok(layer_version_description!(&resp))
        })
    }

    fn get_layer_version<'a>(&'a self, layer_name: &'a str, version: i64) -> BoxFuture<'a, ApiResult<LayerVersionDescription>> {
        Box::pin(async move {
            let resp = self
                .client
                .get_layer_version()
                .layer_name(layer_name)
                .version_number(version)
                .send()
                .await
                .map_err(|e| api_error("GetLayerVersion", e))?;
            Ok(layer_version_description!(&resp))
        })
    }

    fn list_layer_versions<'a>(
        &'a self,
        layer_name: &'a str,
        marker: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<LayerVersionPage>> {
        Box::pin(async move {
            let resp = self
                .client
                .list_layer_versions()
                .layer_name(layer_name)
                .set_marker(marker.map(str::to_string))
                .send()
                .await
                .map_err(|e| api_error("ListLayerVersions", e))?;
            Ok(LayerVersionPage {
                versions: resp.layer_versions().iter().map(|v| v.version()).collect(),
                next_marker: text(resp.next_marker()),
            })
        })
    }

    fn delete_layer_version<'a>(&'a self, layer_name: &'a str, version: i64) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .delete_layer_version()
                .layer_name(layer_name)
                .version_number(version)
                .send()
                .await
                .map_err(|e| api_error("DeleteLayerVersion", e))?;
            Ok(())
        })
    }

    fn create_function_url_config<'a>(
        &'a self,
        spec: &'a FunctionUrlConfigSpec,
    ) -> BoxFuture<'a, ApiResult<FunctionUrlConfigDescription>> {
        Box::pin(async move {
            let resp = self
                .client
                .create_function_url_config()
                .set_function_name(spec.function_name.clone())
                .set_qualifier(spec.qualifier.clone())
                .set_auth_type(enum_value(spec.auth_type.as_ref()))
                .set_cors(cors(spec))
                .send()
                .await
                .map_err(|e| api_error("CreateFunctionUrlConfig", e))?;
            Ok(function_url_config_description!(&resp))
        })
    }

    fn get_function_url_config<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<FunctionUrlConfigDescription>> {
        Box::pin(async move {
            let resp = self
                .client
                .get_function_url_config()
                .function_name(function_name)
                .set_qualifier(qualifier.map(str::to_string))
                .send()
                .await
                .map_err(|e| api_error("GetFunctionUrlConfig", e))?;
            Ok(function_url_config_description!(&resp))
        })
    }

    fn update_function_url_config<'a>(
        &'a self,
        spec: &'a FunctionUrlConfigSpec,
    ) -> BoxFuture<'a, ApiResult<FunctionUrlConfigDescription>> {
        Box::pin(async move {
            let resp = self
                .client
                .update_function_url_config()
                .set_function_name(spec.function_name.clone())
                .set_qualifier(spec.qualifier.clone())
                .set_auth_type(enum_value(spec.auth_type.as_ref()))
                .set_cors(cors(spec))
                .send()
                .await
                .map_err(|e| api_error("UpdateFunctionUrlConfig", e))?;
            Ok(function_url_config_description!(&resp))
        })
    }

    fn delete_function_url_config<'a>(
        &'a self,
        function_name: &'a str,
        qualifier: Option<&'a str>,
    ) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .delete_function_url_config()
                .function_name(function_name)
                .set_qualifier(qualifier.map(str::to_string))
                .send()
                .await
                .map_err(|e| api_error("DeleteFunctionUrlConfig", e))?;
            Ok(())
        })
    }

    fn create_code_signing_config<'a>(
        &'a self,
        spec: &'a CodeSigningConfigSpec,
    ) -> BoxFuture<'a, ApiResult<CodeSigningConfigDescription>> {
        Box::pin(async move {
            const OP: &str = "CreateCodeSigningConfig";
            let resp = self
                .client
                .create_code_signing_config()
                .set_description(spec.description.clone())
                .allowed_publishers(allowed_publishers(OP, spec)?)
                .set_code_signing_policies(code_signing_policies(spec))
                .send()
                .await
                .map_err(|e| api_error(OP, e))?;
            code_signing_config_description(OP, Option::from(resp.code_signing_config()))
        })
    }

    fn get_code_signing_config<'a>(&'a self, arn: &'a str) -> BoxFuture<'a, ApiResult<CodeSigningConfigDescription>> {
        Box::pin(async move {
            const OP: &str = "GetCodeSigningConfig";
            let resp = self
                .client
                .get_code_signing_config()
                .code_signing_config_arn(arn)
                .send()
                .await
                .map_err(|e| api_error(OP, e))?;
            code_signing_config_description(OP, Option::from(resp.code_signing_config()))
        })
    }

    fn update_code_signing_config<'a>(
        &'a self,
        arn: &'a str,
        spec: &'a CodeSigningConfigSpec,
    ) -> BoxFuture<'a, ApiResult<CodeSigningConfigDescription>> {
        Box::pin(async move {
            const OP: &str = "UpdateCodeSigningConfig";
            let resp = self
                .client
                .update_code_signing_config()
                .code_signing_config_arn(arn)
                // An empty description clears the current one.
                .description(spec.description.clone().unwrap_or_default())
                .allowed_publishers(allowed_publishers(OP, spec)?)
                .set_code_signing_policies(code_signing_policies(spec))
                .send()
                .await
                .map_err(|e| api_error(OP, e))?;
            code_signing_config_description(OP, Option::from(resp.code_signing_config()))
        })
    }

    fn delete_code_signing_config<'a>(&'a self, arn: &'a str) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            self.client
                .delete_code_signing_config()
                .code_signing_config_arn(arn)
                .send()
                .await
                .map_err(|e| api_error("DeleteCodeSigningConfig", e))?;
            Ok(())
        })
    }
}
