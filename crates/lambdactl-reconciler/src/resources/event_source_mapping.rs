//! Event source mappings. The service assigns the UUID that identifies a
//! mapping, so a mapping without one in status has not been created yet.

use std::sync::Arc;

use lambdactl_core::ResourceKind;
use lambdactl_core::models::event_source_mapping::{
    EventSourceMapping, EventSourceMappingSpec, EventSourceMappingStatus, FilterCriteria,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::api::{LambdaApi, absent_on};
use crate::config::Timing;
use crate::delta::{Delta, DeltaPolicy, multiset_eq};
use crate::error::{ReconcileError, codes};
use crate::manager::{BoxFuture, ResourceManager, merge_remote};
use crate::references::ReferenceResolver;
use crate::requeue::RequeueDirective;
use crate::resources::{classify_api_error, require_function_name, resolve_function_name};

pub struct EventSourceMappingManager {
    api: Arc<dyn LambdaApi>,
    timing: Timing,
}

impl EventSourceMappingManager {
    pub fn new(api: Arc<dyn LambdaApi>, timing: Timing) -> Self {
        Self { api, timing }
    }

    fn transitional(&self, mapping: &EventSourceMapping) -> Option<RequeueDirective> {
        mapping.status.is_transitional().then(|| {
            RequeueDirective::after(
                format!(
                    "event source mapping is {}",
                    mapping.status.state.as_deref().unwrap_or_default()
                ),
                self.timing.esm_transitional(),
            )
        })
    }
}

/// Filters are compared as a multiset of patterns. Patterns are JSON, so
/// they are compared after normalizing whitespace and key order.
pub struct EventSourceMappingDeltaPolicy;

impl DeltaPolicy<EventSourceMappingSpec> for EventSourceMappingDeltaPolicy {
    fn custom_paths(&self) -> &[&'static str] {
        &["filterCriteria"]
    }

    fn custom_compare(&self, delta: &mut Delta, desired: &EventSourceMappingSpec, observed: &EventSourceMappingSpec) {
        let want = patterns(desired.filter_criteria.as_ref());
        let have = patterns(observed.filter_criteria.as_ref());
        if !multiset_eq(&want, &have) {
            delta.add(
                "filterCriteria.filters",
                (!want.is_empty()).then(|| Value::from(want.clone())),
                (!have.is_empty()).then(|| Value::from(have.clone())),
            );
        }
    }

    /// The service fills batching, retry and position settings with
    /// per-source defaults.
    fn late_initialize(&self, desired: &EventSourceMappingSpec, observed: &EventSourceMappingSpec) -> EventSourceMappingSpec {
        let mut spec = desired.clone();
        fill(&mut spec.batch_size, &observed.batch_size);
        fill(&mut spec.bisect_batch_on_function_error, &observed.bisect_batch_on_function_error);
        fill(&mut spec.destination_config, &observed.destination_config);
        fill(&mut spec.enabled, &observed.enabled);
        fill(&mut spec.function_response_types, &observed.function_response_types);
        fill(&mut spec.maximum_batching_window_in_seconds, &observed.maximum_batching_window_in_seconds);
        fill(&mut spec.maximum_record_age_in_seconds, &observed.maximum_record_age_in_seconds);
        fill(&mut spec.maximum_retry_attempts, &observed.maximum_retry_attempts);
        fill(&mut spec.parallelization_factor, &observed.parallelization_factor);
        fill(&mut spec.scaling_config, &observed.scaling_config);
        fill(&mut spec.starting_position, &observed.starting_position);
        fill(&mut spec.starting_position_timestamp, &observed.starting_position_timestamp);
        fill(&mut spec.tumbling_window_in_seconds, &observed.tumbling_window_in_seconds);
        spec
    }
}

fn fill<T: Clone>(slot: &mut Option<T>, observed: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(observed);
    }
}

fn patterns(criteria: Option<&FilterCriteria>) -> Vec<String> {
    criteria
        .and_then(|c| c.filters.as_ref())
        .into_iter()
        .flatten()
        .filter_map(|f| f.pattern.as_deref())
        .filter(|p| !p.is_empty())
        .map(normalize_pattern)
        .collect()
}

fn normalize_pattern(pattern: &str) -> String {
    serde_json::from_str::<Value>(pattern)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| pattern.to_string())
}

/// The user removed every filter the mapping still has. The update must
/// then carry an explicit empty list, because omitting the field keeps the
/// current filters.
pub fn filters_removed(desired: &EventSourceMappingSpec, observed: &EventSourceMappingSpec, delta: &Delta) -> bool {
    delta.different_at("filterCriteria")
        && !observed.filter_criteria.as_ref().is_none_or(FilterCriteria::is_empty)
        && desired.filter_criteria.as_ref().is_none_or(FilterCriteria::is_empty)
}

impl ResourceManager for EventSourceMappingManager {
    type Spec = EventSourceMappingSpec;
    type Status = EventSourceMappingStatus;

    fn kind(&self) -> ResourceKind {
        ResourceKind::EventSourceMapping
    }

    fn delta_policy(&self) -> &dyn DeltaPolicy<EventSourceMappingSpec> {
        &EventSourceMappingDeltaPolicy
    }

    fn terminal_codes(&self) -> &'static [&'static str] {
        &[codes::INVALID_PARAMETER_VALUE]
    }

    fn resolve_references<'a>(
        &'a self,
        resolver: &'a ReferenceResolver,
        desired: &'a EventSourceMapping,
    ) -> BoxFuture<'a, Result<(EventSourceMapping, bool), ReconcileError>> {
        Box::pin(async move {
            let mut resolved = desired.clone();
            resolved.spec.function_name = resolve_function_name(
                resolver,
                &desired.metadata.namespace,
                desired.spec.function_name.as_ref(),
                desired.spec.function_ref.as_ref(),
            )
            .await?;
            Ok((resolved, desired.spec.function_ref.is_some()))
        })
    }

    fn clear_references(&self, original: &EventSourceMappingSpec, resolved: &EventSourceMappingSpec) -> EventSourceMappingSpec {
        EventSourceMappingSpec {
            function_name: original.function_name.clone(),
            ..resolved.clone()
        }
    }

    fn read<'a>(
        &'a self,
        desired: &'a EventSourceMapping,
    ) -> BoxFuture<'a, Result<Option<EventSourceMapping>, ReconcileError>> {
        Box::pin(async move {
            let Some(uuid) = desired.status.uuid.as_deref() else {
                return Ok(None);
            };
            let Some(remote) = absent_on(
                self.api.get_event_source_mapping(uuid).await,
                &[codes::RESOURCE_NOT_FOUND],
            )?
            else {
                return Ok(None);
            };

            // The service answers with the function ARN; keep the name as written.
            let mut spec = remote.spec;
            spec.function_name = desired.spec.function_name.clone();
            spec.function_ref = desired.spec.function_ref.clone();

            Ok(Some(merge_remote(desired, spec, remote.status)))
        })
    }

    fn create<'a>(&'a self, desired: &'a EventSourceMapping) -> BoxFuture<'a, Result<EventSourceMapping, ReconcileError>> {
        Box::pin(async move {
            let function_name = require_function_name(desired.spec.function_name.as_ref())?;
            tracing::info!(
                function_name,
                event_source_arn = ?desired.spec.event_source_arn,
                "creating event source mapping"
            );
            let created = self
                .api
                .create_event_source_mapping(&desired.spec)
                .await
                .map_err(|e| classify_api_error(e, &self.timing))?;
            tracing::info!(uuid = ?created.status.uuid, state = ?created.status.state, "event source mapping created");
            Ok(merge_remote(desired, desired.spec.clone(), created.status))
        })
    }

    fn update<'a>(
        &'a self,
        desired: &'a EventSourceMapping,
        observed: &'a EventSourceMapping,
        delta: &'a Delta,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<EventSourceMapping, ReconcileError>> {
        Box::pin(async move {
            if let Some(directive) = self.transitional(observed) {
                return Err(directive.into());
            }
            let uuid = observed.status.uuid.as_deref().ok_or_else(|| {
                ReconcileError::UpdateFailed("event source mapping has no UUID recorded".to_string())
            })?;

            let clear_filters = filters_removed(&desired.spec, &observed.spec, delta);
            tracing::info!(uuid, clear_filters, "updating event source mapping");
            self.api
                .update_event_source_mapping(uuid, &desired.spec, clear_filters)
                .await
                .map_err(|e| classify_api_error(e, &self.timing))?;

            self.read(observed).await?.ok_or_else(|| ReconcileError::NotFound {
                kind: ResourceKind::EventSourceMapping,
                name: desired.metadata.name.clone(),
            })
        })
    }

    fn delete<'a>(&'a self, observed: &'a EventSourceMapping) -> BoxFuture<'a, Result<(), ReconcileError>> {
        Box::pin(async move {
            let Some(uuid) = observed.status.uuid.as_deref() else {
                return Ok(());
            };
            if observed.status.state.as_deref() == Some("Deleting") {
                return Ok(());
            }
            if let Some(directive) = self.transitional(observed) {
                return Err(directive.into());
            }
            tracing::info!(uuid, "deleting event source mapping");
            match self.api.delete_event_source_mapping(uuid).await {
                Err(e) if e.is_not_found() => Ok(()),
                other => other.map_err(|e| classify_api_error(e, &self.timing)),
            }
        })
    }

    fn settling(&self, latest: &EventSourceMapping) -> Option<RequeueDirective> {
        self.transitional(latest)
    }
}

#[cfg(test)]
mod tests {
    use lambdactl_core::models::event_source_mapping::Filter;

    use super::*;
    use crate::delta::compute;

    fn criteria(patterns: &[&str]) -> Option<FilterCriteria> {
        Some(FilterCriteria {
            filters: Some(
                patterns
                    .iter()
                    .map(|p| Filter {
                        pattern: Some(p.to_string()),
                    })
                    .collect(),
            ),
        })
    }

    #[test]
    fn filter_order_and_formatting_are_ignored() {
        let desired = EventSourceMappingSpec {
            filter_criteria: criteria(&[r#"{"body": {"a": [1]}}"#, r#"{"b":[2]}"#]),
            ..Default::default()
        };
        let observed = EventSourceMappingSpec {
            filter_criteria: criteria(&[r#"{"b":[2]}"#, r#"{"body":{"a":[1]}}"#]),
            ..Default::default()
        };
        assert!(compute(&EventSourceMappingDeltaPolicy, &desired, &observed).is_empty());
    }

    #[test]
    fn removing_all_filters_clears_them() {
        let desired = EventSourceMappingSpec::default();
        let observed = EventSourceMappingSpec {
            filter_criteria: criteria(&[r#"{"b":[2]}"#]),
            ..Default::default()
        };
        let delta = compute(&EventSourceMappingDeltaPolicy, &desired, &observed);
        assert!(delta.different_at("filterCriteria"));
        assert!(filters_removed(&desired, &observed, &delta));
        assert!(!filters_removed(&observed, &desired, &delta));
    }

    #[test]
    fn empty_criteria_equals_none() {
        let desired = EventSourceMappingSpec {
            filter_criteria: Some(FilterCriteria::default()),
            ..Default::default()
        };
        assert!(compute(&EventSourceMappingDeltaPolicy, &desired, &EventSourceMappingSpec::default()).is_empty());
    }

    #[test]
    fn service_defaults_are_not_drift() {
        let desired = EventSourceMappingSpec {
            event_source_arn: Some("arn:aws:sqs:us-west-2:1:q".into()),
            batch_size: Some(5),
            ..Default::default()
        };
        let observed = EventSourceMappingSpec {
            event_source_arn: Some("arn:aws:sqs:us-west-2:1:q".into()),
            batch_size: Some(10),
            maximum_batching_window_in_seconds: Some(0),
            enabled: Some(true),
            ..Default::default()
        };
        let policy = EventSourceMappingDeltaPolicy;
        let target = policy.late_initialize(&desired, &observed);
        assert_eq!(target.batch_size, Some(5));
        let delta = compute(&policy, &target, &observed);
        assert_eq!(delta.paths().collect::<Vec<_>>(), vec!["batchSize"]);
    }
}
