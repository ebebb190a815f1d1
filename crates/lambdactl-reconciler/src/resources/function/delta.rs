use lambdactl_core::models::function::{FunctionCode, FunctionSpec};
use serde_json::json;

use crate::delta::{Delta, DeltaPolicy, compare_secret_map};

/// Comparison rules for functions.
///
/// The service never returns the deployment package locator, only the hash
/// of what it holds, so code is compared by hash (and by image URI for
/// container images). Environment values may be secret and are compared
/// without recording them.
pub struct FunctionDeltaPolicy;

impl DeltaPolicy<FunctionSpec> for FunctionDeltaPolicy {
    fn custom_paths(&self) -> &[&'static str] {
        &["code", "environment"]
    }

    fn custom_compare(&self, delta: &mut Delta, desired: &FunctionSpec, observed: &FunctionSpec) {
        compare_code(delta, desired, observed);
        compare_secret_map(
            delta,
            "environment",
            desired.environment.as_ref().and_then(|e| e.variables.as_ref()),
            observed.environment.as_ref().and_then(|e| e.variables.as_ref()),
        );
    }

    fn late_initialize(&self, desired: &FunctionSpec, observed: &FunctionSpec) -> FunctionSpec {
        let mut spec = desired.clone();
        fill(&mut spec.memory_size, &observed.memory_size);
        fill(&mut spec.timeout, &observed.timeout);
        fill(&mut spec.package_type, &observed.package_type);
        fill(&mut spec.architectures, &observed.architectures);
        fill(&mut spec.ephemeral_storage, &observed.ephemeral_storage);
        fill(&mut spec.tracing_config, &observed.tracing_config);
        fill(&mut spec.logging_config, &observed.logging_config);
        fill(&mut spec.snap_start, &observed.snap_start);
        spec
    }
}

fn fill<T: Clone>(slot: &mut Option<T>, observed: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(observed);
    }
}

fn compare_code(delta: &mut Delta, desired: &FunctionSpec, observed: &FunctionSpec) {
    let (d, o) = match (&desired.code, &observed.code) {
        (None, None) => return,
        (Some(d), Some(o)) => (d, o),
        (d, o) => {
            delta.add("code", d.as_ref().map(code_summary), o.as_ref().map(code_summary));
            return;
        }
    };

    // A zip package without a declared hash has nothing to compare against.
    if !desired.is_image() {
        if let Some(hash) = &d.sha256 {
            if o.sha256.as_ref() != Some(hash) {
                delta.add("code.sha256", Some(json!(hash)), o.sha256.as_ref().map(|h| json!(h)));
            }
        }
    }

    if let Some(uri) = &d.image_uri {
        if o.image_uri.as_ref() != Some(uri) {
            delta.add("code.imageURI", Some(json!(uri)), o.image_uri.as_ref().map(|u| json!(u)));
        }
    }
}

/// What a code block looks like in a delta. Archive bytes are left out.
fn code_summary(code: &FunctionCode) -> serde_json::Value {
    json!({
        "imageURI": code.image_uri,
        "s3Bucket": code.s3_bucket,
        "s3Key": code.s3_key,
        "sha256": code.sha256,
    })
}
