use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

const DEFAULT_MAX_PASSES: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    /// Falls back to the SDK's default region chain when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub manifest_dir: PathBuf,
    pub status_dir: PathBuf,
    #[serde(default)]
    pub timing: Timing,
    /// Upper bound on passes the binary runs before giving up on requeues.
    #[serde(default = "default_max_passes")]
    pub max_passes: u32,
}

fn default_max_passes() -> u32 {
    DEFAULT_MAX_PASSES
}

/// Requeue delays and update polling, all in whole units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Object is `Pending` or mid-update.
    pub pending_requeue_secs: u64,
    /// Service answered with a conflict or not-ready error.
    pub busy_requeue_secs: u64,
    /// Image has not reached the registry yet.
    pub source_image_requeue_secs: u64,
    /// Event source mapping is in a transitional state.
    pub esm_requeue_secs: u64,
    pub poll_interval_ms: u64,
    pub poll_deadline_secs: u64,
    /// Delay before retrying a pass that ended in a recoverable error.
    pub error_backoff_secs: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            pending_requeue_secs: 5,
            busy_requeue_secs: 5,
            source_image_requeue_secs: 60,
            esm_requeue_secs: 10,
            poll_interval_ms: 2_000,
            poll_deadline_secs: 60,
            error_backoff_secs: 15,
        }
    }
}

impl Timing {
    pub fn pending(&self) -> Duration {
        Duration::from_secs(self.pending_requeue_secs)
    }

    pub fn busy(&self) -> Duration {
        Duration::from_secs(self.busy_requeue_secs)
    }

    pub fn source_image(&self) -> Duration {
        Duration::from_secs(self.source_image_requeue_secs)
    }

    pub fn esm_transitional(&self) -> Duration {
        Duration::from_secs(self.esm_requeue_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_deadline(&self) -> Duration {
        Duration::from_secs(self.poll_deadline_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_VERSION,
            region: None,
            manifest_dir: PathBuf::from("manifests"),
            status_dir: PathBuf::from("status"),
            timing: Timing::default(),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl ReconcilerConfig {
    /// Load from `path` if it exists, otherwise start from defaults, then
    /// apply `LAMBDACTL_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ReconcileError> {
        let mut config = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ReconcileError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ReconcileError::Config(format!("failed to read config at {}: {e}", path.display()))
        })?;

        // Parse as raw JSON so we can run migrations before deserializing.
        let json: serde_json::Value = serde_json::from_str(&contents)?;
        let on_disk_version = json
            .get("config_version")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;

        let migrated = migrate(json, on_disk_version)?;
        Ok(serde_json::from_value(migrated)?)
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ReconcileError> {
        if let Some(v) = lookup("LAMBDACTL_REGION") {
            self.region = Some(v);
        }
        if let Some(v) = lookup("LAMBDACTL_MANIFEST_DIR") {
            self.manifest_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("LAMBDACTL_STATUS_DIR") {
            self.status_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("LAMBDACTL_MAX_PASSES") {
            self.max_passes = parse_number("LAMBDACTL_MAX_PASSES", &v)?;
        }

        let timing = &mut self.timing;
        let numeric: [(&str, &mut u64); 7] = [
            ("LAMBDACTL_PENDING_REQUEUE_SECS", &mut timing.pending_requeue_secs),
            ("LAMBDACTL_BUSY_REQUEUE_SECS", &mut timing.busy_requeue_secs),
            ("LAMBDACTL_SOURCE_IMAGE_REQUEUE_SECS", &mut timing.source_image_requeue_secs),
            ("LAMBDACTL_ESM_REQUEUE_SECS", &mut timing.esm_requeue_secs),
            ("LAMBDACTL_POLL_INTERVAL_MS", &mut timing.poll_interval_ms),
            ("LAMBDACTL_POLL_DEADLINE_SECS", &mut timing.poll_deadline_secs),
            ("LAMBDACTL_ERROR_BACKOFF_SECS", &mut timing.error_backoff_secs),
        ];
        for (key, slot) in numeric {
            if let Some(v) = lookup(key) {
                *slot = parse_number(key, &v)?;
            }
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ReconcileError> {
    value
        .trim()
        .parse()
        .map_err(|_| ReconcileError::Config(format!("{key} must be a non-negative integer, got {value:?}")))
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
fn migrate(mut json: serde_json::Value, from_version: u32) -> Result<serde_json::Value, ReconcileError> {
    if from_version > CURRENT_VERSION {
        return Err(ReconcileError::Config(format!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION})"
        )));
    }

    // v0 → v1: pre-versioned configs had no pass limit
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| ReconcileError::Config("config is not a JSON object".to_string()))?;
        obj.entry("max_passes")
            .or_insert(serde_json::Value::Number(DEFAULT_MAX_PASSES.into()));
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1 (added max_passes)");
    }

    Ok(json)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn overrides_replace_file_values() {
        let mut config = ReconcilerConfig::default();
        let env = HashMap::from([
            ("LAMBDACTL_REGION", "eu-west-1"),
            ("LAMBDACTL_PENDING_REQUEUE_SECS", "7"),
            ("LAMBDACTL_POLL_INTERVAL_MS", "250"),
        ]);
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.timing.pending(), Duration::from_secs(7));
        assert_eq!(config.timing.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.timing.busy(), Duration::from_secs(5));
    }

    #[test]
    fn bad_number_is_rejected() {
        let mut config = ReconcilerConfig::default();
        let err = config
            .apply_overrides(|k| (k == "LAMBDACTL_MAX_PASSES").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("LAMBDACTL_MAX_PASSES"));
    }

    #[test]
    fn unversioned_config_is_migrated() {
        let json = serde_json::json!({
            "manifest_dir": "m",
            "status_dir": "s",
        });
        let migrated = migrate(json, 0).unwrap();
        let config: ReconcilerConfig = serde_json::from_value(migrated).unwrap();
        assert_eq!(config.config_version, 1);
        assert_eq!(config.max_passes, DEFAULT_MAX_PASSES);
        assert_eq!(config.timing, Timing::default());
    }

    #[test]
    fn newer_config_is_refused() {
        assert!(migrate(serde_json::json!({}), CURRENT_VERSION + 1).is_err());
    }
}
