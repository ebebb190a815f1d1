use std::fmt;

use serde::{Deserialize, Serialize};

/// The three condition types carried on every managed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    /// The last error cannot be fixed by retrying.
    #[serde(rename = "ACK.Terminal")]
    Terminal,
    /// The last error is expected to clear on a later pass.
    #[serde(rename = "ACK.Recoverable")]
    Recoverable,
    /// Desired and observed state have converged.
    #[serde(rename = "ACK.ResourceSynced")]
    ResourceSynced,
}

impl ConditionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Terminal => "ACK.Terminal",
            Self::Recoverable => "ACK.Recoverable",
            Self::ResourceSynced => "ACK.ResourceSynced",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: ConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<jiff::Timestamp>,
}

impl Condition {
    pub fn new(type_: ConditionType, status: ConditionStatus, message: Option<String>) -> Self {
        Self {
            type_,
            status,
            message,
            reason: None,
            last_transition_time: Some(jiff::Timestamp::now()),
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Find the condition of the given type, if one has ever been recorded.
pub fn find(conditions: &[Condition], type_: ConditionType) -> Option<&Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// True when a condition of the given type exists with status `True`.
pub fn is_true(conditions: &[Condition], type_: ConditionType) -> bool {
    find(conditions, type_).is_some_and(Condition::is_true)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn wire_names_match_the_object_status() {
        let parsed: Vec<Condition> = serde_json::from_value(json!([
            {"type": "ACK.Terminal", "status": "False"},
            {"type": "ACK.ResourceSynced", "status": "True", "message": "ok"},
        ]))
        .unwrap();

        assert!(!is_true(&parsed, ConditionType::Terminal));
        assert!(is_true(&parsed, ConditionType::ResourceSynced));
        assert!(find(&parsed, ConditionType::Recoverable).is_none());

        let written = serde_json::to_value(&parsed[1]).unwrap();
        assert_eq!(written, json!({"type": "ACK.ResourceSynced", "status": "True", "message": "ok"}));
    }
}
