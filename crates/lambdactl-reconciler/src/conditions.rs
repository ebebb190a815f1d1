//! Projects the outcome of a pass onto the object's condition list.
//!
//! Each condition type appears at most once. Entries are updated in place
//! and cleared rather than removed.

use lambdactl_core::{Condition, ConditionStatus, ConditionType};

use crate::error::ReconcileError;
use crate::references::ReferenceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Terminal,
    Recoverable,
}

/// Classify a pass error. `None` means the error is not reported as a
/// condition (requeue directives).
pub fn classify(err: &ReconcileError, terminal_codes: &[&str]) -> Option<ErrorClass> {
    match err {
        ReconcileError::Requeue(_) => None,
        ReconcileError::Terminal(_) => Some(ErrorClass::Terminal),
        ReconcileError::Reference(r) if r.is_terminal() => Some(ErrorClass::Terminal),
        ReconcileError::Api(e) if terminal_codes.contains(&e.code.as_str()) => {
            Some(ErrorClass::Terminal)
        }
        _ => Some(ErrorClass::Recoverable),
    }
}

/// Update `previous` for a pass that ended with `err`.
///
/// Returns the new list and whether anything observable changed.
pub fn project(
    previous: &[Condition],
    err: Option<&ReconcileError>,
    terminal_codes: &[&str],
) -> (Vec<Condition>, bool) {
    let mut conditions = dedup(previous);
    match err.map(|e| (e, classify(e, terminal_codes))) {
        None => {
            clear(&mut conditions, ConditionType::Terminal);
            clear(&mut conditions, ConditionType::Recoverable);
        }
        Some((_, None)) => {}
        Some((e, Some(ErrorClass::Terminal))) => {
            set(&mut conditions, ConditionType::Terminal, ConditionStatus::True, Some(e.to_string()));
        }
        Some((e, Some(ErrorClass::Recoverable))) => {
            set(&mut conditions, ConditionType::Recoverable, ConditionStatus::True, Some(e.to_string()));
            clear(&mut conditions, ConditionType::Terminal);
        }
    }
    let changed = differs(previous, &conditions);
    (conditions, changed)
}

/// Set the synced condition. Owned by the pass driver, never by [`project`].
pub fn set_synced(conditions: &mut Vec<Condition>, synced: bool, message: Option<String>) -> bool {
    let before = conditions.clone();
    let status = if synced {
        ConditionStatus::True
    } else {
        ConditionStatus::False
    };
    set(conditions, ConditionType::ResourceSynced, status, message);
    differs(&before, conditions)
}

/// A reference failure the caller should retry: the referenced object has
/// not settled yet.
pub fn is_reference_pending(err: &ReconcileError) -> bool {
    matches!(err, ReconcileError::Reference(ReferenceError::NotSynced { .. }))
}

fn set(
    conditions: &mut Vec<Condition>,
    type_: ConditionType,
    status: ConditionStatus,
    message: Option<String>,
) {
    match conditions.iter_mut().find(|c| c.type_ == type_) {
        Some(existing) => {
            if existing.status != status {
                existing.last_transition_time = Some(jiff::Timestamp::now());
            }
            existing.status = status;
            existing.message = message;
        }
        None => conditions.push(Condition::new(type_, status, message)),
    }
}

/// Clear an existing condition. Absent conditions stay absent.
fn clear(conditions: &mut [Condition], type_: ConditionType) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.type_ == type_) {
        if existing.status != ConditionStatus::False {
            existing.last_transition_time = Some(jiff::Timestamp::now());
        }
        existing.status = ConditionStatus::False;
        existing.message = None;
    }
}

/// Keep the first entry of each type.
fn dedup(conditions: &[Condition]) -> Vec<Condition> {
    let mut out: Vec<Condition> = Vec::with_capacity(conditions.len());
    for c in conditions {
        if !out.iter().any(|o| o.type_ == c.type_) {
            out.push(c.clone());
        }
    }
    out
}

/// Compare ignoring transition timestamps.
fn differs(a: &[Condition], b: &[Condition]) -> bool {
    a.len() != b.len()
        || a.iter().zip(b).any(|(x, y)| {
            x.type_ != y.type_ || x.status != y.status || x.message != y.message
        })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::{ApiError, codes};
    use crate::requeue::RequeueDirective;

    const TERMINAL_CODES: &[&str] = &[codes::INVALID_PARAMETER_VALUE];

    fn api(code: &str) -> ReconcileError {
        ReconcileError::Api(ApiError::new("UpdateFunctionConfiguration", code, "boom"))
    }

    fn status_of(conditions: &[Condition], type_: ConditionType) -> Option<ConditionStatus> {
        conditions.iter().find(|c| c.type_ == type_).map(|c| c.status)
    }

    #[test]
    fn terminal_codes_and_references_classify_as_terminal() {
        assert_eq!(
            classify(&api(codes::INVALID_PARAMETER_VALUE), TERMINAL_CODES),
            Some(ErrorClass::Terminal)
        );
        assert_eq!(
            classify(&api(codes::RESOURCE_CONFLICT), TERMINAL_CODES),
            Some(ErrorClass::Recoverable)
        );
        let terminal_ref = ReconcileError::Reference(ReferenceError::Terminal {
            kind: "Role".into(),
            namespace: "default".into(),
            name: "exec".into(),
        });
        assert_eq!(classify(&terminal_ref, &[]), Some(ErrorClass::Terminal));
        let requeue: ReconcileError = RequeueDirective::after("pending", Duration::from_secs(5)).into();
        assert_eq!(classify(&requeue, TERMINAL_CODES), None);
    }

    #[test]
    fn recoverable_error_clears_an_earlier_terminal() {
        let (after_terminal, changed) = project(&[], Some(&ReconcileError::Terminal("bad".into())), &[]);
        assert!(changed);
        assert_eq!(status_of(&after_terminal, ConditionType::Terminal), Some(ConditionStatus::True));

        let (after_recoverable, changed) = project(&after_terminal, Some(&api("ServiceException")), TERMINAL_CODES);
        assert!(changed);
        assert_eq!(status_of(&after_recoverable, ConditionType::Terminal), Some(ConditionStatus::False));
        assert_eq!(
            status_of(&after_recoverable, ConditionType::Recoverable),
            Some(ConditionStatus::True)
        );
    }

    #[test]
    fn success_clears_without_removing_and_is_stable() {
        let (failed, _) = project(&[], Some(&api("ServiceException")), TERMINAL_CODES);
        let (once, changed) = project(&failed, None, TERMINAL_CODES);
        assert!(changed);
        assert_eq!(once.len(), 1);
        assert_eq!(status_of(&once, ConditionType::Recoverable), Some(ConditionStatus::False));
        assert!(once[0].message.is_none());

        let (twice, changed) = project(&once, None, TERMINAL_CODES);
        assert!(!changed);
        assert_eq!(twice, once);
    }

    #[test]
    fn success_on_a_clean_object_adds_nothing() {
        let (conditions, changed) = project(&[], None, TERMINAL_CODES);
        assert!(conditions.is_empty());
        assert!(!changed);
    }

    #[test]
    fn duplicate_entries_collapse_to_one() {
        let dup = vec![
            Condition::new(ConditionType::Terminal, ConditionStatus::True, Some("a".into())),
            Condition::new(ConditionType::Terminal, ConditionStatus::True, Some("b".into())),
        ];
        let (conditions, changed) = project(&dup, Some(&ReconcileError::Terminal("c".into())), &[]);
        assert!(changed);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].message.as_deref(), Some("terminal error: c"));
    }

    #[test]
    fn synced_is_left_alone_by_projection() {
        let mut conditions = Vec::new();
        assert!(set_synced(&mut conditions, true, None));
        assert!(!set_synced(&mut conditions, true, None));
        let (projected, _) = project(&conditions, Some(&ReconcileError::Terminal("x".into())), &[]);
        assert_eq!(
            status_of(&projected, ConditionType::ResourceSynced),
            Some(ConditionStatus::True)
        );
    }
}
