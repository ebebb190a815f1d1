//! Field-level differences between a desired and an observed spec.
//!
//! The default comparison is structural over the serialized records, so the
//! paths are the camelCase wire names relative to the spec
//! (`memorySize`, `code.sha256`, `functionEventInvokeConfig`). Fields the
//! remote service cannot echo back verbatim are claimed by a kind's
//! [`DeltaPolicy`] and compared there instead.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// One side of a difference.
#[derive(Debug, Clone, PartialEq)]
pub enum Side {
    Absent,
    Present(Value),
    /// Present, but the value must not be recorded.
    Redacted,
}

impl Side {
    pub fn is_absent(&self) -> bool {
        matches!(self, Side::Absent)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Side::Present(v) => Some(v),
            _ => None,
        }
    }

    fn from_option(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => Side::Absent,
            Some(v) => Side::Present(v),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Side::Absent => f.write_str("<absent>"),
            Side::Redacted => f.write_str("<redacted>"),
            Side::Present(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Difference {
    pub path: String,
    pub desired: Side,
    pub observed: Side,
}

impl Difference {
    /// The user dropped a block the remote object still carries.
    pub fn is_removal(&self) -> bool {
        self.desired.is_absent() && !self.observed.is_absent()
    }

    /// True when `self.path` is `path`, lies under it, or contains it.
    fn touches(&self, path: &str) -> bool {
        is_within(&self.path, path) || is_within(path, &self.path)
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.path, self.observed, self.desired)
    }
}

/// An ordered set of differences. An empty delta means converged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    differences: Vec<Difference>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, desired: Option<Value>, observed: Option<Value>) {
        self.differences.push(Difference {
            path: path.into(),
            desired: Side::from_option(desired),
            observed: Side::from_option(observed),
        });
    }

    /// Record that `path` differs without keeping either value.
    pub fn add_redacted(&mut self, path: impl Into<String>, desired_present: bool, observed_present: bool) {
        let side = |present: bool| if present { Side::Redacted } else { Side::Absent };
        self.differences.push(Difference {
            path: path.into(),
            desired: side(desired_present),
            observed: side(observed_present),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }

    pub fn len(&self) -> usize {
        self.differences.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Difference> {
        self.differences.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.differences.iter().map(|d| d.path.as_str())
    }

    pub fn get(&self, path: &str) -> Option<&Difference> {
        self.differences.iter().find(|d| d.path == path)
    }

    /// Any difference at `path`, below it, or at one of its ancestors.
    pub fn different_at(&self, path: &str) -> bool {
        self.differences.iter().any(|d| d.touches(path))
    }

    /// Any difference outside all of the given subtrees.
    pub fn different_except(&self, paths: &[&str]) -> bool {
        self.differences
            .iter()
            .any(|d| !paths.iter().any(|p| is_within(&d.path, p)))
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, d) in self.differences.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Delta {
    type Item = &'a Difference;
    type IntoIter = std::slice::Iter<'a, Difference>;

    fn into_iter(self) -> Self::IntoIter {
        self.differences.iter()
    }
}

/// Per-kind comparison rules layered over the structural default.
pub trait DeltaPolicy<S>: Send + Sync {
    /// Subtrees the structural pass skips because `custom_compare` owns them.
    fn custom_paths(&self) -> &[&'static str] {
        &[]
    }

    fn custom_compare(&self, _delta: &mut Delta, _desired: &S, _observed: &S) {}

    /// Fill fields the user left unset with the server's defaults, so a
    /// server-chosen value is not reported as drift on every pass.
    fn late_initialize(&self, desired: &S, _observed: &S) -> S
    where
        S: Clone,
    {
        desired.clone()
    }
}

/// Structural comparison with no overrides.
pub struct Structural;

impl<S> DeltaPolicy<S> for Structural {}

/// Compute the delta of `desired` against `observed` under `policy`.
pub fn compute<S: Serialize>(policy: &dyn DeltaPolicy<S>, desired: &S, observed: &S) -> Delta {
    let mut delta = Delta::new();
    // Derived Serialize for string-keyed records cannot fail.
    let desired_value = serde_json::to_value(desired).unwrap_or(Value::Null);
    let observed_value = serde_json::to_value(observed).unwrap_or(Value::Null);
    compare_into(
        &mut delta,
        "",
        Some(&desired_value),
        Some(&observed_value),
        policy.custom_paths(),
    );
    policy.custom_compare(&mut delta, desired, observed);
    delta
}

fn compare_into(
    delta: &mut Delta,
    path: &str,
    desired: Option<&Value>,
    observed: Option<&Value>,
    skip: &[&str],
) {
    if !path.is_empty() && skip.iter().any(|s| is_within(path, s)) {
        return;
    }
    let desired = desired.filter(|v| !v.is_null());
    let observed = observed.filter(|v| !v.is_null());

    match (desired, observed) {
        (None, None) => {}
        (Some(Value::Object(d)), Some(Value::Object(o))) => {
            let mut keys: Vec<&String> = d.keys().chain(o.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                compare_into(delta, &join(path, key), d.get(key), o.get(key), skip);
            }
        }
        (d, o) if d == o => {}
        (d, o) => delta.add(path, d.cloned(), o.cloned()),
    }
}

/// Join a parent path and a field name.
pub fn join(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

/// `path` equals `ancestor` or lies beneath it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    path == ancestor
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Compare a map that may hold secret material. Values never reach the delta.
pub fn compare_secret_map(
    delta: &mut Delta,
    path: &str,
    desired: Option<&BTreeMap<String, String>>,
    observed: Option<&BTreeMap<String, String>>,
) {
    let desired = desired.filter(|m| !m.is_empty());
    let observed = observed.filter(|m| !m.is_empty());
    if desired != observed {
        delta.add_redacted(path, desired.is_some(), observed.is_some());
    }
}

/// Order-insensitive equality that still counts duplicates.
pub fn multiset_eq<T: Ord + Clone>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

/// Split two maps into keys to add, keys to remove and keys whose value changed.
///
/// `desired` wins on conflicts; unchanged keys appear in none of the outputs.
pub fn compare_maps(
    observed: &BTreeMap<String, String>,
    desired: &BTreeMap<String, String>,
) -> (
    BTreeMap<String, String>,
    Vec<String>,
    BTreeMap<String, String>,
) {
    let mut added = BTreeMap::new();
    let mut updated = BTreeMap::new();
    for (key, value) in desired {
        match observed.get(key) {
            None => {
                added.insert(key.clone(), value.clone());
            }
            Some(current) if current != value => {
                updated.insert(key.clone(), value.clone());
            }
            Some(_) => {}
        }
    }
    let removed = observed
        .keys()
        .filter(|k| !desired.contains_key(*k))
        .cloned()
        .collect();
    (added, removed, updated)
}
