use std::fmt;
use std::time::Duration;

/// Stop this pass and try the object again after `delay`.
///
/// Not a failure: the condition projector leaves error conditions alone
/// when it sees one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequeueDirective {
    pub cause: String,
    pub delay: Duration,
}

impl RequeueDirective {
    pub fn after(cause: impl Into<String>, delay: Duration) -> Self {
        Self {
            cause: cause.into(),
            delay,
        }
    }
}

impl fmt::Display for RequeueDirective {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "requeue after {}ms: {}", self.delay.as_millis(), self.cause)
    }
}
