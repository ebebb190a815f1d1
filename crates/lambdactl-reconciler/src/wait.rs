use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ReconcileError;
use crate::requeue::RequeueDirective;

/// Run `probe` every `interval` until it yields a value.
///
/// Cancellation is observed before each probe and while sleeping. When
/// `deadline` passes without a result the pass is requeued instead of
/// failing, so the next pass picks the wait back up. A probe error aborts
/// immediately.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    interval: Duration,
    deadline: Duration,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<T, ReconcileError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ReconcileError>>,
{
    let started = Instant::now();
    let mut attempts: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }
        attempts += 1;
        if let Some(value) = probe().await? {
            tracing::debug!(what, attempts, "wait satisfied");
            return Ok(value);
        }
        if started.elapsed() + interval > deadline {
            tracing::warn!(what, attempts, deadline_ms = deadline.as_millis() as u64, "wait deadline reached");
            return Err(RequeueDirective::after(
                format!("{what} did not settle within {}ms", deadline.as_millis()),
                interval,
            )
            .into());
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(ReconcileError::Cancelled),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
