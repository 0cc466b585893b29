//! Timeout race between a request's completion and a timer.

use std::future::Future;
use std::time::Duration;

use crate::error::RequestError;
use crate::http::TransportResult;

/// `Some(after)` only for a non-zero duration.
pub fn effective(timeout: Option<Duration>) -> Option<Duration> {
    timeout.filter(|after| !after.is_zero())
}

/// Settle with whichever comes first: `completion` or `after` elapsing.
///
/// With no timeout, `completion` is awaited directly and no timer exists.
/// When the timer wins, `cancel` is invoked exactly once; it must ask the
/// underlying operation to stop and return its snapshot, which becomes the
/// `RequestError::Timeout` result. If both are ready together the
/// completion wins.
pub async fn race<F, C>(completion: F, after: Option<Duration>, cancel: C) -> Result<TransportResult, RequestError>
where
    F: Future<Output = Result<TransportResult, RequestError>>,
    C: FnOnce() -> TransportResult,
{
    let Some(after) = effective(after) else {
        return completion.await;
    };

    tokio::select! {
        biased;
        outcome = completion => outcome,
        () = tokio::time::sleep(after) => {
            let result = cancel();
            Err(RequestError::Timeout { after, result })
        }
    }
}
