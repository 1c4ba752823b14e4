// ABOUTME: Bounded polling helpers for eventually-consistent provider state.
// ABOUTME: Status waits with a hard timeout, and new-id discovery by set difference.

use std::collections::HashSet;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::{sleep, timeout};

use super::error::{Error, Result};
use super::types::ResourceState;

/// Fixed-interval, fixed-attempt polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub attempts: u32,
}

impl PollPolicy {
    pub const fn new(interval: Duration, attempts: u32) -> Self {
        Self { interval, attempts }
    }
}

/// Options for [`wait_for_status`].
pub struct WaitOptions<'a> {
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Called with every observed state, repeats included.
    pub on_progress: Option<&'a (dyn Fn(&ResourceState) + Send + Sync)>,
}

impl WaitOptions<'_> {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        WaitOptions {
            timeout,
            poll_interval,
            on_progress: None,
        }
    }
}

impl std::fmt::Debug for WaitOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitOptions")
            .field("timeout", &self.timeout)
            .field("poll_interval", &self.poll_interval)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// Poll `fetch` until it reports `target`.
///
/// Fails with `ResourceError` as soon as the error state is observed, and
/// with `WaitTimeout` once `options.timeout` has elapsed. Failures of `fetch`
/// itself are propagated.
pub async fn wait_for_status<F, Fut>(
    id: &str,
    target: &ResourceState,
    options: &WaitOptions<'_>,
    mut fetch: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ResourceState>>,
{
    let start = Instant::now();
    let mut last = String::from("none");

    let poll = async {
        loop {
            let state = fetch().await?;
            tracing::debug!(resource = id, state = %state, "polled resource state");
            if let Some(on_progress) = options.on_progress {
                on_progress(&state);
            }
            last = state.to_string();

            if &state == target {
                return Ok(());
            }
            if state.is_terminal_error() {
                return Err(Error::ResourceError { id: id.to_string() });
            }
            sleep(options.poll_interval).await;
        }
    };

    let outcome = timeout(options.timeout, poll).await;
    match outcome {
        Ok(result) => result,
        Err(_elapsed) => Err(Error::WaitTimeout {
            id: id.to_string(),
            target: target.clone(),
            last,
            elapsed: start.elapsed(),
        }),
    }
}

/// Poll a listing until an item whose id is not in `known` shows up.
///
/// The first listing happens immediately; at most `policy.attempts` listings
/// are made. Returns `None` when the budget is exhausted.
///
/// Ids are discovered by set difference, so another actor creating items on
/// the same account during the polling window can be mistaken for ours.
pub async fn poll_for_new<T, F, Fut>(
    known: &HashSet<String>,
    policy: PollPolicy,
    mut list: F,
    id_of: impl Fn(&T) -> &str,
) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    for attempt in 1..=policy.attempts {
        let items = list().await?;
        if let Some(found) = items.into_iter().find(|item| !known.contains(id_of(item))) {
            tracing::debug!(attempt, id = id_of(&found), "new id appeared");
            return Ok(Some(found));
        }
        tracing::debug!(attempt, max = policy.attempts, "no new id yet");
        if attempt < policy.attempts {
            sleep(policy.interval).await;
        }
    }
    Ok(None)
}
