//! Keyed polling with a one-shot fallback and a stale-response guard.
//!
//! A [`Poller`] owns one state slot. Activating it with a key starts a
//! cycle: fetch through the primary source, retry once through the fallback
//! on failure, publish the outcome, sleep, repeat. Changing or clearing the
//! key starts a new generation; results from an older generation are dropped
//! at publish time, under the same lock that guards the state.

use crate::error::FetchError;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Boxed future produced by a fetch function.
pub type FetchFuture<T> = BoxFuture<'static, Result<T, FetchError>>;

/// A fetch function keyed by symbol.
pub type FetchFn<T> = Arc<dyn Fn(String) -> FetchFuture<T> + Send + Sync>;

/// Wrap an async closure as a [`FetchFn`].
pub fn fetch_fn<T, F, Fut>(f: F) -> FetchFn<T>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    Arc::new(move |key| f(key).boxed())
}

/// Loading, error and data of one polled source.
#[derive(Debug, Clone, PartialEq)]
pub struct PollState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> PollState<T> {
    fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }
}

/// When to fetch again after an attempt resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fetch once per activation.
    Once,
    /// Fetch again this long after the previous attempt resolved.
    Every(Duration),
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    key: Option<String>,
    state: PollState<T>,
}

/// A resilient polling data source.
pub struct Poller<T> {
    name: &'static str,
    slot: Arc<watch::Sender<Slot<T>>>,
    primary: FetchFn<T>,
    fallback: FetchFn<T>,
    schedule: Schedule,
    /// Shown instead of the transport error once both routes failed
    failure_message: Option<&'static str>,
}

/// Start polling `key` right away.
#[allow(dead_code)] // The app keeps long-lived pollers and re-keys them
pub fn open_poll<T>(
    name: &'static str,
    key: &str,
    primary: FetchFn<T>,
    fallback: FetchFn<T>,
    schedule: Schedule,
) -> Poller<T>
where
    T: Send + Sync + 'static,
{
    let poller = Poller::new(name, primary, fallback, schedule);
    poller.activate(key);
    poller
}

impl<T> Poller<T>
where
    T: Send + Sync + 'static,
{
    /// Create an inactive poller.
    pub fn new(name: &'static str, primary: FetchFn<T>, fallback: FetchFn<T>, schedule: Schedule) -> Self {
        let (slot, _) = watch::channel(Slot {
            generation: 0,
            key: None,
            state: PollState::default(),
        });
        Self {
            name,
            slot: Arc::new(slot),
            primary,
            fallback,
            schedule,
            failure_message: None,
        }
    }

    /// Publish `message` when both routes fail in transport.
    ///
    /// An empty answer still shows its own message.
    pub fn with_failure_message(mut self, message: &'static str) -> Self {
        self.failure_message = Some(message);
        self
    }

    /// Point the poller at `key`.
    ///
    /// An empty key deactivates; the current key is a no-op.
    pub fn activate(&self, key: &str) {
        let key = key.trim();
        if key.is_empty() {
            self.cancel();
            return;
        }

        let mut generation = None;
        self.slot.send_if_modified(|slot| {
            if slot.key.as_deref() == Some(key) {
                return false;
            }
            slot.generation += 1;
            slot.key = Some(key.to_string());
            slot.state = PollState::loading();
            generation = Some(slot.generation);
            true
        });

        if let Some(generation) = generation {
            self.spawn_cycle(key.to_string(), generation);
        }
    }

    /// Start a fresh cycle for the current key, keeping its last data.
    pub fn restart(&self) {
        let mut target = None;
        self.slot.send_if_modified(|slot| {
            let Some(key) = slot.key.clone() else {
                return false;
            };
            slot.generation += 1;
            slot.state.loading = true;
            slot.state.error = None;
            target = Some((key, slot.generation));
            true
        });

        if let Some((key, generation)) = target {
            self.spawn_cycle(key, generation);
        }
    }

    /// Stop polling and reset to the initial state.
    ///
    /// A pending timer ends immediately; a fetch already in flight runs to
    /// completion and its result is discarded.
    pub fn cancel(&self) {
        self.slot.send_if_modified(|slot| {
            if slot.key.is_none() {
                return false;
            }
            slot.generation += 1;
            slot.key = None;
            slot.state = PollState::default();
            true
        });
    }

    /// Currently active key.
    pub fn key(&self) -> Option<String> {
        self.slot.borrow().key.clone()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PollState<T>
    where
        T: Clone,
    {
        self.slot.borrow().state.clone()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> PollWatcher<T> {
        PollWatcher {
            rx: self.slot.subscribe(),
        }
    }

    fn spawn_cycle(&self, key: String, generation: u64) {
        debug!(source = self.name, %key, generation, "starting poll cycle");
        tokio::spawn(run_cycle(
            self.name,
            Arc::clone(&self.slot),
            Arc::clone(&self.primary),
            Arc::clone(&self.fallback),
            self.schedule,
            self.failure_message,
            key,
            generation,
        ));
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.slot.send_if_modified(|slot| {
            slot.generation += 1;
            slot.key = None;
            true
        });
    }
}

/// Receiver side of a [`Poller`]'s state.
pub struct PollWatcher<T> {
    rx: watch::Receiver<Slot<T>>,
}

impl<T: Clone> PollWatcher<T> {
    /// Wait until `pred` holds for the published state and return it.
    ///
    /// Returns `None` once the poller is gone.
    pub async fn wait_until(&mut self, mut pred: impl FnMut(&PollState<T>) -> bool) -> Option<PollState<T>> {
        self.rx
            .wait_for(|slot| pred(&slot.state))
            .await
            .ok()
            .map(|slot| slot.state.clone())
    }
}

/// Try `primary`, then `fallback` exactly once if the primary attempt failed.
///
/// An empty result is an answer, not a failure, and is not retried.
pub async fn fetch_with_fallback<T>(primary: &FetchFn<T>, fallback: &FetchFn<T>, key: &str) -> Result<T, FetchError> {
    match primary(key.to_string()).await {
        Err(err) if err.is_retryable() => {
            warn!(%key, error = %err, "primary fetch failed, trying fallback");
            fallback(key.to_string()).await
        }
        outcome => outcome,
    }
}

async fn run_cycle<T>(
    name: &'static str,
    slot: Arc<watch::Sender<Slot<T>>>,
    primary: FetchFn<T>,
    fallback: FetchFn<T>,
    schedule: Schedule,
    failure_message: Option<&'static str>,
    key: String,
    generation: u64,
) where
    T: Send + Sync + 'static,
{
    let mut superseded = slot.subscribe();

    loop {
        let outcome = fetch_with_fallback(&primary, &fallback, &key).await;
        if let Err(err) = &outcome {
            warn!(source = name, %key, error = %err, "fetch failed");
        }

        let published = slot.send_if_modified(|slot| {
            if slot.generation != generation {
                return false;
            }
            slot.state.loading = false;
            match outcome {
                Ok(data) => {
                    slot.state.data = Some(data);
                    slot.state.error = None;
                }
                Err(err) => {
                    let message = match failure_message {
                        Some(message) if err.is_retryable() => message.to_string(),
                        _ => err.to_string(),
                    };
                    slot.state.error = Some(message);
                }
            }
            true
        });

        if !published {
            debug!(source = name, %key, generation, "discarding stale result");
            return;
        }

        let Schedule::Every(interval) = schedule else {
            return;
        };

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = until_superseded(&mut superseded, generation) => {
                debug!(source = name, %key, generation, "poll cycle cancelled");
                return;
            }
        }
    }
}

async fn until_superseded<T>(rx: &mut watch::Receiver<Slot<T>>, generation: u64) {
    let _ = rx.wait_for(|slot| slot.generation != generation).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn failing<T: Send + 'static>() -> FetchFn<T> {
        fetch_fn(|_key| async { Err(FetchError::Network("connection refused".to_string())) })
    }

    fn counting(calls: Arc<AtomicUsize>) -> FetchFn<usize> {
        fetch_fn(move |_key| {
            let calls = Arc::clone(&calls);
            async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_payload_published() {
        let fallback = fetch_fn(|key: String| async move { Ok(format!("{}:relay", key)) });
        let poller = open_poll("test", "TCS", failing(), fallback, Schedule::Once);

        let state = poller
            .subscribe()
            .wait_until(|s| !s.loading)
            .await
            .unwrap();
        assert_eq!(state.data.as_deref(), Some("TCS:relay"));
        assert_eq!(state.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_failing_is_error_state() {
        let poller = open_poll::<String>("test", "TCS", failing(), failing(), Schedule::Once);

        let state = poller
            .subscribe()
            .wait_until(|s| !s.loading)
            .await
            .unwrap();
        assert_eq!(state.data, None);
        assert!(state.error.unwrap().contains("connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_message_replaces_transport_error() {
        let poller = Poller::<String>::new("test", failing(), failing(), Schedule::Once)
            .with_failure_message("Failed to stream live price");
        poller.activate("TCS");

        let state = poller
            .subscribe()
            .wait_until(|s| !s.loading)
            .await
            .unwrap();
        assert_eq!(state.error.as_deref(), Some("Failed to stream live price"));

        let primary = fetch_fn(|_key| async { Err::<String, _>(FetchError::Empty("Stock not found or API error")) });
        let poller = Poller::new("test", primary, failing(), Schedule::Once)
            .with_failure_message("Failed to stream live price");
        poller.activate("ZZZZ");

        let state = poller
            .subscribe()
            .wait_until(|s| !s.loading)
            .await
            .unwrap();
        assert_eq!(state.error.as_deref(), Some("Stock not found or API error"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_fallback_per_attempt() {
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&fallback_calls);
        let fallback = fetch_fn(move |_key| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<usize, _>(FetchError::Status { origin: "Proxy", status: 503 })
            }
        });
        let poller = open_poll("test", "TCS", failing(), fallback, Schedule::Every(Duration::from_secs(10)));

        tokio::time::sleep(Duration::from_secs(25)).await;
        // Attempts at 0s, 10s and 20s.
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 3);
        let state = poller.state();
        assert_eq!(state.data, None);
        assert_eq!(state.error.as_deref(), Some("Proxy response was not ok (503)"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_success_clears_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let primary = fetch_fn(move |_key| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(FetchError::Network("timed out".to_string()))
                } else {
                    Ok(n)
                }
            }
        });
        let poller = open_poll("test", "TCS", primary, failing(), Schedule::Every(Duration::from_secs(10)));

        tokio::time::sleep(Duration::from_secs(1)).await;
        let state = poller.state();
        assert_eq!(state.data, None);
        assert!(state.error.is_some());

        tokio::time::sleep(Duration::from_secs(10)).await;
        let state = poller.state();
        assert_eq!(state.data, Some(1));
        assert_eq!(state.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_result_skips_fallback() {
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let primary = fetch_fn(|_key| async { Err::<usize, _>(FetchError::Empty("Stock not found or API error")) });
        let poller = open_poll("test", "ZZZZ", primary, counting(Arc::clone(&fallback_calls)), Schedule::Once);

        let state = poller
            .subscribe()
            .wait_until(|s| !s.loading)
            .await
            .unwrap();
        assert_eq!(state.error.as_deref(), Some("Stock not found or API error"));
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_discarded() {
        let primary = fetch_fn(|key: String| async move {
            if key == "SLOW" {
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
            Ok(key)
        });
        let poller = Poller::new("test", primary, failing(), Schedule::Every(Duration::from_secs(10)));

        poller.activate("SLOW");
        tokio::time::sleep(Duration::from_secs(1)).await;
        poller.activate("FAST");

        let state = poller
            .subscribe()
            .wait_until(|s| s.data.is_some())
            .await
            .unwrap();
        assert_eq!(state.data.as_deref(), Some("FAST"));

        // Let the slow request for the old key land.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(poller.state().data.as_deref(), Some("FAST"));
        assert_eq!(poller.key().as_deref(), Some("FAST"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let poller = open_poll(
            "test",
            "TCS",
            counting(Arc::clone(&calls)),
            failing(),
            Schedule::Every(Duration::from_secs(10)),
        );

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(poller.state().data, Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polling_and_resets() {
        let calls = Arc::new(AtomicUsize::new(0));
        let poller = open_poll(
            "test",
            "TCS",
            counting(Arc::clone(&calls)),
            failing(),
            Schedule::Every(Duration::from_secs(10)),
        );

        tokio::time::sleep(Duration::from_secs(15)).await;
        poller.cancel();
        assert_eq!(poller.state(), PollState::default());
        assert_eq!(poller.key(), None);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(poller.state(), PollState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_key_deactivates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let poller = open_poll(
            "test",
            "TCS",
            counting(Arc::clone(&calls)),
            failing(),
            Schedule::Every(Duration::from_secs(10)),
        );
        tokio::time::sleep(Duration::from_secs(1)).await;

        poller.activate("  ");
        assert_eq!(poller.key(), None);
        assert_eq!(poller.state().data, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_is_noop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let poller = Poller::new("test", counting(Arc::clone(&calls)), failing(), Schedule::Once);

        poller.activate("TCS");
        poller.activate("TCS");
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_refetches_once_schedule() {
        let calls = Arc::new(AtomicUsize::new(0));
        let poller = open_poll("test", "TCS", counting(Arc::clone(&calls)), failing(), Schedule::Once);
        tokio::time::sleep(Duration::from_secs(1)).await;

        poller.restart();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(poller.state().data, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_only_until_first_result() {
        let primary = fetch_fn(|_key| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(1u8)
        });
        let poller = open_poll("test", "TCS", primary, failing(), Schedule::Every(Duration::from_secs(5)));
        assert!(poller.state().loading);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!poller.state().loading);

        // Mid-refresh the panel keeps showing data without a spinner.
        tokio::time::sleep(Duration::from_secs(5)).await;
        let state = poller.state();
        assert!(!state.loading);
        assert_eq!(state.data, Some(1));
    }
}
