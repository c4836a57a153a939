//! Bounded-duration collection of external submissions.
//!
//! A [`CollectionWindow`] consumes a stream of chat events, retains the ones
//! an async filter accepts (keyed by participant, later entries overwrite
//! earlier ones), and finalizes exactly once: either when its deadline
//! elapses (`snapshot`) or when the caller closes it early (`close`).
//! Finalize-once is enforced by both operations consuming the window.
//!
//! The deadline is wall-clock and runs independently of the engine's timer;
//! [`WindowControl::extend`] is the hook a paused timer uses to keep pushing
//! the deadline out so a paused game never loses its window.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::{Future, Stream, StreamExt};
use indexmap::IndexMap;
use tokio::{
    sync::Notify,
    task::JoinHandle,
    time::{Duration, Instant, sleep_until},
};
use tracing::trace;

use crate::chat::Participant;

struct WindowState<R> {
    entries: IndexMap<Participant, R>,
    deadline: Instant,
    closed: bool,
}

struct WindowShared<R> {
    state: Mutex<WindowState<R>>,
    notify: Notify,
}

impl<R> WindowShared<R> {
    fn lock(&self) -> MutexGuard<'_, WindowState<R>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Deadline-extension hook handed to the pausable timer, erased over the
/// retained entry type so the timer does not need to know what is collected.
#[derive(Clone)]
pub struct WindowControl {
    inner: Arc<dyn Fn(Duration) + Send + Sync>,
}

impl WindowControl {
    /// Push the window deadline out to `remaining` from now.
    pub fn extend(&self, remaining: Duration) {
        (self.inner)(remaining);
    }
}

#[cfg(test)]
impl WindowControl {
    /// Build a control around a bare callback, for timer tests.
    pub(crate) fn for_tests<F>(hook: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(hook),
        }
    }
}

impl std::fmt::Debug for WindowControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowControl").finish_non_exhaustive()
    }
}

/// A live collection window accumulating retained entries of type `R`.
pub struct CollectionWindow<R> {
    shared: Arc<WindowShared<R>>,
    feeder: JoinHandle<()>,
}

impl<R: Send + 'static> CollectionWindow<R> {
    /// Open a window over `events` for `duration`.
    ///
    /// `filter` inspects each event and returns the participant plus the
    /// retained value when the event is accepted; it may perform async side
    /// effects (e.g. acknowledging a bet) before deciding. Rejected events
    /// are dropped without feedback.
    pub fn open<E, S, F, Fut>(events: S, duration: Duration, mut filter: F) -> Self
    where
        E: Send + 'static,
        S: Stream<Item = E> + Send + 'static,
        F: FnMut(E) -> Fut + Send + 'static,
        Fut: Future<Output = Option<(Participant, R)>> + Send,
    {
        let shared = Arc::new(WindowShared {
            state: Mutex::new(WindowState {
                entries: IndexMap::new(),
                deadline: Instant::now() + duration,
                closed: false,
            }),
            notify: Notify::new(),
        });

        let feeder = {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                let mut events = std::pin::pin!(events);
                while let Some(event) = events.next().await {
                    let Some((who, retained)) = filter(event).await else {
                        continue;
                    };
                    let mut state = shared.lock();
                    if state.closed {
                        break;
                    }
                    trace!(participant = %who.name, "retained submission");
                    state.entries.insert(who, retained);
                }
            })
        };

        Self { shared, feeder }
    }

    /// Hook used to extend the deadline while the game is paused.
    pub fn control(&self) -> WindowControl {
        let shared = Arc::clone(&self.shared);
        WindowControl {
            inner: Arc::new(move |remaining| {
                let mut state = shared.lock();
                if state.closed {
                    return;
                }
                state.deadline = Instant::now() + remaining;
                shared.notify.notify_waiters();
            }),
        }
    }

    /// Wait for the deadline (including any extensions) and return the
    /// collected entries in arrival order.
    pub async fn snapshot(self) -> IndexMap<Participant, R> {
        loop {
            let notified = self.shared.notify.notified();
            let deadline = {
                let state = self.shared.lock();
                if state.closed {
                    break;
                }
                state.deadline
            };
            tokio::select! {
                _ = sleep_until(deadline) => {
                    let mut state = self.shared.lock();
                    // The deadline may have been extended while we slept.
                    if Instant::now() >= state.deadline {
                        state.closed = true;
                        break;
                    }
                }
                _ = notified => {}
            }
        }
        self.finish()
    }

    /// Finalize immediately, without waiting for the deadline.
    pub fn close(self) -> IndexMap<Participant, R> {
        self.shared.lock().closed = true;
        self.finish()
    }

    fn finish(self) -> IndexMap<Participant, R> {
        self.feeder.abort();
        let mut state = self.shared.lock();
        state.closed = true;
        std::mem::take(&mut state.entries)
    }
}

impl<R> Drop for CollectionWindow<R> {
    fn drop(&mut self) {
        self.feeder.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn someone(name: &str) -> Participant {
        Participant {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    fn keyed(who: Participant, value: u32) -> Option<(Participant, u32)> {
        Some((who, value))
    }

    #[tokio::test(start_paused = true)]
    async fn retains_filtered_entries_in_arrival_order() {
        let alice = someone("alice");
        let bob = someone("bob");
        let events = tokio_stream::iter(vec![
            (alice.clone(), 1u32),
            (bob.clone(), 2),
            (alice.clone(), 9),
        ]);
        let window = CollectionWindow::open(events, Duration::from_secs(5), |(who, value)| async move {
            keyed(who, value)
        });

        let entries = window.snapshot().await;
        let collected: Vec<_> = entries.iter().map(|(p, v)| (p.name.clone(), *v)).collect();
        // Later entries for the same participant overwrite in place.
        assert_eq!(collected, vec![("alice".to_string(), 9), ("bob".to_string(), 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_events_are_dropped() {
        let alice = someone("alice");
        let events = tokio_stream::iter(vec![(alice.clone(), 3u32), (alice.clone(), 13)]);
        let window = CollectionWindow::open(events, Duration::from_secs(1), |(who, value)| async move {
            (value < 10).then_some((who, value))
        });
        let entries = window.snapshot().await;
        assert_eq!(entries.values().copied().collect::<Vec<_>>(), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_waits_for_extended_deadline() {
        let events = tokio_stream::iter(Vec::<(Participant, u32)>::new());
        let window =
            CollectionWindow::open(events, Duration::from_secs(10), |(who, value)| async move {
                keyed(who, value)
            });
        let control = window.control();

        let started = Instant::now();
        let waiter = tokio::spawn(window.snapshot());
        tokio::time::advance(Duration::from_secs(5)).await;
        control.extend(Duration::from_secs(30));
        waiter.await.expect("snapshot completes");
        // 5s elapsed before the extension plus the full 30s extension.
        assert_eq!(started.elapsed(), Duration::from_secs(35));
    }

    #[tokio::test(start_paused = true)]
    async fn close_returns_entries_before_deadline() {
        let alice = someone("alice");
        let events = tokio_stream::iter(vec![(alice.clone(), 4u32)]);
        let window = CollectionWindow::open(events, Duration::from_secs(3600), |(who, value)| async move {
            keyed(who, value)
        });
        // Let the feeder drain the stream.
        tokio::task::yield_now().await;
        let entries = window.close();
        assert_eq!(entries.get(&alice), Some(&4));
    }
}
