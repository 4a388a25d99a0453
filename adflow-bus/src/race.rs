//! "First of N" waits over notification streams.
//!
//! Every load and show step is a race: subscribe to a handful of channels,
//! take whichever fires first, drop the rest. [`wait_first`] subscribes to all
//! streams as soon as it is called and tears every subscription down exactly
//! once, from inside the dispatch that produced the winner, so no handler of
//! the race can run after it resolved.
//!
//! ```rust,ignore
//! let scope = CancelScope::new();
//! let race = wait_first(
//!     [
//!         bus.stream(Channel::Loaded(format), filter.clone()),
//!         bus.stream(Channel::LoadFailed(format), filter),
//!     ],
//!     &scope.token(),
//! );
//! sdk.request_load(format, &ad_unit); // safe: the race is already listening
//! let (index, notification) = race.await?;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::bus::{EventBus, NotificationStream, SubscriptionHandle};
use crate::error::RaceError;
use crate::types::Notification;

type Teardown = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct TokenState {
    cancelled: bool,
    teardowns: Vec<Teardown>,
}

/// Observer side of a cancellation scope.
///
/// Waits register teardowns with the token; cancelling runs them all,
/// synchronously and exactly once.
#[derive(Clone, Default)]
pub struct CancelToken {
    state: Arc<Mutex<TokenState>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and run every registered teardown on the calling thread.
    pub fn cancel(&self) {
        let teardowns = {
            let mut state = self.state.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            std::mem::take(&mut state.teardowns)
        };

        for teardown in teardowns {
            teardown();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Register work to run on cancellation.
    ///
    /// Runs `teardown` right away if the token is already cancelled.
    pub fn on_cancel<F>(&self, teardown: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock();
        if state.cancelled {
            drop(state);
            teardown();
        } else {
            state.teardowns.push(Box::new(teardown));
        }
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CancelToken")
            .field("cancelled", &state.cancelled)
            .field("pending_teardowns", &state.teardowns.len())
            .finish()
    }
}

/// Owning side of a cancellation token.
///
/// The scope cancels its token when dropped, so leaving the block that owns
/// it releases every wait registered on it.
#[derive(Debug, Default)]
pub struct CancelScope {
    token: CancelToken,
}

impl CancelScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for CancelScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

type Winner = (usize, Notification);

struct RaceState {
    subscriptions: Vec<(EventBus, SubscriptionHandle)>,
    winner_tx: Option<oneshot::Sender<Winner>>,
    settled: bool,
}

struct RaceShared {
    state: Mutex<RaceState>,
}

impl RaceShared {
    /// Claim the race for `index` and tear down all subscriptions.
    fn resolve(&self, index: usize, notification: &Notification) {
        let (tx, subscriptions) = {
            let mut state = self.state.lock();
            let Some(tx) = state.winner_tx.take() else {
                return;
            };
            state.settled = true;
            (tx, std::mem::take(&mut state.subscriptions))
        };

        teardown(subscriptions);
        let _ = tx.send((index, notification.clone()));
    }

    /// End the race without a winner.
    fn abandon(&self) {
        let subscriptions = {
            let mut state = self.state.lock();
            state.settled = true;
            state.winner_tx = None;
            std::mem::take(&mut state.subscriptions)
        };

        teardown(subscriptions);
    }
}

fn teardown(subscriptions: Vec<(EventBus, SubscriptionHandle)>) {
    for (bus, handle) in subscriptions {
        bus.unsubscribe(handle);
    }
}

/// A pending "first of N" wait.
///
/// Resolves to the index of the stream that fired first together with its
/// notification, or to [`RaceError::Cancelled`] if the token was cancelled
/// first. Dropping an unresolved race unsubscribes every stream.
pub struct Race {
    shared: Arc<RaceShared>,
    winner_rx: oneshot::Receiver<Winner>,
    empty: bool,
}

impl Race {
    /// Check whether the race already has a winner or was cancelled
    pub fn is_settled(&self) -> bool {
        self.shared.state.lock().settled
    }
}

impl Future for Race {
    type Output = Result<Winner, RaceError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.empty {
            return Poll::Ready(Err(RaceError::Empty));
        }

        match Pin::new(&mut self.winner_rx).poll(cx) {
            Poll::Ready(Ok(winner)) => Poll::Ready(Ok(winner)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(RaceError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Race {
    fn drop(&mut self) {
        self.shared.abandon();
    }
}

impl std::fmt::Debug for Race {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Race")
            .field("subscriptions", &state.subscriptions.len())
            .field("settled", &state.settled)
            .finish()
    }
}

/// Race the given streams against each other.
///
/// All streams are subscribed before this function returns.
pub fn wait_first<I>(streams: I, token: &CancelToken) -> Race
where
    I: IntoIterator<Item = NotificationStream>,
{
    let streams: Vec<NotificationStream> = streams.into_iter().collect();
    let (winner_tx, winner_rx) = oneshot::channel();

    let shared = Arc::new(RaceShared {
        state: Mutex::new(RaceState {
            subscriptions: Vec::with_capacity(streams.len()),
            winner_tx: Some(winner_tx),
            settled: false,
        }),
    });

    let race = Race {
        shared: Arc::clone(&shared),
        winner_rx,
        empty: streams.is_empty(),
    };
    if race.empty {
        return race;
    }

    for (index, stream) in streams.iter().enumerate() {
        let weak: Weak<RaceShared> = Arc::downgrade(&shared);
        let handle = stream.subscribe(move |notification| {
            if let Some(shared) = weak.upgrade() {
                shared.resolve(index, notification);
            }
        });

        // A notification dispatched on another thread may already have
        // settled the race while we were still subscribing.
        let mut state = shared.state.lock();
        if state.settled {
            drop(state);
            stream.bus().unsubscribe(handle);
        } else {
            state.subscriptions.push((stream.bus().clone(), handle));
        }
    }

    let weak = Arc::downgrade(&shared);
    token.on_cancel(move || {
        if let Some(shared) = weak.upgrade() {
            shared.abandon();
        }
    });

    race
}

/// Wait for the next notification on a single stream.
pub fn wait_next(stream: NotificationStream, token: &CancelToken) -> Race {
    wait_first(std::iter::once(stream), token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::UnitFilter;
    use crate::types::{AdFormat, Channel};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FORMAT: AdFormat = AdFormat::Interstitial;

    fn terminal_streams(bus: &EventBus) -> Vec<NotificationStream> {
        vec![
            bus.stream(Channel::Dismissed(FORMAT), UnitFilter::Any),
            bus.stream(Channel::Clicked(FORMAT), UnitFilter::Any),
            bus.stream(Channel::Expired(FORMAT), UnitFilter::Any),
        ]
    }

    #[tokio::test]
    async fn test_resolves_with_first_firing_stream() {
        let bus = EventBus::new();
        let scope = CancelScope::new();

        let race = wait_first(terminal_streams(&bus), &scope.token());
        assert_eq!(bus.active_subscriptions(), 3);

        bus.dispatch(&Notification::expired(FORMAT, "unit-1"));
        assert_eq!(bus.active_subscriptions(), 0);

        let (index, notification) = race.await.unwrap();
        assert_eq!(index, 2);
        assert_eq!(notification.channel, Channel::Expired(FORMAT));
    }

    #[tokio::test]
    async fn test_later_notifications_are_not_delivered() {
        let bus = EventBus::new();
        let token = CancelToken::new();

        let race = wait_first(terminal_streams(&bus), &token);
        bus.dispatch(&Notification::clicked(FORMAT, "unit-1"));

        assert_eq!(bus.dispatch(&Notification::dismissed(FORMAT, "unit-1")), 0);
        assert_eq!(bus.dispatch(&Notification::clicked(FORMAT, "unit-1")), 0);

        let (index, _) = race.await.unwrap();
        assert_eq!(index, 1);
        for channel in [
            Channel::Dismissed(FORMAT),
            Channel::Clicked(FORMAT),
            Channel::Expired(FORMAT),
        ] {
            let stats = bus.stats(channel);
            assert_eq!(stats.subscribed, 1, "{channel}");
            assert_eq!(stats.unsubscribed, 1, "{channel}");
        }
    }

    #[tokio::test]
    async fn test_cancel_before_fire() {
        let bus = EventBus::new();
        let scope = CancelScope::new();

        let race = wait_first(terminal_streams(&bus), &scope.token());
        scope.cancel();

        // Teardown happens synchronously, before the race is polled
        assert_eq!(bus.active_subscriptions(), 0);
        assert_eq!(race.await, Err(RaceError::Cancelled));
    }

    #[tokio::test]
    async fn test_already_cancelled_token() {
        let bus = EventBus::new();
        let token = CancelToken::new();
        token.cancel();

        let race = wait_first(terminal_streams(&bus), &token);
        assert_eq!(bus.active_subscriptions(), 0);
        assert_eq!(race.await, Err(RaceError::Cancelled));
    }

    #[tokio::test]
    async fn test_dropping_scope_cancels() {
        let bus = EventBus::new();
        let race = {
            let scope = CancelScope::new();
            wait_first(terminal_streams(&bus), &scope.token())
        };

        assert_eq!(bus.active_subscriptions(), 0);
        assert_eq!(race.await, Err(RaceError::Cancelled));
    }

    #[tokio::test]
    async fn test_dropping_race_unsubscribes() {
        let bus = EventBus::new();
        let token = CancelToken::new();

        let race = wait_first(terminal_streams(&bus), &token);
        assert_eq!(bus.active_subscriptions(), 3);
        drop(race);

        assert_eq!(bus.active_subscriptions(), 0);
        // Cancelling afterwards finds nothing left to tear down
        token.cancel();
        assert_eq!(bus.stats(Channel::Dismissed(FORMAT)).unsubscribed, 1);
    }

    #[tokio::test]
    async fn test_empty_race() {
        let token = CancelToken::new();
        let race = wait_first(Vec::new(), &token);
        assert_eq!(race.await, Err(RaceError::Empty));
    }

    #[tokio::test]
    async fn test_cancel_after_resolution_is_harmless() {
        let bus = EventBus::new();
        let scope = CancelScope::new();

        let race = wait_next(
            bus.stream(Channel::Shown(FORMAT), UnitFilter::Any),
            &scope.token(),
        );
        bus.dispatch(&Notification::shown(FORMAT, "unit-1"));
        assert!(race.is_settled());
        scope.cancel();

        let (index, notification) = race.await.unwrap();
        assert_eq!(index, 0);
        assert_eq!(notification.channel, Channel::Shown(FORMAT));
        assert_eq!(bus.stats(Channel::Shown(FORMAT)).unsubscribed, 1);
    }

    #[tokio::test]
    async fn test_filtered_race_ignores_other_units() {
        let bus = EventBus::new();
        let token = CancelToken::new();
        let own = UnitFilter::Only("unit-1".into());

        let race = wait_first(
            [
                bus.stream(Channel::Loaded(FORMAT), own.clone()),
                bus.stream(Channel::LoadFailed(FORMAT), own),
            ],
            &token,
        );

        bus.dispatch(&Notification::loaded(FORMAT, "unit-2"));
        assert!(!race.is_settled());

        bus.dispatch(&Notification::load_failed(FORMAT, "unit-1", "no fill"));
        let (index, notification) = race.await.unwrap();
        assert_eq!(index, 1);
        assert_eq!(notification.error(), Some("no fill"));
    }

    #[test]
    fn test_token_runs_teardowns_once() {
        let token = CancelToken::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&runs);
        token.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        token.cancel();
        token.cancel();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // Registered after cancellation: runs immediately
        let counter = Arc::clone(&runs);
        token.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
