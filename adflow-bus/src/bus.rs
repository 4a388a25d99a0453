//! Multi-subscriber notification bus over the SDK's callback hooks.
//!
//! The `EventBus` is the only component that attaches to or detaches from the
//! SDK's global callback hooks. Hook attachment is reference counted per
//! channel: the hook is attached when the first handler subscribes and
//! detached when the last one leaves, the same way a UPnP subscription is
//! kept alive only while someone consumes it.
//!
//! The bus keeps no history. A handler only sees notifications dispatched
//! after it subscribed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::{AdUnitId, Channel, Notification};

/// Callback invoked for every matching notification.
pub type Handler = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Identifies one subscription on the bus.
///
/// Handles are allocated in increasing order, so sorting handles gives the
/// order in which handlers subscribed.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Which ad units a subscription is interested in.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum UnitFilter {
    /// Every notification on the channel, whatever ad unit it is for
    Any,
    /// Only notifications for this ad unit
    Only(AdUnitId),
}

impl UnitFilter {
    pub fn matches(&self, ad_unit: &AdUnitId) -> bool {
        match self {
            UnitFilter::Any => true,
            UnitFilter::Only(expected) => expected == ad_unit,
        }
    }
}

/// Subscription counters for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Handlers ever subscribed
    pub subscribed: u64,
    /// Handlers removed (repeat unsubscribes are not counted)
    pub unsubscribed: u64,
    /// Handler invocations
    pub delivered: u64,
}

impl ChannelStats {
    /// Handlers currently subscribed.
    pub fn active(&self) -> u64 {
        self.subscribed - self.unsubscribed
    }
}

struct Entry {
    channel: Channel,
    filter: UnitFilter,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    entries: HashMap<SubscriptionHandle, Entry>,
    /// Hook reference counts, one per attached channel
    hooks: HashMap<Channel, usize>,
    stats: HashMap<Channel, ChannelStats>,
}

struct BusInner {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
}

/// Routes SDK notifications to the handlers subscribed to their channel.
///
/// Cloning the bus is cheap and every clone shares the same registry.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                registry: Mutex::new(Registry::default()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Subscribe a handler to one channel.
    ///
    /// The handler runs on the dispatching thread every time a matching
    /// notification is dispatched, until it is unsubscribed.
    pub fn subscribe<F>(&self, channel: Channel, filter: UnitFilter, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let handle = SubscriptionHandle(self.inner.next_id.fetch_add(1, Ordering::Relaxed));

        let mut registry = self.inner.registry.lock();
        registry.entries.insert(
            handle,
            Entry {
                channel,
                filter,
                handler: Arc::new(handler),
            },
        );
        registry.stats.entry(channel).or_default().subscribed += 1;

        let refs = registry.hooks.entry(channel).or_insert(0);
        *refs += 1;
        if *refs == 1 {
            tracing::debug!(%channel, "Attached SDK hook");
        }
        tracing::trace!(%channel, %handle, refs = *refs, "Subscribed");

        handle
    }

    /// Remove a subscription.
    ///
    /// Returns `true` if the handle was active. Unsubscribing twice, or
    /// unsubscribing a handle that never fired, is harmless.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut registry = self.inner.registry.lock();

        let Some(entry) = registry.entries.remove(&handle) else {
            return false;
        };
        let channel = entry.channel;
        registry.stats.entry(channel).or_default().unsubscribed += 1;

        if let Some(refs) = registry.hooks.get_mut(&channel) {
            *refs = refs.saturating_sub(1);
            tracing::trace!(%channel, %handle, refs = *refs, "Unsubscribed");
            if *refs == 0 {
                registry.hooks.remove(&channel);
                tracing::debug!(%channel, "Detached SDK hook");
            }
        }

        true
    }

    /// Deliver a notification to every matching handler.
    ///
    /// Handlers run in subscription order without the registry lock held, so
    /// they may subscribe or unsubscribe. A handler removed while this call is
    /// in progress is skipped. Returns the number of handlers invoked.
    pub fn dispatch(&self, notification: &Notification) -> usize {
        let mut targets: Vec<(SubscriptionHandle, Handler)> = {
            let registry = self.inner.registry.lock();
            registry
                .entries
                .iter()
                .filter(|(_, entry)| {
                    entry.channel == notification.channel
                        && entry.filter.matches(&notification.ad_unit)
                })
                .map(|(handle, entry)| (*handle, Arc::clone(&entry.handler)))
                .collect()
        };

        if targets.is_empty() {
            tracing::trace!(
                channel = %notification.channel,
                ad_unit = %notification.ad_unit,
                "No subscribers, notification dropped"
            );
            return 0;
        }

        targets.sort_by_key(|(handle, _)| *handle);

        let mut delivered = 0;
        for (handle, handler) in targets {
            if !self.is_active(handle) {
                continue;
            }
            handler(notification);
            delivered += 1;
        }

        self.inner
            .registry
            .lock()
            .stats
            .entry(notification.channel)
            .or_default()
            .delivered += delivered as u64;

        delivered
    }

    /// Describe a stream over one channel without subscribing yet.
    pub fn stream(&self, channel: Channel, filter: UnitFilter) -> NotificationStream {
        NotificationStream {
            bus: self.clone(),
            channel,
            filter,
        }
    }

    /// Check whether a subscription is still registered
    pub fn is_active(&self, handle: SubscriptionHandle) -> bool {
        self.inner.registry.lock().entries.contains_key(&handle)
    }

    /// Check whether the SDK hook for a channel is currently attached
    pub fn is_hook_attached(&self, channel: Channel) -> bool {
        self.inner.registry.lock().hooks.contains_key(&channel)
    }

    /// Number of handlers attached to a channel's hook
    pub fn hook_ref_count(&self, channel: Channel) -> usize {
        self.inner
            .registry
            .lock()
            .hooks
            .get(&channel)
            .copied()
            .unwrap_or(0)
    }

    /// Number of live subscriptions across all channels
    pub fn active_subscriptions(&self) -> usize {
        self.inner.registry.lock().entries.len()
    }

    /// Subscription counters for one channel
    pub fn stats(&self, channel: Channel) -> ChannelStats {
        self.inner
            .registry
            .lock()
            .stats
            .get(&channel)
            .copied()
            .unwrap_or_default()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.inner.registry.lock();
        f.debug_struct("EventBus")
            .field("active_subscriptions", &registry.entries.len())
            .field("attached_hooks", &registry.hooks.len())
            .finish()
    }
}

/// A channel on a bus, narrowed to some ad units.
///
/// Creating a stream subscribes nothing. Subscriptions happen when a handler
/// is attached or a race is built over the stream.
#[derive(Clone, Debug)]
pub struct NotificationStream {
    bus: EventBus,
    channel: Channel,
    filter: UnitFilter,
}

impl NotificationStream {
    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn filter(&self) -> &UnitFilter {
        &self.filter
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Attach a handler to this stream.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.bus.subscribe(self.channel, self.filter.clone(), handler)
    }
}
