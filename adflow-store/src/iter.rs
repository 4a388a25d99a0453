//! Change event consumption for the presentation layer
//!
//! A [`ChangeIterator`] reads the store's single event queue. It can be
//! narrowed to a set of keys with [`ChangeIterator::only`], and a frame's
//! worth of changes can be folded into the latest value per key with
//! [`ChangeIterator::drain_latest`].

use std::collections::{HashMap, HashSet};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

use crate::event::{ChangeEvent, Value};
use crate::key::ValueKey;

/// Blocking iterator over store change events
///
/// Receives change events for watched values via `std::sync::mpsc`, so a
/// presentation thread can drain them without an async runtime. Every
/// iterator handed out by a store reads the same queue: an event is
/// delivered to exactly one reader.
///
/// # Example
///
/// ```rust,ignore
/// // Refresh the buttons once per frame
/// for (key, value) in store.iter().only(Gate::ALL).drain_latest() {
///     apply(key, value);
/// }
///
/// // Wait briefly for the next change
/// if let Some(event) = store.iter().recv_timeout(Duration::from_millis(16)) {
///     apply(event.key, event.value);
/// }
/// ```
pub struct ChangeIterator {
    rx: Arc<Mutex<mpsc::Receiver<ChangeEvent>>>,
    /// Keys this iterator yields; `None` yields everything
    keys: Option<HashSet<ValueKey>>,
}

impl ChangeIterator {
    pub(crate) fn new(rx: Arc<Mutex<mpsc::Receiver<ChangeEvent>>>) -> Self {
        Self { rx, keys: None }
    }

    /// Only yield events for `keys`.
    ///
    /// Events for other keys are still taken off the queue and discarded.
    pub fn only<K>(mut self, keys: impl IntoIterator<Item = K>) -> Self
    where
        K: Into<ValueKey>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    fn accepts(&self, event: &ChangeEvent) -> bool {
        self.keys
            .as_ref()
            .map_or(true, |keys| keys.contains(&event.key))
    }

    /// Block until the next event is available
    ///
    /// Returns `None` if the channel is closed.
    pub fn recv(&self) -> Option<ChangeEvent> {
        let rx = self.rx.lock().ok()?;
        loop {
            let event = rx.recv().ok()?;
            if self.accepts(&event) {
                return Some(event);
            }
        }
    }

    /// Block until the next event or timeout expires
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        let deadline = Instant::now() + timeout;
        let rx = self.rx.lock().ok()?;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = rx.recv_timeout(remaining).ok()?;
            if self.accepts(&event) {
                return Some(event);
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<ChangeEvent> {
        let rx = self.rx.lock().ok()?;
        loop {
            let event = rx.try_recv().ok()?;
            if self.accepts(&event) {
                return Some(event);
            }
        }
    }

    /// Non-blocking iterator over the events currently queued
    pub fn try_iter(&self) -> TryIter<'_> {
        TryIter { inner: self }
    }

    /// Blocking iterator that stops once `timeout` passes without an event
    pub fn timeout_iter(&self, timeout: Duration) -> TimeoutIter<'_> {
        TimeoutIter {
            inner: self,
            timeout,
        }
    }

    /// Drain the queued events, keeping only the newest value per key.
    ///
    /// A gate that flipped off and back on within one frame shows up once,
    /// with its final value.
    pub fn drain_latest(&self) -> HashMap<ValueKey, Value> {
        self.try_iter()
            .map(|event| (event.key, event.value))
            .collect()
    }
}

impl Iterator for ChangeIterator {
    type Item = ChangeEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

/// Non-blocking iterator over currently available events
pub struct TryIter<'a> {
    inner: &'a ChangeIterator,
}

impl<'a> Iterator for TryIter<'a> {
    type Item = ChangeEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.try_recv()
    }
}

/// Blocking iterator with timeout
pub struct TimeoutIter<'a> {
    inner: &'a ChangeIterator,
    timeout: Duration,
}

impl<'a> Iterator for TimeoutIter<'a> {
    type Item = ChangeEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.recv_timeout(self.timeout)
    }
}
