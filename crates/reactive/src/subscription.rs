//! Subscription management for table update streams.
//!
//! This module provides the observer registry behind every table, a
//! shareable `Subject` wrapper and the `Subscription` disposal token.
//! Observer graphs may be cyclic (table -> join -> joined table -> table);
//! they are torn down by dropping tokens, never by reference counting alone.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback invoked with each emitted event.
pub type Observer<T> = Rc<dyn Fn(&T)>;

/// Manages the observers of one event stream.
///
/// Observers are kept in subscription order, so every event reaches
/// observers in the same order they subscribed.
pub struct SubscriptionManager<T> {
    /// Active observers
    observers: BTreeMap<SubscriptionId, Observer<T>>,
    /// Next subscription ID to assign
    next_id: SubscriptionId,
}

impl<T> Default for SubscriptionManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SubscriptionManager<T> {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            observers: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Registers an observer and returns its ID.
    pub fn subscribe(&mut self, observer: Observer<T>) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.observers.insert(id, observer);
        id
    }

    /// Unsubscribes by ID.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.remove(&id).is_some()
    }

    /// Returns true if `id` is still subscribed.
    #[inline]
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.observers.contains_key(&id)
    }

    /// Returns a snapshot of the current observers.
    pub fn snapshot(&self) -> Vec<(SubscriptionId, Observer<T>)> {
        self.observers
            .iter()
            .map(|(id, observer)| (*id, observer.clone()))
            .collect()
    }

    /// Returns the number of active subscriptions.
    #[inline]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns true if there are no subscriptions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Clears all subscriptions.
    pub fn clear(&mut self) {
        self.observers.clear();
    }
}

/// A removable registration, type-erased over the event type.
trait Unsubscribe {
    fn unsubscribe(&self, id: SubscriptionId);
}

impl<T> Unsubscribe for RefCell<SubscriptionManager<T>> {
    fn unsubscribe(&self, id: SubscriptionId) {
        // The observer may own tokens for this same subject; drop it only
        // after the borrow is released.
        let removed = self.borrow_mut().observers.remove(&id);
        drop(removed);
    }
}

/// Disposal token for one observer registration.
///
/// The observer stays registered for as long as the token lives. Dropping
/// the token, or calling `dispose`, unsubscribes it.
#[must_use = "dropping a Subscription immediately unsubscribes the observer"]
pub struct Subscription {
    id: SubscriptionId,
    registry: Option<Weak<dyn Unsubscribe>>,
}

impl Subscription {
    /// A token that is not attached to any subject.
    pub fn empty() -> Self {
        Self {
            id: 0,
            registry: None,
        }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns true while the subscription can still be disposed.
    pub fn is_active(&self) -> bool {
        self.registry
            .as_ref()
            .map(|r| r.strong_count() > 0)
            .unwrap_or(false)
    }

    /// Unsubscribes now.
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|w| w.upgrade()) {
            registry.unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// An owned group of subscriptions, disposed together.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    tokens: Vec<Subscription>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a token.
    pub fn push(&mut self, token: Subscription) {
        self.tokens.push(token);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Disposes every token.
    pub fn clear(&mut self) {
        self.tokens.clear();
    }
}

/// Single-producer fan-out of events to observers.
///
/// Cloning a `Subject` yields another handle to the same observer list.
pub struct Subject<T> {
    manager: Rc<RefCell<SubscriptionManager<T>>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
        }
    }
}

impl<T: 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Subject<T> {
    pub fn new() -> Self {
        Self {
            manager: Rc::new(RefCell::new(SubscriptionManager::new())),
        }
    }

    /// Subscribes to events with the given callback.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        self.subscribe_observer(Rc::new(callback))
    }

    /// Subscribes a shared observer.
    pub fn subscribe_observer(&self, observer: Observer<T>) -> Subscription {
        let id = self.manager.borrow_mut().subscribe(observer);
        let weak: Weak<RefCell<SubscriptionManager<T>>> = Rc::downgrade(&self.manager);
        let registry: Weak<dyn Unsubscribe> = weak;
        Subscription {
            id,
            registry: Some(registry),
        }
    }

    /// Delivers `event` to every observer, in subscription order.
    ///
    /// Observers may subscribe, unsubscribe or emit further events from
    /// within the callback; an observer removed mid-delivery is skipped.
    pub fn notify(&self, event: &T) {
        let observers = self.manager.borrow().snapshot();
        for (id, observer) in observers {
            if self.manager.borrow().contains(id) {
                observer(event);
            }
        }
    }

    /// Returns the number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.manager.borrow().len()
    }

    /// Returns true if nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.manager.borrow().is_empty()
    }
}

impl<T> core::fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subject")
            .field("subscribers", &self.manager.borrow().len())
            .finish()
    }
}

/// Boxed observer constructor, for APIs that take ownership of a callback.
pub fn observer<T, F>(callback: F) -> Observer<T>
where
    F: Fn(&T) + 'static,
{
    let boxed: Box<dyn Fn(&T)> = Box::new(callback);
    Rc::from(boxed)
}
