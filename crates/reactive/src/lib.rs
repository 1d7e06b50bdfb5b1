//! Ripple Reactive - Change notifications for ripple reactive tables.
//!
//! Every table in ripple publishes a single ordered stream of `TableUpdate`
//! records. This crate defines that record and the fan-out machinery used to
//! deliver it.
//!
//! # Core Concepts
//!
//! - `TableUpdate`: One row was added, updated (with the touched columns) or deleted
//! - `Subject<T>`: Single-producer fan-out to any number of observers
//! - `Subscription`: Disposal token; dropping it unsubscribes
//! - `SubscriptionSet`: Owns a group of tokens so they can be torn down together
//!
//! # Example
//!
//! ```
//! use ripple_reactive::{Subject, TableUpdate};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let subject: Subject<TableUpdate> = Subject::new();
//! let seen = Rc::new(Cell::new(0));
//! let seen_clone = seen.clone();
//!
//! let token = subject.subscribe(move |update: &TableUpdate| {
//!     if update.is_add() {
//!         seen_clone.set(seen_clone.get() + 1);
//!     }
//! });
//!
//! subject.notify(&TableUpdate::add(0));
//! drop(token);
//! subject.notify(&TableUpdate::add(1));
//!
//! assert_eq!(seen.get(), 1);
//! ```

#![no_std]

extern crate alloc;

pub mod subscription;
pub mod update;

pub use subscription::{
    observer, Observer, Subject, Subscription, SubscriptionId, SubscriptionManager, SubscriptionSet,
};
pub use update::{TableAction, TableUpdate};
