//! Replication pipeline.
//!
//! A pipeline observes one source table and forwards its changes, with the
//! values read at observation time, to a `Marshaller`. The source table and
//! the observer stay on the producing thread; only `ChangeBatch`es cross to
//! the flush thread and the target.

use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use flume::RecvTimeoutError;
use parking_lot::Mutex;
use ripple_reactive::{Subscription, TableAction, TableUpdate};
use ripple_storage::{ReactiveTable, ReactiveTableExt};
use tracing::{debug, error, trace, warn};

use crate::change::{Change, ChangeBatch};
use crate::config::{BatchMode, PipelineConfig};
use crate::error::Result;
use crate::marshal::Marshaller;
use crate::queue::ChangeQueue;

struct Shared {
    table: String,
    queue: Mutex<ChangeQueue>,
    /// Serialises dispatch so batches leave in drain order.
    dispatch: Mutex<()>,
    marshaller: Box<dyn Marshaller>,
}

impl Shared {
    fn enqueue(&self, changes: Vec<Change>) {
        let mut queue = self.queue.lock();
        for change in changes {
            queue.push(change);
        }
    }

    fn dispatch_now(&self, changes: Vec<Change>) {
        if changes.is_empty() {
            return;
        }
        let _order = self.dispatch.lock();
        self.marshaller.dispatch(ChangeBatch::new(changes));
    }

    fn flush(&self) -> usize {
        let _order = self.dispatch.lock();
        let changes = self.queue.lock().drain();
        if changes.is_empty() {
            return 0;
        }
        let count = changes.len();
        trace!(table = %self.table, count, "flushing replication queue");
        self.marshaller.dispatch(ChangeBatch::new(changes));
        count
    }
}

fn snapshot(source: &dyn ReactiveTable, update: &TableUpdate, snapshot_adds: bool) -> Vec<Change> {
    let row = update.row_index() as u64;
    let mut changes = Vec::new();
    let columns = match update.action() {
        TableAction::Add => {
            changes.push(Change::Add { row });
            if !snapshot_adds {
                return changes;
            }
            source.column_ids()
        }
        TableAction::Update => update.columns().to_vec(),
        TableAction::Delete => return vec![Change::Delete { row }],
    };
    for column in columns {
        match source.get_value(&column, update.row_index()) {
            Ok(value) => changes.push(Change::Update { row, column, value }),
            Err(error) => warn!(table = source.name(), %error, "dropped unreadable change"),
        }
    }
    changes
}

struct Flusher {
    stop: flume::Sender<()>,
    handle: JoinHandle<()>,
}

impl Flusher {
    fn spawn(shared: Arc<Shared>, interval: Duration) -> Result<Self> {
        let (stop, stop_rx) = flume::bounded::<()>(1);
        let handle = std::thread::Builder::new()
            .name(format!("ripple-flush-{}", shared.table))
            .spawn(move || {
                debug!(table = %shared.table, ?interval, "flush thread started");
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            shared.flush();
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                shared.flush();
                debug!(table = %shared.table, "flush thread stopped");
            })?;
        Ok(Self { stop, handle })
    }

    fn stop(self) {
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            error!("flush thread panicked");
        }
    }
}

/// Forwards the changes of one table to a marshaller.
///
/// Dropping the pipeline unsubscribes from the source and, in batched mode,
/// flushes whatever is still queued before the flush thread exits.
pub struct ReplicationPipeline {
    source: Rc<dyn ReactiveTable>,
    mode: BatchMode,
    shared: Arc<Shared>,
    subscription: Option<Subscription>,
    flusher: Option<Flusher>,
}

impl ReplicationPipeline {
    /// Attaches a pipeline to `source`.
    ///
    /// With `replay_existing`, rows already in the table are forwarded first
    /// as `Add` plus a full `Update`.
    pub fn attach<T, M>(source: T, config: &PipelineConfig, marshaller: M) -> Result<Self>
    where
        T: ReactiveTable + 'static,
        M: Marshaller,
    {
        let source: Rc<dyn ReactiveTable> = Rc::new(source);
        let shared = Arc::new(Shared {
            table: source.name().to_string(),
            queue: Mutex::new(ChangeQueue::new(&config.last_value_columns)),
            dispatch: Mutex::new(()),
            marshaller: Box::new(marshaller),
        });

        let flusher = match config.mode {
            BatchMode::Immediate => None,
            BatchMode::Batched { interval } => Some(Flusher::spawn(shared.clone(), interval)?),
        };

        let weak: Weak<dyn ReactiveTable> = Rc::downgrade(&source);
        let observer_shared = shared.clone();
        let mode = config.mode;
        let snapshot_adds = config.snapshot_adds;
        let callback = move |update: &TableUpdate| {
            let Some(source) = weak.upgrade() else {
                return;
            };
            let changes = snapshot(&*source, update, snapshot_adds);
            match mode {
                BatchMode::Immediate => observer_shared.dispatch_now(changes),
                BatchMode::Batched { .. } => observer_shared.enqueue(changes),
            }
        };
        let subscription = if config.replay_existing {
            source.subscribe_with_replay(callback)
        } else {
            source.subscribe(callback)
        };
        debug!(table = source.name(), ?mode, "replication pipeline attached");

        Ok(Self {
            source,
            mode,
            shared,
            subscription: Some(subscription),
            flusher,
        })
    }

    pub fn source(&self) -> &dyn ReactiveTable {
        &*self.source
    }

    #[inline]
    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    /// Returns the number of queued changes.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Dispatches everything queued now, returning the number of changes.
    pub fn flush(&self) -> usize {
        self.shared.flush()
    }
}

impl Drop for ReplicationPipeline {
    fn drop(&mut self) {
        self.subscription.take();
        if let Some(flusher) = self.flusher.take() {
            flusher.stop();
        }
    }
}

impl fmt::Debug for ReplicationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicationPipeline")
            .field("table", &self.shared.table)
            .field("mode", &self.mode)
            .field("pending", &self.pending())
            .finish()
    }
}
