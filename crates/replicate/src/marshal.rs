//! Delivery of change batches onto a target execution context.

use tracing::warn;

use crate::change::ChangeBatch;

/// Runs a unit of replication work on some target context.
///
/// `dispatch` must not block on the target. Batches from one pipeline are
/// dispatched in order; nothing orders batches of different pipelines.
pub trait Marshaller: Send + Sync + 'static {
    fn dispatch(&self, batch: ChangeBatch);
}

/// Runs the batch inline on whichever thread flushed it.
impl<F> Marshaller for F
where
    F: Fn(ChangeBatch) + Send + Sync + 'static,
{
    fn dispatch(&self, batch: ChangeBatch) {
        self(batch)
    }
}

/// Hands batches to a thread that owns the receiving end of a channel.
#[derive(Debug, Clone)]
pub struct ChannelMarshaller {
    tx: flume::Sender<ChangeBatch>,
}

impl ChannelMarshaller {
    pub fn new(tx: flume::Sender<ChangeBatch>) -> Self {
        Self { tx }
    }
}

impl Marshaller for ChannelMarshaller {
    fn dispatch(&self, batch: ChangeBatch) {
        if self.tx.send(batch).is_err() {
            warn!("replication target hung up, dropping batch");
        }
    }
}

/// Creates an unbounded channel marshaller and its receiving end.
pub fn channel() -> (ChannelMarshaller, flume::Receiver<ChangeBatch>) {
    let (tx, rx) = flume::unbounded();
    (ChannelMarshaller::new(tx), rx)
}
