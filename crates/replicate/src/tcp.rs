//! Delta streams over TCP.
//!
//! One listening port serves one table. Each accepted connection first
//! receives the current state of every row, then live deltas. Transport
//! threads never block for longer than the configured poll interval before
//! checking their stop flag.

use std::collections::BTreeMap;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use flume::RecvTimeoutError;
use parking_lot::Mutex;
use ripple_binary::{DeltaDecoder, DeltaEncoder, DeltaRecord, FieldMap};
use ripple_core::{ColumnId, Value};
use ripple_storage::RemoteRowId;
use tracing::{debug, error, info, warn};

use crate::change::{Change, ChangeBatch};
use crate::config::ConnectionConfig;
use crate::error::{ReplicationError, Result};
use crate::marshal::Marshaller;

const READ_BUFFER_SIZE: usize = 8 << 10;

struct PublisherState {
    encoder: DeltaEncoder,
    /// Last published value of every mapped column, per live row.
    rows: BTreeMap<RemoteRowId, BTreeMap<ColumnId, Value>>,
    sinks: Vec<flume::Sender<Bytes>>,
}

impl PublisherState {
    fn record(&mut self, batch: &ChangeBatch) {
        for change in batch.changes() {
            match change {
                Change::Add { row } => {
                    self.rows.insert(*row, BTreeMap::new());
                }
                Change::Update { row, column, value } => {
                    if self.encoder.fields().field(column).is_none() {
                        continue;
                    }
                    if let Some(values) = self.rows.get_mut(row) {
                        values.insert(column.clone(), value.clone());
                    }
                }
                Change::Delete { row } => {
                    self.rows.remove(row);
                }
            }
        }
    }

    fn replay(&mut self) -> Bytes {
        for (row, values) in &self.rows {
            let values: Vec<(ColumnId, Value)> =
                values.iter().map(|(c, v)| (c.clone(), v.clone())).collect();
            self.encoder.encode_add(*row as usize);
            self.encoder.encode_update(*row as usize, &values);
        }
        self.encoder.take()
    }
}

/// Fans encoded deltas out to every connected subscriber.
///
/// The publisher is the marshaller of a pipeline. It keeps the last value
/// of each mapped column so a late subscriber can be brought up to date
/// before it joins the live stream.
#[derive(Clone)]
pub struct DeltaPublisher {
    state: Arc<Mutex<PublisherState>>,
}

impl DeltaPublisher {
    pub fn new(fields: FieldMap) -> Self {
        Self {
            state: Arc::new(Mutex::new(PublisherState {
                encoder: DeltaEncoder::new(fields),
                rows: BTreeMap::new(),
                sinks: Vec::new(),
            })),
        }
    }

    /// Sends the current state to `sink`, then registers it for live
    /// deltas.
    ///
    /// Returns false if the sink hung up during replay.
    pub fn attach(&self, sink: flume::Sender<Bytes>) -> bool {
        let mut state = self.state.lock();
        let replay = state.replay();
        if !replay.is_empty() && sink.send(replay).is_err() {
            return false;
        }
        state.sinks.push(sink);
        true
    }

    /// Attaches a fresh unbounded channel and returns its receiving end.
    pub fn subscribe(&self) -> flume::Receiver<Bytes> {
        let (tx, rx) = flume::unbounded();
        self.attach(tx);
        rx
    }

    /// Returns the number of rows a new subscriber would receive.
    pub fn row_count(&self) -> usize {
        self.state.lock().rows.len()
    }

    pub fn sink_count(&self) -> usize {
        self.state.lock().sinks.len()
    }

    pub fn publish(&self, batch: &ChangeBatch) {
        let mut state = self.state.lock();
        state.record(batch);
        batch.encode(&mut state.encoder);
        let bytes = state.encoder.take();
        if bytes.is_empty() {
            return;
        }
        state.sinks.retain(|sink| sink.send(bytes.clone()).is_ok());
    }
}

impl Marshaller for DeltaPublisher {
    fn dispatch(&self, batch: ChangeBatch) {
        self.publish(&batch);
    }
}

impl std::fmt::Debug for DeltaPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DeltaPublisher")
            .field("rows", &state.rows.len())
            .field("sinks", &state.sinks.len())
            .finish()
    }
}

/// Serves a `DeltaPublisher` to TCP subscribers.
pub struct TcpDeltaServer {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    accept: Option<JoinHandle<()>>,
}

impl TcpDeltaServer {
    pub fn bind(config: &ConnectionConfig, publisher: DeltaPublisher) -> Result<Self> {
        let listener = TcpListener::bind(&config.address)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        let stop = Arc::new(AtomicBool::new(false));

        let poll = config.poll_interval;
        let accept_stop = stop.clone();
        let accept = thread::Builder::new()
            .name(format!("ripple-accept-{}", local_addr.port()))
            .spawn(move || accept_loop(listener, publisher, accept_stop, poll))?;

        info!(%local_addr, "delta server listening");
        Ok(Self {
            local_addr,
            stop,
            accept: Some(accept),
        })
    }

    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting, closes every connection and waits for the transport
    /// threads.
    pub fn shutdown(mut self) {
        self.stop_threads();
    }

    fn stop_threads(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.accept.take() {
            if handle.join().is_err() {
                error!(local_addr = %self.local_addr, "accept thread panicked");
            }
        }
    }
}

impl Drop for TcpDeltaServer {
    fn drop(&mut self) {
        self.stop_threads();
    }
}

fn accept_loop(listener: TcpListener, publisher: DeltaPublisher, stop: Arc<AtomicBool>, poll: Duration) {
    let mut writers: Vec<JoinHandle<()>> = Vec::new();
    while !stop.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, peer)) => match spawn_writer(stream, peer, &publisher, stop.clone(), poll) {
                Ok(handle) => writers.push(handle),
                Err(e) => warn!(%peer, error = ?e, "rejected delta subscriber"),
            },
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(poll),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                error!(error = ?e, "delta server accept failed");
                break;
            }
        }
        writers.retain(|handle| !handle.is_finished());
    }
    for handle in writers {
        let _ = handle.join();
    }
    debug!("delta server accept loop exited");
}

fn spawn_writer(
    mut stream: TcpStream,
    peer: SocketAddr,
    publisher: &DeltaPublisher,
    stop: Arc<AtomicBool>,
    poll: Duration,
) -> Result<JoinHandle<()>> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    stream.set_write_timeout(Some(poll))?;
    let (tx, rx) = flume::unbounded::<Bytes>();
    if !publisher.attach(tx) {
        return Err(ReplicationError::Disconnected);
    }

    let handle = thread::Builder::new()
        .name(format!("ripple-writer-{}", peer))
        .spawn(move || {
            debug!(%peer, "delta subscriber connected");
            while !stop.load(Ordering::Acquire) {
                match rx.recv_timeout(poll) {
                    Ok(bytes) => match write_frame(&mut stream, &bytes, &stop) {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => {
                            warn!(%peer, error = ?e, "delta subscriber write failed");
                            break;
                        }
                    },
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!(%peer, "delta subscriber closed");
        })?;
    Ok(handle)
}

/// Writes all of `bytes` unless `stop` is raised first. Returns false when
/// stopped, with the frame possibly cut short.
fn write_frame(stream: &mut TcpStream, bytes: &[u8], stop: &AtomicBool) -> io::Result<bool> {
    let mut written = 0;
    while written < bytes.len() {
        if stop.load(Ordering::Acquire) {
            return Ok(false);
        }
        match stream.write(&bytes[written..]) {
            Ok(0) => return Err(ErrorKind::WriteZero.into()),
            Ok(n) => written += n,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// An event of a received delta stream.
#[derive(Debug)]
pub enum StreamEvent {
    Record(DeltaRecord),
    /// Terminal. `None` when the client was stopped locally.
    Closed(Option<ReplicationError>),
}

/// Reads a delta stream on a dedicated thread.
///
/// Records are handed to the event callback on the reader thread; the
/// receiving table usually lives elsewhere, see `connect_channel`.
pub struct TcpDeltaClient {
    peer: SocketAddr,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl TcpDeltaClient {
    pub fn connect<F>(config: &ConnectionConfig, on_event: F) -> Result<Self>
    where
        F: FnMut(StreamEvent) + Send + 'static,
    {
        let stream = TcpStream::connect(&config.address)?;
        stream.set_read_timeout(Some(config.poll_interval))?;
        let peer = stream.peer_addr()?;
        let stop = Arc::new(AtomicBool::new(false));

        let reader_stop = stop.clone();
        let reader = thread::Builder::new()
            .name(format!("ripple-reader-{}", peer))
            .spawn(move || read_loop(stream, peer, reader_stop, on_event))?;

        Ok(Self {
            peer,
            stop,
            reader: Some(reader),
        })
    }

    /// Connects and forwards every event into an unbounded channel.
    pub fn connect_channel(config: &ConnectionConfig) -> Result<(Self, flume::Receiver<StreamEvent>)> {
        let (tx, rx) = flume::unbounded();
        let client = Self::connect(config, move |event| {
            let _ = tx.send(event);
        })?;
        Ok((client, rx))
    }

    #[inline]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Returns false once the reader thread has delivered `Closed`.
    pub fn is_running(&self) -> bool {
        self.reader.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signals the reader to stop and waits for it. A read in flight
    /// completes first.
    pub fn stop(mut self) {
        self.stop_reader();
    }

    fn stop_reader(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.reader.take() {
            if handle.join().is_err() {
                error!(peer = %self.peer, "delta reader thread panicked");
            }
        }
    }
}

impl Drop for TcpDeltaClient {
    fn drop(&mut self) {
        self.stop_reader();
    }
}

fn read_loop<F>(mut stream: TcpStream, peer: SocketAddr, stop: Arc<AtomicBool>, mut on_event: F)
where
    F: FnMut(StreamEvent),
{
    debug!(%peer, "delta reader started");
    let mut decoder = DeltaDecoder::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let outcome = 'read: loop {
        if stop.load(Ordering::Acquire) {
            break None;
        }
        match stream.read(&mut buf) {
            Ok(0) => break Some(ReplicationError::Disconnected),
            Ok(n) => {
                decoder.feed(&buf[..n]);
                loop {
                    match decoder.next_record() {
                        Ok(Some(record)) => on_event(StreamEvent::Record(record)),
                        Ok(None) => break,
                        Err(e) => break 'read Some(ReplicationError::from(e)),
                    }
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted) => {}
            Err(e) => break Some(ReplicationError::from(e)),
        }
    };
    match &outcome {
        None => debug!(%peer, "delta reader stopped"),
        Some(ReplicationError::Disconnected) => info!(%peer, "delta stream closed by peer"),
        Some(e) => warn!(%peer, error = %e, "delta stream failed"),
    }
    on_event(StreamEvent::Closed(outcome));
}
