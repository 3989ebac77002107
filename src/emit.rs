//! Downstream sinks for emitted snapshots.
//!
//! The window hands every snapshot to an [`Emitter`] while holding the
//! serialization scope for that key, so a sink observes per-key snapshots in
//! mutation order. Sinks must not block: each adapter here either buffers or
//! forwards and returns immediately.

use crate::event_model::Snapshot;
use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};

/// Default capacity of [`QueueEmitter`].
pub const EMIT_QUEUE_CAPACITY: usize = 20_000;

/// Receives every snapshot produced by the window.
pub trait Emitter<K>: Send {
    fn emit(&mut self, snapshot: Snapshot<K>);
}

impl<K> Emitter<K> for Box<dyn Emitter<K>> {
    fn emit(&mut self, snapshot: Snapshot<K>) {
        (**self).emit(snapshot);
    }
}

/// Shared in-memory sink; clones observe the same buffer.
#[derive(Debug)]
pub struct CollectingEmitter<K> {
    snapshots: Arc<Mutex<Vec<Snapshot<K>>>>,
}

impl<K> Clone for CollectingEmitter<K> {
    fn clone(&self) -> Self {
        Self {
            snapshots: self.snapshots.clone(),
        }
    }
}

impl<K> Default for CollectingEmitter<K> {
    fn default() -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<K: Clone> CollectingEmitter<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out every snapshot collected so far.
    pub fn snapshots(&self) -> Vec<Snapshot<K>> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Scores of every collected snapshot in emission order.
    pub fn scores(&self) -> Vec<i64> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|snapshot| snapshot.score)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Send> Emitter<K> for CollectingEmitter<K> {
    fn emit(&mut self, snapshot: Snapshot<K>) {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot);
    }
}

/// Forwards snapshots over a std channel; a dropped receiver discards them.
#[derive(Debug)]
pub struct ChannelEmitter<K> {
    sender: mpsc::Sender<Snapshot<K>>,
    disconnected: bool,
}

impl<K> ChannelEmitter<K> {
    /// Builds the emitter together with the receiving half.
    pub fn channel() -> (Self, mpsc::Receiver<Snapshot<K>>) {
        let (sender, receiver) = mpsc::channel();
        (Self::new(sender), receiver)
    }

    pub fn new(sender: mpsc::Sender<Snapshot<K>>) -> Self {
        Self {
            sender,
            disconnected: false,
        }
    }

    /// Whether the receiver has gone away.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

impl<K: Send> Emitter<K> for ChannelEmitter<K> {
    fn emit(&mut self, snapshot: Snapshot<K>) {
        if self.disconnected {
            return;
        }
        if self.sender.send(snapshot).is_err() {
            self.disconnected = true;
        }
    }
}

/// Bridges snapshots into async consumers through an unbounded tokio channel.
#[derive(Debug)]
pub struct TokioEmitter<K> {
    sender: tokio::sync::mpsc::UnboundedSender<Snapshot<K>>,
    disconnected: bool,
}

impl<K> TokioEmitter<K> {
    pub fn channel() -> (Self, tokio::sync::mpsc::UnboundedReceiver<Snapshot<K>>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        let emitter = Self {
            sender,
            disconnected: false,
        };
        (emitter, receiver)
    }

    /// Whether a send has failed because the receiver was dropped.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

impl<K: Send> Emitter<K> for TokioEmitter<K> {
    fn emit(&mut self, snapshot: Snapshot<K>) {
        if self.disconnected {
            return;
        }
        if self.sender.send(snapshot).is_err() {
            self.disconnected = true;
        }
    }
}

/// Lock-free bounded buffer between the window and a polling consumer.
///
/// When the buffer is saturated the snapshot is counted as overflow and
/// discarded rather than blocking the window.
#[derive(Debug)]
pub struct QueueEmitter<K> {
    queue: Arc<ArrayQueue<Snapshot<K>>>,
    overflow_total: Arc<AtomicU64>,
}

impl<K> Clone for QueueEmitter<K> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            overflow_total: self.overflow_total.clone(),
        }
    }
}

impl<K> Default for QueueEmitter<K> {
    fn default() -> Self {
        Self::with_capacity(EMIT_QUEUE_CAPACITY)
    }
}

impl<K> QueueEmitter<K> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity.max(1))),
            overflow_total: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn try_dequeue(&self) -> Option<Snapshot<K>> {
        self.queue.pop()
    }

    pub fn depth(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Snapshots discarded because the buffer was full.
    pub fn overflow_total(&self) -> u64 {
        self.overflow_total.load(Ordering::Relaxed)
    }

    /// Fraction of the buffer in use, in `[0, 1]`.
    pub fn utilization(&self) -> f64 {
        (self.depth() as f64 / self.capacity() as f64).clamp(0.0, 1.0)
    }
}

impl<K: Send> Emitter<K> for QueueEmitter<K> {
    fn emit(&mut self, snapshot: Snapshot<K>) {
        if self.queue.push(snapshot).is_err() {
            self.overflow_total.fetch_add(1, Ordering::Relaxed);
        }
    }
}
