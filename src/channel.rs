//! One-way, ordered, typed delivery of chunks to a consumer.
//!
//! Producers only see the narrow [`ChunkSink`] trait so the transport is
//! substitutable: the desktop shell bridges chunks onto its IPC channel,
//! tests and in-process consumers collect them in memory.

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

/// The consumer went away; the producing command should stop promptly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

impl std::fmt::Display for SinkClosed {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "chunk consumer closed the channel")
  }
}

impl std::error::Error for SinkClosed {}

/// Single-producer, single-consumer chunk channel.
///
/// `send` returns once the chunk is enqueued; there is no back-pressure on
/// the producer. Rate-flushing is the consumer's responsibility.
pub trait ChunkSink<T>: Send + Sync {
  fn send(&self, chunk: Vec<T>) -> Result<(), SinkClosed>;
}

impl<T: Send> ChunkSink<T> for UnboundedSender<Vec<T>> {
  fn send(&self, chunk: Vec<T>) -> Result<(), SinkClosed> {
    UnboundedSender::send(self, chunk).map_err(|_| SinkClosed)
  }
}

/// In-memory sink that keeps chunks as delivered.
#[derive(Debug)]
pub struct CollectSink<T> {
  chunks: Mutex<Vec<Vec<T>>>,
}

impl<T> CollectSink<T> {
  pub fn new() -> Self {
    Self {
      chunks: Mutex::new(Vec::new()),
    }
  }

  /// Chunks in delivery order.
  pub fn chunks(&self) -> Vec<Vec<T>>
  where
    T: Clone,
  {
    self.chunks.lock().clone()
  }

  /// All delivered items, flattened in delivery order.
  pub fn items(&self) -> Vec<T>
  where
    T: Clone,
  {
    self.chunks.lock().iter().flatten().cloned().collect()
  }
}

impl<T> Default for CollectSink<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Send> ChunkSink<T> for CollectSink<T> {
  fn send(&self, chunk: Vec<T>) -> Result<(), SinkClosed> {
    self.chunks.lock().push(chunk);
    Ok(())
  }
}
