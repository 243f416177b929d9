//! The per-container command queue.
//!
//! Any thread may enqueue through a cloned [`CommandSender`]; the tick lane
//! owns the [`CommandQueue`] and drains it once per tick in arrival order.
//! Commands enqueued while a drain is running wait for the next tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::trace;

use crate::payload::Payload;

/// A command waiting to be executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    pub command_name: String,
    #[serde(default)]
    pub payload: Payload,
}

impl CommandRequest {
    pub fn new(command_name: impl Into<String>, payload: Payload) -> Self {
        Self {
            command_name: command_name.into(),
            payload,
        }
    }
}

/// Cloneable, thread-safe handle for enqueuing commands.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<CommandRequest>,
    pending: Arc<AtomicUsize>,
}

impl CommandSender {
    /// Enqueues a command. Returns `false` if the queue has been dropped.
    pub fn enqueue(&self, command_name: impl Into<String>, payload: Payload) -> bool {
        self.submit(CommandRequest::new(command_name, payload))
    }

    /// Enqueues a prepared request. Returns `false` if the queue has been
    /// dropped.
    pub fn submit(&self, request: CommandRequest) -> bool {
        self.pending.fetch_add(1, Ordering::AcqRel);
        trace!(command = %request.command_name, "command enqueued");
        if self.tx.send(request).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return false;
        }
        true
    }

    /// Commands enqueued and not yet drained.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

/// Receiving side of the queue, owned by the tick lane.
#[derive(Debug)]
pub struct CommandQueue {
    rx: mpsc::UnboundedReceiver<CommandRequest>,
    sender: CommandSender,
}

impl CommandQueue {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            rx,
            sender: CommandSender {
                tx,
                pending: Arc::new(AtomicUsize::new(0)),
            },
        }
    }

    #[must_use]
    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sender.pending()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes up to `max` commands in FIFO order.
    pub fn drain(&mut self, max: usize) -> Vec<CommandRequest> {
        let mut drained = Vec::new();
        while drained.len() < max {
            match self.rx.try_recv() {
                Ok(request) => drained.push(request),
                Err(_) => break,
            }
        }
        self.sender.pending.fetch_sub(drained.len(), Ordering::AcqRel);
        drained
    }

    /// Discards every waiting command and returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        self.drain(usize::MAX).len()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}
