//! Background settings writer
//!
//! One tokio task owns the settings file and writes document snapshots in the
//! order they were committed, so writes never interleave.

use cfgtree_node::{CommitError, CommitHook};
use cfgtree_schema::PlainData;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::StoreError;
use crate::store::SettingsStore;

enum Message {
    Write(PlainData),
    Stop,
}

/// Counters reported when the writer shuts down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub written: usize,
    pub failed: usize,
}

/// Handle to the writer task
#[derive(Debug)]
pub struct BackgroundWriter {
    sender: mpsc::UnboundedSender<Message>,
    handle: JoinHandle<WriterStats>,
}

impl BackgroundWriter {
    /// Start the writer task on the current tokio runtime
    #[must_use]
    pub fn spawn(store: SettingsStore) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let mut stats = WriterStats::default();
            while let Some(Message::Write(document)) = receiver.recv().await {
                match store.save_async(&document).await {
                    Ok(()) => stats.written += 1,
                    Err(err) => {
                        stats.failed += 1;
                        error!(error = %err, "background settings write failed");
                    }
                }
            }
            debug!(written = stats.written, failed = stats.failed, "settings writer stopped");
            stats
        });
        Self { sender, handle }
    }

    /// Queue `document` for writing
    ///
    /// # Errors
    /// Returns [`StoreError::WriterClosed`] if the task has stopped
    pub fn submit(&self, document: PlainData) -> Result<(), StoreError> {
        self.sender
            .send(Message::Write(document))
            .map_err(|_| StoreError::WriterClosed)
    }

    /// Commit hook that queues each committed document
    #[must_use]
    pub fn hook(&self) -> WriterHook {
        WriterHook {
            sender: self.sender.clone(),
        }
    }

    /// Finish queued writes and stop the task
    ///
    /// Documents queued after this call, through a hook still held by a tree,
    /// are not written.
    ///
    /// # Errors
    /// Returns [`StoreError::WriterClosed`] if the task panicked or was cancelled
    pub async fn shutdown(self) -> Result<WriterStats, StoreError> {
        // A send failure means the task is already gone; the join reports why.
        let _ = self.sender.send(Message::Stop);
        self.handle.await.map_err(|_| StoreError::WriterClosed)
    }
}

/// [`CommitHook`] feeding a [`BackgroundWriter`]
#[derive(Debug, Clone)]
pub struct WriterHook {
    sender: mpsc::UnboundedSender<Message>,
}

impl CommitHook for WriterHook {
    fn on_commit(&mut self, document: &PlainData) -> Result<(), CommitError> {
        self.sender
            .send(Message::Write(document.clone()))
            .map_err(|_| StoreError::WriterClosed.into())
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Write(_) => f.write_str("Write(..)"),
            Self::Stop => f.write_str("Stop"),
        }
    }
}
