//! Background persistence of cart snapshots.
//!
//! A single task owns every write to storage. The store hands it the newest
//! snapshot through a single-slot channel: if several mutations land while a
//! write is in flight, only the latest is written next. Writes never overlap
//! and never go out of order, so storage always converges on the most recent
//! in-memory cart.
//!
//! Failures are logged and dropped. The next mutation writes a newer
//! snapshot, which doubles as the retry.

use std::sync::Arc;

use go_marketplace_core::CartSnapshot;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::codec;
use crate::error::{CartError, StorageError};
use crate::storage::KeyValueStore;

/// A snapshot waiting to be written.
#[derive(Debug, Clone, Default)]
struct Pending {
    revision: u64,
    snapshot: Option<Arc<CartSnapshot>>,
}

/// Outcome of the most recent write attempt.
#[derive(Debug, Clone, Default)]
struct WriteReport {
    revision: u64,
    error: Option<String>,
}

/// Handle to the writer task.
pub(crate) struct PersistWriter {
    pending_tx: watch::Sender<Pending>,
    report_rx: watch::Receiver<WriteReport>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PersistWriter {
    /// Spawn the writer task for `key`.
    ///
    /// `revision` is the revision of the snapshot already in storage, so a
    /// flush before the first mutation returns immediately.
    pub(crate) fn spawn(storage: Arc<dyn KeyValueStore>, key: String, revision: u64) -> Self {
        let (pending_tx, pending_rx) = watch::channel(Pending {
            revision,
            snapshot: None,
        });
        let (report_tx, report_rx) = watch::channel(WriteReport {
            revision,
            error: None,
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run(storage, key, pending_rx, report_tx, shutdown_rx));

        Self {
            pending_tx,
            report_rx,
            shutdown_tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Queue `snapshot` for writing, superseding anything not yet written.
    pub(crate) fn submit(&self, revision: u64, snapshot: Arc<CartSnapshot>) {
        self.pending_tx.send_replace(Pending {
            revision,
            snapshot: Some(snapshot),
        });
    }

    /// Wait until a write of `revision` (or a later one) has been attempted.
    pub(crate) async fn wait_for(&self, revision: u64) -> Result<(), CartError> {
        let mut report_rx = self.report_rx.clone();
        let report = report_rx
            .wait_for(|report| report.revision >= revision)
            .await
            .map_err(|_| CartError::WriterStopped)?
            .clone();

        match report.error {
            Some(message) => Err(CartError::Persist {
                revision: report.revision,
                message,
            }),
            None => Ok(()),
        }
    }

    /// Stop the writer task once it has drained pending writes.
    pub(crate) async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);

        let task = self.task.lock().await.take();
        if let Some(handle) = task {
            if let Err(e) = handle.await {
                warn!(error = %e, "Persistence writer task panicked");
            }
        }
    }
}

async fn run(
    storage: Arc<dyn KeyValueStore>,
    key: String,
    mut pending_rx: watch::Receiver<Pending>,
    report_tx: watch::Sender<WriteReport>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    debug!(key = %key, "Persistence writer started");

    loop {
        tokio::select! {
            // Drain pending writes before honouring shutdown.
            biased;

            changed = pending_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let pending = pending_rx.borrow_and_update().clone();
                let Some(snapshot) = pending.snapshot else {
                    continue;
                };

                let error = write(storage.as_ref(), &key, &snapshot)
                    .await
                    .err()
                    .map(|e| {
                        warn!(
                            key = %key,
                            revision = pending.revision,
                            error = %e,
                            "Failed to persist cart"
                        );
                        e.to_string()
                    });
                if error.is_none() {
                    debug!(key = %key, revision = pending.revision, "Persisted cart");
                }

                report_tx.send_replace(WriteReport {
                    revision: pending.revision,
                    error,
                });
            }
            _ = shutdown_rx.changed() => break,
        }
    }

    info!(key = %key, "Persistence writer stopped");
}

async fn write(
    storage: &dyn KeyValueStore,
    key: &str,
    snapshot: &CartSnapshot,
) -> Result<(), WriteError> {
    let blob = codec::encode(snapshot)?;
    storage.set(key, &blob).await?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum WriteError {
    #[error(transparent)]
    Codec(#[from] crate::error::CodecError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
