//! Bounded-concurrency upload scheduler.
//!
//! Every entry of the batch gets its own task up front; a semaphore with
//! `concurrency` permits decides how many of them may be inside
//! [`Transport::put`] at the same time. The rest stay parked on the
//! semaphore until a slot frees up.

use std::sync::Arc;

use static_deploy_model::{FileEntry, WorkBatch};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::progress::ProgressSink;
use crate::transport::Transport;
use crate::TransferError;

/// Whether uploads actually hit the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Live,
    /// Walk the batch and report progress without calling the transport.
    DryRun,
}

/// Terminal state of one batch entry.
#[derive(Debug)]
pub enum TransferOutcome {
    Succeeded,
    Failed(TransferError),
}

/// Summary of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    /// Entries processed (uploaded, or visited in a dry run).
    pub files: usize,
    pub mode: RunMode,
}

/// Runs a [`WorkBatch`] against a [`Transport`] with at most
/// `concurrency` uploads in flight.
#[derive(Debug, Clone)]
pub struct TransferScheduler {
    concurrency: usize,
    mode: RunMode,
    delta: bool,
    cancel: CancellationToken,
}

impl TransferScheduler {
    /// Creates a scheduler. A concurrency of 0 is treated as 1.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            mode: RunMode::Live,
            delta: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Marks the run as a delta upload (only affects the summary line).
    pub fn with_delta(mut self, delta: bool) -> Self {
        self.delta = delta;
        self
    }

    /// Uses `cancel` to stop tasks that have not started uploading yet.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Uploads every entry of `batch` and waits for all of them.
    ///
    /// Each entry writes a `"<path>...Done."` line to `sink` once its
    /// upload returned, whether it succeeded or not. If any entry failed,
    /// the first failure observed is returned and the others are only
    /// logged. On success a summary line is written.
    pub async fn run(
        &self,
        batch: WorkBatch,
        transport: Arc<dyn Transport>,
        sink: &ProgressSink,
    ) -> Result<TransferReport, TransferError> {
        let total = batch.len();
        sink.line(format_args!(
            "{total} Files to upload ({} concurrently)...",
            self.concurrency
        ));
        info!(
            files = total,
            concurrency = self.concurrency,
            mode = ?self.mode,
            "starting transfer"
        );

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for entry in batch {
            let permits = Arc::clone(&permits);
            let transport = Arc::clone(&transport);
            let sink = sink.clone();
            let cancel = self.cancel.clone();
            let mode = self.mode;

            tasks.spawn(async move {
                let key = entry.upload_key().to_string();
                let outcome = transfer_one(entry, &permits, transport, &sink, &cancel, mode).await;
                (key, outcome)
            });
        }

        let mut first_error: Option<TransferError> = None;
        let mut succeeded = 0usize;

        while let Some(joined) = tasks.join_next().await {
            let (key, outcome) = match joined {
                Ok(result) => result,
                Err(e) => (
                    String::from("<unknown>"),
                    TransferOutcome::Failed(TransferError::Task(e.to_string())),
                ),
            };

            match outcome {
                TransferOutcome::Succeeded => succeeded += 1,
                TransferOutcome::Failed(err) => {
                    if first_error.is_none() {
                        debug!(key = %key, error = %err, "first transfer failure");
                        first_error = Some(err);
                    } else {
                        warn!(key = %key, error = %err, "discarding additional transfer failure");
                    }
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        sink.line(self.finish_message());
        info!(files = succeeded, "transfer finished");

        Ok(TransferReport {
            files: succeeded,
            mode: self.mode,
        })
    }

    fn finish_message(&self) -> String {
        let base = match self.mode {
            RunMode::Live => "Upload finished.",
            RunMode::DryRun => "Dry Run finished.",
        };
        if self.delta {
            format!("Delta {base}")
        } else {
            base.to_string()
        }
    }
}

async fn transfer_one(
    entry: FileEntry,
    permits: &Semaphore,
    transport: Arc<dyn Transport>,
    sink: &ProgressSink,
    cancel: &CancellationToken,
    mode: RunMode,
) -> TransferOutcome {
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return TransferOutcome::Failed(TransferError::Cancelled),
        permit = permits.acquire() => match permit {
            Ok(permit) => permit,
            Err(_) => return TransferOutcome::Failed(TransferError::Cancelled),
        },
    };

    let result = match mode {
        RunMode::Live => transport.put(&entry).await,
        RunMode::DryRun => Ok(String::new()),
    };

    let outcome = match result {
        Ok(body) => {
            if !body.is_empty() {
                sink.raw(body.as_bytes());
            }
            TransferOutcome::Succeeded
        }
        Err(err) => TransferOutcome::Failed(err),
    };

    sink.line(format_args!("{}...Done.", entry.local_path().display()));
    outcome
}
