//! Hand-off from the hook listener to the single executor thread.
//!
//! Fired hotkeys become [`PlayRequest`]s on an unbounded FIFO. One dedicated
//! thread, running its own current-thread runtime, owns the
//! [`SequencePlayer`] and drains the queue: sequences run one at a time in
//! trigger order and never interleave.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use parking_lot::Mutex;
use quickpaste_config::Action;
use tokio::{
    runtime,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{Error, Result, SequencePlayer, Status, StatusDispatcher};

/// Name of the executor thread.
const EXECUTOR_THREAD: &str = "quickpaste-executor";

/// One triggered sequence, snapshotted from the table at trigger time.
#[derive(Debug, Clone)]
pub struct PlayRequest {
    /// Normalized combo that fired.
    pub key: String,
    /// Steps to play.
    pub actions: Arc<[Action]>,
}

/// Owns the executor thread and the queue feeding it.
#[derive(Clone)]
pub struct DispatchBridge {
    /// Queue sender; `None` once shut down.
    tx: Arc<Mutex<Option<UnboundedSender<PlayRequest>>>>,
    /// Cancels in-flight waits on shutdown.
    cancel: CancellationToken,
    /// Executor thread, taken on join.
    handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl DispatchBridge {
    /// Start the executor thread.
    ///
    /// `factory` runs on the executor thread, so platform handles that must
    /// stay on one thread (clipboard, input) can be created there.
    pub fn spawn<F>(factory: F, status: StatusDispatcher) -> Result<Self>
    where
        F: FnOnce() -> SequencePlayer + Send + 'static,
    {
        let rt = runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| Error::ExecutorStart(e.to_string()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let handle = thread::Builder::new()
            .name(EXECUTOR_THREAD.into())
            .spawn(move || rt.block_on(executor_loop(factory, rx, worker_cancel, status)))
            .map_err(|e| Error::ExecutorStart(e.to_string()))?;
        debug!(thread = EXECUTOR_THREAD, "executor_started");
        Ok(Self {
            tx: Arc::new(Mutex::new(Some(tx))),
            cancel,
            handle: Arc::new(Mutex::new(Some(handle))),
        })
    }

    /// Queue a sequence. Never blocks.
    pub fn enqueue(&self, request: PlayRequest) -> Result<()> {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(Error::ShutDown);
        };
        trace!(key = %request.key, steps = request.actions.len(), "play_request_queued");
        tx.send(request).map_err(|_| Error::ShutDown)
    }

    /// True once [`Self::shutdown`] has been called.
    pub fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }

    /// Stop accepting requests, cancel pending waits and join the executor.
    ///
    /// Requests still queued are dropped. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.tx.lock().take();
        self.cancel.cancel();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            match task::spawn_blocking(move || handle.join()).await {
                Ok(Ok(())) => debug!("executor_joined"),
                Ok(Err(_)) => warn!("executor_panicked"),
                Err(e) => warn!(error = %e, "executor_join_failed"),
            }
        }
    }
}

/// Drain the queue until cancelled or every sender is gone.
async fn executor_loop<F>(
    factory: F,
    mut rx: UnboundedReceiver<PlayRequest>,
    cancel: CancellationToken,
    status: StatusDispatcher,
) where
    F: FnOnce() -> SequencePlayer,
{
    let mut player = factory().with_cancel(cancel.clone());
    loop {
        let request = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            req = rx.recv() => match req {
                Some(req) => req,
                None => break,
            },
        };
        debug!(key = %request.key, steps = request.actions.len(), "sequence_start");
        status.send(Status::Running {
            key: request.key.clone(),
        });
        let report = player.play(&request.actions).await;
        debug!(
            key = %request.key,
            attempted = report.attempted,
            failed = report.failed_steps(),
            "sequence_done"
        );
        status.send(Status::Idle {
            key: request.key,
            failed_steps: report.failed_steps(),
        });
    }
    debug!("executor_stopped");
}
