use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::error::GuestbookError;
use crate::hub::SessionHub;
use crate::models::{Job, Snapshot};

// app's shared state - handlers only talk to the worker through `jobs`
pub struct AppState {
    pub jobs: mpsc::Sender<Job>,
    pub hub: Arc<SessionHub>,
    pub session_buffer: usize, // outbound frames queued per session
}

impl AppState {
    pub async fn submit(&self, job: Job) -> Result<(), GuestbookError> {
        self.jobs
            .send(job)
            .await
            .map_err(|_| GuestbookError::WorkerGone)
    }

    pub async fn snapshot(&self) -> Result<Snapshot, GuestbookError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.submit(Job::Snapshot { response_tx }).await?;
        response_rx.await.map_err(|_| GuestbookError::WorkerGone)
    }

    /// Ask the worker to flush and stop, waiting for it to finish.
    pub async fn shutdown(&self) -> Result<(), GuestbookError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.submit(Job::Shutdown { done_tx }).await?;
        done_rx.await.map_err(|_| GuestbookError::WorkerGone)
    }
}
