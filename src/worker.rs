//! The only place state is touched. Runs on the blocking pool because every
//! mutation writes its snapshot synchronously before the broadcast.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::gateway::Gateway;
use crate::hub::SessionHub;
use crate::metrics::COMMAND_LATENCY;
use crate::models::{Job, ServerEvent};

// Single consumer of the job queue; start with `tokio::task::spawn_blocking`
pub fn gateway_worker(mut rx: mpsc::Receiver<Job>, mut gateway: Gateway, hub: Arc<SessionHub>) {
    tracing::info!("gateway worker started - processing commands sequentially");

    while let Some(job) = rx.blocking_recv() {
        match job {
            Job::Join { session } => {
                let session_id = session.id;
                tracing::info!(session = %session_id, identity = %session.identity, "session connected");
                // register and send init in one step so no event slips between
                hub.register(session);
                hub.send_to(&session_id, &ServerEvent::Init(gateway.snapshot()));
            }
            Job::Command {
                session_id,
                identity,
                command,
            } => {
                let start_time = Instant::now();
                let outcome = gateway.handle(&identity, command, start_time);

                if let Some(reply) = outcome.reply {
                    hub.send_to(&session_id, &reply);
                }
                if let Some(event) = outcome.broadcast {
                    let delivered = hub.broadcast(&event);
                    tracing::debug!(delivered, "event broadcast");
                }
                COMMAND_LATENCY.observe(start_time.elapsed().as_secs_f64());
            }
            Job::Leave { session_id } => {
                if let Some(session) = hub.deregister(&session_id) {
                    tracing::info!(session = %session_id, identity = %session.identity, "session disconnected");
                }
            }
            Job::Snapshot { response_tx } => {
                let _ = response_tx.send(gateway.snapshot());
            }
            Job::Shutdown { done_tx } => {
                flush(&gateway);
                let _ = done_tx.send(());
                return;
            }
        }
    }

    // every sender dropped without an explicit shutdown
    flush(&gateway);
}

fn flush(gateway: &Gateway) {
    match gateway.store().flush() {
        Ok(()) => tracing::info!("state flushed"),
        Err(err) => tracing::error!(error = %err, "final flush failed"),
    }
}
