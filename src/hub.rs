//! Registry of live sessions and fan-out of encoded events.
//!
//! Events are serialized once and shared between sessions as `Arc<str>`.
//! Each session has a bounded queue. A session whose writer is gone, or whose
//! queue is full because the client stopped reading, misses the event;
//! delivery to the rest goes on.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::metrics::{BROADCAST_DROPPED, SESSIONS_ACTIVE};
use crate::models::ServerEvent;

pub type Frame = Arc<str>;

/// What the hub keeps per connected session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub identity: String,
    pub tx: mpsc::Sender<Frame>,
}

#[derive(Default)]
pub struct SessionHub {
    sessions: DashMap<Uuid, SessionHandle>,
}

pub fn encode(event: &ServerEvent) -> Option<Frame> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Arc::from(json)),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode event");
            None
        }
    }
}

// Non-blocking push; a full or closed queue only costs this session the frame
fn push(session: &SessionHandle, frame: Frame) -> bool {
    match session.tx.try_send(frame) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            BROADCAST_DROPPED.inc();
            tracing::warn!(session = %session.id, "session queue full, dropping event");
            false
        }
        Err(TrySendError::Closed(_)) => {
            BROADCAST_DROPPED.inc();
            tracing::debug!(session = %session.id, "session gone, skipping");
            false
        }
    }
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session: SessionHandle) {
        self.sessions.insert(session.id, session);
        SESSIONS_ACTIVE.inc();
    }

    pub fn deregister(&self, id: &Uuid) -> Option<SessionHandle> {
        let removed = self.sessions.remove(id).map(|(_, s)| s);
        if removed.is_some() {
            SESSIONS_ACTIVE.dec();
        }
        removed
    }

    /// Send to one session. Returns false if it is unknown or gone.
    pub fn send_to(&self, id: &Uuid, event: &ServerEvent) -> bool {
        let Some(session) = self.sessions.get(id) else {
            return false;
        };
        let Some(frame) = encode(event) else {
            return false;
        };
        push(&session, frame)
    }

    /// Send to every registered session. Returns how many accepted it.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        let Some(frame) = encode(event) else {
            return 0;
        };

        let mut delivered = 0;
        for session in self.sessions.iter() {
            if push(&session, Arc::clone(&frame)) {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(identity: &str) -> (SessionHandle, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(8);
        let handle = SessionHandle {
            id: Uuid::new_v4(),
            identity: identity.to_string(),
            tx,
        };
        (handle, rx)
    }

    #[test]
    fn broadcast_reaches_every_session_with_identical_frames() {
        let hub = SessionHub::new();
        let (a, mut rx_a) = session("a");
        let (b, mut rx_b) = session("b");
        hub.register(a);
        hub.register(b);

        assert_eq!(hub.broadcast(&ServerEvent::UpdateHearts(5)), 2);

        let fa = rx_a.try_recv().unwrap();
        let fb = rx_b.try_recv().unwrap();
        assert_eq!(fa, fb);
        assert_eq!(&*fa, r#"{"event":"update-hearts","data":5}"#);
    }

    #[test]
    fn closed_session_does_not_block_the_others() {
        let hub = SessionHub::new();
        let (a, rx_a) = session("a");
        let (b, mut rx_b) = session("b");
        hub.register(a);
        hub.register(b);
        drop(rx_a);

        assert_eq!(hub.broadcast(&ServerEvent::UpdateHearts(1)), 1);
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn stalled_session_drops_frames_without_blocking_others() {
        let hub = SessionHub::new();
        let (tx, mut slow_rx) = mpsc::channel(2);
        let slow = SessionHandle {
            id: Uuid::new_v4(),
            identity: "slow".into(),
            tx,
        };
        let (fast, mut fast_rx) = session("fast");
        hub.register(slow);
        hub.register(fast);

        let dropped_before = BROADCAST_DROPPED.get();
        for count in 1..=5 {
            hub.broadcast(&ServerEvent::UpdateHearts(count));
        }

        let mut fast_seen = 0;
        while fast_rx.try_recv().is_ok() {
            fast_seen += 1;
        }
        assert_eq!(fast_seen, 5);

        // the slow queue kept the first two and missed the rest
        assert_eq!(&*slow_rx.try_recv().unwrap(), r#"{"event":"update-hearts","data":1}"#);
        assert_eq!(&*slow_rx.try_recv().unwrap(), r#"{"event":"update-hearts","data":2}"#);
        assert!(slow_rx.try_recv().is_err());
        assert!(BROADCAST_DROPPED.get() >= dropped_before + 3);
    }

    #[test]
    fn send_to_targets_only_one_session() {
        let hub = SessionHub::new();
        let (a, mut rx_a) = session("a");
        let (b, mut rx_b) = session("b");
        let a_id = a.id;
        hub.register(a);
        hub.register(b);

        assert!(hub.send_to(&a_id, &ServerEvent::WishError("nope".into())));
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn deregistered_sessions_stop_receiving() {
        let hub = SessionHub::new();
        let (a, mut rx_a) = session("a");
        let a_id = a.id;
        hub.register(a);

        assert!(hub.deregister(&a_id).is_some());
        assert!(hub.deregister(&a_id).is_none());
        assert!(hub.is_empty());
        assert_eq!(hub.broadcast(&ServerEvent::UpdateHearts(2)), 0);
        assert!(rx_a.try_recv().is_err());
    }
}
