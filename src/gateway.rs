//! Command dispatch: rate limit, filter, mutate, and describe what to send.
//!
//! `Gateway` owns all shared state and is driven by exactly one worker, so a
//! command's validate → mutate → persist sequence never interleaves with
//! another command.

use std::time::Instant;

use crate::error::Rejection;
use crate::filter::ContentFilter;
use crate::metrics::{HEARTS_TOTAL, REJECTIONS_TOTAL, WISHES_TOTAL};
use crate::models::{ClientCommand, Outcome, ServerEvent, Snapshot, WishSubmission};
use crate::rate_limit::{ActionKind, RateLimiter};
use crate::store::GuestbookStore;

pub struct Gateway {
    store: GuestbookStore,
    limiter: RateLimiter,
    filter: ContentFilter,
}

impl Gateway {
    pub fn new(store: GuestbookStore, limiter: RateLimiter, filter: ContentFilter) -> Self {
        Self {
            store,
            limiter,
            filter,
        }
    }

    pub fn handle(&mut self, identity: &str, command: ClientCommand, now: Instant) -> Outcome {
        match command {
            ClientCommand::NewWish(submission) => self.submit_wish(identity, submission, now),
            ClientCommand::AddHeart => self.add_heart(identity, now),
        }
    }

    fn submit_wish(&mut self, identity: &str, submission: WishSubmission, now: Instant) -> Outcome {
        let accepted = self
            .limiter
            .check_and_record(identity, ActionKind::Wish, now)
            .and_then(|()| {
                let text = submission.wish.trim();
                self.filter.check(text).map(|()| text.to_string())
            });

        match accepted {
            Ok(text) => {
                let wish = self.store.append_wish(submission.display_name(), text);
                WISHES_TOTAL.inc();
                tracing::info!(id = %wish.id, name = %wish.display_name, identity, "wish added");
                Outcome::broadcast(ServerEvent::UpdateWishes(wish))
            }
            Err(rejection) => {
                reject(identity, rejection);
                Outcome::reply(ServerEvent::WishError(rejection.to_string()))
            }
        }
    }

    fn add_heart(&mut self, identity: &str, now: Instant) -> Outcome {
        if let Err(rejection) = self
            .limiter
            .check_and_record(identity, ActionKind::Heart, now)
        {
            reject(identity, rejection);
            return Outcome::reply(ServerEvent::HeartError(rejection.to_string()));
        }

        let count = self.store.increment_heart();
        HEARTS_TOTAL.inc();
        tracing::info!(total = count, identity, "heart added");
        Outcome::broadcast(ServerEvent::UpdateHearts(count))
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn store(&self) -> &GuestbookStore {
        &self.store
    }
}

fn reject(identity: &str, rejection: Rejection) {
    REJECTIONS_TOTAL
        .with_label_values(&[rejection.reason()])
        .inc();
    tracing::debug!(
        identity,
        reason = rejection.reason(),
        rate_limited = rejection.is_rate_limit(),
        "command rejected"
    );
}
