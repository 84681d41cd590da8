use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::error::Rejection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Wish,
    Heart,
}

// Cooldowns and quota, built from the CLI flags
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub wish_cooldown: Duration,
    pub heart_cooldown: Duration,
    pub max_wishes_per_window: u32,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            wish_cooldown: Duration::from_secs(10),
            heart_cooldown: Duration::from_secs(2),
            max_wishes_per_window: 10,
            window: Duration::from_secs(3600),
        }
    }
}

// Activity entry - tracks actions per IP/session identity
#[derive(Debug, Clone)]
pub struct ClientActivity {
    pub last_wish_at: Option<Instant>,
    pub last_heart_at: Option<Instant>,
    pub wishes_this_window: u32,
    pub window_start: Instant,
}

impl ClientActivity {
    fn new(now: Instant) -> Self {
        Self {
            last_wish_at: None,
            last_heart_at: None,
            wishes_this_window: 0,
            window_start: now,
        }
    }
}

fn cooling_down(last: Option<Instant>, now: Instant, cooldown: Duration) -> bool {
    last.is_some_and(|at| now.saturating_duration_since(at) < cooldown)
}

// Entries live for the whole process; nothing evicts them.
pub struct RateLimiter {
    policy: RateLimitPolicy,
    activity: DashMap<String, ClientActivity>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            activity: DashMap::new(),
        }
    }

    /// Checks `kind` for `identity` at `now` and records it when allowed.
    /// A denied action leaves the entry untouched (apart from a window reset).
    pub fn check_and_record(
        &self,
        identity: &str,
        kind: ActionKind,
        now: Instant,
    ) -> Result<(), Rejection> {
        let mut entry = self
            .activity
            .entry(identity.to_string())
            .or_insert_with(|| ClientActivity::new(now));

        // window expired..? reset it
        if now.saturating_duration_since(entry.window_start) > self.policy.window {
            entry.wishes_this_window = 0;
            entry.window_start = now;
        }

        match kind {
            ActionKind::Wish => {
                if cooling_down(entry.last_wish_at, now, self.policy.wish_cooldown) {
                    return Err(Rejection::WishCooldown);
                }
                if entry.wishes_this_window >= self.policy.max_wishes_per_window {
                    return Err(Rejection::WishQuota);
                }
                entry.last_wish_at = Some(now);
                entry.wishes_this_window += 1;
            }
            ActionKind::Heart => {
                if cooling_down(entry.last_heart_at, now, self.policy.heart_cooldown) {
                    return Err(Rejection::HeartCooldown);
                }
                entry.last_heart_at = Some(now);
            }
        }
        Ok(())
    }

    pub fn tracked_identities(&self) -> usize {
        self.activity.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn second_wish_inside_cooldown_is_denied() {
        let limiter = RateLimiter::new(RateLimitPolicy::default());
        let t0 = Instant::now();

        assert!(limiter.check_and_record("1.2.3.4", ActionKind::Wish, t0).is_ok());
        assert_eq!(
            limiter.check_and_record("1.2.3.4", ActionKind::Wish, t0 + secs(9)),
            Err(Rejection::WishCooldown)
        );
        assert!(
            limiter
                .check_and_record("1.2.3.4", ActionKind::Wish, t0 + secs(10))
                .is_ok()
        );
    }

    #[test]
    fn eleventh_wish_in_an_hour_hits_the_quota() {
        let limiter = RateLimiter::new(RateLimitPolicy::default());
        let t0 = Instant::now();

        for i in 0..10 {
            let at = t0 + secs(11 * i);
            assert!(limiter.check_and_record("ip", ActionKind::Wish, at).is_ok(), "wish {i}");
        }
        assert_eq!(
            limiter.check_and_record("ip", ActionKind::Wish, t0 + secs(200)),
            Err(Rejection::WishQuota)
        );
    }

    #[test]
    fn quota_resets_after_the_window() {
        let limiter = RateLimiter::new(RateLimitPolicy::default());
        let t0 = Instant::now();

        for i in 0..10 {
            limiter
                .check_and_record("ip", ActionKind::Wish, t0 + secs(11 * i))
                .unwrap();
        }
        // exactly one hour is not yet "exceeded"
        assert_eq!(
            limiter.check_and_record("ip", ActionKind::Wish, t0 + secs(3600)),
            Err(Rejection::WishQuota)
        );
        assert!(
            limiter
                .check_and_record("ip", ActionKind::Wish, t0 + secs(3601))
                .is_ok()
        );
    }

    #[test]
    fn hearts_have_their_own_cooldown() {
        let limiter = RateLimiter::new(RateLimitPolicy::default());
        let t0 = Instant::now();

        assert!(limiter.check_and_record("ip", ActionKind::Heart, t0).is_ok());
        assert_eq!(
            limiter.check_and_record("ip", ActionKind::Heart, t0 + Duration::from_millis(1999)),
            Err(Rejection::HeartCooldown)
        );
        assert!(limiter.check_and_record("ip", ActionKind::Heart, t0 + secs(2)).is_ok());

        // a heart does not start the wish cooldown
        assert!(limiter.check_and_record("ip", ActionKind::Wish, t0 + secs(2)).is_ok());
    }

    #[test]
    fn identities_are_independent() {
        let limiter = RateLimiter::new(RateLimitPolicy::default());
        let t0 = Instant::now();

        assert!(limiter.check_and_record("a", ActionKind::Wish, t0).is_ok());
        assert!(limiter.check_and_record("b", ActionKind::Wish, t0).is_ok());
        assert_eq!(limiter.tracked_identities(), 2);
    }

    #[test]
    fn denied_wish_does_not_count_toward_quota() {
        let policy = RateLimitPolicy {
            max_wishes_per_window: 2,
            ..RateLimitPolicy::default()
        };
        let limiter = RateLimiter::new(policy);
        let t0 = Instant::now();

        limiter.check_and_record("ip", ActionKind::Wish, t0).unwrap();
        for i in 1..5 {
            let _ = limiter.check_and_record("ip", ActionKind::Wish, t0 + secs(i));
        }
        assert!(limiter.check_and_record("ip", ActionKind::Wish, t0 + secs(20)).is_ok());
        assert_eq!(
            limiter.check_and_record("ip", ActionKind::Wish, t0 + secs(40)),
            Err(Rejection::WishQuota)
        );
    }
}
