use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use warden_frame::RateLimitSpec;

/// Calls counted in the current window for one `(agent, limit)` key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitWindow {
    pub count: u32,
    pub window_start: DateTime<Utc>,
    pub window_seconds: i64,
}

impl RateLimitWindow {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        now - self.window_start >= Duration::seconds(self.window_seconds)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitOutcome {
    /// Call counted; `count` calls now recorded in the window.
    Permitted { count: u32 },
    /// Window already holds `limit` calls.
    Exceeded { limit: u32, remaining_seconds: i64 },
}

/// Fixed windows keyed by `(agent_id, limit spec text)`.
#[derive(Clone, Debug, Default)]
pub struct RateLimiter {
    windows: HashMap<(String, String), RateLimitWindow>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one call at `now`. A new window opens when none exists or the
    /// previous one has elapsed. Opening a window for a new key first drops
    /// every elapsed window, so idle agents do not accumulate.
    pub fn check_and_record(
        &mut self,
        agent_id: &str,
        spec: &RateLimitSpec,
        now: DateTime<Utc>,
    ) -> RateLimitOutcome {
        let key = (agent_id.to_string(), spec.raw.clone());
        if !self.windows.contains_key(&key) {
            self.prune_expired(now);
        }

        let window_len = Duration::seconds(spec.window_seconds());
        let window = self.windows.entry(key).or_insert_with(|| RateLimitWindow {
            count: 0,
            window_start: now,
            window_seconds: spec.window_seconds(),
        });

        if window.expired(now) {
            window.count = 0;
            window.window_start = now;
        }

        if window.count >= spec.count {
            let elapsed = now - window.window_start;
            let remaining = (window_len - elapsed).num_seconds().max(1);
            return RateLimitOutcome::Exceeded {
                limit: spec.count,
                remaining_seconds: remaining,
            };
        }

        window.count += 1;
        RateLimitOutcome::Permitted {
            count: window.count,
        }
    }

    pub fn window(&self, agent_id: &str, spec: &RateLimitSpec) -> Option<&RateLimitWindow> {
        self.windows.get(&(agent_id.to_string(), spec.raw.clone()))
    }

    /// Drop windows that have elapsed at `now`; returns how many went.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| !w.expired(now));
        before - self.windows.len()
    }

    pub fn reset(&mut self) {
        self.windows.clear();
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn permits_up_to_count_then_blocks() {
        let mut limiter = RateLimiter::new();
        let spec = RateLimitSpec::parse("2/min").unwrap();

        assert_eq!(
            limiter.check_and_record("a", &spec, t0()),
            RateLimitOutcome::Permitted { count: 1 }
        );
        assert_eq!(
            limiter.check_and_record("a", &spec, t0() + Duration::seconds(5)),
            RateLimitOutcome::Permitted { count: 2 }
        );
        assert_eq!(
            limiter.check_and_record("a", &spec, t0() + Duration::seconds(20)),
            RateLimitOutcome::Exceeded {
                limit: 2,
                remaining_seconds: 40
            }
        );
    }

    #[test]
    fn window_resets_after_elapsing() {
        let mut limiter = RateLimiter::new();
        let spec = RateLimitSpec::parse("1/sec").unwrap();

        limiter.check_and_record("a", &spec, t0());
        assert!(matches!(
            limiter.check_and_record("a", &spec, t0()),
            RateLimitOutcome::Exceeded { .. }
        ));
        assert_eq!(
            limiter.check_and_record("a", &spec, t0() + Duration::seconds(1)),
            RateLimitOutcome::Permitted { count: 1 }
        );
    }

    #[test]
    fn agents_have_independent_windows() {
        let mut limiter = RateLimiter::new();
        let spec = RateLimitSpec::parse("1/hour").unwrap();

        limiter.check_and_record("a", &spec, t0());
        assert_eq!(
            limiter.check_and_record("b", &spec, t0()),
            RateLimitOutcome::Permitted { count: 1 }
        );
        assert_eq!(limiter.len(), 2);
        assert_eq!(limiter.window("a", &spec).unwrap().count, 1);
    }

    #[test]
    fn idle_windows_are_dropped_when_a_new_key_arrives() {
        let mut limiter = RateLimiter::new();
        let per_sec = RateLimitSpec::parse("5/sec").unwrap();
        let per_hour = RateLimitSpec::parse("5/hour").unwrap();

        limiter.check_and_record("idle", &per_sec, t0());
        limiter.check_and_record("steady", &per_hour, t0());
        assert_eq!(limiter.len(), 2);

        limiter.check_and_record("newcomer", &per_sec, t0() + Duration::seconds(10));
        assert_eq!(limiter.len(), 2);
        assert!(limiter.window("idle", &per_sec).is_none());
        assert_eq!(limiter.window("steady", &per_hour).unwrap().count, 1);
    }

    #[test]
    fn prune_expired_reports_removed_windows() {
        let mut limiter = RateLimiter::new();
        let spec = RateLimitSpec::parse("1/min").unwrap();
        limiter.check_and_record("a", &spec, t0());
        limiter.check_and_record("b", &spec, t0() + Duration::seconds(30));

        assert_eq!(limiter.prune_expired(t0() + Duration::seconds(60)), 1);
        assert!(limiter.window("b", &spec).is_some());
    }
}
