//! Authorization and abuse-protection collaborators
//!
//! The core never decides who may author content; it asks these traits and
//! converts a deny into `Unauthorized` or `Denied` at the mutation boundary.
//! Production deployments plug in their identity provider and bot/rate-limit
//! middleware; tests use the permissive and denying impls below.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// The acting principal, as established by the external identity collaborator.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Authorization collaborator: allow/deny per principal and course scope.
pub trait Authorizer: Send + Sync {
    /// May the principal mutate content under this course?
    fn allow(&self, principal: &Principal, course_id: &str) -> bool;

    /// Elevated principals bypass the per-course ownership check.
    fn is_elevated(&self, _principal: &Principal) -> bool {
        false
    }
}

/// Grants everything; for tests and single-author deployments.
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn allow(&self, _principal: &Principal, _course_id: &str) -> bool {
        true
    }
}

/// Denies everything; for tests.
pub struct DenyAll;

impl Authorizer for DenyAll {
    fn allow(&self, _principal: &Principal, _course_id: &str) -> bool {
        false
    }
}

/// Verdict from the abuse-protection collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbuseDecision {
    Allow,
    RateLimited,
    SuspectedBot,
}

/// Abuse-protection collaborator: may veto a request by principal fingerprint
/// before it reaches the core.
pub trait AbuseGuard: Send + Sync {
    fn check(&self, fingerprint: &str) -> AbuseDecision;
}

/// No protection; for tests and trusted environments.
pub struct NoProtection;

impl AbuseGuard for NoProtection {
    fn check(&self, _fingerprint: &str) -> AbuseDecision {
        AbuseDecision::Allow
    }
}

/// Always denies as rate-limited; for tests.
pub struct AlwaysRateLimited;

impl AbuseGuard for AlwaysRateLimited {
    fn check(&self, _fingerprint: &str) -> AbuseDecision {
        AbuseDecision::RateLimited
    }
}

/// Fixed-window rate limiter keyed by fingerprint.
///
/// In-process stand-in for the hosted protection service: at most `max`
/// requests per `window` per fingerprint.
pub struct FixedWindowLimiter {
    window: Duration,
    max: u32,
    hits: Mutex<HashMap<String, (Instant, u32)>>,
}

impl FixedWindowLimiter {
    pub fn new(window: Duration, max: u32) -> Self {
        Self {
            window,
            max,
            hits: Mutex::new(HashMap::new()),
        }
    }
}

impl AbuseGuard for FixedWindowLimiter {
    fn check(&self, fingerprint: &str) -> AbuseDecision {
        let mut hits = match self.hits.lock() {
            Ok(guard) => guard,
            // A poisoned counter map fails open rather than blocking authors.
            Err(poisoned) => poisoned.into_inner(),
        };

        let now = Instant::now();
        let entry = hits.entry(fingerprint.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }
        entry.1 += 1;

        if entry.1 > self.max {
            AbuseDecision::RateLimited
        } else {
            AbuseDecision::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_window_allows_up_to_max() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(60), 5);
        for _ in 0..5 {
            assert_eq!(limiter.check("user-1"), AbuseDecision::Allow);
        }
        assert_eq!(limiter.check("user-1"), AbuseDecision::RateLimited);
    }

    #[test]
    fn fixed_window_counts_per_fingerprint() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(60), 1);
        assert_eq!(limiter.check("user-1"), AbuseDecision::Allow);
        assert_eq!(limiter.check("user-2"), AbuseDecision::Allow);
        assert_eq!(limiter.check("user-1"), AbuseDecision::RateLimited);
    }

    #[test]
    fn fixed_window_resets_after_window() {
        let limiter = FixedWindowLimiter::new(Duration::from_millis(0), 1);
        assert_eq!(limiter.check("user-1"), AbuseDecision::Allow);
        // Zero-length window: the next check starts a fresh window.
        assert_eq!(limiter.check("user-1"), AbuseDecision::Allow);
    }
}
