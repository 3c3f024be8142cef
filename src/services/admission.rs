//! Admission control for rate-limited routes.
//!
//! Two caller classes share one decision:
//! - authenticated callers consume a persisted per-user counter
//!   (`requestCount`, cap 10) through the store's conditional increment
//! - anonymous callers consume an in-memory per-IP counter (cap 3) that
//!   lives for the lifetime of the process
//!
//! Rejected calls never consume quota.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::auth::{CallerIdentity, ClientIp};
use crate::db::{QuotaDecision, UserStore};
use crate::error::ApiError;

/// Quota for authenticated callers
pub const USER_MAX_REQUESTS: i32 = 10;

/// Quota for anonymous callers, per source address
pub const GUEST_MAX_REQUESTS: u32 = 3;

// =============================================================================
// GuestCounter
// =============================================================================

/// Per-IP count of anonymous calls. Never decremented, lost on restart.
#[derive(Default)]
pub struct GuestCounter {
    counts: Mutex<HashMap<String, u32>>,
}

impl GuestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `ip` against `limit` and record the call if allowed.
    /// The first call from an unseen address is always admitted.
    pub fn check_and_record(&self, ip: &str, limit: u32) -> bool {
        let mut counts = self.counts.lock();
        match counts.get_mut(ip) {
            None => {
                counts.insert(ip.to_string(), 1);
                true
            }
            Some(count) if *count >= limit => false,
            Some(count) => {
                *count += 1;
                true
            }
        }
    }

    /// Calls recorded so far for `ip`
    pub fn count(&self, ip: &str) -> u32 {
        self.counts.lock().get(ip).copied().unwrap_or(0)
    }
}

// =============================================================================
// AdmissionController
// =============================================================================

pub struct AdmissionController {
    store: Arc<dyn UserStore>,
    guests: Arc<GuestCounter>,
    user_limit: i32,
    guest_limit: u32,
    reset_period: Option<Duration>,
}

impl AdmissionController {
    pub fn new(store: Arc<dyn UserStore>, guests: Arc<GuestCounter>, reset_period: Option<Duration>) -> Self {
        Self {
            store,
            guests,
            user_limit: USER_MAX_REQUESTS,
            guest_limit: GUEST_MAX_REQUESTS,
            reset_period,
        }
    }

    /// Admit or reject one call, recording consumption on admission.
    pub async fn admit(&self, caller: &CallerIdentity, ip: &ClientIp) -> Result<(), ApiError> {
        match caller {
            CallerIdentity::Authenticated(user_id) => {
                match self
                    .store
                    .consume_quota(*user_id, self.user_limit, self.reset_period)
                    .await?
                {
                    QuotaDecision::Admitted { used } => {
                        debug!(user_id = %user_id, used, limit = self.user_limit, "Admitted authenticated call");
                        Ok(())
                    }
                    QuotaDecision::Exhausted { used } => {
                        warn!(user_id = %user_id, used, "Request quota exceeded for user");
                        Err(ApiError::QuotaExceeded("request limit exceeded".to_string()))
                    }
                }
            }
            CallerIdentity::Anonymous => {
                if self.guests.check_and_record(&ip.0, self.guest_limit) {
                    debug!(ip = %ip.0, "Admitted anonymous call");
                    Ok(())
                } else {
                    warn!(ip = %ip.0, used = self.guests.count(&ip.0), "Request quota exceeded for guest");
                    Err(ApiError::QuotaExceeded(
                        "request limit exceeded, log in for a larger quota".to_string(),
                    ))
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryUserStore;
    use uuid::Uuid;

    fn controller(store: Arc<dyn UserStore>) -> AdmissionController {
        AdmissionController::new(store, Arc::new(GuestCounter::new()), None)
    }

    fn ip(addr: &str) -> ClientIp {
        ClientIp(addr.to_string())
    }

    #[test]
    fn guest_counter_allows_three_then_blocks() {
        let counter = GuestCounter::new();
        assert!(counter.check_and_record("10.0.0.1", 3));
        assert!(counter.check_and_record("10.0.0.1", 3));
        assert!(counter.check_and_record("10.0.0.1", 3));
        assert!(!counter.check_and_record("10.0.0.1", 3));
        assert_eq!(counter.count("10.0.0.1"), 3, "rejection must not increment");
    }

    #[test]
    fn guest_counter_keys_are_independent() {
        let counter = GuestCounter::new();
        counter.check_and_record("10.0.0.1", 1);
        assert!(!counter.check_and_record("10.0.0.1", 1));
        assert!(counter.check_and_record("10.0.0.2", 1));
    }

    #[test]
    fn guest_counter_first_call_admitted_without_check() {
        let counter = GuestCounter::new();
        assert!(counter.check_and_record("10.0.0.1", 0));
        assert!(!counter.check_and_record("10.0.0.1", 0));
    }

    #[tokio::test]
    async fn anonymous_fourth_call_is_rejected() {
        let admission = controller(Arc::new(MemoryUserStore::new()));
        for _ in 0..3 {
            admission.admit(&CallerIdentity::Anonymous, &ip("192.168.1.7")).await.unwrap();
        }
        let err = admission
            .admit(&CallerIdentity::Anonymous, &ip("192.168.1.7"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::QuotaExceeded(_)));

        // another address still has its own budget
        admission.admit(&CallerIdentity::Anonymous, &ip("192.168.1.8")).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_guest_calls_cannot_race_past_cap() {
        let admission = Arc::new(controller(Arc::new(MemoryUserStore::new())));
        let handles: Vec<_> = (0..20)
            .map(|_| {
                let admission = Arc::clone(&admission);
                tokio::spawn(async move {
                    admission.admit(&CallerIdentity::Anonymous, &ip("172.16.0.1")).await.is_ok()
                })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, GUEST_MAX_REQUESTS);
    }

    #[tokio::test]
    async fn authenticated_eleventh_call_is_rejected() {
        let store = Arc::new(MemoryUserStore::new());
        let user = store.create_user("alice", "hash").await.unwrap();
        let admission = controller(store.clone());
        let caller = CallerIdentity::Authenticated(user.id);

        for _ in 0..10 {
            admission.admit(&caller, &ip("127.0.0.1")).await.unwrap();
        }
        let err = admission.admit(&caller, &ip("127.0.0.1")).await.unwrap_err();
        assert!(matches!(err, ApiError::QuotaExceeded(_)));

        let stored = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.request_count, USER_MAX_REQUESTS);
    }

    #[tokio::test]
    async fn authenticated_calls_do_not_touch_guest_counter() {
        let store = Arc::new(MemoryUserStore::new());
        let user = store.create_user("alice", "hash").await.unwrap();
        let guests = Arc::new(GuestCounter::new());
        let admission = AdmissionController::new(store, guests.clone(), None);

        for _ in 0..5 {
            admission
                .admit(&CallerIdentity::Authenticated(user.id), &ip("127.0.0.1"))
                .await
                .unwrap();
        }
        assert_eq!(guests.count("127.0.0.1"), 0);
    }

    #[tokio::test]
    async fn reset_period_restores_quota() {
        let store = Arc::new(MemoryUserStore::new());
        let user = store.create_user("alice", "hash").await.unwrap();
        let caller = CallerIdentity::Authenticated(user.id);

        let lifetime = controller(store.clone());
        for _ in 0..10 {
            lifetime.admit(&caller, &ip("127.0.0.1")).await.unwrap();
        }
        assert!(lifetime.admit(&caller, &ip("127.0.0.1")).await.is_err());

        let periodic = AdmissionController::new(store, Arc::new(GuestCounter::new()), Some(Duration::ZERO));
        periodic.admit(&caller, &ip("127.0.0.1")).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let admission = controller(Arc::new(MemoryUserStore::new()));
        let err = admission
            .admit(&CallerIdentity::Authenticated(Uuid::new_v4()), &ip("127.0.0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
