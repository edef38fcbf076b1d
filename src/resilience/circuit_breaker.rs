//! Per-endpoint circuit breaker registry.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: upstream assumed unhealthy for this endpoint, requests fail fast
//! - Half-Open: trial traffic allowed to detect recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: fail_count > fail_threshold
//! Open → Half-Open: first admission check at or after next_try_at
//! Any → Closed: a single reported success
//! Half-Open → Open: fail_count > fail_threshold (count is cumulative)
//! ```
//!
//! # Design Decisions
//! - One breaker per endpoint key (`METHOD:PATH`), not per upstream
//! - State lives in a sharded map; every read-modify-write happens under one
//!   entry guard, so concurrent failures are never under-counted
//! - Entering Half-Open does not reset `fail_count`. A failed trial reopens
//!   only because the cumulative count is already past the threshold. This is
//!   probably unintended, but it is the established behavior and is kept.
//! - Half-Open admits every arrival unless [`HalfOpenPolicy::SingleTrial`] is
//!   configured, in which case one trial is leased per cooldown window
//! - No eviction: an endpoint's record lives as long as the registry

use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::{BreakerConfig, HalfOpenPolicy};
use crate::observability::metrics;

/// Breaker status for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitStatus {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitStatus::Closed => "CLOSED",
            CircuitStatus::Open => "OPEN",
            CircuitStatus::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breaker state tracked for a single endpoint key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointState {
    pub status: CircuitStatus,
    /// Consecutive failures since the last reset to Closed.
    pub fail_count: u32,
    /// Earliest instant a trial may be admitted. Only consulted while Open
    /// (and, under the single-trial policy, while Half-Open).
    pub next_try_at: Option<Instant>,
    trial_in_flight: bool,
}

impl EndpointState {
    fn closed() -> Self {
        Self {
            status: CircuitStatus::Closed,
            fail_count: 0,
            next_try_at: None,
            trial_in_flight: false,
        }
    }
}

/// Point-in-time view of one endpoint, for the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSnapshot {
    pub endpoint: String,
    pub status: CircuitStatus,
    pub fail_count: u32,
    /// Milliseconds until `next_try_at`, when it is still in the future.
    pub retry_in_ms: Option<u64>,
}

/// Owns the breaker state of every endpoint seen by the gateway.
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    endpoints: DashMap<String, EndpointState>,
    fail_threshold: u32,
    cooldown: Duration,
    half_open: HalfOpenPolicy,
}

impl CircuitBreakerRegistry {
    /// Create a registry with the default (unbounded) half-open policy.
    pub fn new(fail_threshold: u32, cooldown: Duration) -> Self {
        Self {
            endpoints: DashMap::new(),
            fail_threshold,
            cooldown,
            half_open: HalfOpenPolicy::Unbounded,
        }
    }

    pub fn from_config(config: &BreakerConfig) -> Self {
        Self::new(config.fail_threshold, config.cooldown()).with_half_open_policy(config.half_open)
    }

    pub fn with_half_open_policy(mut self, policy: HalfOpenPolicy) -> Self {
        self.half_open = policy;
        self
    }

    pub fn fail_threshold(&self) -> u32 {
        self.fail_threshold
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn half_open_policy(&self) -> HalfOpenPolicy {
        self.half_open
    }

    /// Decide whether a request for `key` may be forwarded now.
    pub fn admit(&self, key: &str) -> bool {
        self.admit_at(key, Instant::now())
    }

    /// [`admit`](Self::admit) evaluated at an explicit instant.
    pub fn admit_at(&self, key: &str, now: Instant) -> bool {
        if let Some(mut state) = self.endpoints.get_mut(key) {
            return self.evaluate(key, &mut state, now);
        }

        let mut created = false;
        let admitted = {
            let mut state = self
                .endpoints
                .entry(key.to_string())
                .or_insert_with(|| {
                    created = true;
                    EndpointState::closed()
                });
            self.evaluate(key, &mut state, now)
        };

        if created {
            tracing::debug!(endpoint = %key, "Tracking new endpoint");
            metrics::record_tracked_endpoints(self.endpoints.len());
        }
        admitted
    }

    fn evaluate(&self, key: &str, state: &mut EndpointState, now: Instant) -> bool {
        match state.status {
            CircuitStatus::Closed => true,
            CircuitStatus::Open => {
                let ready = state.next_try_at.map_or(true, |at| now >= at);
                if !ready {
                    return false;
                }
                state.status = CircuitStatus::HalfOpen;
                state.next_try_at = Some(now + self.cooldown);
                state.trial_in_flight = true;
                tracing::info!(endpoint = %key, "OPEN -> HALF_OPEN");
                metrics::record_transition(CircuitStatus::HalfOpen.as_str());
                true
            }
            CircuitStatus::HalfOpen => match self.half_open {
                HalfOpenPolicy::Unbounded => true,
                HalfOpenPolicy::SingleTrial => {
                    // A trial whose outcome never arrived (e.g. the client hung
                    // up) gives up its lease once the window has passed.
                    let lease_active =
                        state.trial_in_flight && state.next_try_at.is_some_and(|at| now < at);
                    if lease_active {
                        return false;
                    }
                    state.trial_in_flight = true;
                    state.next_try_at = Some(now + self.cooldown);
                    true
                }
            },
        }
    }

    /// Record a failed outcome for `key`. Unknown keys are ignored.
    pub fn report_failure(&self, key: &str) {
        self.report_failure_at(key, Instant::now());
    }

    /// [`report_failure`](Self::report_failure) evaluated at an explicit instant.
    pub fn report_failure_at(&self, key: &str, now: Instant) {
        let Some(mut state) = self.endpoints.get_mut(key) else {
            tracing::debug!(endpoint = %key, "Failure reported for untracked endpoint");
            return;
        };

        state.fail_count = state.fail_count.saturating_add(1);
        state.trial_in_flight = false;
        tracing::debug!(endpoint = %key, fail_count = state.fail_count, "Failure recorded");

        if state.fail_count > self.fail_threshold {
            let previous = state.status;
            state.status = CircuitStatus::Open;
            state.next_try_at = Some(now + self.cooldown);
            if previous != CircuitStatus::Open {
                tracing::info!(
                    endpoint = %key,
                    fail_count = state.fail_count,
                    cooldown_ms = self.cooldown.as_millis() as u64,
                    "Fail threshold exceeded. {} -> OPEN",
                    previous
                );
                metrics::record_transition(CircuitStatus::Open.as_str());
            }
        }
    }

    /// Record a successful outcome for `key`, resetting it to Closed.
    pub fn report_success(&self, key: &str) {
        let mut state = self
            .endpoints
            .entry(key.to_string())
            .or_insert_with(EndpointState::closed);
        if state.status != CircuitStatus::Closed {
            tracing::info!(endpoint = %key, "{} -> CLOSED", state.status);
            metrics::record_transition(CircuitStatus::Closed.as_str());
        }
        *state = EndpointState::closed();
    }

    /// Current state of `key`, if it has been seen.
    pub fn state(&self, key: &str) -> Option<EndpointState> {
        self.endpoints.get(key).map(|state| state.clone())
    }

    /// Number of tracked endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Snapshot every tracked endpoint, sorted by key.
    pub fn snapshot(&self) -> Vec<EndpointSnapshot> {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> Vec<EndpointSnapshot> {
        let mut endpoints: Vec<EndpointSnapshot> = self
            .endpoints
            .iter()
            .map(|entry| {
                let state = entry.value();
                let retry_in_ms = match state.status {
                    CircuitStatus::Closed => None,
                    _ => state
                        .next_try_at
                        .and_then(|at| at.checked_duration_since(now))
                        .map(|left| left.as_millis() as u64),
                };
                EndpointSnapshot {
                    endpoint: entry.key().clone(),
                    status: state.status,
                    fail_count: state.fail_count,
                    retry_in_ms,
                }
            })
            .collect();
        endpoints.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        endpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const KEY: &str = "GET:/users";

    fn registry(threshold: u32) -> CircuitBreakerRegistry {
        CircuitBreakerRegistry::new(threshold, Duration::from_millis(5000))
    }

    fn trip(registry: &CircuitBreakerRegistry, key: &str, now: Instant) {
        assert!(registry.admit_at(key, now));
        for _ in 0..=registry.fail_threshold() {
            registry.report_failure_at(key, now);
        }
        assert_eq!(registry.state(key).unwrap().status, CircuitStatus::Open);
    }

    #[test]
    fn unseen_key_admits_and_creates_closed_state() {
        let registry = registry(2);
        assert!(registry.admit("GET:/unknown"));

        let state = registry.state("GET:/unknown").unwrap();
        assert_eq!(state.status, CircuitStatus::Closed);
        assert_eq!(state.fail_count, 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn threshold_must_be_exceeded_to_trip() {
        let registry = registry(3);
        let now = Instant::now();
        assert!(registry.admit_at(KEY, now));

        for _ in 0..3 {
            registry.report_failure_at(KEY, now);
        }
        assert!(registry.admit_at(KEY, now));
        assert_eq!(registry.state(KEY).unwrap().fail_count, 3);

        registry.report_failure_at(KEY, now);
        assert!(!registry.admit_at(KEY, now));
    }

    #[test]
    fn zero_threshold_trips_on_first_failure() {
        let registry = registry(0);
        let now = Instant::now();
        assert!(registry.admit_at(KEY, now));
        registry.report_failure_at(KEY, now);
        assert!(!registry.admit_at(KEY, now));
    }

    #[test]
    fn success_resets_from_every_status() {
        let registry = registry(1);
        let now = Instant::now();

        // Closed with failures
        registry.admit_at(KEY, now);
        registry.report_failure_at(KEY, now);
        registry.report_success(KEY);
        assert_eq!(registry.state(KEY).unwrap().fail_count, 0);

        // Open
        trip(&registry, KEY, now);
        registry.report_success(KEY);
        assert!(registry.admit_at(KEY, now));

        // Half-Open
        trip(&registry, KEY, now);
        assert!(registry.admit_at(KEY, now + Duration::from_millis(5000)));
        assert_eq!(registry.state(KEY).unwrap().status, CircuitStatus::HalfOpen);
        registry.report_success(KEY);

        let state = registry.state(KEY).unwrap();
        assert_eq!(state.status, CircuitStatus::Closed);
        assert_eq!(state.fail_count, 0);
        assert_eq!(state.next_try_at, None);
    }

    #[test]
    fn cooldown_is_respected() {
        let registry = registry(0);
        let tripped_at = Instant::now();
        trip(&registry, KEY, tripped_at);

        assert!(!registry.admit_at(KEY, tripped_at));
        assert!(!registry.admit_at(KEY, tripped_at + Duration::from_millis(4999)));
        assert!(registry.admit_at(KEY, tripped_at + Duration::from_millis(5000)));

        let state = registry.state(KEY).unwrap();
        assert_eq!(state.status, CircuitStatus::HalfOpen);
        assert_eq!(
            state.next_try_at,
            Some(tripped_at + Duration::from_millis(10_000))
        );
    }

    #[test]
    fn keys_are_independent() {
        let registry = registry(1);
        let now = Instant::now();
        trip(&registry, "GET:/a", now);

        assert!(!registry.admit_at("GET:/a", now));
        assert!(registry.admit_at("GET:/b", now));
        assert!(registry.admit_at("POST:/a", now));
        assert_eq!(registry.state("GET:/b").unwrap().fail_count, 0);
    }

    #[test]
    fn failure_for_unseen_key_is_ignored() {
        let registry = registry(0);
        registry.report_failure("GET:/never-seen");
        assert!(registry.state("GET:/never-seen").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn half_open_admits_every_arrival_by_default() {
        let registry = registry(0);
        let now = Instant::now();
        trip(&registry, KEY, now);

        let later = now + Duration::from_millis(5000);
        assert!(registry.admit_at(KEY, later));
        assert!(registry.admit_at(KEY, later));
        assert!(registry.admit_at(KEY, later + Duration::from_millis(1)));
    }

    #[test]
    fn failed_trial_reopens_through_cumulative_count() {
        let registry = registry(2);
        let now = Instant::now();
        trip(&registry, KEY, now);
        assert_eq!(registry.state(KEY).unwrap().fail_count, 3);

        let trial_at = now + Duration::from_millis(5000);
        assert!(registry.admit_at(KEY, trial_at));
        registry.report_failure_at(KEY, trial_at);

        let state = registry.state(KEY).unwrap();
        assert_eq!(state.status, CircuitStatus::Open);
        assert_eq!(state.fail_count, 4);
        assert_eq!(state.next_try_at, Some(trial_at + Duration::from_millis(5000)));
        assert!(!registry.admit_at(KEY, trial_at + Duration::from_millis(1)));
    }

    #[test]
    fn single_trial_policy_leases_one_probe_per_window() {
        let registry = registry(0).with_half_open_policy(HalfOpenPolicy::SingleTrial);
        let now = Instant::now();
        trip(&registry, KEY, now);

        let trial_at = now + Duration::from_millis(5000);
        assert!(registry.admit_at(KEY, trial_at));
        assert!(!registry.admit_at(KEY, trial_at + Duration::from_millis(10)));

        // Outcome never reported: lease expires with the window.
        assert!(registry.admit_at(KEY, trial_at + Duration::from_millis(5000)));
        assert!(!registry.admit_at(KEY, trial_at + Duration::from_millis(5001)));

        registry.report_success(KEY);
        assert!(registry.admit_at(KEY, trial_at + Duration::from_millis(5002)));
    }

    #[test]
    fn end_to_end_scenario() {
        let registry = registry(2);
        let t0 = Instant::now();

        assert!(registry.admit_at(KEY, t0));
        assert_eq!(registry.state(KEY).unwrap().status, CircuitStatus::Closed);

        for _ in 0..3 {
            registry.report_failure_at(KEY, t0);
        }
        let state = registry.state(KEY).unwrap();
        assert_eq!(state.status, CircuitStatus::Open);
        assert_eq!(state.next_try_at, Some(t0 + Duration::from_millis(5000)));

        assert!(!registry.admit_at(KEY, t0 + Duration::from_millis(1000)));
        assert!(registry.admit_at(KEY, t0 + Duration::from_millis(6000)));
        assert_eq!(registry.state(KEY).unwrap().status, CircuitStatus::HalfOpen);

        registry.report_success(KEY);
        let state = registry.state(KEY).unwrap();
        assert_eq!(state.status, CircuitStatus::Closed);
        assert_eq!(state.fail_count, 0);
        assert!(registry.admit_at(KEY, t0 + Duration::from_millis(6001)));
    }

    #[test]
    fn concurrent_failures_are_not_lost() {
        let registry = Arc::new(registry(1_000_000));
        registry.admit(KEY);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        registry.report_failure(KEY);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.state(KEY).unwrap().fail_count, 4000);
    }

    #[test]
    fn snapshot_reports_sorted_endpoints() {
        let registry = registry(0);
        let now = Instant::now();
        registry.admit_at("GET:/b", now);
        trip(&registry, "GET:/a", now);

        let snapshot = registry.snapshot_at(now + Duration::from_millis(1000));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].endpoint, "GET:/a");
        assert_eq!(snapshot[0].status, CircuitStatus::Open);
        assert_eq!(snapshot[0].retry_in_ms, Some(4000));
        assert_eq!(snapshot[1].endpoint, "GET:/b");
        assert_eq!(snapshot[1].retry_in_ms, None);

        let json = serde_json::to_value(&snapshot[0]).unwrap();
        assert_eq!(json["status"], "OPEN");
    }
}
