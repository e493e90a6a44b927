//! Admission control for incoming verification requests
//!
//! Three gates, evaluated in order against shared in-memory state:
//! 1. Per-requester hard cooldown
//! 2. Per-requester token bucket (burst limit)
//! 3. Per-group daily quota
//!
//! State changes only when every gate passes. A rejected request leaves
//! the cooldown, the bucket and the group counter untouched.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use claimguard_common::config::RateLimitConfig;
use tracing::debug;

/// Group counters are cleared once this much time passed since the last reset
const GROUP_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Expired cooldowns and refilled buckets are swept once their map grows
/// past this size
const PRUNE_THRESHOLD: usize = 10_000;

/// Why a request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    CooldownActive,
    BurstLimit,
    DailyLimit,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::CooldownActive => "Per-user cooldown is active.",
            Rejection::BurstLimit => "Per-user burst limit reached. Please wait a moment.",
            Rejection::DailyLimit => "Daily fact-check limit for this group has been reached.",
        };
        f.write_str(reason)
    }
}

impl std::error::Error for Rejection {}

/// Decision returned by [`AdmissionController::check`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    /// Empty when allowed
    pub reason: String,
    pub rejection: Option<Rejection>,
}

impl Admission {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: String::new(),
            rejection: None,
        }
    }

    fn reject(rejection: Rejection) -> Self {
        Self {
            allowed: false,
            reason: rejection.to_string(),
            rejection: Some(rejection),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    updated_at: Instant,
}

#[derive(Debug)]
struct RateState {
    /// requester -> time the cooldown ends
    cooldowns: HashMap<u64, Instant>,
    buckets: HashMap<u64, Bucket>,
    group_usage: HashMap<u64, u32>,
    group_reset_at: Instant,
}

/// Rate limiter shared by every submission path
#[derive(Debug)]
pub struct AdmissionController {
    config: RateLimitConfig,
    state: Mutex<RateState>,
}

impl AdmissionController {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_start(config, Instant::now())
    }

    /// Controller whose group window starts at `start`
    pub fn with_start(config: RateLimitConfig, start: Instant) -> Self {
        Self {
            config,
            state: Mutex::new(RateState {
                cooldowns: HashMap::new(),
                buckets: HashMap::new(),
                group_usage: HashMap::new(),
                group_reset_at: start,
            }),
        }
    }

    /// Decide whether a request may proceed, committing usage if so
    pub fn check(&self, requester_id: u64, group_id: Option<u64>) -> Admission {
        self.check_at(requester_id, group_id, Instant::now())
    }

    /// [`check`](Self::check) against an explicit clock
    pub fn check_at(&self, requester_id: u64, group_id: Option<u64>, now: Instant) -> Admission {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if now.saturating_duration_since(state.group_reset_at) >= GROUP_WINDOW {
            debug!(groups = state.group_usage.len(), "Resetting daily group usage");
            state.group_usage.clear();
            state.group_reset_at = now;
        }

        if let Some(until) = state.cooldowns.get(&requester_id) {
            if now < *until {
                return Admission::reject(Rejection::CooldownActive);
            }
        }

        let capacity = f64::from(self.config.bucket_capacity);
        let bucket = state.buckets.get(&requester_id).copied().unwrap_or(Bucket {
            tokens: capacity,
            updated_at: now,
        });
        let elapsed = now.saturating_duration_since(bucket.updated_at).as_secs_f64();
        let tokens = (bucket.tokens + elapsed * self.config.bucket_refill_rate).min(capacity);
        if tokens < 1.0 {
            return Admission::reject(Rejection::BurstLimit);
        }

        if let Some(group) = group_id {
            let used = state.group_usage.get(&group).copied().unwrap_or(0);
            if used >= self.config.daily_group_limit {
                return Admission::reject(Rejection::DailyLimit);
            }
        }

        if state.buckets.len() >= PRUNE_THRESHOLD {
            // A bucket refilled to capacity is the same as no entry
            let refill_rate = self.config.bucket_refill_rate;
            state.buckets.retain(|_, bucket| {
                let elapsed = now.saturating_duration_since(bucket.updated_at).as_secs_f64();
                bucket.tokens + elapsed * refill_rate < capacity
            });
        }
        state.buckets.insert(
            requester_id,
            Bucket {
                tokens: tokens - 1.0,
                updated_at: now,
            },
        );

        if self.config.user_cooldown_secs > 0 {
            if state.cooldowns.len() >= PRUNE_THRESHOLD {
                state.cooldowns.retain(|_, until| *until > now);
            }
            let until = now + Duration::from_secs(self.config.user_cooldown_secs);
            state.cooldowns.insert(requester_id, until);
        }

        if let Some(group) = group_id {
            *state.group_usage.entry(group).or_insert(0) += 1;
        }

        Admission::allow()
    }

    /// Requests admitted for a group in the current window
    pub fn group_usage(&self, group_id: u64) -> u32 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.group_usage.get(&group_id).copied().unwrap_or(0)
    }

    /// Tokens left in a requester's bucket as of the last commit
    pub fn remaining_tokens(&self, requester_id: u64) -> f64 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .buckets
            .get(&requester_id)
            .map(|bucket| bucket.tokens)
            .unwrap_or_else(|| f64::from(self.config.bucket_capacity))
    }
}
