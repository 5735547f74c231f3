//! Rate limiting primitives for the login flow.
//!
//! The client identity comes from forwarding headers at the HTTP layer;
//! requests with no identity share a single bucket. Budgets are per fixed
//! one-minute window.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    General,
    Login,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check(&self, client: Option<&str>, action: RateLimitAction) -> RateLimitDecision;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check(&self, _client: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

#[derive(Debug)]
struct WindowState {
    count: u32,
    started_at: Instant,
}

/// Fixed-window counter per `(action, client)` pair.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    general_budget: u32,
    login_budget: u32,
    windows: Mutex<HashMap<(RateLimitAction, String), WindowState>>,
}

impl FixedWindowLimiter {
    #[must_use]
    pub fn new(general_budget: u32, login_budget: u32) -> Self {
        Self {
            general_budget,
            login_budget,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn budget(&self, action: RateLimitAction) -> u32 {
        match action {
            RateLimitAction::General => self.general_budget,
            RateLimitAction::Login => self.login_budget,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(RateLimitAction, String), WindowState>> {
        match self.windows.lock() {
            Ok(windows) => windows,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, client: Option<&str>, action: RateLimitAction) -> RateLimitDecision {
        let key = (action, client.unwrap_or("unknown").to_string());
        let now = Instant::now();

        let mut windows = self.lock();
        if windows.len() >= SWEEP_THRESHOLD {
            windows.retain(|_, state| now.duration_since(state.started_at) < WINDOW);
        }

        let state = windows.entry(key).or_insert(WindowState {
            count: 0,
            started_at: now,
        });
        if now.duration_since(state.started_at) >= WINDOW {
            state.count = 0;
            state.started_at = now;
        }

        if state.count >= self.budget(action) {
            RateLimitDecision::Limited
        } else {
            state.count += 1;
            RateLimitDecision::Allowed
        }
    }
}
