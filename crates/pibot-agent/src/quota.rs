//! Request quota and single-slot dedup cache.

use serde::Serialize;

/// Counts completed requests and remembers the last prompt/response pair.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionQuota {
    request_count: u64,
    last_prompt: Option<String>,
    last_response: Option<String>,
}

/// Read-only view of the quota, for status reporting.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuotaSnapshot {
    pub request_count: u64,
    pub max_requests: u64,
    pub remaining: u64,
}

impl SessionQuota {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether another request fits under `max_requests`.
    pub fn check(&self, max_requests: u64) -> bool {
        self.request_count < max_requests
    }

    /// The cached response if `prompt` repeats the last one exactly.
    pub fn cached(&self, prompt: &str) -> Option<&str> {
        match (&self.last_prompt, &self.last_response) {
            (Some(p), Some(r)) if p == prompt => Some(r),
            _ => None,
        }
    }

    /// Record a successful completion.
    pub fn record(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        self.request_count += 1;
        self.last_prompt = Some(prompt.into());
        self.last_response = Some(response.into());
    }

    /// Forget the cached pair without touching the counter.
    pub fn clear_cache(&mut self) {
        self.last_prompt = None;
        self.last_response = None;
    }

    /// Zero the counter and forget the cached pair.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn snapshot(&self, max_requests: u64) -> QuotaSnapshot {
        QuotaSnapshot {
            request_count: self.request_count,
            max_requests,
            remaining: max_requests.saturating_sub(self.request_count),
        }
    }
}
