//! Token buckets and bounded concurrency for §5's admission points:
//! per-RUC rate limit, per-IP rate limit, per-RUC in-flight cap, and the
//! per-RUC batch rate (checked without waiting — see `try_admit_batch`).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

/// Pure refill calculation, kept separate from [`TokenBucket`] so it can be
/// unit-tested without real sleeping.
fn refill(tokens: f64, capacity: f64, refill_per_sec: f64, elapsed: Duration) -> f64 {
    (tokens + refill_per_sec * elapsed.as_secs_f64()).min(capacity)
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket keyed by nothing in particular — callers keep one per
/// RUC or per IP as needed.
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity: capacity as f64,
            refill_per_sec,
            state: Mutex::new(BucketState {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one token if available, returning `true` on success without
    /// blocking.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();
        state.tokens = refill(state.tokens, self.capacity, self.refill_per_sec, now - state.last_refill);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// How long the caller should wait before the next token is expected to
    /// be available, `Duration::ZERO` if one already is.
    pub fn wait_hint(&self) -> Duration {
        let state = self.state.lock().unwrap();
        if state.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - state.tokens) / self.refill_per_sec)
        }
    }

    /// Block (async) until a token is available, then take it.
    pub async fn acquire(&self) {
        loop {
            if self.try_acquire() {
                return;
            }
            tokio::time::sleep(self.wait_hint().max(Duration::from_millis(1))).await;
        }
    }
}

/// Rate limiting and concurrency state for one sender instance, keyed by
/// issuer RUC for the per-RUC limits and shared for the per-IP limit (§5,
/// §9 — buckets live on the sender, never as global state).
pub struct RateLimiter {
    per_ruc_per_sec: u32,
    batches_per_ruc_per_min: u32,
    concurrent_per_ruc: usize,
    ruc_buckets: Mutex<HashMap<String, std::sync::Arc<TokenBucket>>>,
    ruc_batch_buckets: Mutex<HashMap<String, std::sync::Arc<TokenBucket>>>,
    ruc_semaphores: Mutex<HashMap<String, std::sync::Arc<Semaphore>>>,
    ip_bucket: TokenBucket,
}

impl RateLimiter {
    pub fn new(
        per_ruc_per_sec: u32,
        per_ip_per_min: u32,
        concurrent_per_ruc: u32,
        batches_per_ruc_per_min: u32,
    ) -> Self {
        Self {
            per_ruc_per_sec,
            batches_per_ruc_per_min,
            concurrent_per_ruc: concurrent_per_ruc as usize,
            ruc_buckets: Mutex::new(HashMap::new()),
            ruc_batch_buckets: Mutex::new(HashMap::new()),
            ruc_semaphores: Mutex::new(HashMap::new()),
            ip_bucket: TokenBucket::new(per_ip_per_min, per_ip_per_min as f64 / 60.0),
        }
    }

    fn bucket_for(&self, ruc: &str) -> std::sync::Arc<TokenBucket> {
        let mut buckets = self.ruc_buckets.lock().unwrap();
        buckets
            .entry(ruc.to_string())
            .or_insert_with(|| {
                std::sync::Arc::new(TokenBucket::new(self.per_ruc_per_sec, self.per_ruc_per_sec as f64))
            })
            .clone()
    }

    fn semaphore_for(&self, ruc: &str) -> std::sync::Arc<Semaphore> {
        let mut semaphores = self.ruc_semaphores.lock().unwrap();
        semaphores
            .entry(ruc.to_string())
            .or_insert_with(|| std::sync::Arc::new(Semaphore::new(self.concurrent_per_ruc)))
            .clone()
    }

    fn batch_bucket_for(&self, ruc: &str) -> std::sync::Arc<TokenBucket> {
        let mut buckets = self.ruc_batch_buckets.lock().unwrap();
        buckets
            .entry(ruc.to_string())
            .or_insert_with(|| {
                std::sync::Arc::new(TokenBucket::new(
                    self.batches_per_ruc_per_min,
                    self.batches_per_ruc_per_min as f64 / 60.0,
                ))
            })
            .clone()
    }

    /// Acquire the rate-limit token (per-RUC, then per-IP) followed by the
    /// concurrency permit — the ordering decided for every attempt,
    /// including the first, so retries reuse identical admission logic.
    pub async fn admit(&self, ruc: &str) -> tokio::sync::OwnedSemaphorePermit {
        self.bucket_for(ruc).acquire().await;
        self.ip_bucket.acquire().await;
        self.semaphore_for(ruc)
            .acquire_owned()
            .await
            .expect("semaphore is never closed")
    }

    /// Try to claim one of this RUC's `batches_per_ruc_per_min` slots without
    /// waiting. `send_batch` rejects immediately on `false` rather than
    /// stalling a whole batch behind someone else's minute-long window (§5).
    pub fn try_admit_batch(&self, ruc: &str) -> bool {
        self.batch_bucket_for(ruc).try_acquire()
    }
}
