//! Client-side request-rate admission control.
//!
//! A token bucket that caps outbound request rate independent of
//! server-side 429 handling, so steady workloads avoid tripping the
//! server limit at all. Built on `tokio::time` so paused-clock tests are
//! deterministic.

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Token bucket limiting outbound completion requests.
pub struct RequestLimiter {
    state: Mutex<Bucket>,
    capacity: f64,
    refill_per_sec: f64,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RequestLimiter {
    /// Creates a limiter allowing `requests` per minute.
    ///
    /// The bucket starts full, so a short burst up to `requests` goes out
    /// immediately before the continuous refill rate takes over.
    pub fn per_minute(requests: u32) -> Self {
        let capacity = f64::from(requests.max(1));
        Self {
            state: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity,
            refill_per_sec: capacity / 60.0,
        }
    }

    /// Acquires one request unit, suspending until the bucket can supply it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
                bucket.last_refill = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.refill_per_sec)
            };
            sleep(wait).await;
        }
    }
}
