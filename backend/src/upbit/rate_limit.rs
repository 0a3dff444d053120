// =============================================================================
// Rate Limiter: minimum spacing between outbound quotation requests
// =============================================================================
//
// Upbit throttles the quotation API to roughly 10 requests per second per IP.
// We stay under that with a fixed gap (120 ms by default, ~8 req/s) between
// consecutive requests across the whole process.
//
// One instance is shared via `Arc` by every caller. The async mutex is held
// across the wait, so check-and-update is a single critical section and
// concurrent callers are released one at a time, each at least `interval`
// after the previous one.
// =============================================================================

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(120);

/// Process-wide request pacing gate.
pub struct RateLimiter {
    interval: Duration,
    last_acquired: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_acquired: Mutex::new(None),
        }
    }

    /// Wait until at least `interval` has passed since the previous
    /// `acquire()` returned, record the new instant and return it.
    ///
    /// The first call returns immediately.
    pub async fn acquire(&self) -> Instant {
        let mut last = self.last_acquired.lock().await;

        if let Some(prev) = *last {
            let ready_at = prev + self.interval;
            let now = Instant::now();
            if ready_at > now {
                debug!(wait_ms = (ready_at - now).as_millis() as u64, "rate limiter waiting");
                tokio::time::sleep_until(ready_at).await;
            }
        }

        let acquired = Instant::now();
        *last = Some(acquired);
        acquired
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("interval_ms", &self.interval.as_millis())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn first_acquire_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(10));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn sequential_acquires_are_spaced() {
        let interval = Duration::from_millis(30);
        let limiter = RateLimiter::new(interval);

        let mut stamps = Vec::new();
        for _ in 0..4 {
            stamps.push(limiter.acquire().await);
        }
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= interval, "gap {:?}", pair[1] - pair[0]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_acquires_are_spaced() {
        let interval = Duration::from_millis(25);
        let limiter = Arc::new(RateLimiter::new(interval));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();

        let mut stamps = Vec::new();
        for handle in handles {
            stamps.push(handle.await.unwrap());
        }
        stamps.sort();

        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= interval, "gap {:?}", pair[1] - pair[0]);
        }
        // 8 acquisitions need at least 7 full intervals end to end.
        assert!(stamps[7] - stamps[0] >= interval * 7);
    }

    #[tokio::test]
    async fn waits_only_for_the_remainder() {
        let interval = Duration::from_millis(50);
        let limiter = RateLimiter::new(interval);
        limiter.acquire().await;
        tokio::time::sleep(interval).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < interval);
    }
}
