use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::cancel::CancelSignal;
use crate::error::ProviderError;

const WINDOW: Duration = Duration::from_secs(1);

/// Fixed one-second window limiter shared by every call made through one
/// client. `acquire` never rejects, it only delays.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_window: Option<u32>,
    window: Mutex<RateWindow>,
}

#[derive(Debug, Default)]
struct RateWindow {
    start: Option<Instant>,
    issued: u32,
}

impl RateLimiter {
    /// Zero or a negative limit disables limiting.
    pub fn new(max_requests_per_second: i64) -> Self {
        let max_per_window = if max_requests_per_second <= 0 {
            None
        } else {
            Some(u32::try_from(max_requests_per_second).unwrap_or(u32::MAX))
        };
        Self {
            max_per_window,
            window: Mutex::new(RateWindow::default()),
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.max_per_window.is_some()
    }

    pub async fn acquire(&self, cancel: &CancelSignal) -> Result<(), ProviderError> {
        let Some(limit) = self.max_per_window else {
            return Ok(());
        };
        let (wait, window) = self.reserve(limit, Instant::now());
        if wait.is_zero() {
            return Ok(());
        }
        tracing::debug!(wait_ms = wait.as_millis(), "rate limit reached, waiting");
        let out = cancel.sleep(wait, "Rate limiter").await;
        if out.is_err() {
            self.release(window);
        }
        out
    }

    /// Claims a slot and returns how long the caller must wait before using
    /// it, along with the start of the window the slot belongs to. The lock
    /// is released before any waiting happens; a caller that finds the
    /// window full opens the next window at `start + 1s` so later callers
    /// queue behind it instead of double counting.
    fn reserve(&self, limit: u32, now: Instant) -> (Duration, Instant) {
        let mut window = self.window.lock();
        let start = match window.start {
            Some(start) if now.saturating_duration_since(start) < WINDOW => start,
            _ => {
                window.start = Some(now);
                window.issued = 1;
                return (Duration::ZERO, now);
            }
        };

        if window.issued < limit {
            window.issued += 1;
            return (start.saturating_duration_since(now), start);
        }

        let next = start + WINDOW;
        window.start = Some(next);
        window.issued = 1;
        (next.saturating_duration_since(now), next)
    }

    /// Gives back a slot whose waiter was cancelled, as long as its window
    /// has not been replaced since.
    fn release(&self, reserved: Instant) {
        let mut window = self.window.lock();
        if window.start == Some(reserved) {
            window.issued = window.issued.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cancel::cancel_pair;

    #[tokio::test(start_paused = true)]
    async fn limit_plus_one_waits_for_next_window() {
        let limiter = RateLimiter::new(3);
        let never = CancelSignal::never();
        let first = Instant::now();
        for _ in 0..3 {
            limiter.acquire(&never).await.expect("acquire");
        }
        assert!(first.elapsed() < WINDOW);
        limiter.acquire(&never).await.expect("acquire");
        assert!(first.elapsed() >= WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_limiter_never_waits() {
        for limit in [0, -5] {
            let limiter = RateLimiter::new(limit);
            assert!(!limiter.is_enabled());
            let start = Instant::now();
            for _ in 0..100 {
                limiter.acquire(&CancelSignal::never()).await.expect("acquire");
            }
            assert_eq!(start.elapsed(), Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn counter_resets_after_forced_wait() {
        let limiter = RateLimiter::new(2);
        let never = CancelSignal::never();
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire(&never).await.expect("acquire");
        }
        let after_wait = start.elapsed();
        assert!(after_wait >= WINDOW);
        // The forced wait opened a new window holding one permit, so one
        // more fits without waiting.
        limiter.acquire(&never).await.expect("acquire");
        assert_eq!(start.elapsed(), after_wait);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_window() {
        let limiter = Arc::new(RateLimiter::new(2));
        let start = Instant::now();
        let mut tasks = Vec::new();
        for _ in 0..6 {
            let limiter = Arc::clone(&limiter);
            tasks.push(tokio::spawn(async move {
                limiter.acquire(&CancelSignal::never()).await.expect("acquire");
                start.elapsed()
            }));
        }
        let mut elapsed = Vec::new();
        for task in tasks {
            elapsed.push(task.await.expect("join"));
        }
        elapsed.sort();
        assert!(elapsed[1] < WINDOW);
        assert!(elapsed[2] >= WINDOW);
        assert!(elapsed[4] >= WINDOW * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_wait_is_an_error() {
        let limiter = Arc::new(RateLimiter::new(1));
        limiter
            .acquire(&CancelSignal::never())
            .await
            .expect("first permit");
        let (canceller, signal) = cancel_pair();
        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire(&signal).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
        let out = waiter.await.expect("join");
        assert!(matches!(
            out,
            Err(ProviderError::Cancelled {
                stage: "Rate limiter"
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_waiter_gives_its_slot_back() {
        let limiter = Arc::new(RateLimiter::new(1));
        let start = Instant::now();
        limiter
            .acquire(&CancelSignal::never())
            .await
            .expect("first permit");

        let (canceller, signal) = cancel_pair();
        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire(&signal).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
        assert!(waiter.await.expect("join").is_err());

        limiter
            .acquire(&CancelSignal::never())
            .await
            .expect("next permit");
        let elapsed = start.elapsed();
        assert!(elapsed >= WINDOW);
        assert!(elapsed < WINDOW * 2);
    }
}
