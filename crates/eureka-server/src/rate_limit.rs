use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Token bucket in front of the upstream-calling tools. Capacity equals the refill rate.
#[derive(Clone)]
pub struct RateLimiter {
    rps: u32,
    state: Arc<Mutex<State>>,
}

#[derive(Debug)]
struct State {
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    /// `None` or zero disables limiting.
    pub fn from_rps(rps: Option<u32>) -> Option<Self> {
        let rps = rps.filter(|&n| n > 0)?;
        Some(Self {
            rps,
            state: Arc::new(Mutex::new(State {
                tokens: f64::from(rps),
                last: Instant::now(),
            })),
        })
    }

    /// Take one token, or report how long until the next one is available.
    pub async fn check(&self) -> Result<(), String> {
        let rate = f64::from(self.rps);
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let earned = now.duration_since(state.last).as_secs_f64() * rate;
        state.last = now;
        state.tokens = (state.tokens + earned).min(rate);

        if state.tokens < 1.0 {
            let wait = Duration::from_secs_f64((1.0 - state.tokens) / rate);
            return Err(format!(
                "rate limit of {} requests/s exceeded: try again in ~{}ms",
                self.rps,
                wait.as_millis()
            ));
        }
        state.tokens -= 1.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_or_missing_disables() {
        assert!(RateLimiter::from_rps(None).is_none());
        assert!(RateLimiter::from_rps(Some(0)).is_none());
    }

    #[tokio::test]
    async fn burst_up_to_rate_then_rejects() {
        let limiter = RateLimiter::from_rps(Some(2)).unwrap();
        assert!(limiter.check().await.is_ok());
        assert!(limiter.check().await.is_ok());
        let err = limiter.check().await.unwrap_err();
        assert!(err.starts_with("rate limit of 2 requests/s exceeded"), "{err}");
    }

    #[tokio::test]
    async fn refills_over_time() {
        let limiter = RateLimiter::from_rps(Some(20)).unwrap();
        for _ in 0..20 {
            limiter.check().await.unwrap();
        }
        assert!(limiter.check().await.is_err());
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(limiter.check().await.is_ok());
    }
}
