//! ---
//! hydro_section: "01-core-functionality"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Runtime helpers supporting the orchestrator."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

/// Simple async rate limiter that ensures deterministic loop intervals.
#[derive(Debug)]
pub struct RateLimiter {
    interval: tokio::time::Interval,
}

impl RateLimiter {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_tick_fires_immediately() {
        let mut limiter = RateLimiter::new(Duration::from_secs(60));
        let started = Instant::now();
        limiter.tick().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn subsequent_ticks_honour_the_period() {
        let mut limiter = RateLimiter::new(Duration::from_millis(30));
        limiter.tick().await;
        let before = Instant::now();
        limiter.tick().await;
        assert!(before.elapsed() >= Duration::from_millis(25));
    }
}
