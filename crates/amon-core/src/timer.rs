//! ---
//! amon_section: "03-runtime"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Periodic wake-ups for simulation tasks."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Fixed-period timer whose first tick lands one full period after creation.
#[derive(Debug)]
pub struct PeriodicTimer {
    interval: Interval,
}

impl PeriodicTimer {
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
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

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_period() {
        let start = Instant::now();
        let mut timer = PeriodicTimer::new(Duration::from_secs(2));
        timer.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        timer.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }
}
