use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(1);

/// One-second countdown ticks. The first tick fires a full second after start,
/// and a late tick delays the ones after it instead of bursting to catch up.
pub struct Countdown {
    interval: Interval,
}

impl Countdown {
    pub fn start() -> Self {
        let mut interval = interval_at(Instant::now() + TICK, TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
