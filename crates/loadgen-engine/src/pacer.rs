//! Paces ticket acquisition to a target average rate.

use tokio::time::{self, Interval, MissedTickBehavior};

/// Ticks at `1s / lps`, resynced against a monotonic `start + k*interval`
/// reference rather than a repeating timer (the mechanism spec.md §9's
/// "Pacer drift" guidance calls for). Missed ticks (the dispatcher was
/// blocked acquiring a ticket longer than one interval) are skipped, not
/// replayed: the backlog is dropped and the next tick resumes at the
/// current interval boundary instead of firing once per missed interval.
/// This is what keeps ticks from queuing unboundedly while the dispatcher
/// is blocked — the system targets an *average* rate of `lps`, not a
/// catch-up burst that would spike concurrency right after a stall.
pub(crate) struct Pacer {
    interval: Interval,
}

impl Pacer {
    pub(crate) fn new(lps: u32) -> Self {
        let period = time::Duration::from_secs_f64(1.0 / f64::from(lps.max(1)));
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    pub(crate) async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_arrive_at_the_configured_rate() {
        let mut pacer = Pacer::new(100); // 10ms interval
        pacer.tick().await; // first tick fires immediately

        let start = time::Instant::now();
        pacer.tick().await;
        assert_eq!(start.elapsed(), time::Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn a_blocked_consumer_does_not_replay_the_missed_backlog() {
        let mut pacer = Pacer::new(1000); // 1ms interval
        pacer.tick().await;

        // Stall for 500 missed intervals before consuming again.
        time::sleep(time::Duration::from_millis(500)).await;

        // Under Skip, the stall's backlog is dropped: the very next tick
        // resolves immediately (time has already passed it), and then
        // ticks resume at the normal 1ms cadence rather than firing 500
        // times back-to-back to "catch up". Count how many ticks complete
        // within a window far shorter than the missed backlog would need
        // to replay in; under Burst this count would be in the hundreds.
        let deadline = time::Instant::now() + time::Duration::from_millis(5);
        let mut ticks = 0;
        while time::Instant::now() < deadline {
            tokio::select! {
                _ = pacer.tick() => ticks += 1,
                _ = time::sleep_until(deadline) => break,
            }
        }

        assert!(
            ticks <= 6,
            "expected the missed backlog to be skipped, not replayed, but saw {ticks} ticks in 5ms"
        );
    }
}
