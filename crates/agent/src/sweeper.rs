use std::sync::Arc;
use std::time::Duration;

use thunai_core::{ApplicationError, UserContext};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::runtime::AgentRuntime;

/// Clears conversation states nobody answered within the configured TTL.
pub struct StateSweeper {
    runtime: Arc<AgentRuntime>,
    interval: Duration,
}

impl StateSweeper {
    pub fn new(runtime: Arc<AgentRuntime>, interval: Duration) -> Self {
        Self { runtime, interval }
    }

    /// One pass over the store. Returns how many states were expired.
    pub async fn sweep_once(&self) -> Result<usize, ApplicationError> {
        let runtime = &self.runtime;
        let cutoff = runtime.stale_cutoff();
        let stale = runtime.states().stale_users(cutoff).await?;
        let mut expired = 0;

        for user_id in stale {
            let _guard = runtime.locks().acquire(&user_id).await;
            // The user may have replied while we waited for the lock.
            let Some(state) = runtime.states().get(&user_id).await? else {
                continue;
            };
            if !state.is_stale(runtime.stale_cutoff()) {
                continue;
            }

            let context = UserContext::direct(user_id.as_str(), "sweeper")
                .with_correlation_id(format!("sweep-{}", cutoff.timestamp()));
            let awaiting = state.awaiting();
            runtime.workflow().expire(&context, state).await?;
            expired += 1;
            info!(
                event_name = "sweeper.state_expired",
                correlation_id = %context.correlation_id,
                user_id = %user_id,
                awaiting = awaiting.as_str(),
                "expired unanswered conversation state"
            );
        }

        Ok(expired)
    }

    /// Sweeps every `interval` until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            event_name = "sweeper.started",
            interval_secs = self.interval.as_secs(),
            "state sweeper running"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(error) = self.sweep_once().await {
                        warn!(
                            event_name = "sweeper.pass_failed",
                            error = %error,
                            "state sweep failed, retrying next interval"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(event_name = "sweeper.stopped", "state sweeper stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Duration as DateDuration;
    use thunai_core::{AttemptReason, Awaiting, UserContext};
    use tokio::sync::watch;

    use super::StateSweeper;
    use crate::testing::Harness;

    #[tokio::test]
    async fn expires_only_states_past_the_ttl() {
        let harness = Harness::new(&["Priya"]).await;
        let early = UserContext::direct("U-EARLY", "D1");
        let late = UserContext::direct("U-LATE", "D2");

        harness.say(&early, "Priya's bday is nov 15th").await.expect("confirmation");
        harness.clock.advance(DateDuration::minutes(20));
        harness.say(&late, "I'll be in office Mon to Wed").await.expect("confirmation");
        harness.clock.advance(DateDuration::minutes(15));

        let sweeper = StateSweeper::new(harness.runtime.clone(), Duration::from_secs(60));
        assert_eq!(sweeper.sweep_once().await.expect("sweep"), 1);

        assert_eq!(harness.awaiting(&early).await, Awaiting::None);
        assert_eq!(harness.awaiting(&late).await, Awaiting::ScheduleConfirmation);
        assert_eq!(harness.reasons().await, vec![AttemptReason::Expired]);
        assert_eq!(sweeper.sweep_once().await.expect("second sweep"), 0);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let harness = Harness::new(&[]).await;
        let sweeper = StateSweeper::new(harness.runtime.clone(), Duration::from_millis(10));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(sweeper.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown_tx.send(true).expect("sweeper listening");

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("sweeper stops promptly")
            .expect("sweeper task completes");
    }
}
