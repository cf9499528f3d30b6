//! Posture reporting loop.
//!
//! One cycle at a time. A failed cycle is followed by either an exponential
//! backoff retry or the regular interval depending on the error
//! [`Disposition`]. Shutdown is observed only between cycles, so a signature
//! in progress always completes.

use crate::{
    agent::{Agent, CycleReport},
    errors::{AgentError, Disposition, Result},
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Something that runs one reporting cycle
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self) -> Result<CycleReport>;
}

#[async_trait]
impl CycleRunner for Agent {
    async fn run_cycle(&self) -> Result<CycleReport> {
        self.collect_and_submit().await
    }
}

/// Exponential backoff: `initial * 2^attempt`, capped at `max`
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            attempt: 0,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u32.checked_shl(self.attempt).unwrap_or(u32::MAX);
        let delay = self
            .initial
            .checked_mul(factor)
            .unwrap_or(self.max)
            .min(self.max);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Outcome of a single tick
#[derive(Debug)]
pub enum TickOutcome {
    Completed(CycleReport),
    Failed(AgentError),
    /// Another cycle was still running; nothing was done
    Skipped,
}

/// Drives a [`CycleRunner`] on a fixed interval
pub struct Scheduler<R> {
    runner: R,
    interval: Duration,
    backoff_initial: Duration,
    backoff_max: Duration,
    in_flight: AtomicBool,
}

impl<R: CycleRunner> Scheduler<R> {
    pub fn new(runner: R, interval: Duration, backoff_initial: Duration, backoff_max: Duration) -> Self {
        Self {
            runner,
            interval,
            backoff_initial,
            backoff_max,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run one cycle unless one is already in flight
    pub async fn tick(&self) -> TickOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Previous cycle still running; skipping");
            return TickOutcome::Skipped;
        }

        let result = self.runner.run_cycle().await;
        self.in_flight.store(false, Ordering::Release);

        match result {
            Ok(report) => TickOutcome::Completed(report),
            Err(e) => TickOutcome::Failed(e),
        }
    }

    /// Run until `shutdown` turns true. Returns the number of cycles run.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut backoff = Backoff::new(self.backoff_initial, self.backoff_max);
        let mut cycles = 0u64;

        info!(interval_secs = self.interval.as_secs(), "Posture scheduler started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let delay = match self.tick().await {
                TickOutcome::Completed(_) => {
                    cycles += 1;
                    backoff.reset();
                    self.interval
                }
                TickOutcome::Skipped => self.interval,
                TickOutcome::Failed(e) => {
                    cycles += 1;
                    self.delay_after_failure(&e, &mut backoff)
                }
            };

            debug!(delay_secs = delay.as_secs(), "Next posture cycle scheduled");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(cycles, "Posture scheduler stopped");
        cycles
    }

    fn delay_after_failure(&self, e: &AgentError, backoff: &mut Backoff) -> Duration {
        match e.disposition() {
            Disposition::Retry => {
                // A retry never pushes the next regular cycle further out
                let delay = backoff.next_delay().min(self.interval);
                warn!(
                    error = %e,
                    attempt = backoff.attempt(),
                    retry_in_secs = delay.as_secs(),
                    "Posture cycle failed; retrying"
                );
                delay
            }
            Disposition::Skip => {
                backoff.reset();
                warn!(error = %e, "Posture report dropped");
                self.interval
            }
            Disposition::Halt => {
                backoff.reset();
                error!(error = %e, "Device identity rejected; re-enrollment required");
                self.interval
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DeviceStatus;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;
    use tokio::time::Instant;
    use ztna_keystore::KeyStoreError;

    const INTERVAL: Duration = Duration::from_secs(300);

    /// Replays scripted results, records when each cycle started and
    /// requests shutdown once the script is exhausted
    struct ScriptedRunner {
        script: Mutex<VecDeque<Result<CycleReport>>>,
        started: Mutex<Vec<Instant>>,
        shutdown: watch::Sender<bool>,
    }

    impl ScriptedRunner {
        fn new(script: Vec<Result<CycleReport>>) -> (Self, watch::Receiver<bool>) {
            let (tx, rx) = watch::channel(false);
            let runner = Self {
                script: Mutex::new(script.into()),
                started: Mutex::new(Vec::new()),
                shutdown: tx,
            };
            (runner, rx)
        }

        fn offsets(&self, origin: Instant) -> Vec<u64> {
            self.started
                .lock()
                .unwrap()
                .iter()
                .map(|t| t.duration_since(origin).as_secs())
                .collect()
        }
    }

    #[async_trait]
    impl CycleRunner for ScriptedRunner {
        async fn run_cycle(&self) -> Result<CycleReport> {
            self.started.lock().unwrap().push(Instant::now());
            let mut script = self.script.lock().unwrap();
            let next = script
                .pop_front()
                .unwrap_or(Ok(CycleReport::AwaitingApproval(DeviceStatus::Pending)));
            if script.is_empty() {
                let _ = self.shutdown.send(true);
            }
            next
        }
    }

    fn ok() -> Result<CycleReport> {
        Ok(CycleReport::AwaitingApproval(DeviceStatus::Active))
    }

    fn scheduler(runner: ScriptedRunner) -> Scheduler<ScriptedRunner> {
        Scheduler::new(
            runner,
            INTERVAL,
            Duration::from_secs(5),
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(30));
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![5, 10, 20, 30, 30, 30]);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_survives_many_attempts() {
        let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(300));
        for _ in 0..100 {
            assert!(backoff.next_delay() <= Duration::from_secs(300));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_back_off_then_recover() {
        let (runner, shutdown) = ScriptedRunner::new(vec![
            Err(AgentError::Transport("refused".into())),
            Err(AgentError::SubmissionTimeout),
            ok(),
            ok(),
        ]);
        let scheduler = scheduler(runner);
        let origin = Instant::now();

        let cycles = scheduler.run(shutdown).await;

        assert_eq!(cycles, 4);
        assert_eq!(scheduler.runner().offsets(origin), vec![0, 5, 15, 315]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_key_waits_full_interval() {
        let (runner, shutdown) = ScriptedRunner::new(vec![
            Err(AgentError::KeyStore(KeyStoreError::KeyNotFound)),
            Err(AgentError::KeyStore(KeyStoreError::KeyNotFound)),
            ok(),
        ]);
        let scheduler = scheduler(runner);
        let origin = Instant::now();

        scheduler.run(shutdown).await;

        assert_eq!(scheduler.runner().offsets(origin), vec![0, 300, 600]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_report_is_not_retried_early() {
        let (runner, shutdown) = ScriptedRunner::new(vec![
            Err(AgentError::Backend {
                status: 409,
                code: "POSTURE_REPLAY".into(),
                message: String::new(),
            }),
            ok(),
        ]);
        let scheduler = scheduler(runner);
        let origin = Instant::now();

        scheduler.run(shutdown).await;

        assert_eq!(scheduler.runner().offsets(origin), vec![0, 300]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_between_cycles() {
        let (runner, shutdown) = ScriptedRunner::new(vec![ok(), ok(), ok()]);
        let scheduler = Arc::new(scheduler(runner));
        let (stop_tx, stop_rx) = watch::channel(false);
        drop(shutdown);

        let task = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run(stop_rx).await })
        };

        tokio::time::sleep(Duration::from_secs(301)).await;
        stop_tx.send(true).unwrap();

        assert_eq!(task.await.unwrap(), 2);
    }

    /// Runner whose cycle blocks until released
    struct BlockingRunner {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl CycleRunner for BlockingRunner {
        async fn run_cycle(&self) -> Result<CycleReport> {
            self.entered.notify_one();
            self.release.notified().await;
            ok()
        }
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let scheduler = Arc::new(Scheduler::new(
            BlockingRunner {
                entered: Notify::new(),
                release: Notify::new(),
            },
            INTERVAL,
            Duration::from_secs(5),
            Duration::from_secs(60),
        ));

        let first = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.tick().await })
        };
        scheduler.runner().entered.notified().await;

        assert!(matches!(scheduler.tick().await, TickOutcome::Skipped));

        scheduler.runner().release.notify_one();
        assert!(matches!(first.await.unwrap(), TickOutcome::Completed(_)));

        // Free again once the first cycle is done
        let again = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.tick().await })
        };
        scheduler.runner().entered.notified().await;
        scheduler.runner().release.notify_one();
        assert!(matches!(again.await.unwrap(), TickOutcome::Completed(_)));
    }
}
