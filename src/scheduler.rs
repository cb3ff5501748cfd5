//! Cycle Scheduler
//!
//! Runs a task once immediately and then every `period`, strictly one at a
//! time. A tick that comes due while a cycle is still running is skipped,
//! not queued, so cycles never overlap. Shutdown is only observed between
//! cycles; an in-flight cycle always runs to completion.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// Something the scheduler can run one cycle of.
#[async_trait]
pub trait CycleTask: Send {
    async fn run_once(&mut self);
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    period: Duration,
    max_cycles: Option<u64>,
}

impl Scheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            max_cycles: None,
        }
    }

    /// Stop after `n` completed cycles.
    pub fn with_max_cycles(mut self, n: u64) -> Self {
        self.max_cycles = Some(n);
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run until `shutdown` resolves (or the cycle cap is hit). Returns the
    /// number of completed cycles.
    pub async fn run<T, F>(&self, task: &mut T, shutdown: F) -> u64
    where
        T: CycleTask + ?Sized,
        F: Future<Output = ()>,
    {
        info!("Running job every {:?}", self.period);

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut completed = 0u64;
        loop {
            if self.max_cycles.is_some_and(|max| completed >= max) {
                info!("Reached {} cycles, stopping scheduler", completed);
                break;
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
                _ = ticker.tick() => {}
            }

            // not raced against shutdown: a started cycle always completes
            task.run_once().await;
            completed += 1;
        }

        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    struct SlowTask {
        active: Arc<AtomicBool>,
        overlaps: usize,
        starts: Vec<Instant>,
        work: Duration,
    }

    #[async_trait]
    impl CycleTask for SlowTask {
        async fn run_once(&mut self) {
            if self.active.swap(true, Ordering::SeqCst) {
                self.overlaps += 1;
            }
            self.starts.push(Instant::now());
            tokio::time::sleep(self.work).await;
            self.active.store(false, Ordering::SeqCst);
        }
    }

    fn task(work: Duration) -> SlowTask {
        SlowTask {
            active: Arc::new(AtomicBool::new(false)),
            overlaps: 0,
            starts: Vec::new(),
            work,
        }
    }

    #[tokio::test]
    async fn test_first_cycle_runs_immediately() {
        let mut t = task(Duration::ZERO);
        let began = Instant::now();
        let n = Scheduler::new(Duration::from_secs(3600))
            .with_max_cycles(1)
            .run(&mut t, std::future::pending())
            .await;

        assert_eq!(n, 1);
        assert!(t.starts[0] - began < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_slow_cycles_never_overlap() {
        // each cycle outlasts the period
        let mut t = task(Duration::from_millis(30));
        let n = Scheduler::new(Duration::from_millis(5))
            .with_max_cycles(3)
            .run(&mut t, std::future::pending())
            .await;

        assert_eq!(n, 3);
        assert_eq!(t.overlaps, 0);
        for pair in t.starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(30));
        }
    }

    #[tokio::test]
    async fn test_shutdown_before_first_tick() {
        let mut t = task(Duration::ZERO);
        let n = Scheduler::new(Duration::from_millis(5))
            .run(&mut t, std::future::ready(()))
            .await;
        assert_eq!(n, 0);
        assert!(t.starts.is_empty());
    }

    #[test]
    fn test_zero_period_is_clamped() {
        assert_eq!(Scheduler::new(Duration::ZERO).period(), Duration::from_millis(1));
    }
}
