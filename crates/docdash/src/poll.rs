//! Cancellable recurring poll tasks.
//!
//! Every polled entity (an upload item, a job list row) stores its own
//! [`PollTask`]. Dropping or stopping the handle sets the shared
//! [`StopSignal`] and aborts the task, so a removed entity never issues
//! another request.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::Instrument;

/// Shared stop flag checked by a poll loop after every tick.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Fixed-interval timer that stops yielding once its signal is set.
pub struct PollTicker {
    timer: Interval,
    stop: StopSignal,
}

impl PollTicker {
    /// The first tick fires one full `period` after creation.
    ///
    /// # Panics
    /// Panics if `period` is zero.
    pub fn new(period: Duration, stop: StopSignal) -> Self {
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { timer, stop }
    }

    /// Waits for the next tick. Returns `false` once the task was stopped.
    pub async fn tick(&mut self) -> bool {
        if self.stop.is_stopped() {
            return false;
        }
        self.timer.tick().await;
        !self.stop.is_stopped()
    }
}

/// Consecutive poll failures for one entity.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailureStreak {
    count: u32,
}

impl FailureStreak {
    /// Records a failure and returns the new consecutive count.
    pub fn record(&mut self) -> u32 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Handle to a spawned poll loop, owned by the entity it polls for.
pub struct PollTask {
    name: String,
    stop: StopSignal,
    handle: Option<JoinHandle<()>>,
}

impl PollTask {
    /// Spawns `body` on the runtime, handing it the task's stop signal.
    pub fn spawn<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(StopSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let stop = StopSignal::new();
        let span = tracing::info_span!("poll_task", task = %name);
        let handle = tokio::spawn(body(stop.clone()).instrument(span));
        debug!("Started poll task {}", name);

        Self {
            name,
            stop,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops the loop. Idempotent.
    pub fn stop(&mut self) {
        self.stop.stop();
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Stopped poll task {}", self.name);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// True once the loop has exited on its own or was stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_task(name: &str, period: Duration, ticks: Arc<AtomicUsize>) -> PollTask {
        PollTask::spawn(name, move |stop| async move {
            let mut ticker = PollTicker::new(period, stop);
            while ticker.tick().await {
                ticks.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_fixed_interval() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let _task = counting_task("t", Duration::from_millis(1000), Arc::clone(&ticks));

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_ticks() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut task = counting_task("t", Duration::from_millis(1000), Arc::clone(&ticks));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        task.stop();
        assert!(task.is_stopped());
        let seen = ticks.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
        assert!(task.is_finished());

        // Stopping twice is harmless
        task.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_task() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let task = counting_task("t", Duration::from_millis(500), Arc::clone(&ticks));

        tokio::time::sleep(Duration::from_millis(1200)).await;
        drop(task);
        let seen = ticks.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tasks_are_independent() {
        let a_ticks = Arc::new(AtomicUsize::new(0));
        let b_ticks = Arc::new(AtomicUsize::new(0));
        let mut a = counting_task("a", Duration::from_millis(1000), Arc::clone(&a_ticks));
        let _b = counting_task("b", Duration::from_millis(1000), Arc::clone(&b_ticks));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        a.stop();
        tokio::time::sleep(Duration::from_millis(3000)).await;

        assert_eq!(a_ticks.load(Ordering::SeqCst), 1);
        assert_eq!(b_ticks.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_failure_streak() {
        let mut streak = FailureStreak::default();
        assert_eq!(streak.record(), 1);
        assert_eq!(streak.record(), 2);
        streak.reset();
        assert_eq!(streak.count(), 0);
        assert_eq!(streak.record(), 1);
    }
}
