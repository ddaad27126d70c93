use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Single-slot timer: arming replaces whatever was pending.
pub trait Timer: Send + Sync {
    fn arm(&self, delay: Duration, task: Task);
    fn cancel(&self);
    fn pending(&self) -> usize;
}

/// Timer backed by the tokio runtime.
///
/// The sleeper task only waits and then spawns `task` detached, so a task
/// that re-arms the timer never aborts itself, and `cancel` never interrupts
/// a refresh that is already running.
#[derive(Debug, Default)]
pub struct TokioTimer {
    sleeper: Mutex<Option<JoinHandle<()>>>,
}

impl TokioTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Timer for TokioTimer {
    fn arm(&self, delay: Duration, task: Task) {
        let mut sleeper = self.sleeper.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = sleeper.take() {
            previous.abort();
        }
        *sleeper = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(task);
        }));
    }

    fn cancel(&self) {
        if let Some(previous) = self
            .sleeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            previous.abort();
        }
    }

    fn pending(&self) -> usize {
        self.sleeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished()) as usize
    }
}

/// Timer that never fires on its own; tests pull the armed task with `fire`.
#[derive(Default)]
pub struct ManualTimer {
    slot: Mutex<Option<(Duration, Task)>>,
    armed: Mutex<Vec<Duration>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the pending task, leaving the timer idle.
    pub fn fire(&self) -> Option<Task> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(|(_, task)| task)
    }

    pub fn pending_delay(&self) -> Option<Duration> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(delay, _)| *delay)
    }

    /// Every delay ever armed, oldest first.
    pub fn armed_delays(&self) -> Vec<Duration> {
        self.armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Timer for ManualTimer {
    fn arm(&self, delay: Duration, task: Task) {
        self.armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(delay);
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some((delay, task));
    }

    fn cancel(&self) {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    fn pending(&self) -> usize {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(counter: &Arc<AtomicUsize>, amount: usize) -> Task {
        let counter = Arc::clone(counter);
        Box::pin(async move {
            counter.fetch_add(amount, Ordering::SeqCst);
        })
    }

    #[test]
    fn manual_timer_keeps_only_the_latest_task() {
        let timer = ManualTimer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        timer.arm(Duration::from_secs(1), counting_task(&counter, 1));
        timer.arm(Duration::from_secs(2), counting_task(&counter, 10));

        assert_eq!(timer.pending(), 1);
        assert_eq!(timer.pending_delay(), Some(Duration::from_secs(2)));
        assert_eq!(
            timer.armed_delays(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );

        timer.cancel();
        assert_eq!(timer.pending(), 0);
        assert!(timer.fire().is_none());
    }

    #[tokio::test]
    async fn manual_timer_fire_runs_the_task() {
        let timer = ManualTimer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        timer.arm(Duration::from_secs(1), counting_task(&counter, 1));

        timer.fire().expect("armed task").await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(timer.pending(), 0);
    }

    #[tokio::test]
    async fn tokio_timer_rearm_cancels_previous() {
        let timer = TokioTimer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        timer.arm(Duration::from_millis(20), counting_task(&counter, 1));
        timer.arm(Duration::from_millis(40), counting_task(&counter, 10));
        assert_eq!(timer.pending(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert_eq!(timer.pending(), 0);
    }

    #[tokio::test]
    async fn tokio_timer_cancel_stops_the_task() {
        let timer = TokioTimer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        timer.arm(Duration::from_millis(20), counting_task(&counter, 1));
        timer.cancel();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(timer.pending(), 0);
    }
}
