use std::sync::Arc;

use log::info;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::domain::job::{JobContext, JobEvent, JobListener};

/// Countdown barrier released once the count reaches zero.
#[derive(Debug)]
pub struct CountdownLatch {
    remaining: Mutex<usize>,
    zero: Notify,
}

impl CountdownLatch {
    pub fn new(count: usize) -> Self {
        CountdownLatch {
            remaining: Mutex::new(count),
            zero: Notify::new(),
        }
    }

    /// Saturates at zero.
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        if *remaining == 0 {
            return;
        }
        *remaining -= 1;
        if *remaining == 0 {
            self.zero.notify_waiters();
        }
    }

    pub fn count(&self) -> usize {
        *self.remaining.lock()
    }

    pub async fn wait(&self) {
        loop {
            let notified = self.zero.notified();
            tokio::pin!(notified);
            // Register before checking so a count_down in between is not missed
            notified.as_mut().enable();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Counts a latch down once per job, when the job reports `Completed`.
pub struct CompletionSignal {
    latch: Arc<CountdownLatch>,
}

impl CompletionSignal {
    pub fn new(latch: Arc<CountdownLatch>) -> Self {
        CompletionSignal { latch }
    }
}

impl JobListener for CompletionSignal {
    fn on_event(&self, job: &JobContext, event: &JobEvent) {
        if *event == JobEvent::Completed {
            self.latch.count_down();
            info!(
                "{} completed (number of jobs still running: {})",
                job,
                self.latch.count()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_given_zero_count_returns_immediately() {
        let latch = CountdownLatch::new(0);
        latch.wait().await;
        assert_eq!(latch.count(), 0);
    }

    #[tokio::test]
    async fn test_wait_returns_after_last_count_down() {
        let latch = Arc::new(CountdownLatch::new(3));
        let waiter = {
            let latch = latch.clone();
            tokio::spawn(async move { latch.wait().await })
        };

        latch.count_down();
        latch.count_down();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        latch.count_down();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_count_down_saturates_at_zero() {
        let latch = CountdownLatch::new(1);
        latch.count_down();
        latch.count_down();
        assert_eq!(latch.count(), 0);
    }

    #[test]
    fn test_completion_signal_only_counts_completed() {
        let latch = Arc::new(CountdownLatch::new(2));
        let signal = CompletionSignal::new(latch.clone());
        let job = JobContext {
            problem_id: "p".to_string(),
            job_id: Some("j".to_string()),
        };

        signal.on_event(&job, &JobEvent::Running);
        signal.on_event(&job, &JobEvent::Processed);
        assert_eq!(latch.count(), 2);

        signal.on_event(&job, &JobEvent::Completed);
        assert_eq!(latch.count(), 1);
    }
}
