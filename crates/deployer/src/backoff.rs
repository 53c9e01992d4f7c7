use std::time::Duration;
use storekit_core::config::PollSchedule;
use storekit_core::error::{Error, Result};
use tokio::time::Instant;

/// Cancellable bounded backoff: a fixed short interval for the first few
/// attempts, a longer one after, a hard attempt cap, and an optional
/// deadline that cuts the whole wait short.
///
/// Usable by any long-poll integration: the caller does its query, then
/// `wait()`s; `wait` returns the next attempt number or fails once the
/// schedule or the deadline is spent.
#[derive(Debug)]
pub struct Backoff {
    schedule: PollSchedule,
    attempt: u32,
    deadline: Option<Instant>,
}

impl Backoff {
    pub fn new(schedule: PollSchedule, deadline: Option<Instant>) -> Self {
        Self {
            schedule,
            attempt: 1,
            deadline,
        }
    }

    /// Current attempt number, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The wait this schedule proposes after the current attempt, or `None`
    /// when attempts are exhausted.
    pub fn proposed_wait(&self) -> Option<Duration> {
        if self.attempt >= self.schedule.max_attempts {
            return None;
        }
        if self.attempt < self.schedule.fast_attempts {
            Some(self.schedule.fast_interval())
        } else {
            Some(self.schedule.slow_interval())
        }
    }

    /// Sleep out the proposed wait, honoring the deadline, then advance to
    /// the next attempt.
    pub async fn wait(&mut self) -> Result<u32> {
        let wait = self
            .proposed_wait()
            .ok_or_else(|| Error::Timeout(format!("no result after {} attempts", self.attempt)))?;

        if let Some(deadline) = self.deadline {
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Cancelled("deadline expired".into()));
            }
            if now + wait >= deadline {
                // Sleeping the full interval would overshoot; give up now
                // rather than waking past the deadline.
                tokio::time::sleep_until(deadline).await;
                return Err(Error::Cancelled("deadline expired while waiting".into()));
            }
        }

        tokio::time::sleep(wait).await;
        self.attempt += 1;
        Ok(self.attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> PollSchedule {
        PollSchedule {
            fast_interval_ms: 10,
            slow_interval_ms: 30,
            fast_attempts: 3,
            max_attempts: 5,
            grace_attempts: 2,
        }
    }

    #[test]
    fn test_proposed_wait_switches_to_slow() {
        let mut b = Backoff::new(schedule(), None);
        assert_eq!(b.proposed_wait(), Some(Duration::from_millis(10)));
        b.attempt = 3;
        assert_eq!(b.proposed_wait(), Some(Duration::from_millis(30)));
    }

    #[test]
    fn test_proposed_wait_exhausts() {
        let mut b = Backoff::new(schedule(), None);
        b.attempt = 5;
        assert_eq!(b.proposed_wait(), None);
    }

    #[tokio::test]
    async fn test_wait_counts_attempts_then_times_out() {
        let mut b = Backoff::new(schedule(), None);
        let mut attempts = vec![b.attempt()];
        loop {
            match b.wait().await {
                Ok(n) => attempts.push(n),
                Err(Error::Timeout(_)) => break,
                Err(other) => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(attempts, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_deadline_cuts_wait_short() {
        let mut long = schedule();
        long.slow_interval_ms = 60_000;
        long.fast_interval_ms = 60_000;
        let deadline = Instant::now() + Duration::from_millis(50);
        let mut b = Backoff::new(long, Some(deadline));
        let started = std::time::Instant::now();
        let err = b.wait().await.unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
