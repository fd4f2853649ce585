use std::time;

/// Exponential backoff with an optional cap, used by the token service and the
/// management-plane fetcher (§4.3's "Retry" resilience policy).
#[derive(Copy, Clone, Debug)]
pub struct RetryPolicy {
    /// Coefficient to multiply `initial_interval` with for every past attempt.
    backoff_coefficient: u32,
    /// The backoff interval for the first retry.
    initial_interval: time::Duration,
    /// The maximum possible backoff between retries.
    maximum_interval: Option<time::Duration>,
    /// Maximum number of attempts (including the first), e.g. 3 means "try, retry, retry".
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(
        backoff_coefficient: u32,
        initial_interval: time::Duration,
        maximum_interval: Option<time::Duration>,
        max_attempts: u32,
    ) -> Self {
        Self {
            backoff_coefficient,
            initial_interval,
            maximum_interval,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Calculate the time until the next retry for a given attempt number (0-indexed).
    pub fn time_until_next_retry(&self, attempt: u32) -> time::Duration {
        let candidate_interval = self
            .initial_interval
            .saturating_mul(self.backoff_coefficient.saturating_pow(attempt));

        match self.maximum_interval {
            Some(max_interval) => std::cmp::min(candidate_interval, max_interval),
            None => candidate_interval,
        }
    }

    /// Jittered variant of [`Self::time_until_next_retry`]: scales the computed interval
    /// by a factor in `[0.5, 1.5)` to avoid synchronised retry storms across jobs.
    pub fn jittered_delay(&self, attempt: u32) -> time::Duration {
        let base = self.time_until_next_retry(attempt);
        let jitter = 0.5 + rand::random::<f64>();
        time::Duration::from_secs_f64(base.as_secs_f64() * jitter)
    }
}

impl Default for RetryPolicy {
    /// §4.3 default: up to 3 attempts, exponential backoff starting at 1s, no cap.
    fn default() -> Self {
        Self {
            backoff_coefficient: 2,
            initial_interval: time::Duration::from_secs(1),
            maximum_interval: None,
            max_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_every_attempt() {
        let policy = RetryPolicy::new(2, time::Duration::from_secs(1), None, 5);
        assert_eq!(policy.time_until_next_retry(0), time::Duration::from_secs(1));
        assert_eq!(policy.time_until_next_retry(1), time::Duration::from_secs(2));
        assert_eq!(policy.time_until_next_retry(2), time::Duration::from_secs(4));
    }

    #[test]
    fn caps_at_maximum() {
        let policy = RetryPolicy::new(
            2,
            time::Duration::from_secs(1),
            Some(time::Duration::from_secs(3)),
            5,
        );
        assert_eq!(policy.time_until_next_retry(5), time::Duration::from_secs(3));
    }
}
