use std::time::Duration;

use rand::Rng;

/// Exponential reconnect delay with a cap and proportional jitter.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    jitter: f64,
    current: Duration,
}

impl Backoff {
    /// Create a backoff schedule.
    ///
    /// # Arguments
    /// * `initial` - First delay
    /// * `max` - Upper bound for the un-jittered delay
    /// * `jitter` - Fraction of the delay added or removed at random (0.0-1.0)
    pub fn new(initial: Duration, max: Duration, jitter: f64) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            max,
            jitter: jitter.clamp(0.0, 1.0),
            current: initial,
        }
    }

    /// Next delay to wait; doubles the base delay up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        self.current = (self.current * 2).min(self.max);
        self.apply_jitter(base)
    }

    /// Start over from the initial delay after a successful connection.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    fn apply_jitter(&self, base: Duration) -> Duration {
        if self.jitter == 0.0 {
            return base;
        }
        let factor = rand::thread_rng().gen_range(1.0 - self.jitter..=1.0 + self.jitter);
        base.mul_f64(factor)
    }
}
