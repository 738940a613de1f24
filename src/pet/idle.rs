use crate::tuning::Tuning;

/// System-wide input idle times.
pub trait IdleSource {
    fn seconds_since_pointer(&self) -> f64;
    fn seconds_since_key(&self) -> f64;

    /// Idle time is the more recent of the two inputs.
    fn idle_seconds(&self) -> f64 {
        self.seconds_since_pointer().min(self.seconds_since_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleChange {
    FellAsleep,
    Woke,
}

/// Throttled sleep/wake detector with a hysteresis band between the
/// sleep and wake thresholds.
#[derive(Debug)]
pub struct IdleMonitor {
    since_poll: f32,
    poll_interval: f32,
    sleep_after: f64,
    wake_below: f64,
    asleep: bool,
}

impl IdleMonitor {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            since_poll: 0.0,
            poll_interval: tuning.idle_poll_interval,
            sleep_after: tuning.sleep_after,
            wake_below: tuning.wake_below,
            asleep: false,
        }
    }

    /// Query `source` if the poll interval has elapsed.
    pub fn poll(&mut self, dt: f32, source: &dyn IdleSource) -> Option<IdleChange> {
        self.since_poll += dt;
        if self.since_poll <= self.poll_interval {
            return None;
        }
        self.since_poll = 0.0;
        self.evaluate(source.idle_seconds())
    }

    pub fn evaluate(&mut self, idle_seconds: f64) -> Option<IdleChange> {
        if !self.asleep && idle_seconds > self.sleep_after {
            self.asleep = true;
            Some(IdleChange::FellAsleep)
        } else if self.asleep && idle_seconds < self.wake_below {
            self.asleep = false;
            Some(IdleChange::Woke)
        } else {
            None
        }
    }

    #[cfg(test)]
    pub fn is_asleep(&self) -> bool {
        self.asleep
    }
}
