/// The one frame-advance timer.
///
/// Starting a timer replaces whatever was armed, so two behavior sequences
/// can never tick side by side. Start/cancel counts are kept for diagnostics.
#[derive(Debug, Default)]
pub struct FrameTimer {
    armed: Option<Armed>,
    started: u64,
    cancelled: u64,
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    interval: f32,
    remaining: f32,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a repeating timer, cancelling any previous one.
    pub fn start(&mut self, interval: f32) {
        self.cancel();
        self.started += 1;
        log::trace!("Frame timer armed every {interval}s (start #{})", self.started);
        self.armed = Some(Armed {
            interval,
            remaining: interval,
        });
    }

    pub fn cancel(&mut self) {
        if self.armed.take().is_some() {
            self.cancelled += 1;
            log::trace!("Frame timer cancelled (#{})", self.cancelled);
        }
    }

    /// Advance by `dt`. Returns true when the timer fires; fires at most once
    /// per call and keeps the remainder for the next period.
    pub fn advance(&mut self, dt: f32) -> bool {
        let Some(armed) = &mut self.armed else {
            return false;
        };
        armed.remaining -= dt;
        if armed.remaining <= 0.0 {
            armed.remaining = (armed.remaining + armed.interval).max(0.0);
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn interval(&self) -> Option<f32> {
        self.armed.map(|a| a.interval)
    }

    #[cfg(test)]
    pub fn started(&self) -> u64 {
        self.started
    }

    #[cfg(test)]
    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_on_interval() {
        let mut t = FrameTimer::new();
        t.start(0.1);
        assert!(!t.advance(0.05));
        assert!(t.advance(0.06));
        assert!(!t.advance(0.05));
        assert!(t.advance(0.05));
    }

    #[test]
    fn restart_cancels_previous() {
        let mut t = FrameTimer::new();
        t.start(0.1);
        t.start(0.3);
        assert_eq!(t.started(), 2);
        assert_eq!(t.cancelled(), 1);
        assert_eq!(t.interval(), Some(0.3));
        assert!(!t.advance(0.2));
    }

    #[test]
    fn unarmed_never_fires() {
        let mut t = FrameTimer::new();
        assert!(!t.advance(10.0));
        t.start(0.1);
        t.cancel();
        t.cancel();
        assert_eq!(t.cancelled(), 1);
        assert!(!t.advance(1.0));
    }
}
