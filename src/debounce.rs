use std::time::{Duration, Instant};

/// Holds at most one pending task. Scheduling again cancels the previous
/// one and restarts the quiet window.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, pending: None }
    }

    /// Replace any pending task with `task`, due `quiet` after `now`
    pub fn schedule(&mut self, now: Instant, task: T) {
        self.pending = Some((now + self.quiet, task));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending task once its quiet window has elapsed
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        let due = matches!(&self.pending, Some((deadline, _)) if *deadline <= now);
        if due {
            self.pending.take().map(|(_, task)| task)
        } else {
            None
        }
    }

    /// How long the event loop may block before the pending task is due
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|(deadline, _)| deadline.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(250);

    #[test]
    fn test_fires_after_quiet_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(QUIET);
        debouncer.schedule(start, (80, 24));
        assert_eq!(debouncer.take_due(start + Duration::from_millis(100)), None);
        assert_eq!(debouncer.take_due(start + QUIET), Some((80, 24)));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.take_due(start + QUIET * 2), None);
    }

    #[test]
    fn test_reschedule_cancels_previous() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(QUIET);
        debouncer.schedule(start, (80, 24));
        debouncer.schedule(start + Duration::from_millis(200), (120, 40));

        // The first deadline has passed but it was replaced
        assert_eq!(debouncer.take_due(start + Duration::from_millis(300)), None);
        assert_eq!(debouncer.take_due(start + Duration::from_millis(450)), Some((120, 40)));
        assert_eq!(debouncer.take_due(start + Duration::from_secs(5)), None);
    }

    #[test]
    fn test_time_until_due() {
        let start = Instant::now();
        let mut debouncer: Debouncer<()> = Debouncer::new(QUIET);
        assert_eq!(debouncer.time_until_due(start), None);
        debouncer.schedule(start, ());
        assert_eq!(debouncer.time_until_due(start + Duration::from_millis(50)), Some(Duration::from_millis(200)));
        assert_eq!(debouncer.time_until_due(start + QUIET * 2), Some(Duration::ZERO));
    }
}
