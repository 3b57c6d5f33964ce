use std::time::{Duration, Instant};

/// Deduplicating debounce driven by caller-supplied instants.
///
/// A value is released by [`Debouncer::poll`] once `delay` has elapsed since it
/// was pushed without being superseded. Pushing a value equal to the latest
/// pushed one is ignored.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    latest: Option<T>,
    pending: Option<(T, Instant)>,
}

impl<T: Clone + PartialEq> Debouncer<T> {
    #[cfg(test)]
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: None,
            pending: None,
        }
    }

    /// Seeds the dedup baseline without scheduling anything.
    pub fn with_initial(delay: Duration, initial: T) -> Self {
        Self {
            delay,
            latest: Some(initial),
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns false when `value` equals the latest pushed value.
    pub fn push(&mut self, value: T, now: Instant) -> bool {
        if self.latest.as_ref() == Some(&value) {
            return false;
        }
        self.latest = Some(value.clone());
        self.pending = Some((value, now + self.delay));
        true
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    #[cfg(test)]
    fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, at)) if *at <= now => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    /// Releases the pending value immediately, if any.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[test]
    fn releases_after_delay() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(DELAY);
        assert!(d.push("a".to_string(), t0));
        assert_eq!(d.poll(t0 + Duration::from_millis(499)), None);
        assert_eq!(d.poll(t0 + DELAY), Some("a".to_string()));
        assert_eq!(d.poll(t0 + DELAY * 2), None);
    }

    #[test]
    fn newer_push_supersedes_pending_value_and_deadline() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(DELAY);
        d.push("a", t0);
        d.push("ab", t0 + Duration::from_millis(300));
        assert_eq!(d.poll(t0 + DELAY), None);
        assert_eq!(d.deadline(), Some(t0 + Duration::from_millis(800)));
        assert_eq!(d.poll(t0 + Duration::from_millis(800)), Some("ab"));
    }

    #[test]
    fn equal_push_is_ignored() {
        let t0 = Instant::now();
        let mut d = Debouncer::with_initial(DELAY, "x");
        assert!(!d.push("x", t0));
        assert!(!d.is_pending());
        assert!(d.push("y", t0));
        assert!(!d.push("y", t0 + Duration::from_millis(100)));
        assert_eq!(d.deadline(), Some(t0 + DELAY));
    }

    #[test]
    fn zero_delay_releases_on_next_poll() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::ZERO);
        d.push(1u32, t0);
        assert_eq!(d.poll(t0), Some(1));
    }

    #[test]
    fn flush_takes_pending_value() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(DELAY);
        d.push(7u32, t0);
        assert_eq!(d.flush(), Some(7));
        assert!(!d.is_pending());
    }
}
