use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by `Instant::now`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Used to drive deadlines in tests.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset_nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_nanos: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

pub type ClockRef = Arc<dyn Clock>;

/// Answers whether the crawl's time budget has run out.
///
/// The deadline is fixed when the gate is opened and shared read-only by every task.
/// A budget too large to represent as an `Instant` never expires.
pub struct TimeGate {
    clock: ClockRef,
    deadline: Option<Instant>,
}

impl TimeGate {
    pub fn open(clock: ClockRef, budget: Duration) -> Self {
        let deadline = clock.now().checked_add(budget);
        Self { clock, deadline }
    }

    /// A zero budget is expired from the start
    pub fn expired(&self) -> bool {
        match self.deadline {
            Some(deadline) => self.clock.now() >= deadline,
            None => false,
        }
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(self.clock.now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_expires_once_clock_reaches_deadline() {
        let clock = Arc::new(ManualClock::new());
        let gate = TimeGate::open(clock.clone(), Duration::from_secs(10));
        assert!(!gate.expired());

        clock.advance(Duration::from_secs(9));
        assert!(!gate.expired());
        assert_eq!(gate.remaining(), Some(Duration::from_secs(1)));

        clock.advance(Duration::from_secs(1));
        assert!(gate.expired());
        assert_eq!(gate.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_zero_budget_is_expired_immediately() {
        let gate = TimeGate::open(Arc::new(ManualClock::new()), Duration::ZERO);
        assert!(gate.expired());
    }

    #[test]
    fn test_unrepresentable_budget_never_expires() {
        let clock = Arc::new(ManualClock::new());
        let gate = TimeGate::open(clock.clone(), Duration::MAX);
        clock.advance(Duration::from_secs(60 * 60 * 24 * 365));
        assert!(!gate.expired());
        assert_eq!(gate.remaining(), None);
    }
}
