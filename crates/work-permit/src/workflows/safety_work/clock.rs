use chrono::{Local, NaiveDateTime};

/// Wall-clock source, injected so submissions and date rules can be pinned in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local time of the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
