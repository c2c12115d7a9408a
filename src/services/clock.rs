//! Time source for the coordinator
//!
//! Every time-dependent decision reads `now` from a `Clock` so that callers
//! and tests control it explicitly.

use std::sync::{Mutex, PoisonError};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use crate::utils::errors::{UniHubError, Result};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Zone in which times are presented to members
    fn timezone(&self) -> Tz;

    fn to_local(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.timezone())
    }
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| UniHubError::Config(format!("Unknown timezone: {}", name)))
}

/// Wall clock
#[derive(Debug, Clone)]
pub struct SystemClock {
    timezone: Tz,
}

impl SystemClock {
    pub fn new(timezone: &str) -> Result<Self> {
        Ok(Self { timezone: parse_timezone(timezone)? })
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn timezone(&self) -> Tz {
        self.timezone
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    timezone: Tz,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
            timezone: Tz::UTC,
        }
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn timezone(&self) -> Tz {
        self.timezone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::minutes(61));
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2025, 1, 10, 10, 1, 0).unwrap());
    }

    #[test]
    fn test_local_conversion() {
        let instant = Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::new(instant).with_timezone(chrono_tz::Europe::London);
        // British Summer Time
        assert_eq!(clock.to_local(instant).hour(), 13);
    }

    #[test]
    fn test_system_clock_rejects_unknown_zone() {
        assert!(SystemClock::new("Europe/London").is_ok());
        assert!(SystemClock::new("Nowhere/Special").is_err());
    }
}
