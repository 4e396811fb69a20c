// Process-wide monotonic timestamps
//
// `updated_at` doubles as the replay cursor, so every mutation must observe a
// strictly larger timestamp than the one before it. Timestamps are truncated
// to microseconds, which is what PostgreSQL `timestamptz` stores and what the
// cursor renders.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_MICROS: AtomicI64 = AtomicI64::new(0);

/// Current time, strictly greater than any value previously returned
pub fn monotonic_now() -> DateTime<Utc> {
    let wall = Utc::now().timestamp_micros();
    let mut prev = LAST_MICROS.load(Ordering::Relaxed);
    loop {
        let next = wall.max(prev + 1);
        match LAST_MICROS.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return DateTime::from_timestamp_micros(next).unwrap_or_else(Utc::now),
            Err(actual) => prev = actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strictly_increasing() {
        let mut last = monotonic_now();
        for _ in 0..1000 {
            let next = monotonic_now();
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn test_microsecond_precision() {
        let ts = monotonic_now();
        assert_eq!(ts.timestamp_subsec_nanos() % 1000, 0);
    }
}
