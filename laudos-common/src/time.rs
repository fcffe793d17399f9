//! Timestamp utilities

use chrono::{DateTime, Duration, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Unix timestamp (seconds) `ttl` from now
pub fn unix_after(ttl: Duration) -> i64 {
    (now() + ttl).timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // After 2000-01-01 and before 2100-01-01
        assert!(timestamp.timestamp() > 946_684_800);
        assert!(timestamp.timestamp() < 4_102_444_800);
    }

    #[test]
    fn test_unix_after_is_in_future() {
        let base = now().timestamp();
        let later = unix_after(Duration::minutes(5));
        assert!(later >= base + 299);
        assert!(later <= base + 301);
    }

    #[test]
    fn test_unix_after_negative_is_in_past() {
        let base = now().timestamp();
        assert!(unix_after(Duration::seconds(-60)) < base);
    }
}
