//! alfred-brief domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Ingestion, digest selection, rendering, dispatch and subscriptions

pub mod model;
pub mod ports;
pub mod usecases;

pub use model::*;
pub use ports::*;

use sha2::{Digest, Sha256};
use time::{OffsetDateTime, Time, UtcOffset};

/// Start of the UTC calendar day containing `now`.
///
/// Items with `scraped_at` at or after this instant belong to the current period.
pub fn period_start(now: OffsetDateTime) -> OffsetDateTime {
    now.to_offset(UtcOffset::UTC).replace_time(Time::MIDNIGHT)
}

/// Compute a deterministic key for one digest delivery.
///
/// The key covers the recipient, the period and the rendered payload. A rerun
/// with an identical digest reuses the key, while any change to the subject or
/// body yields a new one.
pub fn compute_send_key(
    email: &str,
    period: OffsetDateTime,
    subject: &str,
    html: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.to_ascii_lowercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(period.date().to_string().as_bytes());
    hasher.update(b"\n");
    hasher.update(subject.as_bytes());
    hasher.update(b"\n");
    hasher.update(html.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_start_truncates_to_utc_midnight() {
        let now = OffsetDateTime::from_unix_timestamp(1_760_600_000).unwrap();
        let start = period_start(now);

        assert_eq!(start.date(), now.date());
        assert_eq!(start.time(), Time::MIDNIGHT);
        assert_eq!(start.offset(), UtcOffset::UTC);
        assert!(start <= now);
    }

    #[test]
    fn test_period_start_normalizes_offset() {
        // 2025-10-16T01:30:00+03:00 is 2025-10-15T22:30:00Z
        let offset = UtcOffset::from_hms(3, 0, 0).unwrap();
        let local = OffsetDateTime::from_unix_timestamp(1_760_567_400)
            .unwrap()
            .to_offset(offset);
        let start = period_start(local);

        assert_eq!(start.unix_timestamp(), 1_760_486_400);
    }

    #[test]
    fn test_send_key_follows_payload() {
        let period = OffsetDateTime::from_unix_timestamp(1_760_572_800).unwrap();
        let a = compute_send_key("a@example.com", period, "Brief", "<p>1.3400</p>");
        let b = compute_send_key("A@example.com", period, "Brief", "<p>1.3400</p>");
        let c = compute_send_key("a@example.com", period, "Brief", "<p>1.3500</p>");
        let d = compute_send_key("a@example.com", period, "Other", "<p>1.3400</p>");
        let next_day = period + time::Duration::days(1);
        let e = compute_send_key("a@example.com", next_day, "Brief", "<p>1.3400</p>");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_ne!(a, e);
    }
}
