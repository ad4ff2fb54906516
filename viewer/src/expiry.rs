use chrono::{DateTime, Utc};
use serde::Serialize;

const SECONDS_PER_DAY: i64 = 86_400;

/// Where a certificate sits relative to its notAfter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryBand {
    Expired,
    ExpiringSoon,
    Valid,
}

/// notAfter is strictly before `now`.
pub fn is_expired(not_after: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    not_after < now
}

/// Days from `now` to `not_after`, rounded up. Negative once expired.
pub fn days_until_expiry(not_after: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let delta = not_after - now;
    // num_seconds truncates toward zero; a positive remainder rounds up.
    let seconds = delta.num_seconds() + i64::from(delta.subsec_nanos() > 0);
    seconds.div_euclid(SECONDS_PER_DAY) + i64::from(seconds.rem_euclid(SECONDS_PER_DAY) != 0)
}

pub fn expiry_band(not_after: DateTime<Utc>, now: DateTime<Utc>, expiring_soon_days: i64) -> ExpiryBand {
    if is_expired(not_after, now) {
        return ExpiryBand::Expired;
    }
    let days = days_until_expiry(not_after, now);
    if days > 0 && days <= expiring_soon_days {
        ExpiryBand::ExpiringSoon
    } else {
        ExpiryBand::Valid
    }
}
