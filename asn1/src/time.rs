//! UTCTime and GeneralizedTime parsing.
//!
//! Both forms are normalised to an absolute `DateTime<Utc>`. Explicit
//! `+hhmm`/`-hhmm` offsets are applied; a GeneralizedTime without a zone is
//! taken as UTC.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

use crate::error::Error;

/*
RFC 5280 Section 4.1.2.5.1

Where YY is greater than or equal to 50, the year SHALL be
interpreted as 19YY; and
Where YY is less than 50, the year SHALL be interpreted as 20YY.
*/
const UTC_TIME_PIVOT: u32 = 50;

pub(crate) fn parse_utc_time(data: &[u8]) -> Result<DateTime<Utc>, Error> {
    let text = ascii(data).ok_or(Error::UtcTimeInvalidFormat)?;
    let (digits, offset) = split_zone(text, true).ok_or(Error::UtcTimeInvalidFormat)?;
    if !(digits.len() == 10 || digits.len() == 12) || !all_digits(digits) {
        return Err(Error::UtcTimeInvalidFormat);
    }

    let yy = field(digits, 0, 2).ok_or(Error::UtcTimeInvalidFormat)?;
    let year = if yy >= UTC_TIME_PIVOT {
        1900 + yy
    } else {
        2000 + yy
    };
    let second = if digits.len() == 12 {
        field(digits, 10, 12).ok_or(Error::UtcTimeInvalidFormat)?
    } else {
        0
    };

    build(
        year as i32,
        field(digits, 2, 4),
        field(digits, 4, 6),
        field(digits, 6, 8),
        field(digits, 8, 10),
        second,
        0,
        offset,
    )
    .ok_or(Error::UtcTimeInvalidFormat)
}

pub(crate) fn parse_generalized_time(data: &[u8]) -> Result<DateTime<Utc>, Error> {
    let text = ascii(data).ok_or(Error::GeneralizedTimeInvalidFormat)?;
    let (body, offset) = split_zone(text, false).ok_or(Error::GeneralizedTimeInvalidFormat)?;
    let (digits, fraction) = match body.find(['.', ',']) {
        Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
        None => (body, None),
    };
    if !matches!(digits.len(), 10 | 12 | 14) || !all_digits(digits) {
        return Err(Error::GeneralizedTimeInvalidFormat);
    }

    let nanos = match fraction {
        Some(f) if !f.is_empty() && all_digits(f) => {
            // keep nanosecond precision, drop anything finer.
            let padded = format!("{:0<9}", &f[..f.len().min(9)]);
            padded
                .parse::<u32>()
                .map_err(|_| Error::GeneralizedTimeInvalidFormat)?
        }
        Some(_) => return Err(Error::GeneralizedTimeInvalidFormat),
        None => 0,
    };

    let year = field(digits, 0, 4).ok_or(Error::GeneralizedTimeInvalidFormat)?;
    let minute = if digits.len() >= 12 {
        field(digits, 10, 12)
    } else {
        Some(0)
    };
    let second = if digits.len() == 14 {
        field(digits, 12, 14)
    } else {
        Some(0)
    };

    build(
        year as i32,
        field(digits, 4, 6),
        field(digits, 6, 8),
        field(digits, 8, 10),
        minute,
        second.ok_or(Error::GeneralizedTimeInvalidFormat)?,
        nanos,
        offset,
    )
    .ok_or(Error::GeneralizedTimeInvalidFormat)
}

fn ascii(data: &[u8]) -> Option<&str> {
    if !data.is_ascii() {
        return None;
    }
    std::str::from_utf8(data).ok()
}

fn all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn field(digits: &str, start: usize, end: usize) -> Option<u32> {
    digits.get(start..end)?.parse().ok()
}

/// Splits the trailing zone designator off `text`, returning the offset east
/// of UTC in seconds.
fn split_zone(text: &str, zone_required: bool) -> Option<(&str, i32)> {
    if let Some(body) = text.strip_suffix('Z') {
        return Some((body, 0));
    }
    if text.len() > 5 {
        let (body, zone) = text.split_at(text.len() - 5);
        let sign = match zone.as_bytes().first() {
            Some(b'+') => Some(1),
            Some(b'-') => Some(-1),
            _ => None,
        };
        if let Some(sign) = sign {
            let zone = &zone[1..];
            if !all_digits(zone) {
                return None;
            }
            let hours = field(zone, 0, 2)? as i32;
            let minutes = field(zone, 2, 4)? as i32;
            if hours > 23 || minutes > 59 {
                return None;
            }
            return Some((body, sign * (hours * 3600 + minutes * 60)));
        }
    }
    if zone_required { None } else { Some((text, 0)) }
}

#[allow(clippy::too_many_arguments)]
fn build(
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
    second: u32,
    nanos: u32,
    offset_secs: i32,
) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(year, month?, day?)?.and_hms_nano_opt(
        hour?,
        minute?,
        second,
        nanos,
    )?;
    let offset = FixedOffset::east_opt(offset_secs)?;
    let local = offset.from_local_datetime(&naive).single()?;
    Some(local.with_timezone(&Utc))
}
