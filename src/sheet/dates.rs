#![forbid(unsafe_code)]

use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

const ISO_T: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const ISO_SPACE: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const ISO_DATE: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// Accepts RFC 3339, `YYYY-MM-DD[ HH:MM:SS]`, `M/D/YYYY` and `Mon D, YYYY`.
/// Values without an offset are taken as UTC.
#[must_use]
pub fn parse_date(raw: &str) -> Option<OffsetDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(dt);
    }
    if let Ok(dt) = PrimitiveDateTime::parse(s, ISO_T) {
        return Some(dt.assume_utc());
    }
    if let Ok(dt) = PrimitiveDateTime::parse(s, ISO_SPACE) {
        return Some(dt.assume_utc());
    }
    if let Ok(d) = Date::parse(s, ISO_DATE) {
        return Some(midnight(d));
    }
    parse_slashed(s).or_else(|| parse_named_month(s)).map(midnight)
}

/// `MM/DD/YYYY`, used for every date cell in exports.
#[must_use]
pub fn format_short(dt: OffsetDateTime) -> String {
    dt.format(format_description!("[month]/[day]/[year]"))
        .unwrap_or_default()
}

#[must_use]
pub fn format_short_opt(dt: Option<OffsetDateTime>) -> String {
    dt.map(format_short).unwrap_or_default()
}

/// Sortable and safe in file names.
#[must_use]
pub fn file_timestamp(dt: OffsetDateTime) -> String {
    dt.format(format_description!(
        "[year]-[month]-[day]T[hour]-[minute]-[second]"
    ))
    .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

#[must_use]
pub fn format_rfc3339(dt: OffsetDateTime) -> String {
    dt.format(&Rfc3339).unwrap_or_else(|_| "unknown".to_owned())
}

fn midnight(d: Date) -> OffsetDateTime {
    PrimitiveDateTime::new(d, Time::MIDNIGHT).assume_utc()
}

fn parse_slashed(s: &str) -> Option<Date> {
    let mut parts = s.split('/');
    let month: u8 = parts.next()?.trim().parse().ok()?;
    let day: u8 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let year = if year < 100 { 2000 + year } else { year };
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

fn parse_named_month(s: &str) -> Option<Date> {
    let cleaned = s.replace(',', " ");
    let mut parts = cleaned.split_whitespace();
    let name = parts.next()?.to_lowercase();
    let day: u8 = parts.next()?.parse().ok()?;
    let year: i32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let month = match name.get(..3)? {
        "jan" => Month::January,
        "feb" => Month::February,
        "mar" => Month::March,
        "apr" => Month::April,
        "may" => Month::May,
        "jun" => Month::June,
        "jul" => Month::July,
        "aug" => Month::August,
        "sep" => Month::September,
        "oct" => Month::October,
        "nov" => Month::November,
        "dec" => Month::December,
        _ => return None,
    };
    Date::from_calendar_date(year, month, day).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_supported_shapes() {
        let day = datetime!(2024-03-05 0:00 UTC);
        assert_eq!(parse_date("2024-03-05"), Some(day));
        assert_eq!(parse_date("3/5/2024"), Some(day));
        assert_eq!(parse_date("03/05/2024"), Some(day));
        assert_eq!(parse_date("Mar 5, 2024"), Some(day));
        assert_eq!(
            parse_date("2024-03-05T10:30:00.500Z"),
            Some(datetime!(2024-03-05 10:30:00.5 UTC))
        );
        assert_eq!(
            parse_date("2024-03-05T10:30:00"),
            Some(datetime!(2024-03-05 10:30 UTC))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("next week"), None);
        assert_eq!(parse_date("13/40/2024"), None);
        assert_eq!(parse_date("1/2/3/4"), None);
    }

    #[test]
    fn formats_short_and_file_stamps() {
        let dt = datetime!(2024-03-05 14:07:09 UTC);
        assert_eq!(format_short(dt), "03/05/2024");
        assert_eq!(format_short_opt(None), "");
        assert_eq!(file_timestamp(dt), "2024-03-05T14-07-09");
        assert_eq!(parse_date(&format_short(dt)), Some(datetime!(2024-03-05 0:00 UTC)));
    }
}
