use chrono::{NaiveDate, NaiveDateTime};

/// Day-first layouts printed by the local source. The two-digit year comes
/// first: chrono's `%Y` also accepts `24` and would read it as year 24.
const DAY_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%d.%m.%y %H:%M",
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M",
];

const DAY_FIRST_DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y"];

const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a day-first datetime (`05.01.2024 21:00`). A bare date is read as midnight.
pub fn parse_day_first(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DAY_FIRST_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DAY_FIRST_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a filter literal into a datetime: ISO-like first, then day-first.
pub fn parse_datetime_literal(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ISO_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .or_else(|| parse_day_first(s))
}

/// 1 January of `year`, for the whole years 1..=9999.
pub fn year_start(year: f64) -> Option<NaiveDate> {
    if !year.is_finite() || year.fract() != 0.0 || !(1.0..=9999.0).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year as i32, 1, 1)
}

fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Days since 1970-01-01, the Arrow `Date32` representation.
pub fn date_to_days(date: NaiveDate) -> i32 {
    (date - unix_epoch()).num_days() as i32
}

pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    unix_epoch().checked_add_signed(chrono::Duration::days(days as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day_first() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(21, 0, 0)
            .unwrap();
        assert_eq!(parse_day_first("05.01.2024 21:00"), Some(expected));
        assert_eq!(parse_day_first(" 5.1.2024 21:00 "), Some(expected));
        assert_eq!(parse_day_first("05/01/2024 21:00"), Some(expected));
        assert_eq!(parse_day_first("05.01.24 21:00"), Some(expected));
        assert_eq!(parse_day_first("not a date"), None);
    }

    #[test]
    fn test_day_first_is_not_month_first() {
        let parsed = parse_day_first("02.03.2024 10:00").unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    }

    #[test]
    fn test_parse_datetime_literal() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_datetime_literal("2024-01-05"), Some(expected));
        assert_eq!(parse_datetime_literal("2024-01-05 00:00:00"), Some(expected));
        assert_eq!(parse_datetime_literal("05.01.2024"), Some(expected));
    }

    #[test]
    fn test_year_start() {
        assert_eq!(year_start(2015.0), NaiveDate::from_ymd_opt(2015, 1, 1));
        assert_eq!(year_start(2015.5), None);
        assert_eq!(year_start(f64::NAN), None);
        assert_eq!(year_start(0.0), None);
    }

    #[test]
    fn test_days_round_trip_epoch() {
        let date = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        assert_eq!(date_to_days(date), 1);
        assert_eq!(days_to_date(1), Some(date));
    }
}
