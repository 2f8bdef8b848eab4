//! Conversion of RCS `date` fields to Unix timestamps.
//!
//! RCS stores dates as `Y.mm.dd.hh.mm.ss` in UTC. Files written before 2000
//! use a two-digit year that is implicitly in the 1900s; later files use the
//! full four-digit year.

use time::{Date, Month, PrimitiveDateTime, Time};

use crate::error::{ParseError, ParseResult};

/// Parses an RCS date such as `2004.03.15.10.20.30` or `95.10.18.08.38.49`.
pub fn parse_rcs_date(field: &str) -> ParseResult<i64> {
    let invalid = || ParseError::InvalidDate(field.to_owned());

    let parts = field
        .split('.')
        .map(str::parse::<i32>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    let [year, month, day, hour, minute, second] = parts[..] else {
        return Err(invalid());
    };

    let year = if (0..100).contains(&year) {
        1900 + year
    } else {
        year
    };

    let month = u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or_else(invalid)?;
    let narrow = |value: i32| u8::try_from(value).map_err(|_| invalid());

    let date = Date::from_calendar_date(year, month, narrow(day)?).map_err(|_| invalid())?;
    let time = Time::from_hms(narrow(hour)?, narrow(minute)?, narrow(second)?)
        .map_err(|_| invalid())?;

    Ok(PrimitiveDateTime::new(date, time).assume_utc().unix_timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_digit_years_are_twentieth_century() {
        assert_eq!(parse_rcs_date("95.10.18.08.38.49").expect("date"), 814_005_529);
    }

    #[test]
    fn four_digit_years_are_taken_verbatim() {
        assert_eq!(parse_rcs_date("2001.09.09.01.46.40").expect("date"), 1_000_000_000);
    }

    #[test]
    fn epoch_parses_to_zero() {
        assert_eq!(parse_rcs_date("1970.01.01.00.00.00").expect("date"), 0);
    }

    #[test]
    fn malformed_dates_are_rejected() {
        for field in ["", "2004.03.15", "2004.13.01.00.00.00", "2004.02.30.00.00.00", "x.1.1.1.1.1"] {
            let err = parse_rcs_date(field).expect_err(field);
            assert!(matches!(err, ParseError::InvalidDate(ref f) if f == field));
        }
    }
}
