//! Next-occurrence arithmetic for birthdays.
//!
//! A Feb 29 birthday falls on March 1 in years without a leap day.

use chrono::{Datelike, NaiveDate};

/// The first anniversary of `birthday` on or after `today`.
///
/// Returns `None` only when the anniversary lies outside chrono's
/// representable range.
pub fn next_birthday(birthday: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    let this_year = anniversary_in(birthday, today.year())?;
    if this_year >= today {
        return Some(this_year);
    }
    anniversary_in(birthday, today.year() + 1)
}

/// Whole days from `today` until the next anniversary; `0` on the day itself.
pub fn days_until_birthday(birthday: NaiveDate, today: NaiveDate) -> Option<i64> {
    next_birthday(birthday, today).map(|next| (next - today).num_days())
}

fn anniversary_in(birthday: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, birthday.month(), birthday.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
}
