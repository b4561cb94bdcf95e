// src/services/calendar.rs

use crate::errors::{AppError, AppResult};
use chrono::{Datelike, Months, NaiveDate, Weekday};

/// Saturday and Sunday are non-working days.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Every date in `[start, end]`, both ends included.
pub fn dates_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

pub fn working_dates_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    dates_between(start, end).filter(|d| !is_weekend(*d)).collect()
}

/// `end - start + 1` in days.
pub fn inclusive_day_count(start: NaiveDate, end: NaiveDate) -> i32 {
    (end - start).num_days() as i32 + 1
}

/// A calendar month addressed as "YYYY-MM".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayPeriod {
    pub month: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PayPeriod {
    pub fn parse(month: &str) -> AppResult<Self> {
        let invalid = || AppError::Validation(format!("Month '{}' must be in YYYY-MM format", month));

        if month.len() != 7 || month.as_bytes()[4] != b'-' {
            return Err(invalid());
        }
        let start = NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
            .map_err(|_| invalid())?;
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(invalid)?;

        Ok(Self {
            month: month.to_string(),
            start,
            end,
        })
    }

    pub fn working_days(&self) -> i32 {
        working_dates_between(self.start, self.end).len() as i32
    }
}
