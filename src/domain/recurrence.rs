//! Recurrence specification and sequential invoice numbering.

use std::{fmt, num::NonZeroU32, str::FromStr};

use chrono::{Datelike, NaiveDate};

use super::error::DomainError;

/// Date format shared by configuration values, filenames and the `date` placeholder.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Day,
    Week,
    Month,
}

impl IntervalUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalUnit::Day => "day",
            IntervalUnit::Week => "week",
            IntervalUnit::Month => "month",
        }
    }
}

impl FromStr for IntervalUnit {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "day" => Ok(IntervalUnit::Day),
            "week" => Ok(IntervalUnit::Week),
            "month" => Ok(IntervalUnit::Month),
            other => Err(DomainError::invalid_unit(other)),
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How often invoices are issued, and from when they are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceSpec {
    pub start_date: NaiveDate,
    pub unit: IntervalUnit,
    pub quantity: NonZeroU32,
}

impl RecurrenceSpec {
    pub fn new(start_date: NaiveDate, unit: IntervalUnit, quantity: NonZeroU32) -> Self {
        Self {
            start_date,
            unit,
            quantity,
        }
    }

    /// Build a spec from the three raw configuration strings.
    pub fn parse(start_date: &str, unit: &str, quantity: &str) -> Result<Self, DomainError> {
        let start_date = parse_date(start_date)?;
        let unit = unit.parse::<IntervalUnit>()?;
        let quantity = quantity
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| {
                DomainError::configuration(format!(
                    "interval_quantity `{quantity}` must be a positive integer"
                ))
            })?;
        Ok(Self::new(start_date, unit, quantity))
    }

    /// Whole units elapsed between the start date and `today`.
    pub fn elapsed_units(&self, today: NaiveDate) -> Result<u32, DomainError> {
        if today < self.start_date {
            return Err(DomainError::configuration(format!(
                "start_date {} is after the run date {}",
                self.start_date.format(DATE_FORMAT),
                today.format(DATE_FORMAT)
            )));
        }

        let days = (today - self.start_date).num_days();
        let elapsed = match self.unit {
            IntervalUnit::Day => days,
            IntervalUnit::Week => days / 7,
            IntervalUnit::Month => i64::from(whole_months_between(self.start_date, today)),
        };

        u32::try_from(elapsed).map_err(|_| {
            DomainError::configuration(format!("elapsed {}s out of range", self.unit))
        })
    }

    /// Sequential invoice number for `today`, zero-padded to three digits.
    pub fn invoice_number(&self, today: NaiveDate) -> Result<String, DomainError> {
        let elapsed = self.elapsed_units(today)?;
        let ratio = (f64::from(elapsed) + 1.0) / f64::from(self.quantity.get());
        let number = ratio.round_ties_even() as u64;
        Ok(format!("{number:03}"))
    }

    /// Cron schedule firing once per interval at midnight.
    pub fn cron_expression(&self) -> String {
        let quantity = self.quantity.get();
        match self.unit {
            IntervalUnit::Month => format!("0 0 1 */{quantity} *"),
            IntervalUnit::Week => format!("0 0 * * {quantity}"),
            IntervalUnit::Day => format!("0 0 */{quantity} * *"),
        }
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|err| {
        DomainError::configuration(format!("`{value}` is not a YYYY-MM-DD date: {err}"))
    })
}

fn whole_months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if end.day() < start.day() {
        months - 1
    } else {
        months
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        parse_date(value).expect("valid date")
    }

    fn spec(start: &str, unit: IntervalUnit, quantity: u32) -> RecurrenceSpec {
        RecurrenceSpec::new(
            date(start),
            unit,
            NonZeroU32::new(quantity).expect("non-zero quantity"),
        )
    }

    #[test]
    fn monthly_number_counts_whole_months_plus_one() {
        let spec = spec("2026-01-15", IntervalUnit::Month, 1);
        assert_eq!(spec.invoice_number(date("2026-04-15")).unwrap(), "004");
        assert_eq!(spec.invoice_number(date("2026-04-14")).unwrap(), "003");
        assert_eq!(spec.invoice_number(date("2026-01-15")).unwrap(), "001");
    }

    #[test]
    fn months_span_year_boundaries() {
        let spec = spec("2025-11-10", IntervalUnit::Month, 1);
        assert_eq!(spec.elapsed_units(date("2026-02-10")).unwrap(), 3);
        assert_eq!(spec.elapsed_units(date("2027-11-10")).unwrap(), 24);
    }

    #[test]
    fn short_month_end_is_not_a_whole_month() {
        let spec = spec("2026-01-31", IntervalUnit::Month, 1);
        assert_eq!(spec.elapsed_units(date("2026-02-28")).unwrap(), 0);
        assert_eq!(spec.elapsed_units(date("2026-03-31")).unwrap(), 2);
    }

    #[test]
    fn weekly_and_daily_numbers() {
        let weekly = spec("2026-01-01", IntervalUnit::Week, 1);
        assert_eq!(weekly.invoice_number(date("2026-01-15")).unwrap(), "003");
        assert_eq!(weekly.invoice_number(date("2026-01-14")).unwrap(), "002");

        let daily = spec("2026-01-01", IntervalUnit::Day, 2);
        assert_eq!(daily.invoice_number(date("2026-01-04")).unwrap(), "002");
    }

    #[test]
    fn halves_round_to_even() {
        let daily = spec("2026-01-01", IntervalUnit::Day, 2);
        // (0 + 1) / 2 = 0.5
        assert_eq!(daily.invoice_number(date("2026-01-01")).unwrap(), "000");
        // (2 + 1) / 2 = 1.5
        assert_eq!(daily.invoice_number(date("2026-01-03")).unwrap(), "002");
    }

    #[test]
    fn start_after_today_is_a_configuration_error() {
        let spec = spec("2026-05-01", IntervalUnit::Day, 1);
        let err = spec.invoice_number(date("2026-04-30")).unwrap_err();
        assert!(
            matches!(err, DomainError::Configuration { .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn parse_rejects_unknown_unit_and_zero_quantity() {
        let err = RecurrenceSpec::parse("2026-01-01", "fortnight", "1").unwrap_err();
        assert_eq!(err, DomainError::invalid_unit("fortnight"));

        let err = RecurrenceSpec::parse("2026-01-01", "month", "0").unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));

        let parsed = RecurrenceSpec::parse("2026-01-01", "week", " 2 ").unwrap();
        assert_eq!(parsed.unit, IntervalUnit::Week);
        assert_eq!(parsed.quantity.get(), 2);
    }

    #[test]
    fn cron_expressions_follow_the_unit() {
        assert_eq!(
            spec("2026-01-01", IntervalUnit::Month, 3).cron_expression(),
            "0 0 1 */3 *"
        );
        assert_eq!(
            spec("2026-01-01", IntervalUnit::Week, 1).cron_expression(),
            "0 0 * * 1"
        );
        assert_eq!(
            spec("2026-01-01", IntervalUnit::Day, 5).cron_expression(),
            "0 0 */5 * *"
        );
    }
}
