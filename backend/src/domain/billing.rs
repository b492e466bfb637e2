//! Billing-cycle logic for monthly tuition payments.
//!
//! Every student owes one payment per calendar month, keyed `"YYYY-MM"`.
//! The due date is anchored to the student's registration day-of-month:
//! a student who registered on the 15th owes for month X by the 15th of
//! month X+1. All computation here is pure; the caller supplies the
//! student data and (for status) the current date.

use chrono::{Datelike, Local, NaiveDate};
use std::collections::BTreeMap;

use shared::{PaymentState, PaymentStatus, Student};

/// Stateless billing engine. Maps (student, month, year) to a payment
/// deadline and a derived payment status; never touches storage.
#[derive(Clone, Default)]
pub struct BillingEngine;

impl BillingEngine {
    pub fn new() -> Self {
        Self
    }

    /// The `"YYYY-MM"` key a payment for (month, year) is recorded under.
    pub fn period_key(&self, month: u32, year: i32) -> String {
        format!("{}-{:02}", year, month)
    }

    /// Payment deadline for the given billing month, or `None` when the
    /// student has no usable registration date.
    ///
    /// The anniversary day within the billing month is clamped to the
    /// month's last day (a day-31 registration bills on the 30th in a
    /// 30-day month), then advanced exactly one calendar month with the
    /// same clamp.
    pub fn deadline(&self, student: &Student, month: u32, year: i32) -> Option<NaiveDate> {
        if !(1..=12).contains(&month) {
            return None;
        }
        let registered = student.registration_date()?;
        let anniversary = clamped_date(year, month, registered.day())?;
        let (next_month, next_year) = if month == 12 { (1, year + 1) } else { (month + 1, year) };
        clamped_date(next_year, next_month, anniversary.day())
    }

    /// Derived payment status using the local calendar date as "today".
    pub fn payment_status(&self, student: &Student, month: u32, year: i32) -> PaymentStatus {
        self.payment_status_on(student, month, year, Local::now().date_naive())
    }

    /// Derived payment status with an explicit "today", so overdue
    /// classification is testable.
    ///
    /// Periods that end before the student registered report `none`;
    /// registering on any day within the billing month still makes that
    /// month billable. Recorded payments compare date-only against the
    /// deadline: on or before is `paid`, after is `paid-late`. Without a
    /// recorded payment the period is `overdue` once today passes the
    /// deadline, `pending` otherwise.
    pub fn payment_status_on(
        &self,
        student: &Student,
        month: u32,
        year: i32,
        today: NaiveDate,
    ) -> PaymentStatus {
        let Some(deadline) = self.deadline(student, month, year) else {
            return none_status();
        };
        // deadline() already proved the registration date parses.
        let registered = match student.registration_date() {
            Some(d) => d,
            None => return none_status(),
        };
        let Some(month_end) = last_day_of_month(year, month) else {
            return none_status();
        };
        if registered > month_end {
            return none_status();
        }

        let key = self.period_key(month, year);
        if let Some(paid_str) = student.payments.get(&key) {
            if let Some(paid) = parse_payment_date(paid_str) {
                if paid > deadline {
                    return PaymentStatus {
                        status: PaymentState::PaidLate,
                        label: "Lunas (Telat)".to_string(),
                        payment_date: Some(paid_str.clone()),
                        is_overdue: false,
                    };
                }
                return PaymentStatus {
                    status: PaymentState::Paid,
                    label: "Lunas".to_string(),
                    payment_date: Some(paid_str.clone()),
                    is_overdue: false,
                };
            }
            log::warn!(
                "unparseable payment date '{}' for {} period {}",
                paid_str,
                student.name,
                key
            );
        }

        if today > deadline {
            PaymentStatus {
                status: PaymentState::Overdue,
                label: "Telat".to_string(),
                payment_date: None,
                is_overdue: true,
            }
        } else {
            PaymentStatus {
                status: PaymentState::Pending,
                label: "Belum".to_string(),
                payment_date: None,
                is_overdue: false,
            }
        }
    }

    /// Upsert or clear the payment for one period. A non-empty value
    /// records the payment date; an empty value unsets the period, which
    /// reverts its status to whatever pending/overdue evaluates to.
    pub fn apply_payment(
        &self,
        payments: &mut BTreeMap<String, String>,
        month: u32,
        year: i32,
        payment_date: &str,
    ) {
        let key = self.period_key(month, year);
        let value = payment_date.trim();
        if value.is_empty() {
            payments.remove(&key);
        } else {
            payments.insert(key, value.to_string());
        }
    }
}

/// Construct (year, month, day) clamping an overflowing day to the last
/// day of the month. `None` only when the month itself is out of range.
fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).or_else(|| last_day_of_month(year, month))
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_month, next_year) = if month == 12 { (1, year + 1) } else { (month + 1, year) };
    // First of the next month, minus one day.
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Payment dates are stored as `YYYY-MM-DD`; tolerate a time component
/// and compare date-only to avoid off-by-one from times of day.
fn parse_payment_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.trim().split('T').next().unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn none_status() -> PaymentStatus {
    PaymentStatus {
        status: PaymentState::None,
        label: "-".to_string(),
        payment_date: None,
        is_overdue: false,
    }
}
