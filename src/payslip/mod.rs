// src/payslip/mod.rs

pub mod labels;
pub mod parser;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use labels::FieldName;

pub use parser::{PayslipParser, parse_text};

/// Pay period a statement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u8,
}

impl Period {
    pub fn of(date: Date) -> Self {
        Self {
            year: date.year(),
            month: u8::from(date.month()),
        }
    }
}

/// The two unlabeled aggregates recovered by position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub total_earnings: i64,
    pub total_deductions: i64,
}

/// A coerced value read from the token after a label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Minutes(u32),
    Amount(i64),
    Days(f64),
}

impl FieldValue {
    fn minutes(self) -> u32 {
        match self {
            FieldValue::Minutes(m) => m,
            FieldValue::Amount(a) => u32::try_from(a).unwrap_or(0),
            FieldValue::Days(d) => d.max(0.0) as u32,
        }
    }

    fn amount(self) -> i64 {
        match self {
            FieldValue::Minutes(m) => i64::from(m),
            FieldValue::Amount(a) => a,
            FieldValue::Days(d) => d as i64,
        }
    }

    fn days(self) -> f64 {
        match self {
            FieldValue::Minutes(m) => f64::from(m),
            FieldValue::Amount(a) => a as f64,
            FieldValue::Days(d) => d,
        }
    }
}

/// Structured contents of one monthly salary statement.
///
/// Always fully populated: a field that could not be read stays at zero
/// (or the current period for `year`/`month`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayslipRecord {
    pub year: i32,
    pub month: u8,

    // attendance
    pub extra_overtime_minutes: u32,
    pub over60_overtime_minutes: u32,
    pub night_overtime_minutes: u32,
    pub paid_leave_days: f64,
    pub paid_leave_remaining_days: f64,

    // earnings
    pub base_salary: i64,
    pub fixed_overtime_allowance: i64,
    pub overtime_allowance: i64,
    pub over60_overtime_allowance: i64,
    pub night_allowance: i64,
    pub special_allowance: i64,
    pub expense_reimbursement: i64,
    pub commute_allowance: i64,
    pub stock_incentive: i64,
    pub total_earnings: i64,

    // deductions
    pub health_insurance: i64,
    pub pension_insurance: i64,
    pub employment_insurance: i64,
    pub resident_tax: i64,
    pub income_tax: i64,
    pub stock_contribution: i64,
    pub total_deductions: i64,

    pub net_salary: i64,
}

impl PayslipRecord {
    /// All-zero record for the period containing `date`. Serves as the
    /// parser's starting state and as the fallback when a document could
    /// not be read at all.
    pub fn default_for(date: Date) -> Self {
        let Period { year, month } = Period::of(date);
        Self {
            year,
            month,
            extra_overtime_minutes: 0,
            over60_overtime_minutes: 0,
            night_overtime_minutes: 0,
            paid_leave_days: 0.0,
            paid_leave_remaining_days: 0.0,
            base_salary: 0,
            fixed_overtime_allowance: 0,
            overtime_allowance: 0,
            over60_overtime_allowance: 0,
            night_allowance: 0,
            special_allowance: 0,
            expense_reimbursement: 0,
            commute_allowance: 0,
            stock_incentive: 0,
            total_earnings: 0,
            health_insurance: 0,
            pension_insurance: 0,
            employment_insurance: 0,
            resident_tax: 0,
            income_tax: 0,
            stock_contribution: 0,
            total_deductions: 0,
            net_salary: 0,
        }
    }

    pub fn period(&self) -> Period {
        Period {
            year: self.year,
            month: self.month,
        }
    }

    pub fn with_period(self, period: Period) -> Self {
        Self {
            year: period.year,
            month: period.month,
            ..self
        }
    }

    pub fn with_totals(self, totals: Totals) -> Self {
        Self {
            total_earnings: totals.total_earnings,
            total_deductions: totals.total_deductions,
            ..self
        }
    }

    /// Write a coerced value into the field a label maps to.
    pub fn set(&mut self, field: FieldName, value: FieldValue) {
        match field {
            FieldName::ExtraOvertimeMinutes => self.extra_overtime_minutes = value.minutes(),
            FieldName::Over60OvertimeMinutes => self.over60_overtime_minutes = value.minutes(),
            FieldName::NightOvertimeMinutes => self.night_overtime_minutes = value.minutes(),
            FieldName::PaidLeaveDays => self.paid_leave_days = value.days(),
            FieldName::PaidLeaveRemainingDays => self.paid_leave_remaining_days = value.days(),
            FieldName::BaseSalary => self.base_salary = value.amount(),
            FieldName::FixedOvertimeAllowance => self.fixed_overtime_allowance = value.amount(),
            FieldName::OvertimeAllowance => self.overtime_allowance = value.amount(),
            FieldName::Over60OvertimeAllowance => self.over60_overtime_allowance = value.amount(),
            FieldName::NightAllowance => self.night_allowance = value.amount(),
            FieldName::SpecialAllowance => self.special_allowance = value.amount(),
            FieldName::ExpenseReimbursement => self.expense_reimbursement = value.amount(),
            FieldName::CommuteAllowance => self.commute_allowance = value.amount(),
            FieldName::StockIncentive => self.stock_incentive = value.amount(),
            FieldName::TotalEarnings => self.total_earnings = value.amount(),
            FieldName::HealthInsurance => self.health_insurance = value.amount(),
            FieldName::PensionInsurance => self.pension_insurance = value.amount(),
            FieldName::EmploymentInsurance => self.employment_insurance = value.amount(),
            FieldName::ResidentTax => self.resident_tax = value.amount(),
            FieldName::IncomeTax => self.income_tax = value.amount(),
            FieldName::StockContribution => self.stock_contribution = value.amount(),
            FieldName::TotalDeductions => self.total_deductions = value.amount(),
            FieldName::NetSalary => self.net_salary = value.amount(),
        }
    }

    /// How many of the non-period fields ended up non-zero.
    pub fn coverage(&self) -> (usize, usize) {
        let amounts = [
            self.base_salary,
            self.fixed_overtime_allowance,
            self.overtime_allowance,
            self.over60_overtime_allowance,
            self.night_allowance,
            self.special_allowance,
            self.expense_reimbursement,
            self.commute_allowance,
            self.stock_incentive,
            self.total_earnings,
            self.health_insurance,
            self.pension_insurance,
            self.employment_insurance,
            self.resident_tax,
            self.income_tax,
            self.stock_contribution,
            self.total_deductions,
            self.net_salary,
        ];
        let minutes = [
            self.extra_overtime_minutes,
            self.over60_overtime_minutes,
            self.night_overtime_minutes,
        ];
        let days = [self.paid_leave_days, self.paid_leave_remaining_days];

        let total = amounts.len() + minutes.len() + days.len();
        let filled = amounts.iter().filter(|&&v| v != 0).count()
            + minutes.iter().filter(|&&v| v != 0).count()
            + days.iter().filter(|&&v| v != 0.0).count();
        (filled, total)
    }
}

/// Today's date in the local offset, or UTC when the offset is unknown.
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_default_record_is_zeroed_for_period() {
        let record = PayslipRecord::default_for(date!(2025 - 11 - 25));
        assert_eq!(record.period(), Period { year: 2025, month: 11 });
        assert_eq!(record.base_salary, 0);
        assert_eq!(record.net_salary, 0);
        assert_eq!(record.paid_leave_days, 0.0);
        assert_eq!(record.coverage(), (0, 23));
    }

    #[test]
    fn test_set_routes_value_to_field() {
        let mut record = PayslipRecord::default_for(date!(2025 - 06 - 01));
        record.set(FieldName::NightOvertimeMinutes, FieldValue::Minutes(135));
        record.set(FieldName::PaidLeaveDays, FieldValue::Days(2.5));
        record.set(FieldName::IncomeTax, FieldValue::Amount(25_000));

        assert_eq!(record.night_overtime_minutes, 135);
        assert_eq!(record.paid_leave_days, 2.5);
        assert_eq!(record.income_tax, 25_000);
        assert_eq!(record.coverage(), (3, 23));
    }

    #[test]
    fn test_with_totals_overwrites_both_aggregates() {
        let record = PayslipRecord::default_for(date!(2025 - 06 - 01)).with_totals(Totals {
            total_earnings: 455_000,
            total_deductions: 108_000,
        });
        assert_eq!(record.total_earnings, 455_000);
        assert_eq!(record.total_deductions, 108_000);
    }
}
