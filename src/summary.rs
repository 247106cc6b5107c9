// src/summary.rs

use std::collections::BTreeMap;

use serde::Serialize;

use crate::payslip::PayslipRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub record_count: usize,
    pub total_net_salary: i64,
    /// Floor of the mean; 0 with no records.
    pub average_net_salary: i64,
    pub total_earnings: i64,
    pub total_deductions: i64,
    /// Percent change in total net pay between the two latest years on
    /// record, if there are two and the earlier one is non-zero.
    pub year_over_year_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyPoint {
    pub label: String,
    pub net_salary: i64,
    pub total_earnings: i64,
    pub total_deductions: i64,
}

pub fn calculate_summary(records: &[PayslipRecord]) -> Summary {
    let total_net_salary: i64 = records.iter().map(|r| r.net_salary).sum();
    let average_net_salary = match records.len() {
        0 => 0,
        n => total_net_salary.div_euclid(n as i64),
    };

    Summary {
        record_count: records.len(),
        total_net_salary,
        average_net_salary,
        total_earnings: records.iter().map(|r| r.total_earnings).sum(),
        total_deductions: records.iter().map(|r| r.total_deductions).sum(),
        year_over_year_change: year_over_year_change(records),
    }
}

fn year_over_year_change(records: &[PayslipRecord]) -> Option<f64> {
    let mut by_year: BTreeMap<i32, i64> = BTreeMap::new();
    for r in records {
        *by_year.entry(r.year).or_default() += r.net_salary;
    }

    let mut latest = by_year.iter().rev();
    let (_, &current) = latest.next()?;
    let (_, &previous) = latest.next()?;
    if previous == 0 {
        return None;
    }
    let change = (current - previous) as f64 / previous.abs() as f64 * 100.0;
    Some((change * 10.0).round() / 10.0)
}

/// The last `count` records of a chronological list, newest first.
pub fn recent_records(records: &[PayslipRecord], count: usize) -> Vec<&PayslipRecord> {
    records.iter().rev().take(count).collect()
}

/// Chart series, one point per record, in the order given.
pub fn monthly_series(records: &[PayslipRecord]) -> Vec<MonthlyPoint> {
    records
        .iter()
        .map(|r| MonthlyPoint {
            label: format!("{}/{:02}", r.year, r.month),
            net_salary: r.net_salary,
            total_earnings: r.total_earnings,
            total_deductions: r.total_deductions,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn record(year: i32, month: u8, net: i64) -> PayslipRecord {
        let mut r = PayslipRecord::default_for(date!(2025 - 01 - 01));
        r.year = year;
        r.month = month;
        r.net_salary = net;
        r.total_earnings = net + 100_000;
        r.total_deductions = 100_000;
        r
    }

    #[test]
    fn test_summary_of_nothing() {
        let s = calculate_summary(&[]);
        assert_eq!(s.record_count, 0);
        assert_eq!(s.total_net_salary, 0);
        assert_eq!(s.average_net_salary, 0);
        assert_eq!(s.year_over_year_change, None);
    }

    #[test]
    fn test_summary_totals_and_floor_average() {
        let records = [record(2025, 1, 300_000), record(2025, 2, 300_001)];
        let s = calculate_summary(&records);
        assert_eq!(s.total_net_salary, 600_001);
        assert_eq!(s.average_net_salary, 300_000);
        assert_eq!(s.total_earnings, 800_001);
        assert_eq!(s.total_deductions, 200_000);
        assert_eq!(s.year_over_year_change, None);
    }

    #[test]
    fn test_year_over_year_change() {
        let records = [
            record(2023, 12, 999_999),
            record(2024, 1, 200_000),
            record(2024, 2, 200_000),
            record(2025, 1, 500_000),
        ];
        // 2025 vs 2024: 500k against 400k
        assert_eq!(calculate_summary(&records).year_over_year_change, Some(25.0));
    }

    #[test]
    fn test_recent_records_newest_first() {
        let records: Vec<PayslipRecord> = (1..=7).map(|m| record(2025, m, 1)).collect();
        let months: Vec<u8> = recent_records(&records, 5).iter().map(|r| r.month).collect();
        assert_eq!(months, vec![7, 6, 5, 4, 3]);
        assert_eq!(recent_records(&records[..2], 5).len(), 2);
    }

    #[test]
    fn test_monthly_series_labels() {
        let series = monthly_series(&[record(2025, 3, 10)]);
        assert_eq!(series[0].label, "2025/03");
        assert_eq!(series[0].net_salary, 10);
    }
}
