// src/upload.rs

use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use time::Date;
use tracing::{info, warn};

use crate::payslip::parser::minutes_to_time;
use crate::payslip::{PayslipParser, PayslipRecord};
use crate::pdf_extract::{self, TextExtractor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Pdf,
    Image,
}

impl UploadKind {
    /// Classify by file extension: PDF, or PNG/JPEG images.
    pub fn detect(file_name: &str) -> Option<Self> {
        let ext = Path::new(file_name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(UploadKind::Pdf),
            "png" | "jpg" | "jpeg" => Some(UploadKind::Image),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("no file selected (empty upload)")]
    Empty,
    #[error("unsupported file type {0:?}: expected a PDF or PNG/JPG image")]
    UnsupportedType(String),
}

/// What the user is asked to confirm after an upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub file_name: String,
    pub kind: UploadKind,
    pub record: PayslipRecord,
    /// True when nothing could be read and the record is the blank default.
    pub fell_back: bool,
}

/// Read an uploaded payslip into a record for confirmation.
///
/// PDFs go through text extraction; if that fails the user still gets an
/// all-zero record to fill in by hand. Images are not OCR'd and always
/// yield the blank record.
pub async fn handle_upload(
    file_name: &str,
    document: &[u8],
    extractor: &dyn TextExtractor,
    parser: &PayslipParser<'_>,
    today: Date,
) -> Result<UploadOutcome, UploadError> {
    if document.is_empty() {
        return Err(UploadError::Empty);
    }
    let kind = UploadKind::detect(file_name)
        .ok_or_else(|| UploadError::UnsupportedType(file_name.to_string()))?;

    let (record, fell_back) = match kind {
        UploadKind::Pdf => {
            match pdf_extract::parse_payslip_document(extractor, parser, document, today).await {
                Ok(record) => (record, false),
                Err(e) => {
                    warn!(file = %file_name, error = %e, "PDF parse failed, continuing with blank record");
                    (PayslipRecord::default_for(today), true)
                }
            }
        }
        UploadKind::Image => {
            info!(file = %file_name, "Image upload, no OCR available");
            (PayslipRecord::default_for(today), true)
        }
    };

    Ok(UploadOutcome {
        file_name: file_name.to_string(),
        kind,
        record,
        fell_back,
    })
}

/// `326767` → `"326,767"`.
pub fn format_with_commas(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// A record rendered the way the confirmation screen shows it: times as
/// `H:MM`, amounts comma-grouped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmationForm {
    pub year: i32,
    pub month: u8,

    pub extra_overtime: String,
    pub over60_overtime: String,
    pub night_overtime: String,
    pub paid_leave_days: f64,
    pub paid_leave_remaining_days: f64,

    pub base_salary: String,
    pub fixed_overtime_allowance: String,
    pub overtime_allowance: String,
    pub over60_overtime_allowance: String,
    pub night_allowance: String,
    pub special_allowance: String,
    pub expense_reimbursement: String,
    pub commute_allowance: String,
    pub stock_incentive: String,
    pub total_earnings: String,

    pub health_insurance: String,
    pub pension_insurance: String,
    pub employment_insurance: String,
    pub resident_tax: String,
    pub income_tax: String,
    pub stock_contribution: String,
    pub total_deductions: String,

    pub net_salary: String,
}

impl From<&PayslipRecord> for ConfirmationForm {
    fn from(r: &PayslipRecord) -> Self {
        Self {
            year: r.year,
            month: r.month,
            extra_overtime: minutes_to_time(r.extra_overtime_minutes),
            over60_overtime: minutes_to_time(r.over60_overtime_minutes),
            night_overtime: minutes_to_time(r.night_overtime_minutes),
            paid_leave_days: r.paid_leave_days,
            paid_leave_remaining_days: r.paid_leave_remaining_days,
            base_salary: format_with_commas(r.base_salary),
            fixed_overtime_allowance: format_with_commas(r.fixed_overtime_allowance),
            overtime_allowance: format_with_commas(r.overtime_allowance),
            over60_overtime_allowance: format_with_commas(r.over60_overtime_allowance),
            night_allowance: format_with_commas(r.night_allowance),
            special_allowance: format_with_commas(r.special_allowance),
            expense_reimbursement: format_with_commas(r.expense_reimbursement),
            commute_allowance: format_with_commas(r.commute_allowance),
            stock_incentive: format_with_commas(r.stock_incentive),
            total_earnings: format_with_commas(r.total_earnings),
            health_insurance: format_with_commas(r.health_insurance),
            pension_insurance: format_with_commas(r.pension_insurance),
            employment_insurance: format_with_commas(r.employment_insurance),
            resident_tax: format_with_commas(r.resident_tax),
            income_tax: format_with_commas(r.income_tax),
            stock_contribution: format_with_commas(r.stock_contribution),
            total_deductions: format_with_commas(r.total_deductions),
            net_salary: format_with_commas(r.net_salary),
        }
    }
}

impl ConfirmationForm {
    /// Label/value rows grouped into the sections of the payslip.
    pub fn sections(&self) -> Vec<(&'static str, Vec<(&'static str, String)>)> {
        let yen = |v: &str| format!("{v}円");
        let days = |v: f64| format!("{v}日");
        vec![
            (
                "勤怠",
                vec![
                    ("固定外残業時間", self.extra_overtime.clone()),
                    ("固定外残業(60h超)", self.over60_overtime.clone()),
                    ("深夜割増時間", self.night_overtime.clone()),
                    ("有休日数", days(self.paid_leave_days)),
                    ("有休残日数", days(self.paid_leave_remaining_days)),
                ],
            ),
            (
                "支給",
                vec![
                    ("基本給", yen(&self.base_salary)),
                    ("固定時間外手当", yen(&self.fixed_overtime_allowance)),
                    ("残業手当", yen(&self.overtime_allowance)),
                    ("残業手当(60h超)", yen(&self.over60_overtime_allowance)),
                    ("深夜割増額", yen(&self.night_allowance)),
                    ("特別手当", yen(&self.special_allowance)),
                    ("立替経費", yen(&self.expense_reimbursement)),
                    ("非課税通勤費", yen(&self.commute_allowance)),
                    ("持株会奨励金", yen(&self.stock_incentive)),
                    ("支給合計", yen(&self.total_earnings)),
                ],
            ),
            (
                "控除",
                vec![
                    ("健康保険料", yen(&self.health_insurance)),
                    ("厚生年金保険", yen(&self.pension_insurance)),
                    ("雇用保険料", yen(&self.employment_insurance)),
                    ("住民税", yen(&self.resident_tax)),
                    ("所得税", yen(&self.income_tax)),
                    ("持株会拠出金", yen(&self.stock_contribution)),
                    ("控除合計", yen(&self.total_deductions)),
                ],
            ),
            ("差引", vec![("差引支給額", yen(&self.net_salary))]),
        ]
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("year {0} is outside 2000..=2100")]
    Year(i32),
    #[error("month {0} is outside 1..=12")]
    Month(u8),
    #[error("{0} must not be negative")]
    Negative(&'static str),
}

/// Checks a confirmed record before it is saved.
pub fn validate(r: &PayslipRecord) -> Result<(), ValidationError> {
    if !(2000..=2100).contains(&r.year) {
        return Err(ValidationError::Year(r.year));
    }
    if !(1..=12).contains(&r.month) {
        return Err(ValidationError::Month(r.month));
    }

    let days = [
        ("paid_leave_days", r.paid_leave_days),
        ("paid_leave_remaining_days", r.paid_leave_remaining_days),
    ];
    if let Some((name, _)) = days.iter().find(|(_, v)| *v < 0.0 || v.is_nan()) {
        return Err(ValidationError::Negative(*name));
    }

    // net pay may go negative
    let amounts = [
        ("base_salary", r.base_salary),
        ("fixed_overtime_allowance", r.fixed_overtime_allowance),
        ("overtime_allowance", r.overtime_allowance),
        ("over60_overtime_allowance", r.over60_overtime_allowance),
        ("night_allowance", r.night_allowance),
        ("special_allowance", r.special_allowance),
        ("expense_reimbursement", r.expense_reimbursement),
        ("commute_allowance", r.commute_allowance),
        ("stock_incentive", r.stock_incentive),
        ("total_earnings", r.total_earnings),
        ("health_insurance", r.health_insurance),
        ("pension_insurance", r.pension_insurance),
        ("employment_insurance", r.employment_insurance),
        ("resident_tax", r.resident_tax),
        ("income_tax", r.income_tax),
        ("stock_contribution", r.stock_contribution),
        ("total_deductions", r.total_deductions),
    ];
    match amounts.iter().find(|(_, v)| *v < 0) {
        Some((name, _)) => Err(ValidationError::Negative(*name)),
        None => Ok(()),
    }
}
