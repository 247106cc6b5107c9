// src/export.rs

use thiserror::Error;

use crate::payslip::PayslipRecord;

const CSV_HEADERS: [&str; 12] = [
    "年月",
    "基本給",
    "固定時間外手当",
    "残業手当",
    "支給合計",
    "健康保険料",
    "厚生年金保険",
    "雇用保険料",
    "住民税",
    "所得税",
    "控除合計",
    "差引支給額",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportRange {
    All,
    Year(i32),
    Month(i32, u8),
}

impl ExportRange {
    pub fn contains(&self, r: &PayslipRecord) -> bool {
        match *self {
            ExportRange::All => true,
            ExportRange::Year(year) => r.year == year,
            ExportRange::Month(year, month) => r.year == year && r.month == month,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV flush failed: {0}")]
    Flush(#[from] csv::IntoInnerError<csv::Writer<Vec<u8>>>),
    #[error("CSV output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn record_to_csv_row(r: &PayslipRecord) -> Vec<String> {
    let amounts = [
        r.base_salary,
        r.fixed_overtime_allowance,
        r.overtime_allowance,
        r.total_earnings,
        r.health_insurance,
        r.pension_insurance,
        r.employment_insurance,
        r.resident_tax,
        r.income_tax,
        r.total_deductions,
        r.net_salary,
    ];
    std::iter::once(format!("{}年{}月", r.year, r.month))
        .chain(amounts.iter().map(i64::to_string))
        .collect()
}

/// Header line plus one row per record, newline-separated, with no
/// newline after the last row.
pub fn generate_csv<'a>(
    records: impl IntoIterator<Item = &'a PayslipRecord>,
) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADERS)?;
    for record in records {
        writer.write_record(record_to_csv_row(record))?;
    }

    let mut out = String::from_utf8(writer.into_inner()?)?;
    if out.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}

pub fn csv_filename(range: ExportRange) -> String {
    match range {
        ExportRange::All => "給与明細.csv".to_string(),
        ExportRange::Year(year) => format!("給与明細_{year}.csv"),
        ExportRange::Month(year, month) => format!("給与明細_{year}_{month:02}.csv"),
    }
}

pub fn filter_records<'a>(records: &'a [PayslipRecord], range: ExportRange) -> Vec<&'a PayslipRecord> {
    records.iter().filter(|r| range.contains(r)).collect()
}
