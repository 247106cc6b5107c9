// src/payslip/labels.rs

use std::sync::LazyLock;

use serde::Serialize;

/// Record fields a payslip label can write to. The period fields are not
/// label-addressable; they come from the period extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    // attendance
    ExtraOvertimeMinutes,
    Over60OvertimeMinutes,
    NightOvertimeMinutes,
    PaidLeaveDays,
    PaidLeaveRemainingDays,
    // earnings
    BaseSalary,
    FixedOvertimeAllowance,
    OvertimeAllowance,
    Over60OvertimeAllowance,
    NightAllowance,
    SpecialAllowance,
    ExpenseReimbursement,
    CommuteAllowance,
    StockIncentive,
    TotalEarnings,
    // deductions
    HealthInsurance,
    PensionInsurance,
    EmploymentInsurance,
    ResidentTax,
    IncomeTax,
    StockContribution,
    TotalDeductions,
    // result
    NetSalary,
}

/// How the token following a label is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// `H:MM` clock time, stored as minutes.
    Time,
    /// Comma-grouped integer yen amount.
    Currency,
    /// Plain decimal (leave days).
    Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LabelMapping {
    pub label: &'static str,
    pub field: FieldName,
    pub value_type: ValueType,
}

const fn mapping(label: &'static str, field: FieldName, value_type: ValueType) -> LabelMapping {
    LabelMapping {
        label,
        field,
        value_type,
    }
}

/// Labels printed on the payslip template, exactly as the PDF text layer
/// renders them. Append only: documents issued under an older wording
/// still have to parse, so a changed label gets a new row rather than an
/// edit to the existing one.
pub const PAYSLIP_LABELS: &[LabelMapping] = &[
    // attendance
    mapping("固定外残業時間", FieldName::ExtraOvertimeMinutes, ValueType::Time),
    mapping("固定外残業時間(60時間超)", FieldName::Over60OvertimeMinutes, ValueType::Time),
    mapping("深夜割増時間", FieldName::NightOvertimeMinutes, ValueType::Time),
    mapping("有休日数", FieldName::PaidLeaveDays, ValueType::Decimal),
    mapping("有休残日数", FieldName::PaidLeaveRemainingDays, ValueType::Decimal),
    // earnings
    mapping("基本給(月給)", FieldName::BaseSalary, ValueType::Currency),
    mapping("固定時間外手当", FieldName::FixedOvertimeAllowance, ValueType::Currency),
    mapping("残業手当", FieldName::OvertimeAllowance, ValueType::Currency),
    mapping("残業手当(60時間超)", FieldName::Over60OvertimeAllowance, ValueType::Currency),
    mapping("深夜割増額", FieldName::NightAllowance, ValueType::Currency),
    mapping("特別手当", FieldName::SpecialAllowance, ValueType::Currency),
    mapping("立替経費", FieldName::ExpenseReimbursement, ValueType::Currency),
    mapping("非課税通勤費", FieldName::CommuteAllowance, ValueType::Currency),
    mapping("持株会奨励金", FieldName::StockIncentive, ValueType::Currency),
    // deductions
    mapping("健康保険料", FieldName::HealthInsurance, ValueType::Currency),
    mapping("厚生年金保険", FieldName::PensionInsurance, ValueType::Currency),
    mapping("雇用保険料", FieldName::EmploymentInsurance, ValueType::Currency),
    mapping("住民税", FieldName::ResidentTax, ValueType::Currency),
    mapping("所得税", FieldName::IncomeTax, ValueType::Currency),
    mapping("持株会拠出金", FieldName::StockContribution, ValueType::Currency),
    // result
    mapping("差引支給額:", FieldName::NetSalary, ValueType::Currency),
];

/// A label split into the whitespace tokens it occupies in the stream.
#[derive(Debug, Clone)]
pub struct LabelEntry {
    pub mapping: LabelMapping,
    pub tokens: Vec<&'static str>,
}

impl LabelEntry {
    /// Does the label's token span start at `tokens[pos]`?
    pub fn matches_at(&self, tokens: &[&str], pos: usize) -> bool {
        let Some(window) = tokens.get(pos..pos + self.tokens.len()) else {
            return false;
        };
        window.iter().zip(&self.tokens).all(|(a, b)| a == b)
    }
}

/// Label registry in scan order: most tokens first, then longest text.
#[derive(Debug, Clone)]
pub struct LabelTable {
    entries: Vec<LabelEntry>,
}

static STANDARD: LazyLock<LabelTable> = LazyLock::new(|| LabelTable::new(PAYSLIP_LABELS.iter().copied()));

impl LabelTable {
    pub fn new(mappings: impl IntoIterator<Item = LabelMapping>) -> Self {
        let mut entries: Vec<LabelEntry> = mappings
            .into_iter()
            .map(|mapping| LabelEntry {
                tokens: mapping.label.split_whitespace().collect(),
                mapping,
            })
            .filter(|e| !e.tokens.is_empty())
            .collect();

        // stable, so equal-length labels keep registration order
        entries.sort_by(|a, b| {
            b.tokens
                .len()
                .cmp(&a.tokens.len())
                .then_with(|| b.mapping.label.chars().count().cmp(&a.mapping.label.chars().count()))
        });

        Self { entries }
    }

    /// The process-wide table built from [`PAYSLIP_LABELS`].
    pub fn standard() -> &'static LabelTable {
        &STANDARD
    }

    pub fn entries(&self) -> &[LabelEntry] {
        &self.entries
    }

    pub fn lookup(&self, label: &str) -> Option<&LabelMapping> {
        self.entries
            .iter()
            .map(|e| &e.mapping)
            .find(|m| m.label == label)
    }

    /// First registered label that writes `field`.
    pub fn label_for(&self, field: FieldName) -> Option<&LabelEntry> {
        self.entries.iter().find(|e| e.mapping.field == field)
    }

    /// Longest label whose token span starts at `pos`.
    pub fn longest_match_at(&self, tokens: &[&str], pos: usize) -> Option<&LabelEntry> {
        self.entries.iter().find(|e| e.matches_at(tokens, pos))
    }
}
