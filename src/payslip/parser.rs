// src/payslip/parser.rs

use std::sync::LazyLock;

use regex::Regex;
use time::Date;
use tracing::debug;

use super::labels::{FieldName, LabelTable, ValueType};
use super::{FieldValue, PayslipRecord, Period, Totals, today};

/// Smallest amount the totals scan accepts as an aggregate. Keeps stray
/// small figures (a pay date, a day count) from being read as totals.
pub const DEFAULT_MATERIALITY_THRESHOLD: i64 = 10_000;

// The text layer breaks "(60時間超)" across lines depending on column width.
static SPLIT_OPEN_60H: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(60\s*\n\s*時間超\)").unwrap());
static SPLIT_CLOSE_60H: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(60時間超\s*\n\s*\)").unwrap());

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+):(\d+)$").unwrap());
static LEADING_INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?\d+").unwrap());
static LEADING_FLOAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").unwrap());
static AMOUNT_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\d,]+$").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})").unwrap());
static MONTH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"年(\d{1,2})月").unwrap());

// ---------------------------------------------------------------------------
// Text normalisation and tokenising
// ---------------------------------------------------------------------------

/// Re-join label suffixes the PDF text layer split across lines.
pub fn normalize_text(text: &str) -> String {
    let joined = SPLIT_OPEN_60H.replace_all(text, "(60時間超)");
    SPLIT_CLOSE_60H
        .replace_all(&joined, "(60時間超)")
        .into_owned()
}

pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

// ---------------------------------------------------------------------------
// Value coercion. Unparseable input is zero, never an error.
// ---------------------------------------------------------------------------

/// `"15:30"` → 930. Anything that is not `digits:digits` is 0.
pub fn time_to_minutes(token: &str) -> u32 {
    let Some(caps) = TIME_RE.captures(token) else {
        return 0;
    };
    let (Ok(hours), Ok(minutes)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
        return 0;
    };
    hours
        .checked_mul(60)
        .and_then(|h| h.checked_add(minutes))
        .unwrap_or(0)
}

/// Inverse of [`time_to_minutes`]: 930 → `"15:30"`.
pub fn minutes_to_time(total_minutes: u32) -> String {
    format!("{}:{:02}", total_minutes / 60, total_minutes % 60)
}

/// `"300,000"` → 300000. Reads the leading integer once separators are
/// stripped, so a trailing unit (`"300,000円"`) is tolerated.
pub fn currency_to_int(token: &str) -> i64 {
    let digits = token.replace(',', "");
    LEADING_INT_RE
        .find(digits.trim_start())
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(0)
}

/// `"2.5"` → 2.5, reading the leading decimal literal.
pub fn decimal_to_float(token: &str) -> f64 {
    LEADING_FLOAT_RE
        .find(token.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

pub fn coerce(token: &str, value_type: ValueType) -> FieldValue {
    match value_type {
        ValueType::Time => FieldValue::Minutes(time_to_minutes(token)),
        ValueType::Currency => FieldValue::Amount(currency_to_int(token)),
        ValueType::Decimal => FieldValue::Days(decimal_to_float(token)),
    }
}

// ---------------------------------------------------------------------------
// Field extractors
// ---------------------------------------------------------------------------

/// Find the first token carrying both 年 and 月, e.g.
/// `"2025(令和07)年11月25日支給分"`, and read the period from it.
pub fn extract_period(tokens: &[&str]) -> Option<Period> {
    tokens
        .iter()
        .filter(|t| t.contains('年') && t.contains('月'))
        .find_map(|t| {
            let year = YEAR_RE.captures(t)?[1].parse::<i32>().ok()?;
            let month = MONTH_RE.captures(t)?[1].parse::<u8>().ok()?;
            (1..=12).contains(&month).then_some(Period { year, month })
        })
}

/// Walk the stream and, wherever a registered label starts, read the
/// token right after its span into the mapped field. The longest label
/// at a position wins and no other label is tried there.
pub fn scan_labels(tokens: &[&str], table: &LabelTable, mut record: PayslipRecord) -> PayslipRecord {
    for i in 0..tokens.len() {
        let Some(entry) = table.longest_match_at(tokens, i) else {
            continue;
        };
        let Some(value_token) = tokens.get(i + entry.tokens.len()) else {
            continue;
        };
        let value = coerce(value_token, entry.mapping.value_type);
        debug!(label = entry.mapping.label, token = *value_token, ?value, "Label matched");
        record.set(entry.mapping.field, value);
    }
    record
}

/// Locate the earnings/deductions totals, which the template prints as a
/// bare pair of amounts ahead of the net pay label: deductions first, then
/// earnings. Takes the first adjacent pair where both tokens look like
/// amounts of at least `threshold`.
pub fn extract_totals(tokens: &[&str], table: &LabelTable, threshold: i64) -> Totals {
    let end = table
        .label_for(FieldName::NetSalary)
        .and_then(|net| (0..tokens.len()).find(|&i| net.matches_at(tokens, i)))
        .filter(|&i| i > 0)
        .unwrap_or(tokens.len());

    let is_large_amount =
        |t: &str| AMOUNT_TOKEN_RE.is_match(t) && currency_to_int(t) >= threshold;

    tokens[..end]
        .windows(2)
        .find(|pair| is_large_amount(pair[0]) && is_large_amount(pair[1]))
        .map(|pair| Totals {
            total_deductions: currency_to_int(pair[0]),
            total_earnings: currency_to_int(pair[1]),
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Turns payslip text into a [`PayslipRecord`].
#[derive(Debug, Clone, Copy)]
pub struct PayslipParser<'t> {
    table: &'t LabelTable,
    materiality_threshold: i64,
}

impl Default for PayslipParser<'static> {
    fn default() -> Self {
        Self::new(LabelTable::standard())
    }
}

impl<'t> PayslipParser<'t> {
    pub fn new(table: &'t LabelTable) -> Self {
        Self {
            table,
            materiality_threshold: DEFAULT_MATERIALITY_THRESHOLD,
        }
    }

    pub fn with_materiality_threshold(self, materiality_threshold: i64) -> Self {
        Self {
            materiality_threshold,
            ..self
        }
    }

    pub fn table(&self) -> &'t LabelTable {
        self.table
    }

    /// Parse `text`, defaulting the period to the month containing `today`.
    pub fn parse(&self, text: &str, today: Date) -> PayslipRecord {
        let normalized = normalize_text(text);
        let tokens = tokenize(&normalized);

        let mut record = PayslipRecord::default_for(today);
        if let Some(period) = extract_period(&tokens) {
            record = record.with_period(period);
        }
        record = scan_labels(&tokens, self.table, record);
        let totals = extract_totals(&tokens, self.table, self.materiality_threshold);
        let record = record.with_totals(totals);

        let (filled, total) = record.coverage();
        debug!(
            tokens = tokens.len(),
            year = record.year,
            month = record.month,
            filled,
            total,
            "Payslip text parsed"
        );
        record
    }
}

/// Parse payslip text with the standard labels and today's date.
pub fn parse_text(text: &str) -> PayslipRecord {
    PayslipParser::default().parse(text, today())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payslip::labels::LabelMapping;
    use time::macros::date;

    const TODAY: Date = date!(2026 - 03 - 15);

    fn parse(text: &str) -> PayslipRecord {
        PayslipParser::default().parse(text, TODAY)
    }

    #[test]
    fn test_time_to_minutes() {
        assert_eq!(time_to_minutes("1:30"), 90);
        assert_eq!(time_to_minutes("0:00"), 0);
        assert_eq!(time_to_minutes("10:00"), 600);
        assert_eq!(time_to_minutes("100:30"), 6030);
    }

    #[test]
    fn test_time_to_minutes_malformed_is_zero() {
        for bad in ["invalid", "", "1:", ":30", "1-30", "1:30:00", " 1:30"] {
            assert_eq!(time_to_minutes(bad), 0, "input {bad:?}");
        }
        assert_eq!(time_to_minutes("99999999999:00"), 0);
    }

    #[test]
    fn test_minutes_round_trip() {
        for m in [0, 1, 59, 60, 90, 930, 6030, 100_000] {
            assert_eq!(time_to_minutes(&minutes_to_time(m)), m);
        }
        assert_eq!(minutes_to_time(65), "1:05");
    }

    #[test]
    fn test_currency_to_int() {
        assert_eq!(currency_to_int("300,000"), 300_000);
        assert_eq!(currency_to_int("1,234,567"), 1_234_567);
        assert_eq!(currency_to_int("300,000円"), 300_000);
        assert_eq!(currency_to_int("-5,000"), -5_000);
        assert_eq!(currency_to_int(""), 0);
        assert_eq!(currency_to_int("テスト"), 0);
        assert_eq!(currency_to_int(","), 0);
    }

    #[test]
    fn test_decimal_to_float() {
        assert_eq!(decimal_to_float("2.5"), 2.5);
        assert_eq!(decimal_to_float("15.0"), 15.0);
        assert_eq!(decimal_to_float("3日"), 3.0);
        assert_eq!(decimal_to_float(".5"), 0.5);
        assert_eq!(decimal_to_float("abc"), 0.0);
        assert_eq!(decimal_to_float(""), 0.0);
    }

    #[test]
    fn test_normalize_rejoins_split_labels() {
        assert_eq!(
            normalize_text("固定外残業時間(60\n時間超) 1:00"),
            "固定外残業時間(60時間超) 1:00"
        );
        assert_eq!(
            normalize_text("残業手当(60時間超 \n ) 5,000"),
            "残業手当(60時間超) 5,000"
        );
        assert_eq!(normalize_text("基本給(月給)\n300,000"), "基本給(月給)\n300,000");
    }

    #[test]
    fn test_tokenize_discards_empty_runs() {
        assert_eq!(tokenize("  a \n\n b\t c  "), vec!["a", "b", "c"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_extract_period() {
        let p = extract_period(&["2025(令和07)年11月25日支給分", "その他"]).unwrap();
        assert_eq!(p, Period { year: 2025, month: 11 });

        let p = extract_period(&["2024(令和06)年3月20日支給分"]).unwrap();
        assert_eq!(p, Period { year: 2024, month: 3 });
    }

    #[test]
    fn test_extract_period_skips_partial_markers() {
        assert!(extract_period(&["2025年", "11月"]).is_none());
        let p = extract_period(&["2025年", "11月", "2024年7月分"]).unwrap();
        assert_eq!(p, Period { year: 2024, month: 7 });
    }

    #[test]
    fn test_missing_period_defaults_to_today() {
        let record = parse("テキストのみ 年月情報なし");
        assert_eq!(record.period(), Period { year: 2026, month: 3 });
    }

    #[test]
    fn test_single_labels() {
        let cases: [(&str, fn(&PayslipRecord) -> f64, f64); 9] = [
            ("固定外残業時間 15:30", |r| r.extra_overtime_minutes as f64, 930.0),
            ("深夜割増時間 2:15", |r| r.night_overtime_minutes as f64, 135.0),
            ("有休日数 2.5", |r| r.paid_leave_days, 2.5),
            ("有休残日数 15.0", |r| r.paid_leave_remaining_days, 15.0),
            ("基本給(月給) 300,000", |r| r.base_salary as f64, 300_000.0),
            ("残業手当 45,000", |r| r.overtime_allowance as f64, 45_000.0),
            ("健康保険料 15,000", |r| r.health_insurance as f64, 15_000.0),
            ("所得税 25,000", |r| r.income_tax as f64, 25_000.0),
            ("差引支給額: 350,000", |r| r.net_salary as f64, 350_000.0),
        ];
        for (fragment, get, want) in cases {
            let record = parse(&format!("2025(令和07)年6月支給分 {fragment} テスト"));
            assert_eq!(get(&record), want, "fragment {fragment:?}");
        }
    }

    #[test]
    fn test_longer_label_wins_over_prefix() {
        let record = parse("残業手当(60時間超) 12,000 残業手当 45,000");
        assert_eq!(record.over60_overtime_allowance, 12_000);
        assert_eq!(record.overtime_allowance, 45_000);

        let record = parse("固定外残業時間(60\n時間超) 1:00");
        assert_eq!(record.over60_overtime_minutes, 60);
        assert_eq!(record.extra_overtime_minutes, 0);
    }

    #[test]
    fn test_multi_token_label_beats_its_prefix() {
        let table = LabelTable::new([
            LabelMapping {
                label: "特別",
                field: FieldName::SpecialAllowance,
                value_type: ValueType::Currency,
            },
            LabelMapping {
                label: "特別 立替",
                field: FieldName::ExpenseReimbursement,
                value_type: ValueType::Currency,
            },
        ]);
        let record = scan_labels(
            &["特別", "立替", "3,000"],
            &table,
            PayslipRecord::default_for(TODAY),
        );
        assert_eq!(record.expense_reimbursement, 3_000);
        // the shorter label is never tried where the longer one matched
        assert_eq!(record.special_allowance, 0);
    }

    #[test]
    fn test_label_at_end_of_stream_is_skipped() {
        let record = parse("基本給(月給)");
        assert_eq!(record.base_salary, 0);
    }

    #[test]
    fn test_malformed_value_coerces_to_zero() {
        let record = parse("固定外残業時間 不明 基本給(月給) ---");
        assert_eq!(record.extra_overtime_minutes, 0);
        assert_eq!(record.base_salary, 0);
    }

    #[test]
    fn test_scan_is_repeatable() {
        let tokens = ["基本給(月給)", "300,000", "所得税", "9,000"];
        let table = LabelTable::standard();
        let first = scan_labels(&tokens, table, PayslipRecord::default_for(TODAY));
        let second = scan_labels(&tokens, table, PayslipRecord::default_for(TODAY));
        assert_eq!(first, second);
    }

    #[test]
    fn test_extract_totals() {
        let tokens = ["11月30日", "108,000", "455,000", "差引支給額:", "347,000"];
        let totals = extract_totals(&tokens, LabelTable::standard(), DEFAULT_MATERIALITY_THRESHOLD);
        assert_eq!(totals.total_deductions, 108_000);
        assert_eq!(totals.total_earnings, 455_000);
    }

    #[test]
    fn test_extract_totals_ignores_small_and_late_pairs() {
        let table = LabelTable::standard();
        let small = ["5,000", "9,999", "差引支給額:", "347,000"];
        assert_eq!(extract_totals(&small, table, DEFAULT_MATERIALITY_THRESHOLD), Totals::default());

        // the pair after the net pay label is out of range
        let late = ["30", "差引支給額:", "347,000", "455,000"];
        assert_eq!(extract_totals(&late, table, DEFAULT_MATERIALITY_THRESHOLD), Totals::default());

        // without the label the whole stream is searched
        let unbounded = ["347,000", "455,000"];
        let totals = extract_totals(&unbounded, table, DEFAULT_MATERIALITY_THRESHOLD);
        assert_eq!(totals.total_deductions, 347_000);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let text = "8,000 9,000 差引支給額: 1,000";
        let record = PayslipParser::default()
            .with_materiality_threshold(5_000)
            .parse(text, TODAY);
        assert_eq!(record.total_deductions, 8_000);
        assert_eq!(record.total_earnings, 9_000);
    }

    #[test]
    fn test_full_statement() {
        let text = "
            2025(令和07)年6月25日支給分
            固定外残業時間 15:30
            深夜割増時間 2:00
            有休日数 1.5
            有休残日数 12.0
            基本給(月給) 300,000
            固定時間外手当 100,000
            残業手当 45,000
            健康保険料 5,000
            厚生年金保険 8,000
            所得税 9,000
            合計行 108,000 455,000
            差引支給額: 347,000
        ";
        let r = parse(text);
        assert_eq!((r.year, r.month), (2025, 6));
        assert_eq!(r.extra_overtime_minutes, 930);
        assert_eq!(r.night_overtime_minutes, 120);
        assert_eq!(r.paid_leave_days, 1.5);
        assert_eq!(r.paid_leave_remaining_days, 12.0);
        assert_eq!(r.base_salary, 300_000);
        assert_eq!(r.fixed_overtime_allowance, 100_000);
        assert_eq!(r.overtime_allowance, 45_000);
        assert_eq!(r.health_insurance, 5_000);
        assert_eq!(r.pension_insurance, 8_000);
        assert_eq!(r.income_tax, 9_000);
        assert_eq!(r.total_deductions, 108_000);
        assert_eq!(r.total_earnings, 455_000);
        assert_eq!(r.net_salary, 347_000);
    }

    #[test]
    fn test_one_line_statement() {
        let r = parse(
            "2025(令和07)年6月支給分 固定外残業時間 15:30 基本給(月給) 300,000 所得税 9,000 108,000 455,000 差引支給額: 347,000",
        );
        assert_eq!((r.year, r.month), (2025, 6));
        assert_eq!(r.extra_overtime_minutes, 930);
        assert_eq!(r.base_salary, 300_000);
        assert_eq!(r.total_deductions, 108_000);
        assert_eq!(r.total_earnings, 455_000);
        assert_eq!(r.net_salary, 347_000);
    }

    #[test]
    fn test_empty_and_unrelated_text_give_defaults() {
        for text in ["", "これは給与明細とは関係のないテキストです。"] {
            let r = parse(text);
            assert_eq!(r, PayslipRecord::default_for(TODAY));
        }
    }

    #[test]
    fn test_parse_text_uses_current_period() {
        let r = parse_text("");
        assert!(r.year >= 2024);
        assert!((1..=12).contains(&r.month));
    }
}
