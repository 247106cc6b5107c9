use rusqlite::{Connection, Result as SqliteResult, params};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

use crate::payslip::PayslipRecord;

pub struct SalaryStore {
    conn: Connection,
}

/// Where a stored record came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFile {
    pub file_name: Option<String>,
    pub sha256: Option<String>,
}

impl SourceFile {
    pub fn from_upload(file_name: &str, bytes: &[u8]) -> Self {
        Self {
            file_name: Some(file_name.to_string()),
            sha256: Some(SalaryStore::fingerprint(bytes)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredSalary {
    pub id: i64,
    pub record: PayslipRecord,
    pub source: SourceFile,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearFilter {
    All,
    Year(i32),
}

impl YearFilter {
    /// An explicit year wins, then `all`; otherwise the latest year on
    /// record, or `current_year` when nothing is stored yet.
    pub fn resolve(year: Option<i32>, all: bool, available_years: &[i32], current_year: i32) -> Self {
        match (year, all) {
            (Some(y), _) => YearFilter::Year(y),
            (None, true) => YearFilter::All,
            (None, false) => YearFilter::Year(available_years.first().copied().unwrap_or(current_year)),
        }
    }
}

const SALARY_COLUMNS: &str = "id, year, month,
    extra_overtime_minutes, over60_overtime_minutes, night_overtime_minutes,
    paid_leave_days, paid_leave_remaining_days,
    base_salary, fixed_overtime_allowance, overtime_allowance, over60_overtime_allowance,
    night_allowance, special_allowance, expense_reimbursement, commute_allowance,
    stock_incentive, total_earnings,
    health_insurance, pension_insurance, employment_insurance, resident_tax,
    income_tax, stock_contribution, total_deductions,
    net_salary, source_file, source_sha256, created_at";

impl SalaryStore {
    /// Open (or create) the salary database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> SqliteResult<Self> {
        let conn = Connection::open(db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS salaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                year INTEGER NOT NULL,
                month INTEGER NOT NULL,
                extra_overtime_minutes INTEGER NOT NULL DEFAULT 0,
                over60_overtime_minutes INTEGER NOT NULL DEFAULT 0,
                night_overtime_minutes INTEGER NOT NULL DEFAULT 0,
                paid_leave_days REAL NOT NULL DEFAULT 0,
                paid_leave_remaining_days REAL NOT NULL DEFAULT 0,
                base_salary INTEGER NOT NULL DEFAULT 0,
                fixed_overtime_allowance INTEGER NOT NULL DEFAULT 0,
                overtime_allowance INTEGER NOT NULL DEFAULT 0,
                over60_overtime_allowance INTEGER NOT NULL DEFAULT 0,
                night_allowance INTEGER NOT NULL DEFAULT 0,
                special_allowance INTEGER NOT NULL DEFAULT 0,
                expense_reimbursement INTEGER NOT NULL DEFAULT 0,
                commute_allowance INTEGER NOT NULL DEFAULT 0,
                stock_incentive INTEGER NOT NULL DEFAULT 0,
                total_earnings INTEGER NOT NULL DEFAULT 0,
                health_insurance INTEGER NOT NULL DEFAULT 0,
                pension_insurance INTEGER NOT NULL DEFAULT 0,
                employment_insurance INTEGER NOT NULL DEFAULT 0,
                resident_tax INTEGER NOT NULL DEFAULT 0,
                income_tax INTEGER NOT NULL DEFAULT 0,
                stock_contribution INTEGER NOT NULL DEFAULT 0,
                total_deductions INTEGER NOT NULL DEFAULT 0,
                net_salary INTEGER NOT NULL DEFAULT 0,
                source_file TEXT,
                source_sha256 TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_salaries_period ON salaries(year, month)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_salaries_sha256 ON salaries(source_sha256)",
            [],
        )?;

        info!("Database initialized successfully");
        Ok(Self { conn })
    }

    /// Hex SHA-256 of an uploaded document.
    pub fn fingerprint(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Insert a confirmed record, returning its row id.
    pub fn insert(&self, r: &PayslipRecord, source: &SourceFile) -> SqliteResult<i64> {
        self.conn.execute(
            "INSERT INTO salaries
                (year, month,
                 extra_overtime_minutes, over60_overtime_minutes, night_overtime_minutes,
                 paid_leave_days, paid_leave_remaining_days,
                 base_salary, fixed_overtime_allowance, overtime_allowance, over60_overtime_allowance,
                 night_allowance, special_allowance, expense_reimbursement, commute_allowance,
                 stock_incentive, total_earnings,
                 health_insurance, pension_insurance, employment_insurance, resident_tax,
                 income_tax, stock_contribution, total_deductions,
                 net_salary, source_file, source_sha256)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                     ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)",
            params![
                r.year,
                r.month,
                r.extra_overtime_minutes,
                r.over60_overtime_minutes,
                r.night_overtime_minutes,
                r.paid_leave_days,
                r.paid_leave_remaining_days,
                r.base_salary,
                r.fixed_overtime_allowance,
                r.overtime_allowance,
                r.over60_overtime_allowance,
                r.night_allowance,
                r.special_allowance,
                r.expense_reimbursement,
                r.commute_allowance,
                r.stock_incentive,
                r.total_earnings,
                r.health_insurance,
                r.pension_insurance,
                r.employment_insurance,
                r.resident_tax,
                r.income_tax,
                r.stock_contribution,
                r.total_deductions,
                r.net_salary,
                source.file_name,
                source.sha256,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(id, year = r.year, month = r.month, "Salary record stored");
        Ok(id)
    }

    /// Records for the list view: every year newest first, or one year
    /// in month order.
    pub fn list(&self, filter: YearFilter) -> SqliteResult<Vec<StoredSalary>> {
        match filter {
            YearFilter::All => self.query(
                &format!("SELECT {SALARY_COLUMNS} FROM salaries ORDER BY year DESC, month DESC, id DESC"),
                [],
            ),
            YearFilter::Year(year) => self.query(
                &format!("SELECT {SALARY_COLUMNS} FROM salaries WHERE year = ?1 ORDER BY month ASC, id ASC"),
                params![year],
            ),
        }
    }

    /// Every record, oldest first.
    pub fn list_chronological(&self) -> SqliteResult<Vec<StoredSalary>> {
        self.query(
            &format!("SELECT {SALARY_COLUMNS} FROM salaries ORDER BY year ASC, month ASC, id ASC"),
            [],
        )
    }

    pub fn get(&self, id: i64) -> SqliteResult<Option<StoredSalary>> {
        let mut rows = self.query(
            &format!("SELECT {SALARY_COLUMNS} FROM salaries WHERE id = ?1"),
            params![id],
        )?;
        Ok(rows.pop())
    }

    /// Was this exact document imported before?
    pub fn find_by_fingerprint(&self, sha256: &str) -> SqliteResult<Option<StoredSalary>> {
        let mut rows = self.query(
            &format!("SELECT {SALARY_COLUMNS} FROM salaries WHERE source_sha256 = ?1 ORDER BY id LIMIT 1"),
            params![sha256],
        )?;
        Ok(rows.pop())
    }

    /// Distinct years with at least one record, newest first.
    pub fn available_years(&self) -> SqliteResult<Vec<i32>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT year FROM salaries ORDER BY year DESC")?;
        let years = stmt.query_map([], |row| row.get(0))?;
        years.collect()
    }

    pub fn count(&self) -> SqliteResult<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM salaries", [], |row| row.get(0))
    }

    fn query<P: rusqlite::Params>(&self, sql: &str, params: P) -> SqliteResult<Vec<StoredSalary>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::row_to_salary)?;
        rows.collect()
    }

    /// Map a row with the `SALARY_COLUMNS` projection to `StoredSalary`.
    fn row_to_salary(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredSalary> {
        Ok(StoredSalary {
            id: row.get(0)?,
            record: PayslipRecord {
                year: row.get(1)?,
                month: row.get(2)?,
                extra_overtime_minutes: row.get(3)?,
                over60_overtime_minutes: row.get(4)?,
                night_overtime_minutes: row.get(5)?,
                paid_leave_days: row.get(6)?,
                paid_leave_remaining_days: row.get(7)?,
                base_salary: row.get(8)?,
                fixed_overtime_allowance: row.get(9)?,
                overtime_allowance: row.get(10)?,
                over60_overtime_allowance: row.get(11)?,
                night_allowance: row.get(12)?,
                special_allowance: row.get(13)?,
                expense_reimbursement: row.get(14)?,
                commute_allowance: row.get(15)?,
                stock_incentive: row.get(16)?,
                total_earnings: row.get(17)?,
                health_insurance: row.get(18)?,
                pension_insurance: row.get(19)?,
                employment_insurance: row.get(20)?,
                resident_tax: row.get(21)?,
                income_tax: row.get(22)?,
                stock_contribution: row.get(23)?,
                total_deductions: row.get(24)?,
                net_salary: row.get(25)?,
            },
            source: SourceFile {
                file_name: row.get(26)?,
                sha256: row.get(27)?,
            },
            created_at: row.get(28)?,
        })
    }
}
