//! Payslip reading and a local salary ledger.
//!
//! [`payslip::parse_text`] turns the text layer of a payslip PDF into a
//! [`payslip::PayslipRecord`]; the remaining modules cover the workflow
//! around it: upload handling, storage, CSV export and the dashboard.

pub mod config;
pub mod export;
pub mod payslip;
pub mod pdf_extract;
pub mod salary_db;
pub mod summary;
pub mod upload;
