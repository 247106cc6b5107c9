use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "payslip-ledger")]
#[command(about = "Read payslip PDFs into a local salary ledger", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (TOML). Missing file means defaults.
    #[arg(long, default_value = "payslip_ledger.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse a payslip and print what would be saved, without saving.
    Parse {
        file: PathBuf,
        /// Print the record as JSON instead of the confirmation form
        #[arg(long)]
        json: bool,
    },

    /// Parse, validate and save a payslip.
    Import {
        file: PathBuf,
        /// Save even if this exact file was imported before, or if nothing
        /// could be read from it (saves the blank record)
        #[arg(long)]
        force: bool,
    },

    /// List saved payslips.
    List {
        /// Only this year (month order). Default: the latest year on record.
        #[arg(short, long)]
        year: Option<i32>,
        /// Every year, newest first
        #[arg(long, conflicts_with = "year")]
        all: bool,
    },

    /// Show one saved payslip in full.
    Show { id: i64 },

    /// Write saved payslips to CSV.
    Export {
        #[arg(short, long)]
        year: Option<i32>,
        #[arg(short, long, requires = "year", value_parser = clap::value_parser!(u8).range(1..=12))]
        month: Option<u8>,
        /// Output path. Default: a name derived from the range.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Summary, monthly series and recent history.
    Dashboard {
        #[arg(long)]
        json: bool,
    },

    /// Print the payslip label table, or look up one label.
    Labels { label: Option<String> },
}
