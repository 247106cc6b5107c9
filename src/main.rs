mod cli;

use std::fs;
use std::path::Path;

use clap::Parser;
use tracing::{Instrument, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use payslip_ledger::export::{self, ExportRange};
use payslip_ledger::payslip::labels::LabelTable;
use payslip_ledger::payslip::{self, PayslipParser, PayslipRecord};
use payslip_ledger::pdf_extract::PdfTextExtractor;
use payslip_ledger::salary_db::{SalaryStore, SourceFile, YearFilter};
use payslip_ledger::upload::{self, ConfirmationForm};
use payslip_ledger::{config, summary};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = config::Config::load(&cli.config)?;

    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_filter)),
        )
        .init();

    if !cli.config.exists() {
        info!(path = %cli.config.display(), "No config file, using defaults");
    }

    let parser = PayslipParser::new(LabelTable::standard())
        .with_materiality_threshold(cfg.parser.materiality_threshold);

    match cli.command {
        Command::Parse { file, json } => {
            let outcome = read_upload(&file, &parser).await?.0;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.record)?);
            } else {
                if outcome.fell_back {
                    println!("⚠ Nothing could be read from {}; all fields are blank.\n", outcome.file_name);
                }
                print_form(&outcome.record);
            }
        }
        Command::Import { file, force } => {
            let db = open_store(&cfg.db_path)?;
            let (outcome, bytes) = read_upload(&file, &parser).await?;
            let source = SourceFile::from_upload(&outcome.file_name, &bytes);

            let existing = match source.sha256.as_deref() {
                Some(hash) => db.find_by_fingerprint(hash)?,
                None => None,
            };
            if let Some(existing) = existing {
                if !force {
                    warn!(id = existing.id, file = %outcome.file_name, "Already imported, skipping (use --force)");
                    return Ok(());
                }
            }
            if outcome.fell_back && !force {
                return Err(format!(
                    "nothing could be read from {}; re-run with --force to save a blank record",
                    outcome.file_name
                )
                .into());
            }

            upload::validate(&outcome.record)?;
            let id = db.insert(&outcome.record, &source)?;
            let period = outcome.record.period();
            info!(id, year = period.year, month = period.month, "Imported");
            print_form(&outcome.record);
            println!("\n✓ Saved as #{id}");
        }
        Command::List { year, all } => {
            let db = open_store(&cfg.db_path)?;
            let years = db.available_years()?;
            let filter = YearFilter::resolve(year, all, &years, payslip::today().year());
            let rows = db.list(filter)?;
            if rows.is_empty() {
                match filter {
                    YearFilter::Year(y) => println!("No payslips for {y}."),
                    YearFilter::All => println!("No payslips yet."),
                }
                return Ok(());
            }
            println!("{:>5}  {:>7}  {:>12}  {:>12}  {:>12}", "id", "period", "earnings", "deductions", "net");
            for row in &rows {
                let r = &row.record;
                println!(
                    "{:>5}  {:>4}/{:02}  {:>12}  {:>12}  {:>12}",
                    row.id,
                    r.year,
                    r.month,
                    upload::format_with_commas(r.total_earnings),
                    upload::format_with_commas(r.total_deductions),
                    upload::format_with_commas(r.net_salary),
                );
            }
            println!("\n{} shown, {} on record. Years: {years:?}", rows.len(), db.count()?);
        }
        Command::Show { id } => {
            let db = open_store(&cfg.db_path)?;
            let row = db
                .get(id)?
                .ok_or_else(|| format!("No payslip with id {id}"))?;
            if let Some(name) = &row.source.file_name {
                println!("Source: {name} (saved {})\n", row.created_at);
            }
            print_form(&row.record);
        }
        Command::Export { year, month, out } => {
            let db = open_store(&cfg.db_path)?;
            let range = match (year, month) {
                (Some(y), Some(m)) => ExportRange::Month(y, m),
                (Some(y), None) => ExportRange::Year(y),
                _ => ExportRange::All,
            };
            let records: Vec<PayslipRecord> = db
                .list(YearFilter::All)?
                .into_iter()
                .map(|s| s.record)
                .collect();
            let selected = export::filter_records(&records, range);
            let path = out.unwrap_or_else(|| export::csv_filename(range).into());
            fs::write(&path, export::generate_csv(selected.iter().copied())?)?;
            info!(path = %path.display(), rows = selected.len(), "CSV written");
            println!("✓ Wrote {} rows to {}", selected.len(), path.display());
        }
        Command::Dashboard { json } => {
            let db = open_store(&cfg.db_path)?;
            let records: Vec<PayslipRecord> = db
                .list_chronological()?
                .into_iter()
                .map(|s| s.record)
                .collect();
            let overview = summary::calculate_summary(&records);
            let series = summary::monthly_series(&records);
            let recent = summary::recent_records(&records, cfg.dashboard.recent_count);

            if json {
                let doc = serde_json::json!({
                    "summary": overview,
                    "monthly": series,
                    "recent": recent,
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
                return Ok(());
            }

            println!("--- Summary ({} payslips) ---", overview.record_count);
            println!("Total net:        ¥{}", upload::format_with_commas(overview.total_net_salary));
            println!("Average net:      ¥{}", upload::format_with_commas(overview.average_net_salary));
            println!("Total earnings:   ¥{}", upload::format_with_commas(overview.total_earnings));
            println!("Total deductions: ¥{}", upload::format_with_commas(overview.total_deductions));
            match overview.year_over_year_change {
                Some(pct) => println!("Year over year:   {pct:+.1}%"),
                None => println!("Year over year:   n/a"),
            }

            println!("\n--- Monthly ---");
            for p in &series {
                println!("{}  net ¥{:>10}", p.label, upload::format_with_commas(p.net_salary));
            }

            println!("\n--- Recent ---");
            for r in recent {
                println!(
                    "{}年{}月  支給 ¥{}  控除 ¥{}  差引 ¥{}",
                    r.year,
                    r.month,
                    upload::format_with_commas(r.total_earnings),
                    upload::format_with_commas(r.total_deductions),
                    upload::format_with_commas(r.net_salary),
                );
            }
        }
        Command::Labels { label: Some(label) } => match parser.table().lookup(&label) {
            Some(m) => println!("{} -> {:?} ({:?})", m.label, m.field, m.value_type),
            None => println!("{label:?} is not a registered label"),
        },
        Command::Labels { label: None } => {
            for entry in parser.table().entries() {
                let m = &entry.mapping;
                println!("{:<28} {:<26} {:?}", m.label, format!("{:?}", m.field), m.value_type);
            }
        }
    }

    Ok(())
}

/// Read the file and run the upload workflow on it.
async fn read_upload(
    file: &Path,
    parser: &PayslipParser<'_>,
) -> Result<(upload::UploadOutcome, Vec<u8>), Box<dyn std::error::Error>> {
    let bytes = fs::read(file)?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    let span = tracing::info_span!("upload", file = %file_name);
    let outcome = upload::handle_upload(&file_name, &bytes, &PdfTextExtractor, parser, payslip::today())
        .instrument(span)
        .await?;
    let (filled, total) = outcome.record.coverage();
    info!(filled, total, fell_back = outcome.fell_back, "Upload read");
    Ok((outcome, bytes))
}

fn open_store(db_path: &str) -> Result<SalaryStore, Box<dyn std::error::Error>> {
    if let Some(dir) = Path::new(db_path).parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(SalaryStore::new(db_path)?)
}

fn print_form(record: &PayslipRecord) {
    let form = ConfirmationForm::from(record);
    println!("{}年{}月分", form.year, form.month);
    for (section, rows) in form.sections() {
        println!("\n[{section}]");
        for (label, value) in rows {
            println!("  {label:<16} {value:>14}");
        }
    }
}
