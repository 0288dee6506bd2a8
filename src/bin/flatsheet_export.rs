//! flatsheet-export: Export the statistics store as an Excel-friendly CSV
//!
//! Usage:
//!   # Look for app_data.db next to the working directory or under %APPDATA%
//!   flatsheet-export
//!
//!   # Explicit store, output into ./reports with the desktop app's header labels
//!   flatsheet-export --db ./app_data.db -o ./reports --friendly-headers
//!
//!   # Render update times at UTC+8 and put custom columns first
//!   flatsheet-export --utc-offset 8 --priority UID,GMV,roi

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use clap::Parser;
use flatsheet::{ExportConfig, ExportOutcome};
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "flatsheet-export")]
#[command(about = "Flatten per-user statistics into one CSV table", long_about = None)]
struct Args {
    /// Store file to read (searched for when omitted)
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Directory to write the CSV into
    #[arg(long, short = 'o', default_value = ".", value_name = "DIR")]
    output_dir: PathBuf,

    /// Comma-separated columns to put first (default: UID,名称,GMV,花费,消耗,全站ROI,roi,订单数,更新时间)
    #[arg(long)]
    priority: Option<String>,

    /// Use the desktop app's report labels in the header row
    #[arg(long)]
    friendly_headers: bool,

    /// Render update times at this UTC offset in hours instead of local time
    #[arg(long, value_name = "HOURS", allow_hyphen_values = true)]
    utc_offset: Option<i32>,

    /// Verbose output (per-record diagnostics)
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Wait for Enter before exiting
    #[arg(long)]
    pause: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(args.verbose);

    let pause = args.pause;
    let code = match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("✗ Error: {:#}", e);
            ExitCode::FAILURE
        }
    };

    if pause {
        wait_for_enter();
    }
    code
}

fn run(args: Args) -> Result<ExitCode> {
    let config = build_config(args).context("Invalid configuration")?;

    println!("--- Exporting user statistics ---");

    match flatsheet::export_store(&config) {
        Ok(ExportOutcome::Written { path, rows, columns }) => {
            println!("✓ Exported {} records across {} columns", rows, columns);
            println!("  File: {}", absolute(&path).display());
            Ok(ExitCode::SUCCESS)
        }
        Ok(ExportOutcome::NothingToExport) => {
            println!("⚠ The store has no records, nothing to export.");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("✗ {}", e);
            if let Some(hint) = e.hint() {
                eprintln!("  Hint: {}", hint);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn build_config(args: Args) -> Result<ExportConfig> {
    let mut config = ExportConfig {
        store_path: args.db,
        output_dir: args.output_dir,
        ..ExportConfig::default()
    };

    if let Some(priority) = args.priority {
        config.priority = priority
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    if let Some(hours) = args.utc_offset {
        let offset = hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .with_context(|| format!("UTC offset out of range: {} hours", hours))?;
        config.utc_offset = Some(offset);
    }

    if args.friendly_headers {
        config = config.with_friendly_headers();
    }

    Ok(config)
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("flatsheet=debug,warn")
    } else {
        EnvFilter::new("flatsheet=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn absolute(path: &std::path::Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn wait_for_enter() {
    println!("\nPress Enter to exit...");
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}
