#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::significant_drop_tightening
)]

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use file_retriever::config::{Config, VendorConfig};
use file_retriever::retrieve::{run_vendors, VendorJob, VendorReport};
use file_retriever::window::Lookback;
use std::path::PathBuf;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Vendors are fetched concurrently, up to this many at once.
const MAX_CONCURRENT_VENDORS: usize = 4;

/// Prompt for any password the configuration leaves out.
fn ensure_password(vendor: &mut VendorConfig) -> Result<()> {
    if vendor.password.is_none() {
        use std::io::Write;

        print!(
            "Password for {} (hidden - you won't see it when you type): ",
            vendor.name
        );
        std::io::stdout().flush()?;

        match rpassword::prompt_password("") {
            Ok(password) => {
                vendor.password = Some(password);
            }
            Err(_) => {
                let mut password = String::new();
                std::io::stdin().read_line(&mut password)?;
                vendor.password = Some(password.trim().to_string());
            }
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Vendor configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    /// Print reports as JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve recent files from one or more vendors
    VendorFiles {
        /// Vendor name, repeatable; `all` selects every configured vendor
        #[arg(long = "vendor", required = true)]
        vendors: Vec<String>,

        /// Days to look back
        #[arg(short, long, default_value_t = 0)]
        days: u32,

        /// Hours to look back
        #[arg(short = 'H', long, default_value_t = 0)]
        hours: u32,

        /// Minutes to look back
        #[arg(short, long, default_value_t = 0)]
        minutes: u32,

        /// List matching files without transferring them
        #[arg(long)]
        dry_run: bool,
    },

    /// Retrieve the last day's files from every vendor
    DailyVendorFiles {
        /// List matching files without transferring them
        #[arg(long)]
        dry_run: bool,
    },

    /// List configured vendors
    AvailableVendors,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::AvailableVendors => {
            for name in config.vendor_names() {
                println!("{name}");
            }
        }
        Commands::VendorFiles {
            vendors,
            days,
            hours,
            minutes,
            dry_run,
        } => {
            let lookback = Lookback::new(days, hours, minutes);
            // No window at all means every file in the directory.
            let lookback = (!lookback.is_zero()).then_some(lookback);
            retrieve(&config, &vendors, lookback, dry_run, cli.json).await?;
        }
        Commands::DailyVendorFiles { dry_run } => {
            let all = vec!["all".to_string()];
            retrieve(&config, &all, Some(Lookback::days(1)), dry_run, cli.json).await?;
        }
    }

    Ok(())
}

async fn retrieve(
    config: &Config,
    selectors: &[String],
    lookback: Option<Lookback>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let mut jobs = Vec::new();
    for mut vendor in config.select(selectors)? {
        ensure_password(&mut vendor)?;
        jobs.push(VendorJob {
            params: vendor.connection_params()?,
            src: vendor.src.clone(),
            dst: vendor.dst.clone(),
            lookback,
            dry_run,
        });
    }

    let destination = match config.destination.clone() {
        Some(mut destination) if !dry_run => {
            ensure_password(&mut destination)?;
            Some(destination.connection_params()?)
        }
        _ => None,
    };
    debug!(vendors = jobs.len(), ?lookback, dry_run, "starting retrieval");

    let results = run_vendors(jobs, destination, MAX_CONCURRENT_VENDORS).await;

    let mut reports = Vec::new();
    let mut failures = 0;
    for (vendor, result) in results {
        match result {
            Ok(report) => {
                failures += report.failed.len();
                reports.push(report);
            }
            Err(e) => {
                error!(vendor = %vendor, "{e:#}");
                failures += 1;
            }
        }
    }
    reports.sort_by(|a, b| a.vendor.cmp(&b.vendor));

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    if failures > 0 {
        bail!("{failures} vendor or file transfer(s) failed");
    }
    Ok(())
}

fn print_report(report: &VendorReport) {
    println!("\n{} ({} file(s))", report.vendor, report.listed.len());
    if report.listed.is_empty() {
        return;
    }
    println!("{:<50} {:>10} {:>20}", "Name", "Size", "Modified");
    println!("{}", "-".repeat(82));

    for file in &report.listed {
        let size_str = file
            .size()
            .map_or_else(|| "?".to_string(), |size| human_bytes::human_bytes(size as f64));
        let status = if report.skipped.iter().any(|n| n == file.name()) {
            " (exists)"
        } else if report.failed.iter().any(|(n, _)| n == file.name()) {
            " (failed)"
        } else {
            ""
        };
        println!(
            "{:<50} {:>10} {:>20}{status}",
            file.name(),
            size_str,
            file.modified().format("%Y-%m-%d %H:%M:%S")
        );
    }

    for (name, reason) in &report.failed {
        println!("  ✗ {name}: {reason}");
    }
}
