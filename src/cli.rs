use crate::config::{default_data_dir, Settings};
use crate::harvest::Harvester;
use crate::log::ActivityLogger;
use crate::render::HttpRenderer;
use crate::store::{CsvStore, DatasetStore};
use crate::summary::{RegionComparison, RegionSummary, Summarizer};
use crate::types::Region;
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "rentharvest", version, about = "Harvest rental listings per region into CSV datasets")]
pub struct Cli {
    /// JSON settings file; missing fields keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding datasets and the activity log
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Debug-level console output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collect listings for one or more regions
    Harvest(HarvestArgs),
    /// Word frequencies and price statistics for a stored region
    Summarize(SummarizeArgs),
    /// Listing counts and prices side by side for every stored region
    Compare(CompareArgs),
    /// List regions with a stored dataset
    Regions,
    /// Print the effective settings as JSON
    Policy,
    /// Read the activity log, newest first
    Log(LogArgs),
}

#[derive(Args)]
struct HarvestArgs {
    #[arg(required = true)]
    regions: Vec<String>,
    /// Listings to collect per region
    #[arg(long)]
    target: Option<usize>,
    /// Index pages to visit per region
    #[arg(long)]
    max_pages: Option<u32>,
    /// Ignore previously saved listings
    #[arg(long)]
    fresh: bool,
}

#[derive(Args)]
struct SummarizeArgs {
    region: String,
    #[arg(long, default_value_t = 10)]
    top: usize,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CompareArgs {
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct LogArgs {
    #[arg(long)]
    region: Option<String>,
    /// Only failed operations
    #[arg(long)]
    errors: bool,
}

/// True when debug output was requested; read before the parser runs.
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load_or_default(cli.config.as_deref())
        .with_context(|| match &cli.config {
            Some(p) => format!("loading settings from {}", p.display()),
            None => "loading default settings".to_string(),
        })?;
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    match cli.cmd {
        Command::Harvest(args) => harvest_cmd(settings, &data_dir, args),
        Command::Summarize(args) => summarize_cmd(&data_dir, args),
        Command::Compare(args) => compare_cmd(&data_dir, args),
        Command::Regions => {
            for region in open_store(&data_dir)?.list()? {
                println!("{region}");
            }
            Ok(())
        }
        Command::Policy => print_json(&settings),
        Command::Log(args) => {
            let logger = ActivityLogger::new(&data_dir)?;
            for line in logger.read_logs(args.region.as_deref(), args.errors)? {
                println!("{line}");
            }
            Ok(())
        }
    }
}

fn open_store(data_dir: &Path) -> anyhow::Result<CsvStore> {
    let root = data_dir.join("data");
    CsvStore::new(&root).with_context(|| format!("opening dataset directory {}", root.display()))
}

fn harvest_cmd(mut settings: Settings, data_dir: &Path, args: HarvestArgs) -> anyhow::Result<()> {
    if let Some(n) = args.target {
        settings.limits.target_count = n;
    }
    if let Some(n) = args.max_pages {
        settings.limits.max_pages = n;
    }
    settings.fresh |= args.fresh;
    settings.validate().context("invalid settings")?;

    let store = open_store(data_dir)?;
    let logger = ActivityLogger::new(data_dir)?;
    let mut renderer = HttpRenderer::new(&settings.site).context("building http client")?;
    let regions: Vec<Region> = args.regions.iter().map(Region::new).collect();

    let results = Harvester::new(&mut renderer, &store, &settings)
        .with_logger(&logger)
        .run_regions(&regions);

    let mut failed = Vec::new();
    for (region, result) in results {
        match result {
            Ok(report) if report.is_empty() => {
                println!("{region}: no listings collected ({})", report.stop)
            }
            Ok(report) => println!(
                "{region}: {} listings ({} reused, {} new, {} with descriptions) -> {}",
                report.total(),
                report.reused,
                report.fetched,
                report.details.described,
                report
                    .saved_to
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
            Err(e) => {
                eprintln!("{region}: {e}");
                failed.push(region.to_string());
            }
        }
    }

    if !failed.is_empty() {
        bail!("harvest failed for: {}", failed.join(", "));
    }
    Ok(())
}

fn summarize_cmd(data_dir: &Path, args: SummarizeArgs) -> anyhow::Result<()> {
    let started = Instant::now();
    let store = open_store(data_dir)?;
    let region = Region::new(args.region);
    let rows = store
        .load(&region)
        .with_context(|| format!("reading dataset for {region}"))?;
    if rows.is_empty() {
        bail!("no dataset for {region}; run `rentharvest harvest \"{region}\"` first");
    }

    let summary = Summarizer::default().summarize(&region, &rows, args.top);
    if let Ok(logger) = ActivityLogger::new(data_dir) {
        let details = format!("{} rows in {}ms", rows.len(), started.elapsed().as_millis());
        let _ = logger.info(Some(region.name()), "summarize", Some(&details));
    }

    if args.json {
        print_json(&summary)
    } else {
        print_summary(&summary);
        Ok(())
    }
}

fn compare_cmd(data_dir: &Path, args: CompareArgs) -> anyhow::Result<()> {
    let started = Instant::now();
    let store = open_store(data_dir)?;
    let rows = Summarizer::default()
        .compare(&store)
        .context("reading stored datasets")?;
    if rows.is_empty() {
        bail!("no datasets stored under {}", store.root().display());
    }

    if let Ok(logger) = ActivityLogger::new(data_dir) {
        let details = format!("{} regions in {}ms", rows.len(), started.elapsed().as_millis());
        let _ = logger.info(None, "compare", Some(&details));
    }

    if args.json {
        print_json(&rows)
    } else {
        print_comparison(&rows);
        Ok(())
    }
}

fn print_comparison(rows: &[RegionComparison]) {
    println!("{:<24} {:>8} {:>10} {:>10} {:>10}", "region", "listings", "range", "mean", "median");
    for r in rows {
        match &r.prices {
            Some(p) => println!(
                "{:<24} {:>8} {:>10} {:>10.0} {:>10}",
                r.region.name(),
                r.listings,
                r.price_range.unwrap_or_default(),
                p.mean,
                p.median
            ),
            None => println!("{:<24} {:>8} {:>10} {:>10} {:>10}", r.region.name(), r.listings, "-", "-", "-"),
        }
    }
}

fn print_summary(s: &RegionSummary) {
    println!("{}: {} listings", s.region, s.listings);
    println!(
        "descriptions: {}/{} ({:.0}%)",
        s.described,
        s.listings,
        s.description_rate * 100.0
    );
    match &s.prices {
        Some(p) => {
            println!("prices ({} listings):", p.count);
            println!("  min    ${}", p.min);
            println!("  max    ${}", p.max);
            println!("  mean   ${:.0}", p.mean);
            println!("  median ${}", p.median);
        }
        None => println!("prices: none parsed"),
    }
    if !s.top_words.is_empty() {
        println!("top words:");
        for w in &s.top_words {
            println!("  {}: {}", w.word, w.count);
        }
    }
}

fn print_json<T: serde::Serialize>(val: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}
