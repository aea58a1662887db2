mod db;
mod error;
mod extract;
mod http;
mod pipeline;
mod raw;
mod record;
mod settings;
mod snapshot;
mod sources;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::bail;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

use crate::http::HttpClient;
use crate::raw::RawRecorder;
use crate::record::RunStamp;
use crate::settings::Settings;
use crate::sources::Source;

#[derive(Parser)]
#[command(name = "alpha_scrapers", about = "Job listings scraper for Cisco and QRT")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root directory for databases and snapshots
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Save every raw response under the raw directory
    #[arg(long, global = true)]
    save_raw: bool,

    /// Extra listings query parameter (repeatable). `KEY=VALUE` goes to every
    /// source, `SOURCE:KEY=VALUE` (e.g. `cisco:projectOffset=25`) to one
    #[arg(long = "param", value_name = "[SOURCE:]KEY=VALUE", value_parser = parse_param, global = true)]
    params: Vec<Param>,
}

/// A listings query parameter, optionally scoped to one source.
#[derive(Debug, Clone, PartialEq)]
struct Param {
    source: Option<Source>,
    key: String,
    value: String,
}

impl Param {
    fn applies_to(&self, source: Source) -> bool {
        self.source.map_or(true, |s| s == source)
    }
}

fn params_for(params: &[Param], source: Source) -> Vec<(&str, &str)> {
    params
        .iter()
        .filter(|p| p.applies_to(source))
        .map(|p| (p.key.as_str(), p.value.as_str()))
        .collect()
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape jobs.cisco.com
    Cisco,
    /// Scrape the QRT Greenhouse board
    Qrt,
    /// Scrape every source; keeps going if one fails
    All,
    /// Show database statistics
    Stats {
        /// Only this source (default: all)
        #[arg(short, long)]
        source: Option<Source>,
        /// Also list every stored job
        #[arg(short, long)]
        list: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = settings::load()?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }
    if cli.save_raw {
        settings.save_raw = true;
    }
    let params = cli.params;

    let result = match cli.command {
        Commands::Cisco => scrape(&settings, &[Source::Cisco], &params),
        Commands::Qrt => scrape(&settings, &[Source::Qrt], &params),
        Commands::All => scrape(&settings, &Source::ALL, &params),
        Commands::Stats { source, list } => {
            let selected = match source {
                Some(s) => vec![s],
                None => Source::ALL.to_vec(),
            };
            for source in selected {
                print_stats(&settings, source, list)?;
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// One stamp for the whole invocation. A single source propagates its error;
/// with several, failures are logged and reported together at the end.
fn scrape(settings: &Settings, sources: &[Source], params: &[Param]) -> anyhow::Result<()> {
    let client = HttpClient::new(&settings.http)?;
    let stamp = RunStamp::now();

    if let [source] = sources {
        return scrape_one(settings, *source, &client, &stamp, params);
    }

    let mut failed = Vec::new();
    for &source in sources {
        if let Err(e) = scrape_one(settings, source, &client, &stamp, params) {
            error!("✖ {}: {:#}", source, e);
            failed.push(source.name());
        }
    }
    if !failed.is_empty() {
        bail!("{} of {} sources failed: {}", failed.len(), sources.len(), failed.join(", "));
    }
    Ok(())
}

fn scrape_one(
    settings: &Settings,
    source: Source,
    client: &HttpClient,
    stamp: &RunStamp,
    params: &[Param],
) -> anyhow::Result<()> {
    let params = params_for(params, source);
    let summary = if settings.save_raw {
        let recorder = RawRecorder::new(
            client,
            &settings.raw_dir,
            source.name(),
            stamp.raw_dir_name(),
            source.raw_extension(),
        );
        pipeline::run_source(source, &settings.data_dir, &recorder, stamp, &params)?
    } else {
        pipeline::run_source(source, &settings.data_dir, client, stamp, &params)?
    };
    println!(
        "{}: {} jobs → {} (latest: {})",
        summary.source,
        summary.records,
        summary.db_path.display(),
        summary.snapshots.latest.display()
    );
    Ok(())
}

fn print_stats(settings: &Settings, source: Source, list: bool) -> anyhow::Result<()> {
    let path = pipeline::db_path(&settings.data_dir, source);
    if !path.exists() {
        println!("{}: no database at {}", source, path.display());
        return Ok(());
    }
    let conn = db::open_read_only(&path)?;
    let s = db::get_stats(&conn)?;
    println!("{}", source);
    println!("  Total:       {}", s.total);
    println!("  Active:      {}", s.active);
    println!("  Last seen:   {}", s.latest_seen.as_deref().unwrap_or("-"));

    if list {
        for job in db::fetch_jobs(&conn)? {
            let marker = if s.latest_seen.as_deref() == Some(job.last_seen.as_str()) { "*" } else { " " };
            println!(
                "  {} {:<14} | {:<40} | {:<24} | {:<16} | first seen {}",
                marker,
                job.job_id,
                truncate(&job.title, 40),
                truncate(&job.location, 24),
                truncate(&job.job_type, 16),
                job.first_seen
            );
        }
    }
    Ok(())
}

fn parse_param(s: &str) -> Result<Param, String> {
    let Some((key, value)) = s.split_once('=') else {
        return Err(format!("expected [SOURCE:]KEY=VALUE, got {:?}", s));
    };
    let (source, key) = match key.split_once(':') {
        Some((prefix, rest)) if !rest.is_empty() => match Source::from_str(prefix, true) {
            Ok(source) => (Some(source), rest),
            Err(_) => (None, key),
        },
        _ => (None, key),
    };
    if key.is_empty() {
        return Err(format!("empty parameter name in {:?}", s));
    }
    Ok(Param {
        source,
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
