//! Conjunction screening CLI
//!
//! Screens a TLE catalog for close approaches over an analysis window and
//! prints the refined conjunctions (optionally with avoidance delta-v
//! suggestions) as CSV, Markdown, or JSON.
//!
//! ```bash
//! # Screen a catalog for one day at a 20 s step and 25 km threshold
//! conjunction_screen catalog.tle \
//!     --start 2026-01-01T00:00:00Z --end 2026-01-02T00:00:00Z
//!
//! # Tighter screen with maneuver suggestions, JSON to a file
//! conjunction_screen catalog.tle \
//!     --start 2026-01-01T00:00:00Z --end 2026-01-02T00:00:00Z \
//!     --step-s 10 --threshold-km 10 --suggest-dv \
//!     --format json --output conjunctions.json
//! ```
//!
//! Set `RUST_LOG=info` (or `debug`) for pipeline progress and per-sample
//! drop warnings.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use log::info;

use conjunction::{plan_maneuvers, report, run_pipeline, tle, ManeuverConfig, ScreeningConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TLE file: optional name line followed by the two element lines
    tle_file: PathBuf,

    /// Analysis window start, ISO-8601 UTC (e.g. 2026-01-01T00:00:00Z)
    #[arg(long)]
    start: String,

    /// Analysis window end, ISO-8601 UTC
    #[arg(long)]
    end: String,

    /// Coarse time grid step in seconds
    #[arg(long, default_value_t = 20.0)]
    step_s: f64,

    /// Screening distance threshold in km
    #[arg(long, default_value_t = 25.0)]
    threshold_km: f64,

    /// Maximum grid-index gap merged into one candidate, in grid steps
    #[arg(long, default_value_t = 3)]
    cluster_window: usize,

    /// Fine-grid upsampling factor inside each refinement bracket
    #[arg(long, default_value_t = 10)]
    upsample: u32,

    /// Coarse steps included on each side of the approximate TCA
    #[arg(long, default_value_t = 3)]
    half_steps: u32,

    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// Write the conjunction report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also run the delta-v sandbox on every refined conjunction
    #[arg(long)]
    suggest_dv: bool,

    /// Delta-v sandbox: separation the maneuver should achieve, km
    #[arg(long, default_value_t = 2.0)]
    target_dca_km: f64,

    /// Delta-v sandbox: impulse magnitude budget, m/s
    #[arg(long, default_value_t = 0.05)]
    max_dv_mps: f64,

    /// Delta-v sandbox: burn lead time before TCA, seconds
    #[arg(long, default_value_t = 1800.0)]
    lead_time_s: f64,
}

#[derive(Copy, Clone, ValueEnum)]
enum Format {
    Csv,
    Markdown,
    Json,
}

fn parse_utc(value: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("not an ISO-8601 instant: {value}"))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let catalog = tle::catalog_from_tle_file(&cli.tle_file)
        .with_context(|| format!("loading {}", cli.tle_file.display()))?;
    info!("loaded {} objects", catalog.len());

    let config = ScreeningConfig {
        start: parse_utc(&cli.start)?,
        end: parse_utc(&cli.end)?,
        step_s: cli.step_s,
        threshold_km: cli.threshold_km,
        cluster_window: cli.cluster_window,
        upsample: cli.upsample,
        half_steps: cli.half_steps,
    };

    let refined = run_pipeline(&catalog, &config)?;
    info!("{} refined conjunctions", refined.len());

    let rendered = match cli.format {
        Format::Csv => report::conjunctions_to_csv(&refined),
        Format::Markdown => report::conjunctions_to_markdown(&refined),
        Format::Json => report::conjunctions_to_json(&refined)?,
    };
    match &cli.output {
        Some(path) => fs::write(path, &rendered)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{rendered}"),
    }

    if cli.suggest_dv {
        let maneuver = ManeuverConfig {
            target_dca_km: cli.target_dca_km,
            max_dv_mps: cli.max_dv_mps,
            lead_time_s: cli.lead_time_s,
        };
        let suggestions = plan_maneuvers(&refined, &catalog, &config, &maneuver)?;
        let rendered = match cli.format {
            Format::Csv => report::suggestions_to_csv(&suggestions),
            Format::Markdown => report::suggestions_to_markdown(&suggestions),
            Format::Json => report::suggestions_to_json(&suggestions)?,
        };
        println!();
        print!("{rendered}");
    }

    Ok(())
}
