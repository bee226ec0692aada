//! Command-line front end for GPX import, synthesis and route stats.
//!
//! Run with:
//! ```
//! cargo run -p stride-synth --bin stride -- generate --route route.json --profile profile.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueHint};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use stride_synth::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "GPX import and activity synthesis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a GPX file and print its track summary as JSON
    Parse(ParseArgs),
    /// Synthesize a timed GPX file from a route and an activity profile
    Generate(GenerateArgs),
    /// Print distance, elevation gain, pace and duration for a route
    Stats(RouteArgs),
    /// Print synthetic pace and heart-rate chart series as JSON
    Chart(ChartArgs),
}

#[derive(Parser, Debug)]
struct ParseArgs {
    /// GPX file to import
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    file: PathBuf,
}

#[derive(Parser, Debug)]
struct RouteArgs {
    /// Route JSON (`points`, optional `elevations`)
    #[arg(long, value_hint = ValueHint::FilePath)]
    route: PathBuf,

    /// Activity profile JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    profile: PathBuf,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    input: RouteArgs,

    /// Optional JSON config overriding synthesis defaults
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Output file; defaults to a name derived from the profile
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ChartArgs {
    #[command(flatten)]
    input: RouteArgs,

    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Serialize)]
struct ParseSummary {
    points: usize,
    detected_activity: Option<ActivityType>,
    metadata: ActivityMetadata,
    profile: ActivityProfile,
}

#[derive(Serialize)]
struct RouteStats {
    distance: String,
    elevation: String,
    pace: String,
    duration: String,
    duration_seconds: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Parse(args) => parse(args),
        Command::Generate(args) => generate(args),
        Command::Stats(args) => stats(args),
        Command::Chart(args) => chart(args),
    }
}

fn parse(args: ParseArgs) -> anyhow::Result<()> {
    let content = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let parsed = GpxParser::parse(&content);
    if parsed.route.is_empty() {
        bail!("No track points found in {}", args.file.display());
    }

    for warning in parsed.metadata.quality_warnings() {
        tracing::warn!("{warning}");
    }

    let detected_activity = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(ActivityType::detect_from_file_name);

    let mut profile =
        ActivityProfile::for_activity(detected_activity.unwrap_or(ActivityType::Running));
    profile.apply_metadata(&parsed.metadata);

    print_json(&ParseSummary {
        points: parsed.route.len(),
        detected_activity,
        metadata: parsed.metadata,
        profile,
    })
}

fn generate(args: GenerateArgs) -> anyhow::Result<()> {
    let (route, profile) = load_inputs(&args.input)?;
    let config = load_config(args.config.as_deref())?;

    route
        .validate_for_export()
        .context("Route cannot be exported")?;

    let mut rng = rng_from_seed(args.seed);
    let gpx = GpxSynthesizer::with_config(config.synth).generate(
        &route.points,
        &route.elevations,
        &profile,
        &mut rng,
    )?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(profile.export_file_name()));
    fs::write(&output, gpx).with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!("Wrote {}", output.display());
    tracing::info!("  Points: {}", route.len());
    tracing::info!("  Distance: {:.2} km", route.distance_km());

    Ok(())
}

fn stats(args: RouteArgs) -> anyhow::Result<()> {
    let (route, profile) = load_inputs(&args)?;

    let distance = route_distance(&route.points, profile.units);
    let elevations: Vec<f64> = (0..route.elevations.len())
        .map(|i| route.elevation_at(i))
        .collect();
    let summary = pace_and_duration(
        distance,
        profile.activity_type,
        profile.pace,
        profile.units,
        profile.pace_format,
    );

    print_json(&RouteStats {
        distance: format!("{distance:.2} {}", profile.units.distance_label()),
        elevation: format!("{} m", elevation_gain(&elevations)),
        pace: summary.pace_display,
        duration: summary.duration_display,
        duration_seconds: summary.duration_seconds,
    })
}

fn chart(args: ChartArgs) -> anyhow::Result<()> {
    let (route, profile) = load_inputs(&args.input)?;
    let config = load_config(args.config.as_deref())?;

    let distance = route_distance(&route.points, profile.units);
    let mut rng = rng_from_seed(args.seed);
    let generator = ChartSeriesGenerator::with_config(config.chart);
    let Some(chart) = generator.generate(&route.points, distance, &profile, &mut rng) else {
        bail!("Route needs at least two points to chart");
    };

    print_json(&chart)
}

fn load_inputs(args: &RouteArgs) -> anyhow::Result<(Route, ActivityProfile)> {
    let route: Route = read_json(&args.route)?;
    if !route.is_consistent() {
        bail!(
            "Route arrays in {} do not match its {} points",
            args.route.display(),
            route.len()
        );
    }
    let profile: ActivityProfile = read_json(&args.profile)?;
    Ok((route, profile))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<StrideConfig> {
    match path {
        Some(path) => read_json(path),
        None => Ok(StrideConfig::default()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
