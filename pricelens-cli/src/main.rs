//! PriceLens CLI: load, clean, analyze and plot ticker price series.
//!
//! Commands:
//! - `analyze`: fetch tickers, fill gaps, compute volatility, write the
//!   closing-price and decomposition charts, print a summary
//! - `config init`: write a default TOML config

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use pricelens_core::analysis::{DecompositionModel, SeriesSummary};
use pricelens_core::config::{AnalysisConfig, SourceConfig};
use pricelens_core::render::SvgCanvas;
use pricelens_core::{DataProcessor, ExploratoryAnalysis};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pricelens",
    about = "PriceLens CLI: exploratory analysis of daily price series"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, clean and analyze tickers, writing charts as SVG.
    Analyze(AnalyzeArgs),
    /// Config file commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Default)]
struct AnalyzeArgs {
    /// Path to a TOML config file. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tickers to analyze (e.g., TSLA BND SPY).
    #[arg(long, num_args = 1..)]
    tickers: Vec<String>,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD), exclusive.
    #[arg(long)]
    end: Option<String>,

    /// Read `{TICKER}.csv` files from this directory instead of Yahoo Finance.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Use deterministic synthetic prices (no network).
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Output directory for SVG charts.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Seasonal period in trading days.
    #[arg(long)]
    period: Option<usize>,

    /// Decomposition model: additive or multiplicative.
    #[arg(long)]
    model: Option<DecompositionModel>,

    /// Rolling volatility window in trading days.
    #[arg(long)]
    window: Option<usize>,

    /// Print the summary as JSON instead of a table.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default config to a file.
    Init {
        /// Where to write the config.
        #[arg(long, default_value = "pricelens.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => run_analyze(args),
        Commands::Config { action } => match action {
            ConfigAction::Init { path, force } => run_config_init(path, force),
        },
    }
}

fn parse_date(flag: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("{flag} must be YYYY-MM-DD, got '{value}'"))
}

/// Layer command-line flags over the config file (or defaults).
fn resolve_config(args: &AnalyzeArgs) -> Result<AnalysisConfig> {
    if args.csv_dir.is_some() && args.synthetic {
        bail!("--csv-dir and --synthetic are mutually exclusive");
    }

    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };

    if !args.tickers.is_empty() {
        config.tickers = args.tickers.iter().map(|t| t.to_uppercase()).collect();
    }
    if let Some(start) = &args.start {
        config.start_date = parse_date("--start", start)?;
    }
    if let Some(end) = &args.end {
        config.end_date = parse_date("--end", end)?;
    }
    if let Some(dir) = &args.csv_dir {
        config.source = SourceConfig::Csv { dir: dir.clone() };
    }
    if args.synthetic {
        config.source = SourceConfig::Synthetic;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(period) = args.period {
        config.decomposition.period = period;
    }
    if let Some(model) = args.model {
        config.decomposition.model = model;
    }
    if let Some(window) = args.window {
        config.volatility.window = window;
    }

    config.validate()?;
    Ok(config)
}

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let provider = config.provider()?;

    let mut processor = DataProcessor::new(config.tickers.clone(), config.start_date, config.end_date);
    processor.load(provider.as_ref())?;
    processor.clean()?;

    // Volatility is computed on the cleaned series and written back.
    let mut updated = Vec::with_capacity(processor.data().len());
    {
        let analysis = ExploratoryAnalysis::new(processor.data()).with_volatility_window(config.volatility.window);
        for (ticker, series) in processor.data().iter() {
            updated.push((ticker.to_string(), analysis.calculate_volatility(series.clone())?));
        }
    }
    for (ticker, series) in updated {
        processor.data_mut().insert(ticker, series);
    }

    let analysis = ExploratoryAnalysis::new(processor.data())
        .with_volatility_window(config.volatility.window)
        .with_decomposer(config.decomposition.decomposer());
    let mut canvas = SvgCanvas::new(&config.output_dir);

    analysis.plot_closing_prices(&mut canvas)?;
    let mut decomposed = Vec::new();
    for (ticker, series) in processor.data().iter() {
        let outcome = analysis.decompose_time_series(series, ticker)?;
        analysis.plot_decomposition(&outcome, ticker, &mut canvas)?;
        decomposed.push((ticker.to_string(), outcome.is_available()));
    }

    let summaries = analysis.summaries()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print_summary(&summaries, &decomposed);
    }

    info!(
        charts = canvas.written().len(),
        dir = %canvas.output_dir().display(),
        "analysis complete"
    );
    Ok(())
}

fn fmt_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn print_summary(summaries: &[SeriesSummary], decomposed: &[(String, bool)]) {
    println!(
        "{:<8} {:>6} {:<12} {:<12} {:>12} {:>12} {:>12} {:<10}",
        "Ticker", "Rows", "First", "Last", "Last Close", "Mean Ret %", "Vol %", "Decomposed"
    );
    println!("{}", "-".repeat(92));
    for s in summaries {
        let decomposed = decomposed
            .iter()
            .find(|(t, _)| *t == s.ticker)
            .map_or("-", |(_, ok)| if *ok { "yes" } else { "no" });
        println!(
            "{:<8} {:>6} {:<12} {:<12} {:>12} {:>12} {:>12} {:<10}",
            s.ticker,
            s.rows,
            fmt_opt(s.first_date),
            fmt_opt(s.last_date),
            fmt_opt(s.last_close.map(|c| format!("{c:.2}"))),
            fmt_opt(s.mean_daily_return.map(|r| format!("{:.4}", r * 100.0))),
            fmt_opt(s.latest_volatility.map(|v| format!("{:.4}", v * 100.0))),
            decomposed,
        );
    }
}

fn run_config_init(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let text = AnalysisConfig::default().to_toml()?;
    std::fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = AnalyzeArgs {
            tickers: vec!["spy".into()],
            start: Some("2020-01-01".into()),
            synthetic: true,
            period: Some(5),
            model: Some(DecompositionModel::Additive),
            ..Default::default()
        };
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.tickers, vec!["SPY"]);
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(config.source, SourceConfig::Synthetic);
        assert_eq!(config.decomposition.period, 5);
        assert_eq!(config.decomposition.model, DecompositionModel::Additive);
        assert_eq!(config.volatility.window, 20);
    }

    #[test]
    fn conflicting_sources_are_rejected() {
        let args = AnalyzeArgs {
            csv_dir: Some("data".into()),
            synthetic: true,
            ..Default::default()
        };
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn bad_date_is_rejected() {
        let args = AnalyzeArgs {
            end: Some("31/12/2024".into()),
            ..Default::default()
        };
        let err = resolve_config(&args).unwrap_err();
        assert!(err.to_string().contains("--end"));
    }

    #[test]
    fn cli_parses_analyze_flags() {
        let cli = Cli::try_parse_from([
            "pricelens", "analyze", "--tickers", "TSLA", "BND", "--synthetic", "--model", "additive",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.tickers, vec!["TSLA", "BND"]);
                assert!(args.synthetic);
                assert_eq!(args.model, Some(DecompositionModel::Additive));
            }
            _ => panic!("expected analyze"),
        }
    }
}
