//! Folio CLI binary.
//!
//! Fetches fundamentals and prices into the local database and prints
//! filtered statements, metric series, valuation ratios and chart
//! configurations.

mod output;

use clap::{Parser, Subcommand};
use folio::charts::{
    ChartOptions, MarginKind, MetricFamily, MetricSeries, ReturnKind, ThemeMode, ValuationKind,
    build_chart_config, calculate_margin, calculate_return, calculate_valuation, metric_series,
};
use folio::{FinancialData, Folio, FolioConfig, FolioError, PeriodView, Symbol};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Fundamentals and valuation charts from Financial Modeling Prep", long_about = None)]
#[command(version)]
struct Cli {
    /// SQLite database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Period view: annual, quarterly or ttm
    #[arg(long, global = true)]
    period: Option<PeriodView>,

    /// Number of years to show (0 for all)
    #[arg(long, global = true)]
    years: Option<u32>,

    /// Re-fetch from the provider even when stored data exists
    #[arg(long, global = true)]
    refresh: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch statements and prices into the database
    Fetch {
        /// Stock symbol
        symbol: String,
    },

    /// Print income statement highlights under the period view
    Statements {
        /// Stock symbol
        symbol: String,
    },

    /// Print a metric series (line item, margin or return ratio)
    Metric {
        /// Stock symbol
        symbol: String,

        /// Metric name, e.g. "Revenue", "Net Income Margin", "ROIC"
        name: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print a valuation ratio series
    Valuation {
        /// Stock symbol
        symbol: String,

        /// Ratio key: pe, fcfYield, ps, evEbitda, pgp, pb, ptb, poi
        kind: String,
    },

    /// Print the chart configuration for a set of metrics as JSON
    Chart {
        /// Stock symbol
        symbol: String,

        /// Metric names
        #[arg(required = true)]
        names: Vec<String>,

        /// Overlay the adjusted close
        #[arg(long)]
        price: bool,

        /// Use the light theme
        #[arg(long)]
        light: bool,
    },

    /// Check whether the provider knows a symbol
    Check {
        /// Stock symbol
        symbol: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = FolioConfig::from_env()?;
    if let Some(db) = cli.db {
        config = config.with_db_path(db);
    }
    let folio = Folio::open(&config).await?;

    match cli.command {
        Commands::Fetch { symbol } => {
            let symbol = Symbol::new(symbol);
            let data = folio.financials().load(&symbol, cli.refresh).await?;
            let prices = folio.prices().load(&symbol, None, None, cli.refresh).await?;
            output::print_summary(&symbol, &data, prices.len());
        }
        Commands::Statements { symbol } => {
            let data = filtered(&folio, &symbol, cli.period, cli.years, cli.refresh).await?;
            output::print_statements(&data);
        }
        Commands::Metric { symbol, name, json } => {
            let data = filtered(&folio, &symbol, cli.period, cli.years, cli.refresh).await?;
            let series = series_for(&data, &name)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&series.points())?);
            } else {
                output::print_series(&name, &series);
            }
        }
        Commands::Valuation { symbol, kind } => {
            let kind = ValuationKind::from_key(&kind)
                .ok_or_else(|| FolioError::InvalidParameter(format!("Unknown valuation ratio: {kind}")))?;
            let sym = Symbol::new(&symbol);
            let data = folio.financials().load(&sym, cli.refresh).await?;
            let prices = folio.prices().load(&sym, None, None, cli.refresh).await?;
            let series = calculate_valuation(kind, &prices, &data)?;
            output::print_series(kind.name(), &series);
        }
        Commands::Chart {
            symbol,
            names,
            price,
            light,
        } => {
            let data = filtered(&folio, &symbol, cli.period, cli.years, cli.refresh).await?;
            let sym = Symbol::new(&symbol);
            let charts = folio.chart_store();
            charts.clear_chart();
            for name in &names {
                let series = series_for(&data, name)?;
                charts.handle_metric_click(name, series.values, series.dates);
            }
            if price {
                let prices = folio.prices().load(&sym, None, None, cli.refresh).await?;
                charts.set_price_series(&prices);
            }
            let options = ChartOptions {
                theme: if light { ThemeMode::Light } else { ThemeMode::Dark },
                date_range: None,
            };
            let config = build_chart_config(&charts.state().selected_metrics, &options);
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Check { symbol } => {
            let known = folio.reference().check_symbol(&Symbol::new(&symbol)).await?;
            println!("{symbol}: {}", if known { "valid" } else { "unknown" });
        }
    }

    Ok(())
}

/// Loads a symbol and applies the period view, persisting any override.
async fn filtered(
    folio: &Folio,
    symbol: &str,
    period: Option<PeriodView>,
    years: Option<u32>,
    refresh: bool,
) -> folio::Result<FinancialData> {
    let data = folio.financials().load(&Symbol::new(symbol), refresh).await?;
    let mut view = folio.financial_view();
    view.set_data(data);
    if let Some(period) = period {
        view.set_period(period);
    }
    if let Some(years) = years {
        view.set_years(years);
    }
    Ok(view.filtered().clone())
}

/// Computes a statement-derived series by display name.
fn series_for(data: &FinancialData, name: &str) -> folio::Result<MetricSeries> {
    match MetricFamily::of(name) {
        MetricFamily::Margin => {
            let kind = MarginKind::from_name(name)
                .ok_or_else(|| FolioError::InvalidParameter(format!("Unknown margin: {name}")))?;
            calculate_margin(kind, data)
        }
        MetricFamily::Return => {
            let kind = ReturnKind::from_name(name)
                .ok_or_else(|| FolioError::InvalidParameter(format!("Unknown return ratio: {name}")))?;
            calculate_return(kind, data)
        }
        MetricFamily::Raw => {
            let series = MetricSeries::from_points(metric_series(data, name));
            if series.is_empty() {
                return Err(FolioError::NoDataAvailable(format!("No {name} values")));
            }
            Ok(series)
        }
        MetricFamily::Valuation | MetricFamily::Price => Err(FolioError::InvalidParameter(format!(
            "{name} needs prices; use the valuation command"
        ))),
    }
}
