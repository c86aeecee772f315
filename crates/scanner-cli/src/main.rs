//! smartvalue: scan the equity universe for value/quality opportunities.
//!
//! Usage:
//!   cargo run -p scanner-cli --                        # full universe, digest to stdout
//!   cargo run -p scanner-cli -- --sectors Tech,Conso --top 10
//!   cargo run -p scanner-cli -- --format csv --output results.csv
//!   cargo run -p scanner-cli -- --fixtures metrics.json --notify

use std::sync::Arc;

use anyhow::{Context, Result};
use notification_service::{Alert, AlertType, NotificationConfig, NotificationService};
use scan_orchestrator::{to_csv, to_digest, to_json, FixtureSource, ScanReport, Scanner};
use value_core::{MetricsSource, Universe};
use value_scoring::FactorScorer;
use yahoo_client::{ResponseCache, YahooClient};

mod args;
mod config;

use args::{print_usage, CliArgs, OutputFormat};
use config::ScannerConfig;

const DEFAULT_LOG_FILTER: &str = "smartvalue=info,scan_orchestrator=info,yahoo_client=warn";

fn init_tracing() {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // Logs go to stderr so stdout carries only the scan output
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter())
            .init();
    }
}

fn build_source(cli: &CliArgs, config: &ScannerConfig) -> Result<Arc<dyn MetricsSource>> {
    if let Some(path) = &cli.fixtures {
        let source = FixtureSource::from_path(path)
            .with_context(|| format!("Failed to load fixtures from {}", path.display()))?;
        tracing::info!("Using {} fixture records from {}", source.len(), path.display());
        return Ok(Arc::new(source));
    }

    let mut client = YahooClient::new(config.yahoo.clone());
    if config.cache_ttl_secs > 0 {
        let ttl = chrono::Duration::seconds(config.cache_ttl_secs);
        client = client.with_cache(Arc::new(ResponseCache::new(ttl)));
    } else {
        tracing::info!("Response cache disabled");
    }
    Ok(Arc::new(client))
}

fn render(report: &ScanReport, format: OutputFormat, top_n: usize) -> Result<String> {
    Ok(match format {
        OutputFormat::Digest => to_digest(&report.results, top_n),
        OutputFormat::Json => to_json(&report.results)?,
        OutputFormat::Csv => to_csv(&report.results)?,
    })
}

async fn notify(report: &ScanReport, top_n: usize) {
    let service = NotificationService::new(&NotificationConfig::from_env());
    if service.channel_count() == 0 {
        tracing::warn!("--notify given but no notification channel is configured");
        return;
    }

    let summary = report.summary();
    let alert = if report.results.is_empty() {
        Alert::new(
            AlertType::NoOpportunities {
                requested: report.requested,
            },
            "SmartValue Scanner | Aucune opportunité",
            summary.to_string(),
        )
    } else {
        Alert::new(
            AlertType::ScanDigest {
                digest: to_digest(&report.results, top_n),
                qualified: report.qualified,
                best_score: summary.best_score,
            },
            "SmartValue Scanner | Sélection du moment",
            summary.to_string(),
        )
    };
    let delivered = service.dispatch(&alert).await;
    tracing::info!("Digest delivered to {}/{} channels", delivered, service.channel_count());
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match CliArgs::parse(&raw_args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}\n");
            print_usage();
            std::process::exit(2);
        }
    };
    if cli.help {
        print_usage();
        return Ok(());
    }

    let universe = Universe::default_universe();
    if cli.list_sectors {
        for s in universe.sectors() {
            println!("{} ({} tickers): {}", s.sector, s.tickers.len(), s.tickers.join(", "));
        }
        return Ok(());
    }

    let mut config = ScannerConfig::from_env().context("Failed to load configuration")?;
    config.apply_cli(&cli);

    let universe = match &config.sectors {
        Some(names) => {
            let selected = universe.select(names);
            for name in names {
                if !selected.sector_names().contains(&name.as_str()) {
                    tracing::warn!("Unknown sector '{}' ignored", name);
                }
            }
            selected
        }
        None => universe,
    };

    let source = build_source(&cli, &config)?;
    let scorer = FactorScorer::new(config.thresholds.clone(), config.weights.clone());
    let scanner = Scanner::new(source, scorer);

    let report = scanner.scan_report(&universe, config.filters()).await;
    let output = render(&report, cli.format, config.top_n)?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {} results to {}", report.results.len(), path.display());
        }
        None => println!("{output}"),
    }
    eprintln!("{}", report.summary());

    if cli.notify {
        notify(&report, config.top_n).await;
    }

    Ok(())
}
