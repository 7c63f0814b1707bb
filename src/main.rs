//! CLI entry point for the comparable-listing valuator.
//!
//! Provides subcommands for valuing a subject property described in a JSON
//! file and for inspecting the comps the configured sources return.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comp_valuator::{
    comps::Query,
    config::AppConfig,
    output::{append_summary, print_json, print_pretty},
    subject::{PropertyType, Subject},
    valuation::{Assessor, ValuationSummary},
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "comp_valuator")]
#[command(about = "Estimate rental and sale value from comparable listings", long_about = None)]
struct Cli {
    /// JSON config file; built-in defaults are used when omitted
    #[arg(short, long, env = "COMP_VALUATOR_CONFIG", global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Value the subject property described in a JSON file
    Assess {
        /// Path to the subject JSON
        #[arg(value_name = "SUBJECT_JSON")]
        subject: String,

        /// CSV file to append a one-line summary to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// List the comps the configured sources return around a city
    Comps {
        /// City to search around
        city: String,

        #[arg(short = 't', long, value_enum, default_value_t = PropertyType::Galpao)]
        property_type: PropertyType,

        #[arg(long, default_value = "MG")]
        state: String,

        #[arg(long, default_value = "BR")]
        country: String,

        /// Drop comps farther than this; all comps are kept when omitted
        #[arg(short, long)]
        radius_km: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/comp_valuator.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("comp_valuator.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let assessor = Assessor::from_config(config)?;
    info!(
        sources = assessor.aggregator().connector_count(),
        "Assessor ready"
    );

    match cli.command {
        Commands::Assess { subject, output } => {
            let content = std::fs::read_to_string(&subject)
                .with_context(|| format!("reading subject '{subject}'"))?;
            let subject: Subject =
                serde_json::from_str(&content).context("parsing subject JSON")?;

            let valuation = assessor.assess(&subject).await?;
            print_pretty(&valuation);
            print_json(&valuation)?;

            if let Some(path) = output {
                append_summary(&path, &ValuationSummary::new(&subject, &valuation))?;
                info!(path = %path, "Summary appended");
            }
        }
        Commands::Comps {
            city,
            property_type,
            state,
            country,
            radius_km,
        } => {
            let location = assessor.geocoder().geocode("", &city, &state, &country);
            let (lat, lon) = location.unzip();
            let query = Query {
                city,
                state,
                country,
                property_type,
            };

            let comps = assessor
                .aggregator()
                .get_comps(&query, lat, lon, radius_km)
                .await;

            for comp in &comps {
                info!(
                    id = comp.id.as_deref().unwrap_or("-"),
                    source = comp.source.as_deref().unwrap_or("-"),
                    distance_km = ?comp.distance_km,
                    built_area_m2 = ?comp.built_area_m2,
                    is_rental = ?comp.is_rental,
                    "Comp"
                );
            }
            info!(total = comps.len(), located = location.is_some(), "Comps listed");
            println!("{}", serde_json::to_string_pretty(&comps)?);
        }
    }

    Ok(())
}
