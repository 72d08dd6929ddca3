#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the incident heat-map.
//!
//! Uses `indicatif-log-bridge` (via [`safestreet_cli_utils::init_logger`])
//! so log lines and the geocoding progress bar share the terminal.

mod plot;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use safestreet_geocoder::service_registry::{ProviderConfig, all_services};
use safestreet_heatmap::{HeatmapConfig, MarkerRegistry};

#[derive(Parser)]
#[command(name = "safestreet", about = "Incident heat-map toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch incidents, geocode them, and print the plotted markers as `GeoJSON`
    Plot {
        /// Incidents endpoint (overrides `SAFESTREET_INCIDENTS_URL`)
        #[arg(long, conflicts_with = "file")]
        url: Option<String>,
        /// Read incidents from a local JSON file instead of the backend
        #[arg(long)]
        file: Option<PathBuf>,
        /// Write the `FeatureCollection` here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Look up each distinct address only once
        #[arg(long)]
        dedupe: bool,
    },
    /// Print the incident type to marker color table
    Legend,
    /// List the configured geocoding services
    Services,
    /// Start the API server
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = safestreet_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Plot {
            url,
            file,
            output,
            dedupe,
        } => {
            let mut config = HeatmapConfig::from_env()?;
            if url.is_some() {
                config.incidents_url = url;
            }
            config.dedupe_addresses |= dedupe;

            let target = match file {
                Some(path) => plot::Target::File(path),
                None => plot::Target::Url(
                    config
                        .incidents_url
                        .clone()
                        .ok_or(plot::PlotError::NoSource)?,
                ),
            };
            plot::run(&multi, &config, target, output.as_deref()).await?;
        }
        Commands::Legend => print_legend(),
        Commands::Services => print_services(),
        Commands::Serve => {
            // actix-web brings its own runtime; run it off the tokio
            // workers to avoid nesting runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(safestreet_server::serve())
            })
            .await??;
        }
    }

    Ok(())
}

fn print_legend() {
    let registry = MarkerRegistry::default();
    let width = registry
        .legend()
        .iter()
        .map(|e| e.incident_type.len())
        .max()
        .unwrap_or(0)
        .max("(other)".len());

    for entry in registry.legend() {
        println!("{:<width$}  {}", entry.incident_type, entry.color);
    }
    println!("{:<width$}  {}", "(other)", registry.fallback());
}

fn print_services() {
    let mut services = all_services();
    services.sort_by_key(|s| s.priority);

    println!("{:<12} {:<8} {:<9} {:<30} URL", "ID", "PRIORITY", "ENABLED", "NAME");
    for svc in &services {
        let note = match &svc.provider {
            ProviderConfig::Google { api_key_env, .. }
                if std::env::var(api_key_env).map_or(true, |k| k.trim().is_empty()) =>
            {
                format!(" (needs {api_key_env})")
            }
            _ => String::new(),
        };
        println!(
            "{:<12} {:<8} {:<9} {:<30} {}{note}",
            svc.id,
            svc.priority,
            svc.enabled,
            svc.name,
            svc.base_url(),
        );
    }
}
