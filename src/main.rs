use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rust_odata::{inspect_metadata, ExpansionRequest, InspectOptions};

#[derive(Parser)]
#[command(name = "rust-odata")]
#[command(author, version, about = "Turn OData v4 metadata into typed service definitions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse $metadata documents and print the derived definitions
    Inspect {
        /// Metadata files or glob patterns
        #[arg(short, long, required = true, num_args = 1..)]
        metadata: Vec<String>,

        /// Root url of the service
        #[arg(short, long)]
        url: String,

        /// Parser configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Prefix of generated type ids (overrides the configuration file)
        #[arg(long)]
        base_id: Option<String>,

        /// Navigations to expand, as <ENTITY>=<NAV>[,<NAV>]
        #[arg(short, long, value_parser = parse_expansion)]
        expand: Vec<ExpansionRequest>,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn parse_expansion(arg: &str) -> Result<ExpansionRequest, String> {
    ExpansionRequest::parse_arg(arg).map_err(|e| e.to_string())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            metadata,
            url,
            config,
            base_id,
            expand,
            verbose,
        } => {
            init_logging(verbose);

            let options = InspectOptions {
                metadata,
                service_url: url,
                config_path: config,
                base_id,
                expansions: expand,
            };

            for (path, definition) in inspect_metadata(&options)? {
                let summary = definition.summary();
                println!("{}", path.display());
                println!(
                    "  Endpoint: {}://{}{}",
                    definition.scheme(),
                    definition.host(),
                    definition.base_path()
                );
                println!("  Version: {}", definition.version());
                println!(
                    "  {} enumerations, {} structures ({} entity types), {} navigation properties",
                    summary.enumerations,
                    summary.structures,
                    summary.entity_types,
                    summary.navigation_properties
                );
                println!("  {} functions:", summary.functions);
                for function in definition.functions() {
                    println!(
                        "    {:<6} {}.{}",
                        function.method.as_str(),
                        function.context,
                        function.name()
                    );
                }
            }
        }
    }

    Ok(())
}
