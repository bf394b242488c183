use std::env;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reachbook::config::RunConfig;
use reachbook::geocode::{CachingGeocoder, GeocodeClient};
use reachbook::{pipeline, ReachError, Result};

fn main() {
    if let Err(error) = init_tracing().and_then(|()| run(Cli::parse())) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|error| ReachError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate(args) => execute_generate(args),
    }
}

fn execute_generate(args: GenerateArgs) -> Result<()> {
    for input in &args.inputs {
        if !input.exists() {
            return Err(ReachError::MissingInput(input.clone()));
        }
    }

    let config = RunConfig::load(&args.config)?;
    let api_key = resolve_api_key(&args, &config)?;

    let client = GeocodeClient::new(config.geocoder.base_url.clone(), api_key)?;
    let mut geocoder = CachingGeocoder::new(client);
    pipeline::generate(&args.inputs, &args.output, &config, &mut geocoder)
}

fn resolve_api_key(args: &GenerateArgs, config: &RunConfig) -> Result<String> {
    if let Some(key) = &args.api_key {
        return Ok(key.clone());
    }
    env::var(&config.geocoder.api_key_env)
        .map_err(|_| ReachError::MissingCredential(config.geocoder.api_key_env.clone()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Generate an office-proximity prospect workbook from provider exports."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the filtered prospect workbook.
    Generate(GenerateArgs),
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Provider export file to merge into the dataset (repeatable).
    #[arg(long = "input", required = true)]
    inputs: Vec<PathBuf>,

    /// Output workbook path.
    #[arg(long)]
    output: PathBuf,

    /// Run configuration (offices, criteria, schema columns).
    #[arg(long)]
    config: PathBuf,

    /// Geocoding API key; falls back to the environment variable named in
    /// the configuration.
    #[arg(long)]
    api_key: Option<String>,
}
