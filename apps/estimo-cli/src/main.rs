//! Estimo command-line interface
//!
//! Province lookups, feature rows and price estimates from the terminal, plus
//! the offline build of the postal code → income table.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use estimo_core::{
    build_income_table, province_for, ConfigError, EstimoConfig, EstimoError, IncomeTable,
    PostalCode, PropertyInput, Stage, SubtypePolicy,
};
use estimo_model::{Estimator, ModelError, ModelHandle};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "estimo")]
#[command(about = "Belgian property price estimates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ./estimo.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Income table, overriding the configured path
    #[arg(long, global = true)]
    income_table: Option<PathBuf>,

    /// Model file, overriding the configured path
    #[arg(long, global = true)]
    model: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the province of a postal code
    Province {
        /// Four-digit postal code
        postal_code: String,
    },

    /// List postal codes known to the income table
    Postcodes,

    /// Print the model input row for a property
    Features(PropertyArgs),

    /// Estimate the price of a property
    Predict {
        #[command(flatten)]
        property: PropertyArgs,

        /// Print the full estimate as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the postal code → income table from the raw sources
    BuildIncomeTable {
        /// Postal code → municipality reference CSV
        #[arg(long)]
        geo: PathBuf,

        /// Fiscal income statistics CSV
        #[arg(long)]
        income: PathBuf,

        /// Fiscal year to keep (default: configured year)
        #[arg(long)]
        year: Option<i32>,

        /// Output CSV (default: configured income table path)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct PropertyArgs {
    /// Livable space in square meters
    #[arg(short, long)]
    livable_space: i64,

    /// Listing subtype, e.g. apartment or villa
    #[arg(short, long)]
    subtype: String,

    /// Four-digit postal code
    #[arg(short, long)]
    postal_code: String,

    /// Building condition, e.g. "Good" or "To renovate"
    #[arg(long, default_value = "Not specified")]
    condition: String,

    /// Pass unknown subtypes through instead of rejecting them
    #[arg(long)]
    lenient: bool,
}

impl PropertyArgs {
    fn to_input(&self) -> Result<PropertyInput, EstimoError> {
        Ok(PropertyInput {
            livable_space: self.livable_space,
            subtype: self.subtype.clone(),
            postal_code: PostalCode::parse(&self.postal_code)?,
            condition: self.condition.parse()?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] EstimoError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn stage(&self) -> Option<Stage> {
        match self {
            Self::Core(err) => Some(err.stage()),
            Self::Model(err) => Some(err.stage()),
            Self::Config(_) | Self::Json(_) => None,
        }
    }
}

fn load_config(cli: &Cli) -> Result<EstimoConfig, CliError> {
    let mut config = EstimoConfig::discover(cli.config.as_deref())?;
    if let Some(path) = &cli.income_table {
        config.paths.income_table = path.clone();
    }
    if let Some(path) = &cli.model {
        config.paths.model = path.clone();
    }
    Ok(config)
}

fn estimator(config: &EstimoConfig, property: &PropertyArgs) -> Result<Estimator, CliError> {
    let income = IncomeTable::load(&config.paths.income_table)?;
    let policy = if property.lenient {
        SubtypePolicy::Lenient
    } else {
        config.features.subtype_policy
    };
    Ok(Estimator::new(income, ModelHandle::new(&config.paths.model)).with_policy(policy))
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Province { postal_code } => {
            println!("{}", province_for(&postal_code)?);
        }
        Commands::Postcodes => {
            let table = IncomeTable::load(&config.paths.income_table)?;
            for code in table.postal_codes() {
                println!("{}", code);
            }
        }
        Commands::Features(property) => {
            let row = estimator(&config, &property)?.features(&property.to_input()?)?;
            println!("{}", serde_json::to_string_pretty(&row)?);
        }
        Commands::Predict { property, json } => {
            let estimate = estimator(&config, &property)?.estimate(&property.to_input()?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&estimate)?);
            } else {
                println!("{}", estimate.price.formatted());
            }
        }
        Commands::BuildIncomeTable {
            geo,
            income,
            year,
            out,
        } => {
            let mut options = config.income.build_options();
            if let Some(year) = year {
                options.year = year;
            }
            let out = out.unwrap_or_else(|| config.paths.income_table.clone());

            let table = build_income_table(&geo, &income, &options)?;
            table.write(&out)?;
            tracing::info!("Wrote {} postal codes to {:?}", table.len(), out);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.stage() {
                Some(stage) => eprintln!("error ({}): {}", stage, err),
                None => eprintln!("error: {}", err),
            }
            ExitCode::FAILURE
        }
    }
}
