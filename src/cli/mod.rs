pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sectorctl")]
#[command(about = "Operator CLI for the Sector Feed database")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create the accounts and sector_rotations tables if missing")]
    Migrate,

    #[command(about = "Replace one analysis date's ranked rows from a JSON file")]
    Seed {
        #[arg(long, help = "JSON array of ranked sector rows")]
        file: PathBuf,
        #[arg(long, help = "Analysis date (YYYY-MM-DD), defaults to today")]
        date: Option<chrono::NaiveDate>,
    },

    #[command(about = "Check database connectivity")]
    Health,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Seed { file, date } => commands::seed::handle(file, date, output_format).await,
        Commands::Health => commands::health::handle(output_format).await,
    }
}
