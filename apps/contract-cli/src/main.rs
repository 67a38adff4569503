//! Contract CLI Binary
//!
//! Recommends contract templates for a free-text description and fills the
//! chosen template. Logs go to stderr, results to stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use contract_service::{
    spawn_generation, spawn_recommendation, ContractService, Progress, RecommendationOutcome,
    ServiceConfig,
};

#[derive(Parser, Debug)]
#[command(name = "contract-cli")]
#[command(version, about = "Contract template recommendation and filling")]
struct Args {
    /// TOML configuration file (defaults to environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recommend templates for a description
    Recommend {
        /// Contract type (a directory under the RAG root)
        #[arg(short = 't', long = "type")]
        contract_type: String,
        /// Description of what the contract should cover
        #[arg(short, long)]
        input: String,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fill a template from a description and save it
    Generate {
        #[arg(short = 't', long = "type")]
        contract_type: String,
        /// Template name, with or without extension
        #[arg(long)]
        template: String,
        #[arg(short, long)]
        input: String,
    },
    /// Build the index of one contract type from its keyword files
    BuildIndex {
        #[arg(short = 't', long = "type")]
        contract_type: String,
    },
    /// List contract types, or the templates of one type
    List {
        #[arg(short = 't', long = "type")]
        contract_type: Option<String>,
    },
}

fn log_progress(progress: Progress) {
    tracing::info!("[{:>3}%] {}", progress.percent, progress.stage);
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &args.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::from_env()?,
    };
    tracing::info!("Starting contract-cli v{}", env!("CARGO_PKG_VERSION"));

    let service = Arc::new(ContractService::from_config(config)?);

    match args.command {
        Command::Recommend {
            contract_type,
            input,
            json,
        } => {
            let outcome = spawn_recommendation(Arc::clone(&service), input, contract_type)?
                .wait_with_progress(log_progress)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_recommendations(&outcome);
            }
        }
        Command::Generate {
            contract_type,
            template,
            input,
        } => {
            let contract = spawn_generation(Arc::clone(&service), input, contract_type, template)?
                .wait_with_progress(log_progress)?;
            println!("{}", contract.path.display());
        }
        Command::BuildIndex { contract_type } => {
            let count = service.build_index(&contract_type)?;
            println!("Indexed {} templates for {}", count, contract_type);
        }
        Command::List { contract_type } => match contract_type {
            Some(contract_type) => {
                for template in service.list_templates(&contract_type) {
                    println!("{}\t{}", template.name, template.placeholders.join(","));
                }
            }
            None => {
                for contract_type in service.contract_types() {
                    let count = service.templates_for(contract_type)?.len();
                    println!("{}\t{}", contract_type, count);
                }
            }
        },
    }

    Ok(())
}

fn print_recommendations(outcome: &RecommendationOutcome) {
    match outcome {
        RecommendationOutcome::Completed {
            recommendations,
            analysis,
        } => {
            println!(
                "Category: {}  Type: {}",
                analysis.contract_category, analysis.specific_type
            );
            if !analysis.special_concerns.is_empty() {
                println!("Concerns: {}", analysis.special_concerns.join(", "));
            }
            for (rank, result) in recommendations.iter().enumerate() {
                println!(
                    "{}. {}  {:.1}  {}",
                    rank + 1,
                    result.template_id,
                    result.display_score(),
                    result.confidence.label()
                );
            }
        }
        RecommendationOutcome::EmptyInput => println!("Input is empty, nothing to recommend"),
        RecommendationOutcome::NoRelevantContract => {
            println!("No relevant contract found for this input")
        }
    }
}
