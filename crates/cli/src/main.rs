//! salespipe - load sales files, rank product types by revenue, export Parquet

mod commands;
mod error;
mod logging;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand};
use sales_pipeline_core::pipeline::StageIds;
use tracing::error;

use commands::ConfigArgs;
use commands::lineage::{LineageArgs, handle_lineage};
use commands::pipeline::{PipelineRunArgs, handle_pipeline_run};
use commands::stage::{
    ExtractArgs, LoadArgs, TransformArgs, handle_extract, handle_init, handle_load,
    handle_transform,
};
use error::CliError;

/// Sales top-N pipeline
#[derive(Parser, Debug)]
#[command(name = "salespipe")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, env = "SALES_PIPELINE_LOG_JSON", global = true)]
    log_json: bool,

    /// Pipeline config file (TOML)
    #[arg(long, env = "SALES_PIPELINE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Sales store database file [default: pipeline.duckdb]
    #[arg(long, env = "SALES_PIPELINE_DATABASE", global = true)]
    database: Option<PathBuf>,

    /// SQL file with the store schema [default: built-in]
    #[arg(long, env = "SALES_PIPELINE_SCHEMA_FILE", global = true)]
    schema_file: Option<PathBuf>,
}

impl Cli {
    fn config_args(&self) -> ConfigArgs {
        ConfigArgs {
            config_file: self.config.clone(),
            database: self.database.clone(),
            schema_file: self.schema_file.clone(),
        }
    }
}

/// Identifier flags of a full run
#[derive(Args, Debug)]
struct IdArgs {
    /// Run id [default: generated]
    #[arg(long, env = "SALES_PIPELINE_RUN_ID")]
    run_id: Option<String>,

    /// Extract id [default: generated]
    #[arg(long)]
    extract_id: Option<String>,

    /// Transform id [default: generated]
    #[arg(long)]
    transform_id: Option<String>,

    /// Load id [default: generated]
    #[arg(long)]
    load_id: Option<String>,
}

impl From<&IdArgs> for StageIds {
    fn from(args: &IdArgs) -> Self {
        StageIds {
            run_id: args.run_id.clone(),
            extract_id: args.extract_id.clone(),
            transform_id: args.transform_id.clone(),
            load_id: args.load_id.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run init, extract, transform and load for one source file
    Run {
        /// Delimited sales file with a header row
        input: PathBuf,

        /// Directory receiving the Parquet artifact
        output_dir: PathBuf,

        #[command(flatten)]
        ids: IdArgs,

        /// Number of product types kept in the report [default: 10]
        #[arg(long, env = "SALES_PIPELINE_TOP_N")]
        top_n: Option<usize>,

        /// Retries after a failed stage attempt [default: 3]
        #[arg(long, env = "SALES_PIPELINE_RETRIES")]
        retries: Option<u32>,

        /// Seconds between attempts [default: 10]
        #[arg(long, env = "SALES_PIPELINE_RETRY_DELAY")]
        retry_delay: Option<u64>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create the store tables if missing
    Init,

    /// Append a source file to the sales table
    Extract {
        /// Delimited sales file with a header row
        input: PathBuf,

        /// Run the rows belong to
        #[arg(long, env = "SALES_PIPELINE_RUN_ID")]
        run_id: String,

        /// Extract id [default: generated]
        #[arg(long)]
        extract_id: Option<String>,
    },

    /// Aggregate the top product types of one extract
    Transform {
        /// Run the report belongs to
        #[arg(long, env = "SALES_PIPELINE_RUN_ID")]
        run_id: String,

        /// Extract to aggregate
        #[arg(long)]
        extract_id: String,

        /// Transform id [default: generated]
        #[arg(long)]
        transform_id: Option<String>,

        /// Number of product types kept [default: 10]
        #[arg(long, env = "SALES_PIPELINE_TOP_N")]
        top_n: Option<usize>,
    },

    /// Export one transform to Parquet
    Load {
        /// Directory receiving the Parquet artifact
        output_dir: PathBuf,

        /// Run the transform belongs to
        #[arg(long, env = "SALES_PIPELINE_RUN_ID")]
        run_id: String,

        /// Transform to export
        #[arg(long)]
        transform_id: String,

        /// Load id [default: generated]
        #[arg(long)]
        load_id: Option<String>,
    },

    /// Show the run, extract and report rows behind a transform
    Lineage {
        /// Transform to trace
        transform_id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.verbose, cli.log_json) {
        eprintln!("Warning: {e:#}");
    }

    if let Err(e) = execute_command(&cli) {
        error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn execute_command(cli: &Cli) -> Result<(), CliError> {
    let config = cli.config_args();

    match &cli.command {
        Commands::Run {
            input,
            output_dir,
            ids,
            top_n,
            retries,
            retry_delay,
            json,
        } => {
            let args = PipelineRunArgs {
                config,
                input: input.clone(),
                output_dir: output_dir.clone(),
                ids: ids.into(),
                top_n: *top_n,
                retries: *retries,
                retry_delay: *retry_delay,
                json: *json,
            };
            handle_pipeline_run(&args).map(|_| ())
        }

        Commands::Init => handle_init(&config),

        Commands::Extract {
            input,
            run_id,
            extract_id,
        } => handle_extract(&ExtractArgs {
            config,
            input: input.clone(),
            run_id: run_id.clone(),
            extract_id: extract_id.clone(),
        })
        .map(|_| ()),

        Commands::Transform {
            run_id,
            extract_id,
            transform_id,
            top_n,
        } => handle_transform(&TransformArgs {
            config,
            run_id: run_id.clone(),
            extract_id: extract_id.clone(),
            transform_id: transform_id.clone(),
            top_n: *top_n,
        })
        .map(|_| ()),

        Commands::Load {
            output_dir,
            run_id,
            transform_id,
            load_id,
        } => handle_load(&LoadArgs {
            config,
            output_dir: output_dir.clone(),
            run_id: run_id.clone(),
            transform_id: transform_id.clone(),
            load_id: load_id.clone(),
        })
        .map(|_| ()),

        Commands::Lineage { transform_id, json } => handle_lineage(&LineageArgs {
            config,
            transform_id: transform_id.clone(),
            json: *json,
        }),
    }
}
