use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use attrition::{
    AttritionService, Envelope, PredictRequest, RetentionRequest, TrainRequest, parse_request,
};
use attrition_io::{EmployeeRecord, ReportKind, ReportName, ReportWriter};
use attrition_model::{ModelSession, TrainingConfig};
use attrition_rules::{RetentionConfig, StrategyOrdering};

#[derive(Parser)]
#[command(name = "attrition")]
#[command(about = "Employee attrition risk prediction and retention planning")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the trained model bundle
    #[arg(long, default_value = "models", global = true)]
    model_dir: PathBuf,

    /// RNG seed for the holdout split and the forest
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Also write the response as a JSON report into this directory
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Report name used for files written with --output (must match [a-zA-Z0-9_-]+)
    #[arg(long, default_value = "attrition", global = true)]
    report_name: String,
}

#[derive(Subcommand)]
enum Command {
    /// Train a model on a labelled HR CSV and publish it to the model directory
    Train {
        /// Path to the training CSV (needs an `attrition` column of Yes/No)
        #[arg(long)]
        data: PathBuf,

        /// Fraction of rows held out for evaluation
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,

        /// Number of trees in the forest
        #[arg(long, default_value_t = 200)]
        n_trees: usize,

        /// Maximum tree depth (0 = unlimited)
        #[arg(long, default_value_t = 15)]
        max_depth: usize,
    },

    /// Predict attrition risk for one employee or a batch
    Predict {
        /// JSON file with an employee object, an array, or {"employees": [...]}; `-` reads stdin
        #[arg(long)]
        input: PathBuf,
    },

    /// Explain why an employee might leave
    Analyze {
        /// JSON file with one employee object; `-` reads stdin
        #[arg(long)]
        input: PathBuf,
    },

    /// Recommend retention strategies for an employee
    Strategies {
        /// JSON file with one employee object; `-` reads stdin
        #[arg(long)]
        input: PathBuf,

        /// Risk score (0-100) the plan is built for
        #[arg(long, default_value_t = 0.0)]
        risk_score: f64,

        /// Order in which strategies are ranked
        #[arg(long, value_enum, default_value_t = OrderingArg::Literal)]
        ordering: OrderingArg,
    },

    /// Show the features and importances of the trained model
    Info,

    /// Report whether a model is loaded
    Health,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderingArg {
    /// Priority 2 first, high impact first within a priority
    Literal,
    /// Priority 1 first, high impact first within a priority
    UrgencyFirst,
}

impl From<OrderingArg> for StrategyOrdering {
    fn from(ordering: OrderingArg) -> Self {
        match ordering {
            OrderingArg::Literal => StrategyOrdering::Literal,
            OrderingArg::UrgencyFirst => StrategyOrdering::UrgencyFirst,
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Parse `input` and run `op`, turning malformed JSON into a failed envelope.
fn run<Req: DeserializeOwned, T>(
    input: &Path,
    op: impl FnOnce(&Req) -> Envelope<T>,
) -> Result<Envelope<T>> {
    let body = read_input(input)?;
    Ok(match parse_request::<Req>(&body) {
        Ok(request) => op(&request),
        Err(e) => Envelope::err(&e),
    })
}

fn emit<T: Serialize>(
    envelope: &Envelope<T>,
    kind: ReportKind,
    writer: Option<&ReportWriter>,
) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    if let Some(writer) = writer {
        writer.write(kind, envelope).context("failed to write report")?;
    }
    Ok(if envelope.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    let writer = match &cli.output {
        Some(dir) => Some(ReportWriter::new(dir, ReportName::new(cli.report_name.clone())?)?),
        None => None,
    };
    let writer = writer.as_ref();

    match cli.command {
        Command::Train {
            data,
            test_fraction,
            n_trees,
            max_depth,
        } => {
            let config = TrainingConfig::new()
                .with_n_trees(n_trees)
                .with_max_depth((max_depth > 0).then_some(max_depth))
                .with_seed(cli.seed);
            let service =
                AttritionService::open(&cli.model_dir).with_training_config(config);
            let envelope = service.train(&TrainRequest {
                csv_path: data,
                test_fraction: Some(test_fraction),
            });
            emit(&envelope, ReportKind::Train, writer)
        }

        Command::Predict { input } => {
            let service = AttritionService::open(&cli.model_dir);
            let envelope = run(&input, |request: &PredictRequest| service.predict(request))?;
            emit(&envelope, ReportKind::Predict, writer)
        }

        Command::Analyze { input } => {
            let service = AttritionService::with_session(ModelSession::new(&cli.model_dir));
            let envelope = run(&input, |employee: &EmployeeRecord| service.analyze(employee))?;
            emit(&envelope, ReportKind::Analyze, writer)
        }

        Command::Strategies {
            input,
            risk_score,
            ordering,
        } => {
            let service = AttritionService::with_session(ModelSession::new(&cli.model_dir))
                .with_retention_config(RetentionConfig::new().with_ordering(ordering.into()));
            let envelope = run(&input, |employee: &EmployeeRecord| {
                service.generate_strategies(&RetentionRequest {
                    employee: employee.clone(),
                    risk_score,
                })
            })?;
            emit(&envelope, ReportKind::Strategies, writer)
        }

        Command::Info => {
            let service = AttritionService::open(&cli.model_dir);
            emit(&service.model_info(), ReportKind::Info, writer)
        }

        Command::Health => {
            let service = AttritionService::open(&cli.model_dir);
            emit(&Envelope::ok(service.health()), ReportKind::Health, writer)
        }
    }
}
