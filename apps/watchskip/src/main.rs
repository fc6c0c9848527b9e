//! # WatchSkip Binary
//!
//! Entry point for the `watchskip` command-line tool and HTTP service.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;
use watchskip::cli::{
    CliError, MaxDepthArg, build_train_options, cmd_generate, cmd_inspect, cmd_predict,
    cmd_serve, cmd_train,
};
use watchskip::config::{
    self, DEFAULT_API_BASE, DEFAULT_DATASET_PATH, DEFAULT_HOST, DEFAULT_MODEL_PATH,
    DEFAULT_PORT, DotenvStatus, ServerConfig, YouTubeConfig,
};
use watchskip_core::dataset::{DEFAULT_SAMPLES, DEFAULT_SEED};

#[derive(Debug, Parser)]
#[command(name = "watchskip", version, about = "Predict whether a YouTube video is worth watching")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate the synthetic training dataset
    Generate {
        #[arg(short, long, default_value = DEFAULT_DATASET_PATH)]
        output: PathBuf,
        #[arg(short = 'n', long, default_value_t = DEFAULT_SAMPLES)]
        samples: usize,
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },

    /// Grid-search a random forest and save the best model
    Train {
        #[arg(short, long, default_value = DEFAULT_DATASET_PATH)]
        dataset: PathBuf,
        #[arg(short, long, env = "WATCHSKIP_MODEL", default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,
        /// Write a JSON training report here
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long, value_delimiter = ',', default_values_t = [100usize, 200])]
        estimators: Vec<usize>,
        /// Depth limits; `none` means unlimited
        #[arg(long, value_delimiter = ',', default_values = ["6", "10", "none"])]
        max_depths: Vec<MaxDepthArg>,
        #[arg(long, value_delimiter = ',', default_values_t = [2usize, 4])]
        min_leaves: Vec<usize>,
        #[arg(long, default_value_t = 5)]
        folds: usize,
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },

    /// Show the metadata stored in a model file
    Inspect {
        #[arg(short, long, env = "WATCHSKIP_MODEL", default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Predict a single URL without starting the server
    Predict {
        url: String,
        #[arg(short, long, env = "WATCHSKIP_MODEL", default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,
        #[arg(long, env = "YT_API_KEY", hide_env_values = true)]
        api_key: String,
        #[arg(long, env = "YOUTUBE_API_BASE", default_value = DEFAULT_API_BASE)]
        api_base: String,
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP prediction service
    Serve {
        #[arg(long, env = "WATCHSKIP_HOST", default_value = DEFAULT_HOST)]
        host: String,
        #[arg(short, long, env = "WATCHSKIP_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(short, long, env = "WATCHSKIP_MODEL", default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,
        #[arg(long, env = "YT_API_KEY", hide_env_values = true)]
        api_key: String,
        #[arg(long, env = "YOUTUBE_API_BASE", default_value = DEFAULT_API_BASE)]
        api_base: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("watchskip=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Generate {
            output,
            samples,
            seed,
        } => cmd_generate(&output, samples, seed).map(|_| ()),

        Command::Train {
            dataset,
            model,
            report,
            estimators,
            max_depths,
            min_leaves,
            folds,
            test_fraction,
            seed,
        } => {
            let options = build_train_options(
                test_fraction,
                folds,
                seed,
                &estimators,
                &max_depths,
                &min_leaves,
            )?;
            cmd_train(&dataset, &model, report.as_deref(), &options).map(|_| ())
        }

        Command::Inspect { model, json } => cmd_inspect(&model, json).map(|_| ()),

        Command::Predict {
            url,
            model,
            api_key,
            api_base,
            json,
        } => {
            let youtube = YouTubeConfig::new(api_key).with_base_url(api_base);
            cmd_predict(&url, &model, &youtube, json).await.map(|_| ())
        }

        Command::Serve {
            host,
            port,
            model,
            api_key,
            api_base,
        } => {
            let config = ServerConfig {
                host,
                port,
                model_path: model,
                youtube: YouTubeConfig::new(api_key).with_base_url(api_base),
            };
            cmd_serve(config).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env has to be in the environment before clap reads env fallbacks.
    let dotenv = config::load_dotenv();
    let args = Cli::parse();
    init_tracing();

    match dotenv {
        DotenvStatus::Loaded(path) => debug!(path = %path.display(), "loaded .env"),
        DotenvStatus::Missing => {}
        DotenvStatus::Invalid(e) => warn!(error = %e, "ignoring malformed .env"),
    }

    match run(args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
