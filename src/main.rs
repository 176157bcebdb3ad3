use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use garage_cf::{CfClient, EnvFormat};
use garage_logs::LineFilter;
use garage_utils::logger::{self, LOG_LEVEL_VAR, LoggerConfig};
use garage_utils::{AppEnv, Environment, stack_with_cause};

mod commands;
mod config;

use commands::{AppContext, Command, EnvCommand, LogsCommand};
use config::Config;

/// cfutil - Cloud Foundry helpers for running and debugging apps locally
#[derive(Parser, Debug)]
#[command(name = "cfutil")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Config file (default: ./cfutil.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// cf executable to run (overrides cf_binary from the config)
    #[arg(long, global = true, value_name = "PATH")]
    cf: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save environment from Cloud Foundry to a file for use when running locally
    Env(EnvArgs),

    /// Retrieve, filter, and trim Cloud Foundry app logs
    Logs(LogsArgs),
}

#[derive(Args, Debug)]
struct EnvArgs {
    app: String,

    /// Save just VCAP_SERVICES as JSON, instead of creating a .env file
    #[arg(short, long)]
    json: bool,

    /// Include user-provided environment variables
    #[arg(short, long, conflicts_with = "json")]
    user: bool,

    /// Create an env.sh script to initialize the environment
    #[arg(short, long)]
    script: bool,

    /// Output filename (default is .env or services.json)
    #[arg(short, long)]
    filename: Option<String>,
}

#[derive(Args, Debug)]
struct LogsArgs {
    app: String,

    /// Dump recent logs, instead of tailing
    #[arg(short, long)]
    recent: bool,

    /// Include only log messages from app instances
    #[arg(short, long)]
    app_only: bool,

    /// Include only log messages with JSON content
    #[arg(short, long)]
    json_only: bool,

    /// Split each read on its own instead of joining lines across reads
    #[arg(long)]
    per_chunk: bool,
}

impl Commands {
    fn into_command(self) -> Box<dyn Command> {
        match self {
            Self::Env(args) => Box::new(EnvCommand {
                app: args.app,
                format: if args.json {
                    EnvFormat::Json
                } else {
                    EnvFormat::DotEnv
                },
                user: args.user,
                script: args.script,
                filename: args.filename,
            }),
            Self::Logs(args) => Box::new(LogsCommand {
                app: args.app,
                recent: args.recent,
                filter: LineFilter::new()
                    .app_only(args.app_only)
                    .json_only(args.json_only),
                per_chunk: args.per_chunk,
            }),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli).await {
        Ok(code) => exit_code(code),
        Err(e) => {
            eprintln!("{}", stack_with_cause(&*e));
            ExitCode::FAILURE
        }
    }
}

/// cfutil logs like a script unless APP_ENV says otherwise
fn init_logging() {
    let mut app_env =
        AppEnv::detect().unwrap_or_else(|_| AppEnv::with_env(Environment::Script));
    if app_env.env.is_none() {
        app_env.env = Some(Environment::Script);
    }

    let level = std::env::var(LOG_LEVEL_VAR).ok();
    let config = LoggerConfig::from_app_env(&app_env, "cfutil", level.as_deref());
    if let Err(e) = logger::init(&config) {
        eprintln!("cfutil: logging disabled: {e}");
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let work_dir = std::env::current_dir()?;
    let config = Config::load(cli.config.as_deref(), &work_dir)?;
    let cf_binary = cli.cf.unwrap_or_else(|| config.cf_binary.clone());

    let ctx = AppContext {
        cf: CfClient::system(cf_binary),
        config,
        work_dir,
    };

    cli.command.into_command().execute(&ctx).await
}

fn exit_code(code: i32) -> ExitCode {
    match u8::try_from(code) {
        Ok(code) => ExitCode::from(code),
        Err(_) => ExitCode::FAILURE,
    }
}
