use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use upstream_sync::config::{Config, RepoConfig, Verbosity};
use upstream_sync::constants::{DEFAULT_INSTALL_COMMAND, DEFAULT_UPSTREAM_BRANCH};
use upstream_sync::output::{self, ConsoleCallbacks};
use upstream_sync::{git, install, sync};

/// Keep a checkout in sync with its upstream repository and install dependencies.
#[derive(Debug, Parser)]
#[command(name = "upstream-sync", version, about)]
struct Cli {
    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Print every step and git command
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Bootstrap or update the checkout from the upstream repository
    Sync(SyncArgs),
    /// Run a dependency install command
    Install(InstallArgs),
}

#[derive(Debug, Args)]
struct SyncArgs {
    /// Upstream repository URL
    #[arg(long, env = "UPSTREAM_REPO")]
    upstream_repo: String,

    /// Upstream branch to track
    #[arg(long, env = "UPSTREAM_BRANCH", default_value = DEFAULT_UPSTREAM_BRANCH)]
    upstream_branch: String,

    /// Access token used for the initial fetch only
    #[arg(long, env = "GIT_TOKEN", hide_env_values = true)]
    git_token: Option<String>,

    /// Checkout directory (defaults to the current directory)
    #[arg(long)]
    path: Option<PathBuf>,

    /// Fetch and pull (or hard reset) even if the repository already exists
    #[arg(long)]
    force_reconcile: bool,
}

#[derive(Debug, Args)]
struct InstallArgs {
    /// Command line to run, split with shell quoting rules
    #[arg(default_value = DEFAULT_INSTALL_COMMAND)]
    command: String,

    /// Kill the command after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let verbosity = match (cli.quiet, cli.verbose) {
        (true, _) => Verbosity::Quiet,
        (_, true) => Verbosity::Verbose,
        _ => Verbosity::Normal,
    };
    let config = Config {
        verbosity,
        ..Config::default()
    };
    init_tracing(&config);

    match cli.command {
        Commands::Sync(args) => run_sync(args, &config),
        Commands::Install(args) => run_install(args, config),
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run_sync(args: SyncArgs, config: &Config) -> anyhow::Result<ExitCode> {
    let path = match args.path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    output::print_working_dir(&path, config);

    let repo_config = RepoConfig::new(args.upstream_repo, args.upstream_branch, args.git_token);
    let callbacks = ConsoleCallbacks::new(config);

    let result = if args.force_reconcile && git::is_repository(&path, config, config.git_logger())
    {
        sync::reconcile(&path, &repo_config.upstream_branch, &callbacks, config)
    } else {
        sync::sync_repository(&path, &repo_config, &callbacks, config)
    };

    output::print_sync_result(&result, config);
    Ok(if result.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn run_install(args: InstallArgs, config: Config) -> anyhow::Result<ExitCode> {
    let config = Config {
        install_timeout: args.timeout.map(Duration::from_secs),
        ..config
    };

    let result = install::install_req_with_timeout(&args.command, config.install_timeout)?;
    output::print_install_result(&result, &config);

    Ok(match u8::try_from(result.exit_code) {
        Ok(code) => ExitCode::from(code),
        Err(_) => ExitCode::FAILURE,
    })
}
