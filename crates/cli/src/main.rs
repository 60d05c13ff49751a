// lidsweep - resolve LID contacts to phone numbers and remove duplicates

mod exit_codes;
mod resolve;
mod sweep;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_CONFIG_INVALID, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use lidsweep_identity::SweepPass;

#[derive(Parser)]
#[command(name = "lidsweep")]
#[command(about = "Resolve LID contacts to phone numbers and merge duplicates")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log every decision at debug level (overrides RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate LIDs and remove duplicates in one sweep
    #[command(after_help = "\
Examples:
  lidsweep clean --database bot.db --session-path ./bot_sessions
  lidsweep clean --dry-run --json
  SESSION_PATH=/srv/bot/sessions lidsweep clean --output report.json")]
    Clean(sweep::SweepArgs),

    /// Rewrite single LID/JID contacts to phone numbers; never delete
    #[command(after_help = "\
Examples:
  lidsweep migrate --database bot.db
  lidsweep migrate --dry-run")]
    Migrate(sweep::SweepArgs),

    /// Remove duplicate contacts; never rewrite the survivor
    #[command(after_help = "\
Examples:
  lidsweep dedupe --database bot.db
  lidsweep dedupe --json")]
    Dedupe(sweep::SweepArgs),

    /// Run the pass named in the config file (or --pass)
    #[command(after_help = "\
Examples:
  lidsweep run --config sweep.toml
  lidsweep run --config sweep.toml --pass migrate")]
    Run {
        /// Pass to run (overrides config)
        #[arg(long, value_enum)]
        pass: Option<PassArg>,

        #[command(flatten)]
        args: sweep::SweepArgs,
    },

    /// Print the canonical phone number for a JID
    #[command(after_help = "\
Examples:
  lidsweep resolve 201234@lid --session-path ./bot_sessions
  lidsweep resolve 573001112233@s.whatsapp.net
  lidsweep resolve --context '{\"key\":{\"remoteJid\":\"201234@lid\"}}' --json")]
    Resolve(resolve::ResolveArgs),

    /// Validate a sweep config without running
    #[command(after_help = "\
Examples:
  lidsweep validate sweep.toml")]
    Validate {
        /// Path to the sweep .toml config file
        config: PathBuf,

        /// Print the effective config as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PassArg {
    Full,
    Migrate,
    Dedupe,
}

impl From<PassArg> for SweepPass {
    fn from(arg: PassArg) -> Self {
        match arg {
            PassArg::Full => SweepPass::Full,
            PassArg::Migrate => SweepPass::Migrate,
            PassArg::Dedupe => SweepPass::Dedupe,
        }
    }
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  lidsweep-identity ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  lidsweep-identity ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

/// Logs go to stderr; stdout is reserved for `--json` and `resolve` output.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("lidsweep=debug,lidsweep_identity=debug,lidsweep_io=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("lidsweep=info,lidsweep_identity=info,lidsweep_io=info,warn")
        })
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Clean(args) => sweep::cmd_sweep(args, Some(SweepPass::Full)),
        Commands::Migrate(args) => sweep::cmd_sweep(args, Some(SweepPass::Migrate)),
        Commands::Dedupe(args) => sweep::cmd_sweep(args, Some(SweepPass::Dedupe)),
        Commands::Run { pass, args } => sweep::cmd_sweep(args, pass.map(SweepPass::from)),
        Commands::Resolve(args) => resolve::cmd_resolve(args),
        Commands::Validate { config, json } => sweep::cmd_validate(config, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG_INVALID, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
