pub mod args;
pub mod commands;

pub use args::{RunArgs, ServeArgs, SweepArgs};
use clap::{Parser, Subcommand};
use std::path::Path;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n";

#[derive(Parser, Debug)]
#[command(name = "obfuscator")]
#[command(version = crate::VERSION)]
#[command(about = "HTTP front end for an external Lua obfuscator")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Every job runs in its own scratch directory that is removed when the job ends."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        about = "Run the HTTP service",
        long_about = "Serve exposes /api/health and /api/obfuscate, serves static assets, and sweeps stale scratch files in the background.",
        after_help = "Example:\n    obfuscator serve --config obfuscator.toml"
    )]
    Serve(ServeArgs),
    #[command(
        about = "Obfuscate one local file",
        long_about = "Run pushes a file through the same job pipeline as the HTTP service and prints the result to stdout.",
        after_help = "Example:\n    obfuscator run script.lua --preset Medium"
    )]
    Run(RunArgs),
    #[command(
        about = "Sweep stale scratch entries once",
        long_about = "Sweep removes every scratch entry older than the configured retention and exits.",
        after_help = "Example:\n    obfuscator sweep --config obfuscator.toml"
    )]
    Sweep(SweepArgs),
}

impl Command {
    /// Config file requested on the command line, if any.
    pub fn config_path(&self) -> Option<&Path> {
        match self {
            Command::Serve(args) => args.config.as_deref(),
            Command::Run(args) => args.config.as_deref(),
            Command::Sweep(args) => args.config.as_deref(),
        }
    }
}

pub async fn run(args: Args) -> crate::Result<()> {
    let mut config = crate::core::ConfigLoader::load(args.command.config_path())?;
    if let Command::Serve(serve_args) = &args.command {
        if let Some(bind) = &serve_args.bind {
            config.server.bind = bind.clone();
            crate::core::config::ConfigValidator::validate(&config)?;
        }
    }

    let _logging = crate::logging::init(&args.command, config.logging.as_ref())?;

    match args.command {
        Command::Serve(_) => commands::serve(config).await,
        Command::Run(run_args) => commands::run(run_args, config).await,
        Command::Sweep(_) => commands::sweep(config).await,
    }
}
