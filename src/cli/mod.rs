pub mod args;
pub mod commands;

pub use args::{ConfigArgs, RunArgs};
use clap::{Parser, Subcommand};

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "manifest-sentry")]
#[command(version = crate::VERSION)]
#[command(about = "Render, sanitize and validate Kubernetes manifests in CI")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: run against a kustomization, read the error report, fix the sources and run again."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Render and validate a kustomization",
        long_about = "Run renders the target, strips superfluous keys, normalizes every document, scans for unencrypted secrets, serializes the artifact and validates it against schemas and custom rules. Every finding is collected before the run fails.",
        after_help = "Example:\n    manifest-sentry run ./deploy/overlays/prod --output out/manifest.yaml"
    )]
    Run(RunArgs),
    #[command(
        about = "Print the effective configuration",
        long_about = "Config loads manifest-sentry.toml, applies MANIFEST_SENTRY_* environment overrides and prints the result as TOML.",
        after_help = "Example:\n    manifest-sentry config --config ci/manifest-sentry.toml"
    )]
    Config(ConfigArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Run(run_args) => commands::run(run_args).await,
        Command::Config(config_args) => commands::config(config_args),
    }
}
