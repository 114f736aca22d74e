use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Kustomization directory to render
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Additional resource rendered alongside PATH (repeatable)
    #[arg(long = "extra-resource", value_name = "PATH", help_heading = "Rendering")]
    pub extra_resources: Vec<PathBuf>,

    /// Extra argument passed to the templating tool (repeatable)
    #[arg(
        long = "render-arg",
        value_name = "ARG",
        allow_hyphen_values = true,
        help_heading = "Rendering"
    )]
    pub render_args: Vec<String>,

    /// Path to custom config file (default: ./manifest-sentry.toml)
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,

    /// Allow an unencrypted secret identity `<namespace>/<name>[/<key>]` (repeatable)
    #[arg(long = "allow-secret", value_name = "ID", help_heading = "Configuration")]
    pub allow_secrets: Vec<String>,

    /// Skip schema validation
    #[arg(long, help_heading = "Configuration")]
    pub skip_schema: bool,

    /// Narrate every stage with document and error counts
    #[arg(long, help_heading = "Output Options")]
    pub verbose: bool,

    /// Write the serialized manifest to FILE
    #[arg(long, value_name = "FILE", help_heading = "Output Options")]
    pub output: Option<PathBuf>,

    /// Write the error report to FILE
    #[arg(long, value_name = "FILE", help_heading = "Output Options")]
    pub errors_output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to custom config file (default: ./manifest-sentry.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
