use crate::{
    cli::args::{ConfigArgs, RunArgs},
    core::{
        validation::{KubeconformValidator, NoopSchemaValidator, SchemaValidator},
        ConfigLoader, ConfigValidator, Pipeline, SentryConfig,
    },
    logging,
    output::{self, OutputActions},
    tools::{ensure_required_binaries, KustomizeRenderer, RenderRequest},
    Result,
};
use anyhow::Context;
use std::env;
use std::path::Path;
use std::sync::Arc;

pub async fn run(args: RunArgs) -> Result<()> {
    let workspace = env::current_dir().context("failed to resolve working directory")?;
    let mut config = load_config(args.config.as_deref(), &workspace)?;
    apply_run_overrides(&mut config, &args);

    let guard = logging::init(&config.logging, Some(&workspace))?;
    tracing::info!(
        target_path = %args.path.display(),
        version = crate::VERSION,
        "starting manifest run"
    );

    ConfigValidator::validate(&config)?;
    ensure_required_binaries(&config.required_binaries())?;

    let renderer = Arc::new(KustomizeRenderer::new(config.render.binary.clone()));
    let schema: Arc<dyn SchemaValidator> = if config.schema.enabled {
        Arc::new(KubeconformValidator::new(
            config.schema.binary.clone(),
            config.schema.args.clone(),
        ))
    } else {
        tracing::info!("schema validation disabled");
        Arc::new(NoopSchemaValidator)
    };

    let pipeline = Pipeline::new(&config.settings(), renderer, schema)?;
    let request = RenderRequest {
        target: args.path.clone(),
        extra_resources: config.render.extra_resources.clone(),
        extra_args: config.render.extra_args.clone(),
    };
    let outcome = pipeline.run(&request).await?;

    OutputActions::new(&config.output, guard.context()).apply(&outcome)?;
    output::report(&outcome, guard.context())?;
    Ok(())
}

pub fn config(args: ConfigArgs) -> Result<()> {
    let workspace = env::current_dir().context("failed to resolve working directory")?;
    let config = load_config(args.config.as_deref(), &workspace)?;
    let rendered =
        toml::to_string_pretty(&config).context("failed to render configuration as TOML")?;
    print!("{}", rendered);
    Ok(())
}

fn load_config(explicit: Option<&Path>, workspace: &Path) -> Result<SentryConfig> {
    let config = match explicit {
        Some(path) => ConfigLoader::load_explicit(path)?,
        None => ConfigLoader::load_from_workspace(workspace)?,
    };
    Ok(config)
}

/// Command-line flags win over file and environment values; list flags extend them.
fn apply_run_overrides(config: &mut SentryConfig, args: &RunArgs) {
    if args.verbose {
        config.verbose = true;
    }
    if args.skip_schema {
        config.schema.enabled = false;
    }
    if let Some(path) = &args.output {
        config.output.manifest_path = Some(path.clone());
    }
    if let Some(path) = &args.errors_output {
        config.output.errors_path = Some(path.clone());
    }
    config
        .render
        .extra_resources
        .extend(args.extra_resources.iter().cloned());
    config.render.extra_args.extend(args.render_args.iter().cloned());
    config.secrets.allowed.extend(args.allow_secrets.iter().cloned());
}
