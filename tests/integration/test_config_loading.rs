use manifest_sentry::core::config::loader::CONFIG_FILE_NAME;
use manifest_sentry::core::manifest::default_superfluous_keys;
use manifest_sentry::core::{ConfigLoader, ConfigValidator, SentryConfig};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "MANIFEST_SENTRY_VERBOSE",
    "MANIFEST_SENTRY_RENDER_BINARY",
    "MANIFEST_SENTRY_SCHEMA_BINARY",
    "MANIFEST_SENTRY_SCHEMA_ENABLED",
    "MANIFEST_SENTRY_ALLOWED_SECRETS",
    "MANIFEST_SENTRY_OUTPUT_MANIFEST",
    "MANIFEST_SENTRY_OUTPUT_ERRORS",
];

fn clear_env() {
    for name in ENV_VARS {
        env::remove_var(name);
    }
}

#[test]
#[serial]
fn workspace_file_is_loaded_and_validated() {
    clear_env();
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join(CONFIG_FILE_NAME),
        r#"
verbose = true

[strip]
superfluous_keys = [["metadata", "labels", "ci.example.com/run"]]

[secrets]
allowed = ["prod/tls/*"]

[[custom_rules]]
name = "team-label"
path = ["metadata", "labels", "team"]
check = "present"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_workspace(workspace.path()).unwrap();
    ConfigValidator::validate(&config).unwrap();

    let settings = config.settings();
    assert!(settings.verbose);
    assert_eq!(
        settings.superfluous_keys.len(),
        default_superfluous_keys().len() + 1
    );
    assert_eq!(settings.allowed_secrets, vec!["prod/tls/*"]);
    assert_eq!(settings.custom_rules.len(), 1);
    assert_eq!(settings.required_binaries, vec!["kustomize", "kubeconform"]);
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    clear_env();
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join(CONFIG_FILE_NAME),
        "[output]\nmanifest_path = \"from-file.yaml\"\n",
    )
    .unwrap();
    env::set_var("MANIFEST_SENTRY_OUTPUT_MANIFEST", "from-env.yaml");
    env::set_var("MANIFEST_SENTRY_VERBOSE", "true");

    let config = ConfigLoader::load_from_workspace(workspace.path()).unwrap();
    clear_env();

    assert!(config.verbose);
    assert_eq!(
        config.output.manifest_path.as_deref(),
        Some(std::path::Path::new("from-env.yaml"))
    );
}

#[test]
#[serial]
fn explicit_file_outside_the_workspace_is_used() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ci.toml");
    fs::write(&path, "[schema]\nenabled = false\n").unwrap();

    let config = ConfigLoader::load_explicit(&path).unwrap();

    assert!(!config.schema.enabled);
    assert_eq!(config.required_binaries(), vec!["kustomize"]);
}

#[test]
#[serial]
fn invalid_allow_list_is_rejected_before_any_stage_runs() {
    clear_env();
    env::set_var("MANIFEST_SENTRY_ALLOWED_SECRETS", "prod");
    let workspace = TempDir::new().unwrap();

    let config = ConfigLoader::load_from_workspace(workspace.path()).unwrap();
    clear_env();

    let err = ConfigValidator::validate(&config).unwrap_err();
    assert_eq!(err.code, "MS-CFG-003");
}

#[test]
#[serial]
fn unknown_check_names_fail_to_parse() {
    clear_env();
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join(CONFIG_FILE_NAME),
        "[[custom_rules]]\nname = \"x\"\npath = [\"kind\"]\ncheck = \"exists\"\n",
    )
    .unwrap();

    let err = ConfigLoader::load_from_workspace(workspace.path()).unwrap_err();
    assert_eq!(err.code, "MS-CFG-001");
}

#[test]
fn printed_config_reloads_identically() {
    let mut config = SentryConfig::default();
    config.secrets.allowed = vec!["prod/db".to_string()];
    config.render.extra_args = vec!["--enable-helm".to_string()];

    let text = toml::to_string_pretty(&config).unwrap();
    let reloaded: SentryConfig = toml::from_str(&text).unwrap();

    assert_eq!(reloaded, config);
}
