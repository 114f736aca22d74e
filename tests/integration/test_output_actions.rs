use manifest_sentry::core::config::OutputConfig;
use manifest_sentry::core::manifest::{Stage, StageError};
use manifest_sentry::core::PipelineOutcome;
use manifest_sentry::logging::ExecutionContext;
use manifest_sentry::output::{error_report, report, OutputActions};
use std::fs;
use tempfile::TempDir;

fn failed_outcome() -> PipelineOutcome {
    PipelineOutcome {
        artifact: "apiVersion: v1\nkind: Secret\nmetadata:\n  name: db\n".to_string(),
        errors: vec![
            StageError::global(Stage::SecretPolicy, "unencrypted secret value for key 'password'"),
            StageError::reported(Stage::Schema, "Secret/db: data must be base64"),
        ],
        modified: false,
    }
}

#[test]
fn artifact_and_report_are_written_even_on_failure() {
    let dir = TempDir::new().unwrap();
    let config = OutputConfig {
        manifest_path: Some(dir.path().join("out/manifest.yaml")),
        errors_path: Some(dir.path().join("out/errors.txt")),
    };
    let outcome = failed_outcome();

    OutputActions::new(&config, ExecutionContext::LocalDev)
        .apply(&outcome)
        .unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("out/manifest.yaml")).unwrap(),
        outcome.artifact
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("out/errors.txt")).unwrap(),
        "<global>: unencrypted secret value for key 'password'\nSecret/db: data must be base64\n"
    );
}

#[test]
fn step_outputs_use_a_heredoc_delimiter() {
    let dir = TempDir::new().unwrap();
    let step_output = dir.path().join("github_output");
    fs::write(&step_output, "previous=1\n").unwrap();
    let config = OutputConfig {
        manifest_path: Some(dir.path().join("manifest.yaml")),
        errors_path: None,
    };

    OutputActions::new(&config, ExecutionContext::LocalDev)
        .with_step_output(Some(step_output.clone()))
        .apply(&failed_outcome())
        .unwrap();

    let written = fs::read_to_string(&step_output).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines[0], "previous=1");
    assert_eq!(
        lines[1],
        format!("manifest={}", dir.path().join("manifest.yaml").display())
    );
    let delimiter = lines[2].strip_prefix("errors<<").unwrap();
    assert!(delimiter.starts_with("MS_EOF_"));
    assert_eq!(lines[3], "<global>: unencrypted secret value for key 'password'");
    assert_eq!(lines[4], "Secret/db: data must be base64");
    assert_eq!(lines[5], delimiter);
}

#[test]
fn clean_run_has_an_empty_report_and_passes() {
    let outcome = PipelineOutcome {
        artifact: String::new(),
        errors: Vec::new(),
        modified: false,
    };
    assert!(error_report(&outcome).is_empty());
    assert!(report(&outcome, ExecutionContext::LocalDev).is_ok());
}

#[test]
fn failed_run_returns_the_joined_reason() {
    let err = report(&failed_outcome(), ExecutionContext::ActionHost).unwrap_err();
    assert_eq!(err.code, "MS-RUN-001");
    assert_eq!(err.context["errors"].lines().count(), 2);
}

#[test]
fn unwritable_destination_is_fatal() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("file");
    fs::write(&blocker, "").unwrap();
    let config = OutputConfig {
        manifest_path: Some(blocker.join("manifest.yaml")),
        errors_path: None,
    };

    let err = OutputActions::new(&config, ExecutionContext::LocalDev)
        .apply(&failed_outcome())
        .unwrap_err();
    assert_eq!(err.code, "MS-OUT-001");
}
