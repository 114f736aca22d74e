#[path = "../common/mod.rs"]
mod common;

use common::{
    join_documents, BrokenSchemaValidator, CannedSchemaValidator, FailingRenderer,
    StaticRenderer, DEPLOYMENT, PLAIN_SECRET,
};
use manifest_sentry::core::config::Settings;
use manifest_sentry::core::manifest::{KeyPath, Stage};
use manifest_sentry::core::validation::{NoopSchemaValidator, RuleCheck, RuleDefinition};
use manifest_sentry::core::Pipeline;
use manifest_sentry::tools::RenderRequest;
use std::sync::Arc;

fn team_label_rule() -> RuleDefinition {
    RuleDefinition {
        name: "team-label".to_string(),
        kinds: vec!["Deployment".to_string()],
        path: KeyPath::new(["metadata", "labels", "team"]).unwrap(),
        check: RuleCheck::Present,
        value: None,
        message: None,
    }
}

#[tokio::test]
async fn structural_errors_are_counted_once_each() {
    let raw = join_documents(&[
        "kind: [unclosed\n",
        "apiVersion: v1\nkind: ConfigMap\n",
        DEPLOYMENT,
    ]);
    let pipeline = Pipeline::new(
        &Settings::default(),
        StaticRenderer::new(raw),
        Arc::new(NoopSchemaValidator),
    )
    .unwrap();

    let outcome = pipeline.run(&RenderRequest::new(".")).await.unwrap();

    assert_eq!(outcome.errors.len(), 2);
    assert!(outcome
        .errors
        .iter()
        .all(|error| error.stage() == Stage::Structural));
    assert!(outcome.artifact.contains("# Document"));
}

#[tokio::test]
async fn every_stage_contributes_in_order() {
    let settings = Settings {
        custom_rules: vec![team_label_rule()],
        ..Settings::default()
    };
    let raw = join_documents(&["apiVersion: v1\nkind: ConfigMap\n", PLAIN_SECRET, DEPLOYMENT]);
    let schema = CannedSchemaValidator::with_findings(&["Deployment/web: replicas must be int"]);
    let pipeline = Pipeline::new(&settings, StaticRenderer::new(raw), schema).unwrap();

    let outcome = pipeline.run(&RenderRequest::new(".")).await.unwrap();

    let stages: Vec<Stage> = outcome.errors.iter().map(|error| error.stage()).collect();
    assert_eq!(
        stages,
        vec![
            Stage::SecretPolicy,
            Stage::Structural,
            Stage::Schema,
            Stage::Custom
        ]
    );
    assert_eq!(
        outcome.errors[2].to_string(),
        "Deployment/web: replicas must be int"
    );
    assert!(outcome.errors[3].to_string().contains("[team-label]"));

    let reason = outcome.failure_reason().unwrap();
    assert_eq!(reason.lines().count(), 4);
    assert_eq!(outcome.verdict().unwrap_err().code, "MS-RUN-001");
}

#[tokio::test]
async fn broken_plain_secrets_are_reported_only_as_structural_errors() {
    let settings = Settings {
        custom_rules: vec![team_label_rule()],
        ..Settings::default()
    };
    let broken_secrets: Vec<String> = (0..3)
        .map(|i| {
            format!(
                "apiVersion: v1\nkind: Secret\nmetadata:\n  namespace: prod\nstringData:\n  token-{}: s3cr3t\n",
                i
            )
        })
        .collect();
    let mut documents: Vec<&str> = broken_secrets.iter().map(String::as_str).collect();
    documents.push(DEPLOYMENT);
    let raw = join_documents(&documents);
    let schema = CannedSchemaValidator::with_findings(&["Deployment/web: replicas must be int"]);
    let pipeline = Pipeline::new(&settings, StaticRenderer::new(raw), schema.clone()).unwrap();

    let outcome = pipeline.run(&RenderRequest::new(".")).await.unwrap();

    let count = |stage: Stage| {
        outcome
            .errors
            .iter()
            .filter(|error| error.stage() == stage)
            .count()
    };
    assert_eq!(count(Stage::Structural), 3);
    assert_eq!(count(Stage::SecretPolicy), 0);
    assert_eq!(count(Stage::Schema), 1);
    assert_eq!(count(Stage::Custom), 1);
    assert_eq!(outcome.errors.len(), 5);
    assert_eq!(outcome.failure_reason().unwrap().lines().count(), 5);
    assert!(!schema.artifacts()[0].contains("s3cr3t"));
}

#[tokio::test]
async fn line_breaks_in_a_broken_label_do_not_leak_into_the_artifact() {
    let settings = Settings {
        custom_rules: vec![team_label_rule()],
        ..Settings::default()
    };
    let broken = "apiVersion: v1\nkind: \"Config\\nmap: [x\"\nmetadata:\n  namespace: prod\n";
    let raw = join_documents(&[broken, DEPLOYMENT]);
    let pipeline = Pipeline::new(
        &settings,
        StaticRenderer::new(raw),
        Arc::new(NoopSchemaValidator),
    )
    .unwrap();

    let outcome = pipeline.run(&RenderRequest::new(".")).await.unwrap();

    let stages: Vec<Stage> = outcome.errors.iter().map(|error| error.stage()).collect();
    assert_eq!(stages, vec![Stage::Structural, Stage::Custom]);
    assert!(outcome.errors[1].to_string().contains("[team-label]"));
    assert!(outcome
        .artifact
        .starts_with("# Document Config\\nmap: [x/prod/<unknown> has errors:\n"));
}

#[tokio::test]
async fn render_failure_aborts_the_run() {
    let pipeline = Pipeline::new(
        &Settings::default(),
        Arc::new(FailingRenderer),
        Arc::new(NoopSchemaValidator),
    )
    .unwrap();

    let err = pipeline.run(&RenderRequest::new(".")).await.unwrap_err();

    assert_eq!(err.code, "MS-RENDER-002");
    assert_eq!(err.context.get("stage").map(String::as_str), Some("rendered"));
}

#[tokio::test]
async fn schema_tool_failure_aborts_the_run() {
    let pipeline = Pipeline::new(
        &Settings::default(),
        StaticRenderer::new(PLAIN_SECRET),
        Arc::new(BrokenSchemaValidator),
    )
    .unwrap();

    let err = pipeline.process(PLAIN_SECRET).await.unwrap_err();

    assert_eq!(err.code, "MS-SCHEMA-001");
    assert_eq!(
        err.context.get("stage").map(String::as_str),
        Some("schema-validated")
    );
}

#[test]
fn invalid_custom_rules_are_a_config_error() {
    let mut rule = team_label_rule();
    rule.check = RuleCheck::Matches;
    rule.value = Some("(".to_string());
    let settings = Settings {
        custom_rules: vec![rule],
        ..Settings::default()
    };

    let result = Pipeline::new(
        &settings,
        StaticRenderer::new(""),
        Arc::new(NoopSchemaValidator),
    );

    assert_eq!(result.err().map(|e| e.code), Some("MS-CFG-004".to_string()));
}
