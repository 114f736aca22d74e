#[path = "../common/mod.rs"]
mod common;

use common::{
    join_documents, CannedSchemaValidator, RecordingRunner, StaticRenderer, DEPLOYMENT,
    PLAIN_SECRET,
};
use manifest_sentry::core::config::Settings;
use manifest_sentry::core::manifest::{DocumentCollection, Stage};
use manifest_sentry::core::validation::NoopSchemaValidator;
use manifest_sentry::core::Pipeline;
use manifest_sentry::tools::{KustomizeRenderer, RenderRequest, Renderer};
use std::sync::Arc;

#[tokio::test]
async fn deployment_and_plain_secret_produce_one_error() {
    let raw = join_documents(&[DEPLOYMENT, PLAIN_SECRET]);
    let pipeline = Pipeline::new(
        &Settings::default(),
        StaticRenderer::new(raw),
        Arc::new(NoopSchemaValidator),
    )
    .unwrap();

    let outcome = pipeline.run(&RenderRequest::new("deploy")).await.unwrap();

    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].stage(), Stage::SecretPolicy);
    assert!(outcome.errors[0]
        .to_string()
        .contains("prod/db-credentials/password"));
    assert!(outcome.modified);

    let documents = DocumentCollection::parse(&outcome.artifact);
    assert_eq!(documents.len(), 2);
    assert_eq!(outcome.artifact.matches("---\n").count(), 1);
    assert_eq!(documents.documents()[0].label(), "Deployment/prod/web");
    assert!(documents.documents()[0].content().get("status").is_none());
    assert_eq!(documents.documents()[1].label(), "Secret/prod/db-credentials");
}

#[tokio::test]
async fn allowed_secret_makes_the_run_clean() {
    let settings = Settings {
        allowed_secrets: vec!["prod/db-credentials".to_string()],
        ..Settings::default()
    };
    let raw = join_documents(&[DEPLOYMENT, PLAIN_SECRET]);
    let pipeline = Pipeline::new(&settings, StaticRenderer::new(raw), Arc::new(NoopSchemaValidator))
        .unwrap();

    let outcome = pipeline.run(&RenderRequest::new("deploy")).await.unwrap();

    assert!(outcome.is_success());
    assert!(outcome.verdict().is_ok());
}

#[tokio::test]
async fn schema_validator_sees_the_serialized_artifact() {
    let schema = CannedSchemaValidator::with_findings(&[]);
    let pipeline = Pipeline::new(
        &Settings::default(),
        StaticRenderer::new(DEPLOYMENT),
        schema.clone(),
    )
    .unwrap();

    let outcome = pipeline.run(&RenderRequest::new("deploy")).await.unwrap();

    assert_eq!(schema.artifacts(), vec![outcome.artifact.clone()]);
    assert!(!outcome.artifact.contains("creationTimestamp"));
}

#[tokio::test]
async fn kustomize_output_flows_through_the_pipeline() {
    let runner = RecordingRunner::new(0, DEPLOYMENT, "");
    let renderer = Arc::new(KustomizeRenderer::with_runner("kustomize", runner.clone()));
    let pipeline =
        Pipeline::new(&Settings::default(), renderer, Arc::new(NoopSchemaValidator)).unwrap();

    let outcome = pipeline.run(&RenderRequest::new("deploy")).await.unwrap();

    assert!(outcome.is_success());
    let requests = runner.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].program, "kustomize");
    assert_eq!(requests[0].args, vec!["build", "deploy"]);
}

#[tokio::test]
async fn render_output_larger_than_the_diagnostic_cap_is_kept_whole() {
    let blob = "x".repeat(1024);
    let documents: Vec<String> = (0..9000)
        .map(|i| {
            format!(
                "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm-{}\n  namespace: bulk\ndata:\n  blob: {}\n",
                i, blob
            )
        })
        .collect();
    let raw = documents.join("---\n");
    assert!(raw.len() > 8 * 1_048_576);

    let runner = RecordingRunner::new(0, &raw, "");
    let renderer = Arc::new(KustomizeRenderer::with_runner("kustomize", runner));
    let rendered = renderer.render(&RenderRequest::new("deploy")).await.unwrap();
    assert_eq!(rendered.len(), raw.len());

    let pipeline =
        Pipeline::new(&Settings::default(), renderer, Arc::new(NoopSchemaValidator)).unwrap();
    let outcome = pipeline.run(&RenderRequest::new("deploy")).await.unwrap();

    assert!(outcome.is_success(), "{:?}", outcome.errors);
    let artifact = DocumentCollection::parse(&outcome.artifact);
    assert_eq!(artifact.len(), 9000);
    assert_eq!(
        artifact.documents()[8999].label(),
        "ConfigMap/bulk/cm-8999"
    );
}

#[tokio::test]
async fn processing_the_artifact_again_is_stable() {
    let pipeline = Pipeline::new(
        &Settings::default(),
        StaticRenderer::new(""),
        Arc::new(NoopSchemaValidator),
    )
    .unwrap();

    let first = pipeline.process(DEPLOYMENT).await.unwrap();
    let second = pipeline.process(&first.artifact).await.unwrap();

    assert_eq!(first.artifact, second.artifact);
    assert!(!second.modified);
}
