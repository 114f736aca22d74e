#[path = "../common/mod.rs"]
mod common;

use common::DEPLOYMENT;
use manifest_sentry::core::manifest::{
    default_superfluous_keys, DocumentCollection, ManifestTransform, Normalizer, ValueStripper,
};
use serde_yaml::Value;

fn stripped(raw: &str) -> DocumentCollection {
    let mut documents = DocumentCollection::parse(raw);
    ValueStripper::with_defaults().strip(&mut documents);
    documents
}

#[test]
fn normalizing_twice_changes_nothing_the_second_time() {
    let normalizer = Normalizer::default();
    let (once, first_modified) = normalizer.normalize_all(stripped(DEPLOYMENT));
    let (twice, second_modified) = normalizer.normalize_all(once.clone());

    assert!(first_modified);
    assert!(!second_modified);
    assert_eq!(once, twice);
}

#[test]
fn labels_are_sorted_and_identity_keys_lead() {
    let raw = "spec: {}\nmetadata:\n  labels:\n    zone: a\n    app: web\n  name: web\nkind: Service\napiVersion: v1\n";
    let (documents, modified) = Normalizer::default().normalize_all(DocumentCollection::parse(raw));
    assert!(modified);

    let content = documents.documents()[0].content();
    let top: Vec<&str> = content
        .as_mapping()
        .unwrap()
        .keys()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(top, vec!["apiVersion", "kind", "metadata", "spec"]);

    let labels: Vec<&str> = content["metadata"]["labels"]
        .as_mapping()
        .unwrap()
        .keys()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(labels, vec!["app", "zone"]);
}

#[test]
fn emptied_parents_are_pruned_but_intentional_empty_nodes_stay() {
    let raw = "\
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  annotations:
    config.kubernetes.io/origin: overlays/prod
spec:
  template:
    spec:
      volumes:
        - name: scratch
          emptyDir: {}
";
    let (documents, _) = Normalizer::default().normalize_all(stripped(raw));
    let content = documents.documents()[0].content();

    assert!(content["metadata"].get("annotations").is_none());
    let volume = &content["spec"]["template"]["spec"]["volumes"][0];
    assert!(volume["emptyDir"].as_mapping().unwrap().is_empty());
}

#[test]
fn boolean_markers_collapse_only_when_exact() {
    let raw = "\
apiVersion: v1
kind: ConfigMap
metadata:
  name: flags
data:
  enabled: __manifest_sentry_bool_true__
  disabled: __manifest_sentry_bool_false__
  note: set __manifest_sentry_bool_true__ to enable
";
    let (documents, modified) = Normalizer::default().normalize_all(DocumentCollection::parse(raw));
    assert!(modified);

    let data = &documents.documents()[0].content()["data"];
    assert_eq!(data["enabled"], Value::Bool(true));
    assert_eq!(data["disabled"], Value::Bool(false));
    assert_eq!(
        data["note"].as_str(),
        Some("set __manifest_sentry_bool_true__ to enable")
    );
}

#[test]
fn string_scalars_are_preserved_byte_for_byte() {
    let raw = "\
apiVersion: v1
kind: ConfigMap
metadata:
  name: scripts
data:
  single: \"keep  \"
  run.sh: \"echo one  \\necho two\\t\\n\\n\"
  cert.pem: |
    -----BEGIN CERTIFICATE-----
    MIIB  
";
    let (documents, modified) = Normalizer::default().normalize_all(DocumentCollection::parse(raw));
    assert!(!modified);

    let data = &documents.documents()[0].content()["data"];
    assert_eq!(data["single"].as_str(), Some("keep  "));
    assert_eq!(data["run.sh"].as_str(), Some("echo one  \necho two\t\n\n"));
    assert_eq!(
        data["cert.pem"].as_str(),
        Some("-----BEGIN CERTIFICATE-----\nMIIB  \n")
    );
}

#[test]
fn custom_transform_sets_are_honored() {
    struct DropSpec;

    impl ManifestTransform for DropSpec {
        fn name(&self) -> &'static str {
            "DropSpec"
        }

        fn apply(&self, content: &mut Value) -> bool {
            content
                .as_mapping_mut()
                .and_then(|map| map.shift_remove("spec"))
                .is_some()
        }
    }

    let normalizer = Normalizer::with_transforms(vec![Box::new(DropSpec)]);
    assert_eq!(normalizer.transform_names(), vec!["DropSpec"]);

    let (documents, modified) = normalizer.normalize_all(DocumentCollection::parse(DEPLOYMENT));
    assert!(modified);
    assert!(documents.documents()[0].content().get("spec").is_none());
    // Only the configured transform ran, so the deny-listed keys are untouched.
    assert!(documents.documents()[0].content().get("status").is_some());
    assert_eq!(default_superfluous_keys()[0].to_string(), "status");
}
