#[path = "../common/mod.rs"]
mod common;

use common::{join_documents, DEPLOYMENT, PLAIN_SECRET};
use manifest_sentry::core::manifest::{
    AllowList, AllowListError, DocumentCollection, SecretIdentity, SecretScanner, Stage,
};

fn scan(allow: &[&str], raw: &str) -> Vec<String> {
    let scanner = SecretScanner::new(AllowList::new(allow).unwrap());
    scanner
        .scan(&DocumentCollection::parse(raw))
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn plain_secret_values_are_reported() {
    let errors = SecretScanner::new(AllowList::empty()).scan(&DocumentCollection::parse(PLAIN_SECRET));

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].stage(), Stage::SecretPolicy);
    assert_eq!(errors[0].label(), Some("Secret/prod/db-credentials"));
    assert!(errors[0].message().contains("'password'"));
    assert!(errors[0]
        .message()
        .contains("prod/db-credentials/password"));
}

#[test]
fn allow_list_matches_whole_secret_or_single_key() {
    assert!(scan(&["prod/db-credentials"], PLAIN_SECRET).is_empty());
    assert!(scan(&["prod/db-credentials/password"], PLAIN_SECRET).is_empty());
    assert!(scan(&["prod/*"], PLAIN_SECRET).is_empty());
    assert_eq!(scan(&["staging/db-credentials"], PLAIN_SECRET).len(), 1);
    assert_eq!(scan(&["prod/db-credentials/username"], PLAIN_SECRET).len(), 1);
}

#[test]
fn sops_encrypted_documents_are_not_reported() {
    let encrypted = "\
apiVersion: v1
kind: Secret
metadata:
  name: db-credentials
  namespace: prod
stringData:
  password: ENC[AES256_GCM,data:abc,type:str]
sops:
  version: 3.8.1
";
    assert!(scan(&[], encrypted).is_empty());
}

#[test]
fn base64_data_is_reported_per_key() {
    let secret = "\
apiVersion: v1
kind: Secret
metadata:
  name: tls
  namespace: edge
data:
  tls.crt: LS0tLS1CRUdJTg==
  tls.key: LS0tLS1CRUdJTg==
";
    let errors = scan(&[], secret);
    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("edge/tls/tls.crt"));
    assert!(errors[1].contains("edge/tls/tls.key"));
}

#[test]
fn config_maps_are_only_checked_for_sensitive_keys() {
    let config_map = "\
apiVersion: v1
kind: ConfigMap
metadata:
  name: app
  namespace: prod
data:
  LOG_LEVEL: debug
  DB_PASSWORD: swordfish
";
    let errors = scan(&[], config_map);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("DB_PASSWORD"));
}

#[test]
fn non_secret_documents_are_ignored() {
    assert!(scan(&[], DEPLOYMENT).is_empty());
}

#[test]
fn documents_with_structural_errors_are_not_scanned_twice() {
    let broken = "apiVersion: v1\nkind: Secret\nstringData:\n  password: x\n";
    let raw = join_documents(&[broken, PLAIN_SECRET]);
    let errors = scan(&[], &raw);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Secret/prod/db-credentials"));
}

#[test]
fn malformed_allow_list_entries_are_rejected() {
    assert!(matches!(
        AllowList::new(["just-a-name"]),
        Err(AllowListError::Shape(_))
    ));
    assert!(matches!(
        AllowList::new(["a/b/c/d"]),
        Err(AllowListError::Shape(_))
    ));
    assert!(AllowList::new(["prod/tls/*"]).is_ok());
}

#[test]
fn identity_display_includes_namespace_name_and_key() {
    let identity = SecretIdentity::new("prod", "db", "password");
    assert_eq!(identity.to_string(), "prod/db/password");
    assert_eq!(identity.owner(), "prod/db");
}
