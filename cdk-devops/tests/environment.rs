use std::path::PathBuf;

use cdk_devops::{EnvironmentError, EnvironmentLoader};
use serde_json::json;

fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn loader() -> EnvironmentLoader {
    EnvironmentLoader::new(fixtures_root().join("config"))
}

#[test]
fn load_environment_from_fixture() {
    let config = loader().load("dev").unwrap();

    assert_eq!(config.account, "111");
    assert_eq!(config.region, "eu-central-1");
    assert_eq!(config.service_connection.as_deref(), Some("conn-a"));
}

#[test]
fn load_environment_with_extra_keys() {
    let config = loader().load("prod").unwrap();

    assert_eq!(config.get_value("vpcCidr"), Some(json!("10.20.0.0/16")));
    assert_eq!(
        config.get_value("alarmEmails"),
        Some(json!(["ops@example.com"]))
    );
    assert_eq!(config.get_value("account"), Some(json!("222")));
    assert_eq!(config.get_value("missing"), None);
}

#[test]
fn load_environment_with_legacy_keys() {
    let config = loader().load("legacy").unwrap();

    assert_eq!(config.account, "333");
    assert_eq!(config.region, "us-east-1");
    assert_eq!(config.service_connection, None);
}

#[test]
fn missing_environment_is_not_found() {
    let result = loader().load("qa");

    assert!(matches!(result, Err(EnvironmentError::NotFound { .. })));
}

#[test]
fn malformed_environment_is_parse_error() {
    let loader = EnvironmentLoader::new(fixtures_root().join("broken-config"));

    assert!(matches!(
        loader.load("staging"),
        Err(EnvironmentError::Parse { .. })
    ));
    assert!(matches!(
        loader.load("incomplete"),
        Err(EnvironmentError::Parse { .. })
    ));
}

#[test]
fn lists_available_environments() {
    let names = loader().available().unwrap();

    assert_eq!(names, ["dev", "legacy", "prod"]);
}

#[test]
fn loads_all_environments() {
    let environments = loader().load_all().unwrap();

    assert_eq!(environments.len(), 3);
    assert_eq!(environments["prod"].account, "222");
}

#[test]
fn load_all_fails_on_broken_file() {
    let loader = EnvironmentLoader::new(fixtures_root().join("broken-config"));

    assert!(loader.load_all().is_err());
}
