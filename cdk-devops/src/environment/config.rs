//! Per-environment deployment configuration.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error};

/// Deployment target for a single environment, loaded from `<name>.json`.
///
/// Keys other than the three known fields are kept in [`extra`](Self::extra)
/// and can be read with [`get_value`](Self::get_value).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    /// AWS account id the environment deploys into.
    #[serde(alias = "AccountId")]
    pub account: String,

    /// AWS region the environment deploys into.
    #[serde(alias = "AWSRegion")]
    pub region: String,

    /// Azure DevOps service connection used by the deployment stage.
    #[serde(default)]
    pub service_connection: Option<String>,

    /// Any further keys present in the file.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl EnvironmentConfig {
    /// Looks up a value by its JSON key.
    ///
    /// Known fields are reachable under their file names (`account`, `region`,
    /// `serviceConnection`); every other key comes from [`extra`](Self::extra).
    /// Unknown keys are logged and yield `None`.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        let value = match key {
            "account" => Some(Value::String(self.account.clone())),
            "region" => Some(Value::String(self.region.clone())),
            "serviceConnection" => self.service_connection.clone().map(Value::String),
            other => self.extra.get(other).cloned(),
        };

        if value.is_none() {
            error!(key, "Key not found in environment configuration");
            debug!(available = ?self.keys(), "Available keys");
        }

        value
    }

    /// Returns every key present in this configuration.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = vec!["account", "region"];
        if self.service_connection.is_some() {
            keys.push("serviceConnection");
        }
        keys.extend(self.extra.keys().map(String::as_str));
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_camel_case_fields() {
        let config: EnvironmentConfig = serde_json::from_value(json!({
            "account": "111",
            "region": "eu-central-1",
            "serviceConnection": "conn-a"
        }))
        .unwrap();

        assert_eq!(config.account, "111");
        assert_eq!(config.region, "eu-central-1");
        assert_eq!(config.service_connection.as_deref(), Some("conn-a"));
        assert!(config.extra.is_empty());
    }

    #[test]
    fn accepts_legacy_key_names() {
        let config: EnvironmentConfig = serde_json::from_value(json!({
            "AccountId": "947429061527",
            "AWSRegion": "eu-central-1",
            "QueueName": "my-sample-dev-queue"
        }))
        .unwrap();

        assert_eq!(config.account, "947429061527");
        assert_eq!(config.region, "eu-central-1");
        assert_eq!(config.service_connection, None);
        assert_eq!(
            config.get_value("QueueName"),
            Some(json!("my-sample-dev-queue"))
        );
    }

    #[test]
    fn get_value_returns_none_for_unknown_key() {
        let config: EnvironmentConfig =
            serde_json::from_value(json!({"account": "1", "region": "us-east-1"})).unwrap();

        assert_eq!(config.get_value("account"), Some(json!("1")));
        assert_eq!(config.get_value("serviceConnection"), None);
        assert_eq!(config.get_value("NonExistentKey"), None);
    }

    #[test]
    fn rejects_missing_region() {
        let result: Result<EnvironmentConfig, _> =
            serde_json::from_value(json!({"account": "1"}));
        assert!(result.is_err());
    }
}
