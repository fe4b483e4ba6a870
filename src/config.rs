//! Configuration for the HTTP stub.
//!
//! Defines stub settings and an optional declarative expectation that can
//! be loaded from YAML instead of being set up in code.

use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

/// Main configuration for an [`HttpStub`](crate::HttpStub).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct StubConfig {
    /// Expectation to install when the stub is created
    #[serde(default)]
    pub expectation: Option<ExpectationDefinition>,

    /// Stub settings
    #[serde(default)]
    pub settings: StubSettings,
}

impl StubConfig {
    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(expectation) = &self.expectation {
            expectation
                .validate()
                .map_err(|e| anyhow::anyhow!("Expectation: {}", e))?;
        }
        Ok(())
    }
}

/// A declarative expectation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectationDefinition {
    /// HTTP method to expect
    #[serde(default = "default_method")]
    pub method: String,

    /// Absolute request URI to expect
    pub uri: String,

    /// What the intercepted request produces
    pub outcome: OutcomeDefinition,
}

fn default_method() -> String {
    "GET".to_string()
}

impl ExpectationDefinition {
    /// Validate the expectation definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.method()?;
        Url::parse(&self.uri).map_err(|e| anyhow::anyhow!("Invalid uri {}: {}", self.uri, e))?;
        self.outcome.validate()?;
        Ok(())
    }

    /// The parsed HTTP method.
    pub fn method(&self) -> anyhow::Result<Method> {
        Method::from_bytes(self.method.to_uppercase().as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid method {}: {}", self.method, e))
    }
}

/// Declarative outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutcomeDefinition {
    /// Bare status code, no body
    Status {
        code: u16,
        #[serde(default)]
        reason: Option<String>,
    },
    /// Payload given as a JSON value; negotiated like any other payload
    Json { content: serde_json::Value },
    /// Fail the request with a fault carrying this message
    Fault { message: String },
}

impl OutcomeDefinition {
    /// Validate the outcome definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let OutcomeDefinition::Status { code, .. } = self {
            status_code(*code)?;
        }
        Ok(())
    }
}

pub(crate) fn status_code(code: u16) -> anyhow::Result<StatusCode> {
    if !(100..=599).contains(&code) {
        anyhow::bail!("Invalid status code: {}", code);
    }
    Ok(StatusCode::from_u16(code)?)
}

/// Stub settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StubSettings {
    /// Log requests that pass validation
    #[serde(default = "default_true")]
    pub log_matches: bool,

    /// Log requests that fail validation
    #[serde(default = "default_true")]
    pub log_unmatched: bool,

    /// Indent JSON payloads
    #[serde(default)]
    pub pretty_json: bool,
}

fn default_true() -> bool {
    true
}

impl Default for StubSettings {
    fn default() -> Self {
        Self {
            log_matches: true,
            log_unmatched: true,
            pretty_json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_expectation() {
        let yaml = r#"
expectation:
  method: get
  uri: http://localhost/stringUri
  outcome:
    type: status
    code: 404
    reason: "Nothing here"
"#;
        let config = StubConfig::from_yaml(yaml).unwrap();
        let expectation = config.expectation.unwrap();
        assert_eq!(expectation.method().unwrap(), Method::GET);

        match expectation.outcome {
            OutcomeDefinition::Status { code, reason } => {
                assert_eq!(code, 404);
                assert_eq!(reason.as_deref(), Some("Nothing here"));
            }
            _ => panic!("Expected Status outcome"),
        }
    }

    #[test]
    fn test_parse_json_outcome() {
        let yaml = r#"
expectation:
  uri: http://localhost/sampleDto
  outcome:
    type: json
    content:
      id: 123
      name: sample
settings:
  pretty_json: true
"#;
        let config = StubConfig::from_yaml(yaml).unwrap();
        assert!(config.settings.pretty_json);
        assert!(config.settings.log_matches);

        let expectation = config.expectation.unwrap();
        assert_eq!(expectation.method, "GET");
        if let OutcomeDefinition::Json { content } = &expectation.outcome {
            assert_eq!(content["id"], 123);
        } else {
            panic!("Expected JSON outcome");
        }
    }

    #[test]
    fn test_parse_fault_outcome() {
        let yaml = r#"
expectation:
  method: POST
  uri: http://localhost/sampleDto
  outcome:
    type: fault
    message: "Something went wrong."
"#;
        let config = StubConfig::from_yaml(yaml).unwrap();
        match config.expectation.unwrap().outcome {
            OutcomeDefinition::Fault { message } => assert_eq!(message, "Something went wrong."),
            _ => panic!("Expected Fault outcome"),
        }
    }

    #[test]
    fn test_rejects_invalid_status() {
        let yaml = r#"
expectation:
  uri: http://localhost/
  outcome:
    type: status
    code: 42
"#;
        assert!(StubConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_relative_uri() {
        let yaml = r#"
expectation:
  uri: /stringUri
  outcome:
    type: status
    code: 200
"#;
        let err = StubConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Expectation"));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let yaml = r#"
settings:
  log_everything: true
"#;
        assert!(StubConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_empty_config_defaults() {
        let config = StubConfig::from_yaml("{}").unwrap();
        assert!(config.expectation.is_none());
        assert!(config.settings.log_unmatched);
        assert!(!config.settings.pretty_json);
    }
}
