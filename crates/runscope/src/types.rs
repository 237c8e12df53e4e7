//! Core types for Runscope entities.
//!
//! These mirror the JSON shapes of the Runscope API. Empty strings and
//! empty collections are left out of request bodies so that partially
//! populated entities only send what was set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A team that owns buckets and integrations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Team UUID.
    #[serde(default)]
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// A bucket: a named container of tests, addressed by its key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket key, assigned by the API.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Whether this is the team's default bucket.
    #[serde(default)]
    pub default: bool,
    /// Token used by trigger URLs.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_token: String,
    /// Link to the bucket's tests.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tests_url: String,
    /// Link to the bucket's collections.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub collections_url: String,
    /// Link to the bucket's captured messages.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub messages_url: String,
    /// URL that triggers every test in the bucket.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub trigger_url: String,
    /// Whether SSL certificates are verified.
    #[serde(default)]
    pub verify_ssl: bool,
    /// Owning team.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
}

impl Bucket {
    /// Team UUID, or an empty string when the bucket carries no team.
    #[must_use]
    pub fn team_id(&self) -> &str {
        self.team.as_ref().map_or("", |team| team.id.as_str())
    }
}

/// A person referenced by a test (creator) or email recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Contact ID.
    #[serde(default)]
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Email address.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

/// An API test inside a bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Test {
    /// Test ID, assigned by the API.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Key of the owning bucket. Routing only, never serialized.
    #[serde(skip)]
    pub bucket_key: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Environment used when the test is triggered without one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_environment_id: String,
    /// Creation timestamp as reported by the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<serde_json::Value>,
    /// Creator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Contact>,
}

/// Where an environment lives: shared by a bucket or owned by one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentScope {
    /// `/buckets/{bucket_key}/environments`
    Shared {
        /// Owning bucket key.
        bucket_key: String,
    },
    /// `/buckets/{bucket_key}/tests/{test_id}/environments`
    Test {
        /// Owning bucket key.
        bucket_key: String,
        /// Owning test ID.
        test_id: String,
    },
}

impl EnvironmentScope {
    /// Shared scope for a bucket.
    pub fn shared(bucket_key: impl Into<String>) -> Self {
        Self::Shared {
            bucket_key: bucket_key.into(),
        }
    }

    /// Test scope for a bucket and test.
    pub fn test(bucket_key: impl Into<String>, test_id: impl Into<String>) -> Self {
        Self::Test {
            bucket_key: bucket_key.into(),
            test_id: test_id.into(),
        }
    }

    /// Key of the bucket that ultimately owns the environment.
    #[must_use]
    pub fn bucket_key(&self) -> &str {
        match self {
            Self::Shared { bucket_key } | Self::Test { bucket_key, .. } => bucket_key,
        }
    }

    /// Collection path for environments in this scope.
    #[must_use]
    pub fn collection_path(&self) -> String {
        match self {
            Self::Shared { bucket_key } => format!("/buckets/{bucket_key}/environments"),
            Self::Test {
                bucket_key,
                test_id,
            } => format!("/buckets/{bucket_key}/tests/{test_id}/environments"),
        }
    }

    /// Short label used in logs and call counters.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Shared { .. } => "shared",
            Self::Test { .. } => "test",
        }
    }
}

/// An integration attached to an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentIntegration {
    /// Integration ID.
    #[serde(default)]
    pub id: String,
    /// Integration type, e.g. "slack".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub integration_type: String,
    /// Description shown in the dashboard.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A remote agent an environment runs tests from.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteAgent {
    /// Agent name.
    #[serde(default)]
    pub name: String,
    /// Agent UUID.
    #[serde(default)]
    pub uuid: String,
}

/// Email notification settings of an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSettings {
    /// Notify every team member.
    #[serde(default)]
    pub notify_all: bool,
    /// When to notify: "all", "failures", "threshold" or "switch".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notify_on: String,
    /// Consecutive failures before notifying.
    #[serde(default)]
    pub notify_threshold: i64,
    /// Explicit recipients.
    #[serde(default)]
    pub recipients: Vec<Contact>,
}

/// Variables and settings shared by test runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Environment ID, assigned by the API.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Owning test, for test-scoped environments.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub test_id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Initial script run before each test.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub script: String,
    /// Keep cookies between steps.
    #[serde(default)]
    pub preserve_cookies: bool,
    /// Variables available to every step.
    #[serde(default)]
    pub initial_variables: BTreeMap<String, String>,
    /// Integrations notified about runs.
    #[serde(default)]
    pub integrations: Vec<EnvironmentIntegration>,
    /// Regions the tests run from.
    #[serde(default)]
    pub regions: Vec<String>,
    /// Remote agents the tests run from.
    #[serde(default)]
    pub remote_agents: Vec<RemoteAgent>,
    /// Retry once before reporting a failure.
    #[serde(default)]
    pub retry_on_failure: bool,
    /// Whether SSL certificates are verified.
    #[serde(default)]
    pub verify_ssl: bool,
    /// URLs called after each run.
    #[serde(default)]
    pub webhooks: Vec<String>,
    /// Email notification settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emails: Option<EmailSettings>,
}

/// How often a test runs against an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Schedule ID, assigned by the API.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Environment the schedule runs with.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub environment_id: String,
    /// Interval, e.g. "1m" or "1h".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interval: String,
    /// Free-form note.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

/// A variable extracted from a step's response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// Variable name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Property within the source, e.g. a JSON path.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub property: String,
    /// Source of the value, e.g. "response_json".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
}

/// A check applied to a step's response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    /// Where the checked value comes from, e.g. "response_status".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
    /// Property within the source.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub property: String,
    /// Comparison, e.g. "equal_number".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comparison: String,
    /// Expected value, a string or a number.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub value: serde_json::Value,
}

/// Credentials sent with a request step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAuth {
    /// User name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    /// Auth scheme, e.g. "basic".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_type: String,
    /// Password.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
}

/// One step of a test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    /// Step ID, assigned by the API.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Step type, e.g. "request" or "pause".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub step_type: String,
    /// HTTP method of a request step.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,
    /// Request URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Request body.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
    /// Free-form note.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
    /// Variables extracted from the response, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Variable>,
    /// Assertions on the response, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<Assertion>,
    /// Request headers; a header may repeat.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
    /// Request credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<StepAuth>,
    /// Scripts run after the request, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<String>,
    /// Scripts run before the request, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before_scripts: Vec<String>,
}

impl TestStep {
    /// Check the step locally before it is sent.
    ///
    /// A "request" step must name a method, and a GET request cannot
    /// carry a body. Other step types are not checked.
    pub fn validate(&self) -> crate::Result<()> {
        if self.step_type != "request" {
            return Ok(());
        }

        if self.method.is_empty() {
            return Err(crate::Error::validation(
                "test step",
                "A request test step must specify 'Method' property",
            ));
        }

        if self.method == "GET" && !self.body.is_empty() {
            return Err(crate::Error::validation(
                "test step",
                "A request test step that specifies a 'GET' method can not include a body property",
            ));
        }

        Ok(())
    }
}

/// An integration configured for a team (Slack, PagerDuty, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    /// Integration ID.
    #[serde(default)]
    pub id: String,
    /// Integration type, e.g. "slack".
    #[serde(default, rename = "type")]
    pub integration_type: String,
    /// Description shown in the dashboard.
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_step(method: &str, body: &str) -> TestStep {
        TestStep {
            step_type: "request".to_string(),
            method: method.to_string(),
            body: body.to_string(),
            ..TestStep::default()
        }
    }

    #[test]
    fn test_step_validate_requires_method() {
        let err = request_step("", "").validate().unwrap_err();
        assert!(err.to_string().contains("must specify 'Method'"));
    }

    #[test]
    fn test_step_validate_rejects_get_with_body() {
        let err = request_step("GET", "{}").validate().unwrap_err();
        assert!(err.to_string().contains("'GET' method can not include a body"));
    }

    #[test]
    fn test_step_validate_accepts_valid_steps() {
        assert!(request_step("GET", "").validate().is_ok());
        assert!(request_step("POST", "{\"a\":1}").validate().is_ok());

        let pause = TestStep {
            step_type: "pause".to_string(),
            ..TestStep::default()
        };
        assert!(pause.validate().is_ok());
    }

    #[test]
    fn test_step_validate_ignores_non_request_steps() {
        let condition = TestStep {
            step_type: "condition".to_string(),
            method: "GET".to_string(),
            body: "x".to_string(),
            ..TestStep::default()
        };
        assert!(condition.validate().is_ok());
    }

    #[test]
    fn test_environment_scope_paths() {
        let shared = EnvironmentScope::shared("bkt");
        assert_eq!(shared.collection_path(), "/buckets/bkt/environments");
        assert_eq!(shared.bucket_key(), "bkt");
        assert_eq!(shared.label(), "shared");

        let scoped = EnvironmentScope::test("bkt", "t1");
        assert_eq!(scoped.collection_path(), "/buckets/bkt/tests/t1/environments");
        assert_eq!(scoped.bucket_key(), "bkt");
        assert_eq!(scoped.label(), "test");
    }

    #[test]
    fn test_bucket_serialization_omits_empty_fields() {
        let bucket = Bucket {
            name: "payments".to_string(),
            ..Bucket::default()
        };
        let json = serde_json::to_value(&bucket).unwrap();
        assert_eq!(json["name"], "payments");
        assert!(json.get("key").is_none());
        assert!(json.get("team").is_none());
    }

    #[test]
    fn test_bucket_team_id() {
        let mut bucket = Bucket::default();
        assert_eq!(bucket.team_id(), "");

        bucket.team = Some(Team {
            id: "team-1".to_string(),
            name: String::new(),
        });
        assert_eq!(bucket.team_id(), "team-1");
    }

    #[test]
    fn test_test_never_serializes_bucket_key() {
        let test = Test {
            bucket_key: "bkt".to_string(),
            name: "smoke".to_string(),
            ..Test::default()
        };
        let json = serde_json::to_string(&test).unwrap();
        assert!(!json.contains("bkt"));
        assert!(json.contains("smoke"));
    }

    #[test]
    fn test_integration_type_field_name() {
        let integration: Integration = serde_json::from_str(
            r#"{"id": "i1", "type": "slack", "description": "alerts channel"}"#,
        )
        .unwrap();
        assert_eq!(integration.integration_type, "slack");
        assert_eq!(integration.description, "alerts channel");
    }

    #[test]
    fn test_assertion_value_accepts_numbers_and_strings() {
        let assertions: Vec<Assertion> = serde_json::from_str(
            r#"[{"source": "response_status", "comparison": "equal_number", "value": 200},
                {"source": "response_json", "property": "ok", "comparison": "equal", "value": "true"}]"#,
        )
        .unwrap();
        assert_eq!(assertions[0].value, serde_json::json!(200));
        assert_eq!(assertions[1].value, serde_json::json!("true"));
    }
}
