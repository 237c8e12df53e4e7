//! Runscope REST API backend.
//!
//! This module provides the [`HttpBackend`] implementation, a blocking
//! client for `https://api.runscope.com`.
//!
//! Every response is wrapped in an envelope:
//!
//! ```json
//! { "meta": { "status": "success" }, "data": { ... }, "error": null }
//! ```
//!
//! A status of 300 or above becomes [`Error::Api`] carrying the reason from
//! the envelope's `error` member when there is one.

use crate::backend::Backend;
use crate::error::{Error, Operation, Result};
use crate::logging::{DebugLog, RequestLog};
use crate::types::{Bucket, Environment, EnvironmentScope, Integration, Schedule, Test, TestStep};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::{Mutex, PoisonError};

/// Default Runscope API base URL.
pub const DEFAULT_API_URL: &str = "https://api.runscope.com";

const JSON: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

enum Payload<'a> {
    Empty,
    Json(String),
    Form(Vec<(&'a str, &'a str)>),
}

/// Blocking Runscope API backend.
///
/// # Example
///
/// ```no_run
/// use runscope::backend::http::HttpBackend;
/// use runscope::backend::Backend;
///
/// let backend = HttpBackend::new("https://api.runscope.com", "my-token");
/// let buckets = backend.list_buckets().unwrap();
/// println!("Found {} buckets", buckets.len());
/// ```
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// API base URL, without a trailing slash.
    api_url: String,
    /// Bearer token.
    access_token: String,
    /// Where requests and responses are reported.
    log: Box<dyn RequestLog>,
    /// Serializes step creation; the API appends steps to a shared list.
    step_lock: Mutex<()>,
}

impl HttpBackend {
    /// Create a backend that logs through [`DebugLog`].
    #[must_use]
    pub fn new(api_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::with_request_log(api_url, access_token, Box::new(DebugLog))
    }

    /// Create a backend with a custom request log.
    #[must_use]
    pub fn with_request_log(
        api_url: impl Into<String>,
        access_token: impl Into<String>,
        log: Box<dyn RequestLog>,
    ) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            log,
            step_lock: Mutex::new(()),
        }
    }

    /// Get the API base URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Send one request and return the status and raw body.
    fn send(&self, method: Method, path: &str, payload: Payload<'_>) -> Result<(u16, String)> {
        let url = format!("{}{}", self.api_url, path);
        let authorization = format!("Bearer {}", self.access_token);

        let logged_body = match &payload {
            Payload::Empty => None,
            Payload::Json(body) => Some(body.clone()),
            Payload::Form(fields) => Some(
                fields
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join("&"),
            ),
        };
        self.log.request(method.as_str(), &url, logged_body.as_deref());

        let mut response = match method {
            Method::Get => self
                .agent
                .get(&url)
                .header("Authorization", authorization.as_str())
                .header("Accept", JSON)
                .call()?,
            Method::Delete => self
                .agent
                .delete(&url)
                .header("Authorization", authorization.as_str())
                .header("Accept", JSON)
                .header("Content-Type", JSON)
                .call()?,
            Method::Post | Method::Put => {
                let request = if method == Method::Post {
                    self.agent.post(&url)
                } else {
                    self.agent.put(&url)
                };
                let request = request
                    .header("Authorization", authorization.as_str())
                    .header("Accept", JSON);
                match payload {
                    Payload::Form(fields) => request.send_form(fields)?,
                    Payload::Json(body) => request.header("Content-Type", JSON).send(body.as_str())?,
                    Payload::Empty => request.header("Content-Type", JSON).send_empty()?,
                }
            }
        };

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        self.log.response(method.as_str(), &url, status, &body);
        Ok((status, body))
    }

    /// Send a request and decode the envelope's `data` member.
    fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Payload<'_>,
        operation: Operation,
        entity: &'static str,
        target: &str,
    ) -> Result<T> {
        let (status, body) = self.send(method, path, payload)?;
        check_status(status, &body, operation, entity, target)?;
        decode_data(&body)
    }

    /// Send a request whose response body is not needed.
    fn execute(
        &self,
        method: Method,
        path: &str,
        operation: Operation,
        entity: &'static str,
        target: &str,
    ) -> Result<()> {
        let (status, body) = self.send(method, path, Payload::Empty)?;
        check_status(status, &body, operation, entity, target)
    }
}

// =============================================================================
// Endpoints
// =============================================================================

fn bucket_path(key: &str) -> String {
    format!("/buckets/{key}")
}

fn tests_path(bucket_key: &str) -> String {
    format!("/buckets/{bucket_key}/tests")
}

fn test_path(bucket_key: &str, test_id: &str) -> String {
    format!("/buckets/{bucket_key}/tests/{test_id}")
}

fn schedules_path(bucket_key: &str, test_id: &str) -> String {
    format!("{}/schedules", test_path(bucket_key, test_id))
}

fn steps_path(bucket_key: &str, test_id: &str) -> String {
    format!("{}/steps", test_path(bucket_key, test_id))
}

fn integrations_path(team_id: &str) -> String {
    format!("/teams/{team_id}/integrations")
}

// =============================================================================
// Envelope handling
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

fn check_status(
    status: u16,
    body: &str,
    operation: Operation,
    entity: &'static str,
    target: &str,
) -> Result<()> {
    if status >= 300 {
        return Err(Error::api(operation, entity, target, status, error_reason(body)));
    }
    Ok(())
}

fn decode_data<T: DeserializeOwned>(body: &str) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_str(body)?;
    envelope
        .data
        .ok_or_else(|| Error::InvalidResponse("response has no data member".to_string()))
}

/// Pull a human-readable reason out of an error body.
fn error_reason(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let reason = parsed
        .as_ref()
        .and_then(|value| value.get("error"))
        .and_then(|error| match error {
            serde_json::Value::String(message) => Some(message.clone()),
            serde_json::Value::Object(fields) => fields
                .get("error")
                .or_else(|| fields.get("message"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            _ => None,
        });

    reason.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "no response body".to_string()
        } else {
            trimmed.to_string()
        }
    })
}

impl Backend for HttpBackend {
    fn create_bucket(&self, bucket: &Bucket) -> Result<Bucket> {
        let form = vec![("name", bucket.name.as_str()), ("team_uuid", bucket.team_id())];
        self.fetch(
            Method::Post,
            "/buckets",
            Payload::Form(form),
            Operation::Create,
            "bucket",
            &bucket.name,
        )
    }

    fn read_bucket(&self, key: &str) -> Result<Bucket> {
        self.fetch(Method::Get, &bucket_path(key), Payload::Empty, Operation::Read, "bucket", key)
    }

    fn delete_bucket(&self, key: &str) -> Result<()> {
        self.execute(Method::Delete, &bucket_path(key), Operation::Delete, "bucket", key)
    }

    fn list_buckets(&self) -> Result<Vec<Bucket>> {
        self.fetch(Method::Get, "/buckets", Payload::Empty, Operation::List, "buckets", "")
    }

    fn create_test(&self, test: &Test) -> Result<Test> {
        let body = serde_json::to_string(test)?;
        let mut created: Test = self.fetch(
            Method::Post,
            &tests_path(&test.bucket_key),
            Payload::Json(body),
            Operation::Create,
            "test",
            &test.name,
        )?;
        created.bucket_key.clone_from(&test.bucket_key);
        Ok(created)
    }

    fn read_test(&self, bucket_key: &str, test_id: &str) -> Result<Test> {
        let mut test: Test = self.fetch(
            Method::Get,
            &test_path(bucket_key, test_id),
            Payload::Empty,
            Operation::Read,
            "test",
            test_id,
        )?;
        test.bucket_key = bucket_key.to_string();
        Ok(test)
    }

    fn update_test(&self, test: &Test) -> Result<Test> {
        let body = serde_json::to_string(test)?;
        let mut updated: Test = self.fetch(
            Method::Put,
            &test_path(&test.bucket_key, &test.id),
            Payload::Json(body),
            Operation::Update,
            "test",
            &test.id,
        )?;
        updated.bucket_key.clone_from(&test.bucket_key);
        Ok(updated)
    }

    fn delete_test(&self, bucket_key: &str, test_id: &str) -> Result<()> {
        self.execute(
            Method::Delete,
            &test_path(bucket_key, test_id),
            Operation::Delete,
            "test",
            test_id,
        )
    }

    fn list_tests(&self, bucket_key: &str, count: usize, offset: usize) -> Result<Vec<Test>> {
        let path = format!("{}?count={count}&offset={offset}", tests_path(bucket_key));
        let mut tests: Vec<Test> =
            self.fetch(Method::Get, &path, Payload::Empty, Operation::List, "tests", bucket_key)?;
        for test in &mut tests {
            test.bucket_key = bucket_key.to_string();
        }
        Ok(tests)
    }

    fn create_environment(
        &self,
        scope: &EnvironmentScope,
        environment: &Environment,
    ) -> Result<Environment> {
        let body = serde_json::to_string(environment)?;
        self.fetch(
            Method::Post,
            &scope.collection_path(),
            Payload::Json(body),
            Operation::Create,
            "environment",
            &environment.name,
        )
    }

    fn read_environment(&self, scope: &EnvironmentScope, id: &str) -> Result<Environment> {
        let path = format!("{}/{id}", scope.collection_path());
        self.fetch(Method::Get, &path, Payload::Empty, Operation::Read, "environment", id)
    }

    fn update_environment(
        &self,
        scope: &EnvironmentScope,
        environment: &Environment,
    ) -> Result<Environment> {
        let path = format!("{}/{}", scope.collection_path(), environment.id);
        let body = serde_json::to_string(environment)?;
        self.fetch(
            Method::Put,
            &path,
            Payload::Json(body),
            Operation::Update,
            "environment",
            &environment.id,
        )
    }

    fn delete_environment(&self, scope: &EnvironmentScope, id: &str) -> Result<()> {
        // The bucket-level endpoint removes shared and test environments alike.
        let path = format!("/buckets/{}/environments/{id}", scope.bucket_key());
        self.execute(Method::Delete, &path, Operation::Delete, "environment", id)
    }

    fn create_schedule(
        &self,
        bucket_key: &str,
        test_id: &str,
        schedule: &Schedule,
    ) -> Result<Schedule> {
        let body = serde_json::to_string(schedule)?;
        self.fetch(
            Method::Post,
            &schedules_path(bucket_key, test_id),
            Payload::Json(body),
            Operation::Create,
            "schedule",
            &schedule.environment_id,
        )
    }

    fn read_schedule(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<Schedule> {
        let path = format!("{}/{id}", schedules_path(bucket_key, test_id));
        self.fetch(Method::Get, &path, Payload::Empty, Operation::Read, "schedule", id)
    }

    fn delete_schedule(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<()> {
        let path = format!("{}/{id}", schedules_path(bucket_key, test_id));
        self.execute(Method::Delete, &path, Operation::Delete, "schedule", id)
    }

    fn create_test_step(
        &self,
        bucket_key: &str,
        test_id: &str,
        step: &TestStep,
    ) -> Result<TestStep> {
        let _guard = self.step_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let body = serde_json::to_string(step)?;
        let mut steps: Vec<TestStep> = self.fetch(
            Method::Post,
            &steps_path(bucket_key, test_id),
            Payload::Json(body),
            Operation::Create,
            "test step",
            &step.url,
        )?;
        // The API answers with the test's whole step list, newest last.
        steps
            .pop()
            .ok_or_else(|| Error::InvalidResponse("step list in response is empty".to_string()))
    }

    fn read_test_step(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<TestStep> {
        let path = format!("{}/{id}", steps_path(bucket_key, test_id));
        self.fetch(Method::Get, &path, Payload::Empty, Operation::Read, "test step", id)
    }

    fn update_test_step(
        &self,
        bucket_key: &str,
        test_id: &str,
        step: &TestStep,
    ) -> Result<TestStep> {
        let path = format!("{}/{}", steps_path(bucket_key, test_id), step.id);
        let body = serde_json::to_string(step)?;
        self.fetch(
            Method::Put,
            &path,
            Payload::Json(body),
            Operation::Update,
            "test step",
            &step.id,
        )
    }

    fn delete_test_step(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<()> {
        let path = format!("{}/{id}", steps_path(bucket_key, test_id));
        self.execute(Method::Delete, &path, Operation::Delete, "test step", id)
    }

    fn list_integrations(&self, team_id: &str) -> Result<Vec<Integration>> {
        self.fetch(
            Method::Get,
            &integrations_path(team_id),
            Payload::Empty,
            Operation::List,
            "integrations",
            team_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_is_trimmed() {
        let backend = HttpBackend::new("https://api.runscope.com/", "token");
        assert_eq!(backend.api_url(), "https://api.runscope.com");
    }

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(bucket_path("bkt"), "/buckets/bkt");
        assert_eq!(tests_path("bkt"), "/buckets/bkt/tests");
        assert_eq!(test_path("bkt", "t1"), "/buckets/bkt/tests/t1");
        assert_eq!(schedules_path("bkt", "t1"), "/buckets/bkt/tests/t1/schedules");
        assert_eq!(steps_path("bkt", "t1"), "/buckets/bkt/tests/t1/steps");
        assert_eq!(integrations_path("team"), "/teams/team/integrations");
    }

    #[test]
    fn test_check_status_classifies_errors() {
        assert!(check_status(200, "", Operation::Read, "test", "t1").is_ok());
        assert!(check_status(204, "", Operation::Delete, "test", "t1").is_ok());

        let err = check_status(404, "", Operation::Read, "test", "t1").unwrap_err();
        assert!(err.is_not_found());

        let err = check_status(403, "", Operation::Read, "environment", "e1").unwrap_err();
        assert!(err.is_forbidden());

        let err = check_status(500, "boom", Operation::Read, "test", "t1").unwrap_err();
        assert_eq!(err.status_kind(), Some(crate::StatusKind::Other));
    }

    #[test]
    fn test_decode_data_unwraps_envelope() {
        let body = r#"{"meta": {"status": "success"}, "data": {"key": "abc", "name": "payments"}, "error": null}"#;
        let bucket: Bucket = decode_data(body).unwrap();
        assert_eq!(bucket.key, "abc");
        assert_eq!(bucket.name, "payments");
    }

    #[test]
    fn test_decode_data_requires_data() {
        let body = r#"{"meta": {"status": "success"}, "data": null}"#;
        let result: Result<Bucket> = decode_data(body);
        assert!(matches!(result, Err(Error::InvalidResponse(_))));

        let result: Result<Bucket> = decode_data("not json");
        assert!(matches!(result, Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn test_error_reason_from_envelope() {
        let body = r#"{"data": [], "error": {"status": 404, "error": "bucket not found"}}"#;
        assert_eq!(error_reason(body), "bucket not found");

        let body = r#"{"error": {"message": "invalid team"}}"#;
        assert_eq!(error_reason(body), "invalid team");

        let body = r#"{"status": 400, "error": "bad request"}"#;
        assert_eq!(error_reason(body), "bad request");
    }

    #[test]
    fn test_error_reason_falls_back_to_body() {
        assert_eq!(error_reason("<html>gateway</html>"), "<html>gateway</html>");
        assert_eq!(error_reason("   "), "no response body");
    }

    #[test]
    fn test_step_list_response_takes_last() {
        let body = r#"{"data": [{"id": "s1", "step_type": "request"}, {"id": "s2", "step_type": "pause"}]}"#;
        let mut steps: Vec<TestStep> = decode_data(body).unwrap();
        assert_eq!(steps.pop().map(|s| s.id), Some("s2".to_string()));
    }
}
