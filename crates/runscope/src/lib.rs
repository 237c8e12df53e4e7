//! # runscope
//!
//! Blocking client for the Runscope API.
//!
//! This crate provides:
//! - Typed entities (buckets, tests, environments, schedules, steps, integrations)
//! - A [`Client`] with one method per API call, plus paging and bulk helpers
//! - An HTTP backend built on `ureq` and an in-memory [`MockBackend`] for tests
//! - Errors classified by [`StatusKind`] so callers never match on message text
//!
//! ## Example
//!
//! ```no_run
//! use runscope::{Client, EnvironmentScope};
//!
//! let client = Client::new("https://api.runscope.com", "my-token");
//!
//! let bucket = client.read_bucket("abc123").expect("bucket lookup failed");
//! println!("{} belongs to team {}", bucket.name, bucket.team_id());
//!
//! for test in client.list_all_tests(&bucket.key).unwrap() {
//!     println!("{} {}", test.id, test.name);
//! }
//!
//! let env = client
//!     .read_environment(&EnvironmentScope::shared(&bucket.key), "env-id")
//!     .unwrap();
//! println!("{:?}", env.initial_variables);
//! ```
//!
//! ## Request logging
//!
//! The HTTP backend reports each request and response to a
//! [`RequestLog`]. [`Client::new`] uses [`DebugLog`], which forwards to the
//! `log` facade; pass another implementation to
//! [`Client::with_request_log`] to change that.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod logging;
pub mod types;

pub use backend::MockBackend;
pub use backend::http::DEFAULT_API_URL;
pub use error::{Error, Operation, Result, StatusKind};
pub use logging::{DebugLog, RequestLog, Silent};
pub use types::{
    Assertion, Bucket, Contact, EmailSettings, Environment, EnvironmentIntegration,
    EnvironmentScope, Integration, RemoteAgent, Schedule, StepAuth, Team, Test, TestStep,
    Variable,
};

use backend::Backend;
use backend::http::HttpBackend;

/// Page size used by [`Client::list_all_tests`].
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Outcome of a bulk bucket deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Keys of the buckets that were deleted.
    pub deleted: Vec<String>,
    /// Buckets that matched but could not be deleted, with the reason.
    pub failed: Vec<(String, String)>,
}

/// High-level client for Runscope operations.
///
/// Wraps a [`Backend`] and remembers the API URL and access token, which
/// step tokens embed in the steps they generate.
///
/// # Example
///
/// ```
/// use runscope::{Client, MockBackend, Bucket};
///
/// let mock = MockBackend::new();
/// mock.add_bucket(Bucket { key: "abc".into(), name: "payments".into(), ..Bucket::default() });
///
/// let client = Client::with_backend(Box::new(mock.clone()), "https://api.runscope.com", "token");
/// assert_eq!(client.read_bucket("abc").unwrap().name, "payments");
/// ```
pub struct Client {
    backend: Box<dyn Backend>,
    api_url: String,
    access_token: String,
}

impl Client {
    /// Create a client with the HTTP backend.
    #[must_use]
    pub fn new(api_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::with_request_log(api_url, access_token, Box::new(DebugLog))
    }

    /// Create a client with the HTTP backend and a custom request log.
    #[must_use]
    pub fn with_request_log(
        api_url: impl Into<String>,
        access_token: impl Into<String>,
        log: Box<dyn RequestLog>,
    ) -> Self {
        let api_url = api_url.into();
        let access_token = access_token.into();
        let backend = HttpBackend::with_request_log(api_url.clone(), access_token.clone(), log);
        Self {
            backend: Box::new(backend),
            api_url: api_url.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(
        backend: Box<dyn Backend>,
        api_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// API base URL, without a trailing slash.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Access token sent as a bearer credential.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    // =========================================================================
    // Buckets
    // =========================================================================

    /// Create a bucket. `bucket.name` and `bucket.team` are sent.
    pub fn create_bucket(&self, bucket: &Bucket) -> Result<Bucket> {
        self.backend.create_bucket(bucket)
    }

    /// Read a bucket by key.
    pub fn read_bucket(&self, key: &str) -> Result<Bucket> {
        self.backend.read_bucket(key)
    }

    /// Delete a bucket by key.
    pub fn delete_bucket(&self, key: &str) -> Result<()> {
        self.backend.delete_bucket(key)
    }

    /// List every bucket visible to the access token.
    pub fn list_buckets(&self) -> Result<Vec<Bucket>> {
        self.backend.list_buckets()
    }

    /// Delete every bucket matching `predicate`.
    ///
    /// Failures to delete individual buckets are logged and collected in
    /// the report; only a failure to list buckets is an error.
    pub fn delete_buckets<F>(&self, predicate: F) -> Result<SweepReport>
    where
        F: Fn(&Bucket) -> bool,
    {
        let mut report = SweepReport::default();
        for bucket in self.backend.list_buckets()? {
            if !predicate(&bucket) {
                continue;
            }
            match self.backend.delete_bucket(&bucket.key) {
                Ok(()) => {
                    log::info!("Deleted bucket {} ({})", bucket.name, bucket.key);
                    report.deleted.push(bucket.key);
                }
                Err(err) => {
                    log::warn!("Could not delete bucket {} ({}): {}", bucket.name, bucket.key, err);
                    report.failed.push((bucket.key, err.to_string()));
                }
            }
        }
        Ok(report)
    }

    // =========================================================================
    // Tests
    // =========================================================================

    /// Create a test in `test.bucket_key`.
    pub fn create_test(&self, test: &Test) -> Result<Test> {
        self.backend.create_test(test)
    }

    /// Read a test.
    pub fn read_test(&self, bucket_key: &str, test_id: &str) -> Result<Test> {
        self.backend.read_test(bucket_key, test_id)
    }

    /// Update a test.
    pub fn update_test(&self, test: &Test) -> Result<Test> {
        self.backend.update_test(test)
    }

    /// Delete a test.
    pub fn delete_test(&self, bucket_key: &str, test_id: &str) -> Result<()> {
        self.backend.delete_test(bucket_key, test_id)
    }

    /// List one page of tests.
    pub fn list_tests(&self, bucket_key: &str, count: usize, offset: usize) -> Result<Vec<Test>> {
        self.backend.list_tests(bucket_key, count, offset)
    }

    /// List every test in a bucket, fetching pages of [`DEFAULT_PAGE_SIZE`]
    /// until a short page comes back.
    pub fn list_all_tests(&self, bucket_key: &str) -> Result<Vec<Test>> {
        let mut all = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.backend.list_tests(bucket_key, DEFAULT_PAGE_SIZE, offset)?;
            let len = page.len();
            all.extend(page);
            if len < DEFAULT_PAGE_SIZE {
                return Ok(all);
            }
            offset += len;
        }
    }

    // =========================================================================
    // Environments
    // =========================================================================

    /// Create an environment in the given scope.
    pub fn create_environment(
        &self,
        scope: &EnvironmentScope,
        environment: &Environment,
    ) -> Result<Environment> {
        self.backend.create_environment(scope, environment)
    }

    /// Read an environment from the given scope.
    pub fn read_environment(&self, scope: &EnvironmentScope, id: &str) -> Result<Environment> {
        self.backend.read_environment(scope, id)
    }

    /// Update an environment in the given scope.
    pub fn update_environment(
        &self,
        scope: &EnvironmentScope,
        environment: &Environment,
    ) -> Result<Environment> {
        self.backend.update_environment(scope, environment)
    }

    /// Delete an environment.
    pub fn delete_environment(&self, scope: &EnvironmentScope, id: &str) -> Result<()> {
        self.backend.delete_environment(scope, id)
    }

    // =========================================================================
    // Schedules
    // =========================================================================

    /// Create a schedule for a test.
    pub fn create_schedule(
        &self,
        bucket_key: &str,
        test_id: &str,
        schedule: &Schedule,
    ) -> Result<Schedule> {
        self.backend.create_schedule(bucket_key, test_id, schedule)
    }

    /// Read a schedule.
    pub fn read_schedule(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<Schedule> {
        self.backend.read_schedule(bucket_key, test_id, id)
    }

    /// Delete a schedule.
    pub fn delete_schedule(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<()> {
        self.backend.delete_schedule(bucket_key, test_id, id)
    }

    // =========================================================================
    // Test steps
    // =========================================================================

    /// Validate and append a step to a test.
    ///
    /// Invalid steps are rejected before any request is made.
    pub fn create_test_step(
        &self,
        bucket_key: &str,
        test_id: &str,
        step: &TestStep,
    ) -> Result<TestStep> {
        step.validate()?;
        self.backend.create_test_step(bucket_key, test_id, step)
    }

    /// Read a step.
    pub fn read_test_step(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<TestStep> {
        self.backend.read_test_step(bucket_key, test_id, id)
    }

    /// Validate and update a step.
    pub fn update_test_step(
        &self,
        bucket_key: &str,
        test_id: &str,
        step: &TestStep,
    ) -> Result<TestStep> {
        step.validate()?;
        self.backend.update_test_step(bucket_key, test_id, step)
    }

    /// Delete a step.
    pub fn delete_test_step(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<()> {
        self.backend.delete_test_step(bucket_key, test_id, id)
    }

    // =========================================================================
    // Integrations
    // =========================================================================

    /// List the integrations configured for a team.
    pub fn list_integrations(&self, team_id: &str) -> Result<Vec<Integration>> {
        self.backend.list_integrations(team_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with(mock: &MockBackend) -> Client {
        Client::with_backend(Box::new(mock.clone()), "https://api.example.com/", "secret")
    }

    fn bucket(key: &str, name: &str) -> Bucket {
        Bucket {
            key: key.to_string(),
            name: name.to_string(),
            ..Bucket::default()
        }
    }

    #[test]
    fn test_client_creation() {
        let client = Client::new(DEFAULT_API_URL, "token");
        assert_eq!(client.api_url(), "https://api.runscope.com");
        assert_eq!(client.access_token(), "token");
    }

    #[test]
    fn test_client_trims_api_url() {
        let client = client_with(&MockBackend::new());
        assert_eq!(client.api_url(), "https://api.example.com");
    }

    #[test]
    fn test_client_with_mock_backend() {
        let mock = MockBackend::new();
        mock.add_bucket(bucket("abc", "payments"));
        let client = client_with(&mock);

        let buckets = client.list_buckets().unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].name, "payments");
    }

    #[test]
    fn test_create_step_validates_before_backend_call() {
        let mock = MockBackend::new();
        let client = client_with(&mock);

        let step = TestStep {
            step_type: "request".to_string(),
            ..TestStep::default()
        };
        let err = client.create_test_step("bkt", "t1", &step).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(mock.calls("create_test_step"), 0);

        let step = TestStep {
            step_type: "request".to_string(),
            method: "GET".to_string(),
            body: "{}".to_string(),
            ..TestStep::default()
        };
        assert!(client.create_test_step("bkt", "t1", &step).is_err());
        assert_eq!(mock.calls("create_test_step"), 0);
    }

    #[test]
    fn test_create_step_valid() {
        let mock = MockBackend::new();
        let client = client_with(&mock);

        let step = TestStep {
            step_type: "request".to_string(),
            method: "GET".to_string(),
            url: "https://example.com".to_string(),
            ..TestStep::default()
        };
        let created = client.create_test_step("bkt", "t1", &step).unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(mock.calls("create_test_step"), 1);
    }

    #[test]
    fn test_list_all_tests_pages_until_short_page() {
        let mock = MockBackend::new();
        for i in 0..23 {
            mock.add_test(Test {
                id: format!("t{i}"),
                bucket_key: "bkt".to_string(),
                ..Test::default()
            });
        }
        let client = client_with(&mock);

        let tests = client.list_all_tests("bkt").unwrap();
        assert_eq!(tests.len(), 23);
        assert_eq!(mock.calls("list_tests"), 3);
    }

    #[test]
    fn test_list_all_tests_exact_multiple_fetches_empty_page() {
        let mock = MockBackend::new();
        for i in 0..DEFAULT_PAGE_SIZE {
            mock.add_test(Test {
                id: format!("t{i}"),
                bucket_key: "bkt".to_string(),
                ..Test::default()
            });
        }
        let client = client_with(&mock);

        assert_eq!(client.list_all_tests("bkt").unwrap().len(), DEFAULT_PAGE_SIZE);
        assert_eq!(mock.calls("list_tests"), 2);
    }

    #[test]
    fn test_delete_buckets_is_best_effort() {
        let mock = MockBackend::new();
        mock.add_bucket(bucket("k1", "test-alpha"));
        mock.add_bucket(bucket("k2", "production"));
        mock.add_bucket(bucket("k3", "test-beta"));
        mock.fail_next("delete_bucket", 500);
        let client = client_with(&mock);

        let report = client
            .delete_buckets(|b| b.name.starts_with("test"))
            .unwrap();

        assert_eq!(report.deleted, vec!["k3".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "k1");
        assert_eq!(mock.bucket_keys(), vec!["k1".to_string(), "k2".to_string()]);
    }

    #[test]
    fn test_delete_buckets_list_failure_is_error() {
        let mock = MockBackend::new();
        mock.fail_next("list_buckets", 503);
        let client = client_with(&mock);

        assert!(client.delete_buckets(|_| true).is_err());
    }
}
