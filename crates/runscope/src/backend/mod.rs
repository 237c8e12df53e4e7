//! Backend traits and implementations for talking to Runscope.
//!
//! This module provides the [`Backend`] trait and two implementations:
//! [`http::HttpBackend`] for the real REST API and [`MockBackend`], an
//! in-memory store for tests.
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access. Clones share the
//! same store, so a test can keep one handle while the client owns another:
//!
//! ```
//! use runscope::backend::{Backend, MockBackend};
//! use runscope::Bucket;
//!
//! let mock = MockBackend::new();
//! mock.add_bucket(Bucket {
//!     key: "abc123".to_string(),
//!     name: "payments".to_string(),
//!     ..Bucket::default()
//! });
//!
//! let bucket = mock.read_bucket("abc123").unwrap();
//! assert_eq!(bucket.name, "payments");
//! assert_eq!(mock.calls("read_bucket"), 1);
//! ```

pub mod http;

use crate::error::{Error, Operation, Result};
use crate::types::{Bucket, Environment, EnvironmentScope, Integration, Schedule, Test, TestStep};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Backend trait for Runscope API calls.
///
/// One method is one HTTP request. Entities nested under a bucket or a
/// test take their parent keys first.
pub trait Backend: Send + Sync {
    /// Create a bucket owned by `bucket.team`.
    fn create_bucket(&self, bucket: &Bucket) -> Result<Bucket>;
    /// Read a bucket by key.
    fn read_bucket(&self, key: &str) -> Result<Bucket>;
    /// Delete a bucket by key.
    fn delete_bucket(&self, key: &str) -> Result<()>;
    /// List every bucket visible to the access token.
    fn list_buckets(&self) -> Result<Vec<Bucket>>;

    /// Create a test in `test.bucket_key`.
    fn create_test(&self, test: &Test) -> Result<Test>;
    /// Read a test.
    fn read_test(&self, bucket_key: &str, test_id: &str) -> Result<Test>;
    /// Update a test in place.
    fn update_test(&self, test: &Test) -> Result<Test>;
    /// Delete a test.
    fn delete_test(&self, bucket_key: &str, test_id: &str) -> Result<()>;
    /// List one page of tests in a bucket.
    fn list_tests(&self, bucket_key: &str, count: usize, offset: usize) -> Result<Vec<Test>>;

    /// Create an environment in the given scope.
    fn create_environment(
        &self,
        scope: &EnvironmentScope,
        environment: &Environment,
    ) -> Result<Environment>;
    /// Read an environment from the given scope.
    fn read_environment(&self, scope: &EnvironmentScope, id: &str) -> Result<Environment>;
    /// Update an environment in the given scope.
    fn update_environment(
        &self,
        scope: &EnvironmentScope,
        environment: &Environment,
    ) -> Result<Environment>;
    /// Delete an environment.
    fn delete_environment(&self, scope: &EnvironmentScope, id: &str) -> Result<()>;

    /// Create a schedule for a test.
    fn create_schedule(&self, bucket_key: &str, test_id: &str, schedule: &Schedule)
    -> Result<Schedule>;
    /// Read a schedule.
    fn read_schedule(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<Schedule>;
    /// Delete a schedule.
    fn delete_schedule(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<()>;

    /// Append a step to a test.
    fn create_test_step(&self, bucket_key: &str, test_id: &str, step: &TestStep)
    -> Result<TestStep>;
    /// Read a step.
    fn read_test_step(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<TestStep>;
    /// Update a step.
    fn update_test_step(&self, bucket_key: &str, test_id: &str, step: &TestStep)
    -> Result<TestStep>;
    /// Delete a step.
    fn delete_test_step(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<()>;

    /// List the integrations configured for a team.
    fn list_integrations(&self, team_id: &str) -> Result<Vec<Integration>>;
}

// =============================================================================
// Mock backend
// =============================================================================

#[derive(Debug, Default)]
struct Store {
    buckets: Vec<Bucket>,
    tests: Vec<Test>,
    environments: Vec<(EnvironmentScope, Environment)>,
    schedules: Vec<(String, String, Schedule)>,
    steps: Vec<(String, String, TestStep)>,
    integrations: HashMap<String, Vec<Integration>>,
    calls: HashMap<String, usize>,
    failures: HashMap<String, u16>,
    next_id: u64,
}

impl Store {
    /// Count a call and fire any failure injected for it.
    fn begin(
        &mut self,
        call: &str,
        operation: Operation,
        entity: &'static str,
        target: &str,
    ) -> Result<()> {
        *self.calls.entry(call.to_string()).or_default() += 1;
        match self.failures.remove(call) {
            Some(status) => Err(Error::api(
                operation,
                entity,
                target,
                status,
                "injected failure",
            )),
            None => Ok(()),
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

fn not_found(operation: Operation, entity: &'static str, target: &str) -> Error {
    Error::api(operation, entity, target, 404, format!("{entity} not found"))
}

/// Mock backend for testing without network access.
///
/// Stores entities in memory, counts calls per operation name (the
/// [`Backend`] method name, with environment calls split into
/// `*_shared_environment` and `*_test_environment`) and can fail the next
/// call of an operation with a chosen status.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    store: Arc<Mutex<Store>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a bucket.
    pub fn add_bucket(&self, bucket: Bucket) {
        self.store().buckets.push(bucket);
    }

    /// Seed a test. `test.bucket_key` decides where it lives.
    pub fn add_test(&self, test: Test) {
        self.store().tests.push(test);
    }

    /// Seed an environment.
    pub fn add_environment(&self, scope: EnvironmentScope, environment: Environment) {
        self.store().environments.push((scope, environment));
    }

    /// Seed a test step.
    pub fn add_test_step(&self, bucket_key: &str, test_id: &str, step: TestStep) {
        self.store()
            .steps
            .push((bucket_key.to_string(), test_id.to_string(), step));
    }

    /// Seed an integration for a team.
    pub fn add_integration(&self, team_id: &str, integration: Integration) {
        self.store()
            .integrations
            .entry(team_id.to_string())
            .or_default()
            .push(integration);
    }

    /// Make the next call of `call` fail with an API error of `status`.
    pub fn fail_next(&self, call: &str, status: u16) {
        self.store().failures.insert(call.to_string(), status);
    }

    /// Number of times `call` has been made.
    #[must_use]
    pub fn calls(&self, call: &str) -> usize {
        self.store().calls.get(call).copied().unwrap_or_default()
    }

    /// Snapshot of a stored environment.
    #[must_use]
    pub fn environment(&self, id: &str) -> Option<(EnvironmentScope, Environment)> {
        self.store()
            .environments
            .iter()
            .find(|(_, env)| env.id == id)
            .cloned()
    }

    /// Snapshot of a stored test.
    #[must_use]
    pub fn test(&self, bucket_key: &str, test_id: &str) -> Option<Test> {
        self.store()
            .tests
            .iter()
            .find(|t| t.bucket_key == bucket_key && t.id == test_id)
            .cloned()
    }

    /// Snapshot of a stored step.
    #[must_use]
    pub fn test_step(&self, id: &str) -> Option<TestStep> {
        self.store()
            .steps
            .iter()
            .find(|(_, _, step)| step.id == id)
            .map(|(_, _, step)| step.clone())
    }

    /// Keys of every stored bucket, in insertion order.
    #[must_use]
    pub fn bucket_keys(&self) -> Vec<String> {
        self.store().buckets.iter().map(|b| b.key.clone()).collect()
    }
}

impl Backend for MockBackend {
    fn create_bucket(&self, bucket: &Bucket) -> Result<Bucket> {
        let mut store = self.store();
        store.begin("create_bucket", Operation::Create, "bucket", &bucket.name)?;
        let mut created = bucket.clone();
        created.key = store.next_id("bucket");
        created.auth_token = format!("token-{}", created.key);
        created.trigger_url = format!("https://api.runscope.com/radar/bucket/{}/trigger", created.key);
        store.buckets.push(created.clone());
        Ok(created)
    }

    fn read_bucket(&self, key: &str) -> Result<Bucket> {
        let mut store = self.store();
        store.begin("read_bucket", Operation::Read, "bucket", key)?;
        store
            .buckets
            .iter()
            .find(|b| b.key == key)
            .cloned()
            .ok_or_else(|| not_found(Operation::Read, "bucket", key))
    }

    fn delete_bucket(&self, key: &str) -> Result<()> {
        let mut store = self.store();
        store.begin("delete_bucket", Operation::Delete, "bucket", key)?;
        let before = store.buckets.len();
        store.buckets.retain(|b| b.key != key);
        if store.buckets.len() == before {
            return Err(not_found(Operation::Delete, "bucket", key));
        }
        store.tests.retain(|t| t.bucket_key != key);
        store.environments.retain(|(scope, _)| scope.bucket_key() != key);
        store.schedules.retain(|(bucket, _, _)| bucket != key);
        store.steps.retain(|(bucket, _, _)| bucket != key);
        Ok(())
    }

    fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let mut store = self.store();
        store.begin("list_buckets", Operation::List, "buckets", "")?;
        Ok(store.buckets.clone())
    }

    fn create_test(&self, test: &Test) -> Result<Test> {
        let mut store = self.store();
        store.begin("create_test", Operation::Create, "test", &test.name)?;
        let mut created = test.clone();
        created.id = store.next_id("test");
        store.tests.push(created.clone());
        Ok(created)
    }

    fn read_test(&self, bucket_key: &str, test_id: &str) -> Result<Test> {
        let mut store = self.store();
        store.begin("read_test", Operation::Read, "test", test_id)?;
        store
            .tests
            .iter()
            .find(|t| t.bucket_key == bucket_key && t.id == test_id)
            .cloned()
            .ok_or_else(|| not_found(Operation::Read, "test", test_id))
    }

    fn update_test(&self, test: &Test) -> Result<Test> {
        let mut store = self.store();
        store.begin("update_test", Operation::Update, "test", &test.id)?;
        let existing = store
            .tests
            .iter_mut()
            .find(|t| t.bucket_key == test.bucket_key && t.id == test.id)
            .ok_or_else(|| not_found(Operation::Update, "test", &test.id))?;
        *existing = test.clone();
        Ok(test.clone())
    }

    fn delete_test(&self, bucket_key: &str, test_id: &str) -> Result<()> {
        let mut store = self.store();
        store.begin("delete_test", Operation::Delete, "test", test_id)?;
        let before = store.tests.len();
        store
            .tests
            .retain(|t| !(t.bucket_key == bucket_key && t.id == test_id));
        if store.tests.len() == before {
            return Err(not_found(Operation::Delete, "test", test_id));
        }
        Ok(())
    }

    fn list_tests(&self, bucket_key: &str, count: usize, offset: usize) -> Result<Vec<Test>> {
        let mut store = self.store();
        store.begin("list_tests", Operation::List, "tests", bucket_key)?;
        Ok(store
            .tests
            .iter()
            .filter(|t| t.bucket_key == bucket_key)
            .skip(offset)
            .take(count)
            .cloned()
            .collect())
    }

    fn create_environment(
        &self,
        scope: &EnvironmentScope,
        environment: &Environment,
    ) -> Result<Environment> {
        let mut store = self.store();
        let call = format!("create_{}_environment", scope.label());
        store.begin(&call, Operation::Create, "environment", &environment.name)?;
        let mut created = environment.clone();
        created.id = store.next_id("environment");
        if let EnvironmentScope::Test { test_id, .. } = scope {
            created.test_id = test_id.clone();
        }
        store.environments.push((scope.clone(), created.clone()));
        Ok(created)
    }

    fn read_environment(&self, scope: &EnvironmentScope, id: &str) -> Result<Environment> {
        let mut store = self.store();
        let call = format!("read_{}_environment", scope.label());
        store.begin(&call, Operation::Read, "environment", id)?;
        store
            .environments
            .iter()
            .find(|(s, env)| s == scope && env.id == id)
            .map(|(_, env)| env.clone())
            .ok_or_else(|| not_found(Operation::Read, "environment", id))
    }

    fn update_environment(
        &self,
        scope: &EnvironmentScope,
        environment: &Environment,
    ) -> Result<Environment> {
        let mut store = self.store();
        let call = format!("update_{}_environment", scope.label());
        store.begin(&call, Operation::Update, "environment", &environment.id)?;
        let existing = store
            .environments
            .iter_mut()
            .find(|(s, env)| s == scope && env.id == environment.id)
            .ok_or_else(|| not_found(Operation::Update, "environment", &environment.id))?;
        existing.1 = environment.clone();
        Ok(environment.clone())
    }

    fn delete_environment(&self, scope: &EnvironmentScope, id: &str) -> Result<()> {
        let mut store = self.store();
        let call = format!("delete_{}_environment", scope.label());
        store.begin(&call, Operation::Delete, "environment", id)?;
        let before = store.environments.len();
        store
            .environments
            .retain(|(s, env)| !(s.bucket_key() == scope.bucket_key() && env.id == id));
        if store.environments.len() == before {
            return Err(not_found(Operation::Delete, "environment", id));
        }
        Ok(())
    }

    fn create_schedule(
        &self,
        bucket_key: &str,
        test_id: &str,
        schedule: &Schedule,
    ) -> Result<Schedule> {
        let mut store = self.store();
        store.begin(
            "create_schedule",
            Operation::Create,
            "schedule",
            &schedule.environment_id,
        )?;
        let mut created = schedule.clone();
        created.id = store.next_id("schedule");
        store
            .schedules
            .push((bucket_key.to_string(), test_id.to_string(), created.clone()));
        Ok(created)
    }

    fn read_schedule(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<Schedule> {
        let mut store = self.store();
        store.begin("read_schedule", Operation::Read, "schedule", id)?;
        store
            .schedules
            .iter()
            .find(|(b, t, s)| b == bucket_key && t == test_id && s.id == id)
            .map(|(_, _, s)| s.clone())
            .ok_or_else(|| not_found(Operation::Read, "schedule", id))
    }

    fn delete_schedule(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<()> {
        let mut store = self.store();
        store.begin("delete_schedule", Operation::Delete, "schedule", id)?;
        let before = store.schedules.len();
        store
            .schedules
            .retain(|(b, t, s)| !(b == bucket_key && t == test_id && s.id == id));
        if store.schedules.len() == before {
            return Err(not_found(Operation::Delete, "schedule", id));
        }
        Ok(())
    }

    fn create_test_step(
        &self,
        bucket_key: &str,
        test_id: &str,
        step: &TestStep,
    ) -> Result<TestStep> {
        let mut store = self.store();
        store.begin("create_test_step", Operation::Create, "test step", &step.url)?;
        let mut created = step.clone();
        created.id = store.next_id("step");
        store
            .steps
            .push((bucket_key.to_string(), test_id.to_string(), created.clone()));
        Ok(created)
    }

    fn read_test_step(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<TestStep> {
        let mut store = self.store();
        store.begin("read_test_step", Operation::Read, "test step", id)?;
        store
            .steps
            .iter()
            .find(|(b, t, s)| b == bucket_key && t == test_id && s.id == id)
            .map(|(_, _, s)| s.clone())
            .ok_or_else(|| not_found(Operation::Read, "test step", id))
    }

    fn update_test_step(
        &self,
        bucket_key: &str,
        test_id: &str,
        step: &TestStep,
    ) -> Result<TestStep> {
        let mut store = self.store();
        store.begin("update_test_step", Operation::Update, "test step", &step.id)?;
        let existing = store
            .steps
            .iter_mut()
            .find(|(b, t, s)| b == bucket_key && t == test_id && s.id == step.id)
            .ok_or_else(|| not_found(Operation::Update, "test step", &step.id))?;
        existing.2 = step.clone();
        Ok(step.clone())
    }

    fn delete_test_step(&self, bucket_key: &str, test_id: &str, id: &str) -> Result<()> {
        let mut store = self.store();
        store.begin("delete_test_step", Operation::Delete, "test step", id)?;
        let before = store.steps.len();
        store
            .steps
            .retain(|(b, t, s)| !(b == bucket_key && t == test_id && s.id == id));
        if store.steps.len() == before {
            return Err(not_found(Operation::Delete, "test step", id));
        }
        Ok(())
    }

    fn list_integrations(&self, team_id: &str) -> Result<Vec<Integration>> {
        let mut store = self.store();
        store.begin("list_integrations", Operation::List, "integrations", team_id)?;
        Ok(store.integrations.get(team_id).cloned().unwrap_or_default())
    }
}
