//! `runscope_test`
//!
//! A test's default environment usually belongs to the test itself, so it
//! cannot exist when the test is first created. Creation is two-phase:
//! create with the initial attributes, then update with the full set.

use super::{GonePolicy, read_or_clear};
use crate::error::ProviderError;
use anyhow::Result;
use declarative::{AttrKind, Attribute, Resource, ResourceData, Schema};
use runscope::{Client, Test};

const KIND: &str = "test";

/// Attributes that trigger an update call
const UPDATABLE: &[&str] = &["description", "default_environment_id"];

static SCHEMA: Schema = Schema::new(&[
    Attribute::required("bucket_id", AttrKind::String).force_new(),
    Attribute::required("name", AttrKind::String),
    Attribute::required("description", AttrKind::String),
    Attribute::optional("default_environment_id", AttrKind::String),
]);

/// Which attributes go into the extracted test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestPhase {
    /// Bucket, name, and description
    Initial,
    /// Everything, including the default environment
    Full,
}

#[derive(Debug)]
pub struct TestResource;

pub fn test_from_resource_data(data: &ResourceData, phase: TestPhase) -> Result<Test> {
    let mut test = Test {
        id: data.id().to_string(),
        bucket_key: data.string("bucket_id")?,
        name: data.string("name")?,
        description: data.string("description")?,
        ..Test::default()
    };

    if phase == TestPhase::Full {
        test.default_environment_id = data.string("default_environment_id")?;
    }

    Ok(test)
}

fn requires_two_phase(data: &ResourceData) -> bool {
    data.get_ok("default_environment_id").is_some()
}

impl Resource<Client> for TestResource {
    fn resource_type(&self) -> &'static str {
        "runscope_test"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn create(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let test = test_from_resource_data(data, TestPhase::Initial)?;
        log::info!("Creating test with name: {}", test.name);
        log::debug!("test create: {test:?}");

        let create_error = |source| ProviderError::Create {
            kind: KIND,
            name: test.name.clone(),
            source,
        };

        let created = client.create_test(&test).map_err(create_error)?;
        data.set_id(&created.id);

        if requires_two_phase(data) {
            let full = test_from_resource_data(data, TestPhase::Full)?;
            client.update_test(&full).map_err(create_error)?;
        }

        log::info!("test ID: {}", data.id());
        self.read(client, data)
    }

    fn read(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let bucket_key = data.string("bucket_id")?;
        let result = client.read_test(&bucket_key, data.id());
        let Some(test) = read_or_clear(KIND, data, GonePolicy::NotFoundOrForbidden, result)?
        else {
            return Ok(());
        };

        data.set("name", test.name);
        data.set("description", test.description);
        data.set("default_environment_id", test.default_environment_id);
        Ok(())
    }

    fn update(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        if !data.has_any_change(UPDATABLE) {
            return Ok(());
        }

        let test = test_from_resource_data(data, TestPhase::Full)?;
        client
            .update_test(&test)
            .map_err(|source| ProviderError::Update {
                kind: KIND,
                id: test.id.clone(),
                source,
            })?;
        self.read(client, data)
    }

    fn delete(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let test = test_from_resource_data(data, TestPhase::Initial)?;
        log::info!("Deleting test with id: {} name: {}", test.id, test.name);
        client
            .delete_test(&test.bucket_key, &test.id)
            .map_err(|source| ProviderError::Delete {
                kind: KIND,
                id: test.id.clone(),
                source,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{attrs, client};
    use declarative::Attributes;
    use runscope::MockBackend;

    fn declared(default_environment_id: &str) -> Attributes {
        attrs(&[
            ("bucket_id", "b1".into()),
            ("name", "smoke".into()),
            ("description", "smoke test".into()),
            ("default_environment_id", default_environment_id.into()),
        ])
    }

    #[test]
    fn test_extraction_phases() {
        let data = ResourceData::with_id("t1", declared("env-1"));
        let initial = test_from_resource_data(&data, TestPhase::Initial).unwrap();
        assert_eq!(initial.bucket_key, "b1");
        assert_eq!(initial.default_environment_id, "");

        let full = test_from_resource_data(&data, TestPhase::Full).unwrap();
        assert_eq!(full.default_environment_id, "env-1");
        assert_eq!(full.id, "t1");
    }

    #[test]
    fn test_create_single_phase() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let mut data = ResourceData::new(declared(""));

        TestResource.create(&client, &mut data).unwrap();

        assert!(data.has_id());
        assert_eq!(mock.calls("create_test"), 1);
        assert_eq!(mock.calls("update_test"), 0);
        assert_eq!(data.get_str("name").unwrap(), Some("smoke"));
    }

    #[test]
    fn test_create_two_phase() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let mut data = ResourceData::new(declared("env-1"));

        TestResource.create(&client, &mut data).unwrap();

        assert_eq!(mock.calls("create_test"), 1);
        assert_eq!(mock.calls("update_test"), 1);
        let stored = mock.test("b1", data.id()).unwrap();
        assert_eq!(stored.default_environment_id, "env-1");
        assert_eq!(
            data.get_str("default_environment_id").unwrap(),
            Some("env-1")
        );
    }

    #[test]
    fn test_update_gating() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let mut data = ResourceData::new(declared(""));
        TestResource.create(&client, &mut data).unwrap();
        let (id, stored) = data.into_parts();

        let mut unchanged = ResourceData::with_id(&id, stored.clone()).with_prior(stored.clone());
        TestResource.update(&client, &mut unchanged).unwrap();
        assert_eq!(mock.calls("update_test"), 0);

        let mut changed = ResourceData::with_id(&id, stored.clone()).with_prior(stored);
        changed.set("description", "nightly smoke test");
        TestResource.update(&client, &mut changed).unwrap();
        assert_eq!(mock.calls("update_test"), 1);
        assert_eq!(
            mock.test("b1", &id).unwrap().description,
            "nightly smoke test"
        );
    }

    #[test]
    fn test_read_not_found_clears_id() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let mut data = ResourceData::with_id("missing", declared(""));

        TestResource.read(&client, &mut data).unwrap();
        assert!(!data.has_id());
    }

    #[test]
    fn test_read_forbidden_clears_id() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let mut data = ResourceData::new(declared(""));
        TestResource.create(&client, &mut data).unwrap();

        mock.fail_next("read_test", 403);
        TestResource.read(&client, &mut data).unwrap();
        assert!(!data.has_id());
    }

    #[test]
    fn test_read_server_error_keeps_id() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let mut data = ResourceData::new(declared(""));
        TestResource.create(&client, &mut data).unwrap();
        let id = data.id().to_string();

        mock.fail_next("read_test", 500);
        let err = TestResource.read(&client, &mut data).unwrap_err();
        assert_eq!(err.to_string(), format!("couldn't find test \"{id}\""));
        assert_eq!(data.id(), id);
    }
}
