//! `runscope_step_token`
//!
//! A request step that writes a token back into a shared environment. The
//! step PUTs the environment, as it is when the step is created, with one
//! extra initial variable `token_name = "{{token_name}}"`. When the test
//! runs, Runscope substitutes the variable captured earlier in the test,
//! so later runs see the fresh token.

use super::{GonePolicy, read_or_clear};
use crate::error::ProviderError;
use anyhow::Result;
use declarative::{AttrKind, Attribute, Resource, ResourceData, Schema};
use runscope::{Assertion, Client, EnvironmentScope, TestStep};
use std::collections::BTreeMap;

const KIND: &str = "step token";

/// Attributes that trigger an update call
const UPDATABLE: &[&str] = &["token_name"];

static SCHEMA: Schema = Schema::new(&[
    Attribute::required("bucket_id", AttrKind::String).force_new(),
    Attribute::required("test_id", AttrKind::String).force_new(),
    Attribute::required("environment_id", AttrKind::String).force_new(),
    Attribute::required("token_name", AttrKind::String),
    Attribute::computed("body", AttrKind::String),
]);

#[derive(Debug)]
pub struct StepTokenResource;

/// Routing keys of a step token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTokenTarget {
    pub bucket_key: String,
    pub test_id: String,
    pub environment_id: String,
}

/// Build the step around a body; the body is filled in separately
pub fn step_token_from_resource_data(
    data: &ResourceData,
    client: &Client,
) -> Result<(TestStep, StepTokenTarget)> {
    let target = StepTokenTarget {
        bucket_key: data.string("bucket_id")?,
        test_id: data.string("test_id")?,
        environment_id: data.string("environment_id")?,
    };

    let headers = BTreeMap::from([
        (
            "Authorization".to_string(),
            vec![format!("Bearer {}", client.access_token())],
        ),
        (
            "Content-Type".to_string(),
            vec!["application/json".to_string()],
        ),
    ]);

    let step = TestStep {
        id: data.id().to_string(),
        step_type: "request".to_string(),
        method: "PUT".to_string(),
        url: format!(
            "{}/buckets/{}/environments/{}",
            client.api_url(),
            target.bucket_key,
            target.environment_id
        ),
        headers,
        assertions: vec![Assertion {
            source: "response_status".to_string(),
            comparison: "equal_number".to_string(),
            value: serde_json::json!(200),
            ..Assertion::default()
        }],
        ..TestStep::default()
    };

    Ok((step, target))
}

/// The shared environment as JSON, with the token placeholder added
pub fn token_body(client: &Client, target: &StepTokenTarget, token_name: &str) -> Result<String> {
    let scope = EnvironmentScope::shared(&target.bucket_key);
    let mut environment = client
        .read_environment(&scope, &target.environment_id)
        .map_err(|source| ProviderError::Read {
            kind: "environment",
            id: target.environment_id.clone(),
            source,
        })?;

    environment
        .initial_variables
        .insert(token_name.to_string(), format!("{{{{{token_name}}}}}"));

    serde_json::to_string(&environment)
        .map_err(|source| ProviderError::Encode {
            kind: "environment",
            source,
        })
        .map_err(Into::into)
}

impl Resource<Client> for StepTokenResource {
    fn resource_type(&self) -> &'static str {
        "runscope_step_token"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn create(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let (mut step, target) = step_token_from_resource_data(data, client)?;
        let token_name = data.require_str("token_name")?.to_string();
        step.body = token_body(client, &target, &token_name)?;
        log::debug!("step token create: {step:?}");

        let created = client
            .create_test_step(&target.bucket_key, &target.test_id, &step)
            .map_err(|source| ProviderError::Create {
                kind: KIND,
                name: token_name,
                source,
            })?;

        data.set_id(created.id);
        log::info!("step token ID: {}", data.id());
        self.read(client, data)
    }

    fn read(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let bucket_key = data.string("bucket_id")?;
        let test_id = data.string("test_id")?;
        let result = client.read_test_step(&bucket_key, &test_id, data.id());
        if let Some(step) = read_or_clear(KIND, data, GonePolicy::NotFound, result)? {
            data.set("body", step.body);
        }
        Ok(())
    }

    fn update(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        if !data.has_any_change(UPDATABLE) {
            return Ok(());
        }

        let (mut step, target) = step_token_from_resource_data(data, client)?;
        step.body = token_body(client, &target, data.require_str("token_name")?)?;
        client
            .update_test_step(&target.bucket_key, &target.test_id, &step)
            .map_err(|source| ProviderError::Update {
                kind: KIND,
                id: step.id.clone(),
                source,
            })?;
        self.read(client, data)
    }

    fn delete(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let bucket_key = data.string("bucket_id")?;
        let test_id = data.string("test_id")?;
        log::info!("Deleting step token with id: {}", data.id());
        client
            .delete_test_step(&bucket_key, &test_id, data.id())
            .map_err(|source| ProviderError::Delete {
                kind: KIND,
                id: data.id().to_string(),
                source,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{attrs, client};
    use runscope::{Environment, MockBackend};

    fn setup() -> (MockBackend, Client, ResourceData) {
        let mock = MockBackend::new();
        mock.add_environment(
            EnvironmentScope::shared("b1"),
            Environment {
                id: "e1".to_string(),
                name: "shared".to_string(),
                initial_variables: BTreeMap::from([(
                    "base_url".to_string(),
                    "https://api.example.com".to_string(),
                )]),
                ..Environment::default()
            },
        );
        let client = client(&mock);
        let data = ResourceData::new(attrs(&[
            ("bucket_id", "b1".into()),
            ("test_id", "t1".into()),
            ("environment_id", "e1".into()),
            ("token_name", "access_token".into()),
        ]));
        (mock, client, data)
    }

    #[test]
    fn test_step_shape() {
        let (_mock, client, data) = setup();
        let (step, target) = step_token_from_resource_data(&data, &client).unwrap();

        assert_eq!(step.method, "PUT");
        assert_eq!(step.step_type, "request");
        assert_eq!(
            step.url,
            "https://api.runscope.com/buckets/b1/environments/e1"
        );
        assert_eq!(step.headers["Authorization"], vec!["Bearer secret"]);
        assert_eq!(step.headers["Content-Type"], vec!["application/json"]);
        assert_eq!(step.assertions.len(), 1);
        assert_eq!(step.assertions[0].value, serde_json::json!(200));
        assert_eq!(target.environment_id, "e1");
    }

    #[test]
    fn test_create_embeds_environment() {
        let (mock, client, mut data) = setup();

        StepTokenResource.create(&client, &mut data).unwrap();

        let step = mock.test_step(data.id()).unwrap();
        let body: Environment = serde_json::from_str(&step.body).unwrap();
        assert_eq!(body.initial_variables["access_token"], "{{access_token}}");
        assert_eq!(
            body.initial_variables["base_url"],
            "https://api.example.com"
        );
        assert_eq!(data.get_str("body").unwrap(), Some(step.body.as_str()));

        let (_, env) = mock.environment("e1").unwrap();
        assert!(!env.initial_variables.contains_key("access_token"));
    }

    #[test]
    fn test_update_on_token_name_change() {
        let (mock, client, mut data) = setup();
        StepTokenResource.create(&client, &mut data).unwrap();
        let (id, stored) = data.into_parts();

        let mut unchanged = ResourceData::with_id(&id, stored.clone()).with_prior(stored.clone());
        StepTokenResource.update(&client, &mut unchanged).unwrap();
        assert_eq!(mock.calls("update_test_step"), 0);

        let mut renamed = ResourceData::with_id(&id, stored.clone()).with_prior(stored);
        renamed.set("token_name", "refresh_token");
        StepTokenResource.update(&client, &mut renamed).unwrap();
        assert_eq!(mock.calls("update_test_step"), 1);

        let body: Environment =
            serde_json::from_str(&mock.test_step(&id).unwrap().body).unwrap();
        assert_eq!(body.initial_variables["refresh_token"], "{{refresh_token}}");
        assert!(!body.initial_variables.contains_key("access_token"));
    }

    #[test]
    fn test_missing_environment_fails_before_step_call() {
        let (mock, client, mut data) = setup();
        data.set("environment_id", "nope");

        assert!(StepTokenResource.create(&client, &mut data).is_err());
        assert_eq!(mock.calls("create_test_step"), 0);
    }

    #[test]
    fn test_read_forbidden_is_an_error() {
        let (mock, client, mut data) = setup();
        StepTokenResource.create(&client, &mut data).unwrap();

        mock.fail_next("read_test_step", 403);
        assert!(StepTokenResource.read(&client, &mut data).is_err());
        assert!(data.has_id());
    }
}
