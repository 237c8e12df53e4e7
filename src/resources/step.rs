//! `runscope_step`

use super::{GonePolicy, read_or_clear};
use crate::error::ProviderError;
use crate::structure::{
    expand_assertions, expand_auth, expand_headers, expand_variables, flatten_assertions,
    flatten_auth, flatten_headers, flatten_variables,
};
use anyhow::Result;
use declarative::{AttrKind, Attribute, Resource, ResourceData, Schema, Value};
use runscope::{Client, TestStep};

const KIND: &str = "step";

/// Attributes that trigger an update call
const UPDATABLE: &[&str] = &[
    "url",
    "variables",
    "assertions",
    "headers",
    "body",
    "auth",
    "scripts",
    "before_scripts",
];

static VARIABLE: &[Attribute] = &[
    Attribute::required("name", AttrKind::String),
    Attribute::optional("property", AttrKind::String),
    Attribute::required("source", AttrKind::String),
];

static ASSERTION: &[Attribute] = &[
    Attribute::required("source", AttrKind::String),
    Attribute::optional("property", AttrKind::String),
    Attribute::required("comparison", AttrKind::String),
    Attribute::optional("value", AttrKind::String),
];

static HEADER: &[Attribute] = &[
    Attribute::required("header", AttrKind::String),
    Attribute::required("value", AttrKind::String),
];

static AUTH: &[Attribute] = &[
    Attribute::required("username", AttrKind::String),
    Attribute::required("auth_type", AttrKind::String),
    Attribute::required("password", AttrKind::String),
];

static SCHEMA: Schema = Schema::new(&[
    Attribute::required("bucket_id", AttrKind::String).force_new(),
    Attribute::required("test_id", AttrKind::String).force_new(),
    Attribute::required("step_type", AttrKind::String).force_new(),
    Attribute::optional("method", AttrKind::String).force_new(),
    Attribute::optional("url", AttrKind::String),
    Attribute::optional("variables", AttrKind::BlockList(VARIABLE)),
    Attribute::optional("assertions", AttrKind::BlockList(ASSERTION)),
    Attribute::optional("headers", AttrKind::BlockList(HEADER)),
    Attribute::optional("auth", AttrKind::BlockSet(AUTH)).max_items(1),
    Attribute::optional("body", AttrKind::String),
    Attribute::optional("scripts", AttrKind::StringList),
    Attribute::optional("before_scripts", AttrKind::StringList),
]);

#[derive(Debug)]
pub struct StepResource;

/// Returns the step with its bucket key and test id
pub fn step_from_resource_data(data: &ResourceData) -> Result<(TestStep, String, String)> {
    let step = TestStep {
        id: data.id().to_string(),
        step_type: data.string("step_type")?,
        method: data.string("method")?,
        url: data.string("url")?,
        body: data.string("body")?,
        variables: expand_variables(&data.get_blocks("variables")?)?,
        assertions: expand_assertions(&data.get_blocks("assertions")?)?,
        headers: expand_headers(&data.get_blocks("headers")?)?,
        auth: expand_auth(&data.get_blocks("auth")?)?,
        scripts: data.get_strings("scripts")?,
        before_scripts: data.get_strings("before_scripts")?,
        ..TestStep::default()
    };
    Ok((step, data.string("bucket_id")?, data.string("test_id")?))
}

/// Write a step read from the API into the stored attributes
fn set_step_attributes(data: &mut ResourceData, step: TestStep) {
    data.set("step_type", step.step_type);
    data.set("method", step.method);
    data.set("url", step.url);
    data.set("body", step.body);
    data.set("variables", flatten_variables(&step.variables));
    data.set("assertions", flatten_assertions(&step.assertions));
    // Keep the declared pair order when it folds to the same headers
    let unchanged = data
        .get_blocks("headers")
        .ok()
        .and_then(|blocks| expand_headers(&blocks).ok())
        .is_some_and(|declared| declared == step.headers);
    if !unchanged {
        data.set("headers", Value::List(flatten_headers(&step.headers)));
    }
    data.set("auth", flatten_auth(step.auth.as_ref()));
    data.set("scripts", Value::string_list(step.scripts));
    data.set("before_scripts", Value::string_list(step.before_scripts));
}

impl Resource<Client> for StepResource {
    fn resource_type(&self) -> &'static str {
        "runscope_step"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn create(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let (step, bucket_key, test_id) = step_from_resource_data(data)?;
        log::debug!("step create: {step:?}");

        let created = client
            .create_test_step(&bucket_key, &test_id, &step)
            .map_err(|source| ProviderError::Create {
                kind: KIND,
                name: format!("{} {}", step.method, step.url),
                source,
            })?;

        data.set_id(created.id);
        log::info!("step ID: {}", data.id());
        self.read(client, data)
    }

    fn read(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let bucket_key = data.string("bucket_id")?;
        let test_id = data.string("test_id")?;
        let result = client.read_test_step(&bucket_key, &test_id, data.id());
        if let Some(step) = read_or_clear(KIND, data, GonePolicy::NotFoundOrForbidden, result)? {
            set_step_attributes(data, step);
        }
        Ok(())
    }

    fn update(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        if !data.has_any_change(UPDATABLE) {
            return Ok(());
        }

        let (step, bucket_key, test_id) = step_from_resource_data(data)?;
        client
            .update_test_step(&bucket_key, &test_id, &step)
            .map_err(|source| ProviderError::Update {
                kind: KIND,
                id: step.id.clone(),
                source,
            })?;
        self.read(client, data)
    }

    fn delete(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let (step, bucket_key, test_id) = step_from_resource_data(data)?;
        log::info!("Deleting step with id: {}", step.id);
        client
            .delete_test_step(&bucket_key, &test_id, &step.id)
            .map_err(|source| ProviderError::Delete {
                kind: KIND,
                id: step.id.clone(),
                source,
            })?;
        Ok(())
    }
}
