//! `runscope_environment`
//!
//! An environment is either shared by every test in a bucket or owned by
//! one test. The scope follows from whether `test_id` is declared.

use super::{GonePolicy, read_or_clear};
use crate::error::ProviderError;
use crate::structure::{
    expand_emails, expand_integrations, expand_remote_agents, flatten_emails,
    flatten_integrations, flatten_remote_agents, flatten_string_map,
};
use anyhow::Result;
use declarative::{AttrKind, Attribute, Resource, ResourceData, Schema, Value};
use runscope::{Client, Environment, EnvironmentScope};

const KIND: &str = "environment";

/// Attributes that trigger an update call
const UPDATABLE: &[&str] = &[
    "name",
    "script",
    "preserve_cookies",
    "initial_variables",
    "integrations",
    "regions",
    "remote_agents",
    "retry_on_failure",
    "verify_ssl",
    "webhooks",
    "emails",
];

static REMOTE_AGENT: &[Attribute] = &[
    Attribute::required("name", AttrKind::String),
    Attribute::required("uuid", AttrKind::String),
];

static RECIPIENT: &[Attribute] = &[
    Attribute::required("id", AttrKind::String),
    Attribute::required("name", AttrKind::String),
    Attribute::required("email", AttrKind::String),
];

static EMAILS: &[Attribute] = &[
    Attribute::required("notify_all", AttrKind::Bool),
    Attribute::required("notify_on", AttrKind::String),
    Attribute::required("notify_threshold", AttrKind::Int),
    Attribute::required("recipients", AttrKind::BlockList(RECIPIENT)),
];

static SCHEMA: Schema = Schema::new(&[
    Attribute::required("bucket_id", AttrKind::String).force_new(),
    Attribute::optional("test_id", AttrKind::String).force_new(),
    Attribute::required("name", AttrKind::String),
    Attribute::optional("script", AttrKind::String),
    Attribute::optional("preserve_cookies", AttrKind::Bool),
    Attribute::optional("initial_variables", AttrKind::StringMap),
    Attribute::optional("integrations", AttrKind::StringSet),
    Attribute::optional("regions", AttrKind::StringSet),
    Attribute::optional("remote_agents", AttrKind::BlockSet(REMOTE_AGENT)),
    Attribute::optional("retry_on_failure", AttrKind::Bool),
    Attribute::optional("verify_ssl", AttrKind::Bool).default_bool(true),
    Attribute::optional("webhooks", AttrKind::StringSet),
    Attribute::optional("emails", AttrKind::BlockList(EMAILS)).max_items(1),
]);

#[derive(Debug)]
pub struct EnvironmentResource;

/// Shared when `test_id` is absent or empty, test-scoped otherwise
pub fn scope_from_resource_data(data: &ResourceData) -> Result<EnvironmentScope> {
    let bucket_key = data.string("bucket_id")?;
    Ok(match data.get_str("test_id")? {
        Some(test_id) => EnvironmentScope::test(bucket_key, test_id),
        None => EnvironmentScope::shared(bucket_key),
    })
}

pub fn environment_from_resource_data(data: &ResourceData) -> Result<Environment> {
    let mut environment = Environment {
        id: data.id().to_string(),
        name: data.string("name")?,
        test_id: data.string("test_id")?,
        script: data.string("script")?,
        preserve_cookies: data.get_bool("preserve_cookies")?,
        initial_variables: data.get_string_map("initial_variables")?,
        integrations: expand_integrations(data.get_strings("integrations")?),
        regions: data.get_strings("regions")?,
        remote_agents: expand_remote_agents(&data.get_blocks("remote_agents")?)?,
        retry_on_failure: data.get_bool("retry_on_failure")?,
        webhooks: data.get_strings("webhooks")?,
        emails: expand_emails(&data.get_blocks("emails")?)?,
        ..Environment::default()
    };

    // Always read, even when false
    environment.verify_ssl = match data.get("verify_ssl") {
        Some(_) => data.get_bool("verify_ssl")?,
        None => true,
    };

    Ok(environment)
}

impl Resource<Client> for EnvironmentResource {
    fn resource_type(&self) -> &'static str {
        "runscope_environment"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn create(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let scope = scope_from_resource_data(data)?;
        let environment = environment_from_resource_data(data)?;
        log::info!(
            "Creating {} environment with name: {}",
            scope.label(),
            environment.name
        );
        log::debug!("environment create: {environment:?}");

        let created = client
            .create_environment(&scope, &environment)
            .map_err(|source| ProviderError::Create {
                kind: KIND,
                name: environment.name.clone(),
                source,
            })?;

        data.set_id(created.id);
        log::info!("environment ID: {}", data.id());
        self.read(client, data)
    }

    fn read(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let scope = scope_from_resource_data(data)?;
        let result = client.read_environment(&scope, data.id());
        let Some(environment) =
            read_or_clear(KIND, data, GonePolicy::NotFoundOrForbidden, result)?
        else {
            return Ok(());
        };

        data.set("name", environment.name);
        data.set("script", environment.script);
        data.set("preserve_cookies", environment.preserve_cookies);
        data.set(
            "initial_variables",
            flatten_string_map(&environment.initial_variables),
        );
        data.set(
            "integrations",
            flatten_integrations(&environment.integrations),
        );
        data.set("regions", Value::string_set(environment.regions));
        data.set(
            "remote_agents",
            flatten_remote_agents(&environment.remote_agents),
        );
        data.set("retry_on_failure", environment.retry_on_failure);
        data.set("verify_ssl", environment.verify_ssl);
        data.set("webhooks", Value::string_set(environment.webhooks));
        data.set("emails", flatten_emails(environment.emails.as_ref()));
        Ok(())
    }

    fn update(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        if !data.has_any_change(UPDATABLE) {
            return Ok(());
        }

        let scope = scope_from_resource_data(data)?;
        let environment = environment_from_resource_data(data)?;
        client
            .update_environment(&scope, &environment)
            .map_err(|source| ProviderError::Update {
                kind: KIND,
                id: environment.id.clone(),
                source,
            })?;
        self.read(client, data)
    }

    fn delete(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let scope = scope_from_resource_data(data)?;
        log::info!(
            "Deleting {} environment with id: {}",
            scope.label(),
            data.id()
        );
        client
            .delete_environment(&scope, data.id())
            .map_err(|source| ProviderError::Delete {
                kind: KIND,
                id: data.id().to_string(),
                source,
            })?;
        Ok(())
    }
}
