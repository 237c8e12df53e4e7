//! Ad hoc data source lookups
//!
//! Runs the same data sources a declaration's `[data.*]` tables use, with
//! attributes taken from the command line.

use anyhow::{Context as AnyhowContext, Result, bail};
use declarative::{Attributes, ResourceData, Value};
use runscope::Client;
use std::collections::BTreeMap;

use crate::Context;
use crate::cli::LookupCommand;
use crate::provider::Provider;
use crate::ui;

pub fn run(ctx: &Context, cmd: LookupCommand) -> Result<()> {
    let (data_source_type, attributes) = request(cmd)?;
    let client = super::standalone_settings(ctx)?.client();
    let result = read(&Provider::new(), &client, data_source_type, &attributes)?;

    ui::header(data_source_type);
    for (name, value) in &result {
        ui::kv(name, &value.to_string());
    }
    Ok(())
}

/// Data source type and declared attributes for a lookup command
fn request(cmd: LookupCommand) -> Result<(&'static str, Attributes)> {
    let mut attributes = Attributes::new();
    let (data_source_type, filters) = match cmd {
        LookupCommand::Bucket { key } => {
            attributes.insert("key".to_string(), Value::String(key));
            ("runscope_bucket", Vec::new())
        }
        LookupCommand::Buckets { filters } => ("runscope_buckets", filters),
        LookupCommand::Integration {
            team,
            integration_type,
            filters,
        } => {
            attributes.insert("team_uuid".to_string(), Value::String(team));
            attributes.insert("type".to_string(), Value::String(integration_type));
            ("runscope_integration", filters)
        }
        LookupCommand::Integrations { team, filters } => {
            attributes.insert("team_uuid".to_string(), Value::String(team));
            ("runscope_integrations", filters)
        }
    };

    if !filters.is_empty() {
        let blocks = filters
            .iter()
            .map(|f| parse_filter(f))
            .collect::<Result<Vec<_>>>()?;
        attributes.insert("filter".to_string(), Value::Set(blocks));
    }
    Ok((data_source_type, attributes))
}

/// Parse `name=value1,value2` into a filter block
pub fn parse_filter(s: &str) -> Result<Value> {
    let Some((name, values)) = s.split_once('=') else {
        bail!("invalid filter '{s}': expected NAME=VALUE[,VALUE...]");
    };
    let name = name.trim();
    let values: Vec<&str> = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    if name.is_empty() || values.is_empty() {
        bail!("invalid filter '{s}': expected NAME=VALUE[,VALUE...]");
    }

    Ok(Value::Map(BTreeMap::from([
        ("name".to_string(), Value::from(name)),
        ("values".to_string(), Value::string_list(values)),
    ])))
}

/// Validate and run one data source, returning its attributes and id
fn read(
    provider: &Provider,
    client: &Client,
    data_source_type: &str,
    declared: &Attributes,
) -> Result<Attributes> {
    let data_source = provider.data_source(data_source_type)?;
    let validated = data_source
        .schema()
        .validate(declared)
        .with_context(|| format!("Invalid arguments for {data_source_type}"))?;

    let mut data = ResourceData::new(validated);
    data_source.read(client, &mut data)?;
    let (id, mut attributes) = data.into_parts();
    attributes.insert("id".to_string(), Value::String(id));
    Ok(attributes)
}
