//! `runscope_integrations` data source

use super::{FILTER, lookup_id};
use crate::error::ProviderError;
use crate::filter::{filter_integrations, filters_from_resource_data};
use anyhow::Result;
use declarative::{AttrKind, Attribute, DataSource, ResourceData, Schema, Value};
use runscope::Client;

static SCHEMA: Schema = Schema::new(&[
    Attribute::required("team_uuid", AttrKind::String),
    Attribute::optional("filter", AttrKind::BlockSet(FILTER)),
    Attribute::computed("ids", AttrKind::StringList),
]);

#[derive(Debug)]
pub struct IntegrationsDataSource;

impl DataSource<Client> for IntegrationsDataSource {
    fn data_source_type(&self) -> &'static str {
        "runscope_integrations"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn read(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let filters = filters_from_resource_data(data)?;
        let integrations = client
            .list_integrations(data.require_str("team_uuid")?)
            .map_err(|source| ProviderError::Lookup {
                kind: "integrations",
                source,
            })?;

        let ids: Vec<&str> = filter_integrations(&integrations, &filters)
            .into_iter()
            .map(|i| i.id.as_str())
            .collect();

        data.set_id(lookup_id());
        data.set("ids", Value::string_list(ids));
        Ok(())
    }
}
