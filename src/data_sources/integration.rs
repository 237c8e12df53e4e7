//! `runscope_integration` data source
//!
//! Picks the first integration of the team whose type equals `type` and
//! that passes every filter.

use super::FILTER;
use crate::error::ProviderError;
use crate::filter::{Filter, filters_from_resource_data, first_integration};
use anyhow::Result;
use declarative::{AttrKind, Attribute, DataSource, ResourceData, Schema};
use runscope::Client;

static SCHEMA: Schema = Schema::new(&[
    Attribute::required("team_uuid", AttrKind::String),
    Attribute::required("type", AttrKind::String),
    Attribute::optional("filter", AttrKind::BlockSet(FILTER)),
    Attribute::computed("description", AttrKind::String),
]);

#[derive(Debug)]
pub struct IntegrationDataSource;

impl DataSource<Client> for IntegrationDataSource {
    fn data_source_type(&self) -> &'static str {
        "runscope_integration"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn read(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let team_uuid = data.require_str("team_uuid")?;
        let integration_type = data.require_str("type")?;

        let mut filters = vec![Filter::new("type", [integration_type])];
        filters.extend(filters_from_resource_data(data)?);

        let integrations = client
            .list_integrations(team_uuid)
            .map_err(|source| ProviderError::Lookup {
                kind: "integrations",
                source,
            })?;

        let found = first_integration(&integrations, &filters)
            .ok_or(ProviderError::NoMatch {
                kind: "integration",
            })?
            .clone();

        data.set_id(&found.id);
        data.set("type", found.integration_type);
        data.set("description", found.description);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{attrs, client};
    use declarative::Value;
    use runscope::{Integration, MockBackend};
    use std::collections::BTreeMap;

    fn seeded() -> MockBackend {
        let mock = MockBackend::new();
        for (id, kind, description) in [
            ("i1", "pagerduty", "on-call"),
            ("i2", "slack", "alerts"),
            ("i3", "slack", "builds"),
        ] {
            mock.add_integration(
                "team-1",
                Integration {
                    id: id.to_string(),
                    integration_type: kind.to_string(),
                    description: description.to_string(),
                },
            );
        }
        mock
    }

    #[test]
    fn test_first_of_type() {
        let mock = seeded();
        let mut data = ResourceData::new(attrs(&[
            ("team_uuid", "team-1".into()),
            ("type", "slack".into()),
        ]));

        IntegrationDataSource.read(&client(&mock), &mut data).unwrap();

        assert_eq!(data.id(), "i2");
        assert_eq!(data.get_str("description").unwrap(), Some("alerts"));
    }

    #[test]
    fn test_type_and_filters_combine() {
        let mock = seeded();
        let filter = Value::Map(BTreeMap::from([
            ("name".to_string(), Value::from("description")),
            ("values".to_string(), Value::string_list(["builds"])),
        ]));
        let mut data = ResourceData::new(attrs(&[
            ("team_uuid", "team-1".into()),
            ("type", "slack".into()),
            ("filter", Value::set([filter])),
        ]));

        IntegrationDataSource.read(&client(&mock), &mut data).unwrap();

        assert_eq!(data.id(), "i3");
    }

    #[test]
    fn test_no_match_is_an_error() {
        let mock = seeded();
        let mut data = ResourceData::new(attrs(&[
            ("team_uuid", "team-1".into()),
            ("type", "email".into()),
        ]));

        let err = IntegrationDataSource
            .read(&client(&mock), &mut data)
            .unwrap_err();
        assert!(err.to_string().contains("no integration matched"));
        assert!(!data.has_id());
    }
}
