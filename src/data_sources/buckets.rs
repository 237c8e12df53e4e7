//! `runscope_buckets` data source

use super::{FILTER, lookup_id};
use crate::error::ProviderError;
use crate::filter::{filter_buckets, filters_from_resource_data};
use anyhow::Result;
use declarative::{AttrKind, Attribute, DataSource, ResourceData, Schema, Value};
use runscope::Client;

static SCHEMA: Schema = Schema::new(&[
    Attribute::optional("filter", AttrKind::BlockSet(FILTER)),
    Attribute::computed("keys", AttrKind::StringList),
]);

#[derive(Debug)]
pub struct BucketsDataSource;

impl DataSource<Client> for BucketsDataSource {
    fn data_source_type(&self) -> &'static str {
        "runscope_buckets"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn read(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let filters = filters_from_resource_data(data)?;
        let buckets = client
            .list_buckets()
            .map_err(|source| ProviderError::Lookup {
                kind: "buckets",
                source,
            })?;

        let keys: Vec<&str> = filter_buckets(&buckets, &filters)
            .into_iter()
            .map(|b| b.key.as_str())
            .collect();
        log::debug!("{} of {} buckets matched", keys.len(), buckets.len());

        data.set_id(lookup_id());
        data.set("keys", Value::string_list(keys));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{attrs, client};
    use runscope::{Bucket, MockBackend};
    use std::collections::BTreeMap;

    fn seeded() -> MockBackend {
        let mock = MockBackend::new();
        for (key, name) in [("a", "alpha"), ("b", "beta"), ("c", "alpha")] {
            mock.add_bucket(Bucket {
                key: key.to_string(),
                name: name.to_string(),
                ..Bucket::default()
            });
        }
        mock
    }

    fn filter(name: &str, values: &[&str]) -> Value {
        Value::Map(BTreeMap::from([
            ("name".to_string(), Value::from(name)),
            ("values".to_string(), Value::string_list(values.iter().copied())),
        ]))
    }

    #[test]
    fn test_no_filter_returns_all_keys() {
        let mock = seeded();
        let mut data = ResourceData::new(attrs(&[]));

        BucketsDataSource.read(&client(&mock), &mut data).unwrap();

        assert!(data.has_id());
        assert_eq!(data.get_strings("keys").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_filters_narrow_keys() {
        let mock = seeded();
        let mut data = ResourceData::new(attrs(&[(
            "filter",
            Value::set([filter("name", &["alpha"]), filter("key", &["a", "b"])]),
        )]));

        BucketsDataSource.read(&client(&mock), &mut data).unwrap();

        assert_eq!(data.get_strings("keys").unwrap(), vec!["a"]);
    }

    #[test]
    fn test_list_failure() {
        let mock = seeded();
        mock.fail_next("list_buckets", 500);
        let mut data = ResourceData::new(attrs(&[]));

        assert!(BucketsDataSource.read(&client(&mock), &mut data).is_err());
        assert!(!data.has_id());
    }
}
