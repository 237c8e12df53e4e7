//! `runscope_bucket` data source

use crate::error::ProviderError;
use anyhow::Result;
use declarative::{AttrKind, Attribute, DataSource, ResourceData, Schema};
use runscope::Client;

static SCHEMA: Schema = Schema::new(&[
    Attribute::required("key", AttrKind::String),
    Attribute::computed("name", AttrKind::String),
    Attribute::computed("team_uuid", AttrKind::String),
]);

#[derive(Debug)]
pub struct BucketDataSource;

impl DataSource<Client> for BucketDataSource {
    fn data_source_type(&self) -> &'static str {
        "runscope_bucket"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn read(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let key = data.require_str("key")?.to_string();
        let bucket = client
            .read_bucket(&key)
            .map_err(|source| ProviderError::Read {
                kind: "bucket",
                id: key.clone(),
                source,
            })?;

        data.set_id(&bucket.key);
        data.set("name", bucket.name.as_str());
        data.set("team_uuid", bucket.team_id());
        Ok(())
    }
}
