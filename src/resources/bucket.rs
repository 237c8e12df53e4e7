//! `runscope_bucket`

use super::{GonePolicy, read_or_clear};
use crate::error::ProviderError;
use anyhow::Result;
use declarative::{AttrKind, Attribute, Resource, ResourceData, Schema};
use runscope::{Bucket, Client, Team};

const KIND: &str = "bucket";

static SCHEMA: Schema = Schema::new(&[
    Attribute::required("name", AttrKind::String).force_new(),
    Attribute::required("team_uuid", AttrKind::String).force_new(),
    Attribute::computed("verify_ssl", AttrKind::Bool),
    Attribute::computed("default", AttrKind::Bool),
    Attribute::computed("auth_token", AttrKind::String),
    Attribute::computed("trigger_url", AttrKind::String),
]);

#[derive(Debug)]
pub struct BucketResource;

pub fn bucket_from_resource_data(data: &ResourceData) -> Result<Bucket> {
    Ok(Bucket {
        key: data.id().to_string(),
        name: data.string("name")?,
        team: Some(Team {
            id: data.string("team_uuid")?,
            ..Team::default()
        }),
        ..Bucket::default()
    })
}

impl Resource<Client> for BucketResource {
    fn resource_type(&self) -> &'static str {
        "runscope_bucket"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn can_update(&self) -> bool {
        false
    }

    fn create(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let bucket = bucket_from_resource_data(data)?;
        log::info!("Creating bucket with name: {}", bucket.name);

        let created = client
            .create_bucket(&bucket)
            .map_err(|source| ProviderError::Create {
                kind: KIND,
                name: bucket.name.clone(),
                source,
            })?;

        data.set_id(created.key);
        log::info!("bucket key: {}", data.id());
        self.read(client, data)
    }

    fn read(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let result = client.read_bucket(data.id());
        let Some(bucket) = read_or_clear(KIND, data, GonePolicy::NotFound, result)? else {
            return Ok(());
        };

        data.set("name", &bucket.name);
        data.set("team_uuid", bucket.team_id());
        data.set("verify_ssl", bucket.verify_ssl);
        data.set("default", bucket.default);
        data.set("auth_token", &bucket.auth_token);
        data.set("trigger_url", &bucket.trigger_url);
        Ok(())
    }

    fn delete(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        log::info!("Deleting bucket with key: {}", data.id());
        client
            .delete_bucket(data.id())
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
    use runscope::MockBackend;

    fn declared() -> ResourceData {
        ResourceData::new(attrs(&[
            ("name", "payments".into()),
            ("team_uuid", "team-1".into()),
        ]))
    }

    #[test]
    fn test_create_reads_back() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let mut data = declared();

        BucketResource.create(&client, &mut data).unwrap();

        assert!(data.id().starts_with("bucket-"));
        assert_eq!(data.get_str("auth_token").unwrap(), Some(format!("token-{}", data.id()).as_str()));
        assert_eq!(data.get_str("team_uuid").unwrap(), Some("team-1"));
        assert_eq!(mock.calls("create_bucket"), 1);
        assert_eq!(mock.calls("read_bucket"), 1);
    }

    #[test]
    fn test_create_failure_is_annotated() {
        let mock = MockBackend::new();
        mock.fail_next("create_bucket", 500);
        let client = client(&mock);
        let mut data = declared();

        let err = BucketResource.create(&client, &mut data).unwrap_err();
        assert_eq!(err.to_string(), "error creating bucket \"payments\"");
        assert!(!data.has_id());
    }

    #[test]
    fn test_read_forbidden_is_an_error() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let mut data = declared();
        BucketResource.create(&client, &mut data).unwrap();

        mock.fail_next("read_bucket", 403);
        assert!(BucketResource.read(&client, &mut data).is_err());
        assert!(data.has_id());

        mock.fail_next("read_bucket", 404);
        BucketResource.read(&client, &mut data).unwrap();
        assert!(!data.has_id());
    }

    #[test]
    fn test_delete_missing_is_an_error() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let mut data = ResourceData::with_id("nope", declared().into_parts().1);

        let err = BucketResource.delete(&client, &mut data).unwrap_err();
        assert!(crate::error::is_not_found(&err));
    }
}
