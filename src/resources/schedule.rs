//! `runscope_schedule`

use super::{GonePolicy, read_or_clear};
use crate::error::ProviderError;
use anyhow::Result;
use declarative::{AttrKind, Attribute, Resource, ResourceData, Schema};
use runscope::{Client, Schedule};

const KIND: &str = "schedule";

static SCHEMA: Schema = Schema::new(&[
    Attribute::required("bucket_id", AttrKind::String).force_new(),
    Attribute::required("test_id", AttrKind::String).force_new(),
    Attribute::required("environment_id", AttrKind::String).force_new(),
    Attribute::optional("interval", AttrKind::String).force_new(),
    Attribute::optional("note", AttrKind::String).force_new(),
]);

#[derive(Debug)]
pub struct ScheduleResource;

/// Returns the schedule with its bucket key and test id
pub fn schedule_from_resource_data(data: &ResourceData) -> Result<(Schedule, String, String)> {
    let schedule = Schedule {
        id: data.id().to_string(),
        environment_id: data.string("environment_id")?,
        interval: data.string("interval")?,
        note: data.string("note")?,
    };
    Ok((schedule, data.string("bucket_id")?, data.string("test_id")?))
}

impl Resource<Client> for ScheduleResource {
    fn resource_type(&self) -> &'static str {
        "runscope_schedule"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn can_update(&self) -> bool {
        false
    }

    fn create(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let (schedule, bucket_key, test_id) = schedule_from_resource_data(data)?;
        log::debug!("schedule create: {schedule:?}");

        let created = client
            .create_schedule(&bucket_key, &test_id, &schedule)
            .map_err(|source| ProviderError::Create {
                kind: KIND,
                name: format!("{test_id}/{}", schedule.environment_id),
                source,
            })?;

        data.set_id(created.id);
        log::info!("schedule ID: {}", data.id());
        self.read(client, data)
    }

    fn read(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let (_, bucket_key, test_id) = schedule_from_resource_data(data)?;
        let result = client.read_schedule(&bucket_key, &test_id, data.id());
        let Some(schedule) = read_or_clear(KIND, data, GonePolicy::NotFoundOrForbidden, result)?
        else {
            return Ok(());
        };

        data.set("environment_id", schedule.environment_id);
        data.set("interval", schedule.interval);
        data.set("note", schedule.note);
        Ok(())
    }

    fn delete(&self, client: &Client, data: &mut ResourceData) -> Result<()> {
        let (schedule, bucket_key, test_id) = schedule_from_resource_data(data)?;
        log::info!("Deleting schedule with id: {}", schedule.id);
        client
            .delete_schedule(&bucket_key, &test_id, &schedule.id)
            .map_err(|source| ProviderError::Delete {
                kind: KIND,
                id: schedule.id.clone(),
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
            ("bucket_id", "b1".into()),
            ("test_id", "t1".into()),
            ("environment_id", "e1".into()),
            ("interval", "1h".into()),
            ("note", "hourly".into()),
        ]))
    }

    #[test]
    fn test_create_and_read() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let mut data = declared();

        ScheduleResource.create(&client, &mut data).unwrap();

        assert!(data.has_id());
        assert_eq!(data.get_str("interval").unwrap(), Some("1h"));
        assert_eq!(mock.calls("read_schedule"), 1);
    }

    #[test]
    fn test_no_update_path() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let mut data = declared();
        ScheduleResource.create(&client, &mut data).unwrap();

        assert!(!ScheduleResource.can_update());
        assert!(ScheduleResource.update(&client, &mut data).is_err());
        assert_eq!(mock.calls("create_schedule"), 1);
        assert_eq!(mock.calls("delete_schedule"), 0);
    }

    #[test]
    fn test_read_gone() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let mut data = declared();
        ScheduleResource.create(&client, &mut data).unwrap();

        mock.fail_next("read_schedule", 403);
        ScheduleResource.read(&client, &mut data).unwrap();
        assert!(!data.has_id());
    }
}
