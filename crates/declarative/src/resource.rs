//! Resource and data source traits
//!
//! A resource type knows its [`Schema`] and how to create, read, update,
//! and delete one remote entity through a client `C`. All four operations
//! work on a [`ResourceData`]: on entry it holds the declared (or stored)
//! attributes, on exit it holds what the remote side reports.
//!
//! # Example
//!
//! ```ignore
//! use declarative::{AttrKind, Attribute, Resource, ResourceData, Schema};
//!
//! static SCHEMA: Schema = Schema::new(&[
//!     Attribute::required("name", AttrKind::String).force_new(),
//! ]);
//!
//! #[derive(Debug)]
//! struct Folder;
//!
//! impl Resource<Client> for Folder {
//!     fn resource_type(&self) -> &'static str {
//!         "folder"
//!     }
//!
//!     fn schema(&self) -> &'static Schema {
//!         &SCHEMA
//!     }
//!
//!     fn create(&self, client: &Client, data: &mut ResourceData) -> anyhow::Result<()> {
//!         let id = client.create_folder(data.require_str("name")?)?;
//!         data.set_id(id);
//!         self.read(client, data)
//!     }
//!
//!     fn read(&self, client: &Client, data: &mut ResourceData) -> anyhow::Result<()> {
//!         match client.read_folder(data.id()) {
//!             Ok(folder) => data.set("name", folder.name),
//!             Err(e) if e.is_not_found() => data.clear_id(),
//!             Err(e) => return Err(e.into()),
//!         }
//!         Ok(())
//!     }
//!
//!     fn delete(&self, client: &Client, data: &mut ResourceData) -> anyhow::Result<()> {
//!         client.delete_folder(data.id())?;
//!         Ok(())
//!     }
//! }
//! ```

use crate::data::ResourceData;
use crate::schema::Schema;
use anyhow::Result;
use std::fmt;

/// A remote entity managed through client `C`
pub trait Resource<C: ?Sized>: Send + Sync + fmt::Debug {
    /// Type name used in declarations and addresses, e.g. "runscope_bucket"
    fn resource_type(&self) -> &'static str;

    /// Attributes accepted by this resource type
    fn schema(&self) -> &'static Schema;

    /// Create the entity and fill `data` with its id and remote attributes
    fn create(&self, client: &C, data: &mut ResourceData) -> Result<()>;

    /// Refresh `data` from the remote entity
    ///
    /// An entity that no longer exists clears the id instead of failing.
    fn read(&self, client: &C, data: &mut ResourceData) -> Result<()>;

    /// Whether the type has an in-place update path at all
    fn can_update(&self) -> bool {
        true
    }

    /// Update the entity in place
    ///
    /// Only called when no changed attribute forces replacement.
    fn update(&self, _client: &C, _data: &mut ResourceData) -> Result<()> {
        anyhow::bail!(
            "{} does not support in-place updates",
            self.resource_type()
        )
    }

    /// Delete the entity
    fn delete(&self, client: &C, data: &mut ResourceData) -> Result<()>;
}

/// A read-only lookup through client `C`
pub trait DataSource<C: ?Sized>: Send + Sync + fmt::Debug {
    /// Type name used in declarations, e.g. "runscope_integration"
    fn data_source_type(&self) -> &'static str;

    /// Attributes accepted by this data source
    fn schema(&self) -> &'static Schema;

    /// Perform the lookup, setting the id and computed attributes
    fn read(&self, client: &C, data: &mut ResourceData) -> Result<()>;
}

/// Type alias for boxed resources
pub type BoxedResource<C> = Box<dyn Resource<C>>;

/// Type alias for boxed data sources
pub type BoxedDataSource<C> = Box<dyn DataSource<C>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttrKind, Attribute};
    use crate::value::Attributes;

    static SCHEMA: Schema = Schema::new(&[Attribute::required("name", AttrKind::String)]);

    #[derive(Debug)]
    struct CreateOnly;

    impl Resource<()> for CreateOnly {
        fn resource_type(&self) -> &'static str {
            "create_only"
        }

        fn schema(&self) -> &'static Schema {
            &SCHEMA
        }

        fn create(&self, _client: &(), data: &mut ResourceData) -> Result<()> {
            data.set_id("1");
            Ok(())
        }

        fn read(&self, _client: &(), _data: &mut ResourceData) -> Result<()> {
            Ok(())
        }

        fn delete(&self, _client: &(), data: &mut ResourceData) -> Result<()> {
            data.clear_id();
            Ok(())
        }

        fn can_update(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_default_update_fails() {
        let resource: BoxedResource<()> = Box::new(CreateOnly);
        let mut data = ResourceData::new(Attributes::new());
        resource.create(&(), &mut data).unwrap();
        assert_eq!(data.id(), "1");

        let err = resource.update(&(), &mut data).unwrap_err();
        assert!(err.to_string().contains("create_only"));
    }
}
