//! Runscope data sources
//!
//! Lookups list candidates from the API and narrow them with the
//! `filter` blocks of the declaration.

pub mod bucket;
pub mod buckets;
pub mod integration;
pub mod integrations;

use declarative::{AttrKind, Attribute};

/// `filter { name = "...", values = [...] }`
pub static FILTER: &[Attribute] = &[
    Attribute::required("name", AttrKind::String),
    Attribute::required("values", AttrKind::StringList),
];

/// Id for lookups that return a collection rather than one entity
fn lookup_id() -> String {
    chrono::Utc::now().to_rfc3339()
}
