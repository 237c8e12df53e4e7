//! Filter predicates for data source lookups
//!
//! A candidate passes when every filter matches (AND), and a filter
//! matches when the selected attribute equals any of its values (OR).

use declarative::{AttributeError, ResourceData};
use runscope::{Bucket, Integration};

/// One `{ name, values }` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new<S: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Something a filter clause can select an attribute from
pub trait Filterable {
    fn filter_value(&self, name: &str) -> &str;
}

impl Filterable for Bucket {
    fn filter_value(&self, name: &str) -> &str {
        match name {
            "key" => &self.key,
            _ => &self.name,
        }
    }
}

impl Filterable for Integration {
    fn filter_value(&self, name: &str) -> &str {
        match name {
            "id" => &self.id,
            "type" => &self.integration_type,
            _ => &self.description,
        }
    }
}

/// True when every clause matches; no clauses means everything matches
pub fn matches<T: Filterable>(candidate: &T, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| {
        let actual = candidate.filter_value(&filter.name);
        filter.values.iter().any(|value| value == actual)
    })
}

/// All matching candidates, in their original order
pub fn filter_all<'a, T: Filterable>(candidates: &'a [T], filters: &[Filter]) -> Vec<&'a T> {
    candidates.iter().filter(|c| matches(*c, filters)).collect()
}

/// The first matching candidate
pub fn first_match<'a, T: Filterable>(candidates: &'a [T], filters: &[Filter]) -> Option<&'a T> {
    candidates.iter().find(|c| matches(*c, filters))
}

pub fn filter_buckets<'a>(buckets: &'a [Bucket], filters: &[Filter]) -> Vec<&'a Bucket> {
    filter_all(buckets, filters)
}

pub fn first_bucket<'a>(buckets: &'a [Bucket], filters: &[Filter]) -> Option<&'a Bucket> {
    first_match(buckets, filters)
}

pub fn filter_integrations<'a>(
    integrations: &'a [Integration],
    filters: &[Filter],
) -> Vec<&'a Integration> {
    filter_all(integrations, filters)
}

pub fn first_integration<'a>(
    integrations: &'a [Integration],
    filters: &[Filter],
) -> Option<&'a Integration> {
    first_match(integrations, filters)
}

/// Read the `filter` blocks of a data source declaration
pub fn filters_from_resource_data(data: &ResourceData) -> Result<Vec<Filter>, AttributeError> {
    data.get_blocks("filter")?
        .iter()
        .map(|b| Ok(Filter::new(b.string("name")?, b.get_strings("values")?)))
        .collect()
}
