//! Per-resource attribute bag handed to resource implementations
//!
//! [`ResourceData`] carries a resource's id and attributes through one
//! create/read/update/delete call. When the resource already exists, the
//! prior attributes are kept alongside so an update can ask which
//! attributes actually changed.

use crate::value::{Attributes, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Attribute access errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("attribute \"{attribute}\" is required")]
    Missing { attribute: String },

    #[error("attribute \"{attribute}\": expected {expected}, found {found}")]
    Type {
        attribute: String,
        expected: &'static str,
        found: &'static str,
    },
}

type Result<T> = std::result::Result<T, AttributeError>;

fn type_error(attribute: &str, expected: &'static str, found: &Value) -> AttributeError {
    AttributeError::Type {
        attribute: attribute.to_string(),
        expected,
        found: found.kind_name(),
    }
}

fn str_of<'a>(value: Option<&'a Value>, attribute: &str) -> Result<Option<&'a str>> {
    match value {
        None => Ok(None),
        Some(Value::String(s)) => Ok((!s.is_empty()).then_some(s.as_str())),
        Some(other) => Err(type_error(attribute, "string", other)),
    }
}

fn bool_of(value: Option<&Value>, attribute: &str) -> Result<bool> {
    match value {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(type_error(attribute, "bool", other)),
    }
}

fn int_of(value: Option<&Value>, attribute: &str) -> Result<i64> {
    match value {
        None => Ok(0),
        Some(Value::Int(i)) => Ok(*i),
        Some(other) => Err(type_error(attribute, "int", other)),
    }
}

fn items_of<'a>(value: Option<&'a Value>, attribute: &str) -> Result<&'a [Value]> {
    match value {
        None => Ok(&[]),
        Some(v) => v.as_items().ok_or_else(|| type_error(attribute, "list", v)),
    }
}

fn strings_of(value: Option<&Value>, attribute: &str) -> Result<Vec<String>> {
    items_of(value, attribute)?
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| type_error(attribute, "string", item))
        })
        .collect()
}

fn map_of<'a>(
    value: Option<&'a Value>,
    attribute: &str,
) -> Result<Option<&'a BTreeMap<String, Value>>> {
    match value {
        None => Ok(None),
        Some(v) => v
            .as_map()
            .map(Some)
            .ok_or_else(|| type_error(attribute, "map", v)),
    }
}

fn blocks_of<'a>(value: Option<&'a Value>, attribute: &str) -> Result<Vec<Block<'a>>> {
    items_of(value, attribute)?
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let path = format!("{attribute}[{i}]");
            match item.as_map() {
                Some(entries) => Ok(Block { entries, path }),
                None => Err(type_error(&path, "block", item)),
            }
        })
        .collect()
}

/// Id, attributes, and optionally the prior attributes of one resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    id: String,
    attributes: Attributes,
    prior: Option<Attributes>,
}

impl ResourceData {
    pub fn new(attributes: Attributes) -> Self {
        Self {
            id: String::new(),
            attributes,
            prior: None,
        }
    }

    pub fn with_id(id: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            id: id.into(),
            attributes,
            prior: None,
        }
    }

    /// Attach the previously stored attributes, enabling change detection
    #[must_use]
    pub fn with_prior(mut self, prior: Attributes) -> Self {
        self.prior = Some(prior);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Mark the resource as gone
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// The value, unless it is absent or zero
    pub fn get_ok(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !v.is_zero())
    }

    /// Non-empty string value
    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        str_of(self.get(key), key)
    }

    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_str(key)?.ok_or_else(|| AttributeError::Missing {
            attribute: key.to_string(),
        })
    }

    /// String value, empty when absent
    pub fn string(&self, key: &str) -> Result<String> {
        Ok(self.get_str(key)?.unwrap_or_default().to_string())
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        bool_of(self.get(key), key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        int_of(self.get(key), key)
    }

    pub fn get_list(&self, key: &str) -> Result<&[Value]> {
        items_of(self.get(key), key)
    }

    pub fn get_strings(&self, key: &str) -> Result<Vec<String>> {
        strings_of(self.get(key), key)
    }

    pub fn get_map(&self, key: &str) -> Result<Option<&BTreeMap<String, Value>>> {
        map_of(self.get(key), key)
    }

    /// String-to-string map, empty when absent
    pub fn get_string_map(&self, key: &str) -> Result<BTreeMap<String, String>> {
        let Some(entries) = self.get_map(key)? else {
            return Ok(BTreeMap::new());
        };
        entries
            .iter()
            .map(|(k, v)| match v.as_str() {
                Some(s) => Ok((k.clone(), s.to_string())),
                None => Err(type_error(&format!("{key}.{k}"), "string", v)),
            })
            .collect()
    }

    pub fn get_blocks(&self, key: &str) -> Result<Vec<Block<'_>>> {
        blocks_of(self.get(key), key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.attributes.remove(key);
    }

    /// Whether `key` differs from the prior attributes
    ///
    /// Without prior attributes, any non-zero value counts as a change.
    pub fn has_change(&self, key: &str) -> bool {
        match &self.prior {
            Some(prior) => !Value::same(prior.get(key), self.get(key)),
            None => self.get_ok(key).is_some(),
        }
    }

    pub fn has_any_change(&self, keys: &[&str]) -> bool {
        keys.iter().any(|key| self.has_change(key))
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn into_parts(self) -> (String, Attributes) {
        (self.id, self.attributes)
    }
}

/// One nested block inside a list or set attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Block<'a> {
    entries: &'a BTreeMap<String, Value>,
    path: String,
}

impl<'a> Block<'a> {
    fn path(&self, key: &str) -> String {
        format!("{}.{key}", self.path)
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.entries.get(key)
    }

    pub fn get_str(&self, key: &str) -> Result<Option<&'a str>> {
        str_of(self.get(key), &self.path(key))
    }

    pub fn string(&self, key: &str) -> Result<String> {
        Ok(self.get_str(key)?.unwrap_or_default().to_string())
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        bool_of(self.get(key), &self.path(key))
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        int_of(self.get(key), &self.path(key))
    }

    pub fn get_strings(&self, key: &str) -> Result<Vec<String>> {
        strings_of(self.get(key), &self.path(key))
    }

    pub fn get_blocks(&self, key: &str) -> Result<Vec<Block<'a>>> {
        blocks_of(self.get(key), &self.path(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> ResourceData {
        let mut d = ResourceData::new(Attributes::new());
        d.set("name", "smoke");
        d.set("description", "");
        d.set("verify_ssl", true);
        d.set("threshold", 3_i64);
        d.set("regions", Value::string_set(["us1", "eu1"]));
        d.set("variables", Value::string_map([("base_url", "https://x")]));
        d.set(
            "headers",
            Value::List(vec![Value::Map(BTreeMap::from([
                ("header".to_string(), Value::from("Accept")),
                ("value".to_string(), Value::from("text/plain")),
            ]))]),
        );
        d
    }

    #[test]
    fn test_typed_getters() {
        let d = data();
        assert_eq!(d.get_str("name").unwrap(), Some("smoke"));
        assert_eq!(d.get_str("description").unwrap(), None);
        assert_eq!(d.get_str("missing").unwrap(), None);
        assert!(d.get_bool("verify_ssl").unwrap());
        assert!(!d.get_bool("missing").unwrap());
        assert_eq!(d.get_int("threshold").unwrap(), 3);
        assert_eq!(d.get_strings("regions").unwrap(), vec!["eu1", "us1"]);
        assert_eq!(
            d.get_string_map("variables").unwrap()["base_url"],
            "https://x"
        );
    }

    #[test]
    fn test_type_mismatch() {
        let d = data();
        let err = d.get_bool("name").unwrap_err();
        assert_eq!(
            err,
            AttributeError::Type {
                attribute: "name".to_string(),
                expected: "bool",
                found: "string"
            }
        );
    }

    #[test]
    fn test_require_str() {
        let d = data();
        assert_eq!(d.require_str("name").unwrap(), "smoke");
        assert!(matches!(
            d.require_str("description"),
            Err(AttributeError::Missing { .. })
        ));
    }

    #[test]
    fn test_blocks() {
        let d = data();
        let blocks = d.get_blocks("headers").unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].get_str("header").unwrap(), Some("Accept"));
        assert_eq!(blocks[0].string("missing").unwrap(), "");

        let err = blocks[0].get_int("value").unwrap_err();
        assert!(matches!(err, AttributeError::Type { attribute, .. } if attribute == "headers[0].value"));
    }

    #[test]
    fn test_has_change_without_prior() {
        let d = data();
        assert!(d.has_change("name"));
        assert!(!d.has_change("description"));
        assert!(!d.has_change("missing"));
    }

    #[test]
    fn test_has_change_with_prior() {
        let prior = data().into_parts().1;
        let mut d = data().with_prior(prior);
        assert!(!d.has_change("name"));

        d.set("name", "renamed");
        d.remove("description");
        assert!(d.has_change("name"));
        assert!(!d.has_change("description"));
        assert!(d.has_any_change(&["threshold", "name"]));
        assert!(!d.has_any_change(&["threshold", "regions"]));
    }

    #[test]
    fn test_id_lifecycle() {
        let mut d = ResourceData::with_id("abc", Attributes::new());
        assert!(d.has_id());
        d.clear_id();
        assert!(!d.has_id());
        d.set_id("def");
        assert_eq!(d.id(), "def");
    }
}
