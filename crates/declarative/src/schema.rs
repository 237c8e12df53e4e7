//! Resource schemas
//!
//! A [`Schema`] lists the attributes a resource type accepts. Declared
//! attributes are checked against it once, at the declaration boundary:
//! unknown or computed attributes are rejected, required ones must be
//! present, values are coerced to their declared kind, and defaults are
//! filled in.
//!
//! Schemas are built in `static` items:
//!
//! ```ignore
//! use declarative::{AttrKind, Attribute, Schema};
//!
//! static SCHEMA: Schema = Schema::new(&[
//!     Attribute::required("name", AttrKind::String).force_new(),
//!     Attribute::optional("tags", AttrKind::StringSet),
//!     Attribute::optional("verify_ssl", AttrKind::Bool).default_bool(true),
//!     Attribute::computed("auth_token", AttrKind::String),
//! ]);
//! ```

use crate::value::{Attributes, Value};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors found while validating declared attributes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("missing required attribute \"{attribute}\"")]
    Missing { attribute: String },

    #[error("unsupported attribute \"{attribute}\"")]
    Unknown { attribute: String },

    #[error("attribute \"{attribute}\" is computed and cannot be set")]
    Computed { attribute: String },

    #[error("attribute \"{attribute}\": expected {expected}, found {found}")]
    Type {
        attribute: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("attribute \"{attribute}\": at most {max} item(s) allowed, found {found}")]
    TooMany {
        attribute: String,
        max: usize,
        found: usize,
    },
}

/// Kind of value an attribute holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    String,
    Bool,
    Int,
    /// Ordered strings
    StringList,
    /// Unordered, deduplicated strings
    StringSet,
    /// String to string
    StringMap,
    /// Ordered nested blocks
    BlockList(&'static [Attribute]),
    /// Unordered nested blocks
    BlockSet(&'static [Attribute]),
}

impl AttrKind {
    /// Human-readable description used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::StringList => "list of strings",
            Self::StringSet => "set of strings",
            Self::StringMap => "map of strings",
            Self::BlockList(_) => "list of blocks",
            Self::BlockSet(_) => "set of blocks",
        }
    }
}

/// Whether an attribute is declared, optional, or only set by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    Computed,
}

/// Default for an optional attribute left out of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Str(&'static str),
}

impl DefaultValue {
    fn to_value(self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(b),
            Self::Int(i) => Value::Int(i),
            Self::Str(s) => Value::String(s.to_string()),
        }
    }
}

/// One attribute of a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub name: &'static str,
    pub kind: AttrKind,
    pub presence: Presence,
    /// Changing this attribute replaces the resource
    pub force_new: bool,
    pub default: Option<DefaultValue>,
    pub max_items: Option<usize>,
}

impl Attribute {
    const fn with(name: &'static str, kind: AttrKind, presence: Presence) -> Self {
        Self {
            name,
            kind,
            presence,
            force_new: false,
            default: None,
            max_items: None,
        }
    }

    pub const fn required(name: &'static str, kind: AttrKind) -> Self {
        Self::with(name, kind, Presence::Required)
    }

    pub const fn optional(name: &'static str, kind: AttrKind) -> Self {
        Self::with(name, kind, Presence::Optional)
    }

    pub const fn computed(name: &'static str, kind: AttrKind) -> Self {
        Self::with(name, kind, Presence::Computed)
    }

    pub const fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub const fn default_bool(mut self, value: bool) -> Self {
        self.default = Some(DefaultValue::Bool(value));
        self
    }

    pub const fn default_int(mut self, value: i64) -> Self {
        self.default = Some(DefaultValue::Int(value));
        self
    }

    pub const fn default_str(mut self, value: &'static str) -> Self {
        self.default = Some(DefaultValue::Str(value));
        self
    }

    pub const fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    /// Set only by the provider, never declared
    pub fn is_computed(&self) -> bool {
        self.presence == Presence::Computed
    }
}

/// Attributes accepted by one resource or data source type
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    attributes: &'static [Attribute],
}

impl Schema {
    pub const fn new(attributes: &'static [Attribute]) -> Self {
        Self { attributes }
    }

    pub fn attributes(&self) -> &'static [Attribute] {
        self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&'static Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Validate declared attributes and return them coerced, with defaults applied
    pub fn validate(&self, declared: &Attributes) -> Result<Attributes, SchemaError> {
        validate_block(self.attributes, declared, "", &BTreeSet::new())
    }

    /// Like [`Schema::validate`], but attributes named in `pending` are
    /// passed through untouched
    ///
    /// Used while planning, when some values depend on resources that do
    /// not exist yet. Pending attributes still have to be known to the
    /// schema.
    pub fn validate_pending(
        &self,
        declared: &Attributes,
        pending: &BTreeSet<String>,
    ) -> Result<Attributes, SchemaError> {
        validate_block(self.attributes, declared, "", pending)
    }

    /// Coerce stored attributes back to their schema kinds
    ///
    /// Stored state loses the list/set distinction on disk. Values that
    /// do not fit their kind are kept as they are.
    pub fn normalize(&self, stored: &Attributes) -> Attributes {
        stored
            .iter()
            .map(|(name, value)| {
                let value = self
                    .attribute(name)
                    .and_then(|attr| coerce(attr, value, name).ok())
                    .unwrap_or_else(|| value.clone());
                (name.clone(), value)
            })
            .collect()
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn validate_block(
    attributes: &[Attribute],
    declared: &Attributes,
    prefix: &str,
    pending: &BTreeSet<String>,
) -> Result<Attributes, SchemaError> {
    for name in declared.keys() {
        match attributes.iter().find(|a| a.name == name) {
            None => {
                return Err(SchemaError::Unknown {
                    attribute: join(prefix, name),
                });
            }
            Some(attr) if attr.is_computed() => {
                return Err(SchemaError::Computed {
                    attribute: join(prefix, name),
                });
            }
            Some(_) => {}
        }
    }

    let mut validated = Attributes::new();
    for attr in attributes {
        let path = join(prefix, attr.name);
        if pending.contains(attr.name) {
            if let Some(value) = declared.get(attr.name) {
                validated.insert(attr.name.to_string(), value.clone());
            }
            continue;
        }
        match declared.get(attr.name) {
            Some(value) => {
                validated.insert(attr.name.to_string(), coerce(attr, value, &path)?);
            }
            None if attr.presence == Presence::Required => {
                return Err(SchemaError::Missing { attribute: path });
            }
            None => {
                if let Some(default) = attr.default {
                    validated.insert(attr.name.to_string(), default.to_value());
                }
            }
        }
    }
    Ok(validated)
}

fn type_error(path: &str, expected: &'static str, found: &Value) -> SchemaError {
    SchemaError::Type {
        attribute: path.to_string(),
        expected,
        found: found.kind_name(),
    }
}

fn coerce(attr: &Attribute, value: &Value, path: &str) -> Result<Value, SchemaError> {
    let coerced = match attr.kind {
        AttrKind::String => Value::String(scalar_string(value, path)?),
        AttrKind::Bool => match value {
            Value::Bool(b) => Value::Bool(*b),
            Value::String(s) if s == "true" || s == "false" => Value::Bool(s == "true"),
            other => return Err(type_error(path, "bool", other)),
        },
        AttrKind::Int => match value {
            Value::Int(i) => Value::Int(*i),
            Value::String(s) => s
                .parse()
                .map(Value::Int)
                .map_err(|_| type_error(path, "int", value))?,
            other => return Err(type_error(path, "int", other)),
        },
        AttrKind::StringList => Value::List(string_items(value, path)?),
        AttrKind::StringSet => Value::set(string_items(value, path)?),
        AttrKind::StringMap => {
            let entries = value
                .as_map()
                .ok_or_else(|| type_error(path, "map of strings", value))?;
            let mut coerced = std::collections::BTreeMap::new();
            for (key, entry) in entries {
                let entry = scalar_string(entry, &join(path, key))?;
                coerced.insert(key.clone(), Value::String(entry));
            }
            Value::Map(coerced)
        }
        AttrKind::BlockList(inner) => Value::List(blocks(inner, value, path)?),
        AttrKind::BlockSet(inner) => Value::set(blocks(inner, value, path)?),
    };

    if let (Some(max), Some(items)) = (attr.max_items, coerced.as_items())
        && items.len() > max
    {
        return Err(SchemaError::TooMany {
            attribute: path.to_string(),
            max,
            found: items.len(),
        });
    }

    Ok(coerced)
}

/// Strings accept ints and bools, written out as text
fn scalar_string(value: &Value, path: &str) -> Result<String, SchemaError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(type_error(path, "string", other)),
    }
}

fn string_items(value: &Value, path: &str) -> Result<Vec<Value>, SchemaError> {
    let items = value
        .as_items()
        .ok_or_else(|| type_error(path, "list of strings", value))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| scalar_string(item, &format!("{path}[{i}]")).map(Value::String))
        .collect()
}

/// A single table is accepted where a list of blocks is expected
///
/// Zero values are dropped from each block so that a block read back
/// from the remote side compares equal to the declared one.
fn blocks(inner: &[Attribute], value: &Value, path: &str) -> Result<Vec<Value>, SchemaError> {
    let items: Vec<&Value> = match value {
        Value::Map(_) => vec![value],
        Value::List(items) | Value::Set(items) => items.iter().collect(),
        other => return Err(type_error(path, "list of blocks", other)),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let item_path = format!("{path}[{i}]");
            let entries = item
                .as_map()
                .ok_or_else(|| type_error(&item_path, "block", item))?;
            let validated = validate_block(inner, entries, &item_path, &BTreeSet::new())?;
            Ok(Value::Map(
                validated.into_iter().filter(|(_, v)| !v.is_zero()).collect(),
            ))
        })
        .collect()
}
