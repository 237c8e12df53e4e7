//! References between declared instances and the order they imply
//!
//! A string attribute may contain `${type.name.attr}` (another resource)
//! or `${data.type.name.attr}` (a data source). When the whole string is a
//! single reference the referenced value replaces it as-is, otherwise each
//! reference is substituted as text.
//!
//! Ordering uses Kahn's algorithm. Among instances that are ready at the
//! same time the smallest address goes first, so plans are stable.

use declarative::{Attributes, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error(
        "invalid reference \"${{{0}}}\": expected type.name.attribute or data.type.name.attribute"
    )]
    InvalidReference(String),

    #[error("unterminated reference in \"{0}\"")]
    Unterminated(String),

    #[error("{from} references {to}, which is not declared")]
    Undeclared { from: String, to: String },

    #[error("dependency cycle between {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("{reference} is a {found}, which cannot be embedded in a string")]
    NotScalar {
        reference: Reference,
        found: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, GraphError>;

/// `${type.name.attribute}` or `${data.type.name.attribute}`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reference {
    pub data: bool,
    pub resource_type: String,
    pub name: String,
    pub attribute: String,
}

impl Reference {
    pub fn parse(expr: &str) -> Result<Self> {
        let parts: Vec<&str> = expr.trim().split('.').collect();
        let (data, rest) = match parts.as_slice() {
            ["data", rest @ ..] => (true, rest),
            rest => (false, rest),
        };
        match rest {
            [resource_type, name, attribute]
                if [resource_type, name, attribute].iter().all(|p| !p.is_empty()) =>
            {
                Ok(Self {
                    data,
                    resource_type: (*resource_type).to_string(),
                    name: (*name).to_string(),
                    attribute: (*attribute).to_string(),
                })
            }
            _ => Err(GraphError::InvalidReference(expr.to_string())),
        }
    }

    /// Address of the referenced instance
    pub fn address(&self) -> String {
        if self.data {
            crate::schema::data_address(&self.resource_type, &self.name)
        } else {
            crate::schema::resource_address(&self.resource_type, &self.name)
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}.{}}}", self.address(), self.attribute)
    }
}

// ============================================================================
// Scanning
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Ref(Reference),
}

fn scan(s: &str) -> Result<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        if start > 0 {
            segments.push(Segment::Text(&rest[..start]));
        }
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| GraphError::Unterminated(s.to_string()))?;
        segments.push(Segment::Ref(Reference::parse(&after[..end])?));
        rest = &after[end + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    Ok(segments)
}

/// Every reference inside a value, nested blocks included
pub fn references(value: &Value) -> Result<BTreeSet<Reference>> {
    let mut found = BTreeSet::new();
    collect(value, &mut found)?;
    Ok(found)
}

fn collect(value: &Value, found: &mut BTreeSet<Reference>) -> Result<()> {
    match value {
        Value::String(s) => {
            for segment in scan(s)? {
                if let Segment::Ref(reference) = segment {
                    found.insert(reference);
                }
            }
        }
        Value::List(items) | Value::Set(items) => {
            for item in items {
                collect(item, found)?;
            }
        }
        Value::Map(entries) => {
            for entry in entries.values() {
                collect(entry, found)?;
            }
        }
        Value::Bool(_) | Value::Int(_) => {}
    }
    Ok(())
}

/// Addresses an instance depends on
pub fn dependencies(attributes: &Attributes) -> Result<BTreeSet<String>> {
    let mut found = BTreeSet::new();
    for value in attributes.values() {
        collect(value, &mut found)?;
    }
    Ok(found.iter().map(Reference::address).collect())
}

// ============================================================================
// Resolution
// ============================================================================

/// Replace references using `lookup`
///
/// Returns `Ok(None)` when some reference cannot be resolved yet.
pub fn resolve<F>(value: &Value, lookup: &F) -> Result<Option<Value>>
where
    F: Fn(&Reference) -> Option<Value>,
{
    let resolved = match value {
        Value::String(s) => return resolve_string(s, lookup),
        Value::List(items) => resolve_items(items, lookup)?.map(Value::List),
        Value::Set(items) => resolve_items(items, lookup)?.map(Value::set),
        Value::Map(entries) => {
            let mut out = BTreeMap::new();
            for (key, entry) in entries {
                let Some(entry) = resolve(entry, lookup)? else {
                    return Ok(None);
                };
                out.insert(key.clone(), entry);
            }
            Some(Value::Map(out))
        }
        Value::Bool(_) | Value::Int(_) => Some(value.clone()),
    };
    Ok(resolved)
}

fn resolve_items<F>(items: &[Value], lookup: &F) -> Result<Option<Vec<Value>>>
where
    F: Fn(&Reference) -> Option<Value>,
{
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Some(item) = resolve(item, lookup)? else {
            return Ok(None);
        };
        out.push(item);
    }
    Ok(Some(out))
}

fn resolve_string<F>(s: &str, lookup: &F) -> Result<Option<Value>>
where
    F: Fn(&Reference) -> Option<Value>,
{
    let segments = scan(s)?;
    if segments.len() == 1
        && let Segment::Ref(reference) = &segments[0]
    {
        return Ok(lookup(reference));
    }

    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Ref(reference) => {
                let Some(value) = lookup(&reference) else {
                    return Ok(None);
                };
                match value {
                    Value::String(v) => out.push_str(&v),
                    Value::Int(i) => out.push_str(&i.to_string()),
                    Value::Bool(b) => out.push_str(&b.to_string()),
                    other => {
                        return Err(GraphError::NotScalar {
                            reference,
                            found: other.kind_name(),
                        });
                    }
                }
            }
        }
    }
    Ok(Some(Value::String(out)))
}

/// Resolve every attribute, returning the names that are still unknown
pub fn resolve_attributes<F>(
    attributes: &Attributes,
    lookup: &F,
) -> Result<(Attributes, BTreeSet<String>)>
where
    F: Fn(&Reference) -> Option<Value>,
{
    let mut resolved = Attributes::new();
    let mut unknown = BTreeSet::new();
    for (name, value) in attributes {
        match resolve(value, lookup)? {
            Some(value) => {
                resolved.insert(name.clone(), value);
            }
            None => {
                unknown.insert(name.clone());
            }
        }
    }
    Ok((resolved, unknown))
}

// ============================================================================
// Ordering
// ============================================================================

/// Order addresses so every instance comes after what it depends on
///
/// `nodes` maps each address to the addresses it depends on. A dependency
/// that is not itself a node is an error.
pub fn order(nodes: &BTreeMap<String, BTreeSet<String>>) -> Result<Vec<String>> {
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (node, deps) in nodes {
        in_degree.entry(node).or_insert(0);
        for dep in deps {
            if !nodes.contains_key(dep) {
                return Err(GraphError::Undeclared {
                    from: node.clone(),
                    to: dep.clone(),
                });
            }
            *in_degree.entry(node).or_insert(0) += 1;
            dependents.entry(dep).or_default().push(node);
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(node, _)| *node)
        .collect();
    let mut sorted = Vec::with_capacity(nodes.len());

    while let Some(node) = ready.pop_first() {
        sorted.push(node.to_string());
        for dependent in dependents.get(node).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if sorted.len() < nodes.len() {
        let cycle = in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(node, _)| node.to_string())
            .collect();
        return Err(GraphError::Cycle(cycle));
    }

    Ok(sorted)
}
