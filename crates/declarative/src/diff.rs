//! Diff computation between stored and declared attributes

use crate::schema::Schema;
use crate::value::{Attributes, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What has to happen to one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    NoOp,
    Create,
    Update,
    /// Delete, then create again
    Replace,
    Delete,
}

impl Action {
    /// Plan symbol, as in "+ runscope_bucket.main"
    pub fn symbol(self) -> &'static str {
        match self {
            Self::NoOp => " ",
            Self::Create => "+",
            Self::Update => "~",
            Self::Replace => "-/+",
            Self::Delete => "-",
        }
    }

    pub fn is_change(self) -> bool {
        self != Self::NoOp
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoOp => "no-op",
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
        })
    }
}

/// One attribute that differs between stored and declared state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub name: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
    pub forces_replacement: bool,
}

/// The planned change to one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// "type.name"
    pub address: String,
    pub resource_type: String,
    pub name: String,
    pub action: Action,
    pub changes: Vec<AttributeChange>,
}

impl ResourceDiff {
    /// Compare stored and declared attributes of one resource
    ///
    /// `None` on either side means the resource is absent there.
    /// Computed attributes never produce a change.
    pub fn compute(
        resource_type: &str,
        name: &str,
        schema: &Schema,
        stored: Option<&Attributes>,
        declared: Option<&Attributes>,
    ) -> Self {
        let empty = Attributes::new();
        let changes: Vec<AttributeChange> = schema
            .attributes()
            .iter()
            .filter(|attr| !attr.is_computed())
            .filter_map(|attr| {
                let old = stored.unwrap_or(&empty).get(attr.name);
                let new = declared.unwrap_or(&empty).get(attr.name);
                (!Value::same(old, new)).then(|| AttributeChange {
                    name: attr.name.to_string(),
                    old: old.cloned(),
                    new: new.cloned(),
                    forces_replacement: attr.force_new,
                })
            })
            .collect();

        let action = match (stored, declared) {
            (None, None) => Action::NoOp,
            (None, Some(_)) => Action::Create,
            (Some(_), None) => Action::Delete,
            (Some(_), Some(_)) if changes.is_empty() => Action::NoOp,
            (Some(_), Some(_)) if changes.iter().any(|c| c.forces_replacement) => {
                Action::Replace
            }
            (Some(_), Some(_)) => Action::Update,
        };

        Self {
            address: format!("{resource_type}.{name}"),
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            action,
            changes,
        }
    }

    /// Names of the changed attributes
    pub fn changed_attributes(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub additions: usize,
    pub updates: usize,
    pub replacements: usize,
    pub removals: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                Action::Create => summary.additions += 1,
                Action::Update => summary.updates += 1,
                Action::Replace => summary.replacements += 1,
                Action::Delete => summary.removals += 1,
                Action::NoOp => {}
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.updates + self.replacements + self.removals
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to add, {} to change, {} to replace, {} to destroy",
            self.additions, self.updates, self.replacements, self.removals
        )
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<&str, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<&str, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.as_str())
            .or_default()
            .push(diff);
    }
    groups
}
