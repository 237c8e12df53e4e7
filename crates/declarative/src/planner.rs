//! Execution planner - orders and filters planned changes

use crate::diff::{DiffSummary, ResourceDiff};

/// Planned changes in the order they will be applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub changes: Vec<ResourceDiff>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diff; no-op diffs are dropped
    pub fn push(&mut self, diff: ResourceDiff) {
        if diff.action.is_change() {
            self.changes.push(diff);
        }
    }

    /// Filter plan to only include changes matching a predicate
    #[must_use]
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&ResourceDiff) -> bool,
    {
        Self {
            changes: self.changes.into_iter().filter(|c| predicate(c)).collect(),
        }
    }

    /// Filter plan to only include changes matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    #[must_use]
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|c| matches_filter(c, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    /// Total number of changes in the plan
    pub fn total_changes(&self) -> usize {
        self.changes.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_diffs(&self.changes)
    }
}

/// Parse a target string like "type.name" into (type, name)
pub fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.len() {
        1 => (Some(parts[0].to_string()), None),
        2 => (Some(parts[0].to_string()), Some(parts[1].to_string())),
        _ => (None, Some(target.to_string())),
    }
}

/// Check if a change matches the filter criteria
fn matches_filter(diff: &ResourceDiff, resource_type: Option<&str>, name: Option<&str>) -> bool {
    if let Some(rt) = resource_type
        && diff.resource_type != rt
    {
        return false;
    }

    match name {
        Some(n) if resource_type.is_some() => diff.name == n,
        Some(n) => diff.address == n,
        None => true,
    }
}
