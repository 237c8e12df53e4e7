//! Core types for declarative resource management

use serde::{Deserialize, Serialize};

/// Result of applying one planned change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was updated in place
    Updated,
    /// Resource was destroyed and created again
    Replaced,
    /// Resource was destroyed
    Deleted,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Updated | Self::Replaced | Self::Deleted
        )
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.replaced + self.deleted
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of changes processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Updated => self.updated += 1,
            ApplyResult::Replaced => self.replaced += 1,
            ApplyResult::Deleted => self.deleted += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs for refresh
    pub jobs: usize,
    /// Keep applying independent changes after a failure
    pub continue_on_error: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            continue_on_error: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = ExecuteSummary::default();
        summary.add_result(&ApplyResult::Created);
        summary.add_result(&ApplyResult::Replaced);
        summary.add_result(&ApplyResult::NoChange);
        summary.add_result(&ApplyResult::Failed {
            error: "boom".to_string(),
        });

        assert_eq!(summary.total_changes(), 2);
        assert_eq!(summary.total(), 4);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_result_predicates() {
        assert!(ApplyResult::Deleted.is_change());
        assert!(!ApplyResult::NoChange.is_change());
        assert!(
            !ApplyResult::Skipped {
                reason: "dry run".into()
            }
            .is_change()
        );
        assert!(
            !ApplyResult::Failed {
                error: "x".into()
            }
            .is_success()
        );
    }
}
