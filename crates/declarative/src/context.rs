//! Progress and confirmation callbacks
//!
//! These traits keep the executor free of any particular terminal UI.

use crate::diff::Action;
use crate::types::ApplyResult;
use anyhow::Result;

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback: Send {
    /// Called once before the first change is applied
    fn on_plan_start(&mut self, count: usize);

    /// Called when starting to apply a single change
    fn on_change_start(&mut self, address: &str, action: Action);

    /// Called when a change completes
    fn on_change_complete(&mut self, address: &str, result: &ApplyResult);

    /// Called once after the last change
    fn on_plan_complete(&mut self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// Returns `true` if the user confirmed.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_plan_start(&mut self, _count: usize) {}
    fn on_change_start(&mut self, _address: &str, _action: Action) {}
    fn on_change_complete(&mut self, _address: &str, _result: &ApplyResult) {}
    fn on_plan_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}
