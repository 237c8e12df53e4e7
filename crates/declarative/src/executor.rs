//! Execution engine - applies planned changes in order, refreshes in parallel

use crate::context::{ConfirmCallback, ProgressCallback};
use crate::diff::ResourceDiff;
use crate::planner::ExecutionPlan;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::Result;
use rayon::prelude::*;

/// Applies one planned change
///
/// Implemented by whatever owns the client and the state, so each
/// successful change can be recorded before the next one starts.
pub trait Applier {
    fn apply_change(&mut self, change: &ResourceDiff) -> Result<ApplyResult>;
}

/// Execute a plan with the given options and callbacks
///
/// Changes are applied one at a time in plan order, which is dependency
/// order. After a failure the remaining changes are skipped unless
/// `opts.continue_on_error` is set.
pub fn execute<A, P, C>(
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    applier: &mut A,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    A: Applier,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let total_changes = plan.total_changes();
    if total_changes == 0 || opts.dry_run {
        return Ok(ExecuteSummary::default());
    }

    if !confirm.confirm("Apply changes?")? {
        return Ok(ExecuteSummary {
            skipped: total_changes,
            ..Default::default()
        });
    }

    let mut summary = ExecuteSummary::default();
    let mut halted_by: Option<&str> = None;

    progress.on_plan_start(total_changes);
    for change in &plan.changes {
        let result = match halted_by {
            Some(failed) => ApplyResult::Skipped {
                reason: format!("{failed} failed"),
            },
            None => {
                progress.on_change_start(&change.address, change.action);
                match applier.apply_change(change) {
                    Ok(result) => result,
                    Err(e) => ApplyResult::Failed {
                        error: format!("{e:#}"),
                    },
                }
            }
        };

        if !result.is_success() && !opts.continue_on_error {
            halted_by = Some(&change.address);
        }

        progress.on_change_complete(&change.address, &result);
        summary.add_result(&result);
    }
    progress.on_plan_complete();

    Ok(summary)
}

/// Simple execution without callbacks
pub fn execute_simple<A: Applier>(
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    applier: &mut A,
) -> Result<ExecuteSummary> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, applier, &mut NoProgress, &mut AutoConfirm)
}

/// Run `f` over `items` on a pool of `jobs` threads, keeping input order
///
/// Used to refresh many stored resources at once; each call is independent.
pub fn refresh_all<T, R, F>(items: &[T], jobs: usize, f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    if jobs <= 1 || items.len() <= 1 {
        return Ok(items.iter().map(f).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

    Ok(pool.install(|| items.par_iter().map(&f).collect()))
}
