//! Declarative commands
//!
//! - `plan` - Show what apply would change
//! - `apply` - Make the remote side match the declaration
//! - `refresh` - Record remote drift in the state file
//! - `destroy` - Delete everything the state file knows about
//! - `show` - Print the state file

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{AutoConfirm, ExecuteOptions, ExecuteSummary, ExecutionPlan, execute};
use runscope::Client;

use crate::Context;
use crate::cli::{ApplyArgs, DestroyArgs, PlanArgs, RefreshArgs};
use crate::engine::differ;
use crate::engine::{Engine, RefreshOutcome};
use crate::progress::{BarProgress, PromptConfirm};
use crate::provider::Provider;
use crate::schema::Declaration;
use crate::state::State;
use crate::ui;

/// Declaration plus the client its `[provider]` table resolves to
fn session(ctx: &Context, declaration: Declaration) -> Result<(Declaration, Client)> {
    let settings = declaration.provider.resolve(&ctx.overrides)?;
    Ok((declaration, settings.client()))
}

fn engine<'a>(
    ctx: &Context,
    provider: &'a Provider,
    client: &'a Client,
    declaration: &Declaration,
) -> Result<Engine<'a>> {
    let state = State::load(&ctx.state)?;
    Engine::new(provider, client, declaration, state, ctx.state.clone())
}

/// Apply a plan, asking first unless `yes`
fn run_plan(
    ctx: &Context,
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    engine: &mut Engine<'_>,
    yes: bool,
) -> Result<ExecuteSummary> {
    let mut progress = BarProgress::new(ctx.quiet);
    if yes {
        execute(plan, opts, engine, &mut progress, &mut AutoConfirm)
    } else {
        execute(plan, opts, engine, &mut progress, &mut PromptConfirm)
    }
}

/// Print the summary and turn failures into an error exit
fn finish(plan: &ExecutionPlan, summary: &ExecuteSummary) -> Result<()> {
    if summary.skipped == plan.total_changes() && summary.failed == 0 {
        ui::warn("Cancelled - no changes were made");
        return Ok(());
    }
    differ::display_summary(summary);
    if !summary.is_success() {
        bail!(
            "{} of {} changes failed",
            summary.failed,
            plan.total_changes()
        );
    }
    Ok(())
}

// ============================================================================
// Plan
// ============================================================================

pub fn plan(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let (declaration, client) = session(ctx, Declaration::load(&ctx.file)?)?;
    let plan = plan_with(ctx, &client, &declaration, args.target.as_deref())?;
    differ::display_plan(&plan);
    Ok(())
}

fn plan_with(
    ctx: &Context,
    client: &Client,
    declaration: &Declaration,
    target: Option<&str>,
) -> Result<ExecutionPlan> {
    let provider = Provider::new();
    let mut engine = engine(ctx, &provider, client, declaration)?;
    engine.read_data_sources()?;
    Ok(engine.plan()?.filter_by_target(target))
}

// ============================================================================
// Apply
// ============================================================================

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let (declaration, client) = session(ctx, Declaration::load(&ctx.file)?)?;
    apply_with(ctx, &client, &declaration, args)
}

fn apply_with(
    ctx: &Context,
    client: &Client,
    declaration: &Declaration,
    args: &ApplyArgs,
) -> Result<()> {
    ui::header("Applying Declaration");

    if args.dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let provider = Provider::new();
    let mut engine = engine(ctx, &provider, client, declaration)?;
    if !engine.state().is_empty() {
        report_refresh(&engine.refresh(args.jobs)?);
    }
    engine.read_data_sources()?;

    let plan = engine.plan()?.filter_by_target(args.target.as_deref());
    differ::display_plan(&plan);
    if plan.is_empty() || args.dry_run {
        return Ok(());
    }

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs: args.jobs,
        continue_on_error: args.continue_on_error,
    };
    let summary = run_plan(ctx, &plan, &opts, &mut engine, args.yes)?;
    finish(&plan, &summary)
}

// ============================================================================
// Refresh
// ============================================================================

pub fn refresh(ctx: &Context, args: &RefreshArgs) -> Result<()> {
    let (declaration, client) = session(ctx, super::declaration_or_default(ctx)?)?;
    let provider = Provider::new();
    let mut engine = engine(ctx, &provider, &client, &declaration)?;

    if engine.state().is_empty() {
        ui::info("State is empty - nothing to refresh");
        return Ok(());
    }

    let outcomes = engine.refresh(args.jobs)?;
    report_refresh(&outcomes);

    let failed = outcomes
        .iter()
        .filter(|(_, o)| matches!(o, RefreshOutcome::Failed(_)))
        .count();
    if failed > 0 {
        bail!("{failed} resources could not be refreshed");
    }
    ui::success(&format!("Refreshed {} resources", outcomes.len()));
    Ok(())
}

fn report_refresh(outcomes: &[(String, RefreshOutcome)]) {
    for (address, outcome) in outcomes {
        match outcome {
            RefreshOutcome::Unchanged => log::debug!("{address} is up to date"),
            RefreshOutcome::Updated => ui::info(&format!("{address} changed remotely")),
            RefreshOutcome::Gone => {
                ui::warn(&format!("{address} no longer exists - removed from state"));
            }
            RefreshOutcome::Failed(error) => ui::error(&format!("{address}: {error}")),
        }
    }
}

// ============================================================================
// Destroy
// ============================================================================

pub fn destroy(ctx: &Context, args: &DestroyArgs) -> Result<()> {
    let (declaration, client) = session(ctx, super::declaration_or_default(ctx)?)?;
    destroy_with(ctx, &client, &declaration, args)
}

fn destroy_with(
    ctx: &Context,
    client: &Client,
    declaration: &Declaration,
    args: &DestroyArgs,
) -> Result<()> {
    ui::header("Destroying Resources");

    let provider = Provider::new();
    let mut engine = engine(ctx, &provider, client, declaration)?;
    let plan = engine
        .destroy_plan()?
        .filter_by_target(args.target.as_deref());
    differ::display_plan(&plan);
    if plan.is_empty() {
        return Ok(());
    }

    let summary = run_plan(ctx, &plan, &ExecuteOptions::default(), &mut engine, args.yes)?;
    finish(&plan, &summary)
}

// ============================================================================
// Show
// ============================================================================

pub fn show(ctx: &Context) -> Result<()> {
    let state = State::load(&ctx.state)?;
    if state.is_empty() {
        ui::info("No resources in state");
        return Ok(());
    }

    ui::header(&format!(
        "State (serial {}, updated {})",
        state.serial,
        state.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    for (address, resource) in &state.resources {
        ui::section(address);
        ui::kv("id", &resource.id);
        for (name, value) in &resource.attributes {
            ui::kv(name, &value.to_string());
        }
        if !resource.dependencies.is_empty() && ctx.verbose > 0 {
            ui::dim(&format!("depends on {}", resource.dependencies.join(", ")));
        }
    }
    println!();
    println!(
        "{} resources",
        state.resources.len().to_string().bold()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use declarative::Action;
    use runscope::MockBackend;

    const DECLARATION: &str = r#"
[resource.runscope_bucket.main]
name = "payments"
team_uuid = "team-1"

[resource.runscope_test.smoke]
bucket_id = "${runscope_bucket.main.id}"
name = "smoke"
"#;

    fn context(dir: &tempfile::TempDir) -> Context {
        Context {
            verbose: 0,
            quiet: true,
            file: dir.path().join("runscope.toml"),
            state: dir.path().join("runscope.state.toml"),
            overrides: ProviderConfig::default(),
        }
    }

    fn apply_args() -> ApplyArgs {
        ApplyArgs {
            target: None,
            dry_run: false,
            yes: true,
            jobs: 2,
            continue_on_error: false,
        }
    }

    fn client(mock: &MockBackend) -> Client {
        Client::with_backend(Box::new(mock.clone()), "https://api.runscope.com", "t")
    }

    #[test]
    fn test_apply_then_plan_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        let mock = MockBackend::new();
        let client = client(&mock);
        let declaration = Declaration::parse(DECLARATION).unwrap();

        apply_with(&ctx, &client, &declaration, &apply_args()).unwrap();

        let state = State::load(&ctx.state).unwrap();
        assert_eq!(state.resources.len(), 2);
        assert!(plan_with(&ctx, &client, &declaration, None).unwrap().is_empty());
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        let mock = MockBackend::new();
        let declaration = Declaration::parse(DECLARATION).unwrap();
        let args = ApplyArgs {
            dry_run: true,
            ..apply_args()
        };

        apply_with(&ctx, &client(&mock), &declaration, &args).unwrap();

        assert_eq!(mock.calls("create_bucket"), 0);
        assert!(!ctx.state.exists());
    }

    #[test]
    fn test_plan_target_filters() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        let mock = MockBackend::new();
        let declaration = Declaration::parse(DECLARATION).unwrap();

        let plan = plan_with(&ctx, &client(&mock), &declaration, Some("runscope_bucket")).unwrap();
        assert_eq!(plan.total_changes(), 1);
        assert_eq!(plan.changes[0].action, Action::Create);
    }

    #[test]
    fn test_failed_apply_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        let mock = MockBackend::new();
        mock.fail_next("create_bucket", 500);
        let declaration = Declaration::parse(DECLARATION).unwrap();

        let err = apply_with(&ctx, &client(&mock), &declaration, &apply_args()).unwrap_err();
        assert!(err.to_string().contains("1 of 2 changes failed"));
    }

    #[test]
    fn test_destroy_empties_state() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        let mock = MockBackend::new();
        let client = client(&mock);
        let declaration = Declaration::parse(DECLARATION).unwrap();
        apply_with(&ctx, &client, &declaration, &apply_args()).unwrap();

        let args = DestroyArgs {
            target: None,
            yes: true,
        };
        destroy_with(&ctx, &client, &Declaration::default(), &args).unwrap();

        assert!(State::load(&ctx.state).unwrap().is_empty());
        assert!(mock.bucket_keys().is_empty());
    }
}
