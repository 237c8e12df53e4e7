//! Plan and result display

use colored::{ColoredString, Colorize};
use declarative::{Action, AttributeChange, ExecuteSummary, ExecutionPlan, Value, group_by_type};

use super::UNKNOWN;

/// Friendly heading for a resource type
fn type_heading(resource_type: &str) -> &str {
    match resource_type {
        "runscope_bucket" => "Buckets",
        "runscope_test" => "Tests",
        "runscope_environment" => "Environments",
        "runscope_schedule" => "Schedules",
        "runscope_step" => "Steps",
        "runscope_step_token" => "Step tokens",
        _ => resource_type,
    }
}

fn symbol(action: Action) -> ColoredString {
    match action {
        Action::Create => action.symbol().green(),
        Action::Update => action.symbol().yellow(),
        Action::Replace => action.symbol().magenta(),
        Action::Delete => action.symbol().red(),
        Action::NoOp => action.symbol().dimmed(),
    }
}

/// Render a value; the unknown placeholder is shown bare
fn render(value: Option<&Value>) -> String {
    match value {
        None => "(none)".to_string(),
        Some(Value::String(s)) if s == UNKNOWN => UNKNOWN.to_string(),
        Some(v) => v.to_string(),
    }
}

/// One attribute line, e.g. `name: "old" → "new" (forces replacement)`
pub fn change_line(change: &AttributeChange) -> String {
    let mut line = match (&change.old, &change.new) {
        (None, new) => format!("{}: {}", change.name, render(new.as_ref())),
        (old, None) => format!("{}: {} → (none)", change.name, render(old.as_ref())),
        (old, new) => format!(
            "{}: {} → {}",
            change.name,
            render(old.as_ref()),
            render(new.as_ref())
        ),
    };
    if change.forces_replacement {
        line.push_str(" (forces replacement)");
    }
    line
}

/// Display a plan grouped by resource type
pub fn display_plan(plan: &ExecutionPlan) {
    if plan.is_empty() {
        println!();
        println!("  {} No changes. Infrastructure is up to date.", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Execution Plan".bold()
    );
    println!("│");

    for (resource_type, diffs) in group_by_type(&plan.changes) {
        println!("│ {}", type_heading(resource_type).bold());
        for diff in diffs {
            println!(
                "│   {} {:<40} {}",
                symbol(diff.action),
                diff.address,
                format!("({})", diff.action).dimmed()
            );
            // Deletes would list every stored attribute; the address is enough
            if diff.action == Action::Delete {
                continue;
            }
            for change in &diff.changes {
                println!("│       {}", change_line(change).dimmed());
            }
        }
        println!("│");
    }

    println!("├─────────────────────────────────────────────────────┤");
    println!("│ Plan: {}", plan.summary().to_string().bold());
    println!("└─────────────────────────────────────────────────────┘");
}

/// Print the outcome of an apply or destroy
pub fn display_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Apply complete!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    let lines = [
        (summary.created, "created"),
        (summary.updated, "updated"),
        (summary.replaced, "replaced"),
        (summary.deleted, "destroyed"),
        (summary.skipped, "skipped"),
    ];
    for (count, what) in lines {
        if count > 0 {
            println!("    • {count} resources {what}");
        }
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
