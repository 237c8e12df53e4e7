//! Terminal progress and confirmation for applying plans

use anyhow::Result;
use colored::Colorize;
use declarative::{Action, ApplyResult, ConfirmCallback, ProgressCallback};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over the changes of a plan
///
/// Each finished change is printed above the bar, so the log of what
/// happened survives once the bar is cleared.
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl BarProgress {
    pub fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }

    fn println(&self, line: String) {
        if self.quiet {
            return;
        }
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{line}"),
        }
    }
}

/// Line printed once a change completes
pub fn outcome_line(address: &str, result: &ApplyResult) -> String {
    match result {
        ApplyResult::Failed { error } => format!("  {} {address} ({error})", "✗".red()),
        ApplyResult::Skipped { reason } => {
            format!("  {} {address} {}", "⊘".yellow(), format!("({reason})").dimmed())
        }
        ApplyResult::NoChange => format!("  {} {address}", "·".dimmed()),
        ApplyResult::Created => format!("  {} {address} created", "✓".green()),
        ApplyResult::Updated => format!("  {} {address} updated", "✓".green()),
        ApplyResult::Replaced => format!("  {} {address} replaced", "✓".green()),
        ApplyResult::Deleted => format!("  {} {address} destroyed", "✓".green()),
    }
}

impl ProgressCallback for BarProgress {
    fn on_plan_start(&mut self, count: usize) {
        if self.quiet {
            return;
        }
        let bar = ProgressBar::new(count as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        self.bar = Some(bar);
    }

    fn on_change_start(&mut self, address: &str, action: Action) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("{action} {address}"));
        }
    }

    fn on_change_complete(&mut self, address: &str, result: &ApplyResult) {
        self.println(outcome_line(address, result));
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_plan_complete(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Asks on the terminal before anything is changed
pub struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Ok(Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?)
    }
}
