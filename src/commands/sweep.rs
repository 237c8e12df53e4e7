//! Bulk bucket cleanup
//!
//! Deletes buckets by name prefix or suffix, typically the leftovers of
//! acceptance test runs. The team's default bucket is never touched.

use anyhow::{Result, bail};
use colored::Colorize;
use dialoguer::Confirm;
use runscope::{Bucket, Client, SweepReport};

use crate::Context;
use crate::cli::SweepArgs;
use crate::ui;

/// Name pattern a bucket must match to be swept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pattern {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

impl Pattern {
    pub fn matches(&self, bucket: &Bucket) -> bool {
        if bucket.default {
            return false;
        }
        let prefix_ok = self
            .prefix
            .as_deref()
            .is_none_or(|p| bucket.name.starts_with(p));
        let suffix_ok = self
            .suffix
            .as_deref()
            .is_none_or(|s| bucket.name.ends_with(s));
        (self.prefix.is_some() || self.suffix.is_some()) && prefix_ok && suffix_ok
    }
}

pub fn run(ctx: &Context, args: &SweepArgs) -> Result<()> {
    let client = super::standalone_settings(ctx)?.client();
    let pattern = Pattern {
        prefix: args.prefix.clone(),
        suffix: args.suffix.clone(),
    };
    sweep(ctx, &client, &pattern, args.yes)
}

fn sweep(ctx: &Context, client: &Client, pattern: &Pattern, yes: bool) -> Result<()> {
    ui::header("Sweeping Buckets");

    let candidates: Vec<Bucket> = client
        .list_buckets()?
        .into_iter()
        .filter(|b| pattern.matches(b))
        .collect();
    if candidates.is_empty() {
        ui::info("No buckets matched");
        return Ok(());
    }

    for bucket in &candidates {
        println!("  {} {} {}", "-".red(), bucket.name, format!("({})", bucket.key).dimmed());
    }
    println!();

    if !yes
        && !Confirm::new()
            .with_prompt(format!("Delete {} buckets?", candidates.len()))
            .default(false)
            .interact()?
    {
        ui::warn("Cancelled");
        return Ok(());
    }

    let report = client.delete_buckets(|b| pattern.matches(b))?;
    print_report(ctx, &report);
    if !report.failed.is_empty() {
        bail!("{} buckets could not be deleted", report.failed.len());
    }
    Ok(())
}

fn print_report(ctx: &Context, report: &SweepReport) {
    if ctx.verbose > 0 {
        for key in &report.deleted {
            ui::dim(&format!("deleted {key}"));
        }
    }
    for (key, reason) in &report.failed {
        ui::error(&format!("{key}: {reason}"));
    }
    ui::success(&format!("Deleted {} buckets", report.deleted.len()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use runscope::MockBackend;

    fn bucket(key: &str, name: &str) -> Bucket {
        Bucket {
            key: key.to_string(),
            name: name.to_string(),
            ..Bucket::default()
        }
    }

    fn context() -> Context {
        Context {
            verbose: 0,
            quiet: true,
            file: "runscope.toml".into(),
            state: "runscope.state.toml".into(),
            overrides: ProviderConfig::default(),
        }
    }

    #[test]
    fn test_pattern_matches() {
        let by_prefix = Pattern {
            prefix: Some("tf-".to_string()),
            suffix: None,
        };
        assert!(by_prefix.matches(&bucket("a", "tf-payments")));
        assert!(!by_prefix.matches(&bucket("b", "payments")));

        let both = Pattern {
            prefix: Some("tf-".to_string()),
            suffix: Some("-ci".to_string()),
        };
        assert!(both.matches(&bucket("a", "tf-payments-ci")));
        assert!(!both.matches(&bucket("b", "tf-payments")));
    }

    #[test]
    fn test_empty_pattern_matches_nothing() {
        assert!(!Pattern::default().matches(&bucket("a", "anything")));
    }

    #[test]
    fn test_default_bucket_is_kept() {
        let mut default = bucket("a", "tf-default");
        default.default = true;
        let pattern = Pattern {
            prefix: Some("tf-".to_string()),
            suffix: None,
        };
        assert!(!pattern.matches(&default));
    }

    #[test]
    fn test_sweep_deletes_matching() {
        let mock = MockBackend::new();
        mock.add_bucket(bucket("a", "tf-one"));
        mock.add_bucket(bucket("b", "keep"));
        mock.add_bucket(bucket("c", "tf-two"));
        let client = Client::with_backend(Box::new(mock.clone()), "https://api.runscope.com", "t");
        let pattern = Pattern {
            prefix: Some("tf-".to_string()),
            suffix: None,
        };

        sweep(&context(), &client, &pattern, true).unwrap();

        assert_eq!(mock.bucket_keys(), vec!["b".to_string()]);
    }

    #[test]
    fn test_sweep_reports_failures() {
        let mock = MockBackend::new();
        mock.add_bucket(bucket("a", "tf-one"));
        mock.fail_next("delete_bucket", 500);
        let client = Client::with_backend(Box::new(mock), "https://api.runscope.com", "t");
        let pattern = Pattern {
            prefix: Some("tf-".to_string()),
            suffix: None,
        };

        assert!(sweep(&context(), &client, &pattern, true).is_err());
    }
}
