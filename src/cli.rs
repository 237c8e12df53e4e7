use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::{ACCESS_TOKEN_ENV, API_URL_ENV};

#[derive(Parser)]
#[command(name = "runscope-provider")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declare Runscope buckets, tests and schedules in TOML and keep them in sync", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Declaration file
    #[arg(short, long, global = true, default_value = crate::schema::DEFAULT_FILE)]
    pub file: PathBuf,

    /// State file
    #[arg(long, global = true, default_value = crate::state::DEFAULT_FILE)]
    pub state: PathBuf,

    /// Runscope API access token
    #[arg(long, global = true, env = ACCESS_TOKEN_ENV, hide_env_values = true)]
    pub access_token: Option<String>,

    /// Runscope API base URL
    #[arg(long, global = true, env = API_URL_ENV)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Create, update and delete resources to match the declaration
    Apply(ApplyArgs),

    /// Re-read stored resources and record drift in the state file
    Refresh(RefreshArgs),

    /// Delete every resource recorded in the state file
    Destroy(DestroyArgs),

    /// Print the state file
    Show,

    /// Run a data source lookup without a declaration
    #[command(subcommand)]
    Lookup(LookupCommand),

    /// Delete buckets by name, e.g. leftovers of test runs
    Sweep(SweepArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Plan / Apply
// ============================================================================

#[derive(Args)]
pub struct PlanArgs {
    /// Only show changes for this type or type.name
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only apply changes for this type or type.name
    #[arg(short, long)]
    pub target: Option<String>,

    /// Show the plan without applying it
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Parallel reads while refreshing state
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    /// Keep applying after a change fails
    #[arg(long)]
    pub continue_on_error: bool,
}

#[derive(Args)]
pub struct RefreshArgs {
    /// Parallel reads
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct DestroyArgs {
    /// Only destroy this type or type.name
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

// ============================================================================
// Lookup
// ============================================================================

#[derive(Subcommand)]
pub enum LookupCommand {
    /// Look up one bucket by key
    Bucket {
        /// Bucket key
        key: String,
    },

    /// List bucket keys
    Buckets {
        /// Filter as attribute=value1,value2 (repeatable)
        #[arg(long = "filter", value_name = "NAME=VALUES")]
        filters: Vec<String>,
    },

    /// Find the first integration of a type
    Integration {
        /// Team UUID
        #[arg(long)]
        team: String,

        /// Integration type, e.g. slack
        #[arg(long = "type")]
        integration_type: String,

        /// Filter as attribute=value1,value2 (repeatable)
        #[arg(long = "filter", value_name = "NAME=VALUES")]
        filters: Vec<String>,
    },

    /// List integration ids of a team
    Integrations {
        /// Team UUID
        #[arg(long)]
        team: String,

        /// Filter as attribute=value1,value2 (repeatable)
        #[arg(long = "filter", value_name = "NAME=VALUES")]
        filters: Vec<String>,
    },
}

// ============================================================================
// Sweep
// ============================================================================

#[derive(Args)]
pub struct SweepArgs {
    /// Delete buckets whose name starts with this
    #[arg(long, required_unless_present = "suffix")]
    pub prefix: Option<String>,

    /// Delete buckets whose name ends with this
    #[arg(long)]
    pub suffix: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}
