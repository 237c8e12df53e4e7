//! # Declarative
//!
//! A framework for declarative management of remote resources.
//!
//! Resource types describe their attributes with a [`Schema`] and
//! implement [`Resource`] against some client. Declared attributes are
//! compared with stored ones to produce a [`ResourceDiff`] per resource,
//! the diffs are collected into an [`ExecutionPlan`], and [`execute`]
//! applies the plan through an [`Applier`].
//!
//! ## Core Concepts
//!
//! - **Value / Attributes**: what one resource's attributes hold
//! - **Schema**: which attributes a resource type accepts, and which force replacement
//! - **ResourceData**: id plus attributes handed to create/read/update/delete
//! - **ResourceDiff**: create, update, replace, or delete, with attribute-level changes
//! - **ExecutionPlan**: diffs in apply order, filterable by target
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecutionPlan, ExecuteOptions, ResourceDiff, execute_simple};
//!
//! let mut plan = ExecutionPlan::new();
//! plan.push(ResourceDiff::compute(
//!     "folder",
//!     "docs",
//!     FOLDER.schema(),
//!     stored.as_ref(),
//!     Some(&declared),
//! ));
//!
//! let summary = execute_simple(&plan, &ExecuteOptions::default(), &mut engine)?;
//! ```
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod data;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod schema;
pub mod types;
pub mod value;

// Re-export main types at crate root
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use data::{AttributeError, Block, ResourceData};
pub use diff::{Action, AttributeChange, DiffSummary, ResourceDiff, group_by_type};
pub use executor::{Applier, execute, execute_simple, refresh_all};
pub use planner::{ExecutionPlan, parse_target};
pub use resource::{BoxedDataSource, BoxedResource, DataSource, Resource};
pub use schema::{AttrKind, Attribute, DefaultValue, Presence, Schema, SchemaError};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary};
pub use value::{Attributes, Value};
