//! # Declarative
//!
//! A step runner for declarative host configuration.
//!
//! This crate provides the core abstractions for describing an ordered list
//! of idempotent actions, detecting which of them would change a host, and
//! converging the host while firing notifications between steps.
//!
//! ## Core Concepts
//!
//! - **Action**: One idempotent operation (install packages, set a service
//!   state, delete/link/render a file, reload a service, fail)
//! - **Step**: An action plus the handlers it notifies when it changes something
//! - **ExecutionPlan**: Ordered steps, a handler table, and exported attributes
//! - **Executor**: Applies steps in order, firing immediate handlers inline
//!   and deferred handlers once at the end
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Action, ExecutionPlan, ExecuteOptions, Step, Timing, execute_simple};
//! use declarative::memory::{MemoryHost, MemoryTemplates};
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add_handler("reload-nginx", Action::ReloadService { name: "nginx".into() });
//! plan.push(
//!     Step::new(Action::DeleteFile { path: "/etc/nginx/conf.d/default.conf".into() })
//!         .notifies("reload-nginx", Timing::Immediate),
//! );
//!
//! let mem = MemoryHost::new();
//! let summary = execute_simple(&plan, mem.host(&MemoryTemplates), &ExecuteOptions::default())?;
//! ```
//!
//! ## Backend Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`PackageManager`]: Installs packages
//! - [`ServiceManager`]: Enables, starts, stops, and reloads services
//! - [`FileSystem`]: Reads, writes, removes, and links files
//! - [`TemplateRenderer`]: Renders file content from variables
//! - [`ProgressCallback`]: Receives progress updates
//!
//! This allows the crate to be used without hard dependencies on a
//! particular distribution, init system, or template engine.

pub mod action;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod memory;
pub mod planner;
pub mod types;

// Re-export main types at crate root
pub use action::Action;
pub use context::{
    ApplyContext, FileSystem, Host, NoProgress, PackageManager, ProgressCallback, ServiceManager,
    TemplateRenderer, digest,
};
pub use diff::{ActionDiff, DiffSummary, compute_diffs};
pub use error::RunError;
pub use executor::{execute, execute_simple};
pub use planner::{ExecutionPlan, Notify, Step};
pub use types::{
    ApplyResult, ExecuteOptions, ExecuteSummary, ResourceState, ServiceState, Timing, Variables,
};
