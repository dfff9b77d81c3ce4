//! Workflow file loading, validation, and conversion into runnable groups.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Validation in [`validator`]
//! - `${var}` interpolation in [`interpolation`]
//! - Group construction in [`builder`]
//!
//! # Example
//!
//! ```
//! use stepwise::config::{build, load, validate};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! fs::write(
//!     temp.path().join("stepwise.yml"),
//!     "groups:\n  - name: setup\n    steps:\n      - { key: hello, run: echo hi }\n",
//! )
//! .unwrap();
//!
//! let (_, config) = load(temp.path(), None).unwrap();
//! validate(&config).unwrap();
//! let workflow = build(&config, "demo").unwrap();
//! assert_eq!(workflow.groups[0].name(), "setup");
//! ```

pub mod builder;
pub mod interpolation;
pub mod loader;
pub mod schema;
pub mod validator;

pub use builder::{build, retry_budget, Workflow};
pub use loader::{discover, find_project_root, load, load_file, parse, CANDIDATES};
pub use schema::{
    json_schema, EntryConfig, GroupConfig, NestedGroup, PromptConfig, Settings, StepConfig,
    WorkflowConfig,
};
pub use validator::{validate, validate_config, Severity, ValidationIssue};
