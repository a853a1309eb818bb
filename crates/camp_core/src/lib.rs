//! # camp_core
//!
//! Core building blocks for CloudCamp apps.
//!
//! This crate provides the construct tree every resource is declared in, the
//! topology queries that decide which deployable unit ("stage") a construct
//! belongs to, and the naming helpers used to generate provider-safe
//! identifiers.
//!
//! # Architecture
//!
//! - **Construct tree**: arena of nodes with parent back-references
//! - **Topology**: `same_unit` compares the enclosing stage of two constructs
//! - **Naming**: identifier shortening, case conversion, export names
//! - **Config**: app-wide settings read from the project context
//!
//! # Example
//!
//! ```rust
//! use camp_core::{same_unit, ConstructTree};
//!
//! let mut tree = ConstructTree::new("my-app");
//! let pipeline = tree.add_stack(tree.root(), "MyAppPipeline")?;
//! let stage = tree.add_stage(tree.root(), "Production")?;
//! let stack = tree.add_stack(stage, "production")?;
//! let db = tree.add_construct(stack, "db")?;
//!
//! assert!(same_unit(&tree, db, stack)?);
//! assert!(!same_unit(&tree, db, pipeline)?);
//! # Ok::<(), camp_core::CoreError>(())
//! ```

pub mod config;
pub mod construct;
pub mod error;
pub mod naming;
pub mod topology;

pub use config::{AppConfig, RepositoryHost, RepositorySource};
pub use construct::{ConstructId, ConstructKind, ConstructTree};
pub use error::{CoreError, CoreResult};
pub use naming::{camel_case, sanitize_env_name, shorten, unique_export_name, upper_camel_case};
pub use topology::same_unit;
