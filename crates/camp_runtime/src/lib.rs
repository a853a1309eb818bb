//! # camp_runtime
//!
//! Resolvable values and the resources that produce and consume them.
//!
//! A value created in one deployable unit, such as a database password, is
//! often needed by code running in another one: a container, or a build step
//! in the pipeline. This crate decides in which form each consumer receives it.
//!
//! ## Features
//!
//! - [`Variable`]: output-backed, secret-backed and composite values
//! - Structured resolution into deferred [`Token`]s
//! - Action resolution into [`ResolvedVariable`] records and shell setup
//!   commands for Linux and Windows build images
//! - [`BuildEnvironment`] assembly for stage pre/post steps
//! - [`App`], [`Database`] and [`WebService`] at the provider boundary
//!
//! ## Example
//!
//! ```rust
//! use camp_core::AppConfig;
//! use camp_runtime::{App, ClusterEndpoint, DatabaseProps, RunProps};
//!
//! let mut app = App::new(AppConfig::new("my-app"))?;
//! let db = app.add_database(
//!     "production",
//!     "db",
//!     DatabaseProps::default(),
//!     ClusterEndpoint {
//!         hostname: "db.internal".to_string(),
//!         password: "generated".to_string(),
//!     },
//! )?;
//!
//! let step = app.run_post(
//!     "production",
//!     "migrate",
//!     RunProps::new(["./migrate.sh"]).with_env("DATABASE_URL", db.vars().url.clone()),
//! )?;
//!
//! assert_eq!(step.install_commands().len(), 1);
//! # Ok::<(), camp_runtime::RuntimeError>(())
//! ```

pub mod app;
pub mod database;
pub mod environment;
pub mod error;
pub mod output;
pub mod resolved;
pub mod service;
pub mod shell;
pub mod stage;
pub mod token;
pub mod variable;

pub use app::App;
pub use database::{ClusterEndpoint, ClusterSettings, Database, DatabaseEngine, DatabaseProps, DatabaseVariables};
pub use environment::{
    validate_env_name, BuildEnvironment, BuildEnvironmentVariable, BuildVariableType, EnvValue,
};
pub use error::{RuntimeError, RuntimeResult};
pub use output::{OutputRef, StackOutput};
pub use resolved::{ResolvedValue, ResolvedVariable, VariableKind};
pub use service::{WebService, WebServiceDefinition, WebServiceProps};
pub use shell::{ShellPart, TargetOs};
pub use stage::{BuildImage, BuildStep, DockerAsset, RunProps, Stage, StepPhase};
pub use token::{Fragment, Token};
pub use variable::{
    DatabaseUrlParts, DatabaseUrlVariable, OutputVariable, SecretVariable, Variable,
};
