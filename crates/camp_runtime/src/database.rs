//! Serverless database clusters and the variables they expose.

use std::str::FromStr;

use camp_core::naming::camel_case;
use camp_core::{ConstructId, ConstructTree};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::environment::EnvValue;
use crate::error::{RuntimeError, RuntimeResult};
use crate::output::StackOutput;
use crate::variable::{DatabaseUrlParts, DatabaseUrlVariable, OutputVariable, SecretVariable, Variable};

/// Capacity units a serverless cluster can scale between.
pub const SUPPORTED_CAPACITIES: [u16; 11] = [1, 2, 4, 8, 16, 32, 64, 128, 192, 256, 384];

pub const DEFAULT_USERNAME: &str = "administrator";
pub const DEFAULT_DATABASE_NAME: &str = "maindb";
pub const DEFAULT_CAPACITY: u16 = 2;

/// Database engine of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    #[default]
    Postgres,
    Mysql,
}

impl DatabaseEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseEngine::Postgres => "postgres",
            DatabaseEngine::Mysql => "mysql",
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            DatabaseEngine::Postgres => 5432,
            DatabaseEngine::Mysql => 3306,
        }
    }
}

impl FromStr for DatabaseEngine {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(DatabaseEngine::Postgres),
            "mysql" => Ok(DatabaseEngine::Mysql),
            other => Err(RuntimeError::UnsupportedEngine(other.to_string())),
        }
    }
}

impl std::fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn check_capacity(capacity: u16) -> RuntimeResult<u16> {
    if SUPPORTED_CAPACITIES.contains(&capacity) {
        Ok(capacity)
    } else {
        Err(RuntimeError::UnsupportedCapacity(capacity))
    }
}

/// Options for a [`Database`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseProps {
    pub engine: DatabaseEngine,
    /// Existing secret holding the password. Generated when absent.
    pub secret_name: Option<String>,
    pub database_name: Option<String>,
    pub username: Option<String>,
    /// Minutes of inactivity before the cluster pauses, 0 to never pause.
    pub auto_pause: u32,
    pub min_capacity: Option<u16>,
    pub max_capacity: Option<u16>,
}

impl DatabaseProps {
    pub fn with_engine(mut self, engine: DatabaseEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_secret_name(mut self, name: impl Into<String>) -> Self {
        self.secret_name = Some(name.into());
        self
    }

    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_capacity(mut self, min: u16, max: u16) -> Self {
        self.min_capacity = Some(min);
        self.max_capacity = Some(max);
        self
    }
}

/// Values the provider binding knows about a deployed cluster.
///
/// They are only ever handed to consumers deployed in the same stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterEndpoint {
    pub hostname: String,
    pub password: String,
}

/// Cluster settings handed to the provider binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSettings {
    pub engine: DatabaseEngine,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub secret_name: String,
    pub auto_pause_minutes: u32,
    pub min_capacity: u16,
    pub max_capacity: u16,
}

/// Everything a database exposes to its consumers.
#[derive(Debug, Clone)]
pub struct DatabaseVariables {
    pub url: Variable,
    pub host: Variable,
    pub password: Variable,
    pub username: String,
    pub database: String,
    pub port: u16,
    pub engine: DatabaseEngine,
}

impl DatabaseVariables {
    /// Look up an exposed attribute by name.
    pub fn attribute(&self, name: &str) -> Option<EnvValue> {
        let value = match name {
            "url" => EnvValue::Variable(self.url.clone()),
            "host" => EnvValue::Variable(self.host.clone()),
            "password" => EnvValue::Variable(self.password.clone()),
            "username" => EnvValue::Literal(self.username.clone()),
            "database" => EnvValue::Literal(self.database.clone()),
            "port" => EnvValue::Literal(self.port.to_string()),
            "engine" => EnvValue::Literal(self.engine.to_string()),
            _ => return None,
        };
        Some(value)
    }
}

/// A serverless database cluster declared inside a stack.
#[derive(Debug, Clone)]
pub struct Database {
    construct: ConstructId,
    settings: ClusterSettings,
    host_output: StackOutput,
    secret_name_output: StackOutput,
    vars: DatabaseVariables,
}

impl Database {
    pub fn new(
        tree: &mut ConstructTree,
        app_name: &str,
        scope: ConstructId,
        id: &str,
        props: DatabaseProps,
        endpoint: ClusterEndpoint,
    ) -> RuntimeResult<Self> {
        let min_capacity = check_capacity(props.min_capacity.unwrap_or(DEFAULT_CAPACITY))?;
        let max_capacity = check_capacity(props.max_capacity.unwrap_or(DEFAULT_CAPACITY))?;

        let stack_artifact_id = tree.artifact_id(scope)?;
        let construct = tree.add_construct(scope, id)?;

        let secret_name = match props.secret_name {
            Some(name) => name,
            None => camel_case(&format!("{}-{}-{}-secret", app_name, stack_artifact_id, id)),
        };
        let engine = props.engine;
        let username = props.username.unwrap_or_else(|| DEFAULT_USERNAME.to_string());
        let database_name = props
            .database_name
            .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string());

        let host_output = StackOutput::declare(tree, construct, "host-output", endpoint.hostname)?;
        let secret_name_output =
            StackOutput::declare(tree, construct, "secret-name-output", secret_name.clone())?;

        let host = OutputVariable::new(&host_output);
        let password = SecretVariable::new(tree, construct, secret_name.clone(), endpoint.password)?;
        let url = DatabaseUrlVariable::new(
            tree,
            construct,
            DatabaseUrlParts {
                engine,
                username: username.clone(),
                host: host.clone(),
                password: password.clone(),
                port: engine.port(),
                database: database_name.clone(),
            },
        )?;

        info!("Declared {} database {}", engine, tree.path(construct)?);
        debug!("Database secret name: {}", secret_name);

        Ok(Self {
            construct,
            settings: ClusterSettings {
                engine,
                port: engine.port(),
                database_name: database_name.clone(),
                username: username.clone(),
                secret_name,
                auto_pause_minutes: props.auto_pause,
                min_capacity,
                max_capacity,
            },
            host_output,
            secret_name_output,
            vars: DatabaseVariables {
                url: url.into(),
                host: host.into(),
                password: password.into(),
                username,
                database: database_name,
                port: engine.port(),
                engine,
            },
        })
    }

    pub fn construct(&self) -> ConstructId {
        self.construct
    }

    pub fn settings(&self) -> &ClusterSettings {
        &self.settings
    }

    pub fn host_output(&self) -> &StackOutput {
        &self.host_output
    }

    pub fn secret_name_output(&self) -> &StackOutput {
        &self.secret_name_output
    }

    pub fn vars(&self) -> &DatabaseVariables {
        &self.vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> ClusterEndpoint {
        ClusterEndpoint {
            hostname: "db.internal".to_string(),
            password: "pw".to_string(),
        }
    }

    fn stack() -> (ConstructTree, ConstructId) {
        let mut tree = ConstructTree::new("my-app");
        let stage = tree.add_stage(tree.root(), "Production").unwrap();
        let stack = tree.add_stack(stage, "production").unwrap();
        (tree, stack)
    }

    #[test]
    fn test_engine_parse() {
        assert_eq!("postgres".parse::<DatabaseEngine>().unwrap(), DatabaseEngine::Postgres);
        assert_eq!("mysql".parse::<DatabaseEngine>().unwrap().port(), 3306);
        assert!(matches!(
            "oracle".parse::<DatabaseEngine>(),
            Err(RuntimeError::UnsupportedEngine(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let (mut tree, stack) = stack();
        let db = Database::new(&mut tree, "my-app", stack, "db", DatabaseProps::default(), endpoint()).unwrap();

        let settings = db.settings();
        assert_eq!(settings.engine, DatabaseEngine::Postgres);
        assert_eq!(settings.port, 5432);
        assert_eq!(settings.username, "administrator");
        assert_eq!(settings.database_name, "maindb");
        assert_eq!(settings.secret_name, "myAppProductionProductionDbSecret");
        assert_eq!((settings.min_capacity, settings.max_capacity), (2, 2));
        assert_eq!(db.secret_name_output().value(), "myAppProductionProductionDbSecret");
        assert_eq!(db.host_output().value(), "db.internal");
    }

    #[test]
    fn test_vars() {
        let (mut tree, stack) = stack();
        let props = DatabaseProps::default()
            .with_engine(DatabaseEngine::Mysql)
            .with_secret_name("shared")
            .with_username("root")
            .with_database_name("app");
        let db = Database::new(&mut tree, "my-app", stack, "db", props, endpoint()).unwrap();
        let web = tree.add_construct(stack, "web").unwrap();

        let url = db.vars().url.resolve(&tree, web).unwrap();
        assert_eq!(url.as_literal(), Some("mysql://root:pw@db.internal:3306/app"));
        assert_eq!(db.vars().port, 3306);
        assert_eq!(db.vars().attribute("port"), Some(EnvValue::from("3306")));
        assert!(matches!(db.vars().attribute("host"), Some(EnvValue::Variable(Variable::Output(_)))));
        assert!(db.vars().attribute("nope").is_none());
    }

    #[test]
    fn test_capacity() {
        let (mut tree, stack) = stack();
        let props = DatabaseProps::default().with_capacity(8, 384);
        let db = Database::new(&mut tree, "a", stack, "db", props, endpoint()).unwrap();
        assert_eq!(db.settings().min_capacity, 8);

        let props = DatabaseProps::default().with_capacity(2, 3);
        let err = Database::new(&mut tree, "a", stack, "db2", props, endpoint()).unwrap_err();
        assert!(matches!(err, RuntimeError::UnsupportedCapacity(3)));
    }

    #[test]
    fn test_duplicate_id() {
        let (mut tree, stack) = stack();
        Database::new(&mut tree, "a", stack, "db", DatabaseProps::default(), endpoint()).unwrap();
        let err = Database::new(&mut tree, "a", stack, "db", DatabaseProps::default(), endpoint()).unwrap_err();
        assert!(matches!(err, RuntimeError::Core(camp_core::CoreError::DuplicateConstruct { .. })));
    }

    #[test]
    fn test_outside_stack_registers_nothing() {
        let mut tree = ConstructTree::new("app");
        let stage = tree.add_stage(tree.root(), "Production").unwrap();

        let err = Database::new(&mut tree, "app", stage, "db", DatabaseProps::default(), endpoint()).unwrap_err();
        assert!(matches!(err, RuntimeError::Core(camp_core::CoreError::NotInStack { .. })));
        assert!(tree.child(stage, "db").is_none());

        let stack = tree.add_stack(stage, "production").unwrap();
        assert!(Database::new(&mut tree, "app", stack, "db", DatabaseProps::default(), endpoint()).is_ok());
    }
}
