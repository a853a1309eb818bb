//! Environments of shell-based build steps.
//!
//! [`BuildEnvironment::assemble`] resolves every entry of a step's
//! environment from the step's location and folds the resulting records into
//! plain variables, output-backed variables and setup commands.

use std::sync::OnceLock;

use camp_core::{ConstructId, ConstructTree};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::error::{RuntimeError, RuntimeResult};
use crate::output::OutputRef;
use crate::resolved::ResolvedValue;
use crate::shell::TargetOs;
use crate::variable::Variable;

const ENV_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

static ENV_NAME_REGEX: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn env_name_regex() -> RuntimeResult<&'static Regex> {
    ENV_NAME_REGEX
        .get_or_init(|| Regex::new(ENV_NAME_PATTERN))
        .as_ref()
        .map_err(|e| RuntimeError::InvalidPattern(format!("{}: {}", ENV_NAME_PATTERN, e)))
}

/// Check that `name` can be used as an environment variable name.
pub fn validate_env_name(name: &str) -> RuntimeResult<()> {
    if env_name_regex()?.is_match(name) {
        Ok(())
    } else {
        Err(RuntimeError::InvalidEnvironmentName(name.to_string()))
    }
}

/// A value in a step's environment map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    Literal(String),
    Variable(Variable),
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        EnvValue::Literal(value.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(value: String) -> Self {
        EnvValue::Literal(value)
    }
}

impl From<Variable> for EnvValue {
    fn from(value: Variable) -> Self {
        EnvValue::Variable(value)
    }
}

/// How the build service supplies a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildVariableType {
    Plaintext,
    SecretsManager,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEnvironmentVariable {
    #[serde(rename = "type")]
    pub variable_type: BuildVariableType,
    /// The literal value, or the secret name for `SecretsManager`.
    pub value: String,
}

impl BuildEnvironmentVariable {
    pub fn plaintext(value: impl Into<String>) -> Self {
        Self {
            variable_type: BuildVariableType::Plaintext,
            value: value.into(),
        }
    }

    pub fn secret(secret_name: impl Into<String>) -> Self {
        Self {
            variable_type: BuildVariableType::SecretsManager,
            value: secret_name.into(),
        }
    }
}

/// The assembled environment of one build step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildEnvironment {
    /// Plain and secret-backed variables.
    pub variables: IndexMap<String, BuildEnvironmentVariable>,
    /// Variables populated from stack outputs by the pipeline, serialized as
    /// `#{artifact.logicalId}` pipeline variables.
    #[serde(serialize_with = "serialize_pipeline_variables")]
    pub outputs: IndexMap<String, OutputRef>,
    /// Commands run before the step's own commands.
    pub setup_commands: Vec<String>,
}

fn serialize_pipeline_variables<S>(
    outputs: &IndexMap<String, OutputRef>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(
        outputs
            .iter()
            .map(|(name, reference)| (name, reference.pipeline_variable())),
    )
}

impl BuildEnvironment {
    /// Resolve `environment` for a step located at `consumer`.
    ///
    /// Entries are processed in insertion order and the first failing entry
    /// aborts the whole assembly.
    pub fn assemble(
        tree: &ConstructTree,
        consumer: ConstructId,
        environment: &IndexMap<String, EnvValue>,
        os: TargetOs,
    ) -> RuntimeResult<Self> {
        let mut assembled = Self::default();

        for (name, value) in environment {
            validate_env_name(name)?;

            let variable = match value {
                EnvValue::Literal(text) => {
                    assembled
                        .variables
                        .insert(name.clone(), BuildEnvironmentVariable::plaintext(text.clone()));
                    continue;
                }
                EnvValue::Variable(variable) => variable,
            };

            for record in variable.resolve_for_action(tree, consumer, name, os)? {
                let key = record.env_name(name).to_string();
                match record.value {
                    ResolvedValue::Plain(text) => {
                        assembled
                            .variables
                            .insert(key, BuildEnvironmentVariable::plaintext(text));
                    }
                    ResolvedValue::Secret(secret_name) => {
                        assembled
                            .variables
                            .insert(key, BuildEnvironmentVariable::secret(secret_name));
                    }
                    ResolvedValue::Output(reference) => {
                        assembled.outputs.insert(key, reference);
                    }
                }
                assembled.setup_commands.extend(record.setup_commands);
            }
        }

        debug!(
            "Assembled build environment: {} variables, {} outputs, {} setup commands",
            assembled.variables.len(),
            assembled.outputs.len(),
            assembled.setup_commands.len()
        );
        Ok(assembled)
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.outputs.is_empty() && self.setup_commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseEngine;
    use crate::output::StackOutput;
    use crate::variable::{DatabaseUrlParts, DatabaseUrlVariable, OutputVariable, SecretVariable};
    use pretty_assertions::assert_eq;

    fn setup() -> (ConstructTree, ConstructId, Variable, Variable) {
        let mut tree = ConstructTree::new("app");
        let pipeline = tree.add_stack(tree.root(), "AppPipeline").unwrap();
        let stage = tree.add_stage(tree.root(), "Staging").unwrap();
        let stack = tree.add_stack(stage, "staging").unwrap();
        let db = tree.add_construct(stack, "db").unwrap();

        let output = StackOutput::declare(&mut tree, db, "host-output", "db.internal").unwrap();
        let host = OutputVariable::new(&output);
        let password = SecretVariable::new(&tree, db, "appSecret", "pw").unwrap();
        let url = DatabaseUrlVariable::new(
            &tree,
            db,
            DatabaseUrlParts {
                engine: DatabaseEngine::Postgres,
                username: "administrator".to_string(),
                host: host.clone(),
                password: password.clone(),
                port: 5432,
                database: "maindb".to_string(),
            },
        )
        .unwrap();

        (tree, pipeline, url.into(), password.into())
    }

    #[test]
    fn test_env_name_pattern_compiles() {
        let re = env_name_regex().unwrap();
        assert!(re.is_match("PATH"));
        assert!(!re.is_match("PATH="));
    }

    #[test]
    fn test_validate_env_name() {
        assert!(validate_env_name("DATABASE_URL").is_ok());
        assert!(validate_env_name("_x1").is_ok());

        for bad in ["", "1ABC", "MY-VAR", "A B"] {
            let err = validate_env_name(bad).unwrap_err();
            assert!(matches!(err, RuntimeError::InvalidEnvironmentName(_)));
        }
    }

    #[test]
    fn test_assemble_literals_only() {
        let (tree, pipeline, _, _) = setup();
        let mut env = IndexMap::new();
        env.insert("B".to_string(), EnvValue::from("2"));
        env.insert("A".to_string(), EnvValue::from("1"));

        let assembled = BuildEnvironment::assemble(&tree, pipeline, &env, TargetOs::Linux).unwrap();

        let names: Vec<&str> = assembled.variables.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(assembled.variables["A"], BuildEnvironmentVariable::plaintext("1"));
        assert!(assembled.outputs.is_empty());
        assert!(assembled.setup_commands.is_empty());
    }

    #[test]
    fn test_assemble_cross_unit_variables() {
        let (tree, pipeline, url, password) = setup();
        let mut env = IndexMap::new();
        env.insert("STAGE".to_string(), EnvValue::from("staging"));
        env.insert("DATABASE_URL".to_string(), EnvValue::from(url));
        env.insert("DB_PASSWORD".to_string(), EnvValue::from(password));

        let assembled = BuildEnvironment::assemble(&tree, pipeline, &env, TargetOs::Linux).unwrap();

        assert_eq!(assembled.outputs.len(), 1);
        let host_temp = assembled.outputs.keys().next().unwrap();
        assert!(host_temp.starts_with("DATABASE_HOST_"));

        let secrets: Vec<(&String, &BuildEnvironmentVariable)> = assembled
            .variables
            .iter()
            .filter(|(_, v)| v.variable_type == BuildVariableType::SecretsManager)
            .collect();
        assert_eq!(secrets.len(), 2);
        assert!(secrets.iter().all(|(_, v)| v.value == "appSecret"));
        assert!(secrets[0].0.starts_with("DATABASE_SECRET_"));
        assert!(secrets[1].0.starts_with("SECRET_"));

        assert_eq!(assembled.setup_commands.len(), 2);
        assert!(assembled.setup_commands[0].starts_with("export DATABASE_URL=\"postgres://"));
        assert!(assembled.setup_commands[1].starts_with("export DB_PASSWORD=\"$SECRET_"));
    }

    #[test]
    fn test_assemble_same_unit_is_plain() {
        let (mut tree, _, url, _) = setup();
        let stage = tree.child(tree.root(), "Staging").unwrap();
        let stack = tree.child(stage, "staging").unwrap();
        let step = tree.add_construct(stack, "migrate").unwrap();

        let mut env = IndexMap::new();
        env.insert("DATABASE_URL".to_string(), EnvValue::from(url));

        let assembled = BuildEnvironment::assemble(&tree, step, &env, TargetOs::Windows).unwrap();
        assert_eq!(
            assembled.variables["DATABASE_URL"],
            BuildEnvironmentVariable::plaintext("postgres://administrator:pw@db.internal:5432/maindb")
        );
        assert!(assembled.setup_commands.is_empty());
    }

    #[test]
    fn test_assemble_fails_fast() {
        let (tree, pipeline, url, _) = setup();
        let mut env = IndexMap::new();
        env.insert("OK".to_string(), EnvValue::from("1"));
        env.insert("NOT-OK".to_string(), EnvValue::from(url));

        let err = BuildEnvironment::assemble(&tree, pipeline, &env, TargetOs::Linux).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidEnvironmentName(ref n) if n == "NOT-OK"));
    }

    #[test]
    fn test_outputs_serialize_as_pipeline_variables() {
        let (tree, pipeline, url, _) = setup();
        let mut env = IndexMap::new();
        env.insert("DATABASE_URL".to_string(), EnvValue::from(url));

        let assembled = BuildEnvironment::assemble(&tree, pipeline, &env, TargetOs::Linux).unwrap();
        let (temp, reference) = assembled.outputs.first().unwrap();

        let json = serde_json::to_value(&assembled).unwrap();
        let rendered = json["outputs"][temp.as_str()].as_str().unwrap();
        assert_eq!(rendered, reference.pipeline_variable());
        assert!(rendered.starts_with("#{Staging-staging."));
    }

    #[test]
    fn test_serialize_variable_type() {
        let json = serde_json::to_value(BuildEnvironmentVariable::secret("s")).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "SECRETS_MANAGER", "value": "s" }));
    }
}
