//! Records produced when a variable is resolved for a build action.

use serde::Serialize;

use crate::output::OutputRef;

/// How a resolved value reaches the build action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// Literal value.
    Plain,
    /// Secret-store entry read by the build service.
    Secret,
    /// Stack output passed in by the pipeline.
    Output,
}

/// Value or reference handed to the build action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResolvedValue {
    Plain(String),
    /// Name of the secret-store entry.
    Secret(String),
    Output(OutputRef),
}

/// One environment entry needed by a build action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVariable {
    #[serde(flatten)]
    pub value: ResolvedValue,
    /// Name to bind the value to instead of the requested one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_name: Option<String>,
    /// Commands to run, in order, before the user's commands.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub setup_commands: Vec<String>,
}

impl ResolvedVariable {
    pub fn plain(value: impl Into<String>) -> Self {
        Self::new(ResolvedValue::Plain(value.into()))
    }

    pub fn secret(secret_name: impl Into<String>) -> Self {
        Self::new(ResolvedValue::Secret(secret_name.into()))
    }

    pub fn output(reference: OutputRef) -> Self {
        Self::new(ResolvedValue::Output(reference))
    }

    fn new(value: ResolvedValue) -> Self {
        Self {
            value,
            temp_name: None,
            setup_commands: Vec::new(),
        }
    }

    pub fn with_temp_name(mut self, name: impl Into<String>) -> Self {
        self.temp_name = Some(name.into());
        self
    }

    pub fn with_setup_command(mut self, command: impl Into<String>) -> Self {
        self.setup_commands.push(command.into());
        self
    }

    pub fn kind(&self) -> VariableKind {
        match self.value {
            ResolvedValue::Plain(_) => VariableKind::Plain,
            ResolvedValue::Secret(_) => VariableKind::Secret,
            ResolvedValue::Output(_) => VariableKind::Output,
        }
    }

    /// Environment name the value is bound to.
    pub fn env_name<'a>(&'a self, requested: &'a str) -> &'a str {
        self.temp_name.as_deref().unwrap_or(requested)
    }
}
