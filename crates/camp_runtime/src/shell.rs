//! Target operating systems of build actions and their shell syntax.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

/// Operating system a build action runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
    #[default]
    Linux,
    Windows,
}

impl TargetOs {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetOs::Linux => "linux",
            TargetOs::Windows => "windows",
        }
    }

    /// Expression expanding an environment variable.
    pub fn env_reference(&self, name: &str) -> String {
        match self {
            TargetOs::Linux => format!("${}", name),
            TargetOs::Windows => format!("%{}%", name),
        }
    }

    /// Escape literal text for the quoted right-hand side of an assignment.
    pub fn escape(&self, text: &str) -> String {
        match self {
            TargetOs::Linux => {
                let mut escaped = String::with_capacity(text.len());
                for c in text.chars() {
                    if matches!(c, '\\' | '"' | '$' | '`') {
                        escaped.push('\\');
                    }
                    escaped.push(c);
                }
                escaped
            }
            TargetOs::Windows => text.replace('%', "%%"),
        }
    }

    /// Statement that sets `name` to the concatenation of `parts`.
    pub fn export_command(&self, name: &str, parts: &[ShellPart]) -> String {
        let value: String = parts
            .iter()
            .map(|part| match part {
                ShellPart::Literal(text) => self.escape(text),
                ShellPart::Env(var) => self.env_reference(var),
            })
            .collect();

        match self {
            TargetOs::Linux => format!("export {}=\"{}\"", name, value),
            TargetOs::Windows => format!("set \"{}={}\"", name, value),
        }
    }
}

impl FromStr for TargetOs {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" => Ok(TargetOs::Linux),
            "windows" => Ok(TargetOs::Windows),
            other => Err(RuntimeError::UnsupportedOs(other.to_string())),
        }
    }
}

impl std::fmt::Display for TargetOs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Piece of the value assigned by a setup command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellPart {
    /// Text inserted verbatim (after escaping).
    Literal(String),
    /// Expansion of another environment variable.
    Env(String),
}
