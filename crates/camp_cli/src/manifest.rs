//! Declarative app manifest read by `camp synth`.
//!
//! ```yaml
//! context:
//!   "@cloudcamp/name": my-app
//!   # ...the remaining @cloudcamp/* keys
//! stages:
//!   production:
//!     databases:
//!       db:
//!         engine: postgres
//!         hostname: db.internal
//!         password: generated
//!     services:
//!       web:
//!         dockerfile: web/Dockerfile
//!         environment:
//!           DATABASE_URL: { from: production/db.url }
//!     post:
//!       - id: migrate
//!         commands: ["./migrate.sh"]
//!         environment:
//!           DATABASE_URL: { from: production/db.url }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use camp_core::AppConfig;
use camp_runtime::{DatabaseProps, RuntimeError};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Inline `@cloudcamp/*` context keys.
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
    /// `cdk.json`-style file holding the context, relative to the manifest.
    #[serde(default)]
    pub context_file: Option<PathBuf>,
    #[serde(default)]
    pub stages: IndexMap<String, StageManifest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StageManifest {
    pub databases: IndexMap<String, DatabaseManifest>,
    pub services: IndexMap<String, ServiceManifest>,
    pub pre: Vec<StepManifest>,
    pub post: Vec<StepManifest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseManifest {
    /// Engine name, parsed when the database is declared.
    #[serde(default)]
    pub engine: Option<String>,
    /// Cluster hostname reported by the provider.
    pub hostname: String,
    /// Password reported by the provider.
    pub password: String,
    #[serde(flatten)]
    pub props: DatabaseProps,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceManifest {
    pub dockerfile: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub cpu: Option<u32>,
    #[serde(default)]
    pub memory: Option<u32>,
    #[serde(default)]
    pub desired_count: Option<u32>,
    #[serde(default)]
    pub health_check_path: Option<String>,
    #[serde(default)]
    pub environment: IndexMap<String, EnvEntry>,
}

#[derive(Debug, Deserialize)]
pub struct StepManifest {
    pub id: String,
    pub commands: Vec<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub dockerfile: Option<String>,
    #[serde(default)]
    pub environment: IndexMap<String, EnvEntry>,
}

/// An environment value: a scalar, or a reference to a database attribute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvEntry {
    Reference { from: String },
    Text(String),
    Integer(i64),
    Boolean(bool),
}

impl EnvEntry {
    /// The literal value, or `None` for references.
    pub fn literal(&self) -> Option<String> {
        match self {
            EnvEntry::Reference { .. } => None,
            EnvEntry::Text(s) => Some(s.clone()),
            EnvEntry::Integer(i) => Some(i.to_string()),
            EnvEntry::Boolean(b) => Some(b.to_string()),
        }
    }
}

/// A parsed `<stage>/<database>.<attribute>` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRef<'a> {
    pub stage: &'a str,
    pub database: &'a str,
    pub attribute: &'a str,
}

impl<'a> AttributeRef<'a> {
    pub fn parse(reference: &'a str) -> Result<Self, RuntimeError> {
        let unknown = || RuntimeError::UnknownVariable(reference.to_string());
        let (stage, rest) = reference.split_once('/').ok_or_else(unknown)?;
        let (database, attribute) = rest.rsplit_once('.').ok_or_else(unknown)?;

        if stage.is_empty() || database.is_empty() || attribute.is_empty() {
            return Err(unknown());
        }
        Ok(Self {
            stage,
            database,
            attribute,
        })
    }
}

impl Manifest {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let mut manifest: Manifest = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))?;

        if let (Some(file), Some(dir)) = (manifest.context_file.as_mut(), path.parent()) {
            if file.is_relative() {
                *file = dir.join(&*file);
            }
        }
        Ok(manifest)
    }

    /// The app configuration, from the inline context or the context file.
    pub fn config(&self) -> Result<AppConfig> {
        match (&self.context, &self.context_file) {
            (Some(context), _) => Ok(AppConfig::from_context(context)?),
            (None, Some(file)) => AppConfig::from_file(file)
                .with_context(|| format!("Failed to load context from {}", file.display())),
            (None, None) => anyhow::bail!("Manifest has neither context nor contextFile"),
        }
    }
}
