//! Application configuration read from the project context.
//!
//! The context is the `context` object of the project's `cdk.json`, written by
//! the `init` tooling. Keys are namespaced with `@cloudcamp/`.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

pub const CONTEXT_KEY_NAME: &str = "@cloudcamp/name";
pub const CONTEXT_KEY_REPOSITORY: &str = "@cloudcamp/repository";
pub const CONTEXT_KEY_BRANCH: &str = "@cloudcamp/branch";
pub const CONTEXT_KEY_ACCOUNT: &str = "@cloudcamp/account";
pub const CONTEXT_KEY_REGION: &str = "@cloudcamp/region";
pub const CONTEXT_KEY_VPC: &str = "@cloudcamp/vpc";
pub const CONTEXT_REPOSITORY_TOKEN_SECRET: &str = "@cloudcamp/repository-token-secret";
pub const CONTEXT_KEY_DOCKERHUB_CREDENTIALS: &str = "@cloudcamp/dockerhub-credentials";

/// Configuration shared by every stack of an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// The unique name of the app.
    pub name: String,
    /// URL of the git source repository.
    pub repository: String,
    /// Branch used for deployments.
    pub branch: String,
    /// Cloud account id.
    pub account: String,
    /// Region code.
    pub region: String,
    /// Id of the VPC the app runs in.
    pub vpc_id: String,
    /// Name of the secret holding the repository token.
    pub repository_token_secret: String,
    /// Name of the secret holding DockerHub credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerhub_secret: Option<String>,
}

impl AppConfig {
    /// Build a configuration with the given app name and empty settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repository: String::new(),
            branch: "main".to_string(),
            account: String::new(),
            region: String::new(),
            vpc_id: String::new(),
            repository_token_secret: "github-token".to_string(),
            dockerhub_secret: None,
        }
    }

    pub fn with_repository(mut self, repository: impl Into<String>, branch: impl Into<String>) -> Self {
        self.repository = repository.into();
        self.branch = branch.into();
        self
    }

    pub fn with_environment(mut self, account: impl Into<String>, region: impl Into<String>) -> Self {
        self.account = account.into();
        self.region = region.into();
        self
    }

    pub fn with_vpc(mut self, vpc_id: impl Into<String>) -> Self {
        self.vpc_id = vpc_id.into();
        self
    }

    /// Read the configuration from a context map.
    pub fn from_context(context: &Map<String, Value>) -> CoreResult<Self> {
        let config = Self {
            name: required(context, CONTEXT_KEY_NAME)?,
            repository: required(context, CONTEXT_KEY_REPOSITORY)?,
            branch: required(context, CONTEXT_KEY_BRANCH)?,
            account: required(context, CONTEXT_KEY_ACCOUNT)?,
            region: required(context, CONTEXT_KEY_REGION)?,
            vpc_id: required(context, CONTEXT_KEY_VPC)?,
            repository_token_secret: required(context, CONTEXT_REPOSITORY_TOKEN_SECRET)?,
            dockerhub_secret: optional(context, CONTEXT_KEY_DOCKERHUB_CREDENTIALS)?,
        };
        config.validate()?;
        config.repository_source()?;
        debug!("Loaded configuration for app {}", config.name);
        Ok(config)
    }

    /// Load the configuration from a `cdk.json`-style file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let document: Value = serde_json::from_str(&content)?;
        let context = document
            .get("context")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                CoreError::InvalidConfig(format!("{} has no context object", path.display()))
            })?;
        Self::from_context(context)
    }

    /// Owner and name of the source repository.
    pub fn repository_source(&self) -> CoreResult<RepositorySource> {
        RepositorySource::parse(&self.repository)
    }

    /// Check the invariants other components rely on.
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidConfig("app name must not be empty".to_string()));
        }
        if !self.name.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidConfig(format!(
                "app name '{}' must contain alphanumeric characters",
                self.name
            )));
        }
        Ok(())
    }
}

/// Hosting service of the source repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryHost {
    Github,
}

/// Owner and name of the source repository, parsed from its URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySource {
    pub host: RepositoryHost,
    pub owner: String,
    pub repo: String,
}

impl RepositorySource {
    /// Parse an SSH (`git@github.com:owner/repo.git`) or HTTPS
    /// (`https://github.com/owner/repo`) repository URL.
    pub fn parse(url: &str) -> CoreResult<Self> {
        let patterns = [r"^.*?@github\.com:(.*?)/(.*?)\.git$", r"github\.com/(.*?)/(.*?)$"];

        for pattern in patterns {
            let re = Regex::new(pattern)
                .map_err(|e| CoreError::InvalidConfig(format!("Invalid regex: {}", e)))?;
            if let Some(caps) = re.captures(url) {
                let repo = caps[2].trim_end_matches(".git").to_string();
                return Ok(Self {
                    host: RepositoryHost::Github,
                    owner: caps[1].to_string(),
                    repo,
                });
            }
        }
        Err(CoreError::InvalidConfig(format!("Invalid repository url: {}", url)))
    }
}

fn required(context: &Map<String, Value>, key: &str) -> CoreResult<String> {
    optional(context, key)?.ok_or_else(|| CoreError::MissingContext(key.to_string()))
}

fn optional(context: &Map<String, Value>, key: &str) -> CoreResult<Option<String>> {
    match context.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(CoreError::InvalidConfig(format!(
            "context key {} must be a string, got {}",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    fn context() -> Map<String, Value> {
        let value = json!({
            "@cloudcamp/name": "my-app",
            "@cloudcamp/repository": "git@github.com:acme/my-app.git",
            "@cloudcamp/branch": "main",
            "@cloudcamp/account": "123456789012",
            "@cloudcamp/region": "us-east-1",
            "@cloudcamp/vpc": "vpc-0abc",
            "@cloudcamp/repository-token-secret": "github-token"
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_from_context() {
        let config = AppConfig::from_context(&context()).unwrap();

        assert_eq!(
            config,
            AppConfig::new("my-app")
                .with_repository("git@github.com:acme/my-app.git", "main")
                .with_environment("123456789012", "us-east-1")
                .with_vpc("vpc-0abc")
        );
    }

    #[test]
    fn test_missing_key() {
        let mut ctx = context();
        ctx.remove(CONTEXT_KEY_VPC);

        let err = AppConfig::from_context(&ctx).unwrap_err();
        assert!(matches!(err, CoreError::MissingContext(ref k) if k == CONTEXT_KEY_VPC));
        assert_eq!(err.to_string(), "Missing config in context: @cloudcamp/vpc");
    }

    #[test]
    fn test_non_string_value() {
        let mut ctx = context();
        ctx.insert(CONTEXT_KEY_ACCOUNT.to_string(), json!(123));

        assert!(matches!(
            AppConfig::from_context(&ctx),
            Err(CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_optional_dockerhub_secret() {
        let mut ctx = context();
        ctx.insert(CONTEXT_KEY_DOCKERHUB_CREDENTIALS.to_string(), json!("dockerhub-credentials"));

        let config = AppConfig::from_context(&ctx).unwrap();
        assert_eq!(config.dockerhub_secret.as_deref(), Some("dockerhub-credentials"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cdk.json");
        let document = json!({ "app": "npx ts-node app.ts", "context": context() });
        std::fs::write(&path, serde_json::to_string_pretty(&document).unwrap()).unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.name, "my-app");
    }

    #[test]
    fn test_from_file_without_context() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cdk.json");
        std::fs::write(&path, "{}").unwrap();

        assert!(matches!(
            AppConfig::from_file(&path),
            Err(CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_parse_repository_url() {
        let ssh = RepositorySource::parse("git@github.com:acme/my-app.git").unwrap();
        assert_eq!(ssh.owner, "acme");
        assert_eq!(ssh.repo, "my-app");

        let https = RepositorySource::parse("https://github.com/acme/web").unwrap();
        assert_eq!((https.owner.as_str(), https.repo.as_str()), ("acme", "web"));
        assert_eq!(https.host, RepositoryHost::Github);

        assert!(matches!(
            RepositorySource::parse("https://gitlab.com/acme/web"),
            Err(CoreError::InvalidConfig(ref m)) if m.contains("Invalid repository url")
        ));
    }

    #[test]
    fn test_from_context_rejects_unknown_repository_host() {
        let mut ctx = context();
        ctx.insert(CONTEXT_KEY_REPOSITORY.to_string(), json!("https://example.com/acme/app"));

        let err = AppConfig::from_context(&ctx).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(ref m) if m.contains("example.com")));
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        assert!(AppConfig::new("  ").validate().is_err());
        assert!(AppConfig::new("--").validate().is_err());
        assert!(AppConfig::new("app").validate().is_ok());
    }
}
