//! Load-balanced container services.

use camp_core::{ConstructId, ConstructTree};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::environment::{validate_env_name, EnvValue};
use crate::error::RuntimeResult;
use crate::stage::DockerAsset;
use crate::token::Token;

pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_CPU: u32 = 256;
pub const DEFAULT_MEMORY: u32 = 512;

#[derive(Debug, Clone, Default)]
pub struct WebServiceProps {
    /// Path to the Dockerfile to run.
    pub dockerfile: String,
    /// Port exposed by the container.
    pub port: Option<u16>,
    pub environment: IndexMap<String, EnvValue>,
    pub domain: Option<String>,
    /// CPU units.
    pub cpu: Option<u32>,
    /// Memory in MiB.
    pub memory: Option<u32>,
    pub desired_count: Option<u32>,
    pub health_check_path: Option<String>,
}

impl WebServiceProps {
    pub fn new(dockerfile: impl Into<String>) -> Self {
        Self {
            dockerfile: dockerfile.into(),
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<EnvValue>) -> Self {
        self.environment.insert(name.into(), value.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// A container environment entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerEnvironmentEntry {
    pub name: String,
    pub value: Token,
}

/// Definition handed to the provider binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebServiceDefinition {
    pub service_name: String,
    pub image: DockerAsset,
    pub container_port: u16,
    pub cpu: u32,
    pub memory: u32,
    pub desired_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_path: Option<String>,
    pub environment: Vec<ContainerEnvironmentEntry>,
}

/// A web service running a container image built from a Dockerfile.
#[derive(Debug, Clone)]
pub struct WebService {
    construct: ConstructId,
    definition: WebServiceDefinition,
}

impl WebService {
    /// Declare a service under `scope`.
    ///
    /// Every variable in the environment is resolved once, here, for the
    /// unit the service is deployed by.
    pub fn new(
        tree: &mut ConstructTree,
        scope: ConstructId,
        id: &str,
        props: WebServiceProps,
    ) -> RuntimeResult<Self> {
        for name in props.environment.keys() {
            validate_env_name(name)?;
        }

        // Resolved from the scope, which shares the service's unit. The
        // construct is registered only once every variable resolved.
        let mut environment = Vec::with_capacity(props.environment.len());
        for (name, value) in &props.environment {
            let token = match value {
                EnvValue::Literal(text) => Token::literal(text.clone()),
                EnvValue::Variable(variable) => variable.resolve(tree, scope)?,
            };
            debug!("Service {} env {} (deferred: {})", id, name, !token.is_literal());
            environment.push(ContainerEnvironmentEntry {
                name: name.clone(),
                value: token,
            });
        }

        let construct = tree.add_construct(scope, id)?;
        info!("Declared web service {}", tree.path(construct)?);

        Ok(Self {
            construct,
            definition: WebServiceDefinition {
                service_name: id.to_string(),
                image: DockerAsset::from_dockerfile(&props.dockerfile),
                container_port: props.port.unwrap_or(DEFAULT_PORT),
                cpu: props.cpu.unwrap_or(DEFAULT_CPU),
                memory: props.memory.unwrap_or(DEFAULT_MEMORY),
                desired_count: props.desired_count.unwrap_or(1),
                domain: props.domain,
                health_check_path: props.health_check_path,
                environment,
            },
        })
    }

    pub fn construct(&self) -> ConstructId {
        self.construct
    }

    pub fn definition(&self) -> &WebServiceDefinition {
        &self.definition
    }

    pub fn environment(&self) -> impl Iterator<Item = (&str, &Token)> {
        self.definition
            .environment
            .iter()
            .map(|entry| (entry.name.as_str(), &entry.value))
    }

    /// The environment in the container definition's `[{Name, Value}]` form.
    pub fn container_environment(&self) -> serde_json::Value {
        serde_json::to_value(&self.definition.environment).unwrap_or_default()
    }
}
