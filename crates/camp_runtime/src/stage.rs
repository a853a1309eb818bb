//! Deployable stages and the build steps that run around their deployment.

use std::path::Path;

use camp_core::{ConstructId, ConstructTree};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

use crate::environment::{BuildEnvironment, EnvValue};
use crate::error::{RuntimeError, RuntimeResult};
use crate::shell::TargetOs;

pub const LINUX_STANDARD_IMAGE: &str = "standard-5.0";
pub const WINDOWS_STANDARD_IMAGE: &str = "win-server-core-2019-base";

/// A Docker build context: directory plus Dockerfile name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DockerAsset {
    pub directory: String,
    pub file: String,
}

impl DockerAsset {
    /// Split a Dockerfile path into its directory and file name.
    pub fn from_dockerfile(dockerfile: &str) -> Self {
        let path = Path::new(dockerfile);
        let directory = path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| ".".to_string());
        let file = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| dockerfile.to_string());
        Self { directory, file }
    }
}

/// Image a build step runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BuildImage {
    /// One of the build service's standard images.
    Standard { os: TargetOs, image: String },
    /// Image built from a Dockerfile in the repository.
    Asset {
        os: TargetOs,
        id: String,
        #[serde(flatten)]
        asset: DockerAsset,
    },
}

impl BuildImage {
    pub fn standard(os: TargetOs) -> Self {
        let image = match os {
            TargetOs::Linux => LINUX_STANDARD_IMAGE,
            TargetOs::Windows => WINDOWS_STANDARD_IMAGE,
        };
        BuildImage::Standard {
            os,
            image: image.to_string(),
        }
    }

    pub fn os(&self) -> TargetOs {
        match self {
            BuildImage::Standard { os, .. } | BuildImage::Asset { os, .. } => *os,
        }
    }
}

/// Options for a build step.
#[derive(Debug, Clone, Default)]
pub struct RunProps {
    pub commands: Vec<String>,
    pub os: TargetOs,
    /// Dockerfile of a custom build image.
    pub dockerfile: Option<String>,
    pub environment: IndexMap<String, EnvValue>,
}

impl RunProps {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_os(mut self, os: TargetOs) -> Self {
        self.os = os;
        self
    }

    pub fn with_dockerfile(mut self, dockerfile: impl Into<String>) -> Self {
        self.dockerfile = Some(dockerfile.into());
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<EnvValue>) -> Self {
        self.environment.insert(name.into(), value.into());
        self
    }
}

/// When a step runs relative to the stage's deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepPhase {
    Pre,
    Post,
}

/// A shell-based build step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStep {
    pub id: String,
    pub phase: StepPhase,
    pub commands: Vec<String>,
    pub build_image: BuildImage,
    #[serde(flatten)]
    pub environment: BuildEnvironment,
}

impl BuildStep {
    /// Commands that run before [`BuildStep::commands`].
    pub fn install_commands(&self) -> &[String] {
        &self.environment.setup_commands
    }
}

/// A deployable unit holding one stack.
#[derive(Debug, Clone)]
pub struct Stage {
    name: String,
    construct: ConstructId,
    stack: ConstructId,
    stack_name: String,
    pre: Vec<BuildStep>,
    post: Vec<BuildStep>,
}

impl Stage {
    pub fn new(
        name: impl Into<String>,
        construct: ConstructId,
        stack: ConstructId,
        stack_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            construct,
            stack,
            stack_name: stack_name.into(),
            pre: Vec::new(),
            post: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn construct(&self) -> ConstructId {
        self.construct
    }

    pub fn stack(&self) -> ConstructId {
        self.stack
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn pre(&self) -> &[BuildStep] {
        &self.pre
    }

    pub fn post(&self) -> &[BuildStep] {
        &self.post
    }

    /// Add a step that runs before the stage is deployed.
    pub fn run_pre(
        &mut self,
        tree: &mut ConstructTree,
        consumer: ConstructId,
        id: &str,
        props: RunProps,
    ) -> RuntimeResult<&BuildStep> {
        let step = self.build_step(tree, consumer, id, props, StepPhase::Pre)?;
        self.pre.push(step);
        Ok(&self.pre[self.pre.len() - 1])
    }

    /// Add a step that runs after the stage is deployed.
    pub fn run_post(
        &mut self,
        tree: &mut ConstructTree,
        consumer: ConstructId,
        id: &str,
        props: RunProps,
    ) -> RuntimeResult<&BuildStep> {
        let step = self.build_step(tree, consumer, id, props, StepPhase::Post)?;
        self.post.push(step);
        Ok(&self.post[self.post.len() - 1])
    }

    fn build_step(
        &self,
        tree: &mut ConstructTree,
        consumer: ConstructId,
        id: &str,
        props: RunProps,
        phase: StepPhase,
    ) -> RuntimeResult<BuildStep> {
        if self.pre.iter().chain(&self.post).any(|step| step.id == id) {
            return Err(RuntimeError::DuplicateStep {
                stage: self.name.clone(),
                id: id.to_string(),
            });
        }

        // Nothing is registered in the tree until the environment resolves.
        let environment = BuildEnvironment::assemble(tree, consumer, &props.environment, props.os)?;

        let build_image = match props.dockerfile {
            Some(dockerfile) => {
                let asset_id = format!("{}-docker-asset", id);
                tree.add_construct(self.stack, asset_id.as_str())?;
                BuildImage::Asset {
                    os: props.os,
                    id: asset_id,
                    asset: DockerAsset::from_dockerfile(&dockerfile),
                }
            }
            None => BuildImage::standard(props.os),
        };

        info!(
            "Added {:?} step {} to stage {} ({} setup commands)",
            phase,
            id,
            self.name,
            environment.setup_commands.len()
        );

        Ok(BuildStep {
            id: id.to_string(),
            phase,
            commands: props.commands,
            build_image,
            environment,
        })
    }
}
