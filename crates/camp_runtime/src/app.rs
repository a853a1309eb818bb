//! The application root: configuration, construct tree, pipeline and stages.

use camp_core::naming::upper_camel_case;
use camp_core::{AppConfig, ConstructId, ConstructTree};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::database::{ClusterEndpoint, Database, DatabaseProps};
use crate::error::{RuntimeError, RuntimeResult};
use crate::service::{WebService, WebServiceProps};
use crate::stage::{BuildStep, RunProps, Stage};

pub const NETWORK_STAGE: &str = "network";
pub const STAGING_STAGE: &str = "staging";
pub const PRODUCTION_STAGE: &str = "production";

/// A CloudCamp application.
///
/// Owns the construct tree. Stages are created on first use, each with a
/// single stack named after the stage. Every build step is resolved from the
/// pipeline stack, which lives outside all stages.
#[derive(Debug, Clone)]
pub struct App {
    config: AppConfig,
    tree: ConstructTree,
    pipeline_stack: ConstructId,
    pipeline_stack_name: String,
    stages: IndexMap<String, Stage>,
}

impl App {
    pub fn new(config: AppConfig) -> RuntimeResult<Self> {
        config.validate()?;

        let mut tree = ConstructTree::new(config.name.clone());
        let pipeline_stack_name = upper_camel_case(&format!("{}-pipeline", config.name));
        let pipeline_stack = tree.add_stack(tree.root(), pipeline_stack_name.as_str())?;

        info!("Created app {} with pipeline stack {}", config.name, pipeline_stack_name);

        Ok(Self {
            config,
            tree,
            pipeline_stack,
            pipeline_stack_name,
            stages: IndexMap::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn tree(&self) -> &ConstructTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ConstructTree {
        &mut self.tree
    }

    pub fn pipeline_stack(&self) -> ConstructId {
        self.pipeline_stack
    }

    pub fn pipeline_stack_name(&self) -> &str {
        &self.pipeline_stack_name
    }

    /// Get the stage called `name`, creating it if needed.
    pub fn stage(&mut self, name: &str) -> RuntimeResult<&mut Stage> {
        if !self.stages.contains_key(name) {
            let root = self.tree.root();
            let construct = self.tree.add_stage(root, upper_camel_case(name))?;
            let stack = self.tree.add_stack(construct, name)?;
            let stack_name = upper_camel_case(&format!("{}-{}", self.config.name, name));
            debug!("Created stage {} with stack {}", name, stack_name);
            self.stages
                .insert(name.to_string(), Stage::new(name, construct, stack, stack_name));
        }
        self.find_stage_mut(name)
    }

    /// The stack of the stage called `name`, creating the stage if needed.
    pub fn stack(&mut self, name: &str) -> RuntimeResult<ConstructId> {
        Ok(self.stage(name)?.stack())
    }

    pub fn network(&mut self) -> RuntimeResult<ConstructId> {
        self.stack(NETWORK_STAGE)
    }

    pub fn staging(&mut self) -> RuntimeResult<ConstructId> {
        self.stack(STAGING_STAGE)
    }

    pub fn production(&mut self) -> RuntimeResult<ConstructId> {
        self.stack(PRODUCTION_STAGE)
    }

    pub fn find_stage(&self, name: &str) -> RuntimeResult<&Stage> {
        self.stages
            .get(name)
            .ok_or_else(|| RuntimeError::StageNotFound(name.to_string()))
    }

    fn find_stage_mut(&mut self, name: &str) -> RuntimeResult<&mut Stage> {
        self.stages
            .get_mut(name)
            .ok_or_else(|| RuntimeError::StageNotFound(name.to_string()))
    }

    /// Stages in creation order.
    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.values()
    }

    /// Declare a database in the stack of stage `name`.
    pub fn add_database(
        &mut self,
        name: &str,
        id: &str,
        props: DatabaseProps,
        endpoint: ClusterEndpoint,
    ) -> RuntimeResult<Database> {
        let stack = self.stack(name)?;
        Database::new(&mut self.tree, &self.config.name, stack, id, props, endpoint)
    }

    /// Declare a web service in the stack of stage `name`.
    pub fn add_web_service(&mut self, name: &str, id: &str, props: WebServiceProps) -> RuntimeResult<WebService> {
        let stack = self.stack(name)?;
        WebService::new(&mut self.tree, stack, id, props)
    }

    /// Add a step that runs before stage `name` is deployed.
    pub fn run_pre(&mut self, name: &str, id: &str, props: RunProps) -> RuntimeResult<&BuildStep> {
        let consumer = self.pipeline_stack;
        let stage = self
            .stages
            .get_mut(name)
            .ok_or_else(|| RuntimeError::StageNotFound(name.to_string()))?;
        stage.run_pre(&mut self.tree, consumer, id, props)
    }

    /// Add a step that runs after stage `name` is deployed.
    pub fn run_post(&mut self, name: &str, id: &str, props: RunProps) -> RuntimeResult<&BuildStep> {
        let consumer = self.pipeline_stack;
        let stage = self
            .stages
            .get_mut(name)
            .ok_or_else(|| RuntimeError::StageNotFound(name.to_string()))?;
        stage.run_post(&mut self.tree, consumer, id, props)
    }
}
