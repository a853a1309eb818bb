//! Synth command - Resolve every variable of a manifest and print the result.

use std::path::PathBuf;

use anyhow::{Context, Result};
use camp_core::{ConstructId, RepositorySource};
use camp_runtime::{
    App, BuildStep, ClusterEndpoint, ClusterSettings, Database, EnvValue, OutputRef, RunProps,
    RuntimeError, TargetOs, WebServiceDefinition, WebServiceProps,
};
use clap::{Args, ValueEnum};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::manifest::{AttributeRef, EnvEntry, Manifest, StepManifest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Args)]
pub struct SynthArgs {
    /// Path to the app manifest
    #[arg(short, long, default_value = "camp.yaml")]
    manifest: PathBuf,

    /// Output format of the report
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthReport {
    pub app: String,
    pub repository: RepositorySource,
    pub branch: String,
    pub pipeline_stack: String,
    pub stages: Vec<StageReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub name: String,
    pub stack_name: String,
    pub artifact_id: String,
    pub databases: Vec<DatabaseReport>,
    pub services: Vec<WebServiceDefinition>,
    pub pre: Vec<BuildStep>,
    pub post: Vec<BuildStep>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseReport {
    pub id: String,
    #[serde(flatten)]
    pub settings: ClusterSettings,
    pub host_output: OutputRef,
    pub secret_name_output: OutputRef,
}

type Databases = IndexMap<String, IndexMap<String, Database>>;

pub fn execute(args: SynthArgs) -> Result<()> {
    info!("Synthesizing {}", args.manifest.display());

    let manifest = Manifest::from_file(&args.manifest)?;
    let report = synthesize(&manifest)?;

    let rendered = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Yaml => serde_yaml::to_string(&report)?,
    };

    match args.output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Wrote report to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

/// Build the app described by `manifest`.
///
/// Databases of every stage are declared first so services and steps can
/// reference databases of any stage.
pub fn synthesize(manifest: &Manifest) -> Result<SynthReport> {
    let mut app = App::new(manifest.config()?)?;

    for name in manifest.stages.keys() {
        app.stage(name)?;
    }

    let mut databases: Databases = IndexMap::new();
    for (stage, stage_manifest) in &manifest.stages {
        for (id, db) in &stage_manifest.databases {
            let mut props = db.props.clone();
            if let Some(engine) = &db.engine {
                props.engine = engine.parse()?;
            }
            let endpoint = ClusterEndpoint {
                hostname: db.hostname.clone(),
                password: db.password.clone(),
            };
            let database = app
                .add_database(stage, id, props, endpoint)
                .with_context(|| format!("Failed to declare database {}/{}", stage, id))?;
            databases
                .entry(stage.clone())
                .or_default()
                .insert(id.clone(), database);
        }
    }

    let mut services: IndexMap<String, Vec<WebServiceDefinition>> = IndexMap::new();
    for (stage, stage_manifest) in &manifest.stages {
        for (id, service) in &stage_manifest.services {
            let props = WebServiceProps {
                dockerfile: service.dockerfile.clone(),
                port: service.port,
                environment: environment(&service.environment, &databases)?,
                domain: service.domain.clone(),
                cpu: service.cpu,
                memory: service.memory,
                desired_count: service.desired_count,
                health_check_path: service.health_check_path.clone(),
            };
            let declared = app
                .add_web_service(stage, id, props)
                .with_context(|| format!("Failed to declare service {}/{}", stage, id))?;
            services
                .entry(stage.clone())
                .or_default()
                .push(declared.definition().clone());
        }
    }

    for (stage, stage_manifest) in &manifest.stages {
        for step in &stage_manifest.pre {
            let props = run_props(step, &databases)?;
            app.run_pre(stage, &step.id, props)
                .with_context(|| format!("Failed to add pre step {} to {}", step.id, stage))?;
        }
        for step in &stage_manifest.post {
            let props = run_props(step, &databases)?;
            app.run_post(stage, &step.id, props)
                .with_context(|| format!("Failed to add post step {} to {}", step.id, stage))?;
        }
    }

    let mut stages = Vec::new();
    for stage in app.stages() {
        let stage_databases = databases
            .get(stage.name())
            .map(|dbs| {
                dbs.iter()
                    .map(|(id, db)| DatabaseReport {
                        id: id.clone(),
                        settings: db.settings().clone(),
                        host_output: db.host_output().reference().clone(),
                        secret_name_output: db.secret_name_output().reference().clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        stages.push(StageReport {
            name: stage.name().to_string(),
            stack_name: stage.stack_name().to_string(),
            artifact_id: artifact_id(&app, stage.stack())?,
            databases: stage_databases,
            services: services.shift_remove(stage.name()).unwrap_or_default(),
            pre: stage.pre().to_vec(),
            post: stage.post().to_vec(),
        });
    }

    info!("Synthesized {} stages", stages.len());

    Ok(SynthReport {
        app: app.config().name.clone(),
        repository: app.config().repository_source()?,
        branch: app.config().branch.clone(),
        pipeline_stack: app.pipeline_stack_name().to_string(),
        stages,
    })
}

fn artifact_id(app: &App, stack: ConstructId) -> Result<String> {
    Ok(app.tree().artifact_id(stack)?)
}

fn run_props(step: &StepManifest, databases: &Databases) -> Result<RunProps> {
    let os = match &step.os {
        Some(os) => os.parse::<TargetOs>()?,
        None => TargetOs::default(),
    };

    Ok(RunProps {
        commands: step.commands.clone(),
        os,
        dockerfile: step.dockerfile.clone(),
        environment: environment(&step.environment, databases)?,
    })
}

fn environment(
    entries: &IndexMap<String, EnvEntry>,
    databases: &Databases,
) -> Result<IndexMap<String, EnvValue>> {
    let mut env = IndexMap::new();
    for (name, entry) in entries {
        let value = match entry {
            EnvEntry::Reference { from } => lookup(from, databases)?,
            other => EnvValue::Literal(other.literal().unwrap_or_default()),
        };
        env.insert(name.clone(), value);
    }
    Ok(env)
}

fn lookup(reference: &str, databases: &Databases) -> Result<EnvValue, RuntimeError> {
    let target = AttributeRef::parse(reference)?;
    debug!("Looking up {:?}", target);

    databases
        .get(target.stage)
        .and_then(|dbs| dbs.get(target.database))
        .and_then(|db| db.vars().attribute(target.attribute))
        .ok_or_else(|| RuntimeError::UnknownVariable(reference.to_string()))
}
