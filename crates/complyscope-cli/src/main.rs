use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use complyscope_bundle::{
    find_component_definitions, read_assessment_plan, read_scope, write_assessment_plan,
    write_scope, AppDirectory, FsProfileLoader, StructuralValidator,
};
use complyscope_core::oscal::ComponentDefinition;
use complyscope_core::{
    list_frameworks, ApplicationDirectory, AssessmentScope, CancelSignal, CatalogTitleResolver,
    PlanSummary, ScopeBuilder, TitleLookup,
};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

const CLI_CONTRACT_VERSION: &str = "cli.v1";
const SCOPE_FILE: &str = "complyscope.yaml";
const PLAN_FILE: &str = "assessment-plan.json";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Parser)]
#[command(name = "complyscope")]
#[command(about = "Compliance assessment scope CLI")]
struct Cli {
    #[arg(long, global = true, default_value = ".")]
    workspace: PathBuf,

    #[arg(long, global = true, default_value = ".")]
    app_root: PathBuf,

    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Frameworks,
    Scope(ScopeArgs),
    Apply(ApplyArgs),
    Controls(ControlsArgs),
}

#[derive(Debug, Args)]
struct ScopeArgs {
    #[arg(long)]
    framework: String,
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    no_titles: bool,
    #[arg(long, default_value_t = 30_000)]
    title_timeout_ms: u64,
}

#[derive(Debug, Args)]
struct ApplyArgs {
    #[arg(long)]
    plan: PathBuf,
    #[arg(long)]
    scope: Option<PathBuf>,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ControlsArgs {
    #[arg(long)]
    scope: Option<PathBuf>,
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

/// Install a stderr subscriber as the global default and hand back the same
/// dispatcher for components that take one explicitly.
fn init_tracing(debug: bool) -> Dispatch {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    if tracing::dispatcher::set_global_default(dispatch.clone()).is_err() {
        eprintln!("tracing subscriber already installed");
    }
    dispatch
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log = init_tracing(cli.debug);
    let app = AppDirectory::new(&cli.app_root, false)?;

    match cli.command {
        Command::Frameworks => run_frameworks(&app),
        Command::Scope(args) => run_scope(&cli.workspace, &app, &args),
        Command::Apply(args) => run_apply(&cli.workspace, args, &log),
        Command::Controls(args) => run_controls(&cli.workspace, args),
    }
}

fn load_component_definitions(app: &AppDirectory) -> Result<Vec<ComponentDefinition>> {
    find_component_definitions(app.bundle_dir(), &StructuralValidator).with_context(|| {
        format!("failed to load component definitions from {}", app.bundle_dir().display())
    })
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

fn scope_digest(scope: &AssessmentScope) -> Result<String> {
    let rendered = scope.to_yaml()?;
    let mut hasher = Sha256::new();
    hasher.update(rendered.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

fn run_frameworks(app: &AppDirectory) -> Result<()> {
    let definitions = load_component_definitions(app)?;
    let frameworks = list_frameworks(&definitions);
    emit_json(serde_json::json!({
        "bundle_dir": path_string(app.bundle_dir()),
        "component_definitions": definitions.len(),
        "frameworks": frameworks,
    }))
}

fn run_scope(workspace: &Path, app: &AppDirectory, args: &ScopeArgs) -> Result<()> {
    let definitions = load_component_definitions(app)?;

    let validator = StructuralValidator;
    let resolver = CatalogTitleResolver::new(FsProfileLoader::new());
    let mut builder = ScopeBuilder::new(args.framework.as_str());
    if !args.no_titles {
        let lookup = TitleLookup {
            app_dir: app,
            validator: &validator,
            cancel: CancelSignal::with_timeout(Duration::from_millis(args.title_timeout_ms)),
        };
        builder = builder.with_titles(&resolver, lookup);
    }

    let scope = builder
        .build(&definitions)
        .with_context(|| format!("failed to build scope for framework '{}'", args.framework))?;
    if scope.include_controls.is_empty() {
        tracing::warn!(framework_id = %args.framework, "no implemented controls found for framework");
    }
    let digest = scope_digest(&scope)?;

    if args.dry_run {
        return emit_json(serde_json::json!({
            "dry_run": true,
            "framework_id": scope.framework_id,
            "controls": scope.include_controls.len(),
            "scope_digest": digest,
            "yaml": scope.to_yaml()?,
        }));
    }

    let out = args.out.clone().unwrap_or_else(|| workspace.join(SCOPE_FILE));
    write_scope(&out, &scope)
        .with_context(|| format!("failed to write scope descriptor {}", out.display()))?;
    emit_json(serde_json::json!({
        "dry_run": false,
        "framework_id": scope.framework_id,
        "controls": scope.include_controls.len(),
        "scope_digest": digest,
        "path": path_string(&out),
    }))
}

fn run_apply(workspace: &Path, args: ApplyArgs, log: &Dispatch) -> Result<()> {
    let scope_path = args.scope.unwrap_or_else(|| workspace.join(SCOPE_FILE));
    let scope = read_scope(&scope_path)
        .with_context(|| format!("failed to load scope descriptor {}", scope_path.display()))?;
    let mut plan = read_assessment_plan(&args.plan, &StructuralValidator)
        .with_context(|| format!("failed to load assessment plan {}", args.plan.display()))?;

    if let Some(plan_framework) = plan.framework_id() {
        if plan_framework != scope.framework_id {
            tracing::warn!(
                plan_framework,
                scope_framework = %scope.framework_id,
                "assessment plan was generated for a different framework"
            );
        }
    }

    scope.apply(&mut plan, log);

    let out = args.out.unwrap_or_else(|| workspace.join(PLAN_FILE));
    write_assessment_plan(&out, &plan)
        .with_context(|| format!("failed to write assessment plan {}", out.display()))?;

    let summary = PlanSummary::of(&plan);
    emit_json(serde_json::json!({
        "framework_id": scope.framework_id,
        "scope_digest": scope_digest(&scope)?,
        "path": path_string(&out),
        "summary": summary,
    }))
}

fn run_controls(workspace: &Path, args: ControlsArgs) -> Result<()> {
    let scope_path = args.scope.unwrap_or_else(|| workspace.join(SCOPE_FILE));
    let scope = read_scope(&scope_path)
        .with_context(|| format!("failed to load scope descriptor {}", scope_path.display()))?;

    let controls = scope
        .include_controls
        .iter()
        .map(|entry| {
            serde_json::json!({
                "control_id": entry.control_id,
                "control_title": entry.control_title,
                "rules": entry.rules,
                "exclude_rules": entry.exclude_rules,
            })
        })
        .collect::<Vec<_>>();

    emit_json(serde_json::json!({
        "framework_id": scope.framework_id,
        "path": path_string(&scope_path),
        "global_exclude_rules": scope.global_exclude_rules,
        "controls": controls,
    }))
}
