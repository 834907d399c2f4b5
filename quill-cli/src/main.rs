use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;

use quill_core::differ::{Diff, diff_with_schema};
use quill_core::provider::Provider;
use quill_core::resource::{Resource, ResourceId, State, Value};
use quill_core::schema::ResourceSchema;
use quill_provider_quicksight::QuickSightProvider;
use quill_provider_quicksight::config::{DEFAULT_REGION, ProviderConfig};
use quill_provider_quicksight::schemas;

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Manage Amazon QuickSight resources declared in JSON", long_about = None)]
struct Cli {
    /// AWS region of the QuickSight account
    #[arg(long, global = true, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// Account used for resources without aws_account_id (defaults to the caller's account)
    #[arg(long, global = true, env = "AWS_ACCOUNT_ID")]
    account_id: Option<String>,

    /// Seconds to wait for asynchronous creation and updates
    #[arg(long, global = true, default_value_t = 300)]
    wait_timeout: u64,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the resource file
    Validate {
        /// Path to the JSON resource file
        #[arg(default_value = "quill.json")]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        /// Path to the JSON resource file
        #[arg(default_value = "quill.json")]
        file: PathBuf,
    },
    /// Apply changes to reach the desired state
    Apply {
        /// Path to the JSON resource file
        #[arg(default_value = "quill.json")]
        file: PathBuf,
    },
    /// Print the current state of a single remote object
    Read {
        /// Resource type (e.g., quicksight.data_source)
        resource_type: String,

        /// Composite identifier (e.g., 111111111111/sales)
        identifier: String,
    },
    /// Destroy all resources defined in the resource file
    Destroy {
        /// Path to the JSON resource file
        #[arg(default_value = "quill.json")]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Validate { file } => run_validate(file),
        Commands::Plan { file } => run_plan(&cli, file).await,
        Commands::Apply { file } => run_apply(&cli, file).await,
        Commands::Read {
            resource_type,
            identifier,
        } => run_read(&cli, resource_type, identifier).await,
        Commands::Destroy { file, auto_approve } => run_destroy(&cli, file, *auto_approve).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

async fn get_provider(cli: &Cli) -> Result<QuickSightProvider, String> {
    let mut config = ProviderConfig::new(cli.region.clone())
        .with_max_wait(Duration::from_secs(cli.wait_timeout));
    if let Some(account_id) = &cli.account_id {
        config = config.with_account_id(account_id.clone());
    }
    QuickSightProvider::new(config)
        .await
        .map_err(|e| format!("Failed to configure QuickSight provider: {}", e))
}

fn get_schemas() -> HashMap<String, ResourceSchema> {
    let mut all_schemas = HashMap::new();
    for schema in schemas::all_schemas() {
        all_schemas.insert(schema.resource_type.clone(), schema);
    }
    all_schemas
}

/// Layout of a resource file
#[derive(Debug, Deserialize)]
struct ResourceFile {
    resources: Vec<ResourceEntry>,
}

#[derive(Debug, Deserialize)]
struct ResourceEntry {
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

fn parse_resources(content: &str) -> Result<Vec<Resource>, String> {
    let file: ResourceFile =
        serde_json::from_str(content).map_err(|e| format!("Parse error: {}", e))?;

    let mut seen = HashSet::new();
    let mut resources = Vec::with_capacity(file.resources.len());
    for entry in file.resources {
        let id = ResourceId::new(entry.resource_type, entry.name);
        if !seen.insert(id.clone()) {
            return Err(format!("Duplicate resource {}.{}", id.resource_type, id.name));
        }
        let attributes = entry
            .attributes
            .iter()
            .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        resources.push(Resource { id, attributes });
    }
    Ok(resources)
}

fn load_resources(file: &Path) -> Result<Vec<Resource>, String> {
    let content = fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    parse_resources(&content)
}

fn validate_resources(
    resources: &[Resource],
    schemas: &HashMap<String, ResourceSchema>,
) -> Result<(), String> {
    let mut all_errors = Vec::new();

    for resource in resources {
        match schemas.get(&resource.id.resource_type) {
            Some(schema) => {
                if let Err(errors) = schema.validate(&resource.attributes) {
                    for error in errors {
                        all_errors.push(format!(
                            "{}.{}: {}",
                            resource.id.resource_type, resource.id.name, error
                        ));
                    }
                }
            }
            None => all_errors.push(format!(
                "{}.{}: unknown resource type {}",
                resource.id.resource_type, resource.id.name, resource.id.resource_type
            )),
        }
    }

    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(all_errors.join("\n"))
    }
}

/// Load, validate and normalize the resources of a file
fn prepare_resources(file: &Path) -> Result<Vec<Resource>, String> {
    let schemas = get_schemas();
    let resources = load_resources(file)?;
    validate_resources(&resources, &schemas)?;

    Ok(resources
        .into_iter()
        .map(|mut resource| {
            if let Some(schema) = schemas.get(&resource.id.resource_type) {
                resource.attributes = schema.normalize(resource.attributes);
            }
            resource
        })
        .collect())
}

fn run_validate(file: &Path) -> Result<(), String> {
    let resources = load_resources(file)?;

    println!("{}", "Validating...".cyan());

    validate_resources(&resources, &get_schemas())?;

    println!(
        "{}",
        format!("✓ {} resources validated successfully.", resources.len())
            .green()
            .bold()
    );

    for resource in &resources {
        println!("  • {}.{}", resource.id.resource_type, resource.id.name);
    }

    Ok(())
}

/// Diff of a resource against the state observed under its derived identifier
struct PlannedChange {
    diff: Diff,
    identifier: Option<String>,
}

async fn create_plan(
    provider: &dyn Provider,
    resources: &[Resource],
    schemas: &HashMap<String, ResourceSchema>,
) -> Result<Vec<PlannedChange>, String> {
    let mut plan = Vec::with_capacity(resources.len());

    for resource in resources {
        let identifier = provider.identifier_for(resource);
        log::debug!(
            "Reading {} ({})",
            resource.id,
            identifier.as_deref().unwrap_or("no identifier")
        );
        let state = provider
            .read(&resource.id, identifier.as_deref())
            .await
            .map_err(|e| format!("Failed to read state: {}", e))?;

        let diff = match schemas.get(&resource.id.resource_type) {
            Some(schema) => diff_with_schema(resource, &state, schema),
            None => quill_core::differ::diff(resource, &state),
        };
        plan.push(PlannedChange {
            identifier: state.identifier.clone().or(identifier),
            diff,
        });
    }

    Ok(plan)
}

fn format_diff(diff: &Diff) -> String {
    match diff {
        Diff::Create(r) => format!(
            "{} {}.{}",
            "+".green().bold(),
            r.id.resource_type.cyan().bold(),
            r.id.name.white().bold()
        ),
        Diff::Update { id, .. } => format!(
            "{} {}.{}",
            "~".yellow().bold(),
            id.resource_type.cyan().bold(),
            id.name.white().bold()
        ),
        Diff::Replace { id, .. } => format!(
            "{} {}.{}",
            "-/+".magenta().bold(),
            id.resource_type.cyan().bold(),
            id.name.white().bold()
        ),
        Diff::NoChange(id) => format!("  {}.{}", id.resource_type, id.name),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Set(items) => {
            let strs: Vec<_> = items.iter().map(|s| format!("\"{}\"", s)).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let sorted: BTreeMap<_, _> = map.iter().collect();
            let strs: Vec<_> = sorted
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
    }
}

fn print_changed_attributes(from: &State, to: &Resource, changed: &[String]) {
    for name in changed {
        let old = from
            .attributes
            .get(name)
            .map(format_value)
            .unwrap_or_else(|| "(none)".to_string());
        let new = to
            .attributes
            .get(name)
            .map(format_value)
            .unwrap_or_else(|| "(none)".to_string());
        println!("      {}: {} → {}", name, old.red(), new.green());
    }
}

fn print_plan(plan: &[PlannedChange]) {
    let changes: Vec<_> = plan.iter().filter(|c| c.diff.is_change()).collect();
    if changes.is_empty() {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    let (mut create, mut update, mut replace) = (0, 0, 0);
    for change in changes {
        println!("  {}", format_diff(&change.diff));
        match &change.diff {
            Diff::Create(r) => {
                create += 1;
                let sorted: BTreeMap<_, _> = r.attributes.iter().collect();
                for (k, v) in sorted {
                    println!("      {}: {}", k, format_value(v));
                }
            }
            Diff::Update {
                from,
                to,
                changed_attributes,
                ..
            } => {
                update += 1;
                print_changed_attributes(from, to, changed_attributes);
            }
            Diff::Replace {
                from,
                to,
                changed_attributes,
                ..
            } => {
                replace += 1;
                print_changed_attributes(from, to, changed_attributes);
            }
            Diff::NoChange(_) => {}
        }
        println!();
    }

    println!(
        "Plan: {} to create, {} to update, {} to replace.",
        create.to_string().green(),
        update.to_string().yellow(),
        replace.to_string().magenta()
    );
}

async fn run_plan(cli: &Cli, file: &Path) -> Result<(), String> {
    let resources = prepare_resources(file)?;
    let provider = get_provider(cli).await?;

    let plan = create_plan(&provider, &resources, &get_schemas()).await?;
    print_plan(&plan);
    Ok(())
}

fn missing_identifier(id: &ResourceId) -> String {
    format!("No identifier known for {}.{}", id.resource_type, id.name)
}

async fn apply_change(provider: &dyn Provider, change: &PlannedChange) -> Result<(), String> {
    match &change.diff {
        Diff::Create(resource) => provider
            .create(resource)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string()),
        Diff::Update { id, from, to, .. } => {
            let identifier = change
                .identifier
                .as_deref()
                .ok_or_else(|| missing_identifier(id))?;
            let state = provider
                .update(id, identifier, from, to)
                .await
                .map_err(|e| e.to_string())?;
            if state.exists {
                Ok(())
            } else {
                Err(format!("{} disappeared during update", identifier))
            }
        }
        Diff::Replace { id, to, .. } => {
            let identifier = change
                .identifier
                .as_deref()
                .ok_or_else(|| missing_identifier(id))?;
            provider
                .delete(id, identifier)
                .await
                .map_err(|e| e.to_string())?;
            provider
                .create(to)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string())
        }
        Diff::NoChange(_) => Ok(()),
    }
}

/// Apply every change of the plan in order, returning (succeeded, failed)
async fn apply_plan(provider: &dyn Provider, plan: &[PlannedChange]) -> (usize, usize) {
    let mut success_count = 0;
    let mut failure_count = 0;

    for change in plan.iter().filter(|c| c.diff.is_change()) {
        match apply_change(provider, change).await {
            Ok(()) => {
                println!("  {} {}", "✓".green(), format_diff(&change.diff));
                success_count += 1;
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), format_diff(&change.diff), e);
                failure_count += 1;
            }
        }
    }

    (success_count, failure_count)
}

async fn run_apply(cli: &Cli, file: &Path) -> Result<(), String> {
    let resources = prepare_resources(file)?;
    let provider = get_provider(cli).await?;

    let plan = create_plan(&provider, &resources, &get_schemas()).await?;
    if !plan.iter().any(|c| c.diff.is_change()) {
        println!("{}", "No changes needed.".green());
        return Ok(());
    }

    print_plan(&plan);
    println!();
    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let (success_count, failure_count) = apply_plan(&provider, &plan).await;

    println!();
    if failure_count == 0 {
        println!(
            "{}",
            format!("Apply complete! {} changes applied.", success_count)
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Apply failed. {} succeeded, {} failed.",
            success_count, failure_count
        ))
    }
}

fn state_to_json(state: &State) -> serde_json::Value {
    let attributes: serde_json::Map<String, serde_json::Value> = state
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .collect();
    serde_json::json!({
        "type": state.id.resource_type,
        "identifier": state.identifier,
        "attributes": attributes,
    })
}

async fn run_read(cli: &Cli, resource_type: &str, identifier: &str) -> Result<(), String> {
    let provider = get_provider(cli).await?;
    let id = ResourceId::new(resource_type, identifier);

    let state = provider
        .read(&id, Some(identifier))
        .await
        .map_err(|e| format!("Failed to read state: {}", e))?;

    if !state.exists {
        println!(
            "{}",
            format!("{} {} does not exist.", resource_type, identifier).yellow()
        );
        return Ok(());
    }

    let output = serde_json::to_string_pretty(&state_to_json(&state))
        .map_err(|e| format!("Failed to render state: {}", e))?;
    println!("{}", output);
    Ok(())
}

/// Existing objects of the given resources, in reverse declaration order
async fn collect_existing(
    provider: &dyn Provider,
    resources: &[Resource],
) -> Result<Vec<(ResourceId, String)>, String> {
    let mut existing = Vec::new();
    for resource in resources.iter().rev() {
        let identifier = provider.identifier_for(resource);
        let state = provider
            .read(&resource.id, identifier.as_deref())
            .await
            .map_err(|e| format!("Failed to read state: {}", e))?;
        if state.exists
            && let Some(identifier) = state.identifier.or(identifier)
        {
            existing.push((resource.id.clone(), identifier));
        }
    }
    Ok(existing)
}

fn confirm_destroy() -> Result<bool, String> {
    println!(
        "{}",
        "Do you really want to destroy all resources?"
            .yellow()
            .bold()
    );
    println!(
        "  {}",
        "This action cannot be undone. Type 'yes' to confirm.".yellow()
    );
    print!("\n  Enter a value: ");
    std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;
    Ok(input.trim() == "yes")
}

async fn run_destroy(cli: &Cli, file: &Path, auto_approve: bool) -> Result<(), String> {
    let resources = prepare_resources(file)?;
    if resources.is_empty() {
        println!("{}", "No resources defined in configuration.".yellow());
        return Ok(());
    }

    let provider = get_provider(cli).await?;
    let to_destroy = collect_existing(&provider, &resources).await?;

    if to_destroy.is_empty() {
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for (id, identifier) in &to_destroy {
        println!(
            "  {} {}.{} ({})",
            "-".red().bold(),
            id.resource_type,
            id.name,
            identifier
        );
    }
    println!();
    println!("Plan: {} to destroy.", to_destroy.len().to_string().red());
    println!();

    if !auto_approve {
        if !confirm_destroy()? {
            println!();
            println!("{}", "Destroy cancelled.".yellow());
            return Ok(());
        }
        println!();
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();

    let mut success_count = 0;
    let mut failure_count = 0;

    for (id, identifier) in &to_destroy {
        match provider.delete(id, identifier).await {
            Ok(()) => {
                println!("  {} {}.{}", "✓".green(), id.resource_type, id.name);
                success_count += 1;
            }
            Err(e) => {
                println!("  {} {}.{} - {}", "✗".red(), id.resource_type, id.name, e);
                failure_count += 1;
            }
        }
    }

    println!();
    if failure_count == 0 {
        println!(
            "{}",
            format!("Destroy complete! {} resources destroyed.", success_count)
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Destroy failed. {} succeeded, {} failed.",
            success_count, failure_count
        ))
    }
}
