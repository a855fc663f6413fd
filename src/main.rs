use anyhow::{anyhow, bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use tecmetrics_console::config::{self, Config};
use tecmetrics_console::model::{
    Branch, BreakTime, Department, Device, DocumentType, Employee, Position, PositionCreate,
};
use tecmetrics_console::{Gateway, HttpGateway, ListController, LoadOutcome, MutationOutcome, Resource, ResourceKind};

#[derive(Debug, Parser)]
#[command(author, version, about = "Manage TecMetrics attendance records from the command line")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the record total of every resource
    Overview,
    /// List one page of a resource
    List(ListArgs),
    /// Show one record
    Get {
        resource: ResourceKind,
        id: String,
    },
    /// Create a record from a JSON payload
    Create {
        resource: ResourceKind,
        /// JSON object, or @path to a file holding one
        #[arg(long)]
        data: String,
    },
    /// Update a record with a partial JSON payload
    Update {
        resource: ResourceKind,
        id: String,
        #[arg(long)]
        data: String,
    },
    /// Delete a record
    Delete {
        resource: ResourceKind,
        id: String,
    },
}

#[derive(Debug, ClapArgs)]
struct ListArgs {
    resource: ResourceKind,
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    search: Option<String>,
    /// Filter as key=value; repeatable
    #[arg(long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,
}

impl Command {
    fn resource(&self) -> Option<ResourceKind> {
        match self {
            Command::Overview => None,
            Command::List(args) => Some(args.resource),
            Command::Get { resource, .. }
            | Command::Create { resource, .. }
            | Command::Update { resource, .. }
            | Command::Delete { resource, .. } => Some(*resource),
        }
    }
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("filter '{}' must be key=value", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("filter '{}' has an empty key", raw));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Inline JSON or `@path`.
fn read_payload<T: DeserializeOwned>(data: &str) -> Result<T> {
    let text = match data.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("failed to read payload file {}", path))?,
        None => data.to_string(),
    };
    serde_json::from_str(&text).context("payload is not valid JSON for this resource")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn controller<R: Resource>(gateway: &Arc<dyn Gateway>, cfg: &Config) -> ListController<R> {
    ListController::new(gateway.clone(), cfg.app.default_limit).with_lookup_limit(cfg.app.lookup_limit)
}

/// Adds a credentials hint when the backend answered 401.
async fn failure<R: Resource>(ctl: &ListController<R>, message: String) -> anyhow::Error {
    if ctl.session_expired().await {
        anyhow!("{} (set api.token or {})", message, config::TOKEN_ENV)
    } else {
        anyhow!(message)
    }
}

async fn fetch<R: Resource>(ctl: &ListController<R>, id: &str) -> Result<R> {
    match ctl.fetch_by_id(id).await {
        Ok(record) => Ok(record),
        Err(message) => Err(failure(ctl, message).await),
    }
}

async fn check_mutation<R: Resource>(ctl: &ListController<R>, outcome: MutationOutcome) -> Result<()> {
    match outcome {
        MutationOutcome::Applied => Ok(()),
        MutationOutcome::NoSelection => bail!("no record selected"),
        MutationOutcome::Invalid(errors) => {
            print_json(&json!({ "errors": &errors.fields }))?;
            bail!("validation failed: {}", errors)
        }
        MutationOutcome::Rejected(message) => Err(failure(ctl, message).await),
    }
}

async fn run<R: Resource>(gateway: Arc<dyn Gateway>, cfg: &Config, command: Command) -> Result<()> {
    match command {
        Command::List(args) => {
            let mut filters = Vec::with_capacity(args.filters.len());
            for (key, value) in args.filters {
                if !R::descriptor().filter_keys.contains(&key.as_str()) {
                    warn!(resource = %R::descriptor().kind, key = %key, "filter key is not a known filter");
                }
                filters.push((key, Some(value)));
            }
            let ctl = controller::<R>(&gateway, cfg).with_filters(filters);
            if let LoadOutcome::Failed(message) = ctl.load(args.page, args.limit, args.search.as_deref()).await {
                return Err(failure(&ctl, message).await);
            }
            let snap = ctl.snapshot().await;
            let pagination = snap.store.pagination();
            print_json(&json!({
                "records": snap.store.records(),
                "pagination": pagination,
                "totalPages": pagination.total_pages(),
            }))
        }
        Command::Get { id, .. } => {
            let ctl = controller::<R>(&gateway, cfg);
            let record = fetch(&ctl, &id).await?;
            print_json(&record)
        }
        Command::Create { data, .. } => {
            let payload: R::Create = read_payload(&data)?;
            let ctl = controller::<R>(&gateway, cfg);
            ctl.open_create().await;
            let outcome = ctl.create(&payload).await;
            check_mutation(&ctl, outcome).await?;
            let snap = ctl.snapshot().await;
            info!(total = snap.store.pagination().total, "created");
            print_json(&snap.store.records())
        }
        Command::Update { id, data, .. } => {
            let payload: R::Update = read_payload(&data)?;
            let ctl = controller::<R>(&gateway, cfg);
            let record = fetch(&ctl, &id).await?;
            ctl.open_edit(record).await;
            let outcome = ctl.update(&payload).await;
            check_mutation(&ctl, outcome).await?;
            print_json(&json!({ "updated": id }))
        }
        Command::Delete { id, .. } => {
            let ctl = controller::<R>(&gateway, cfg);
            let record = fetch(&ctl, &id).await?;
            ctl.open_delete(record).await;
            let outcome = ctl.remove().await;
            check_mutation(&ctl, outcome).await?;
            print_json(&json!({ "deleted": id }))
        }
        Command::Overview => bail!("overview does not take a resource"),
    }
}

async fn total<R: Resource>(gateway: Arc<dyn Gateway>, cfg: &Config) -> Result<u64, String> {
    let ctl = controller::<R>(&gateway, cfg);
    match ctl.load(Some(1), Some(1), Some("")).await {
        LoadOutcome::Failed(message) => Err(message),
        _ => Ok(ctl.snapshot().await.store.pagination().total),
    }
}

async fn total_for(kind: ResourceKind, gateway: Arc<dyn Gateway>, cfg: &Config) -> (ResourceKind, Result<u64, String>) {
    let result = match kind {
        ResourceKind::Branch => total::<Branch>(gateway, cfg).await,
        ResourceKind::Department => total::<Department>(gateway, cfg).await,
        ResourceKind::Position => total::<Position>(gateway, cfg).await,
        ResourceKind::Device => total::<Device>(gateway, cfg).await,
        ResourceKind::BreakTime => total::<BreakTime>(gateway, cfg).await,
        ResourceKind::DocumentType => total::<DocumentType>(gateway, cfg).await,
        ResourceKind::Employee => total::<Employee>(gateway, cfg).await,
    };
    (kind, result)
}

async fn overview(gateway: Arc<dyn Gateway>, cfg: &Config) -> Result<()> {
    let results = join_all(ResourceKind::ALL.map(|kind| total_for(kind, gateway.clone(), cfg))).await;
    let mut totals = serde_json::Map::new();
    for (kind, result) in results {
        let value = match result {
            Ok(total) => json!(total),
            Err(message) => {
                warn!(resource = %kind, %message, "could not fetch total");
                json!({ "error": message })
            }
        };
        totals.insert(kind.to_string(), value);
    }
    print_json(&totals)
}

/// Positions reference departments without any backend check; warn early.
async fn warn_unknown_department(gateway: &Arc<dyn Gateway>, cfg: &Config, data: &str) -> Result<()> {
    let payload: PositionCreate = read_payload(data)?;
    if payload.department_id.trim().is_empty() {
        return Ok(());
    }
    match controller::<Department>(gateway, cfg).lookup_all().await {
        Ok(departments) if !departments.iter().any(|d| d.id == payload.department_id) => {
            warn!(department_id = %payload.department_id, "position references an unknown department");
        }
        Ok(_) => {}
        Err(message) => warn!(%message, "could not load departments to check the reference"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(args.config.as_path()))?;
    let gateway: Arc<dyn Gateway> = Arc::new(HttpGateway::from_config(&cfg).context("failed to build HTTP client")?);

    let Some(kind) = args.command.resource() else {
        return overview(gateway, &cfg).await;
    };

    if let (ResourceKind::Position, Command::Create { data, .. }) = (kind, &args.command) {
        warn_unknown_department(&gateway, &cfg, data).await?;
    }

    match kind {
        ResourceKind::Branch => run::<Branch>(gateway, &cfg, args.command).await,
        ResourceKind::Department => run::<Department>(gateway, &cfg, args.command).await,
        ResourceKind::Position => run::<Position>(gateway, &cfg, args.command).await,
        ResourceKind::Device => run::<Device>(gateway, &cfg, args.command).await,
        ResourceKind::BreakTime => run::<BreakTime>(gateway, &cfg, args.command).await,
        ResourceKind::DocumentType => run::<DocumentType>(gateway, &cfg, args.command).await,
        ResourceKind::Employee => run::<Employee>(gateway, &cfg, args.command).await,
    }
}
