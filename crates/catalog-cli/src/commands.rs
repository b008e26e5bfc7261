//! Command implementations for the catalog binary.
//!
//! Index-backed commands go through [`AssetService`]; `diff` and `patch`
//! work on local snapshot files only. Output is written as JSON to the
//! given writer, logs go to stderr.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use catalog_asset::{diff, patch};
use catalog_search::{
    IndexOrchestrator, OrchestratorConfig, PageRequest, RecordFilter, SearchRequest, TantivyStore,
    TantivyStoreConfig,
};
use catalog_service::AssetService;
use catalog_types::{Asset, AssetType, Change, Owner, Settings};

use crate::cli::{Cli, Commands};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
    }
    if let Some(path) = &cli.index_path {
        settings.index_path = path.clone();
    }
    Ok(settings)
}

pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Open the index store and build the service on top of it.
pub fn open_service(settings: &Settings) -> Result<AssetService> {
    let store_config = TantivyStoreConfig::from_settings(settings);
    info!(index_path = ?store_config.root, "Opening index store");
    let store = TantivyStore::open(store_config).context("Failed to open index store")?;
    let config = OrchestratorConfig::from_settings(settings).context("Invalid configuration")?;
    let orchestrator = IndexOrchestrator::new(Arc::new(store), config);
    Ok(AssetService::new(Arc::new(orchestrator)))
}

/// Entry point used by `main`.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    init_logging(&settings)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if !cli.command.uses_index() {
        return run_offline(cli.command, &mut out);
    }
    let service = open_service(&settings)?;
    execute(cli.command, &service, &mut out).await
}

/// Run a command that needs no index store.
pub fn run_offline(command: Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Diff { old, new } => handle_diff(&old, &new, out),
        Commands::Patch { asset, patch } => handle_patch(&asset, &patch, out),
        other => bail!("Command needs the index store: {other:?}"),
    }
}

/// Run any command against `service`.
pub async fn execute(command: Commands, service: &AssetService, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Migrate => {
            let report = service.migrate().await?;
            for ty in &report.created {
                writeln!(out, "created\t{ty}")?;
            }
            for ty in &report.existing {
                writeln!(out, "exists\t{ty}")?;
            }
        }
        Commands::Ingest {
            asset_type,
            batch_size,
            file,
        } => {
            let assets = read_assets(&file, asset_type)?;
            let mut written = 0;
            for chunk in assets.chunks(batch_size.max(1)) {
                let counts = service.ingest(chunk.to_vec()).await?;
                written += counts.values().sum::<usize>();
                debug!(written, "Ingested batch");
            }
            info!(file = ?file, written, "Ingest complete");
            writeln!(out, "{written}")?;
        }
        Commands::Search {
            text,
            types,
            filter,
            query,
            limit,
        } => {
            let mut request = SearchRequest::new(text)
                .with_types(types)
                .with_max_results(limit);
            request.filters = to_filter(filter);
            for (field, text) in query {
                request = request.with_query(field, text);
            }
            for result in service.search(&request).await? {
                let line = json!({
                    "type": result.asset_type,
                    "score": result.score,
                    "asset": result.asset,
                });
                writeln!(out, "{line}")?;
            }
        }
        Commands::Suggest { text, types, limit } => {
            let request = SearchRequest::new(text)
                .with_types(types)
                .with_max_results(limit);
            for name in service.suggest(&request).await? {
                writeln!(out, "{name}")?;
            }
        }
        Commands::List {
            asset_type,
            filter,
            from,
            size,
        } => {
            let request = PageRequest::new(from, size).with_filters(to_filter(filter));
            let page = service.get_page(asset_type, &request).await?;
            let line = json!({
                "data": page.assets,
                "count": page.assets.len(),
                "total": page.total,
            });
            writeln!(out, "{line}")?;
        }
        Commands::Export { asset_type, filter } => {
            let mut cursor = service.scan(asset_type, &to_filter(filter)).await?;
            let mut exported = 0usize;
            let drained: Result<()> = async {
                while cursor.has_more() {
                    for asset in cursor.next().await? {
                        writeln!(out, "{}", serde_json::to_string(&asset)?)?;
                        exported += 1;
                    }
                }
                Ok(())
            }
            .await;
            cursor.close().await?;
            drained?;
            info!(asset_type = %asset_type, exported, "Export complete");
        }
        Commands::Get { asset_type, urn } => {
            let asset = service.get(asset_type, &urn).await?;
            writeln!(out, "{}", serde_json::to_string_pretty(&asset)?)?;
        }
        Commands::Delete { asset_type, urn } => {
            service.delete(asset_type, &urn).await?;
            writeln!(out, "deleted\t{asset_type}\t{urn}")?;
        }
        Commands::Counts => {
            for (ty, count) in service.type_counts().await? {
                writeln!(out, "{ty}\t{count}")?;
            }
        }
        Commands::Put { file, by } => {
            let asset: Asset = read_json(&file)?;
            let outcome = service.upsert(asset, &editor(&by)).await?;
            print_outcome(out, &outcome.asset, &outcome.changelog)?;
        }
        Commands::Update {
            asset_type,
            urn,
            patch,
            by,
        } => {
            let payload = read_object(&patch)?;
            let outcome = service
                .patch(asset_type, &urn, &payload, &editor(&by))
                .await?;
            print_outcome(out, &outcome.asset, &outcome.changelog)?;
        }
        offline @ (Commands::Diff { .. } | Commands::Patch { .. }) => run_offline(offline, out)?,
    }
    Ok(())
}

fn handle_diff(old: &Path, new: &Path, out: &mut impl Write) -> Result<()> {
    let old: Asset = read_json(old)?;
    let new: Asset = read_json(new)?;
    for change in diff(&old, &new)? {
        writeln!(out, "{}", serde_json::to_string(&change)?)?;
    }
    Ok(())
}

fn handle_patch(asset: &Path, payload: &Path, out: &mut impl Write) -> Result<()> {
    let asset: Asset = read_json(asset)?;
    let payload = read_object(payload)?;
    let patched = patch(&asset, &payload);
    writeln!(out, "{}", serde_json::to_string_pretty(&patched)?)?;
    Ok(())
}

fn print_outcome(out: &mut impl Write, asset: &Asset, changelog: &[Change]) -> Result<()> {
    let line = json!({
        "urn": asset.urn,
        "version": asset.version,
        "changelog": changelog,
    });
    writeln!(out, "{line}")?;
    Ok(())
}

fn editor(by: &str) -> Owner {
    Owner::new("", by, "cli")
}

fn to_filter(pairs: Vec<(String, String)>) -> RecordFilter {
    let mut filter = RecordFilter::new();
    for (key, value) in pairs {
        filter.entry(key).or_default().push(value);
    }
    filter
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {path:?}"))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {path:?}"))
}

fn read_object(path: &Path) -> Result<Map<String, Value>> {
    match read_json::<Value>(path)? {
        Value::Object(map) => Ok(map),
        _ => bail!("Patch payload in {path:?} must be a JSON object"),
    }
}

/// Read one asset per non-blank line, forcing every asset to `asset_type`.
pub fn read_assets(path: &Path, asset_type: AssetType) -> Result<Vec<Asset>> {
    let file = fs::File::open(path).with_context(|| format!("Failed to open {path:?}"))?;
    let mut assets = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut asset: Asset = serde_json::from_str(&line)
            .with_context(|| format!("Invalid asset on line {} of {path:?}", n + 1))?;
        asset.asset_type = asset_type;
        assets.push(asset);
    }
    Ok(assets)
}
