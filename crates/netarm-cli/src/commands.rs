use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use netarm_client::AzureClient;
use netarm_config::{Configuration, ProviderSettings};
use netarm_provider::{registry, ProviderMeta};
use netarm_store::{InMemoryStore, RedbStore, ResourceAddress, StateStore};
use tracing::info;

use crate::output;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn load(config_dir: &Path) -> Result<Configuration> {
    netarm_config::load_dir(config_dir).with_context(|| format!("Failed to load configuration from {}", config_dir.display()))
}

/// Flags over the `provider:` block over the `ARM_*` environment.
fn provider_meta(flags: &ProviderSettings, file: ProviderSettings) -> Result<ProviderMeta> {
    let settings = ProviderSettings::from_env().merge(file).merge(flags.clone());
    let arm = settings.arm_config().context("Incomplete provider settings")?;
    info!(subscription = %arm.subscription_id, environment = ?arm.environment, "configured ARM client");
    let client = Arc::new(AzureClient::new(&arm));
    Ok(ProviderMeta::new(client, arm.subscription_id.clone()).with_timeouts(settings.timeouts))
}

/// Provider settings from an optional configuration directory.
fn provider_meta_from(flags: &ProviderSettings, config_dir: Option<&Path>) -> Result<ProviderMeta> {
    let file = match config_dir {
        Some(dir) => load(dir)?.provider,
        None => ProviderSettings::default(),
    };
    provider_meta(flags, file)
}

fn open_store(path: &Path) -> Result<Arc<dyn StateStore>> {
    let store = RedbStore::open(path).with_context(|| format!("Failed to open state at {}", path.display()))?;
    Ok(Arc::new(store))
}

fn parse_address(address: &str) -> Result<ResourceAddress> {
    address.parse().with_context(|| format!("{:?} is not a resource address (expected type.name)", address))
}

// ── Serve ─────────────────────────────────────────────────────────────────────

pub async fn serve(
    state_path: &Path,
    flags: &ProviderSettings,
    config_dir: Option<PathBuf>,
    bind: String,
    port: u16,
    token: Option<String>,
    ephemeral: bool,
) -> Result<()> {
    let meta = provider_meta_from(flags, config_dir.as_deref())?;
    let store: Arc<dyn StateStore> = if ephemeral { Arc::new(InMemoryStore::new()) } else { open_store(state_path)? };

    let token = match token {
        Some(t) => t,
        None => {
            let t = uuid::Uuid::new_v4().simple().to_string();
            println!("Generated API token: {t}");
            t
        }
    };
    let app = netarm_api::build_app(store, meta, Arc::new(token));

    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    println!("Listening on http://{addr}");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

// ── Validate / plan / apply ───────────────────────────────────────────────────

pub fn validate(config_dir: &Path) -> Result<()> {
    let config = load(config_dir)?;
    let problems = netarm_reconciler::check::check(&config);
    if !problems.is_empty() {
        for p in &problems {
            eprintln!("  ! {p}");
        }
        bail!("{} problem(s) found", problems.len());
    }
    netarm_reconciler::plan::config_order(&config)?;
    println!("Configuration is valid ({} blocks).", config.blocks.len());
    Ok(())
}

pub async fn plan(state_path: &Path, config_dir: &Path) -> Result<()> {
    let config = load(config_dir)?;
    let store = open_store(state_path)?;
    let report = netarm_reconciler::plan(&config, store.as_ref()).await?;
    print!("{}", output::render_report(&report));
    Ok(())
}

pub async fn apply(state_path: &Path, flags: &ProviderSettings, config_dir: &Path) -> Result<()> {
    let config = load(config_dir)?;
    let meta = provider_meta(flags, config.provider.clone())?;
    let store = open_store(state_path)?;
    let report = netarm_reconciler::apply(&config, store.as_ref(), &meta).await?;
    print!("{}", output::render_report(&report));
    Ok(())
}

// ── Destroy ───────────────────────────────────────────────────────────────────

pub async fn destroy(
    state_path: &Path,
    flags: &ProviderSettings,
    config_dir: Option<PathBuf>,
    auto_approve: bool,
) -> Result<()> {
    let meta = provider_meta_from(flags, config_dir.as_deref())?;
    let store = open_store(state_path)?;

    let report = netarm_reconciler::destroy(store.as_ref(), &meta, !auto_approve).await?;
    print!("{}", output::render_report(&report));
    if !auto_approve && report.mutations().next().is_some() {
        println!("Re-run with --auto-approve to delete these resources.");
    }
    Ok(())
}

// ── Import / refresh ──────────────────────────────────────────────────────────

pub async fn import(
    state_path: &Path,
    flags: &ProviderSettings,
    address: &str,
    id: &str,
    config_dir: Option<PathBuf>,
) -> Result<()> {
    let address = parse_address(address)?;
    let meta = provider_meta_from(flags, config_dir.as_deref())?;
    let store = open_store(state_path)?;
    let state = netarm_reconciler::import(&address, id, store.as_ref(), &meta).await?;
    println!("Imported {} as {}.", id, state.address);
    Ok(())
}

pub async fn refresh(state_path: &Path, flags: &ProviderSettings, config_dir: Option<PathBuf>) -> Result<()> {
    let meta = provider_meta_from(flags, config_dir.as_deref())?;
    let store = open_store(state_path)?;
    let report = netarm_reconciler::refresh(store.as_ref(), &meta).await?;
    for address in &report.vanished {
        println!("! {} disappeared outside netarm", address);
    }
    println!("Refreshed {} resource(s).", report.refreshed);
    Ok(())
}

// ── Schema / state ────────────────────────────────────────────────────────────

pub fn schema(type_name: Option<String>) -> Result<()> {
    let all = registry::schemas();
    let out = match type_name {
        None => all,
        Some(t) => {
            let resource = all["resources"].get(&t).cloned();
            let data_source = all["data_sources"].get(&t).cloned();
            if resource.is_none() && data_source.is_none() {
                bail!("unknown resource type {:?}", t);
            }
            serde_json::json!({ "resource": resource, "data_source": data_source })
        }
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

pub async fn state_list(state_path: &Path) -> Result<()> {
    let store = open_store(state_path)?;
    print!("{}", output::render_state(&store.list().await?));
    Ok(())
}

pub async fn state_show(state_path: &Path, address: &str) -> Result<()> {
    let address = parse_address(address)?;
    let store = open_store(state_path)?;
    let state = store.get(&address).await?.with_context(|| format!("{} is not in state", address))?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

pub async fn state_rm(state_path: &Path, address: &str) -> Result<()> {
    let address = parse_address(address)?;
    let store = open_store(state_path)?;
    if store.get(&address).await?.is_none() {
        bail!("{} is not in state", address);
    }
    store.delete(&address).await?;
    println!("Removed {} from state; the remote object was left alone.", address);
    Ok(())
}

pub async fn state_events(state_path: &Path, address: Option<String>, limit: u32) -> Result<()> {
    let address = address.as_deref().map(parse_address).transpose()?;
    let store = open_store(state_path)?;
    for event in store.list_events(address.as_ref(), limit).await? {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}
