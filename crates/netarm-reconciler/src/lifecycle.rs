//! Whole-state operations: refresh, import and destroy.

use chrono::Utc;
use netarm_provider::{registry, run, Operation, ProviderMeta};
use netarm_schema::ResourceData;
use netarm_store::{AuditEvent, ResourceAddress, ResourceState, ResourceStatus, StateStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ReconcileError;
use crate::plan::teardown_order;
use crate::reconcile::Applier;
use crate::report::{Action, Change, ReconcileReport};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshReport {
    pub refreshed: usize,
    pub vanished: Vec<ResourceAddress>,
}

/// Read every managed resource in state and cache its current attributes.
/// A resource whose remote object is gone keeps its entry without an ID so
/// the next apply re-creates it.
pub async fn refresh(store: &dyn StateStore, meta: &ProviderMeta) -> Result<RefreshReport, ReconcileError> {
    let mut report = RefreshReport::default();

    for mut state in store.list().await? {
        let Some(id) = state.id.clone() else { continue };
        if state.address.is_data() {
            continue;
        }
        let address = state.address.clone();
        let resource = registry::resource(&address.type_name).map_err(ReconcileError::provider(&address))?;

        let mut data = ResourceData::new(state.attributes.clone());
        data.set_id(id);
        run(resource.as_ref(), Operation::Read, &mut data, meta)
            .await
            .map_err(ReconcileError::provider(&address))?;

        match data.id {
            Some(id) => {
                state.id = Some(id);
                state.attributes = data.attributes;
                report.refreshed += 1;
            }
            None => {
                warn!(address = %address, "remote object has disappeared");
                state.id = None;
                report.vanished.push(address.clone());
                store
                    .append_event(&AuditEvent::ResourceVanished { id: Uuid::new_v4(), at: Utc::now(), address: address.clone() })
                    .await?;
            }
        }
        store.upsert(&state).await?;
    }

    info!("Refreshed {} resources, {} vanished", report.refreshed, report.vanished.len());
    Ok(report)
}

/// Flattened attributes use empty values where a configuration would leave
/// the field out.
fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(m) => m.is_empty(),
        _ => false,
    }
}

/// Adopt an existing remote object under `address`.
///
/// The stored configuration is the settable part of what was read, so the
/// next plan shows how the declared block differs from the real object.
pub async fn import(
    address: &ResourceAddress,
    id: &str,
    store: &dyn StateStore,
    meta: &ProviderMeta,
) -> Result<ResourceState, ReconcileError> {
    if address.is_data() {
        return Err(ReconcileError::Invalid(vec![format!("{}: data sources cannot be imported", address)]));
    }
    if store.get(address).await?.is_some() {
        return Err(ReconcileError::AlreadyManaged(address.clone()));
    }
    let resource = registry::resource(&address.type_name).map_err(ReconcileError::provider(address))?;
    let data = resource.import(id, meta).await.map_err(ReconcileError::provider(address))?;

    let schema = resource.schema();
    let config: Map<String, Value> = data
        .attributes
        .iter()
        .filter(|(k, v)| schema.get(k.as_str()).is_some_and(|f| f.is_user_settable()) && !is_empty(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let mut state = ResourceState::new(address.clone(), config);
    state.id = data.id;
    state.attributes = data.attributes;
    state.touch(ResourceStatus::Present);
    store.upsert(&state).await?;
    store
        .append_event(&AuditEvent::ResourceImported {
            id: Uuid::new_v4(),
            at: Utc::now(),
            address: address.clone(),
            remote_id: id.to_string(),
        })
        .await?;

    info!(address = %address, id, "imported");
    Ok(state)
}

/// Delete everything in state, dependents first.
pub async fn destroy(store: &dyn StateStore, meta: &ProviderMeta, dry_run: bool) -> Result<ReconcileReport, ReconcileError> {
    let states = store.list().await?;
    let order = teardown_order(&states)?;

    let mut report = ReconcileReport::new(dry_run);
    report.changes = order
        .iter()
        .filter(|a| !a.is_data())
        .map(|a| Change { address: a.clone(), action: Action::Delete })
        .collect();
    if dry_run {
        return Ok(report);
    }

    let run_id = Uuid::new_v4();
    store.append_event(&AuditEvent::ApplyStarted { id: run_id, at: Utc::now(), dry_run: false }).await?;

    let mut applier = Applier { store, meta, known: states.into_iter().map(|s| (s.address.clone(), s)).collect() };
    for address in &order {
        applier.remove(address).await?;
        if !address.is_data() {
            store
                .append_event(&AuditEvent::ResourceDeleted { id: Uuid::new_v4(), at: Utc::now(), address: address.clone() })
                .await?;
        }
    }

    store
        .append_event(&AuditEvent::ApplyCompleted {
            id: run_id,
            at: Utc::now(),
            changes: report.changes.len(),
            dry_run: false,
        })
        .await?;
    info!("Destroy complete: {} resources deleted", report.changes.len());
    Ok(report)
}
