use chrono::Utc;
use netarm_config::{Block, Configuration};
use netarm_provider::{read_data_source, registry, run, Operation, ProviderMeta, Resource};
use netarm_schema::ResourceData;
use netarm_store::{config_hash, AuditEvent, ResourceAddress, ResourceState, ResourceStatus, StateStore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::check::check;
use crate::error::ReconcileError;
use crate::lifecycle::refresh;
use crate::plan::{config_order, plan_changes, resolved_config, Known};
use crate::report::{Action, ReconcileReport, ReconcileRequest};

/// Load the configuration directory and apply it.
pub async fn reconcile(
    req: ReconcileRequest,
    store: &dyn StateStore,
    meta: &ProviderMeta,
) -> Result<ReconcileReport, ReconcileError> {
    info!("Loading configuration from {:?}", req.config_dir);
    let config = netarm_config::load_dir(&req.config_dir)?;
    debug!("Loaded {} blocks", config.blocks.len());
    if req.dry_run {
        plan(&config, store).await
    } else {
        apply(&config, store, meta).await
    }
}

/// Check the configuration and compare it with stored state. Sends nothing.
pub async fn plan(config: &Configuration, store: &dyn StateStore) -> Result<ReconcileReport, ReconcileError> {
    let errors = check(config);
    if !errors.is_empty() {
        return Err(ReconcileError::Invalid(errors));
    }
    let order = config_order(config)?;
    let states = store.list().await?;

    let mut report = ReconcileReport::new(true);
    report.changes = plan_changes(config, &order, &states)?;
    info!("Plan: {} changes", report.mutations().count());
    Ok(report)
}

/// Refresh state, then create, update, replace and delete until the remote
/// side matches `config`. Stops at the first failure.
pub async fn apply(
    config: &Configuration,
    store: &dyn StateStore,
    meta: &ProviderMeta,
) -> Result<ReconcileReport, ReconcileError> {
    let errors = check(config);
    if !errors.is_empty() {
        return Err(ReconcileError::Invalid(errors));
    }
    let order = config_order(config)?;

    let refreshed = refresh(store, meta).await?;
    let states = store.list().await?;
    let mut report = ReconcileReport::new(false);
    report.vanished = refreshed.vanished;
    report.changes = plan_changes(config, &order, &states)?;

    let run_id = Uuid::new_v4();
    store.append_event(&AuditEvent::ApplyStarted { id: run_id, at: Utc::now(), dry_run: false }).await?;

    let mut applier = Applier { store, meta, known: states.iter().map(|s| (s.address.clone(), s.clone())).collect() };

    for stale in states.iter().filter(|s| s.address.is_data() && config.get(&s.address).is_none()) {
        store.delete(&stale.address).await?;
        applier.known.remove(&stale.address);
    }

    for change in report.changes.iter().filter(|c| c.action == Action::Delete) {
        let address = &change.address;
        applier.remove(address).await?;
        applier.event(AuditEvent::ResourceDeleted { id: Uuid::new_v4(), at: Utc::now(), address: address.clone() }).await?;
    }

    // Replacements come down dependents first and go back up in order.
    for change in report.changes.iter().rev().filter(|c| matches!(c.action, Action::Replace { .. })) {
        applier.remove(&change.address).await?;
    }

    for change in &report.changes {
        let address = &change.address;
        match &change.action {
            Action::Delete => {}
            Action::Create => {
                let remote_id = applier.create(block(config, address)?).await?;
                applier
                    .event(AuditEvent::ResourceCreated { id: Uuid::new_v4(), at: Utc::now(), address: address.clone(), remote_id })
                    .await?;
            }
            Action::Update { fields } => {
                applier.update(block(config, address)?).await?;
                applier
                    .event(AuditEvent::ResourceUpdated {
                        id: Uuid::new_v4(),
                        at: Utc::now(),
                        address: address.clone(),
                        fields: fields.clone(),
                    })
                    .await?;
            }
            Action::Replace { fields } => {
                applier.create(block(config, address)?).await?;
                applier
                    .event(AuditEvent::ResourceReplaced {
                        id: Uuid::new_v4(),
                        at: Utc::now(),
                        address: address.clone(),
                        fields: fields.clone(),
                    })
                    .await?;
            }
            Action::Read => applier.read(block(config, address)?).await?,
        }
    }

    store
        .append_event(&AuditEvent::ApplyCompleted {
            id: run_id,
            at: Utc::now(),
            changes: report.mutations().count(),
            dry_run: false,
        })
        .await?;

    info!("Apply complete: {} changes", report.mutations().count());
    Ok(report)
}

fn block<'a>(config: &'a Configuration, address: &ResourceAddress) -> Result<&'a Block, ReconcileError> {
    config.get(address).ok_or_else(|| ReconcileError::Internal(format!("{} is planned but not declared", address)))
}

/// Executes planned changes and keeps `known` in step with the store so
/// later blocks resolve references against fresh attributes.
pub(crate) struct Applier<'a> {
    pub store: &'a dyn StateStore,
    pub meta: &'a ProviderMeta,
    pub known: Known,
}

impl Applier<'_> {
    async fn event(&self, event: AuditEvent) -> Result<(), ReconcileError> {
        Ok(self.store.append_event(&event).await?)
    }

    async fn save(&mut self, state: ResourceState) -> Result<(), ReconcileError> {
        self.store.upsert(&state).await?;
        self.known.insert(state.address.clone(), state);
        Ok(())
    }

    fn resource(address: &ResourceAddress) -> Result<Box<dyn Resource>, ReconcileError> {
        registry::resource(&address.type_name).map_err(ReconcileError::provider(address))
    }

    /// Create the remote object. A failure after the object came into being
    /// leaves it in state as tainted; otherwise the entry is dropped.
    pub async fn create(&mut self, block: &Block) -> Result<String, ReconcileError> {
        let address = &block.address;
        let resource = Self::resource(address)?;
        let mut config = resolved_config(block, &self.known)?;
        resource.check(&config).map_err(ReconcileError::provider(address))?;
        resource.schema().apply_defaults(&mut config);

        let mut state = ResourceState::new(address.clone(), config.clone());
        state.dependencies = block.dependencies();
        self.save(state.clone()).await?;

        info!(address = %address, "creating");
        let mut data = ResourceData::new(config);
        let outcome = run(resource.as_ref(), Operation::Create, &mut data, self.meta).await;

        state.id = data.id.clone();
        state.attributes = data.attributes;
        match (outcome, data.id) {
            (Ok(()), Some(id)) => {
                state.touch(ResourceStatus::Present);
                self.save(state).await?;
                Ok(id)
            }
            (Ok(()), None) => {
                self.store.delete(address).await?;
                self.known.remove(address);
                Err(ReconcileError::Internal(format!("{}: create finished without an ID", address)))
            }
            (Err(e), Some(id)) => {
                warn!(address = %address, id, "create failed after the remote object was created, marking it tainted");
                state.touch(ResourceStatus::Tainted);
                self.save(state).await?;
                Err(ReconcileError::provider(address)(e))
            }
            (Err(e), None) => {
                self.store.delete(address).await?;
                self.known.remove(address);
                Err(ReconcileError::provider(address)(e))
            }
        }
    }

    pub async fn update(&mut self, block: &Block) -> Result<(), ReconcileError> {
        let address = &block.address;
        let resource = Self::resource(address)?;
        let prior = self.known.get(address).cloned().ok_or_else(|| ReconcileError::NotInState(address.clone()))?;
        let mut config = resolved_config(block, &self.known)?;
        resource.check(&config).map_err(ReconcileError::provider(address))?;
        resource.schema().apply_defaults(&mut config);

        let mut state = prior.clone();
        state.touch(ResourceStatus::Updating);
        self.save(state.clone()).await?;

        info!(address = %address, "updating");
        let mut data = ResourceData::new(config.clone()).with_prior(prior.attributes.clone());
        data.id = prior.id.clone();
        if let Err(e) = run(resource.as_ref(), Operation::Update, &mut data, self.meta).await {
            let mut restored = prior;
            restored.touch(ResourceStatus::Present);
            self.save(restored).await?;
            return Err(ReconcileError::provider(address)(e));
        }

        state.config_hash = config_hash(&config);
        state.config = config;
        state.dependencies = block.dependencies();
        state.id = data.id;
        state.attributes = data.attributes;
        state.touch(ResourceStatus::Present);
        self.save(state).await
    }

    /// Delete the remote object, if any, and forget the entry.
    pub async fn remove(&mut self, address: &ResourceAddress) -> Result<(), ReconcileError> {
        let Some(prior) = self.known.get(address).cloned() else {
            return Ok(());
        };
        if let Some(id) = prior.id.clone().filter(|_| !address.is_data()) {
            let resource = Self::resource(address)?;
            let mut state = prior.clone();
            state.touch(ResourceStatus::Deleting);
            self.save(state).await?;

            info!(address = %address, id, "deleting");
            let mut data = ResourceData::new(prior.attributes.clone());
            data.set_id(id);
            if let Err(e) = run(resource.as_ref(), Operation::Delete, &mut data, self.meta).await {
                self.save(prior).await?;
                return Err(ReconcileError::provider(address)(e));
            }
        }
        self.store.delete(address).await?;
        self.known.remove(address);
        Ok(())
    }

    /// Look up a data source and cache the result.
    pub async fn read(&mut self, block: &Block) -> Result<(), ReconcileError> {
        let address = &block.address;
        let source = registry::data_source(&address.type_name).map_err(ReconcileError::provider(address))?;
        let config = resolved_config(block, &self.known)?;
        source.check(&config).map_err(ReconcileError::provider(address))?;

        let mut data = ResourceData::new(config.clone());
        read_data_source(source.as_ref(), &mut data, self.meta)
            .await
            .map_err(ReconcileError::provider(address))?;

        let mut state = ResourceState::new(address.clone(), config);
        state.id = data.id;
        state.attributes = data.attributes;
        state.dependencies = block.dependencies();
        state.touch(ResourceStatus::Present);
        self.save(state).await
    }
}
