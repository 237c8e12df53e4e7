//! Plan, apply, refresh and destroy over a declaration and a state file

use anyhow::{Context as AnyhowContext, Result, anyhow, bail};
use declarative::{
    Action, Applier, ApplyResult, Attributes, ExecutionPlan, ResourceData, ResourceDiff, Value,
    refresh_all,
};
use runscope::Client;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use super::graph::{self, Reference};
use crate::error::is_not_found;
use crate::provider::Provider;
use crate::schema::Declaration;
use crate::state::{ResourceState, State};

/// Shown in plans for values that depend on resources not created yet
pub const UNKNOWN: &str = "(known after apply)";

/// One declared resource
#[derive(Debug, Clone)]
struct Node {
    resource_type: String,
    name: String,
    declared: Attributes,
    dependencies: BTreeSet<String>,
}

/// What a refresh did to one stored resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Unchanged,
    Updated,
    /// The remote entity no longer exists; dropped from state
    Gone,
    Failed(String),
}

pub struct Engine<'a> {
    provider: &'a Provider,
    client: &'a Client,
    state: State,
    state_path: PathBuf,
    /// Declared resources in dependency order
    nodes: BTreeMap<String, Node>,
    order: Vec<String>,
    /// Declared data sources: address → (type, attributes)
    data_nodes: BTreeMap<String, (String, Attributes)>,
    /// Results of data source reads, id included
    data: BTreeMap<String, Attributes>,
}

impl<'a> Engine<'a> {
    pub fn new(
        provider: &'a Provider,
        client: &'a Client,
        declaration: &Declaration,
        state: State,
        state_path: PathBuf,
    ) -> Result<Self> {
        let mut nodes = BTreeMap::new();
        for declared in declaration.resources() {
            provider.resource(declared.resource_type)?;
            let address = declared.address();
            let dependencies = graph::dependencies(declared.attributes)
                .with_context(|| format!("Invalid reference in {address}"))?;
            nodes.insert(
                address,
                Node {
                    resource_type: declared.resource_type.to_string(),
                    name: declared.name.to_string(),
                    declared: declared.attributes.clone(),
                    dependencies,
                },
            );
        }

        let mut data_nodes = BTreeMap::new();
        for declared in declaration.data_sources() {
            provider.data_source(declared.resource_type)?;
            data_nodes.insert(
                declared.data_address(),
                (
                    declared.resource_type.to_string(),
                    declared.attributes.clone(),
                ),
            );
        }

        let mut edges: BTreeMap<String, BTreeSet<String>> = nodes
            .iter()
            .map(|(address, node)| (address.clone(), node.dependencies.clone()))
            .collect();
        for address in data_nodes.keys() {
            edges.insert(address.clone(), BTreeSet::new());
        }
        let order = graph::order(&edges)?
            .into_iter()
            .filter(|address| nodes.contains_key(address))
            .collect();

        Ok(Self {
            provider,
            client,
            state,
            state_path,
            nodes,
            order,
            data_nodes,
            data: BTreeMap::new(),
        })
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    fn save(&mut self) -> Result<()> {
        self.state.save(&self.state_path)
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Current value of a referenced attribute, if known
    fn lookup(&self, reference: &Reference) -> Option<Value> {
        let address = reference.address();
        if reference.data {
            return self.data.get(&address)?.get(&reference.attribute).cloned();
        }
        let stored = self.state.get(&address)?;
        if reference.attribute == "id" {
            return Some(Value::from(stored.id.as_str()));
        }
        stored.attributes.get(&reference.attribute).cloned()
    }

    /// Resolve every reference of a node, failing on anything still unknown
    fn resolve_for_apply(&self, address: &str) -> Result<Attributes> {
        let node = self.node(address)?;
        let (resolved, unknown) =
            graph::resolve_attributes(&node.declared, &|r| self.lookup(r))?;
        if let Some(name) = unknown.first() {
            bail!("{address}: \"{name}\" references a value that is not known yet");
        }
        let schema = self.provider.resource(&node.resource_type)?.schema();
        schema
            .validate(&resolved)
            .with_context(|| format!("Invalid attributes for {address}"))
    }

    fn node(&self, address: &str) -> Result<&Node> {
        self.nodes
            .get(address)
            .ok_or_else(|| anyhow!("{address} is not declared"))
    }

    // ========================================================================
    // Data sources
    // ========================================================================

    /// Read every declared data source
    ///
    /// Data sources may reference each other and resources already in state.
    pub fn read_data_sources(&mut self) -> Result<()> {
        let edges: BTreeMap<String, BTreeSet<String>> = self
            .data_nodes
            .iter()
            .map(|(address, (_, attributes))| -> Result<(String, BTreeSet<String>)> {
                let deps = graph::dependencies(attributes)?
                    .into_iter()
                    .filter(|dep| self.data_nodes.contains_key(dep))
                    .collect();
                Ok((address.clone(), deps))
            })
            .collect::<Result<_>>()?;

        for address in graph::order(&edges)? {
            let (data_source_type, declared) = &self.data_nodes[&address];
            let data_source = self.provider.data_source(data_source_type)?;

            let (resolved, unknown) =
                graph::resolve_attributes(declared, &|r| self.lookup(r))?;
            if let Some(name) = unknown.first() {
                bail!("{address}: \"{name}\" references a value that is not known yet; apply first");
            }
            let validated = data_source
                .schema()
                .validate(&resolved)
                .with_context(|| format!("Invalid attributes for {address}"))?;

            let mut data = ResourceData::new(validated);
            data_source
                .read(self.client, &mut data)
                .with_context(|| format!("Failed to read {address}"))?;
            log::info!("Read {address} (id {})", data.id());

            let (id, mut attributes) = data.into_parts();
            attributes.insert("id".to_string(), Value::String(id));
            self.data.insert(address, attributes);
        }
        Ok(())
    }

    /// Results of the data source reads
    pub fn data(&self) -> &BTreeMap<String, Attributes> {
        &self.data
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Re-read every stored resource, dropping the ones that are gone
    pub fn refresh(&mut self, jobs: usize) -> Result<Vec<(String, RefreshOutcome)>> {
        let stored: Vec<ResourceState> = self.state.resources.values().cloned().collect();
        let provider = self.provider;
        let client = self.client;

        let results = refresh_all(&stored, jobs, |entry| {
            let resource = provider.resource(&entry.resource_type)?;
            let attributes = resource.schema().normalize(&entry.attributes);
            let mut data = ResourceData::with_id(&entry.id, attributes);
            resource.read(client, &mut data)?;
            Ok::<_, anyhow::Error>(data)
        })?;

        let mut outcomes = Vec::with_capacity(results.len());
        let mut changed = false;
        for (entry, outcome) in stored.into_iter().zip(results) {
            let address = entry.address();
            let outcome = match outcome {
                Err(e) => RefreshOutcome::Failed(format!("{e:#}")),
                Ok(data) if !data.has_id() => {
                    self.state.remove(&address);
                    changed = true;
                    RefreshOutcome::Gone
                }
                Ok(data) => {
                    let before = self
                        .provider
                        .resource(&entry.resource_type)?
                        .schema()
                        .normalize(&entry.attributes);
                    let (id, attributes) = data.into_parts();
                    if id == entry.id && attributes == before {
                        RefreshOutcome::Unchanged
                    } else {
                        self.state.upsert(ResourceState {
                            id,
                            attributes,
                            ..entry
                        });
                        changed = true;
                        RefreshOutcome::Updated
                    }
                }
            };
            log::debug!("refresh {address}: {outcome:?}");
            outcomes.push((address, outcome));
        }

        if changed {
            self.save()?;
        }
        Ok(outcomes)
    }

    // ========================================================================
    // Planning
    // ========================================================================

    /// Compare declared resources with stored state
    ///
    /// Orphaned resources (stored but no longer declared) are deleted
    /// first, dependents before what they depend on. Declared resources
    /// follow in dependency order.
    pub fn plan(&self) -> Result<ExecutionPlan> {
        let mut plan = ExecutionPlan::new();

        let orphans: Vec<&ResourceState> = self
            .state
            .resources
            .iter()
            .filter(|(address, _)| !self.nodes.contains_key(*address))
            .map(|(_, entry)| entry)
            .collect();
        for entry in reverse_order(&orphans)? {
            plan.push(self.delete_diff(entry)?);
        }

        // Addresses whose attributes will all be new after apply
        let mut pending: BTreeSet<String> = BTreeSet::new();
        for address in &self.order {
            let node = &self.nodes[address];
            let resource = self.provider.resource(&node.resource_type)?;
            let schema = resource.schema();

            let lookup = |r: &Reference| {
                if pending.contains(&r.address()) {
                    None
                } else {
                    self.lookup(r)
                }
            };
            let (mut resolved, unknown) = graph::resolve_attributes(&node.declared, &lookup)
                .with_context(|| format!("Invalid reference in {address}"))?;
            for name in &unknown {
                resolved.insert(name.clone(), Value::from(UNKNOWN));
            }
            let declared = schema
                .validate_pending(&resolved, &unknown)
                .with_context(|| format!("Invalid attributes for {address}"))?;

            let stored = self
                .state
                .get(address)
                .map(|entry| schema.normalize(&entry.attributes));

            let mut diff = ResourceDiff::compute(
                &node.resource_type,
                &node.name,
                schema,
                stored.as_ref(),
                Some(&declared),
            );
            if diff.action == Action::Update && !resource.can_update() {
                diff.action = Action::Replace;
            }
            if matches!(diff.action, Action::Create | Action::Replace) {
                pending.insert(address.clone());
            }
            plan.push(diff);
        }

        Ok(plan)
    }

    /// Delete everything in state, dependents first
    pub fn destroy_plan(&self) -> Result<ExecutionPlan> {
        let entries: Vec<&ResourceState> = self.state.resources.values().collect();
        let mut plan = ExecutionPlan::new();
        for entry in reverse_order(&entries)? {
            plan.push(self.delete_diff(entry)?);
        }
        Ok(plan)
    }

    fn delete_diff(&self, entry: &ResourceState) -> Result<ResourceDiff> {
        let schema = self.provider.resource(&entry.resource_type)?.schema();
        Ok(ResourceDiff::compute(
            &entry.resource_type,
            &entry.name,
            schema,
            Some(&entry.attributes),
            None,
        ))
    }

    // ========================================================================
    // Applying
    // ========================================================================

    fn create(&mut self, address: &str) -> Result<()> {
        let attributes = self.resolve_for_apply(address)?;
        let node = self.node(address)?.clone();
        let resource = self.provider.resource(&node.resource_type)?;

        let mut data = ResourceData::new(attributes);
        let created = resource.create(self.client, &mut data);

        // A failed second phase still leaves a remote entity behind
        if data.has_id() {
            self.record(&node, data)?;
        }
        created.with_context(|| format!("Failed to create {address}"))?;

        if self.state.get(address).is_none() {
            bail!("{address} was created but could not be read back");
        }
        Ok(())
    }

    fn update(&mut self, address: &str) -> Result<()> {
        let declared = self.resolve_for_apply(address)?;
        let node = self.node(address)?.clone();
        let resource = self.provider.resource(&node.resource_type)?;
        let stored = self
            .state
            .get(address)
            .ok_or_else(|| anyhow!("{address} is not in state"))?;
        let prior = resource.schema().normalize(&stored.attributes);

        // Computed attributes are not declared; carry them over
        let mut attributes = prior.clone();
        for attribute in resource.schema().attributes() {
            if !attribute.is_computed() {
                attributes.remove(attribute.name);
            }
        }
        attributes.extend(declared);

        let mut data = ResourceData::with_id(&stored.id, attributes).with_prior(prior);
        resource
            .update(self.client, &mut data)
            .with_context(|| format!("Failed to update {address}"))?;

        if !data.has_id() {
            self.state.remove(address);
            self.save()?;
            bail!("{address} disappeared while it was being updated");
        }
        self.record(&node, data)
    }

    fn delete(&mut self, address: &str, tolerate_missing: bool) -> Result<()> {
        let stored = self
            .state
            .get(address)
            .ok_or_else(|| anyhow!("{address} is not in state"))?
            .clone();
        let resource = self.provider.resource(&stored.resource_type)?;
        let attributes = resource.schema().normalize(&stored.attributes);

        let mut data = ResourceData::with_id(&stored.id, attributes);
        match resource.delete(self.client, &mut data) {
            Ok(()) => {}
            Err(e) if tolerate_missing && is_not_found(&e) => {
                log::info!("{address} was already gone");
            }
            Err(e) => return Err(e.context(format!("Failed to delete {address}"))),
        }

        self.state.remove(address);
        self.save()
    }

    fn record(&mut self, node: &Node, data: ResourceData) -> Result<()> {
        let (id, attributes) = data.into_parts();
        self.state.upsert(ResourceState {
            resource_type: node.resource_type.clone(),
            name: node.name.clone(),
            id,
            attributes,
            dependencies: node.dependencies.iter().cloned().collect(),
        });
        self.save()
    }
}

impl Applier for Engine<'_> {
    fn apply_change(&mut self, change: &ResourceDiff) -> Result<ApplyResult> {
        let address = change.address.as_str();
        log::info!("{} {address}", change.action);
        match change.action {
            Action::NoOp => return Ok(ApplyResult::NoChange),
            Action::Create => self.create(address)?,
            Action::Update => self.update(address)?,
            Action::Replace => {
                self.delete(address, true)?;
                self.create(address)?;
            }
            Action::Delete => self.delete(address, false)?,
        }
        Ok(match change.action {
            Action::Create => ApplyResult::Created,
            Action::Update => ApplyResult::Updated,
            Action::Replace => ApplyResult::Replaced,
            Action::Delete => ApplyResult::Deleted,
            Action::NoOp => ApplyResult::NoChange,
        })
    }
}

/// Stored entries ordered so dependents come before their dependencies
fn reverse_order<'s>(entries: &[&'s ResourceState]) -> Result<Vec<&'s ResourceState>> {
    let by_address: BTreeMap<String, &ResourceState> =
        entries.iter().map(|e| (e.address(), *e)).collect();
    let edges: BTreeMap<String, BTreeSet<String>> = by_address
        .iter()
        .map(|(address, entry)| {
            let deps = entry
                .dependencies
                .iter()
                .filter(|d| by_address.contains_key(*d))
                .cloned()
                .collect();
            (address.clone(), deps)
        })
        .collect();

    let mut ordered = graph::order(&edges)?;
    ordered.reverse();
    Ok(ordered
        .iter()
        .filter_map(|address| by_address.get(address).copied())
        .collect())
}
