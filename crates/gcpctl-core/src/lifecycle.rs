//! Resource lifecycle orchestration
//!
//! [`Lifecycle`] ties the compute client, the operation poller, and a state
//! store together:
//!
//! - `create` submits the insert, waits for the operation, reads back the
//!   platform id, records `logical name -> id`, and sets `remote_id`.
//! - `delete` submits the delete, waits, then drops the record and clears
//!   `remote_id`.
//! - `resolve_instance_ip` finds an instance's internal IP by listing the
//!   zone.
//!
//! Failures are never retried or suppressed. A create that fails leaves no
//! `remote_id` and no record. A delete that fails leaves both in place.

use tracing::{debug, info, warn};

use crate::compute::{
    Collection, ComputeClient, ComputeResource, Location, Operation, OperationHandle,
    find_by_name,
};
use crate::error::{CoreError, Result};
use crate::progress::{PollConfig, ProgressCallback, poll_operation};
use crate::resource::{ResourceDescriptor, ResourceKind, validate_name};
use crate::state::{StateRecord, StateStore};

/// Store attribute holding an instance's internal IP
pub const IP_ATTRIBUTE: &str = "ip";

/// Which network interface to read an IP from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterfaceSelector {
    /// The instance must have exactly one interface
    #[default]
    Only,
    /// Interface at this position
    Index(usize),
}

/// Create/delete orchestrator bound to one client, zone and store
pub struct Lifecycle<S: StateStore> {
    client: ComputeClient,
    zone: String,
    store: S,
    poll: PollConfig,
    tolerate_missing: bool,
    on_progress: Option<ProgressCallback>,
}

impl<S: StateStore> Lifecycle<S> {
    pub fn new(client: ComputeClient, zone: impl Into<String>, store: S, poll: PollConfig) -> Self {
        Self {
            client,
            zone: zone.into(),
            store,
            poll,
            tolerate_missing: false,
            on_progress: None,
        }
    }

    /// Treat a 404 on delete submission as already deleted
    pub fn tolerate_missing(mut self, tolerate: bool) -> Self {
        self.tolerate_missing = tolerate;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn client(&self) -> &ComputeClient {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Create the remote resource and return its platform id
    pub async fn create(&self, descriptor: &mut ResourceDescriptor) -> Result<String> {
        if let Some(existing) = &descriptor.remote_id {
            return Err(CoreError::Validation(format!(
                "{} '{}' already has remote id {}",
                descriptor.kind(),
                descriptor.logical_name,
                existing
            )));
        }
        validate_name(&descriptor.logical_name)?;

        let kind = descriptor.kind();
        let name = descriptor.logical_name.as_str();
        self.check_tracked_kind(name, kind).await?;
        let zone = descriptor.zone.as_deref().unwrap_or(&self.zone);
        let body = descriptor.config.request_body(name, zone);

        info!("Creating {} '{}'", kind, name);
        let submitted = match kind {
            ResourceKind::Instance => self.client.instances(zone).insert(&body).await,
            ResourceKind::Disk => self.client.disks(zone).insert(&body).await,
            ResourceKind::Network => self.client.networks().insert(&body).await,
            ResourceKind::Image => self.client.images().insert(&body).await,
            ResourceKind::FirewallRule => self.client.firewalls().insert(&body).await,
        }?;
        let done = self.wait(&submitted.handle_in(&location(kind, zone))).await?;

        let remote_id = match self.remote_id_of(kind, zone, name).await? {
            Some(id) => id,
            None => done.target_id.clone().ok_or_else(|| CoreError::Transport {
                status: None,
                message: format!("{kind} '{name}' was created but reports no id"),
            })?,
        };

        let record_zone = kind.is_zonal().then(|| zone.to_string());
        self.store
            .put(name, StateRecord::new(&remote_id, kind, record_zone))
            .await?;

        info!("Created {} '{}' with id {}", kind, name, remote_id);
        descriptor.remote_id = Some(remote_id.clone());
        Ok(remote_id)
    }

    /// Delete a resource this descriptor created
    pub async fn delete(&self, descriptor: &mut ResourceDescriptor) -> Result<()> {
        if descriptor.remote_id.is_none() {
            return Err(CoreError::Validation(format!(
                "{} '{}' has no remote id; nothing to delete",
                descriptor.kind(),
                descriptor.logical_name
            )));
        }
        validate_name(&descriptor.logical_name)?;

        let zone = descriptor.zone.as_deref().unwrap_or(&self.zone);
        self.delete_remote(descriptor.kind(), zone, &descriptor.logical_name)
            .await?;
        descriptor.remote_id = None;
        Ok(())
    }

    /// Fill in `remote_id` for a descriptor that was not created through it
    ///
    /// A store record wins when there is one and its kind matches; otherwise
    /// the platform is asked. Nothing is written to the store.
    pub async fn adopt(&self, descriptor: &mut ResourceDescriptor) -> Result<String> {
        validate_name(&descriptor.logical_name)?;
        let kind = descriptor.kind();
        let name = descriptor.logical_name.clone();

        let remote_id = match self.store.get(&name).await? {
            Some(record) if record.kind == kind => {
                if descriptor.zone.is_none() {
                    descriptor.zone = record.zone;
                }
                record.remote_id
            }
            Some(record) => return Err(kind_mismatch(&name, record.kind, kind)),
            None => {
                let zone = descriptor.zone.as_deref().unwrap_or(&self.zone);
                self.remote_id_of(kind, zone, &name)
                    .await?
                    .ok_or_else(|| CoreError::Transport {
                        status: None,
                        message: format!("{kind} '{name}' reports no id"),
                    })?
            }
        };

        debug!("Adopted {} '{}' with id {}", kind, name, remote_id);
        descriptor.remote_id = Some(remote_id.clone());
        Ok(remote_id)
    }

    /// Delete a resource known only by its logical name in the store
    pub async fn delete_by_name(&self, logical_name: &str) -> Result<()> {
        validate_name(logical_name)?;
        let record = self
            .store
            .get(logical_name)
            .await?
            .ok_or_else(|| CoreError::not_found("tracked resource", logical_name))?;

        let zone = record.zone.as_deref().unwrap_or(&self.zone);
        self.delete_remote(record.kind, zone, logical_name).await
    }

    /// Internal IP of a named instance
    ///
    /// The zone comes from the store record when there is one, otherwise the
    /// orchestrator's zone. The IP is recorded on the store record if present.
    pub async fn resolve_instance_ip(
        &self,
        name: &str,
        selector: InterfaceSelector,
    ) -> Result<String> {
        validate_name(name)?;
        let record = self.store.get(name).await?;
        let zone = record
            .as_ref()
            .and_then(|r| r.zone.as_deref())
            .unwrap_or(&self.zone);

        let instances = self.client.instances(zone).list().await?;
        let instance = find_by_name(&instances, name)
            .ok_or_else(|| CoreError::not_found("instance", name))?;

        let interfaces = &instance.network_interfaces;
        let interface = match selector {
            InterfaceSelector::Only if interfaces.len() == 1 => &interfaces[0],
            InterfaceSelector::Only => {
                return Err(CoreError::not_found(
                    "network interface",
                    format!("{name} (expected exactly one, found {})", interfaces.len()),
                ));
            }
            InterfaceSelector::Index(i) => interfaces
                .get(i)
                .ok_or_else(|| CoreError::not_found("network interface", format!("{name}#{i}")))?,
        };
        let ip = interface
            .network_ip
            .clone()
            .ok_or_else(|| CoreError::not_found("network IP", name))?;

        if let Some(record) = record {
            self.store
                .put(name, record.with_attribute(IP_ATTRIBUTE, &ip))
                .await?;
        }

        debug!("Instance '{}' has IP {}", name, ip);
        Ok(ip)
    }

    /// Wait for an operation under this orchestrator's polling discipline
    pub async fn wait(&self, handle: &OperationHandle) -> Result<Operation> {
        poll_operation(&self.client, handle, &self.poll, self.on_progress.as_ref()).await
    }

    async fn delete_remote(&self, kind: ResourceKind, zone: &str, name: &str) -> Result<()> {
        info!("Deleting {} '{}'", kind, name);
        let submitted = match kind {
            ResourceKind::Instance => self.client.instances(zone).delete(name).await,
            ResourceKind::Disk => self.client.disks(zone).delete(name).await,
            ResourceKind::Network => self.client.networks().delete(name).await,
            ResourceKind::Image => self.client.images().delete(name).await,
            ResourceKind::FirewallRule => self.client.firewalls().delete(name).await,
        };

        match submitted {
            Ok(op) => {
                self.wait(&op.handle_in(&location(kind, zone))).await?;
            }
            Err(e) if e.is_not_found() && self.tolerate_missing => {
                warn!("{} '{}' is already gone", kind, name);
            }
            Err(e) => return Err(e),
        }

        match self.store.get(name).await? {
            Some(record) if record.kind == kind => {
                self.store.remove(name).await?;
            }
            Some(record) => debug!("'{}' stays tracked as a {}", name, record.kind),
            None => {}
        }
        info!("Deleted {} '{}'", kind, name);
        Ok(())
    }

    /// A logical name maps to one resource; refuse to reuse it for another kind
    async fn check_tracked_kind(&self, name: &str, kind: ResourceKind) -> Result<()> {
        match self.store.get(name).await? {
            Some(record) if record.kind != kind => Err(kind_mismatch(name, record.kind, kind)),
            _ => Ok(()),
        }
    }

    async fn remote_id_of(
        &self,
        kind: ResourceKind,
        zone: &str,
        name: &str,
    ) -> Result<Option<String>> {
        match kind {
            ResourceKind::Instance => id_of(self.client.instances(zone), name).await,
            ResourceKind::Disk => id_of(self.client.disks(zone), name).await,
            ResourceKind::Network => id_of(self.client.networks(), name).await,
            ResourceKind::Image => id_of(self.client.images(), name).await,
            ResourceKind::FirewallRule => id_of(self.client.firewalls(), name).await,
        }
    }
}

fn location(kind: ResourceKind, zone: &str) -> Location {
    if kind.is_zonal() {
        Location::Zone(zone.to_string())
    } else {
        Location::Global
    }
}

fn kind_mismatch(name: &str, tracked: ResourceKind, wanted: ResourceKind) -> CoreError {
    CoreError::Validation(format!("'{name}' is already tracked as {tracked}, not {wanted}"))
}

async fn id_of<T: ComputeResource>(collection: Collection<'_, T>, name: &str) -> Result<Option<String>> {
    let resource = collection.get(name).await?;
    Ok(resource.id().map(String::from))
}
