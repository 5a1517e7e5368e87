//! Create and delete commands for each resource kind

use gcpctl_core::{
    DiskConfig, FileStateStore, FirewallAllow, FirewallRuleConfig, InstanceConfig,
    InterfaceSelector, Lifecycle, NetworkConfig, ResourceDescriptor, ResourceKind, StateStore,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cli::{
    DiskCommands, FirewallCommands, ImageCommands, InstanceCommands, NetworkCommands, OutputFormat,
};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::print_output;
use crate::progress::spinner;

/// What a create or delete command prints
#[derive(Debug, Serialize)]
struct ResourceSummary {
    name: String,
    kind: ResourceKind,
    remote_id: Option<String>,
    zone: Option<String>,
    status: &'static str,
}

impl ResourceSummary {
    fn new(descriptor: &ResourceDescriptor, zone: Option<String>, status: &'static str) -> Self {
        Self {
            name: descriptor.logical_name.clone(),
            kind: descriptor.kind(),
            remote_id: descriptor.remote_id.clone(),
            zone,
            status,
        }
    }
}

async fn lifecycle_for(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    action: &str,
) -> CliResult<Lifecycle<FileStateStore>> {
    Ok(conn_mgr
        .lifecycle(profile_name)
        .await?
        .with_progress(spinner(action)))
}

/// Create `descriptor` and print the result
async fn create(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    mut descriptor: ResourceDescriptor,
    output_format: OutputFormat,
) -> CliResult<()> {
    let action = format!("Creating {} {}", descriptor.kind(), descriptor.logical_name);
    let lifecycle = lifecycle_for(conn_mgr, profile_name, &action).await?;

    lifecycle.create(&mut descriptor).await?;

    let zone = descriptor
        .kind()
        .is_zonal()
        .then(|| descriptor.zone.clone().unwrap_or_else(|| lifecycle.zone().to_string()));
    print_output(
        ResourceSummary::new(&descriptor, zone, "created"),
        output_format.into(),
    )?;
    Ok(())
}

/// Delete the resource `descriptor` names, whether or not it is tracked
async fn delete(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    mut descriptor: ResourceDescriptor,
    tolerate_missing: bool,
    output_format: OutputFormat,
) -> CliResult<()> {
    let action = format!("Deleting {} {}", descriptor.kind(), descriptor.logical_name);
    let lifecycle = lifecycle_for(conn_mgr, profile_name, &action)
        .await?
        .tolerate_missing(tolerate_missing);

    let status = match lifecycle.adopt(&mut descriptor).await {
        Ok(remote_id) => {
            debug!("Deleting {} with id {}", descriptor.logical_name, remote_id);
            lifecycle.delete(&mut descriptor).await?;
            "deleted"
        }
        Err(e) if e.is_not_found() && tolerate_missing => {
            warn!("{} '{}' is already gone", descriptor.kind(), descriptor.logical_name);
            "absent"
        }
        Err(e) => return Err(e.into()),
    };

    let zone = descriptor.kind().is_zonal().then(|| {
        descriptor
            .zone
            .clone()
            .unwrap_or_else(|| lifecycle.zone().to_string())
    });
    print_output(
        ResourceSummary::new(&descriptor, zone, status),
        output_format.into(),
    )?;
    Ok(())
}

/// Handle `gcpctl delete <name>`
pub async fn handle_delete_by_name(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    name: &str,
    tolerate_missing: bool,
    output_format: OutputFormat,
) -> CliResult<()> {
    let action = format!("Deleting {}", name);
    let lifecycle = lifecycle_for(conn_mgr, profile_name, &action)
        .await?
        .tolerate_missing(tolerate_missing);

    let record = lifecycle.store().get(name).await?;
    lifecycle.delete_by_name(name).await?;

    let summary = match record {
        Some(record) => serde_json::json!({
            "name": name,
            "kind": record.kind,
            "remote_id": record.remote_id,
            "zone": record.zone,
            "status": "deleted",
        }),
        None => serde_json::json!({ "name": name, "status": "deleted" }),
    };
    print_output(summary, output_format.into())?;
    Ok(())
}

pub async fn handle_instance_command(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    cmd: &InstanceCommands,
    output_format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        InstanceCommands::Create {
            name,
            image,
            machine_type,
            network,
            tags,
            metadata,
            no_external_ip,
            zone,
        } => {
            let mut config = InstanceConfig::new(image);
            config.machine_type = machine_type.clone();
            config.network = network.clone();
            config.external_ip = !no_external_ip;
            config.tags = tags.clone();
            config.metadata = metadata.iter().cloned().collect();

            let descriptor = with_zone(ResourceDescriptor::instance(name, config), zone);
            create(conn_mgr, profile_name, descriptor, output_format).await
        }
        InstanceCommands::Delete {
            name,
            zone,
            tolerate_missing,
        } => {
            let descriptor = with_zone(
                ResourceDescriptor::instance(name, InstanceConfig::new("")),
                zone,
            );
            delete(
                conn_mgr,
                profile_name,
                descriptor,
                *tolerate_missing,
                output_format,
            )
            .await
        }
        InstanceCommands::Ip { name, interface } => {
            let lifecycle = conn_mgr.lifecycle(profile_name).await?;
            let selector = interface
                .map(InterfaceSelector::Index)
                .unwrap_or_default();
            let ip = lifecycle.resolve_instance_ip(name, selector).await?;

            match output_format {
                OutputFormat::Json | OutputFormat::Yaml => print_output(
                    serde_json::json!({ "name": name, "ip": ip }),
                    output_format.into(),
                )?,
                OutputFormat::Auto | OutputFormat::Table => println!("{}", ip),
            }
            Ok(())
        }
    }
}

pub async fn handle_network_command(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    cmd: &NetworkCommands,
    output_format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        NetworkCommands::Create { name, description } => {
            let config = NetworkConfig {
                description: description.clone(),
            };
            let descriptor = ResourceDescriptor::network(name, config);
            create(conn_mgr, profile_name, descriptor, output_format).await
        }
        NetworkCommands::Delete {
            name,
            tolerate_missing,
        } => {
            let descriptor = ResourceDescriptor::network(name, NetworkConfig::default());
            delete(
                conn_mgr,
                profile_name,
                descriptor,
                *tolerate_missing,
                output_format,
            )
            .await
        }
    }
}

pub async fn handle_image_command(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    cmd: &ImageCommands,
    output_format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        ImageCommands::Create { name, source_url } => {
            let descriptor = ResourceDescriptor::image(name, source_url);
            create(conn_mgr, profile_name, descriptor, output_format).await
        }
        ImageCommands::Delete {
            name,
            tolerate_missing,
        } => {
            let descriptor = ResourceDescriptor::image(name, "");
            delete(
                conn_mgr,
                profile_name,
                descriptor,
                *tolerate_missing,
                output_format,
            )
            .await
        }
    }
}

pub async fn handle_firewall_command(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    cmd: &FirewallCommands,
    output_format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        FirewallCommands::Create {
            network,
            rule,
            allow,
            source_ranges,
            source_tags,
            target_tags,
        } => {
            let allowed = allow
                .iter()
                .map(|a| a.parse::<FirewallAllow>())
                .collect::<Result<Vec<_>, _>>()?;
            let config = FirewallRuleConfig {
                network: network.clone(),
                allowed,
                source_ranges: source_ranges.clone(),
                source_tags: source_tags.clone(),
                target_tags: target_tags.clone(),
            };
            let descriptor = ResourceDescriptor::firewall_rule(rule, config);
            create(conn_mgr, profile_name, descriptor, output_format).await
        }
        FirewallCommands::Delete {
            network,
            rule,
            tolerate_missing,
        } => {
            let config = FirewallRuleConfig {
                network: network.clone(),
                allowed: Vec::new(),
                source_ranges: Vec::new(),
                source_tags: Vec::new(),
                target_tags: Vec::new(),
            };
            let descriptor = ResourceDescriptor::firewall_rule(rule, config);
            delete(
                conn_mgr,
                profile_name,
                descriptor,
                *tolerate_missing,
                output_format,
            )
            .await
        }
    }
}

pub async fn handle_disk_command(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    cmd: &DiskCommands,
    output_format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        DiskCommands::Create {
            name,
            size_gb,
            disk_type,
            source_image,
            zone,
        } => {
            let config = DiskConfig {
                size_gb: *size_gb,
                disk_type: disk_type.clone(),
                source_image: source_image.clone(),
            };
            let descriptor = with_zone(ResourceDescriptor::disk(name, config), zone);
            create(conn_mgr, profile_name, descriptor, output_format).await
        }
        DiskCommands::Delete {
            name,
            zone,
            tolerate_missing,
        } => {
            let descriptor = with_zone(ResourceDescriptor::disk(name, DiskConfig::default()), zone);
            delete(
                conn_mgr,
                profile_name,
                descriptor,
                *tolerate_missing,
                output_format,
            )
            .await
        }
    }
}

fn with_zone(descriptor: ResourceDescriptor, zone: &Option<String>) -> ResourceDescriptor {
    match zone {
        Some(zone) => descriptor.in_zone(zone),
        None => descriptor,
    }
}
