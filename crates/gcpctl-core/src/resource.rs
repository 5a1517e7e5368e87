//! Resource descriptors
//!
//! A [`ResourceDescriptor`] is the caller's local handle on one remote
//! object: a logical name, the desired configuration, and (once created)
//! the platform-assigned id. The kind is derived from the configuration
//! variant so the two cannot disagree.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{CoreError, Result};

/// Longest name the platform accepts
pub const MAX_NAME_LEN: usize = 63;

/// Machine type used when none is configured
pub const DEFAULT_MACHINE_TYPE: &str = "n1-standard-1";

/// Network instances attach to when none is configured
pub const DEFAULT_NETWORK: &str = "default";

/// Description sent for networks created without one
pub const DEFAULT_NETWORK_DESCRIPTION: &str = "gcpctl generated network";

/// Service account scopes granted to new instances
pub const DEFAULT_INSTANCE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/devstorage.read_write",
    "https://www.googleapis.com/auth/logging.write",
];

/// Managed resource kinds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Instance,
    Network,
    Image,
    FirewallRule,
    Disk,
}

impl ResourceKind {
    /// Zonal kinds live under `zones/{zone}`; the rest are global
    pub fn is_zonal(self) -> bool {
        matches!(self, ResourceKind::Instance | ResourceKind::Disk)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Instance => "instance",
            ResourceKind::Network => "network",
            ResourceKind::Image => "image",
            ResourceKind::FirewallRule => "firewall-rule",
            ResourceKind::Disk => "disk",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check a logical name against the platform naming rules
///
/// 1 to 63 characters, a lowercase letter first, then lowercase letters,
/// digits or `-`, not ending in `-`.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Err(CoreError::Validation(format!("invalid name '{name}': {reason}")));

    if name.is_empty() {
        return invalid("name is empty");
    }
    if name.len() > MAX_NAME_LEN {
        return invalid(&format!(
            "{} characters exceeds the limit of {}",
            name.len(),
            MAX_NAME_LEN
        ));
    }
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return invalid("must start with a lowercase letter");
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return invalid(&format!("character '{c}' is not allowed"));
    }
    if name.ends_with('-') {
        return invalid("must not end with '-'");
    }
    Ok(())
}

/// Compose the name of a firewall rule scoped to one network
pub fn firewall_rule_name(network: &str, rule: &str) -> String {
    format!("{network}-{rule}")
}

/// Expand a short name into a path relative to the project, leaving
/// anything that already looks like a path alone
fn qualify(value: &str, prefix: impl FnOnce() -> String) -> String {
    if value.contains('/') {
        value.to_string()
    } else {
        format!("{}/{}", prefix(), value)
    }
}

/// Desired configuration of a VM instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Boot disk source image, e.g. `projects/debian-cloud/global/images/family/debian-12`
    pub image: String,
    pub machine_type: String,
    pub network: String,
    /// Attach a one-to-one NAT access config
    pub external_ip: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub scopes: Vec<String>,
}

impl InstanceConfig {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            machine_type: DEFAULT_MACHINE_TYPE.to_string(),
            network: DEFAULT_NETWORK.to_string(),
            external_ip: true,
            tags: Vec::new(),
            metadata: BTreeMap::new(),
            scopes: DEFAULT_INSTANCE_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn body(&self, name: &str, zone: &str) -> Value {
        let mut interface = json!({
            "network": qualify(&self.network, || "global/networks".to_string()),
        });
        if self.external_ip {
            interface["accessConfigs"] = json!([
                { "type": "ONE_TO_ONE_NAT", "name": "External NAT" }
            ]);
        }

        let mut body = json!({
            "name": name,
            "machineType": qualify(&self.machine_type, || format!("zones/{zone}/machineTypes")),
            "disks": [{
                "boot": true,
                "autoDelete": true,
                "initializeParams": { "sourceImage": self.image },
            }],
            "networkInterfaces": [interface],
            "serviceAccounts": [{ "email": "default", "scopes": self.scopes }],
        });
        if !self.tags.is_empty() {
            body["tags"] = json!({ "items": self.tags });
        }
        if !self.metadata.is_empty() {
            let items: Vec<Value> = self
                .metadata
                .iter()
                .map(|(key, value)| json!({ "key": key, "value": value }))
                .collect();
            body["metadata"] = json!({ "items": items });
        }
        body
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub description: Option<String>,
}

/// Image built from a tarball already staged in object storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    pub source_url: String,
}

/// One protocol entry of a firewall rule, parsed from `tcp:22,80` or `icmp`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallAllow {
    pub protocol: String,
    #[serde(default)]
    pub ports: Vec<String>,
}

impl FromStr for FirewallAllow {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (protocol, ports) = match s.split_once(':') {
            Some((protocol, ports)) => (protocol, Some(ports)),
            None => (s, None),
        };
        let protocol = protocol.trim().to_ascii_lowercase();
        if protocol.is_empty() {
            return Err(CoreError::Validation(format!(
                "firewall allow entry '{s}' has no protocol"
            )));
        }
        let ports = ports
            .map(|p| {
                p.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self { protocol, ports })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallRuleConfig {
    /// Short network name the rule applies to
    pub network: String,
    pub allowed: Vec<FirewallAllow>,
    #[serde(default)]
    pub source_ranges: Vec<String>,
    #[serde(default)]
    pub source_tags: Vec<String>,
    #[serde(default)]
    pub target_tags: Vec<String>,
}

impl FirewallRuleConfig {
    fn body(&self, name: &str) -> Value {
        let allowed: Vec<Value> = self
            .allowed
            .iter()
            .map(|a| {
                if a.ports.is_empty() {
                    json!({ "IPProtocol": a.protocol })
                } else {
                    json!({ "IPProtocol": a.protocol, "ports": a.ports })
                }
            })
            .collect();

        let mut body = json!({
            "name": name,
            "network": qualify(&self.network, || "global/networks".to_string()),
            "allowed": allowed,
        });
        if !self.source_ranges.is_empty() {
            body["sourceRanges"] = json!(self.source_ranges);
        }
        if !self.source_tags.is_empty() {
            body["sourceTags"] = json!(self.source_tags);
        }
        if !self.target_tags.is_empty() {
            body["targetTags"] = json!(self.target_tags);
        }
        body
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskConfig {
    #[serde(default)]
    pub size_gb: Option<u64>,
    /// e.g. `pd-standard`, `pd-ssd`
    #[serde(default)]
    pub disk_type: Option<String>,
    #[serde(default)]
    pub source_image: Option<String>,
}

/// Kind-specific desired configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ResourceConfig {
    Instance(InstanceConfig),
    Network(NetworkConfig),
    Image(ImageConfig),
    FirewallRule(FirewallRuleConfig),
    Disk(DiskConfig),
}

impl ResourceConfig {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceConfig::Instance(_) => ResourceKind::Instance,
            ResourceConfig::Network(_) => ResourceKind::Network,
            ResourceConfig::Image(_) => ResourceKind::Image,
            ResourceConfig::FirewallRule(_) => ResourceKind::FirewallRule,
            ResourceConfig::Disk(_) => ResourceKind::Disk,
        }
    }

    /// Request body for the `insert` call; `zone` is ignored by global kinds
    pub fn request_body(&self, name: &str, zone: &str) -> Value {
        match self {
            ResourceConfig::Instance(cfg) => cfg.body(name, zone),
            ResourceConfig::Network(cfg) => json!({
                "name": name,
                "description": cfg
                    .description
                    .as_deref()
                    .unwrap_or(DEFAULT_NETWORK_DESCRIPTION),
            }),
            ResourceConfig::Image(cfg) => json!({
                "name": name,
                "rawDisk": { "source": cfg.source_url, "containerType": "TAR" },
            }),
            ResourceConfig::FirewallRule(cfg) => cfg.body(name),
            ResourceConfig::Disk(cfg) => {
                let mut body = json!({ "name": name });
                if let Some(size) = cfg.size_gb {
                    body["sizeGb"] = json!(size.to_string());
                }
                if let Some(disk_type) = &cfg.disk_type {
                    body["type"] = json!(qualify(disk_type, || format!("zones/{zone}/diskTypes")));
                }
                if let Some(image) = &cfg.source_image {
                    body["sourceImage"] = json!(image);
                }
                body
            }
        }
    }
}

/// The caller's handle on one remote object
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    pub logical_name: String,
    pub config: ResourceConfig,
    /// Zone for zonal kinds; falls back to the orchestrator's zone
    pub zone: Option<String>,
    /// Set once a create has completed, cleared once a delete has completed
    pub remote_id: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(logical_name: impl Into<String>, config: ResourceConfig) -> Self {
        Self {
            logical_name: logical_name.into(),
            config,
            zone: None,
            remote_id: None,
        }
    }

    pub fn instance(logical_name: impl Into<String>, config: InstanceConfig) -> Self {
        Self::new(logical_name, ResourceConfig::Instance(config))
    }

    pub fn network(logical_name: impl Into<String>, config: NetworkConfig) -> Self {
        Self::new(logical_name, ResourceConfig::Network(config))
    }

    pub fn image(logical_name: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self::new(
            logical_name,
            ResourceConfig::Image(ImageConfig {
                source_url: source_url.into(),
            }),
        )
    }

    /// Firewall rule named `{network}-{rule}`
    pub fn firewall_rule(rule: &str, config: FirewallRuleConfig) -> Self {
        let name = firewall_rule_name(&config.network, rule);
        Self::new(name, ResourceConfig::FirewallRule(config))
    }

    pub fn disk(logical_name: impl Into<String>, config: DiskConfig) -> Self {
        Self::new(logical_name, ResourceConfig::Disk(config))
    }

    pub fn in_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.config.kind()
    }

    pub fn is_created(&self) -> bool {
        self.remote_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("web-1").is_ok());
        assert!(validate_name("a").is_ok());
        assert!(validate_name(&"a".repeat(MAX_NAME_LEN)).is_ok());

        for bad in ["", "1web", "Web", "web_1", "web-", "-web", "web.example"] {
            let err = validate_name(bad).unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)), "{bad:?} accepted");
        }

        let err = validate_name(&"a".repeat(MAX_NAME_LEN + 1)).unwrap_err();
        assert!(err.to_string().contains("exceeds the limit of 63"));
    }

    #[test]
    fn test_kind_from_config() {
        let desc = ResourceDescriptor::network("net-a", NetworkConfig::default());
        assert_eq!(desc.kind(), ResourceKind::Network);
        assert!(!desc.kind().is_zonal());
        assert!(ResourceKind::Disk.is_zonal());
        assert_eq!(ResourceKind::FirewallRule.to_string(), "firewall-rule");
        assert!(!desc.is_created());
    }

    #[test]
    fn test_instance_body() {
        let mut cfg = InstanceConfig::new("projects/debian-cloud/global/images/family/debian-12");
        cfg.tags = vec!["http-server".to_string()];
        cfg.metadata.insert("bucket".to_string(), "demo".to_string());

        let body = ResourceConfig::Instance(cfg).request_body("web-1", "us-central1-a");

        assert_eq!(body["name"], "web-1");
        assert_eq!(body["machineType"], "zones/us-central1-a/machineTypes/n1-standard-1");
        assert_eq!(body["disks"][0]["boot"], true);
        assert_eq!(body["disks"][0]["autoDelete"], true);
        assert_eq!(
            body["disks"][0]["initializeParams"]["sourceImage"],
            "projects/debian-cloud/global/images/family/debian-12"
        );
        assert_eq!(body["networkInterfaces"][0]["network"], "global/networks/default");
        assert_eq!(
            body["networkInterfaces"][0]["accessConfigs"][0]["type"],
            "ONE_TO_ONE_NAT"
        );
        assert_eq!(body["serviceAccounts"][0]["scopes"].as_array().unwrap().len(), 2);
        assert_eq!(body["tags"]["items"][0], "http-server");
        assert_eq!(body["metadata"]["items"][0]["key"], "bucket");
    }

    #[test]
    fn test_instance_without_external_ip() {
        let mut cfg = InstanceConfig::new("img");
        cfg.external_ip = false;
        cfg.machine_type = "zones/us-east1-b/machineTypes/e2-small".to_string();

        let body = ResourceConfig::Instance(cfg).request_body("web-1", "us-central1-a");
        assert!(body["networkInterfaces"][0].get("accessConfigs").is_none());
        assert_eq!(body["machineType"], "zones/us-east1-b/machineTypes/e2-small");
        assert!(body.get("tags").is_none());
    }

    #[test]
    fn test_network_and_image_bodies() {
        let body = ResourceConfig::Network(NetworkConfig {
            description: Some("app network".to_string()),
        })
        .request_body("net-a", "ignored");
        assert_eq!(body, json!({ "name": "net-a", "description": "app network" }));

        let body = ResourceConfig::Network(NetworkConfig::default()).request_body("net-b", "ignored");
        assert_eq!(
            body,
            json!({ "name": "net-b", "description": "gcpctl generated network" })
        );

        let desc = ResourceDescriptor::image("img-1", "https://storage.googleapis.com/b/img.tar.gz");
        let body = desc.config.request_body(&desc.logical_name, "ignored");
        assert_eq!(
            body,
            json!({
                "name": "img-1",
                "rawDisk": {
                    "source": "https://storage.googleapis.com/b/img.tar.gz",
                    "containerType": "TAR"
                }
            })
        );
    }

    #[test]
    fn test_firewall_rule() {
        let cfg = FirewallRuleConfig {
            network: "net-a".to_string(),
            allowed: vec!["tcp:22,80".parse().unwrap(), "icmp".parse().unwrap()],
            source_ranges: vec!["0.0.0.0/0".to_string()],
            source_tags: vec![],
            target_tags: vec!["web".to_string()],
        };
        let desc = ResourceDescriptor::firewall_rule("ssh", cfg);
        assert_eq!(desc.logical_name, "net-a-ssh");
        assert_eq!(desc.kind(), ResourceKind::FirewallRule);

        let body = desc.config.request_body(&desc.logical_name, "ignored");
        assert_eq!(body["network"], "global/networks/net-a");
        assert_eq!(body["allowed"][0], json!({ "IPProtocol": "tcp", "ports": ["22", "80"] }));
        assert_eq!(body["allowed"][1], json!({ "IPProtocol": "icmp" }));
        assert_eq!(body["sourceRanges"], json!(["0.0.0.0/0"]));
        assert!(body.get("sourceTags").is_none());
        assert_eq!(body["targetTags"], json!(["web"]));
    }

    #[test]
    fn test_firewall_allow_parse_errors() {
        assert!(":22".parse::<FirewallAllow>().is_err());
        let allow: FirewallAllow = "UDP:53".parse().unwrap();
        assert_eq!(allow.protocol, "udp");
        assert_eq!(allow.ports, vec!["53"]);
    }

    #[test]
    fn test_disk_body() {
        let cfg = DiskConfig {
            size_gb: Some(50),
            disk_type: Some("pd-ssd".to_string()),
            source_image: None,
        };
        let body = ResourceConfig::Disk(cfg).request_body("data-1", "us-central1-a");
        assert_eq!(
            body,
            json!({
                "name": "data-1",
                "sizeGb": "50",
                "type": "zones/us-central1-a/diskTypes/pd-ssd"
            })
        );
    }

    #[test]
    fn test_config_serde_tagging() {
        let cfg = ResourceConfig::Network(NetworkConfig::default());
        let value = serde_json::to_value(&cfg).unwrap();
        assert_eq!(value["kind"], "network");
        let back: ResourceConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, cfg);
    }
}
