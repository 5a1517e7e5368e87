//! Typed records for Compute Engine responses
//!
//! Only the fields the orchestrator reads are modelled. Unknown fields are
//! ignored; a missing required field or an unrecognized operation status is
//! a decode error at the client boundary.

use serde::{Deserialize, Deserializer, Serialize};

use super::Location;

/// Operation status as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,
    Running,
    Done,
}

impl OperationStatus {
    pub fn is_done(self) -> bool {
        matches!(self, OperationStatus::Done)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Pending => write!(f, "PENDING"),
            OperationStatus::Running => write!(f, "RUNNING"),
            OperationStatus::Done => write!(f, "DONE"),
        }
    }
}

/// Where an operation lives, which selects the status endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationScope {
    Zonal { zone: String },
    Global,
}

/// Reference to one in-flight asynchronous mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub operation_id: String,
    pub scope: OperationScope,
}

impl OperationHandle {
    pub fn zonal(operation_id: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            scope: OperationScope::Zonal { zone: zone.into() },
        }
    }

    pub fn global(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            scope: OperationScope::Global,
        }
    }
}

impl std::fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.scope {
            OperationScope::Zonal { zone } => write!(f, "{} (zone {})", self.operation_id, zone),
            OperationScope::Global => write!(f, "{} (global)", self.operation_id),
        }
    }
}

/// A long-running operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Zone URL; absent for global operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
}

impl Operation {
    /// Handle for polling this operation
    pub fn handle(&self) -> OperationHandle {
        self.handle_in(&Location::Global)
    }

    /// Handle for an operation submitted to a collection at `location`
    ///
    /// The `zone` reported by the platform wins; without one the operation
    /// lives where its collection does.
    pub fn handle_in(&self, location: &Location) -> OperationHandle {
        match (self.zone.as_deref().map(last_segment), location) {
            (Some(zone), _) if !zone.is_empty() => OperationHandle::zonal(&self.name, zone),
            (_, Location::Zone(zone)) => OperationHandle::zonal(&self.name, zone),
            (_, Location::Global) => OperationHandle::global(&self.name),
        }
    }

    /// Error details, only meaningful once `status` is DONE
    pub fn errors(&self) -> Option<&[OperationErrorDetail]> {
        self.error.as_ref().map(|e| e.errors.as_slice())
    }
}

/// Error payload of a finished operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub errors: Vec<OperationErrorDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationErrorDetail {
    /// Platform error code; numeric codes are kept as their decimal string
    #[serde(deserialize_with = "code_from_string_or_number")]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

fn code_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Text(String),
        Number(i64),
    }

    Ok(match Code::deserialize(deserializer)? {
        Code::Text(s) => s,
        Code::Number(n) => n.to_string(),
    })
}

/// Error body returned with a non-2xx HTTP status
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorStatus {
    #[serde(default)]
    pub message: String,
}

/// One page of a list call
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Common accessors over every managed resource type
pub trait ComputeResource: serde::de::DeserializeOwned + Send {
    /// Singular noun used in errors and logs
    const KIND: &'static str;

    fn name(&self) -> &str;
    fn id(&self) -> Option<&str>;
}

/// Scan a listing for the entry with the given name
pub fn find_by_name<'a, T: ComputeResource>(items: &'a [T], name: &str) -> Option<&'a T> {
    items.iter().find(|item| item.name() == name)
}

macro_rules! compute_resource {
    ($ty:ty, $kind:literal) => {
        impl ComputeResource for $ty {
            const KIND: &'static str = $kind;

            fn name(&self) -> &str {
                &self.name
            }

            fn id(&self) -> Option<&str> {
                self.id.as_deref()
            }
        }
    };
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(rename = "networkIP", default, skip_serializing_if = "Option::is_none")]
    pub network_ip: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Firewall {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default)]
    pub source_tags: Vec<String>,
    #[serde(default)]
    pub target_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_gb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

compute_resource!(Instance, "instance");
compute_resource!(Network, "network");
compute_resource!(Image, "image");
compute_resource!(Firewall, "firewall rule");
compute_resource!(Disk, "disk");

fn last_segment(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}
