//! Compute Engine REST client
//!
//! A thin transport adapter bound to one [`Session`] and one project. It
//! exposes per-kind collection handles with exactly the verbs the lifecycle
//! needs (`insert`, `delete`, `get`, `list`) plus operation status lookups.
//! There is no retry, caching, or batching at this layer.
//!
//! HTTP failures are mapped onto [`CoreError`]:
//!
//! | Response                  | Error                          |
//! |---------------------------|--------------------------------|
//! | 404                       | `ResourceNotFound`             |
//! | 409 on `insert`           | `NameConflict`                 |
//! | any other non-2xx         | `Transport` with the status    |
//! | connection failure        | `Transport` without a status   |
//! | undecodable 2xx body      | `Transport` with the status    |

mod types;

pub use types::*;

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::{CoreError, Result};
use crate::session::Session;

/// Default Compute Engine v1 endpoint
pub const DEFAULT_API_URL: &str = "https://compute.googleapis.com/compute/v1";

/// User agent string for gcpctl HTTP requests
const GCPCTL_USER_AGENT: &str = concat!("gcpctl/", env!("CARGO_PKG_VERSION"));

/// Authenticated client for one project
#[derive(Clone, Debug)]
pub struct ComputeClient {
    http: reqwest::Client,
    base_url: String,
    project: String,
    session: Session,
}

/// Addressing scope of a resource collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Zone(String),
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Insert,
    Delete,
    Get,
    List,
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verb::Insert => write!(f, "insert"),
            Verb::Delete => write!(f, "delete"),
            Verb::Get => write!(f, "get"),
            Verb::List => write!(f, "list"),
        }
    }
}

/// What a request was about, for error mapping
struct RequestContext<'a> {
    verb: Verb,
    kind: &'static str,
    name: &'a str,
}

impl RequestContext<'_> {
    fn error_for(&self, status: u16, message: String) -> CoreError {
        match (status, self.verb) {
            (404, _) => CoreError::not_found(self.kind, self.name),
            (409, Verb::Insert) => CoreError::NameConflict {
                name: self.name.to_string(),
                message,
            },
            _ => CoreError::Transport {
                status: Some(status),
                message: format!("{} {} '{}': {}", self.verb, self.kind, self.name, message),
            },
        }
    }
}

impl ComputeClient {
    /// Create a client against the public Compute Engine endpoint
    pub fn new(session: Session, project: impl Into<String>) -> Result<Self> {
        Self::with_base_url(session, project, DEFAULT_API_URL)
    }

    /// Create a client against a custom endpoint
    pub fn with_base_url(
        session: Session,
        project: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(GCPCTL_USER_AGENT)
            .build()
            .map_err(|e| CoreError::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project: project.into(),
            session,
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn instances(&self, zone: &str) -> Collection<'_, Instance> {
        Collection::new(self, Location::Zone(zone.to_string()), "instances")
    }

    pub fn disks(&self, zone: &str) -> Collection<'_, Disk> {
        Collection::new(self, Location::Zone(zone.to_string()), "disks")
    }

    pub fn networks(&self) -> Collection<'_, Network> {
        Collection::new(self, Location::Global, "networks")
    }

    pub fn images(&self) -> Collection<'_, Image> {
        Collection::new(self, Location::Global, "images")
    }

    pub fn firewalls(&self) -> Collection<'_, Firewall> {
        Collection::new(self, Location::Global, "firewalls")
    }

    pub fn operations(&self) -> Operations<'_> {
        Operations { client: self }
    }

    /// Project-relative URL; each segment is percent-encoded on its own
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let invalid = |reason: String| CoreError::transport(format!("invalid API URL: {reason}"));
        let mut url =
            Url::parse(&self.base_url).map_err(|e| invalid(format!("'{}': {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| invalid(format!("'{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(["projects", self.project.as_str()])
            .extend(segments);
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        ctx: RequestContext<'_>,
    ) -> Result<T> {
        let response = request
            .bearer_auth(self.session.access_token())
            .send()
            .await
            .map_err(|e| {
                CoreError::transport(format!("{} {} '{}': {e}", ctx.verb, ctx.kind, ctx.name))
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| CoreError::Transport {
            status: Some(status),
            message: format!("failed to read response body: {e}"),
        })?;
        trace!("HTTP {} body: {}", status, body);

        if !(200..300).contains(&status) {
            debug!("{} {} '{}' returned HTTP {}", ctx.verb, ctx.kind, ctx.name, status);
            return Err(ctx.error_for(status, platform_message(&body)));
        }

        serde_json::from_str(&body).map_err(|e| CoreError::Transport {
            status: Some(status),
            message: format!("malformed {} response for {}: {e}", ctx.verb, ctx.kind),
        })
    }
}

/// Pull the human-readable message out of a platform error body
fn platform_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ if body.trim().is_empty() => "empty response body".to_string(),
        _ => body.trim().to_string(),
    }
}

/// Handle on one resource collection (e.g. the instances of a zone)
pub struct Collection<'a, T> {
    client: &'a ComputeClient,
    location: Location,
    collection: &'static str,
    _marker: PhantomData<T>,
}

impl<'a, T: ComputeResource> Collection<'a, T> {
    fn new(client: &'a ComputeClient, location: Location, collection: &'static str) -> Self {
        Self {
            client,
            location,
            collection,
            _marker: PhantomData,
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    fn segments(&self) -> Vec<&str> {
        match &self.location {
            Location::Zone(zone) => vec!["zones", zone.as_str(), self.collection],
            Location::Global => vec!["global", self.collection],
        }
    }

    fn path(&self) -> String {
        self.segments().join("/")
    }

    fn item_url(&self, name: &str) -> Result<Url> {
        let mut segments = self.segments();
        segments.push(name);
        self.client.url(&segments)
    }

    /// Submit a create; the body must carry the resource `name`
    pub async fn insert(&self, body: &serde_json::Value) -> Result<Operation> {
        let name = body
            .get("name")
            .and_then(|n| n.as_str())
            .ok_or_else(|| CoreError::Validation("request body has no 'name'".to_string()))?;

        debug!("Inserting {} '{}' into {}", T::KIND, name, self.path());
        let url = self.client.url(&self.segments())?;
        self.client
            .execute(
                self.client.http.post(url).json(body),
                RequestContext {
                    verb: Verb::Insert,
                    kind: T::KIND,
                    name,
                },
            )
            .await
    }

    /// Submit a delete by name
    pub async fn delete(&self, name: &str) -> Result<Operation> {
        debug!("Deleting {} '{}' from {}", T::KIND, name, self.path());
        let url = self.item_url(name)?;
        self.client
            .execute(
                self.client.http.delete(url),
                RequestContext {
                    verb: Verb::Delete,
                    kind: T::KIND,
                    name,
                },
            )
            .await
    }

    pub async fn get(&self, name: &str) -> Result<T> {
        let url = self.item_url(name)?;
        self.client
            .execute(
                self.client.http.get(url),
                RequestContext {
                    verb: Verb::Get,
                    kind: T::KIND,
                    name,
                },
            )
            .await
    }

    /// List every resource in the collection, following page tokens
    pub async fn list(&self) -> Result<Vec<T>> {
        let path = self.path();
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.client.url(&self.segments())?;
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let page: ListPage<T> = self
                .client
                .execute(
                    self.client.http.get(url),
                    RequestContext {
                        verb: Verb::List,
                        kind: T::KIND,
                        name: &path,
                    },
                )
                .await?;
            items.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("Listed {} {} entries in {}", items.len(), T::KIND, path);
        Ok(items)
    }
}

/// Operation status endpoints (zonal and global)
pub struct Operations<'a> {
    client: &'a ComputeClient,
}

impl Operations<'_> {
    pub async fn get(&self, handle: &OperationHandle) -> Result<Operation> {
        let op = handle.operation_id.as_str();
        let url = match &handle.scope {
            OperationScope::Zonal { zone } => {
                self.client.url(&["zones", zone.as_str(), "operations", op])?
            }
            OperationScope::Global => self.client.url(&["global", "operations", op])?,
        };
        self.client
            .execute(
                self.client.http.get(url),
                RequestContext {
                    verb: Verb::Get,
                    kind: "operation",
                    name: &handle.operation_id,
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_message_extraction() {
        let body = r#"{"error":{"code":409,"message":"The resource 'web-1' already exists","errors":[]}}"#;
        assert_eq!(platform_message(body), "The resource 'web-1' already exists");
        assert_eq!(platform_message(""), "empty response body");
        assert_eq!(platform_message("upstream connect error"), "upstream connect error");
    }

    #[test]
    fn test_error_mapping() {
        let ctx = RequestContext {
            verb: Verb::Insert,
            kind: "instance",
            name: "web-1",
        };
        assert!(ctx.error_for(409, "exists".into()).is_conflict());
        assert!(ctx.error_for(404, "gone".into()).is_not_found());
        assert!(ctx.error_for(401, "denied".into()).is_unauthorized());

        let ctx = RequestContext {
            verb: Verb::Delete,
            kind: "instance",
            name: "web-1",
        };
        let err = ctx.error_for(409, "busy".into());
        assert!(!err.is_conflict());
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn test_collection_paths() {
        let client =
            ComputeClient::with_base_url(Session::new("token"), "demo", "http://localhost:1/v1/")
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:1/v1");
        assert_eq!(client.instances("us-east1-b").path(), "zones/us-east1-b/instances");
        assert_eq!(client.networks().path(), "global/networks");
        assert_eq!(
            client.url(&["global", "images"]).unwrap().as_str(),
            "http://localhost:1/v1/projects/demo/global/images"
        );
    }

    #[test]
    fn test_item_name_stays_one_segment() {
        let client =
            ComputeClient::with_base_url(Session::new("token"), "demo", "http://localhost:1/v1")
                .unwrap();
        let url = client.networks().item_url("../firewalls/allow-all").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:1/v1/projects/demo/global/networks/..%2Ffirewalls%2Fallow-all"
        );
        assert_eq!(url.path_segments().unwrap().count(), 6);
    }
}
