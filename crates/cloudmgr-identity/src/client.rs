//! HTTP client for the identity service project API
//!
//! Endpoints used:
//! - `GET {endpoint}/projects/{name}` → `{"project": {...}}`, 404 when absent
//! - `POST {endpoint}/projects` with `{"project": {"name": ...}}`
//!
//! Requests carry the admin token in the `X-Auth-Token` header.

use std::time::Duration;

use anyhow::Result;
use cloudmgr_core::config::IdentityConfig;
use cloudmgr_core::domain::ProjectId;
use cloudmgr_core::ports::{IIdentityService, Project};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::IdentityError;

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Identity API payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct ProjectEnvelope {
    project: ProjectBody,
}

#[derive(Debug, Deserialize)]
struct ProjectBody {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct CreateProjectRequest<'a> {
    project: NewProject<'a>,
}

#[derive(Debug, Serialize)]
struct NewProject<'a> {
    name: &'a str,
}

impl TryFrom<ProjectBody> for Project {
    type Error = IdentityError;

    fn try_from(body: ProjectBody) -> Result<Self, Self::Error> {
        let id = ProjectId::new(body.id).map_err(|e| IdentityError::Malformed(e.to_string()))?;
        Ok(Project {
            id,
            name: body.name,
        })
    }
}

// ============================================================================
// IdentityClient
// ============================================================================

/// Identity service client
pub struct IdentityClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl IdentityClient {
    /// Creates a client for the API rooted at `endpoint`
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self, IdentityError> {
        Self::with_timeout(endpoint, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        endpoint: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, IdentityError> {
        let base_url = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| IdentityError::Malformed(format!("invalid endpoint '{endpoint}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(IdentityError::Malformed(format!(
                "endpoint '{endpoint}' cannot be used as a base URL"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(IdentityError::Client)?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Builds a client from the `identity` config section
    ///
    /// Returns `Ok(None)` when no endpoint is configured.
    pub fn from_config(config: &IdentityConfig) -> Result<Option<Self>, IdentityError> {
        config
            .endpoint
            .as_deref()
            .map(|endpoint| {
                Self::with_timeout(
                    endpoint,
                    config.token.clone(),
                    Duration::from_secs(config.timeout_secs),
                )
            })
            .transpose()
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.token {
            Some(ref token) => builder.header(AUTH_TOKEN_HEADER, token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, url: &Url) -> Result<Response, IdentityError> {
        builder.send().await.map_err(|source| IdentityError::Transport {
            url: url.to_string(),
            source,
        })
    }

    async fn parse_project(response: Response, url: &Url) -> Result<Project, IdentityError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }

        let envelope: ProjectEnvelope = response
            .json()
            .await
            .map_err(|e| IdentityError::Malformed(e.to_string()))?;
        envelope.project.try_into()
    }

    /// Fetches a project by name; `Ok(None)` on 404
    pub async fn get_project(&self, name: &str) -> Result<Option<Project>, IdentityError> {
        let url = self.url(&["projects", name]);
        debug!(project = name, "Looking up project");

        let response = self.send(self.request(Method::GET, url.clone()), &url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(project = name, "Project not found");
            return Ok(None);
        }
        Self::parse_project(response, &url).await.map(Some)
    }

    /// Creates a project named `name`
    pub async fn post_project(&self, name: &str) -> Result<Project, IdentityError> {
        let url = self.url(&["projects"]);
        let body = CreateProjectRequest {
            project: NewProject { name },
        };

        let response = self
            .send(self.request(Method::POST, url.clone()).json(&body), &url)
            .await?;
        let project = Self::parse_project(response, &url).await?;
        info!(project = %project.name, project_id = %project.id.as_str(), "Created project");
        Ok(project)
    }
}

#[async_trait::async_trait]
impl IIdentityService for IdentityClient {
    async fn find_project_by_name(&self, name: &str) -> anyhow::Result<Option<Project>> {
        Ok(self.get_project(name).await?)
    }

    async fn create_project(&self, name: &str) -> anyhow::Result<Project> {
        Ok(self.post_project(name).await?)
    }
}
