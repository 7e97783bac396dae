use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use decomp_core::errors::RemoteError;
use decomp_core::identity::{Identity, IdentityProvider};
use decomp_core::ids::RemoteId;
use decomp_core::item_type::WorkItemTypeName;
use decomp_core::store::{CreationRequest, RemoteWorkItem, WorkItemStore};

use crate::auth::PatToken;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP implementation of the work-item store against the tracking
/// service's REST API. One instance per service organization; the project
/// segment comes from each creation request.
#[derive(Clone)]
pub struct HttpWorkItemStore {
    client: Client,
    base_url: String,
    pat: PatToken,
}

impl HttpWorkItemStore {
    pub fn new(base_url: impl Into<String>, pat: PatToken) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            pat,
        }
    }

    fn request_error(error: reqwest::Error) -> RemoteError {
        if error.is_timeout() {
            RemoteError::Timeout(REQUEST_TIMEOUT)
        } else {
            RemoteError::NetworkError(error.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::from_status(status.as_u16(), body))
    }
}

#[async_trait]
impl WorkItemStore for HttpWorkItemStore {
    #[instrument(skip(self, request), fields(item_type = %request.item_type))]
    async fn create_item(
        &self,
        request: &CreationRequest,
        parent: Option<RemoteId>,
    ) -> Result<RemoteId, RemoteError> {
        let url = format!(
            "{}/projects/{}/work-items",
            self.base_url, request.project
        );
        let body = CreateItemBody::from_request(request, parent);
        debug!(url, "creating work item");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.pat.0.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(Self::request_error)?;
        let response = Self::check_status(response).await?;

        let created: CreatedDto = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidRequest(format!("malformed create response: {e}")))?;
        Ok(RemoteId::new(created.id))
    }

    async fn get_item(&self, id: RemoteId) -> Result<RemoteWorkItem, RemoteError> {
        let url = format!("{}/work-items/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.pat.0.expose_secret())
            .send()
            .await
            .map_err(Self::request_error)?;
        let response = Self::check_status(response).await?;

        let dto: WorkItemDto = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidRequest(format!("malformed item response: {e}")))?;
        Ok(dto.into_item(id))
    }
}

#[async_trait]
impl IdentityProvider for HttpWorkItemStore {
    async fn current_actor(&self) -> Result<Identity, RemoteError> {
        let url = format!("{}/me", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.pat.0.expose_secret())
            .send()
            .await
            .map_err(Self::request_error)?;
        let response = Self::check_status(response).await?;

        let dto: IdentityDto = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidRequest(format!("malformed identity response: {e}")))?;
        Ok(Identity::new(dto.display_name, dto.descriptor))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateItemBody {
    #[serde(rename = "type")]
    item_type: WorkItemTypeName,
    title: String,
    /// Single semicolon-joined string, the service's tag wire form.
    #[serde(skip_serializing_if = "String::is_empty")]
    tags: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    area_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    iteration_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

impl CreateItemBody {
    fn from_request(request: &CreationRequest, parent: Option<RemoteId>) -> Self {
        Self {
            item_type: request.item_type.clone(),
            title: request.title.clone(),
            tags: request.tag_string(),
            assignee: request.assignee.as_ref().map(|a| a.descriptor.clone()),
            area_path: request.area_path.clone(),
            iteration_path: request.iteration_path.clone(),
            parent_id: parent.map(RemoteId::get),
            comment: request.comment.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedDto {
    id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkItemDto {
    #[serde(rename = "type")]
    item_type: WorkItemTypeName,
    title: String,
    #[serde(default)]
    tags: String,
    assignee: Option<IdentityDto>,
    area_path: Option<String>,
}

impl WorkItemDto {
    fn into_item(self, id: RemoteId) -> RemoteWorkItem {
        RemoteWorkItem {
            id,
            item_type: self.item_type,
            title: self.title,
            tags: self
                .tags
                .split(';')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_owned)
                .collect(),
            assignee: self.assignee.map(|a| Identity::new(a.display_name, a.descriptor)),
            area_path: self.area_path,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityDto {
    display_name: String,
    descriptor: String,
}
