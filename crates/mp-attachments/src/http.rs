//! HTTP image endpoints
//!
//! Talks to the marketplace REST API:
//!
//! - `POST {base}/api/v1/images/{owner}?entity_type=..&image_type=..` (multipart `file`)
//! - `DELETE {base}/api/v1/images/{image_id}`

use std::time::Duration;

use async_trait::async_trait;
use mp_core::ApiConfig;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, instrument};
use url::Url;

use crate::api::{ApiError, ApiResult, ImageApi, UploadRequest};
use crate::model::{EntityKind, ImageRole, UploadedImage};

/// reqwest-backed [`ImageApi`]
#[derive(Debug, Clone)]
pub struct HttpImageApi {
    client: Client,
    base_url: Url,
    access_token: Option<String>,
}

impl HttpImageApi {
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            access_token: config.access_token.clone(),
        })
    }

    fn images_url(&self, segment: &str) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "v1", "images", segment]);
        Ok(url)
    }

    /// Upload url for `owner_id`, tagged with entity and image kind
    pub fn upload_url(&self, entity: EntityKind, owner_id: &str, role: ImageRole) -> ApiResult<Url> {
        let mut url = self.images_url(owner_id)?;
        url.query_pairs_mut()
            .append_pair("entity_type", entity.as_str())
            .append_pair("image_type", role.as_str());
        Ok(url)
    }

    pub fn delete_url(&self, image_id: &str) -> ApiResult<Url> {
        self.images_url(image_id)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_string());
    Err(ApiError::Http {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ImageApi for HttpImageApi {
    #[instrument(skip(self, request), fields(file = %request.file.name, owner = %request.owner.id))]
    async fn upload(&self, request: UploadRequest) -> ApiResult<UploadedImage> {
        let url = self.upload_url(request.owner.entity, &request.owner.id, request.role)?;

        let part = Part::bytes(request.file.data.to_vec())
            .file_name(request.file.name.clone())
            .mime_str(&request.file.content_type)
            .map_err(|e| ApiError::Transport(format!("invalid content type: {}", e)))?;
        let form = Form::new().part("file", part);

        let response = self
            .authorize(self.client.post(url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let response = check_status(response).await?;

        let image: UploadedImage = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        debug!(id = %image.id, path = %image.path, "Image uploaded");
        Ok(image)
    }

    #[instrument(skip(self))]
    async fn delete(&self, image_id: &str) -> ApiResult<()> {
        let url = self.delete_url(image_id)?;
        let response = self
            .authorize(self.client.delete(url))
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        check_status(response).await?;
        debug!(id = %image_id, "Image deleted");
        Ok(())
    }
}
