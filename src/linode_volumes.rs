//! Linode block storage volumes.
//!
//! REST endpoints:
//! - GET <https://api.linode.com/v4/volumes>
//! - GET <https://api.linode.com/v4/linode/instances/{linodeId}/volumes>

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::linode_client::{ApiRequest, Client, EndpointId, Resource, deserialize_api_date};
use crate::linode_error::Result;
use crate::linode_pagination::{ListOptions, PagedResponse, decode_page};

/// Top-level volumes collection.
pub const VOLUMES: Resource = Resource::new("volumes");

/// Volumes attached to one instance.
pub const INSTANCE_VOLUMES: Resource = Resource::new("linode/instances/{}/volumes");

/// A block storage volume.
#[derive(Debug, Clone, Deserialize)]
pub struct Volume {
    /// Volume ID.
    pub id: u64,
    /// Volume label.
    #[serde(default)]
    pub label: String,
    /// Volume status ("creating", "active", "resizing", ...).
    #[serde(default)]
    pub status: String,
    /// Region the volume lives in.
    #[serde(default)]
    pub region: String,
    /// Size in GB.
    #[serde(default)]
    pub size: u32,
    /// Instance the volume is attached to, if any.
    #[serde(default)]
    pub linode_id: Option<u64>,
    /// Device path inside the attached instance.
    #[serde(default)]
    pub filesystem_path: String,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation time.
    #[serde(default, deserialize_with = "deserialize_api_date")]
    pub created: Option<NaiveDateTime>,
    /// Last update time.
    #[serde(default, deserialize_with = "deserialize_api_date")]
    pub updated: Option<NaiveDateTime>,
}

/// Pager for `GET /volumes`.
#[derive(Debug, Default)]
pub struct VolumesPagedResponse {
    /// Volumes accumulated across pages.
    pub data: Vec<Volume>,
}

#[async_trait]
impl PagedResponse for VolumesPagedResponse {
    fn endpoint(&self, ids: &[EndpointId<'_>]) -> Result<String> {
        VOLUMES.endpoint(ids)
    }

    async fn cast_result(&mut self, request: ApiRequest<'_>, endpoint: &str) -> Result<(u32, u32)> {
        decode_page(request, endpoint, &mut self.data).await
    }
}

/// Pager for `GET /linode/instances/{id}/volumes`.
#[derive(Debug, Default)]
pub struct InstanceVolumesPagedResponse {
    /// Volumes accumulated across pages.
    pub data: Vec<Volume>,
}

#[async_trait]
impl PagedResponse for InstanceVolumesPagedResponse {
    fn endpoint(&self, ids: &[EndpointId<'_>]) -> Result<String> {
        INSTANCE_VOLUMES.endpoint(ids)
    }

    async fn cast_result(&mut self, request: ApiRequest<'_>, endpoint: &str) -> Result<(u32, u32)> {
        decode_page(request, endpoint, &mut self.data).await
    }
}

impl Client {
    /// List volumes.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    pub async fn list_volumes(&self, opts: Option<&mut ListOptions>) -> Result<Vec<Volume>> {
        let mut resp = VolumesPagedResponse::default();
        self.paginate(&mut resp, opts, &[]).await?;
        Ok(resp.data)
    }
}
