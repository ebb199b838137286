//! Linode compute instances.
//!
//! REST endpoints used:
//! - GET/POST <https://api.linode.com/v4/linode/instances>
//! - GET/PUT/DELETE <https://api.linode.com/v4/linode/instances/{linodeId}>
//! - POST <https://api.linode.com/v4/linode/instances/{linodeId}/{action}>
//!   for boot, reboot, shutdown, resize, mutate, rebuild and clone

use std::{collections::HashMap, net::IpAddr};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::linode_client::{ApiRequest, Client, EndpointId, Resource, deserialize_api_date};
use crate::linode_error::Result;
use crate::linode_pagination::{ListOptions, PagedResponse, decode_page};
use crate::linode_volumes::{InstanceVolumesPagedResponse, Volume};

/// Instances collection.
pub const INSTANCES: Resource = Resource::new("linode/instances");

/// A single instance.
pub const INSTANCE: Resource = Resource::new("linode/instances/{}");

/// A Linode compute instance.
#[derive(Debug, Clone, Deserialize)]
pub struct Instance {
    /// Instance ID.
    pub id: u64,
    /// Instance label.
    #[serde(default)]
    pub label: String,
    /// Region.
    #[serde(default)]
    pub region: String,
    /// Image the instance was deployed from.
    #[serde(default)]
    pub image: Option<String>,
    /// Display group.
    #[serde(default)]
    pub group: String,
    /// Public and private IPv4 addresses.
    #[serde(default)]
    pub ipv4: Vec<IpAddr>,
    /// SLAAC IPv6 address.
    #[serde(default)]
    pub ipv6: Option<String>,
    /// Linode type ID (e.g. "g6-standard-1").
    #[serde(default, rename = "type")]
    pub instance_type: String,
    /// Status ("running", "offline", "booting", ...).
    #[serde(default)]
    pub status: String,
    /// Hypervisor ("kvm").
    #[serde(default)]
    pub hypervisor: String,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Hardware specs.
    #[serde(default)]
    pub specs: Option<InstanceSpec>,
    /// Alert thresholds.
    #[serde(default)]
    pub alerts: Option<InstanceAlert>,
    /// Backup settings.
    #[serde(default)]
    pub backups: Option<InstanceBackup>,
    /// Creation time.
    #[serde(default, deserialize_with = "deserialize_api_date")]
    pub created: Option<NaiveDateTime>,
    /// Last update time.
    #[serde(default, deserialize_with = "deserialize_api_date")]
    pub updated: Option<NaiveDateTime>,
}

/// Hardware specs of an instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceSpec {
    /// Disk in MB.
    #[serde(default)]
    pub disk: u64,
    /// Memory in MB.
    #[serde(default)]
    pub memory: u64,
    /// Virtual CPU count.
    #[serde(default)]
    pub vcpus: u32,
    /// Monthly transfer in GB.
    #[serde(default)]
    pub transfer: u64,
}

/// Alert thresholds of an instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceAlert {
    /// CPU usage percent.
    #[serde(default)]
    pub cpu: u32,
    /// Disk IO operations per second.
    #[serde(default)]
    pub io: u32,
    /// Incoming traffic in Mbit/s.
    #[serde(default)]
    pub network_in: u32,
    /// Outgoing traffic in Mbit/s.
    #[serde(default)]
    pub network_out: u32,
    /// Transfer quota percent.
    #[serde(default)]
    pub transfer_quota: u32,
}

/// Backup settings of an instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceBackup {
    /// Whether backups are enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Backup window.
    #[serde(default)]
    pub schedule: BackupSchedule,
}

/// When backups run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupSchedule {
    /// Day of week ("Monday", ... or "Scheduling").
    #[serde(default)]
    pub day: Option<String>,
    /// Two-hour window ("W0" .. "W22").
    #[serde(default)]
    pub window: Option<String>,
}

/// Options for creating an instance. Only region and type are required.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstanceCreateOptions {
    /// Region.
    pub region: String,
    /// Linode type ID.
    #[serde(rename = "type")]
    pub instance_type: String,
    /// Label.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub label: String,
    /// Display group.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub group: String,
    /// Root password.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub root_pass: String,
    /// SSH public keys installed for root.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authorized_keys: Vec<String>,
    /// StackScript to deploy with.
    #[serde(rename = "stackscript_id", skip_serializing_if = "Option::is_none")]
    pub stack_script_id: Option<u64>,
    /// StackScript user-defined fields.
    #[serde(rename = "stackscript_data", skip_serializing_if = "HashMap::is_empty")]
    pub stack_script_data: HashMap<String, String>,
    /// Backup to restore from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<u64>,
    /// Image to deploy.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,
    /// Enroll in the backup service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backups_enabled: Option<bool>,
    /// Boot after creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booted: Option<bool>,
    /// Tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Options for cloning an instance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstanceCloneOptions {
    /// Target region.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region: String,
    /// Target type.
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub instance_type: String,
    /// Existing instance to clone into.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linode_id: Option<u64>,
    /// Label of the clone.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub label: String,
    /// Display group of the clone.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub group: String,
    /// Enroll the clone in backups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backups_enabled: Option<bool>,
    /// Disk IDs to clone.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<u64>,
    /// Config profile IDs to clone.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub configs: Vec<u64>,
}

/// Options for rebuilding an instance from an image.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RebuildInstanceOptions {
    /// Image to deploy.
    pub image: String,
    /// Root password.
    pub root_pass: String,
    /// SSH public keys installed for root.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authorized_keys: Vec<String>,
    /// StackScript to deploy with.
    #[serde(rename = "stackscript_id", skip_serializing_if = "Option::is_none")]
    pub stack_script_id: Option<u64>,
    /// StackScript user-defined fields.
    #[serde(rename = "stackscript_data", skip_serializing_if = "HashMap::is_empty")]
    pub stack_script_data: HashMap<String, String>,
    /// Boot after rebuilding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booted: Option<bool>,
}

/// Fields of an instance that can be changed in place.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstanceUpdateOptions {
    /// New label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// New display group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Replacement tag set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Whether to watch the instance and reboot it after a host crash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchdog_enabled: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ConfigRequest {
    config_id: u64,
}

#[derive(Debug, Serialize)]
struct ResizeRequest<'a> {
    #[serde(rename = "type")]
    instance_type: &'a str,
}

/// Pager for `GET /linode/instances`.
#[derive(Debug, Default)]
pub struct InstancesPagedResponse {
    /// Instances accumulated across pages.
    pub data: Vec<Instance>,
}

#[async_trait]
impl PagedResponse for InstancesPagedResponse {
    fn endpoint(&self, ids: &[EndpointId<'_>]) -> Result<String> {
        INSTANCES.endpoint(ids)
    }

    async fn cast_result(&mut self, request: ApiRequest<'_>, endpoint: &str) -> Result<(u32, u32)> {
        decode_page(request, endpoint, &mut self.data).await
    }
}

impl Client {
    /// List instances.
    ///
    /// With `None` (or page 0) every page is fetched.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    pub async fn list_instances(&self, opts: Option<&mut ListOptions>) -> Result<Vec<Instance>> {
        let mut resp = InstancesPagedResponse::default();
        self.paginate(&mut resp, opts, &[]).await?;
        Ok(resp.data)
    }

    /// Get the instance with the given ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the instance does not exist.
    pub async fn get_instance(&self, linode_id: u64) -> Result<Instance> {
        let endpoint = instance_endpoint(linode_id, None)?;
        self.request().get(&endpoint).await
    }

    /// Create an instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API rejects the options.
    pub async fn create_instance(&self, opts: &InstanceCreateOptions) -> Result<Instance> {
        let endpoint = INSTANCES.endpoint(&[])?;
        self.request().post(&endpoint, opts).await
    }

    /// Update an instance in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API rejects the options.
    pub async fn update_instance(&self, linode_id: u64, opts: &InstanceUpdateOptions) -> Result<Instance> {
        let endpoint = instance_endpoint(linode_id, None)?;
        self.request().put(&endpoint, opts).await
    }

    /// Delete an instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_instance(&self, linode_id: u64) -> Result<()> {
        let endpoint = instance_endpoint(linode_id, None)?;
        self.request().delete(&endpoint).await
    }

    /// Boot an instance, optionally with a specific config profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn boot_instance(&self, linode_id: u64, config_id: Option<u64>) -> Result<()> {
        let endpoint = instance_endpoint(linode_id, Some("boot"))?;
        let body = config_id.map(|config_id| ConfigRequest { config_id });
        self.request().post_action(&endpoint, body.as_ref()).await
    }

    /// Reboot an instance, optionally into a specific config profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn reboot_instance(&self, linode_id: u64, config_id: Option<u64>) -> Result<()> {
        let endpoint = instance_endpoint(linode_id, Some("reboot"))?;
        let body = config_id.map(|config_id| ConfigRequest { config_id });
        self.request().post_action(&endpoint, body.as_ref()).await
    }

    /// Shut an instance down.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn shutdown_instance(&self, linode_id: u64) -> Result<()> {
        let endpoint = instance_endpoint(linode_id, Some("shutdown"))?;
        self.request().post_action::<()>(&endpoint, None).await
    }

    /// Resize an instance to another Linode type.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn resize_instance(&self, linode_id: u64, instance_type: &str) -> Result<()> {
        let endpoint = instance_endpoint(linode_id, Some("resize"))?;
        let body = ResizeRequest { instance_type };
        self.request().post_action(&endpoint, Some(&body)).await
    }

    /// Upgrade an instance to its next generation.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn mutate_instance(&self, linode_id: u64) -> Result<()> {
        let endpoint = instance_endpoint(linode_id, Some("mutate"))?;
        self.request().post_action::<()>(&endpoint, None).await
    }

    /// Clone an instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn clone_instance(&self, linode_id: u64, opts: &InstanceCloneOptions) -> Result<Instance> {
        let endpoint = instance_endpoint(linode_id, Some("clone"))?;
        self.request().post(&endpoint, opts).await
    }

    /// Delete all disks and configs of an instance, then deploy a new image.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn rebuild_instance(&self, linode_id: u64, opts: &RebuildInstanceOptions) -> Result<Instance> {
        let endpoint = instance_endpoint(linode_id, Some("rebuild"))?;
        self.request().post(&endpoint, opts).await
    }

    /// List volumes attached to an instance.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    pub async fn list_instance_volumes(&self, linode_id: u64, opts: Option<&mut ListOptions>) -> Result<Vec<Volume>> {
        let mut resp = InstanceVolumesPagedResponse::default();
        let ids: [EndpointId<'_>; 1] = [&linode_id];
        self.paginate(&mut resp, opts, &ids).await?;
        Ok(resp.data)
    }
}

fn instance_endpoint(linode_id: u64, action: Option<&str>) -> Result<String> {
    let ids: [EndpointId<'_>; 1] = [&linode_id];
    let mut endpoint = INSTANCE.endpoint(&ids)?;
    if let Some(action) = action {
        endpoint.push('/');
        endpoint.push_str(action);
    }
    Ok(endpoint)
}
