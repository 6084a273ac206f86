/// vCloud Director REST API 客户端
///
/// 与 vCD 之间全部是 XML。认证后的凭据保存在客户端内部：
/// 用户名密码登录后使用 `Authorization: Bearer <jwt>`，
/// 从会话 ID 恢复后使用 `x-vcloud-authorization`。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::VmMetric;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use tokio::sync::RwLock;
use tracing::debug;

use super::error::{VcdError, VcdResult};
use super::types::{EntityRef, MksTicket, Org, VmCreateSpec, VmResource};
use super::{xml, VcdApi, VcdConnector};
use crate::config::VcdConfig;

const ACCESS_TOKEN_HEADER: &str = "X-VMWARE-VCLOUD-ACCESS-TOKEN";
const VCLOUD_AUTH_HEADER: &str = "x-vcloud-authorization";

pub const VDC_MEDIA_TYPE: &str = "application/vnd.vmware.vcloud.vdc+xml";
pub const VAPP_MEDIA_TYPE: &str = "application/vnd.vmware.vcloud.vApp+xml";
pub const CATALOG_MEDIA_TYPE: &str = "application/vnd.vmware.vcloud.catalog+xml";
pub const CURRENT_USAGE_MEDIA_TYPE: &str = "application/vnd.vmware.vcloud.metrics.currentUsageSpec+xml";
const RASD_ITEM_MEDIA_TYPE: &str = "application/vnd.vmware.vcloud.rasdItem+xml";
const RASD_ITEMS_LIST_MEDIA_TYPE: &str = "application/vnd.vmware.vcloud.rasdItemsList+xml";
const RECOMPOSE_MEDIA_TYPE: &str = "application/vnd.vmware.vcloud.recomposeVAppParams+xml";
const SNAPSHOT_CREATE_MEDIA_TYPE: &str = "application/vnd.vmware.vcloud.createSnapshotParams+xml";

#[derive(Clone)]
enum Credential {
    Bearer(String),
    SessionId(String),
}

pub struct VcdClient {
    http: Client,
    api_uri: String,
    accept: String,
    credential: RwLock<Option<Credential>>,
}

impl VcdClient {
    pub fn new(http: Client, config: &VcdConfig) -> Self {
        Self {
            http,
            api_uri: format!("{}/api", config.hostname.trim_end_matches('/')),
            accept: format!("application/*+xml;version={}", config.api_version),
            credential: RwLock::new(None),
        }
    }

    pub fn api_uri(&self) -> &str {
        &self.api_uri
    }

    /// vCD 的虚拟机 ID 是 UUID，只允许字母、数字和 `-`，
    /// 调用方传入的值不能改变请求路径
    fn vm_url(&self, vm_id: &str) -> VcdResult<String> {
        if vm_id.is_empty() || !vm_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(VcdError::BadRequest(format!("Invalid VM id '{}'", vm_id)));
        }
        Ok(format!("{}/vApp/vm-{}", self.api_uri, vm_id))
    }

    async fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.credential.read().await.as_ref() {
            Some(Credential::Bearer(token)) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            Some(Credential::SessionId(id)) => builder.header(VCLOUD_AUTH_HEADER, id.as_str()),
            None => builder,
        }
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<(String, &str)>,
    ) -> VcdResult<String> {
        debug!("vCD {} {}", method, url);
        let mut builder = self.http.request(method, url).header(ACCEPT, &self.accept);
        builder = self.authorize(builder).await;
        if let Some((body, content_type)) = body {
            builder = builder.header(CONTENT_TYPE, content_type).body(body);
        }

        let resp = Self::check_status(builder.send().await?).await?;
        Ok(resp.text().await?)
    }

    async fn get(&self, url: &str) -> VcdResult<String> {
        self.request(Method::GET, url, None).await
    }

    async fn post(&self, url: &str, body: Option<(String, &str)>) -> VcdResult<String> {
        self.request(Method::POST, url, body).await
    }

    async fn put(&self, url: &str, body: String, content_type: &str) -> VcdResult<String> {
        self.request(Method::PUT, url, Some((body, content_type))).await
    }

    /// 非 2xx 响应按状态码分类，消息取自 `<Error message>`
    async fn check_status(resp: Response) -> VcdResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = xml::error_message(&body).unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("Unknown").to_string()
            } else {
                body
            }
        });
        Err(VcdError::from_status(status.as_u16(), message))
    }

    async fn post_link(&self, vm: &VmResource, rel: &str) -> VcdResult<()> {
        let link = vm.find_link(rel, None).ok_or_else(|| VcdError::link_not_found(rel))?;
        self.post(&link.href, None).await?;
        Ok(())
    }
}

#[async_trait]
impl VcdApi for VcdClient {
    async fn login_basic(&self, organization: &str, username: &str, password: &str) -> VcdResult<String> {
        let url = format!("{}/sessions", self.api_uri);
        let resp = self
            .http
            .post(&url)
            .header(ACCEPT, &self.accept)
            .basic_auth(format!("{}@{}", username, organization), Some(password))
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;

        let token = resp
            .headers()
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| VcdError::parse(format!("登录响应缺少 {}", ACCESS_TOKEN_HEADER)))?;

        *self.credential.write().await = Some(Credential::Bearer(token.clone()));
        Ok(token)
    }

    async fn rehydrate_from_token(&self, session_id: &str) -> VcdResult<()> {
        *self.credential.write().await = Some(Credential::SessionId(session_id.to_string()));
        self.get(&format!("{}/session", self.api_uri)).await?;
        Ok(())
    }

    async fn get_org(&self) -> VcdResult<Org> {
        let orgs = xml::parse_org_list(&self.get(&format!("{}/org", self.api_uri)).await?)?;
        let org = orgs
            .into_iter()
            .next()
            .ok_or_else(|| VcdError::EntityNotFound("Organization not found".to_string()))?;
        xml::parse_org(&self.get(&org.href).await?)
    }

    async fn get_vdc(&self, org: &Org, title: &str) -> VcdResult<Option<EntityRef>> {
        Ok(org
            .children(VDC_MEDIA_TYPE)
            .find(|l| l.name.as_deref() == Some(title))
            .map(|l| EntityRef { name: title.to_string(), href: l.href.clone() }))
    }

    async fn list_vdcs(&self, org: &Org) -> VcdResult<Vec<EntityRef>> {
        Ok(org
            .children(VDC_MEDIA_TYPE)
            .map(|l| EntityRef {
                name: l.name.clone().unwrap_or_default(),
                href: l.href.clone(),
            })
            .collect())
    }

    async fn get_vapp(&self, vdc: &EntityRef, title: &str) -> VcdResult<EntityRef> {
        self.list_vapps(vdc)
            .await?
            .into_iter()
            .find(|v| v.name == title)
            .ok_or_else(|| VcdError::EntityNotFound(format!("vApp named '{}' not found", title)))
    }

    async fn list_vapps(&self, vdc: &EntityRef) -> VcdResult<Vec<EntityRef>> {
        xml::parse_resource_entities(&self.get(&vdc.href).await?, VAPP_MEDIA_TYPE)
    }

    async fn list_vms(&self, vapp: &EntityRef) -> VcdResult<Vec<VmResource>> {
        xml::parse_child_vms(&self.get(&vapp.href).await?)
    }

    async fn get_catalog_item(&self, org: &Org, catalog: &str, item: &str) -> VcdResult<EntityRef> {
        let catalog_link = org
            .children(CATALOG_MEDIA_TYPE)
            .find(|l| l.name.as_deref() == Some(catalog))
            .ok_or_else(|| VcdError::EntityNotFound(format!("Catalog named '{}' not found", catalog)))?;

        let items = xml::parse_catalog_items(&self.get(&catalog_link.href).await?)?;
        let catalog_item = items.into_iter().find(|i| i.name == item).ok_or_else(|| {
            VcdError::EntityNotFound(format!("Catalog item '{}' not found in '{}'", item, catalog))
        })?;

        xml::parse_catalog_item_entity(&self.get(&catalog_item.href).await?)
    }

    async fn get_vm(&self, vm_id: &str) -> VcdResult<VmResource> {
        let url = self.vm_url(vm_id)?;
        xml::parse_vm(&self.get(&url).await?)
    }

    async fn add_vm(&self, vapp: &EntityRef, spec: &VmCreateSpec) -> VcdResult<()> {
        let source_vms = xml::parse_child_vms(&self.get(&spec.source_vapp_template.href).await?)?;
        let source_vm = source_vms
            .into_iter()
            .find(|vm| vm.name == spec.source_vm_name)
            .ok_or_else(|| {
                VcdError::EntityNotFound(format!(
                    "VM '{}' not found in vApp template '{}'",
                    spec.source_vm_name, spec.source_vapp_template.name
                ))
            })?;

        // 另一台虚拟机正在创建时 vApp 不提供 recompose 链接
        let links = xml::parse_links(&self.get(&vapp.href).await?)?;
        let recompose = links
            .into_iter()
            .find(|l| l.rel == "recompose")
            .ok_or_else(|| VcdError::link_not_found("recompose"))?;

        let body = xml::recompose_params(spec, &source_vm.href);
        self.post(&recompose.href, Some((body, RECOMPOSE_MEDIA_TYPE))).await?;
        Ok(())
    }

    async fn power_on(&self, vm: &VmResource) -> VcdResult<()> {
        self.post_link(vm, "power:powerOn").await
    }

    async fn power_off(&self, vm: &VmResource) -> VcdResult<()> {
        self.post_link(vm, "power:powerOff").await
    }

    async fn power_reset(&self, vm: &VmResource) -> VcdResult<()> {
        self.post_link(vm, "power:reset").await
    }

    async fn acquire_mks_ticket(&self, vm: &VmResource) -> VcdResult<MksTicket> {
        let url = format!("{}/screen/action/acquireMksTicket", vm.href);
        xml::parse_mks_ticket(&self.post(&url, None).await?)
    }

    async fn create_snapshot(&self, vm: &VmResource) -> VcdResult<()> {
        let rel = "snapshot:create";
        let link = vm.find_link(rel, None).ok_or_else(|| VcdError::link_not_found(rel))?;
        let body = xml::snapshot_params(true);
        self.post(&link.href, Some((body, SNAPSHOT_CREATE_MEDIA_TYPE))).await?;
        Ok(())
    }

    async fn list_current_metrics(&self, vm: &VmResource) -> VcdResult<Vec<VmMetric>> {
        // 关机状态的虚拟机没有当前用量链接
        let link = vm
            .find_link("down", Some(CURRENT_USAGE_MEDIA_TYPE))
            .ok_or_else(|| VcdError::link_not_found(CURRENT_USAGE_MEDIA_TYPE))?;
        xml::parse_metrics(&self.get(&link.href).await?)
    }

    async fn modify_cpu(&self, vm: &VmResource, cpu: u32) -> VcdResult<()> {
        let url = format!("{}/virtualHardwareSection/cpu", vm.href);
        let item = self.get(&url).await?;
        let quantity = cpu.to_string();
        let updated = xml::update_rasd_item(
            &item,
            &quantity,
            &format!("{} virtual CPU(s)", cpu),
            Some(&quantity),
        )?;
        self.put(&url, updated, RASD_ITEM_MEDIA_TYPE).await?;
        Ok(())
    }

    async fn modify_memory(&self, vm: &VmResource, ram: u64) -> VcdResult<()> {
        let url = format!("{}/virtualHardwareSection/memory", vm.href);
        let item = self.get(&url).await?;
        let updated = xml::update_rasd_item(&item, &ram.to_string(), &format!("{} MB of memory", ram), None)?;
        self.put(&url, updated, RASD_ITEM_MEDIA_TYPE).await?;
        Ok(())
    }

    async fn get_disks(&self, vm: &VmResource) -> VcdResult<String> {
        self.get(&format!("{}/virtualHardwareSection/disks", vm.href)).await
    }

    async fn put_disks(&self, vm: &VmResource, body: String) -> VcdResult<()> {
        let url = format!("{}/virtualHardwareSection/disks", vm.href);
        self.put(&url, body, RASD_ITEMS_LIST_MEDIA_TYPE).await?;
        Ok(())
    }
}

/// 共享连接池，每次 `connect` 产生独立凭据的客户端
pub struct HttpConnector {
    http: Client,
    config: VcdConfig,
}

impl HttpConnector {
    pub fn new(config: &VcdConfig) -> VcdResult<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, config: config.clone() })
    }
}

impl VcdConnector for HttpConnector {
    fn connect(&self) -> VcdResult<Arc<dyn VcdApi>> {
        Ok(Arc::new(VcdClient::new(self.http.clone(), &self.config)))
    }
}
