/// vCloud Director API 访问层
///
/// `VcdApi` 是服务层依赖的接口，`VcdClient` 是基于 reqwest 的实现。
/// 每个请求通过 `VcdConnector` 拿到一个全新的、未认证的句柄。

pub mod client;
pub mod error;
pub mod types;
pub mod xml;

use std::sync::Arc;

use async_trait::async_trait;
use common::VmMetric;

pub use client::{HttpConnector, VcdClient};
pub use error::{VcdError, VcdResult};
pub use types::{EntityRef, MksTicket, Org, VmCreateSpec, VmResource};

#[async_trait]
pub trait VcdApi: Send + Sync {
    /// 用户名密码登录，返回新签发的 JWT
    async fn login_basic(&self, organization: &str, username: &str, password: &str) -> VcdResult<String>;

    /// 用已有会话 ID（JWT 的 jti）恢复会话
    async fn rehydrate_from_token(&self, session_id: &str) -> VcdResult<()>;

    async fn get_org(&self) -> VcdResult<Org>;

    /// 组织下的 vDC，不存在时返回 `None`
    async fn get_vdc(&self, org: &Org, title: &str) -> VcdResult<Option<EntityRef>>;

    async fn list_vdcs(&self, org: &Org) -> VcdResult<Vec<EntityRef>>;

    /// vDC 下的 vApp，不存在时返回 `EntityNotFound`
    async fn get_vapp(&self, vdc: &EntityRef, title: &str) -> VcdResult<EntityRef>;

    async fn list_vapps(&self, vdc: &EntityRef) -> VcdResult<Vec<EntityRef>>;

    async fn list_vms(&self, vapp: &EntityRef) -> VcdResult<Vec<VmResource>>;

    /// 目录项指向的 vApp 模板
    async fn get_catalog_item(&self, org: &Org, catalog: &str, item: &str) -> VcdResult<EntityRef>;

    async fn get_vm(&self, vm_id: &str) -> VcdResult<VmResource>;

    async fn add_vm(&self, vapp: &EntityRef, spec: &VmCreateSpec) -> VcdResult<()>;

    async fn power_on(&self, vm: &VmResource) -> VcdResult<()>;

    async fn power_off(&self, vm: &VmResource) -> VcdResult<()>;

    async fn power_reset(&self, vm: &VmResource) -> VcdResult<()>;

    async fn acquire_mks_ticket(&self, vm: &VmResource) -> VcdResult<MksTicket>;

    async fn create_snapshot(&self, vm: &VmResource) -> VcdResult<()>;

    async fn list_current_metrics(&self, vm: &VmResource) -> VcdResult<Vec<VmMetric>>;

    async fn modify_cpu(&self, vm: &VmResource, cpu: u32) -> VcdResult<()>;

    /// 内存，单位 MB
    async fn modify_memory(&self, vm: &VmResource, ram: u64) -> VcdResult<()>;

    /// `RasdItemsList` 原文
    async fn get_disks(&self, vm: &VmResource) -> VcdResult<String>;

    async fn put_disks(&self, vm: &VmResource, body: String) -> VcdResult<()>;
}

/// 创建 vCD 句柄的工厂
pub trait VcdConnector: Send + Sync {
    fn connect(&self) -> VcdResult<Arc<dyn VcdApi>>;
}
