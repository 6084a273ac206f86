/// vCD 资源定位（只读）
///
/// 组织 → vDC → vApp → 虚拟机 / 模板，远端错误在这里换成本地错误。

use std::sync::Arc;

use common::constants::{
    TEMPLATE_CATALOG_NOT_FOUND_MESSAGE, VAPP_RESOURCE_NOT_FOUND_MESSAGE,
    VDC_RESOURCE_NOT_FOUND_MESSAGE,
};
use common::{Error, Result};
use tracing::error;

use super::session_service::Session;
use crate::app_state::AppState;
use crate::vcd::{EntityRef, Org, VcdApi, VcdError, VmResource};

/// 创建虚拟机所需的模板资源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateResources {
    pub vapp_template: EntityRef,
    pub vm_template_title: String,
}

pub struct ResourceService {
    state: AppState,
    api: Arc<dyn VcdApi>,
}

impl ResourceService {
    pub fn new(state: AppState, session: &Session) -> Self {
        Self { state, api: session.api() }
    }

    pub async fn get_organization(&self) -> Result<Org> {
        Ok(self.api.get_org().await?)
    }

    pub async fn get_vdc(&self, org: &Org, title: Option<&str>) -> Result<EntityRef> {
        let vdc = match title {
            Some(title) => self.api.get_vdc(org, title).await?,
            None => None,
        };
        vdc.ok_or_else(|| {
            error!(title = ?title, "{}", VDC_RESOURCE_NOT_FOUND_MESSAGE);
            Error::ResourceNotFound(VDC_RESOURCE_NOT_FOUND_MESSAGE.to_string())
        })
    }

    pub async fn get_vapp(&self, vdc: &EntityRef, title: Option<&str>) -> Result<EntityRef> {
        let not_found = || {
            error!(title = ?title, vdc = %vdc.name, "{}", VAPP_RESOURCE_NOT_FOUND_MESSAGE);
            Error::ResourceNotFound(VAPP_RESOURCE_NOT_FOUND_MESSAGE.to_string())
        };
        let Some(title) = title else {
            return Err(not_found());
        };
        match self.api.get_vapp(vdc, title).await {
            Ok(vapp) => Ok(vapp),
            Err(VcdError::EntityNotFound(_)) => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    /// 远端状态码保留在 VmNotFound 中
    pub async fn get_vm_by_id(&self, vm_id: &str) -> Result<VmResource> {
        self.api.get_vm(vm_id).await.map_err(|e| {
            let status = match e {
                VcdError::AccessForbidden(_) => 403,
                VcdError::BadRequest(_) => 400,
                VcdError::EntityNotFound(_) => 404,
                VcdError::InternalServer(_) => 500,
                other => return other.into(),
            };
            error!(vm_id = %vm_id, status, "{}", e);
            Error::VmNotFound { message: e.to_string(), status }
        })
    }

    /// 本地模板目录 → 远端目录项
    pub async fn get_template_resources(&self, org: &Org, template_id: i32) -> Result<TemplateResources> {
        let entry = self.state.template_repo.get(template_id).await?.ok_or_else(|| {
            error!(template_id, "{}", TEMPLATE_CATALOG_NOT_FOUND_MESSAGE);
            Error::TemplateCatalogNotFound(TEMPLATE_CATALOG_NOT_FOUND_MESSAGE.to_string())
        })?;

        let vapp_template = self
            .api
            .get_catalog_item(org, &entry.catalog_title, &entry.vapp_template_title)
            .await
            .map_err(|e| match e {
                VcdError::EntityNotFound(msg) => {
                    error!(
                        catalog = %entry.catalog_title,
                        vapp_template = %entry.vapp_template_title,
                        "{}", msg
                    );
                    Error::ResourceNotFound(msg)
                }
                other => other.into(),
            })?;

        Ok(TemplateResources {
            vapp_template,
            vm_template_title: entry.vm_template_title,
        })
    }
}
