/// 虚拟机操作服务
///
/// 所有操作都先按 ID 取得虚拟机，再调用 vCD；电源状态不允许的操作返回 409。

use std::sync::Arc;

use common::constants::{ANOTHER_VM_CREATING_MESSAGE, VM_DISK_NOT_FOUND_MESSAGE};
use common::utils::build_console_link;
use common::{Error, Result, VmMetric, VmPowerStatus};
use tracing::{error, info};

use super::resource_service::ResourceService;
use super::session_service::Session;
use crate::app_state::AppState;
use crate::vcd::{xml, VcdApi, VcdError, VmCreateSpec, VmResource};

/// 新虚拟机的客户机主机名
const GUEST_HOSTNAME: &str = "hostname";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PowerAction {
    On,
    Off,
    Reset,
}

/// 创建虚拟机的参数
#[derive(Clone)]
pub struct CreateVmParams {
    pub template_id: i32,
    pub vm_title: String,
    pub os_password: String,
    pub vdc_title: Option<String>,
    pub vapp_title: Option<String>,
}

pub struct VmService {
    state: AppState,
    api: Arc<dyn VcdApi>,
    resources: ResourceService,
}

impl VmService {
    pub fn new(state: AppState, session: &Session) -> Self {
        Self {
            resources: ResourceService::new(state.clone(), session),
            api: session.api(),
            state,
        }
    }

    /// 从模板创建虚拟机，创建后保持关机
    ///
    /// 未指定 vDC / vApp 时使用设置中的默认值
    pub async fn create(&self, params: CreateVmParams) -> Result<()> {
        let stored = self.state.settings_repo.get_or_create().await?;
        let vdc_title = params
            .vdc_title
            .filter(|t| !t.is_empty())
            .or(stored.default_vdc_title);
        let vapp_title = params
            .vapp_title
            .filter(|t| !t.is_empty())
            .or(stored.default_vapp_title);

        let org = self.resources.get_organization().await?;
        let vdc = self.resources.get_vdc(&org, vdc_title.as_deref()).await?;
        let vapp = self.resources.get_vapp(&vdc, vapp_title.as_deref()).await?;
        let template = self.resources.get_template_resources(&org, params.template_id).await?;

        let spec = VmCreateSpec {
            source_vapp_template: template.vapp_template,
            source_vm_name: template.vm_template_title,
            target_vm_name: params.vm_title,
            hostname: GUEST_HOSTNAME.to_string(),
            password: params.os_password,
            power_on: false,
        };

        self.api.add_vm(&vapp, &spec).await.map_err(|e| {
            error!(vapp = %vapp.name, spec = ?spec, "创建虚拟机失败: {}", e);
            match e {
                VcdError::EntityNotFound(msg) => Error::ResourceNotFound(msg),
                VcdError::OperationNotSupported(_) => {
                    Error::AnotherVmCreating(ANOTHER_VM_CREATING_MESSAGE.to_string())
                }
                VcdError::BadRequest(msg) => Error::VmCreating(msg),
                other => other.into(),
            }
        })?;

        info!(vapp = %vapp.name, vm_title = %spec.target_vm_name, "已提交创建虚拟机");
        Ok(())
    }

    pub async fn power_on(&self, vm_id: &str) -> Result<()> {
        self.power(vm_id, PowerAction::On).await
    }

    pub async fn power_off(&self, vm_id: &str) -> Result<()> {
        self.power(vm_id, PowerAction::Off).await
    }

    pub async fn power_reset(&self, vm_id: &str) -> Result<()> {
        self.power(vm_id, PowerAction::Reset).await
    }

    async fn power(&self, vm_id: &str, action: PowerAction) -> Result<()> {
        let vm = self.resources.get_vm_by_id(vm_id).await?;
        let result = match action {
            PowerAction::On => self.api.power_on(&vm).await,
            PowerAction::Off => self.api.power_off(&vm).await,
            PowerAction::Reset => self.api.power_reset(&vm).await,
        };
        result.map_err(|e| match e {
            VcdError::OperationNotSupported(msg) => {
                error!(vm_id, power_state = vm.status, action = ?action, "{}", msg);
                Error::VmPowerState(msg)
            }
            other => other.into(),
        })
    }

    pub async fn get_power_status(&self, vm_id: &str) -> Result<VmPowerStatus> {
        let vm = self.resources.get_vm_by_id(vm_id).await?;
        VmPowerStatus::try_from(vm.status).map_err(|e| {
            error!(vm_id, power_state = vm.status, "未知的电源状态");
            e
        })
    }

    /// 网关控制台页面的链接
    pub async fn get_console_url(&self, vm_id: &str) -> Result<String> {
        let vm = self.resources.get_vm_by_id(vm_id).await?;
        let ticket = self.api.acquire_mks_ticket(&vm).await.map_err(|e| match e {
            VcdError::Conflict(msg) => {
                error!(vm_id, power_state = vm.status, "{}", msg);
                Error::VmPowerState(msg)
            }
            other => other.into(),
        })?;

        Ok(build_console_link(
            &self.state.config.server.hostname,
            &ticket.host,
            &ticket.port,
            &ticket.ticket,
        ))
    }

    /// 含内存快照
    pub async fn create_snapshot(&self, vm_id: &str) -> Result<()> {
        let vm = self.resources.get_vm_by_id(vm_id).await?;
        self.api.create_snapshot(&vm).await?;
        Ok(())
    }

    pub async fn get_current_usage(&self, vm_id: &str) -> Result<Vec<VmMetric>> {
        let vm = self.resources.get_vm_by_id(vm_id).await?;
        self.current_usage_of(&vm).await
    }

    /// 已取得的虚拟机的当前用量，关机时返回 VmPowerState
    pub async fn current_usage_of(&self, vm: &VmResource) -> Result<Vec<VmMetric>> {
        self.api.list_current_metrics(vm).await.map_err(|e| match e {
            VcdError::OperationNotSupported(msg) => {
                error!(vm_id = %vm.id, power_state = vm.status, "{}", msg);
                Error::VmPowerState(msg)
            }
            other => other.into(),
        })
    }

    pub async fn set_cpu(&self, vm_id: &str, cpu: u32) -> Result<()> {
        let vm = self.resources.get_vm_by_id(vm_id).await?;
        self.api.modify_cpu(&vm, cpu).await.map_err(|e| match e {
            VcdError::BadRequest(msg) => {
                error!(vm_id, cpu, power_state = vm.status, "{}", msg);
                Error::VcdBadRequest(msg)
            }
            other => other.into(),
        })
    }

    /// 内存，单位 MB
    pub async fn set_ram(&self, vm_id: &str, ram: u64) -> Result<()> {
        let vm = self.resources.get_vm_by_id(vm_id).await?;
        self.api.modify_memory(&vm, ram).await.map_err(|e| match e {
            VcdError::BadRequest(msg) => {
                error!(vm_id, ram, power_state = vm.status, "{}", msg);
                Error::VcdBadRequest(msg)
            }
            other => other.into(),
        })
    }

    /// 调整第 `disk_number` 块硬盘（默认 1）的容量，单位 MB
    pub async fn set_hdd(&self, vm_id: &str, hdd: u64, disk_number: Option<u32>) -> Result<()> {
        let vm = self.resources.get_vm_by_id(vm_id).await?;
        let disk_number = disk_number.unwrap_or(1);

        let disks = self.api.get_disks(&vm).await?;
        let Some(updated) = xml::resize_disk(&disks, disk_number, hdd)? else {
            error!(vm_id, hdd, disk_number, power_state = vm.status, "{}", VM_DISK_NOT_FOUND_MESSAGE);
            return Err(Error::VcdBadRequest(VM_DISK_NOT_FOUND_MESSAGE.to_string()));
        };

        self.api.put_disks(&vm, updated).await.map_err(|e| match e {
            VcdError::BadRequest(msg) => {
                error!(vm_id, hdd, disk_number, power_state = vm.status, "{}", msg);
                Error::VcdBadRequest(msg)
            }
            other => other.into(),
        })
    }
}
