/// 任务分发
///
/// 每个请求先建立 vCD 会话，再按任务类型调用对应的虚拟机操作。

use common::{JobOutcome, JobRequest, Result};
use tracing::info;

use super::session_service::SessionService;
use super::vm_service::{CreateVmParams, VmService};
use crate::app_state::AppState;

pub struct JobService {
    state: AppState,
}

impl JobService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// 会话建立失败时不执行任何任务
    pub async fn dispatch(&self, request: JobRequest) -> Result<JobOutcome> {
        let session = SessionService::new(self.state.clone()).setup().await?;
        let vms = VmService::new(self.state.clone(), &session);
        let kind = request.kind();

        let outcome = match request {
            JobRequest::VmCreate {
                template_id,
                vm_title,
                os_password,
                vdc_title,
                vapp_title,
            } => {
                vms.create(CreateVmParams {
                    template_id,
                    vm_title,
                    os_password,
                    vdc_title,
                    vapp_title,
                })
                .await?;
                JobOutcome::Done
            }
            JobRequest::VmSetCpu { vm_id, cpu } => {
                vms.set_cpu(&vm_id, cpu).await?;
                JobOutcome::Done
            }
            JobRequest::VmSetRam { vm_id, ram } => {
                vms.set_ram(&vm_id, ram).await?;
                JobOutcome::Done
            }
            JobRequest::VmSetHdd { vm_id, hdd, disk_number } => {
                vms.set_hdd(&vm_id, hdd, disk_number).await?;
                JobOutcome::Done
            }
            JobRequest::VmPowerOn { vm_id } => {
                vms.power_on(&vm_id).await?;
                JobOutcome::Done
            }
            JobRequest::VmPowerOff { vm_id } => {
                vms.power_off(&vm_id).await?;
                JobOutcome::Done
            }
            JobRequest::VmPowerReset { vm_id } => {
                vms.power_reset(&vm_id).await?;
                JobOutcome::Done
            }
            JobRequest::VmCreateSnapshot { vm_id } => {
                vms.create_snapshot(&vm_id).await?;
                JobOutcome::Done
            }
            JobRequest::VmGetPowerStatus { vm_id } => {
                let status = vms.get_power_status(&vm_id).await?;
                JobOutcome::Text(status.as_str().to_string())
            }
            JobRequest::VmGetCurrentUsage { vm_id } => {
                JobOutcome::Usage(vms.get_current_usage(&vm_id).await?)
            }
            JobRequest::VmGetConsoleUrl { vm_id } => {
                JobOutcome::Text(vms.get_console_url(&vm_id).await?)
            }
        };

        info!(job_type = %kind, "任务执行完成");
        Ok(outcome)
    }
}
