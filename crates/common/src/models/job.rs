/// 任务类型与任务请求
///
/// JobQueryParams 是 HTTP 层收到的原始参数，JobRequest 是校验后的强类型请求。
/// 未知的 JOB_TYPE 只会在解析边界出现，分发阶段不存在未映射的任务类型。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::error;

use super::VmMetric;
use crate::constants::{INVALID_JOB_TYPE_MESSAGE, INVALID_QUERY_PARAMS_MESSAGE};
use crate::errors::{Error, Result};

/// 任务类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum JobKind {
    #[serde(rename = "NEW_VM")]
    VmCreate,
    #[serde(rename = "SET_VM_CPU")]
    VmSetCpu,
    #[serde(rename = "SET_VM_RAM")]
    VmSetRam,
    #[serde(rename = "SET_VM_HDD")]
    VmSetHdd,
    #[serde(rename = "START_VM")]
    VmPowerOn,
    #[serde(rename = "STOP_VM")]
    VmPowerOff,
    #[serde(rename = "RESET_VM")]
    VmPowerReset,
    #[serde(rename = "CREATE_SNAP")]
    VmCreateSnapshot,
    #[serde(rename = "GET_VM_STATUS")]
    VmGetPowerStatus,
    #[serde(rename = "GET_VM_USAGE")]
    VmGetCurrentUsage,
    #[serde(rename = "GET_CONSOLE_URL")]
    VmGetConsoleUrl,
}

impl JobKind {
    pub const ALL: [JobKind; 11] = [
        JobKind::VmCreate,
        JobKind::VmSetCpu,
        JobKind::VmSetRam,
        JobKind::VmSetHdd,
        JobKind::VmPowerOn,
        JobKind::VmPowerOff,
        JobKind::VmPowerReset,
        JobKind::VmCreateSnapshot,
        JobKind::VmGetPowerStatus,
        JobKind::VmGetCurrentUsage,
        JobKind::VmGetConsoleUrl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::VmCreate => "NEW_VM",
            JobKind::VmSetCpu => "SET_VM_CPU",
            JobKind::VmSetRam => "SET_VM_RAM",
            JobKind::VmSetHdd => "SET_VM_HDD",
            JobKind::VmPowerOn => "START_VM",
            JobKind::VmPowerOff => "STOP_VM",
            JobKind::VmPowerReset => "RESET_VM",
            JobKind::VmCreateSnapshot => "CREATE_SNAP",
            JobKind::VmGetPowerStatus => "GET_VM_STATUS",
            JobKind::VmGetCurrentUsage => "GET_VM_USAGE",
            JobKind::VmGetConsoleUrl => "GET_CONSOLE_URL",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        JobKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                error!(job_type = %s, "{}", INVALID_JOB_TYPE_MESSAGE);
                Error::invalid_job_type()
            })
    }
}

/// 原始查询参数
#[derive(Clone, Default, Deserialize)]
pub struct JobQueryParams {
    #[serde(rename = "JOB_TYPE")]
    pub job_type: Option<String>,
    #[serde(rename = "VM_ID")]
    pub vm_id: Option<String>,
    #[serde(rename = "VM_TITLE")]
    pub vm_title: Option<String>,
    #[serde(rename = "OS_PASS")]
    pub os_password: Option<String>,
    #[serde(rename = "TEMPLATE_ID")]
    pub template_id: Option<i32>,
    #[serde(rename = "VDC_TITLE")]
    pub vdc_title: Option<String>,
    #[serde(rename = "VAPP_TITLE")]
    pub vapp_title: Option<String>,
    #[serde(rename = "CPU")]
    pub cpu: Option<u32>,
    #[serde(rename = "RAM")]
    pub ram: Option<u64>,
    #[serde(rename = "HDD")]
    pub hdd: Option<u64>,
    #[serde(rename = "DISK_NUMBER")]
    pub disk_number: Option<u32>,
}

// 密码不能出现在日志里
impl fmt::Debug for JobQueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueryParams")
            .field("job_type", &self.job_type)
            .field("vm_id", &self.vm_id)
            .field("vm_title", &self.vm_title)
            .field("os_password", &self.os_password.as_ref().map(|_| "***"))
            .field("template_id", &self.template_id)
            .field("vdc_title", &self.vdc_title)
            .field("vapp_title", &self.vapp_title)
            .field("cpu", &self.cpu)
            .field("ram", &self.ram)
            .field("hdd", &self.hdd)
            .field("disk_number", &self.disk_number)
            .finish()
    }
}

/// 校验后的任务请求，每个变体只携带自身需要的字段
#[derive(Clone, PartialEq, Eq)]
pub enum JobRequest {
    VmCreate {
        template_id: i32,
        vm_title: String,
        os_password: String,
        vdc_title: Option<String>,
        vapp_title: Option<String>,
    },
    VmSetCpu { vm_id: String, cpu: u32 },
    VmSetRam { vm_id: String, ram: u64 },
    VmSetHdd { vm_id: String, hdd: u64, disk_number: Option<u32> },
    VmPowerOn { vm_id: String },
    VmPowerOff { vm_id: String },
    VmPowerReset { vm_id: String },
    VmCreateSnapshot { vm_id: String },
    VmGetPowerStatus { vm_id: String },
    VmGetCurrentUsage { vm_id: String },
    VmGetConsoleUrl { vm_id: String },
}

impl fmt::Debug for JobRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobRequest::VmCreate { template_id, vm_title, vdc_title, vapp_title, .. } => f
                .debug_struct("VmCreate")
                .field("template_id", template_id)
                .field("vm_title", vm_title)
                .field("vdc_title", vdc_title)
                .field("vapp_title", vapp_title)
                .finish_non_exhaustive(),
            other => write!(f, "{}({:?})", other.kind(), other.vm_id()),
        }
    }
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::VmCreate { .. } => JobKind::VmCreate,
            JobRequest::VmSetCpu { .. } => JobKind::VmSetCpu,
            JobRequest::VmSetRam { .. } => JobKind::VmSetRam,
            JobRequest::VmSetHdd { .. } => JobKind::VmSetHdd,
            JobRequest::VmPowerOn { .. } => JobKind::VmPowerOn,
            JobRequest::VmPowerOff { .. } => JobKind::VmPowerOff,
            JobRequest::VmPowerReset { .. } => JobKind::VmPowerReset,
            JobRequest::VmCreateSnapshot { .. } => JobKind::VmCreateSnapshot,
            JobRequest::VmGetPowerStatus { .. } => JobKind::VmGetPowerStatus,
            JobRequest::VmGetCurrentUsage { .. } => JobKind::VmGetCurrentUsage,
            JobRequest::VmGetConsoleUrl { .. } => JobKind::VmGetConsoleUrl,
        }
    }

    /// 目标虚拟机 ID（创建任务没有）
    pub fn vm_id(&self) -> Option<&str> {
        match self {
            JobRequest::VmCreate { .. } => None,
            JobRequest::VmSetCpu { vm_id, .. }
            | JobRequest::VmSetRam { vm_id, .. }
            | JobRequest::VmSetHdd { vm_id, .. }
            | JobRequest::VmPowerOn { vm_id }
            | JobRequest::VmPowerOff { vm_id }
            | JobRequest::VmPowerReset { vm_id }
            | JobRequest::VmCreateSnapshot { vm_id }
            | JobRequest::VmGetPowerStatus { vm_id }
            | JobRequest::VmGetCurrentUsage { vm_id }
            | JobRequest::VmGetConsoleUrl { vm_id } => Some(vm_id),
        }
    }
}

fn missing_param() -> Error {
    error!("{}", INVALID_QUERY_PARAMS_MESSAGE);
    Error::invalid_query_params()
}

/// vm_id 只检查是否存在
fn required_id(value: Option<String>) -> Result<String> {
    value.ok_or_else(missing_param)
}

fn required_text(value: Option<String>) -> Result<String> {
    value.filter(|v| !v.is_empty()).ok_or_else(missing_param)
}

fn required_number<T: Default + PartialEq>(value: Option<T>) -> Result<T> {
    value.filter(|v| *v != T::default()).ok_or_else(missing_param)
}

impl TryFrom<JobQueryParams> for JobRequest {
    type Error = Error;

    fn try_from(params: JobQueryParams) -> Result<Self> {
        let kind: JobKind = params
            .job_type
            .as_deref()
            .ok_or_else(missing_param)?
            .parse()?;

        let vm_id = params.vm_id;
        let request = match kind {
            JobKind::VmCreate => JobRequest::VmCreate {
                template_id: required_number(params.template_id)?,
                vm_title: required_text(params.vm_title)?,
                os_password: required_text(params.os_password)?,
                vdc_title: params.vdc_title,
                vapp_title: params.vapp_title,
            },
            JobKind::VmSetCpu => JobRequest::VmSetCpu {
                vm_id: required_id(vm_id)?,
                cpu: required_number(params.cpu)?,
            },
            JobKind::VmSetRam => JobRequest::VmSetRam {
                vm_id: required_id(vm_id)?,
                ram: required_number(params.ram)?,
            },
            JobKind::VmSetHdd => JobRequest::VmSetHdd {
                vm_id: required_id(vm_id)?,
                hdd: required_number(params.hdd)?,
                disk_number: params.disk_number,
            },
            JobKind::VmPowerOn => JobRequest::VmPowerOn { vm_id: required_id(vm_id)? },
            JobKind::VmPowerOff => JobRequest::VmPowerOff { vm_id: required_id(vm_id)? },
            JobKind::VmPowerReset => JobRequest::VmPowerReset { vm_id: required_id(vm_id)? },
            JobKind::VmCreateSnapshot => JobRequest::VmCreateSnapshot { vm_id: required_id(vm_id)? },
            JobKind::VmGetPowerStatus => JobRequest::VmGetPowerStatus { vm_id: required_id(vm_id)? },
            JobKind::VmGetCurrentUsage => JobRequest::VmGetCurrentUsage { vm_id: required_id(vm_id)? },
            JobKind::VmGetConsoleUrl => JobRequest::VmGetConsoleUrl { vm_id: required_id(vm_id)? },
        };
        Ok(request)
    }
}

/// 任务执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// 无返回值的任务（电源、快照、调整配置、创建）
    Done,
    /// 电源状态或控制台链接
    Text(String),
    /// 当前资源使用
    Usage(Vec<VmMetric>),
}
