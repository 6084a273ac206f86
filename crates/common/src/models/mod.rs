/// 共享数据模型
///
/// 任务请求、虚拟机状态以及持久化记录

pub mod job;
pub mod records;

pub use job::{JobKind, JobOutcome, JobQueryParams, JobRequest};
pub use records::{StoredCredentialState, TemplateCatalogEntry, VmRecord};

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// 虚拟机电源状态（vCD 的数字状态码）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VmPowerStatus {
    Suspended,
    PoweredOn,
    PoweredOff,
}

impl VmPowerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VmPowerStatus::Suspended => "SUSPENDED",
            VmPowerStatus::PoweredOn => "POWERED_ON",
            VmPowerStatus::PoweredOff => "POWERED_OFF",
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            VmPowerStatus::Suspended => 3,
            VmPowerStatus::PoweredOn => 4,
            VmPowerStatus::PoweredOff => 8,
        }
    }
}

impl TryFrom<i32> for VmPowerStatus {
    type Error = Error;

    /// 未知状态码属于缺陷，必须上报而不是透传
    fn try_from(code: i32) -> Result<Self> {
        match code {
            3 => Ok(VmPowerStatus::Suspended),
            4 => Ok(VmPowerStatus::PoweredOn),
            8 => Ok(VmPowerStatus::PoweredOff),
            other => Err(Error::Internal(format!("未知的虚拟机电源状态码: {}", other))),
        }
    }
}

/// 虚拟机当前资源使用指标
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VmMetric {
    pub metric_name: String,
    pub unit: String,
    pub value: String,
}
