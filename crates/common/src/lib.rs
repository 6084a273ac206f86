/// VCD Gateway - 公共库
///
/// 提供 Server 使用的错误类型、任务模型、常量和工具函数

pub mod constants;
pub mod errors;
pub mod models;
pub mod utils;

// 重新导出常用类型
pub use errors::{Error, Result};
pub use models::{JobKind, JobOutcome, JobQueryParams, JobRequest, VmMetric, VmPowerStatus};
