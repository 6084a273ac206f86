pub mod job_service;
pub mod resource_service;
pub mod session_service;
pub mod statistics_service;
pub mod vm_service;

pub use job_service::JobService;
pub use statistics_service::{start_statistics_collector, StatisticsService};
