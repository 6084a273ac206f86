/// 对外返回的固定消息

/// 异步任务已下发
pub const JOB_TYPE_WAS_SENT: &str = "DONE";
pub const INVALID_JOB_TYPE_MESSAGE: &str = "Invalid job type";
pub const INVALID_QUERY_PARAMS_MESSAGE: &str = "Invalid query params";
pub const INVALID_VM_CONSOLE_PARAMS_MESSAGE: &str = "Invalid console query params";
pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "INTERNAL SERVER ERROR";
pub const VCD_JWT_EXPIRED_MESSAGE: &str = "vCloud Director API JWT expired";
pub const INVALID_FORMAT_VCD_JWT_MESSAGE: &str = "Invalid format vCloud Director JWT";
pub const VDC_RESOURCE_NOT_FOUND_MESSAGE: &str = "vDC Resource not found";
pub const VAPP_RESOURCE_NOT_FOUND_MESSAGE: &str = "vApp Resource not found";
pub const TEMPLATE_CATALOG_NOT_FOUND_MESSAGE: &str = "Catalog of templates not found";
pub const VM_DISK_NOT_FOUND_MESSAGE: &str = "VM disk not found";
pub const ANOTHER_VM_CREATING_MESSAGE: &str = "Another VM creating";
