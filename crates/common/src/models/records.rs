/// 持久化记录（与存储实现无关）

use serde::{Deserialize, Serialize};

/// 单例配置记录：vCD API 令牌与默认 vDC / vApp
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredCredentialState {
    pub api_token: Option<String>,
    pub default_vdc_title: Option<String>,
    pub default_vapp_title: Option<String>,
}

/// 模板目录项：本地 template_id 对应的三个远端模板名称
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateCatalogEntry {
    pub id: i32,
    pub catalog_title: String,
    pub vapp_template_title: String,
    pub vm_template_title: String,
}

/// 本地虚拟机记录，remote_vm_id 唯一
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VmRecord {
    pub id: i32,
    pub remote_vm_id: String,
    pub title: String,
}
