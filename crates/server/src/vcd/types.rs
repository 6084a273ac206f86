/// vCD 资源的精简表示

/// 资源上的链接（rel + href）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub rel: String,
    pub href: String,
    pub media_type: Option<String>,
    pub name: Option<String>,
}

/// 按名称和地址引用的远端实体（vDC、vApp、vApp 模板等）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub name: String,
    pub href: String,
}

/// 组织
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Org {
    pub name: String,
    pub href: String,
    pub links: Vec<Link>,
}

impl Org {
    /// 组织下指定类型的子资源链接
    pub fn children<'a>(&'a self, media_type: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
        self.links
            .iter()
            .filter(move |l| l.rel == "down" && l.media_type.as_deref() == Some(media_type))
    }
}

/// 虚拟机
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmResource {
    /// 去掉 `urn:vcloud:vm:` 前缀后的 ID
    pub id: String,
    pub name: String,
    pub href: String,
    /// vCD 电源状态码
    pub status: i32,
    pub links: Vec<Link>,
}

impl VmResource {
    pub fn find_link(&self, rel: &str, media_type: Option<&str>) -> Option<&Link> {
        self.links.iter().find(|l| {
            l.rel == rel && media_type.map_or(true, |t| l.media_type.as_deref() == Some(t))
        })
    }
}

/// 控制台访问票据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MksTicket {
    pub host: String,
    pub port: String,
    pub ticket: String,
}

/// 从 vApp 模板向已有 vApp 添加虚拟机的参数
#[derive(Clone, PartialEq, Eq)]
pub struct VmCreateSpec {
    pub source_vapp_template: EntityRef,
    pub source_vm_name: String,
    pub target_vm_name: String,
    pub hostname: String,
    pub password: String,
    pub power_on: bool,
}

impl std::fmt::Debug for VmCreateSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VmCreateSpec")
            .field("source_vapp_template", &self.source_vapp_template.name)
            .field("source_vm_name", &self.source_vm_name)
            .field("target_vm_name", &self.target_vm_name)
            .field("hostname", &self.hostname)
            .field("power_on", &self.power_on)
            .finish_non_exhaustive()
    }
}

/// 提取 URN 最后一段，例如 `urn:vcloud:vm:abc` → `abc`
pub fn extract_id(urn: &str) -> &str {
    urn.rsplit(':').next().unwrap_or(urn)
}
