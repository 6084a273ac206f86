/// vCD XML 解析与改写
///
/// 只读取需要的元素；改写 RASD 文档时在原文上按位置替换，
/// 不重新序列化，保证未触及的内容与远端返回的完全一致。

use std::ops::Range;

use common::VmMetric;
use roxmltree::{Document, Node};

use super::error::{VcdError, VcdResult};
use super::types::{extract_id, EntityRef, Link, MksTicket, Org, VmCreateSpec, VmResource};

pub const VCLOUD_NS: &str = "http://www.vmware.com/vcloud/v1.5";
pub const OVF_NS: &str = "http://schemas.dmtf.org/ovf/envelope/1";

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|n| n.text())
}

fn required_attr(node: Node, name: &str) -> VcdResult<String> {
    node.attribute(name).map(str::to_string).ok_or_else(|| {
        VcdError::parse(format!("<{}> 缺少属性 {}", node.tag_name().name(), name))
    })
}

fn entity_ref(node: Node) -> VcdResult<EntityRef> {
    Ok(EntityRef {
        name: required_attr(node, "name")?,
        href: required_attr(node, "href")?,
    })
}

fn links(node: Node) -> Vec<Link> {
    node.children()
        .filter(|n| n.is_element() && n.tag_name().name() == "Link")
        .filter_map(|n| {
            Some(Link {
                rel: n.attribute("rel")?.to_string(),
                href: n.attribute("href")?.to_string(),
                media_type: n.attribute("type").map(str::to_string),
                name: n.attribute("name").map(str::to_string),
            })
        })
        .collect()
}

fn vm_resource(node: Node) -> VcdResult<VmResource> {
    let status = match node.attribute("status") {
        Some(raw) => raw
            .parse()
            .map_err(|_| VcdError::parse(format!("非法的虚拟机状态码: {}", raw)))?,
        None => return Err(VcdError::parse("<Vm> 缺少属性 status")),
    };
    Ok(VmResource {
        id: extract_id(&required_attr(node, "id")?).to_string(),
        name: required_attr(node, "name")?,
        href: required_attr(node, "href")?,
        status,
        links: links(node),
    })
}

/// 远端错误响应 `<Error message="..."/>` 中的消息
pub fn error_message(xml: &str) -> Option<String> {
    let doc = Document::parse(xml).ok()?;
    let root = doc.root_element();
    (root.tag_name().name() == "Error")
        .then(|| root.attribute("message").map(str::to_string))
        .flatten()
}

/// `GET /api/org` 返回的组织列表
pub fn parse_org_list(xml: &str) -> VcdResult<Vec<EntityRef>> {
    let doc = Document::parse(xml)?;
    doc.root_element()
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "Org")
        .map(entity_ref)
        .collect()
}

pub fn parse_org(xml: &str) -> VcdResult<Org> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    Ok(Org {
        name: required_attr(root, "name")?,
        href: required_attr(root, "href")?,
        links: links(root),
    })
}

/// vDC 中指定类型的资源实体
pub fn parse_resource_entities(xml: &str, media_type: &str) -> VcdResult<Vec<EntityRef>> {
    let doc = Document::parse(xml)?;
    let Some(entities) = child(doc.root_element(), "ResourceEntities") else {
        return Ok(Vec::new());
    };
    entities
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "ResourceEntity")
        .filter(|n| n.attribute("type") == Some(media_type))
        .map(entity_ref)
        .collect()
}

pub fn parse_catalog_items(xml: &str) -> VcdResult<Vec<EntityRef>> {
    let doc = Document::parse(xml)?;
    let Some(items) = child(doc.root_element(), "CatalogItems") else {
        return Ok(Vec::new());
    };
    items
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "CatalogItem")
        .map(entity_ref)
        .collect()
}

/// 目录项指向的实体（vApp 模板）
pub fn parse_catalog_item_entity(xml: &str) -> VcdResult<EntityRef> {
    let doc = Document::parse(xml)?;
    let entity = child(doc.root_element(), "Entity")
        .ok_or_else(|| VcdError::parse("<CatalogItem> 缺少 <Entity>"))?;
    entity_ref(entity)
}

pub fn parse_vm(xml: &str) -> VcdResult<VmResource> {
    let doc = Document::parse(xml)?;
    vm_resource(doc.root_element())
}

/// vApp 或 vApp 模板中的全部虚拟机
pub fn parse_child_vms(xml: &str) -> VcdResult<Vec<VmResource>> {
    let doc = Document::parse(xml)?;
    let Some(children) = child(doc.root_element(), "Children") else {
        return Ok(Vec::new());
    };
    children
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "Vm")
        .map(vm_resource)
        .collect()
}

pub fn parse_links(xml: &str) -> VcdResult<Vec<Link>> {
    let doc = Document::parse(xml)?;
    Ok(links(doc.root_element()))
}

pub fn parse_mks_ticket(xml: &str) -> VcdResult<MksTicket> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    let field = |name: &str| {
        child_text(root, name)
            .map(|t| t.trim().to_string())
            .ok_or_else(|| VcdError::parse(format!("<MksTicket> 缺少 <{}>", name)))
    };
    Ok(MksTicket {
        host: field("Host")?,
        port: field("Port")?,
        ticket: field("Ticket")?,
    })
}

/// `CurrentUsage` 中的指标列表
pub fn parse_metrics(xml: &str) -> VcdResult<Vec<VmMetric>> {
    let doc = Document::parse(xml)?;
    doc.root_element()
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "Metric")
        .map(|n| {
            Ok(VmMetric {
                metric_name: required_attr(n, "name")?,
                unit: required_attr(n, "unit")?,
                value: required_attr(n, "value")?,
            })
        })
        .collect()
}

fn text_range(node: Node) -> VcdResult<Range<usize>> {
    node.first_child()
        .filter(|n| n.is_text())
        .map(|n| n.range())
        .ok_or_else(|| VcdError::parse(format!("<{}> 没有文本内容", node.tag_name().name())))
}

/// 从后往前替换，前面的位置不受影响
fn apply_edits(xml: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut result = xml.to_string();
    for (range, value) in edits {
        result.replace_range(range, &value);
    }
    result
}

/// HostResource 的 capacity：有则改值，没有则补上 `vcloud:capacity`
fn capacity_edit(xml: &str, node: Node, hdd: u64) -> VcdResult<(Range<usize>, String)> {
    if let Some(attr) = node.attributes().find(|a| a.name() == "capacity") {
        return Ok((attr.range_value(), hdd.to_string()));
    }

    // 属性不继承默认命名空间，必须用带前缀的声明
    let prefix = node
        .namespaces()
        .find(|ns| ns.uri() == VCLOUD_NS && ns.name().is_some())
        .and_then(|ns| ns.name())
        .ok_or_else(|| VcdError::parse("<HostResource> 没有 capacity 属性，且未声明 vCloud 命名空间前缀"))?;

    let start = node.range().start + 1;
    let qname_len = xml[start..]
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .ok_or_else(|| VcdError::parse("<HostResource> 标签不完整"))?;
    let at = start + qname_len;
    Ok((at..at, format!(" {}:capacity=\"{}\"", prefix, hdd)))
}

/// 修改单个 RASD Item（CPU 或内存）
pub fn update_rasd_item(
    xml: &str,
    quantity: &str,
    element_name: &str,
    cores_per_socket: Option<&str>,
) -> VcdResult<String> {
    let doc = Document::parse(xml)?;
    let item = doc.root_element();

    let mut edits = Vec::new();
    let quantity_node = child(item, "VirtualQuantity")
        .ok_or_else(|| VcdError::parse("<Item> 缺少 <VirtualQuantity>"))?;
    edits.push((text_range(quantity_node)?, quantity.to_string()));

    if let Some(node) = child(item, "ElementName") {
        edits.push((text_range(node)?, escape(element_name)));
    }
    if let (Some(cores), Some(node)) = (cores_per_socket, child(item, "CoresPerSocket")) {
        edits.push((text_range(node)?, cores.to_string()));
    }

    Ok(apply_edits(xml, edits))
}

/// 调整第 `disk_number` 块硬盘的容量（MB）
///
/// 目标磁盘：Description 为 `Hard disk` 且 ElementName 为 `Hard disk {n}`。
/// 找不到时返回 `Ok(None)`，由调用方决定错误类型。
pub fn resize_disk(xml: &str, disk_number: u32, hdd: u64) -> VcdResult<Option<String>> {
    let doc = Document::parse(xml)?;
    let element_name = format!("Hard disk {}", disk_number);

    let disk = doc
        .root_element()
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "Item")
        .find(|item| {
            child_text(*item, "Description") == Some("Hard disk")
                && child_text(*item, "ElementName") == Some(element_name.as_str())
        });
    let Some(disk) = disk else {
        return Ok(None);
    };

    let mut edits = Vec::new();
    if let Some(node) = child(disk, "VirtualQuantity") {
        edits.push((text_range(node)?, hdd.to_string()));
    }
    if let Some(node) = child(disk, "HostResource") {
        edits.push(capacity_edit(xml, node, hdd)?);
    }

    Ok(Some(apply_edits(xml, edits)))
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// 基于模板虚拟机重组 vApp 的请求体
pub fn recompose_params(spec: &VmCreateSpec, source_vm_href: &str) -> String {
    format!(
        r#"<RecomposeVAppParams xmlns="{ns}" xmlns:ovf="{ovf}" deploy="true" powerOn="{power_on}">
  <SourcedItem>
    <Source href="{source_href}" name="{source_name}"/>
    <VmGeneralParams>
      <Name>{target}</Name>
      <NeedsCustomization>true</NeedsCustomization>
    </VmGeneralParams>
    <InstantiationParams>
      <GuestCustomizationSection ovf:required="false">
        <ovf:Info>Specifies Guest OS Customization Settings</ovf:Info>
        <Enabled>true</Enabled>
        <AdminPasswordEnabled>true</AdminPasswordEnabled>
        <AdminPasswordAuto>false</AdminPasswordAuto>
        <AdminPassword>{password}</AdminPassword>
        <ResetPasswordRequired>false</ResetPasswordRequired>
        <ComputerName>{hostname}</ComputerName>
      </GuestCustomizationSection>
    </InstantiationParams>
  </SourcedItem>
  <AllEULAsAccepted>true</AllEULAsAccepted>
</RecomposeVAppParams>"#,
        ns = VCLOUD_NS,
        ovf = OVF_NS,
        power_on = spec.power_on,
        source_href = escape(source_vm_href),
        source_name = escape(&spec.source_vm_name),
        target = escape(&spec.target_vm_name),
        password = escape(&spec.password),
        hostname = escape(&spec.hostname),
    )
}

pub fn snapshot_params(memory: bool) -> String {
    format!(r#"<CreateSnapshotParams xmlns="{}" memory="{}"/>"#, VCLOUD_NS, memory)
}
