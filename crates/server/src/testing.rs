/// 测试辅助：可编排的 vCD 替身、内存仓储和 SQLite 内存库

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::models::{StoredCredentialState, TemplateCatalogEntry, VmRecord};
use common::{Result, VmMetric};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

use crate::app_state::AppState;
use crate::config::{Config, DatabaseConfig, ServerConfig, StatisticsConfig, VcdConfig};
use crate::db::models::{
    catalog_template, settings, template_catalog, vapp_template, vm, vm_statistics, vm_template,
};
use crate::repositories::{SettingsRepository, TemplateCatalogRepository, VmRepository};
use crate::vcd::{EntityRef, MksTicket, Org, VcdApi, VcdConnector, VcdError, VcdResult, VmCreateSpec, VmResource};

pub fn sample_config() -> Config {
    Config {
        server: ServerConfig {
            port: 3000,
            hostname: "https://gw.example.com".to_string(),
            api_prefix: "/api/v1".to_string(),
            static_dir: "static".to_string(),
        },
        database: DatabaseConfig { url: "sqlite::memory:".to_string() },
        vcd: VcdConfig {
            hostname: "https://vcd.example.com".to_string(),
            api_version: "36.0".to_string(),
            organization: "org".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            timeout_secs: 5,
            insecure: false,
        },
        statistics: StatisticsConfig { enabled: false, interval_secs: 3600 },
        log_level: "info".to_string(),
    }
}

/// 建好全部表的 SQLite 内存库
pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    db.execute(backend.build(&schema.create_table_from_entity(settings::Entity))).await.unwrap();
    db.execute(backend.build(&schema.create_table_from_entity(catalog_template::Entity))).await.unwrap();
    db.execute(backend.build(&schema.create_table_from_entity(vapp_template::Entity))).await.unwrap();
    db.execute(backend.build(&schema.create_table_from_entity(vm_template::Entity))).await.unwrap();
    db.execute(backend.build(&schema.create_table_from_entity(template_catalog::Entity))).await.unwrap();
    db.execute(backend.build(&schema.create_table_from_entity(vm::Entity))).await.unwrap();
    db.execute(backend.build(&schema.create_table_from_entity(vm_statistics::Entity))).await.unwrap();
    db
}

pub fn vm_resource(id: &str, status: i32, rels: &[&str]) -> VmResource {
    let href = format!("https://vcd.example.com/api/vApp/vm-{}", id);
    VmResource {
        id: id.to_string(),
        name: format!("vm-{}", id),
        href: href.clone(),
        status,
        links: rels
            .iter()
            .map(|rel| crate::vcd::types::Link {
                rel: rel.to_string(),
                href: format!("{}/{}", href, rel),
                media_type: None,
                name: None,
            })
            .collect(),
    }
}

pub fn entity(name: &str) -> EntityRef {
    EntityRef {
        name: name.to_string(),
        href: format!("https://vcd.example.com/api/{}", name),
    }
}

/// vDC → vApp → VM 树
pub type Inventory = Vec<(EntityRef, Vec<(EntityRef, Vec<VmResource>)>)>;

/// 可编排的 vCD 替身，记录每次调用
#[derive(Default)]
pub struct MockVcd {
    pub calls: Mutex<Vec<String>>,
    pub issued_token: String,
    pub login_error: Option<VcdError>,
    pub rehydrate_error: Option<VcdError>,
    pub inventory: Inventory,
    pub catalog_items: HashMap<(String, String), EntityRef>,
    pub vm_error: Option<VcdError>,
    pub add_vm_error: Option<VcdError>,
    pub power_error: Option<VcdError>,
    pub mks_error: Option<VcdError>,
    pub metrics: HashMap<String, VcdResult<Vec<VmMetric>>>,
    pub modify_error: Option<VcdError>,
    pub disks_xml: String,
    pub put_disks_error: Option<VcdError>,
    pub put_disks_bodies: Mutex<Vec<String>>,
    pub created: Mutex<Vec<(EntityRef, VmCreateSpec)>>,
}

impl MockVcd {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    fn fail(error: &Option<VcdError>) -> VcdResult<()> {
        match error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn all_vms(&self) -> impl Iterator<Item = &VmResource> {
        self.inventory
            .iter()
            .flat_map(|(_, vapps)| vapps.iter().flat_map(|(_, vms)| vms.iter()))
    }
}

#[async_trait]
impl VcdApi for MockVcd {
    async fn login_basic(&self, organization: &str, username: &str, _password: &str) -> VcdResult<String> {
        self.record(format!("login_basic:{}@{}", username, organization));
        Self::fail(&self.login_error)?;
        Ok(self.issued_token.clone())
    }

    async fn rehydrate_from_token(&self, session_id: &str) -> VcdResult<()> {
        self.record(format!("rehydrate:{}", session_id));
        Self::fail(&self.rehydrate_error)
    }

    async fn get_org(&self) -> VcdResult<Org> {
        self.record("get_org");
        Ok(Org {
            name: "org".to_string(),
            href: "https://vcd.example.com/api/org/1".to_string(),
            links: Vec::new(),
        })
    }

    async fn get_vdc(&self, _org: &Org, title: &str) -> VcdResult<Option<EntityRef>> {
        self.record(format!("get_vdc:{}", title));
        Ok(self.inventory.iter().map(|(vdc, _)| vdc).find(|v| v.name == title).cloned())
    }

    async fn list_vdcs(&self, _org: &Org) -> VcdResult<Vec<EntityRef>> {
        self.record("list_vdcs");
        Ok(self.inventory.iter().map(|(vdc, _)| vdc.clone()).collect())
    }

    async fn get_vapp(&self, vdc: &EntityRef, title: &str) -> VcdResult<EntityRef> {
        self.record(format!("get_vapp:{}", title));
        self.list_vapps_of(vdc)
            .into_iter()
            .find(|v| v.name == title)
            .ok_or_else(|| VcdError::EntityNotFound(format!("vApp named '{}' not found", title)))
    }

    async fn list_vapps(&self, vdc: &EntityRef) -> VcdResult<Vec<EntityRef>> {
        self.record(format!("list_vapps:{}", vdc.name));
        Ok(self.list_vapps_of(vdc))
    }

    async fn list_vms(&self, vapp: &EntityRef) -> VcdResult<Vec<VmResource>> {
        self.record(format!("list_vms:{}", vapp.name));
        Ok(self
            .inventory
            .iter()
            .flat_map(|(_, vapps)| vapps.iter())
            .find(|(v, _)| v == vapp)
            .map(|(_, vms)| vms.clone())
            .unwrap_or_default())
    }

    async fn get_catalog_item(&self, _org: &Org, catalog: &str, item: &str) -> VcdResult<EntityRef> {
        self.record(format!("get_catalog_item:{}/{}", catalog, item));
        self.catalog_items
            .get(&(catalog.to_string(), item.to_string()))
            .cloned()
            .ok_or_else(|| VcdError::EntityNotFound(format!("Catalog item '{}' not found", item)))
    }

    async fn get_vm(&self, vm_id: &str) -> VcdResult<VmResource> {
        self.record(format!("get_vm:{}", vm_id));
        if let Some(e) = &self.vm_error {
            return Err(e.clone());
        }
        self.all_vms()
            .find(|vm| vm.id == vm_id)
            .cloned()
            .ok_or_else(|| VcdError::AccessForbidden("Either you need some rights or the entity does not exist".to_string()))
    }

    async fn add_vm(&self, vapp: &EntityRef, spec: &VmCreateSpec) -> VcdResult<()> {
        self.record(format!("add_vm:{}", vapp.name));
        Self::fail(&self.add_vm_error)?;
        self.created.lock().unwrap().push((vapp.clone(), spec.clone()));
        Ok(())
    }

    async fn power_on(&self, vm: &VmResource) -> VcdResult<()> {
        self.record(format!("power_on:{}", vm.id));
        Self::fail(&self.power_error)
    }

    async fn power_off(&self, vm: &VmResource) -> VcdResult<()> {
        self.record(format!("power_off:{}", vm.id));
        Self::fail(&self.power_error)
    }

    async fn power_reset(&self, vm: &VmResource) -> VcdResult<()> {
        self.record(format!("power_reset:{}", vm.id));
        Self::fail(&self.power_error)
    }

    async fn acquire_mks_ticket(&self, vm: &VmResource) -> VcdResult<MksTicket> {
        self.record(format!("acquire_mks_ticket:{}", vm.id));
        Self::fail(&self.mks_error)?;
        Ok(MksTicket {
            host: "10.0.0.1".to_string(),
            port: "902".to_string(),
            ticket: "cst-abc".to_string(),
        })
    }

    async fn create_snapshot(&self, vm: &VmResource) -> VcdResult<()> {
        self.record(format!("create_snapshot:{}", vm.id));
        Ok(())
    }

    async fn list_current_metrics(&self, vm: &VmResource) -> VcdResult<Vec<VmMetric>> {
        self.record(format!("list_current_metrics:{}", vm.id));
        self.metrics.get(&vm.id).cloned().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn modify_cpu(&self, vm: &VmResource, cpu: u32) -> VcdResult<()> {
        self.record(format!("modify_cpu:{}:{}", vm.id, cpu));
        Self::fail(&self.modify_error)
    }

    async fn modify_memory(&self, vm: &VmResource, ram: u64) -> VcdResult<()> {
        self.record(format!("modify_memory:{}:{}", vm.id, ram));
        Self::fail(&self.modify_error)
    }

    async fn get_disks(&self, vm: &VmResource) -> VcdResult<String> {
        self.record(format!("get_disks:{}", vm.id));
        Ok(self.disks_xml.clone())
    }

    async fn put_disks(&self, vm: &VmResource, body: String) -> VcdResult<()> {
        self.record(format!("put_disks:{}", vm.id));
        Self::fail(&self.put_disks_error)?;
        self.put_disks_bodies.lock().unwrap().push(body);
        Ok(())
    }
}

impl MockVcd {
    fn list_vapps_of(&self, vdc: &EntityRef) -> Vec<EntityRef> {
        self.inventory
            .iter()
            .find(|(v, _)| v == vdc)
            .map(|(_, vapps)| vapps.iter().map(|(vapp, _)| vapp.clone()).collect())
            .unwrap_or_default()
    }
}

pub struct MockConnector {
    pub api: Arc<MockVcd>,
}

impl VcdConnector for MockConnector {
    fn connect(&self) -> VcdResult<Arc<dyn VcdApi>> {
        let api: Arc<dyn VcdApi> = self.api.clone();
        Ok(api)
    }
}

#[derive(Default)]
pub struct MemorySettingsRepository {
    pub state: Mutex<StoredCredentialState>,
    pub token_writes: Mutex<Vec<String>>,
}

#[async_trait]
impl SettingsRepository for MemorySettingsRepository {
    async fn get_or_create(&self) -> Result<StoredCredentialState> {
        Ok(self.state.lock().unwrap().clone())
    }

    async fn update_api_token(&self, token: &str) -> Result<()> {
        self.state.lock().unwrap().api_token = Some(token.to_string());
        self.token_writes.lock().unwrap().push(token.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTemplateRepository {
    pub entries: HashMap<i32, TemplateCatalogEntry>,
}

#[async_trait]
impl TemplateCatalogRepository for MemoryTemplateRepository {
    async fn get(&self, template_id: i32) -> Result<Option<TemplateCatalogEntry>> {
        Ok(self.entries.get(&template_id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryVmRepository {
    pub vms: Mutex<Vec<VmRecord>>,
    pub batches: Mutex<Vec<HashMap<i32, serde_json::Value>>>,
}

#[async_trait]
impl VmRepository for MemoryVmRepository {
    async fn get_or_create(&self, remote_vm_id: &str, title: &str) -> Result<VmRecord> {
        let mut vms = self.vms.lock().unwrap();
        if let Some(existing) = vms.iter().find(|v| v.remote_vm_id == remote_vm_id) {
            return Ok(existing.clone());
        }
        let record = VmRecord {
            id: vms.len() as i32 + 1,
            remote_vm_id: remote_vm_id.to_string(),
            title: title.to_string(),
        };
        vms.push(record.clone());
        Ok(record)
    }

    async fn bulk_create_statistics(&self, statistics: HashMap<i32, serde_json::Value>) -> Result<()> {
        self.batches.lock().unwrap().push(statistics);
        Ok(())
    }
}

/// 一套接好替身的应用状态
pub struct TestContext {
    pub state: AppState,
    pub vcd: Arc<MockVcd>,
    pub settings: Arc<MemorySettingsRepository>,
    pub vms: Arc<MemoryVmRepository>,
}

impl TestContext {
    pub fn new(vcd: MockVcd) -> Self {
        Self::with(vcd, StoredCredentialState::default(), MemoryTemplateRepository::default())
    }

    pub fn with(vcd: MockVcd, stored: StoredCredentialState, templates: MemoryTemplateRepository) -> Self {
        let vcd = Arc::new(vcd);
        let settings = Arc::new(MemorySettingsRepository {
            state: Mutex::new(stored),
            token_writes: Mutex::new(Vec::new()),
        });
        let vms = Arc::new(MemoryVmRepository::default());
        let state = AppState {
            config: Arc::new(sample_config()),
            settings_repo: settings.clone(),
            template_repo: Arc::new(templates),
            vm_repo: vms.clone(),
            connector: Arc::new(MockConnector { api: vcd.clone() }),
        };
        Self { state, vcd, settings, vms }
    }
}
