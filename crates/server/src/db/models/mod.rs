/// 数据库实体

pub mod catalog_template;
pub mod settings;
pub mod template_catalog;
pub mod vapp_template;
pub mod vm;
pub mod vm_statistics;
pub mod vm_template;
