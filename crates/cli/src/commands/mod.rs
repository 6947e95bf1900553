pub mod chat;
pub mod config_cmd;
pub mod onboard;
pub mod tools;

use pillbox_config::AppConfig;
use pillbox_tools::Catalog;
use std::path::Path;

/// The configured catalog file, or the built-in catalog.
pub fn load_catalog(config: &AppConfig) -> Result<Catalog, pillbox_tools::CatalogError> {
    match &config.catalog.path {
        Some(path) => Catalog::from_toml_file(Path::new(path)),
        None => Ok(Catalog::builtin()),
    }
}
