use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::Config;
use serde::Deserialize;

use crate::parser::ContentContainer;

const DEFAULT_CONFIG_FILE: &str = "migrator";
const ENV_PREFIX: &str = "MIGRATOR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Rest,
}

/// Everything the commands need, loaded once at startup and passed down.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub company_id: String,
    #[serde(default = "default_store")]
    pub store: StoreBackend,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default)]
    pub rest_url: Option<String>,
    #[serde(default)]
    pub rest_key: Option<String>,
    #[serde(default = "default_document_root")]
    pub document_root: PathBuf,
    #[serde(default = "default_document_extension")]
    pub document_extension: String,
    #[serde(default = "default_container_selector")]
    pub container_selector: String,
    #[serde(default = "default_asset_root")]
    pub asset_root: String,
    #[serde(default = "default_asset_dir")]
    pub asset_dir: PathBuf,
    #[serde(default = "default_image_extension")]
    pub image_extension: String,
    #[serde(default = "default_fallback_image")]
    pub fallback_image: String,
    #[serde(default)]
    pub image_overrides: Option<PathBuf>,
    #[serde(default = "default_delete_chunk_size")]
    pub delete_chunk_size: usize,
    /// Rows per request when listing through the REST store.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_technical_source")]
    pub technical_source: PathBuf,
    #[serde(default = "default_technical_output")]
    pub technical_output: PathBuf,
}

fn default_store() -> StoreBackend {
    StoreBackend::Sqlite
}
fn default_database_path() -> PathBuf {
    PathBuf::from("data/catalog.sqlite")
}
fn default_document_root() -> PathBuf {
    PathBuf::from("public_html")
}
fn default_document_extension() -> String {
    "html".into()
}
fn default_container_selector() -> String {
    ".services-detail .inner-box .lower-content".into()
}
fn default_asset_root() -> String {
    "/images/".into()
}
fn default_asset_dir() -> PathBuf {
    PathBuf::from("public/images")
}
fn default_image_extension() -> String {
    "jpg".into()
}
fn default_fallback_image() -> String {
    "/images/slider-hd-1.png".into()
}
fn default_delete_chunk_size() -> usize {
    50
}
fn default_page_size() -> usize {
    crate::store::rest::DEFAULT_PAGE_SIZE
}
fn default_technical_source() -> PathBuf {
    PathBuf::from("public_html/technical.html")
}
fn default_technical_output() -> PathBuf {
    PathBuf::from("data/technical-data.json")
}

impl Settings {
    /// `migrator.toml` (or `path`) overlaid by `MIGRATOR_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p.to_path_buf()).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.company_id.trim().is_empty() {
            bail!("company_id must not be empty");
        }
        if self.delete_chunk_size == 0 {
            bail!("delete_chunk_size must be at least 1");
        }
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        if self.store == StoreBackend::Rest && self.rest_url.is_none() {
            bail!("store = \"rest\" requires rest_url");
        }
        self.container()?;
        Ok(())
    }

    pub fn container(&self) -> Result<ContentContainer> {
        ContentContainer::parse(&self.container_selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(raw: &str) -> Result<Settings> {
        let settings: Settings = Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    #[test]
    fn defaults_fill_missing_keys() {
        let s = from_toml(r#"company_id = "acme""#).unwrap();
        assert_eq!(s.store, StoreBackend::Sqlite);
        assert_eq!(s.document_extension, "html");
        assert_eq!(s.asset_root, "/images/");
        assert_eq!(s.delete_chunk_size, 50);
        assert_eq!(s.page_size, 1000);
        assert_eq!(s.fallback_image, "/images/slider-hd-1.png");
    }

    #[test]
    fn company_id_is_required() {
        assert!(from_toml(r#"store = "sqlite""#).is_err());
        assert!(from_toml(r#"company_id = "  ""#).is_err());
    }

    #[test]
    fn rest_backend_needs_url() {
        assert!(from_toml("company_id = \"acme\"\nstore = \"rest\"").is_err());
        let s = from_toml("company_id = \"acme\"\nstore = \"rest\"\nrest_url = \"http://localhost\"")
            .unwrap();
        assert_eq!(s.store, StoreBackend::Rest);
    }

    #[test]
    fn bad_selector_rejected() {
        assert!(from_toml("company_id = \"acme\"\ncontainer_selector = \"..nope[\"").is_err());
    }

    #[test]
    fn zero_chunk_size_rejected() {
        assert!(from_toml("company_id = \"acme\"\ndelete_chunk_size = 0").is_err());
    }

    #[test]
    fn zero_page_size_rejected() {
        assert!(from_toml("company_id = \"acme\"\npage_size = 0").is_err());
    }
}
