use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Settings;

/// Curated slug → image exceptions: typo'd filenames and cross-grade fallbacks.
const BUILTIN_OVERRIDES: &str = include_str!("../assets/image_overrides.json");

const DEFAULT_ASSET_ROOT: &str = "/images/";
const DEFAULT_EXTENSION: &str = "jpg";
pub const FALLBACK_IMAGE: &str = "/images/slider-hd-1.png";

/// Maps a catalog slug to its illustrative image path. Pure: never touches disk.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    asset_root: String,
    extension: String,
    fallback: String,
    overrides: HashMap<String, String>,
}

impl ImageResolver {
    pub fn builtin() -> Self {
        Self {
            asset_root: DEFAULT_ASSET_ROOT.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            fallback: FALLBACK_IMAGE.to_string(),
            overrides: parse_overrides(BUILTIN_OVERRIDES)
                .expect("bundled image_overrides.json is valid"),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut resolver = Self {
            asset_root: settings.asset_root.clone(),
            extension: settings.image_extension.clone(),
            fallback: settings.fallback_image.clone(),
            ..Self::builtin()
        };
        if let Some(path) = &settings.image_overrides {
            resolver.overrides.extend(load_overrides(path)?);
        }
        Ok(resolver)
    }

    pub fn asset_root(&self) -> &str {
        &self.asset_root
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    pub fn resolve(&self, slug: Option<&str>) -> String {
        let slug = match slug.map(str::trim) {
            Some(s) if !s.is_empty() => s.to_lowercase(),
            _ => return self.fallback.clone(),
        };

        if let Some(mapped) = self.overrides.get(&slug) {
            return if mapped.starts_with('/') {
                mapped.clone()
            } else {
                format!("{}{}", self.asset_root, mapped)
            };
        }

        format!("{}{}.{}", self.asset_root, slug, self.extension)
    }
}

fn parse_overrides(raw: &str) -> Result<HashMap<String, String>> {
    let table: HashMap<String, String> = serde_json::from_str(raw)?;
    Ok(table
        .into_iter()
        .map(|(slug, path)| (slug.trim().to_lowercase(), path.trim().to_string()))
        .collect())
}

fn load_overrides(path: &Path) -> Result<HashMap<String, String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read image overrides {}", path.display()))?;
    parse_overrides(&raw).with_context(|| format!("Invalid image overrides {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_absent_slug_fall_back() {
        let r = ImageResolver::builtin();
        assert_eq!(r.resolve(Some("")), FALLBACK_IMAGE);
        assert_eq!(r.resolve(Some("   ")), FALLBACK_IMAGE);
        assert_eq!(r.resolve(None), FALLBACK_IMAGE);
    }

    #[test]
    fn rooted_override_returned_as_authored() {
        let r = ImageResolver::builtin();
        assert_eq!(
            r.resolve(Some("stainless-steel-316-316l-socketweld-fittings-supplier")),
            "/images/products/stainless-steel-304-socketweld-fittings-supplier.jpg"
        );
    }

    #[test]
    fn bare_override_gets_asset_root() {
        let r = ImageResolver::builtin();
        assert_eq!(
            r.resolve(Some("strips-coils-manufacturer-stockist")),
            "/images/strips-coils.jpg"
        );
    }

    #[test]
    fn typo_filename_preserved() {
        let r = ImageResolver::builtin();
        assert_eq!(
            r.resolve(Some("stainless-steel-347-socket-weld-fittings-manufacturer")),
            "/images/products/stainless-steel-347-sockeweld-fittings-supplier.jpg"
        );
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let r = ImageResolver::builtin();
        assert_eq!(
            r.resolve(Some("Strips-Coils-Manufacturer-Stockist")),
            "/images/strips-coils.jpg"
        );
    }

    #[test]
    fn unmapped_slug_uses_convention() {
        let r = ImageResolver::builtin();
        assert_eq!(
            r.resolve(Some("Inconel-600-Round-Bars")),
            "/images/inconel-600-round-bars.jpg"
        );
    }

    #[test]
    fn extra_overrides_extend_builtin() {
        let mut r = ImageResolver::builtin();
        let before = r.override_count();
        r.overrides
            .extend(parse_overrides(r#"{"Hastelloy-Pipes": "hastelloy-c276-pipes.jpg"}"#).unwrap());
        assert_eq!(r.override_count(), before + 1);
        assert_eq!(r.resolve(Some("hastelloy-pipes")), "/images/hastelloy-c276-pipes.jpg");
    }
}
