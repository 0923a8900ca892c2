//! Per-site domain table
//!
//! Listing sites move between domains often, so the current host of each
//! site is runtime state. The table is read at the start of every scrape
//! call, updated from the chat, and persisted as a small JSON file.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::SiteKey;

static SCHEME_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://").expect("valid scheme regex"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Domain must not be empty")]
    Empty,

    #[error("Domain table lock poisoned")]
    Poisoned,
}

/// Trim, strip a leading `http://`/`https://`, strip trailing `/`
pub fn normalize_domain(raw: &str) -> Result<String, DomainError> {
    let without_scheme = SCHEME_PREFIX.replace(raw.trim(), "");
    let host = without_scheme.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(DomainError::Empty);
    }
    Ok(host.to_string())
}

/// Site → current domain, shared by the scraper and the chat layer
#[derive(Debug)]
pub struct SiteDomainTable {
    domains: RwLock<HashMap<SiteKey, String>>,
    path: Option<PathBuf>,
}

impl Default for SiteDomainTable {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SiteDomainTable {
    fn default_domains() -> HashMap<SiteKey, String> {
        SiteKey::ALL
            .iter()
            .map(|site| (*site, site.default_domain().to_string()))
            .collect()
    }

    /// Defaults only, never persisted
    pub fn in_memory() -> Self {
        Self {
            domains: RwLock::new(Self::default_domains()),
            path: None,
        }
    }

    /// Defaults overlaid with the file at `path`.
    /// A missing file is created; a corrupt one is logged and rewritten.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut domains = Self::default_domains();

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Map<String, Value>>(&contents) {
                Ok(stored) => {
                    Self::overlay(&mut domains, &stored);
                    info!("Loaded site domains from {}", path.display());
                }
                Err(e) => warn!("Site domain file {} is corrupt ({}); rewriting defaults", path.display(), e),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No site domain file at {}; creating it", path.display());
            }
            Err(e) => warn!("Failed to read site domain file {}: {}", path.display(), e),
        }

        let table = Self {
            domains: RwLock::new(domains),
            path: Some(path),
        };
        table.persist();
        table
    }

    fn overlay(domains: &mut HashMap<SiteKey, String>, stored: &Map<String, Value>) {
        for (key, value) in stored {
            let Ok(site) = key.parse::<SiteKey>() else {
                debug!("Ignoring unknown site key '{}' in domain file", key);
                continue;
            };
            match value.as_str().map(normalize_domain) {
                Some(Ok(domain)) => {
                    domains.insert(site, domain);
                }
                _ => warn!("Ignoring invalid domain for {} in domain file", site),
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current domain of `site`
    pub fn get(&self, site: SiteKey) -> String {
        self.domains
            .read()
            .ok()
            .and_then(|domains| domains.get(&site).cloned())
            .unwrap_or_else(|| site.default_domain().to_string())
    }

    /// Normalize and store a new domain; the previous value is kept on error
    pub fn update(&self, site: SiteKey, raw: &str) -> Result<String, DomainError> {
        let domain = normalize_domain(raw)?;
        {
            let mut domains = self.domains.write().map_err(|_| DomainError::Poisoned)?;
            domains.insert(site, domain.clone());
        }
        info!("Domain for {} updated to {}", site, domain);
        self.persist();
        Ok(domain)
    }

    pub fn snapshot(&self) -> HashMap<SiteKey, String> {
        self.domains.read().map(|d| d.clone()).unwrap_or_default()
    }

    /// Best-effort write of the whole table as pretty JSON
    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let stored: Map<String, Value> = SiteKey::ALL
            .iter()
            .map(|site| (site.as_str().to_string(), Value::String(self.get(*site))))
            .collect();

        let result = serde_json::to_string_pretty(&stored)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
                }
                std::fs::write(path, json).map_err(|e| e.to_string())
            });

        if let Err(e) = result {
            warn!("Failed to persist site domains to {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("https://example.new/", "example.new")]
    #[case("  http://example.new//  ", "example.new")]
    #[case("HTTPS://Mirror.site", "Mirror.site")]
    #[case("plain.host", "plain.host")]
    fn normalizes_domains(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_domain(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("https://")]
    #[case("///")]
    fn rejects_empty_domains(#[case] raw: &str) {
        assert_eq!(normalize_domain(raw), Err(DomainError::Empty));
    }

    #[test]
    fn defaults_are_seeded() {
        let table = SiteDomainTable::in_memory();
        assert_eq!(table.get(SiteKey::Hdmovie2), "hdmovie2.trading");
        assert_eq!(table.get(SiteKey::Hdhub4u), "hdhub4u.gratis");
        assert_eq!(table.get(SiteKey::Cinevood), "1cinevood.asia");
    }

    #[test]
    fn rejected_update_keeps_previous_value() {
        let table = SiteDomainTable::in_memory();
        assert!(table.update(SiteKey::Cinevood, "  ").is_err());
        assert_eq!(table.get(SiteKey::Cinevood), "1cinevood.asia");
    }

    #[test]
    fn update_persists_and_reloads() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("site_config.json");

        let table = SiteDomainTable::load(&path);
        assert_eq!(table.update(SiteKey::Hdhub4u, "https://hdhub4u.new/").unwrap(), "hdhub4u.new");

        let reloaded = SiteDomainTable::load(&path);
        assert_eq!(reloaded.get(SiteKey::Hdhub4u), "hdhub4u.new");
        assert_eq!(reloaded.get(SiteKey::Hdmovie2), "hdmovie2.trading");
    }

    #[test]
    fn load_ignores_unknown_keys_and_invalid_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("site_config.json");
        std::fs::write(&path, r#"{"cinevood": "https://cv.example/", "hdhub4u": "", "other": "x.y"}"#).unwrap();

        let table = SiteDomainTable::load(&path);
        assert_eq!(table.get(SiteKey::Cinevood), "cv.example");
        assert_eq!(table.get(SiteKey::Hdhub4u), "hdhub4u.gratis");

        let rewritten: Map<String, Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(!rewritten.contains_key("other"));
        assert_eq!(rewritten.len(), 3);
    }

    #[test]
    fn corrupt_file_is_rewritten() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("site_config.json");
        std::fs::write(&path, "{not json").unwrap();

        let table = SiteDomainTable::load(&path);
        assert_eq!(table.get(SiteKey::Hdmovie2), "hdmovie2.trading");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<Map<String, Value>>(&contents).is_ok());
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(host in "[a-z0-9]{1,12}\\.[a-z]{2,6}", scheme in prop_oneof![Just(""), Just("http://"), Just("https://")], slash in prop_oneof![Just(""), Just("/")]) {
            let raw = format!("{scheme}{host}{slash}");
            let once = normalize_domain(&raw).unwrap();
            prop_assert_eq!(&once, &host);
            prop_assert_eq!(normalize_domain(&once).unwrap(), once);
        }
    }
}
