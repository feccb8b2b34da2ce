//! Plugin discovery.
//!
//! Tools are never resolved by reflection. A [`Catalog`] built at startup maps
//! module names to constructors, and a [`PluginSource`] yields the units to
//! load: every catalog entry ([`CatalogSource`]), the YAML manifests found in a
//! directory ([`ManifestSource`]), or an explicit list ([`StaticSource`]).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;

use super::{
    Calculator, DateTimeTool, FileOperations, News, StockQuote, Tool, Weather, WebSearch,
};

/// Builds the tools exposed by one unit.
pub type Loader = Arc<dyn Fn() -> anyhow::Result<Vec<Arc<dyn Tool>>> + Send + Sync>;

/// Constructor registered in a [`Catalog`].
pub type ToolConstructor = fn() -> anyhow::Result<Vec<Arc<dyn Tool>>>;

#[derive(Clone)]
pub enum UnitKind {
    /// Nothing to load; skipped with a warning.
    Empty,
    Loadable(Loader),
}

/// One loadable unit found by a source.
#[derive(Clone)]
pub struct PluginUnit {
    pub id: String,
    pub kind: UnitKind,
}

impl PluginUnit {
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: UnitKind::Empty,
        }
    }

    pub fn loadable<F>(id: impl Into<String>, load: F) -> Self
    where
        F: Fn() -> anyhow::Result<Vec<Arc<dyn Tool>>> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            kind: UnitKind::Loadable(Arc::new(load)),
        }
    }

    /// A unit whose loading always fails with `message`.
    fn broken(id: impl Into<String>, message: String) -> Self {
        Self::loadable(id, move || Err(anyhow::anyhow!("{}", message)))
    }
}

impl fmt::Debug for PluginUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            UnitKind::Empty => "empty",
            UnitKind::Loadable(_) => "loadable",
        };
        f.debug_struct("PluginUnit")
            .field("id", &self.id)
            .field("kind", &kind)
            .finish()
    }
}

/// A location that yields plugin units.
pub trait PluginSource: Send + Sync {
    /// Human-readable location, used in logs and reports.
    fn location(&self) -> String;

    /// Enumerate units. Errors here abort only this scan.
    fn scan(&self) -> anyhow::Result<Vec<PluginUnit>>;
}

/// Name to constructor table.
#[derive(Clone, Default)]
pub struct Catalog {
    entries: Vec<(String, ToolConstructor)>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, constructor: ToolConstructor) -> Self {
        self.entries.push((name.into(), constructor));
        self
    }

    pub fn get(&self, name: &str) -> Option<ToolConstructor> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ctor)| *ctor)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }
}

fn single(tool: impl Tool + 'static) -> anyhow::Result<Vec<Arc<dyn Tool>>> {
    Ok(vec![Arc::new(tool)])
}

/// The tools shipped with the crate.
pub fn builtin_catalog() -> Catalog {
    Catalog::new()
        .with("calculator", || single(Calculator))
        .with("datetime", || single(DateTimeTool))
        .with("file_operations", || single(FileOperations))
        .with("weather", || single(Weather))
        .with("news", || single(News))
        .with("stock", || single(StockQuote))
        .with("web_search", || single(WebSearch))
}

/// Every catalog entry as one unit.
pub struct CatalogSource {
    catalog: Catalog,
}

impl CatalogSource {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn builtin() -> Self {
        Self::new(builtin_catalog())
    }
}

impl PluginSource for CatalogSource {
    fn location(&self) -> String {
        "built-in catalog".to_string()
    }

    fn scan(&self) -> anyhow::Result<Vec<PluginUnit>> {
        Ok(self
            .catalog
            .entries
            .iter()
            .map(|(name, ctor)| {
                let ctor = *ctor;
                PluginUnit::loadable(name.clone(), move || ctor())
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    module: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Directory of `*.yaml` / `*.yml` manifests, one unit per file.
///
/// ```yaml
/// module: calculator
/// enabled: true
/// ```
pub struct ManifestSource {
    dir: PathBuf,
    catalog: Catalog,
}

impl ManifestSource {
    pub fn new(dir: impl Into<PathBuf>, catalog: Catalog) -> Self {
        Self {
            dir: dir.into(),
            catalog,
        }
    }

    fn unit_for(&self, path: &Path) -> PluginUnit {
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => return PluginUnit::broken(id, format!("cannot read manifest: {}", e)),
        };
        if contents.trim().is_empty() {
            return PluginUnit::empty(id);
        }

        let manifest: Manifest = match serde_yaml::from_str(&contents) {
            Ok(m) => m,
            Err(e) => return PluginUnit::broken(id, format!("invalid manifest: {}", e)),
        };
        if !manifest.enabled {
            tracing::info!("Manifest {} is disabled", id);
            return PluginUnit::empty(id);
        }

        match self.catalog.get(&manifest.module) {
            Some(ctor) => PluginUnit::loadable(id, move || ctor()),
            None => PluginUnit::broken(
                id,
                format!(
                    "unknown module '{}' (known: {})",
                    manifest.module,
                    self.catalog.names().join(", ")
                ),
            ),
        }
    }
}

impl PluginSource for ManifestSource {
    fn location(&self) -> String {
        self.dir.display().to_string()
    }

    fn scan(&self) -> anyhow::Result<Vec<PluginUnit>> {
        if !self.dir.exists() {
            tracing::warn!("Tools directory '{}' not found", self.dir.display());
            return Ok(Vec::new());
        }
        if !self.dir.is_dir() {
            anyhow::bail!("'{}' is not a directory", self.dir.display());
        }

        let mut units = Vec::new();
        for entry in walkdir::WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.with_context(|| format!("reading {}", self.dir.display()))?;
            let path = entry.path();
            let is_manifest = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "yaml" || ext == "yml");
            if !entry.file_type().is_file() || !is_manifest {
                continue;
            }
            units.push(self.unit_for(path));
        }
        Ok(units)
    }
}

/// Explicit list of units.
pub struct StaticSource {
    location: String,
    units: Vec<PluginUnit>,
}

impl StaticSource {
    pub fn new(location: impl Into<String>, units: Vec<PluginUnit>) -> Self {
        Self {
            location: location.into(),
            units,
        }
    }
}

impl PluginSource for StaticSource {
    fn location(&self) -> String {
        self.location.clone()
    }

    fn scan(&self) -> anyhow::Result<Vec<PluginUnit>> {
        Ok(self.units.clone())
    }
}
