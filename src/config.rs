//! Generator configuration: JSON file + scalar table.
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::ConfigError;

/// Built-in GraphQL scalars and the target types they map to.
static BUILTIN_SCALARS: Lazy<IndexMap<String, String>> = Lazy::new(|| {
    [
        ("Int", "i32"),
        ("Float", "f64"),
        ("String", "String"),
        ("Boolean", "bool"),
        ("ID", "String"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Schema SDL file.
    #[serde(default)]
    pub schema: Option<PathBuf>,
    /// Query document paths or glob patterns.
    #[serde(default)]
    pub queries: Vec<String>,
    /// GraphQL scalar name → target type. Merged over the built-ins.
    #[serde(default)]
    pub scalars: IndexMap<String, String>,
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&source).map_err(|source| ConfigError::Parse { path: display, source })
    }

    pub fn from_json(source: &str) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
        let de = &mut serde_json::Deserializer::from_str(source);
        serde_path_to_error::deserialize(de)
    }

    /// Adds `Name=Type` overrides, e.g. from the command line.
    pub fn with_scalar_overrides<I>(mut self, overrides: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for raw in overrides {
            let raw = raw.as_ref();
            let (name, ty) = raw
                .split_once('=')
                .map(|(n, t)| (n.trim(), t.trim()))
                .filter(|(n, t)| !n.is_empty() && !t.is_empty())
                .ok_or_else(|| ConfigError::ScalarMapping(raw.to_string()))?;
            self.scalars.insert(name.to_string(), ty.to_string());
        }
        Ok(self)
    }

    /// Effective scalar table: built-ins, then user entries.
    pub fn scalar_table(&self) -> IndexMap<String, String> {
        let mut table = BUILTIN_SCALARS.clone();
        table.extend(self.scalars.iter().map(|(k, v)| (k.clone(), v.clone())));
        table
    }
}
