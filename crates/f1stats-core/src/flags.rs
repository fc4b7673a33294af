//! Nationality to flag image lookup.
//!
//! The default table ships inside the binary (`data/flags.json`). Deployments
//! can layer their own JSON file of the same shape over it.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

const DEFAULT_FLAGS: &str = include_str!("../data/flags.json");

#[derive(Debug, Deserialize)]
struct FlagFile {
    #[serde(default)]
    flags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct FlagTable {
    flags: HashMap<String, String>,
}

impl FlagTable {
    /// The embedded table.
    ///
    /// Falls back to an empty table, with a warning, if the embedded file
    /// does not parse.
    pub fn embedded() -> Self {
        Self::from_json(DEFAULT_FLAGS).unwrap_or_else(|e| {
            warn!(error = %e, "Embedded flag table is malformed, no flags will be shown");
            Self::default()
        })
    }

    /// Parse a table in the `{"flags": {nationality: path}}` layout.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: FlagFile = serde_json::from_str(json)?;
        Ok(Self { flags: file.flags })
    }

    /// The embedded table with entries from `path` layered on top.
    pub fn with_overrides(path: &Path) -> std::io::Result<Self> {
        let mut table = Self::embedded();
        let data = std::fs::read_to_string(path)?;
        let overrides = Self::from_json(&data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        debug!(path = %path.display(), count = overrides.len(), "Loaded flag overrides");
        table.flags.extend(overrides.flags);
        Ok(table)
    }

    /// Flag path for a nationality, or an empty string when unmapped.
    pub fn lookup(&self, nationality: &str) -> String {
        self.flags.get(nationality).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
