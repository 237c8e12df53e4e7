//! Declaration file schema
//!
//! ```toml
//! [provider]
//! api_url = "https://api.runscope.com"
//!
//! [resource.runscope_bucket.main]
//! name = "payments"
//! team_uuid = "..."
//!
//! [data.runscope_integrations.slack]
//! team_uuid = "..."
//! filter = [{ name = "type", values = ["slack"] }]
//! ```

use crate::config::ProviderConfig;
use anyhow::{Context, Result, bail};
use declarative::Attributes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_FILE: &str = "runscope.toml";

/// Instances of one type, keyed by instance name
pub type Instances = BTreeMap<String, Attributes>;

/// Parsed declaration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declaration {
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Managed resources, keyed by type then name
    #[serde(default)]
    pub resource: BTreeMap<String, Instances>,

    /// Data source lookups, keyed by type then name
    #[serde(default)]
    pub data: BTreeMap<String, Instances>,
}

/// One declared resource or data source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Declared<'a> {
    pub resource_type: &'a str,
    pub name: &'a str,
    pub attributes: &'a Attributes,
}

impl Declared<'_> {
    pub fn address(&self) -> String {
        resource_address(self.resource_type, self.name)
    }

    pub fn data_address(&self) -> String {
        data_address(self.resource_type, self.name)
    }
}

pub fn resource_address(resource_type: &str, name: &str) -> String {
    format!("{resource_type}.{name}")
}

pub fn data_address(data_source_type: &str, name: &str) -> String {
    format!("data.{data_source_type}.{name}")
}

impl Declaration {
    /// Load and check a declaration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read declaration file: {}", path.display()))?;
        let declaration = Self::parse(&content)
            .with_context(|| format!("Invalid declaration file: {}", path.display()))?;
        log::debug!(
            "Loaded {} resources and {} data sources from {}",
            declaration.resources().count(),
            declaration.data_sources().count(),
            path.display()
        );
        Ok(declaration)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let declaration: Self = toml::from_str(content).context("Invalid TOML")?;
        declaration.check_names()?;
        Ok(declaration)
    }

    pub fn resources(&self) -> impl Iterator<Item = Declared<'_>> {
        flatten(&self.resource)
    }

    pub fn data_sources(&self) -> impl Iterator<Item = Declared<'_>> {
        flatten(&self.data)
    }

    /// Instance names end up inside `${type.name.attr}` references
    fn check_names(&self) -> Result<()> {
        for declared in self.resources().chain(self.data_sources()) {
            for part in [declared.resource_type, declared.name] {
                if !is_identifier(part) {
                    bail!(
                        "invalid name '{part}': use letters, digits, '_' or '-'"
                    );
                }
            }
        }
        Ok(())
    }
}

fn flatten(tables: &BTreeMap<String, Instances>) -> impl Iterator<Item = Declared<'_>> {
    tables.iter().flat_map(|(resource_type, instances)| {
        instances.iter().map(move |(name, attributes)| Declared {
            resource_type,
            name,
            attributes,
        })
    })
}

pub fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
