use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::Attributes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FILE: &str = "runscope.state.toml";

// ============================================================================
// State Structures
// ============================================================================

/// Everything the provider knows about the remote side after the last run
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct State {
    /// Incremented on every save
    #[serde(default)]
    pub serial: u64,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    /// Managed resources keyed by address (`type.name`)
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceState>,
}

/// One managed resource as last seen
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResourceState {
    pub resource_type: String,
    pub name: String,
    pub id: String,

    /// Resolved declared attributes merged with what the API reported
    #[serde(default)]
    pub attributes: Attributes,

    /// Addresses this resource referenced when it was applied
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl ResourceState {
    pub fn address(&self) -> String {
        crate::schema::resource_address(&self.resource_type, &self.name)
    }
}

// ============================================================================
// State Implementation
// ============================================================================

impl State {
    /// Load state from disk, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!(
            "Loaded state serial {} with {} resources from {}",
            state.serial,
            state.resources.len(),
            path.display()
        );
        Ok(state)
    }

    /// Save state to disk, bumping the serial
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.serial += 1;
        self.last_updated = Utc::now();

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        // Write next to the target and rename so a crash never leaves half a file
        let tmp = tmp_path(path);
        fs::write(&tmp, &content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state serial {} to {}", self.serial, path.display());
        Ok(())
    }

    pub fn get(&self, address: &str) -> Option<&ResourceState> {
        self.resources.get(address)
    }

    pub fn upsert(&mut self, resource: ResourceState) {
        self.resources.insert(resource.address(), resource);
    }

    pub fn remove(&mut self, address: &str) -> Option<ResourceState> {
        self.resources.remove(address)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

impl Default for State {
    fn default() -> Self {
        Self {
            serial: 0,
            last_updated: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::Value;

    fn bucket() -> ResourceState {
        ResourceState {
            resource_type: "runscope_bucket".to_string(),
            name: "main".to_string(),
            id: "abc".to_string(),
            attributes: [
                ("name".to_string(), Value::from("payments")),
                ("default".to_string(), Value::Bool(false)),
                ("regions".to_string(), Value::string_set(["us1", "eu1"])),
            ]
            .into_iter()
            .collect(),
            dependencies: vec![],
        }
    }

    #[test]
    fn test_default_state() {
        let state = State::default();
        assert!(state.is_empty());
        assert_eq!(state.serial, 0);
    }

    #[test]
    fn test_upsert_and_remove() {
        let mut state = State::default();
        state.upsert(bucket());
        assert_eq!(state.get("runscope_bucket.main").unwrap().id, "abc");

        let mut replaced = bucket();
        replaced.id = "def".to_string();
        state.upsert(replaced);
        assert_eq!(state.resources.len(), 1);
        assert_eq!(state.get("runscope_bucket.main").unwrap().id, "def");

        assert!(state.remove("runscope_bucket.main").is_some());
        assert!(state.is_empty());
    }

    #[test]
    fn test_missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = State::load(&dir.path().join(DEFAULT_FILE)).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DEFAULT_FILE);

        let mut state = State::default();
        let mut test = bucket();
        test.resource_type = "runscope_test".to_string();
        test.dependencies = vec!["runscope_bucket.main".to_string()];
        state.upsert(bucket());
        state.upsert(test);

        state.save(&path).unwrap();
        state.save(&path).unwrap();
        assert_eq!(state.serial, 2);
        assert!(!tmp_path(&path).exists());

        let loaded = State::load(&path).unwrap();
        assert_eq!(loaded.serial, 2);
        assert_eq!(loaded.resources.len(), 2);
        assert_eq!(
            loaded.get("runscope_test.main").unwrap().dependencies,
            vec!["runscope_bucket.main"]
        );
        // Sets come back as plain lists until a schema normalizes them
        assert_eq!(
            loaded.get("runscope_bucket.main").unwrap().attributes["regions"],
            Value::List(vec!["eu1".into(), "us1".into()])
        );
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FILE);
        fs::write(&path, "serial = \"nope\"").unwrap();

        let err = State::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse state file"));
    }
}
