//! Config store
//!
//! JSON documents under the config directory, cached on first read. Typed
//! accessors sit on top of the raw [`serde_json::Value`] cache. A
//! `delayed_<name>.json` next to `<name>.json` takes precedence for the
//! squad/pack documents, and the whole cache is dropped at every run
//! boundary so edits made mid-session apply to the next run.

pub mod roster;
pub mod rotation;
pub mod shared_vars;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::status::Status;
pub use roster::{Floor, Grace, Sinner};
pub use shared_vars::SharedVars;

pub const GUI_CONFIG: &str = "gui_config";
pub const STATUS_SELECTION: &str = "status_selection";
pub const SQUAD_ORDER: &str = "squad_order";
pub const PACK_PRIORITY: &str = "pack_priority";
pub const PACK_EXCEPTIONS: &str = "pack_exceptions";
pub const FUSION_EXCEPTIONS: &str = "fusion_exceptions";
pub const GRACE_SELECTION: &str = "grace_selection";

/// Loaded eagerly at startup and on every reload.
pub const PRELOAD: [&str; 7] = [
    GUI_CONFIG,
    STATUS_SELECTION,
    SQUAD_ORDER,
    PACK_PRIORITY,
    PACK_EXCEPTIONS,
    FUSION_EXCEPTIONS,
    GRACE_SELECTION,
];

const DELAYED: [&str; 3] = [SQUAD_ORDER, PACK_PRIORITY, PACK_EXCEPTIONS];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config {0} not found")]
    Missing(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

pub struct ConfigStore {
    dir: PathBuf,
    cache: Mutex<HashMap<String, Value>>,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        if DELAYED.contains(&name) {
            let delayed = self.dir.join(format!("delayed_{}.json", name));
            if delayed.is_file() {
                return delayed;
            }
        }
        self.dir.join(format!("{}.json", name))
    }

    fn read(&self, name: &str) -> ConfigResult<Value> {
        let path = self.path_for(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::Missing(name.to_string()))
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        let value = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            name: name.to_string(),
            source,
        })?;
        debug!(config = name, path = %path.display(), "config loaded");
        Ok(value)
    }

    /// Cached document. The lock is held while a miss is filled.
    pub fn get(&self, name: &str) -> ConfigResult<Value> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(value) = cache.get(name) {
            return Ok(value.clone());
        }
        let value = self.read(name)?;
        cache.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Re-read one document from disk, replacing the cached copy.
    pub fn reload(&self, name: &str) -> ConfigResult<Value> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.remove(name);
        let value = self.read(name)?;
        cache.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Drop the cache and load the preload list. Absent documents are fine;
    /// malformed ones are not.
    pub fn reload_all(&self) -> ConfigResult<()> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.preload()
    }

    pub fn preload(&self) -> ConfigResult<()> {
        for name in PRELOAD {
            match self.get(name) {
                Ok(_) | Err(ConfigError::Missing(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn optional(&self, name: &str) -> ConfigResult<Option<Value>> {
        match self.get(name) {
            Ok(value) => Ok(Some(value)),
            Err(ConfigError::Missing(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn typed<T: DeserializeOwned>(&self, name: &str, value: Value) -> ConfigResult<T> {
        serde_json::from_value(value).map_err(|source| ConfigError::Parse {
            name: name.to_string(),
            source,
        })
    }

    // ========== Typed views ==========

    pub fn shared_vars(&self) -> ConfigResult<SharedVars> {
        match self.optional(GUI_CONFIG)? {
            Some(value) => Ok(self
                .typed::<shared_vars::GuiConfig>(GUI_CONFIG, value)?
                .shared_vars),
            None => Ok(SharedVars::default()),
        }
    }

    /// Normalized rotation, `[poise]` when not configured.
    pub fn rotation(&self) -> ConfigResult<Vec<Status>> {
        Ok(self
            .optional(STATUS_SELECTION)?
            .map(|doc| rotation::normalize(&doc))
            .unwrap_or_else(|| vec![Status::Poise]))
    }

    /// Sinners for `status` in rank order, `None` when the status has no squad.
    pub fn squad(&self, status: Status) -> ConfigResult<Option<Vec<Sinner>>> {
        let Some(doc) = self.optional(SQUAD_ORDER)? else {
            return Ok(None);
        };
        let Some(entry) = doc.get(status.name()).cloned() else {
            return Ok(None);
        };
        let ranks: HashMap<String, i64> = self.typed(SQUAD_ORDER, entry)?;
        let mut named: Vec<(i64, Sinner)> = Vec::new();
        for (name, rank) in ranks {
            match serde_json::from_value::<Sinner>(Value::String(name.to_lowercase())) {
                Ok(sinner) => named.push((rank, sinner)),
                Err(_) => warn!(sinner = %name, "unknown sinner in squad order"),
            }
        }
        if named.is_empty() {
            return Ok(None);
        }
        named.sort_by_key(|&(rank, sinner)| (rank, sinner.index()));
        Ok(Some(named.into_iter().map(|(_, s)| s).collect()))
    }

    /// Pack names for `floor`, best first.
    pub fn pack_priority(&self, floor: Floor) -> ConfigResult<Vec<String>> {
        let Some(doc) = self.optional(PACK_PRIORITY)? else {
            return Ok(Vec::new());
        };
        let Some(entry) = doc.get(floor.key()).cloned() else {
            return Ok(Vec::new());
        };
        let ranks: HashMap<String, i64> = self.typed(PACK_PRIORITY, entry)?;
        let mut packs: Vec<(i64, String)> = ranks.into_iter().map(|(k, v)| (v, k)).collect();
        packs.sort();
        Ok(packs.into_iter().map(|(_, name)| name).collect())
    }

    pub fn pack_exceptions(&self, floor: Floor) -> ConfigResult<Vec<String>> {
        let Some(doc) = self.optional(PACK_EXCEPTIONS)? else {
            return Ok(Vec::new());
        };
        match doc.get(floor.key()).cloned() {
            Some(entry) => self.typed(PACK_EXCEPTIONS, entry),
            None => Ok(Vec::new()),
        }
    }

    pub fn fusion_exceptions(&self) -> ConfigResult<Vec<String>> {
        match self.optional(FUSION_EXCEPTIONS)? {
            Some(doc) => self.typed(FUSION_EXCEPTIONS, doc),
            None => Ok(Vec::new()),
        }
    }

    /// Graces in click order.
    pub fn grace_order(&self) -> ConfigResult<Vec<Grace>> {
        let Some(doc) = self.optional(GRACE_SELECTION)? else {
            return Ok(Vec::new());
        };
        let Some(order) = doc.get("order").cloned() else {
            return Ok(Vec::new());
        };
        let ranks: HashMap<String, i64> = self.typed(GRACE_SELECTION, order)?;
        let mut graces: Vec<(i64, Grace)> = Vec::new();
        for (name, rank) in ranks {
            match serde_json::from_value::<Grace>(Value::String(name.clone())) {
                Ok(grace) => graces.push((rank, grace)),
                Err(_) => warn!(grace = %name, "unknown grace in grace order"),
            }
        }
        graces.sort_by_key(|&(rank, grace)| (rank, grace.index()));
        Ok(graces.into_iter().map(|(_, g)| g).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, name: &str, value: &Value) {
        fs::write(dir.join(format!("{}.json", name)), value.to_string()).unwrap();
    }

    #[test]
    fn test_reload_matches_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        write(dir.path(), FUSION_EXCEPTIONS, &json!(["hat"]));
        assert_eq!(store.get(FUSION_EXCEPTIONS).unwrap(), json!(["hat"]));

        write(dir.path(), FUSION_EXCEPTIONS, &json!(["hat", "coin"]));
        // cached until reloaded
        assert_eq!(store.get(FUSION_EXCEPTIONS).unwrap(), json!(["hat"]));

        let reloaded = store.reload(FUSION_EXCEPTIONS).unwrap();
        let on_disk: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("fusion_exceptions.json")).unwrap()).unwrap();
        assert_eq!(reloaded, on_disk);
        assert_eq!(store.get(FUSION_EXCEPTIONS).unwrap(), on_disk);
    }

    #[test]
    fn test_delayed_document_wins() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), PACK_EXCEPTIONS, &json!({"floor4": ["wrath"]}));
        write(dir.path(), "delayed_pack_exceptions", &json!({"floor4": ["gluttony"]}));
        let store = ConfigStore::new(dir.path());
        assert_eq!(store.pack_exceptions(Floor::new(4).unwrap()).unwrap(), vec!["gluttony"]);
    }

    #[test]
    fn test_reload_all_tolerates_missing_but_not_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        store.reload_all().unwrap();

        fs::write(dir.path().join("grace_selection.json"), "{ nope").unwrap();
        assert!(matches!(store.reload_all(), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_squad_sorted_by_rank() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            SQUAD_ORDER,
            &json!({"burn": {"ryoshu": 2, "yisang": 1, "outis": 5, "faust": 3, "honglu": 4, "nobody": 6}}),
        );
        let store = ConfigStore::new(dir.path());
        assert_eq!(
            store.squad(Status::Burn).unwrap().unwrap(),
            vec![Sinner::Yisang, Sinner::Ryoshu, Sinner::Faust, Sinner::Honglu, Sinner::Outis]
        );
        assert!(store.squad(Status::Poise).unwrap().is_none());
    }

    #[test]
    fn test_pack_priority_and_grace_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), PACK_PRIORITY, &json!({"floor1": {"b": 2, "a": 1}}));
        write(
            dir.path(),
            GRACE_SELECTION,
            &json!({"order": {"stats": 2, "levels": 1, "themes": 3, "cost+gift": 4, "generalist": 5}}),
        );
        let store = ConfigStore::new(dir.path());
        assert_eq!(store.pack_priority(Floor::FIRST).unwrap(), vec!["a", "b"]);
        assert!(store.pack_priority(Floor::LAST).unwrap().is_empty());
        assert_eq!(
            store.grace_order().unwrap(),
            vec![Grace::Levels, Grace::Stats, Grace::Themes, Grace::CostGift, Grace::Generalist]
        );
    }

    #[test]
    fn test_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        assert_eq!(store.shared_vars().unwrap(), SharedVars::default());
        assert_eq!(store.rotation().unwrap(), vec![Status::Poise]);
        assert!(store.fusion_exceptions().unwrap().is_empty());
    }
}
