use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

/// String key-value slot scoped to one client instance.
/// In-memory by default; when opened on a path every mutation is written through to a
/// JSON object file so the slot survives restarts (the local-storage analogue).
#[derive(Clone, Debug)]
pub struct KvStore {
    path: Option<PathBuf>,
    map: Arc<RwLock<HashMap<String, String>>>,
}

impl Default for KvStore {
    fn default() -> Self { Self::in_memory() }
}

impl KvStore {
    pub fn in_memory() -> Self {
        Self { path: None, map: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Open a file-backed slot. A missing file starts empty; an unreadable or corrupt one
    /// is logged and ignored so a bad file never blocks startup.
    pub fn load_or_default(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, String>>(&bytes) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "kv: ignoring corrupt store file");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "kv: store file unreadable, starting empty");
                HashMap::new()
            }
        };
        Self { path: Some(path), map: Arc::new(RwLock::new(map)) }
    }

    pub fn path(&self) -> Option<&Path> { self.path.as_deref() }

    pub fn get(&self, key: &str) -> Option<String> { self.map.read().get(key).cloned() }

    pub fn contains(&self, key: &str) -> bool { self.map.read().contains_key(key) }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.map.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Write several entries under one lock; readers never observe a partial update.
    pub fn set_many(&self, entries: &[(&str, &str)]) {
        let mut w = self.map.write();
        for (k, v) in entries { w.insert((*k).to_string(), (*v).to_string()); }
        self.persist(&w);
    }

    pub fn set(&self, key: &str, value: &str) { self.set_many(&[(key, value)]); }

    /// Remove several entries under one lock. Absent keys are fine.
    pub fn remove_many(&self, keys: &[&str]) {
        let mut w = self.map.write();
        let mut changed = false;
        for k in keys { changed |= w.remove(*k).is_some(); }
        if changed { self.persist(&w); }
    }

    // Called with the write lock held so file order matches memory order.
    fn persist(&self, map: &HashMap<String, String>) {
        let Some(path) = &self.path else { return; };
        if let Err(e) = write_snapshot(path, map) {
            tracing::warn!(path = %path.display(), error = %e, "kv: failed to persist store");
        }
    }
}

fn write_snapshot(path: &Path, map: &HashMap<String, String>) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() { std::fs::create_dir_all(dir)?; }
    }
    let bytes = serde_json::to_vec_pretty(map)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    // owner read/write only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
    }
    std::fs::rename(tmp, path)?;
    Ok(())
}
