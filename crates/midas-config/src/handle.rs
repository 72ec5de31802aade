use crate::editable::{collect_paths, deep_merge, walk_editable, EditableEntry};
use crate::paths::resolve;
use crate::settings::{is_sensitive_path, ConfigTree};
use arc_swap::ArcSwap;
use midas_models::MidasError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Typed, hot-swappable access to runtime settings (C1). Readers always
/// see a consistent tree: `current` is an `ArcSwap`, so a `reload` or
/// `apply_patch` replaces the whole tree atomically rather than mutating
/// fields in place.
pub struct ConfigHandle {
    config_path: PathBuf,
    anchor_dir: PathBuf,
    current: ArcSwap<ConfigTree>,
}

impl ConfigHandle {
    /// Loads the tree from `config_path`, anchoring every relative path
    /// inside it against `config_path`'s parent directory.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self, MidasError> {
        let config_path = config_path.as_ref().to_path_buf();
        let anchor_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let tree = Self::read_tree(&config_path)?;
        info!(path = %config_path.display(), "config loaded");

        Ok(Self {
            config_path,
            anchor_dir,
            current: ArcSwap::from_pointee(tree),
        })
    }

    fn read_tree(config_path: &Path) -> Result<ConfigTree, MidasError> {
        let raw = std::fs::read_to_string(config_path)
            .map_err(|e| MidasError::invalid_input(format!("cannot read config file: {e}")))?;
        serde_yaml::from_str(&raw)
            .map_err(|e| MidasError::invalid_input(format!("malformed config file: {e}")))
    }

    pub fn get(&self) -> Arc<ConfigTree> {
        self.current.load_full()
    }

    pub fn anchor_dir(&self) -> &Path {
        &self.anchor_dir
    }

    /// Resolves a path that may be relative in the config tree against
    /// the config file's directory.
    pub fn resolve_path(&self, relative: &Path) -> PathBuf {
        resolve(&self.anchor_dir, relative)
    }

    /// Re-reads the config file from disk and swaps it in atomically.
    #[instrument(skip(self))]
    pub fn reload(&self) -> Result<(), MidasError> {
        let tree = Self::read_tree(&self.config_path)?;
        self.current.store(Arc::new(tree));
        info!("config reloaded");
        Ok(())
    }

    /// The editable subset of the tree with sensitive keys filtered out.
    pub fn editable_snapshot(&self) -> Result<Vec<EditableEntry>, MidasError> {
        let tree = self.get();
        let json = serde_json::to_value(&*tree)
            .map_err(|e| MidasError::internal(format!("config serialization failed: {e}")))?;
        let mut entries = Vec::new();
        walk_editable(&json, "", &mut entries);
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    /// Deep-merges `patch` onto the current tree and atomically swaps
    /// the result in. Rejects unknown keys or type mismatches, and any
    /// attempt to touch a sensitive path (spec §4.1).
    #[instrument(skip(self, patch))]
    pub fn apply_patch(&self, patch: Value) -> Result<(), MidasError> {
        let mut touched = Vec::new();
        collect_paths(&patch, "", &mut touched);
        if let Some(sensitive) = touched.iter().find(|p| is_sensitive_path(p)) {
            warn!(path = %sensitive, "rejected patch touching sensitive key");
            return Err(MidasError::invalid_input(format!(
                "field '{sensitive}' is not editable"
            )));
        }

        let current = self.get();
        let mut base = serde_json::to_value(&*current)
            .map_err(|e| MidasError::internal(format!("config serialization failed: {e}")))?;
        deep_merge(&mut base, &patch);

        let merged: ConfigTree = serde_json::from_value(base)
            .map_err(|e| MidasError::invalid_input(format!("invalid config patch: {e}")))?;

        self.current.store(Arc::new(merged));
        info!("config patch applied");
        Ok(())
    }

    /// Discards the in-memory tree in favor of built-in defaults. Does
    /// not touch the file on disk; a subsequent `reload` restores it.
    pub fn reset_to_defaults(&self) {
        self.current.store(Arc::new(ConfigTree::default()));
        info!("config reset to defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("midas.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn load_applies_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "bilibili:\n  max_video_minutes: 90\n");
        let handle = ConfigHandle::load(&path).unwrap();
        assert_eq!(handle.get().bilibili.max_video_minutes, 90);
        assert_eq!(handle.get().xiaohongshu.default_limit, 20);
    }

    #[test]
    fn editable_snapshot_masks_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "llm:\n  api_key: super-secret\n");
        let handle = ConfigHandle::load(&path).unwrap();
        let entries = handle.editable_snapshot().unwrap();
        assert!(entries.iter().all(|e| e.path != "llm.api_key"));
    }

    #[test]
    fn apply_patch_rejects_sensitive_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "llm: {}\n");
        let handle = ConfigHandle::load(&path).unwrap();
        let patch = serde_json::json!({"llm": {"api_key": "leaked"}});
        let err = handle.apply_patch(patch).unwrap_err();
        assert_eq!(err.kind, midas_models::ErrorKind::InvalidInput);
    }

    #[test]
    fn apply_patch_merges_and_swaps_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "bilibili:\n  max_video_minutes: 90\n");
        let handle = ConfigHandle::load(&path).unwrap();
        handle
            .apply_patch(serde_json::json!({"bilibili": {"max_video_minutes": 30}}))
            .unwrap();
        assert_eq!(handle.get().bilibili.max_video_minutes, 30);
        assert_eq!(handle.get().xiaohongshu.default_limit, 20);
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "storage:\n  database_path: data/midas.db\n");
        let handle = ConfigHandle::load(&path).unwrap();
        let resolved = handle.resolve_path(&handle.get().storage.database_path);
        assert_eq!(resolved, dir.path().join("data/midas.db"));
    }
}
