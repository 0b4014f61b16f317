use crate::application::ports::DraftStorage;
use crate::shared::error::StorageError;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// 1つの JSON ファイルにドラフト名前空間全体を保存する永続化媒体
///
/// 書き込みは一時ファイルに書いてからリネームするため、途中で失敗しても
/// 既存のファイルは壊れない。プロセス内の単一コンテキストでの利用を想定している。
pub struct JsonFileStorage {
    path: PathBuf,
    entries: RwLock<IndexMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl JsonFileStorage {
    /// ファイルを開く（存在しなければ空の媒体として扱う）
    ///
    /// 保存先のディレクトリが作成できない場合はエラーを返す。
    /// 内容が解析できない場合は空として開き直し、次の書き込みで上書きする。
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = match load_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), "Draft file unreadable, starting empty: {e:#}");
                IndexMap::new()
            }
        };
        debug!(path = %path.display(), entries = entries.len(), "Opened draft file storage");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
            quota_bytes: None,
        })
    }

    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    /// 既定の保存先（ローカルデータディレクトリ配下）
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("draftline");
        path.push("drafts.json");
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate<F>(&self, mutator: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut IndexMap<String, String>) -> Result<bool, StorageError>,
    {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::Unavailable("file storage lock poisoned".to_string()))?;

        let mut next = entries.clone();
        if !mutator(&mut next)? {
            return Ok(());
        }

        persist_entries(&self.path, &next).map_err(|e| StorageError::Io(format!("{e:#}")))?;
        *entries = next;
        Ok(())
    }
}

fn load_entries(path: &Path) -> Result<IndexMap<String, String>> {
    if !path.exists() {
        return Ok(IndexMap::new());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(IndexMap::new());
    }
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn persist_entries(path: &Path, entries: &IndexMap<String, String>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let json = serde_json::to_string(entries).context("Failed to serialize draft entries")?;
    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<()> {
        let mut file = File::create(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync {}", tmp_path.display()))?;
        Ok(())
    })();

    if let Err(e) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        anyhow::anyhow!("{} -> {}: {e}", tmp_path.display(), path.display())
    })
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}", std::process::id()));
    PathBuf::from(tmp)
}

impl DraftStorage for JsonFileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::Unavailable("file storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let quota = self.quota_bytes;
        self.mutate(|entries| {
            if entries.get(key).map(String::as_str) == Some(value) {
                return Ok(false);
            }
            if let Some(quota) = quota {
                let used: usize = entries
                    .iter()
                    .filter(|(k, _)| k.as_str() != key)
                    .map(|(k, v)| k.len() + v.len())
                    .sum();
                let required = key.len() + value.len();
                let available = quota.saturating_sub(used);
                if required > available {
                    return Err(StorageError::QuotaExceeded {
                        key: key.to_string(),
                        required,
                        available,
                    });
                }
            }
            entries.insert(key.to_string(), value.to_string());
            Ok(true)
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.mutate(|entries| Ok(entries.shift_remove(key).is_some()))
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::Unavailable("file storage lock poisoned".to_string()))?;
        Ok(entries.keys().cloned().collect())
    }

    fn len(&self) -> Result<usize, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::Unavailable("file storage lock poisoned".to_string()))?;
        Ok(entries.len())
    }
}
