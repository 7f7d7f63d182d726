use crate::domain::model::{records_from_json, Checkpoint, TranslationJob};
use crate::domain::ports::Storage;
use crate::utils::error::Result;

const CHECKPOINT_PREFIX: &str = "checkpoint_";
const CHECKPOINT_SUFFIX: &str = ".json";

pub fn checkpoint_file_name(index: usize) -> String {
    format!("{}{:08}{}", CHECKPOINT_PREFIX, index, CHECKPOINT_SUFFIX)
}

/// 從檔名取出 index；暫存檔與其他檔案返回 None
pub fn parse_checkpoint_index(file_name: &str) -> Option<usize> {
    let digits = file_name
        .strip_prefix(CHECKPOINT_PREFIX)?
        .strip_suffix(CHECKPOINT_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// 目錄中找到的一份 checkpoint；檔名可能未補零（例如 `checkpoint_100.json`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointEntry {
    pub index: usize,
    pub file_name: String,
}

/// 將翻譯進度寫入 checkpoint 目錄，並在啟動時讀回最新的一份
pub struct CheckpointManager<S: Storage> {
    storage: S,
    dir: String,
    keep_last: Option<usize>,
}

impl<S: Storage> CheckpointManager<S> {
    pub fn new(storage: S, dir: impl Into<String>) -> Self {
        Self {
            storage,
            dir: dir.into(),
            keep_last: None,
        }
    }

    /// 只保留最近 `keep_last` 份 checkpoint
    pub fn with_retention(mut self, keep_last: Option<usize>) -> Self {
        self.keep_last = keep_last.filter(|k| *k > 0);
        self
    }

    pub fn dir(&self) -> &str {
        &self.dir
    }

    fn path_for(&self, file_name: &str) -> String {
        if self.dir.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.dir.trim_end_matches('/'), file_name)
        }
    }
    /// 目錄中所有 checkpoint 檔，index 由大到小；同一 index 的補零檔名排在前面
    pub async fn list_entries(&self) -> Result<Vec<CheckpointEntry>> {
        let mut entries: Vec<CheckpointEntry> = self
            .storage
            .list_files(&self.dir)
            .await?
            .into_iter()
            .filter_map(|file_name| {
                parse_checkpoint_index(&file_name).map(|index| CheckpointEntry { index, file_name })
            })
            .collect();
        entries.sort_unstable_by(|a, b| {
            b.index
                .cmp(&a.index)
                .then_with(|| b.file_name.len().cmp(&a.file_name.len()))
        });
        Ok(entries)
    }

    /// 目錄中所有 checkpoint 的 index，由大到小
    pub async fn list_indices(&self) -> Result<Vec<usize>> {
        let mut indices: Vec<usize> = self
            .list_entries()
            .await?
            .into_iter()
            .map(|entry| entry.index)
            .collect();
        indices.dedup();
        Ok(indices)
    }

    /// 持久化 `job` 目前已翻譯的前綴，返回寫入路徑
    pub async fn save(&self, job: &TranslationJob) -> Result<String> {
        let index = job.index();

        if let Some(existing) = self
            .list_entries()
            .await?
            .into_iter()
            .find(|entry| entry.index == index)
        {
            let path = self.path_for(&existing.file_name);
            tracing::warn!(
                "Checkpoint {} already exists, leaving it untouched: {}",
                index,
                path
            );
            return Ok(path);
        }

        let path = self.path_for(&checkpoint_file_name(index));
        let data = serde_json::to_vec_pretty(job.translated())?;
        self.storage.write_file_atomic(&path, &data).await?;
        tracing::info!("💾 Checkpoint saved: {} ({} records)", path, index);

        if let Some(keep_last) = self.keep_last {
            self.prune(keep_last).await;
        }

        Ok(path)
    }

    /// 讀回 index 最大的 checkpoint。最新一份無法解析時退回上一份。
    pub async fn load(&self) -> Result<Option<Checkpoint>> {
        for entry in self.list_entries().await? {
            let path = self.path_for(&entry.file_name);
            match self.read_checkpoint(entry.index, &path).await {
                Ok(checkpoint) => {
                    tracing::info!("📂 Loaded checkpoint {} from {}", entry.index, path);
                    return Ok(Some(checkpoint));
                }
                Err(e) => {
                    tracing::error!("❌ Ignoring unreadable checkpoint {}: {}", path, e);
                }
            }
        }
        Ok(None)
    }

    async fn read_checkpoint(&self, index: usize, path: &str) -> Result<Checkpoint> {
        let data = self.storage.read_file(path).await?;
        let records = records_from_json(&data)?;
        Checkpoint::new(index, records)
    }

    async fn prune(&self, keep_last: usize) {
        let entries = match self.list_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Could not list checkpoints for pruning: {}", e);
                return;
            }
        };

        let mut kept: Vec<usize> = Vec::with_capacity(keep_last);
        for entry in entries {
            if !kept.contains(&entry.index) && kept.len() < keep_last {
                kept.push(entry.index);
            }
            if kept.contains(&entry.index) {
                continue;
            }

            let path = self.path_for(&entry.file_name);
            match self.storage.remove_file(&path).await {
                Ok(()) => tracing::debug!("Removed superseded checkpoint {}", path),
                Err(e) => tracing::warn!("Could not remove checkpoint {}: {}", path, e),
            }
        }
    }
}
