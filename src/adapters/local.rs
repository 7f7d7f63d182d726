use crate::domain::model::{records_from_json, PublishRequest, Record};
use crate::domain::ports::{DatasetSink, DatasetSource, Storage};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;

/// 從本機 JSON 陣列檔讀取記錄
pub struct FileDatasetSource<S: Storage> {
    storage: S,
    path: String,
}

impl<S: Storage> FileDatasetSource<S> {
    pub fn new(storage: S, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
        }
    }
}

#[async_trait]
impl<S: Storage> DatasetSource for FileDatasetSource<S> {
    async fn fetch(&self) -> Result<Vec<Record>> {
        tracing::info!("📂 Reading dataset from {}", self.path);
        let data = self
            .storage
            .read_file(&self.path)
            .await
            .map_err(|e| EtlError::SourceError {
                message: format!("cannot read {}: {}", self.path, e),
            })?;
        records_from_json(&data)
    }
}

/// 將完成的集合寫到本機目錄：`{repo}/data/train.json` 與 `{repo}/README.md`
pub struct LocalDatasetSink<S: Storage> {
    storage: S,
}

impl<S: Storage> LocalDatasetSink<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }
}

pub const DATA_FILE: &str = "data/train.json";
pub const CARD_FILE: &str = "README.md";

#[async_trait]
impl<S: Storage> DatasetSink for LocalDatasetSink<S> {
    async fn publish(&self, records: &[Record], request: &PublishRequest) -> Result<String> {
        let data = serde_json::to_vec_pretty(records)?;
        let data_path = format!("{}/{}", request.repo_name, DATA_FILE);

        self.storage
            .write_file_atomic(&data_path, &data)
            .await
            .map_err(|e| EtlError::SinkError {
                message: format!("cannot write {}: {}", data_path, e),
            })?;

        if let Some(description) = &request.description {
            let card_path = format!("{}/{}", request.repo_name, CARD_FILE);
            self.storage
                .write_file_atomic(&card_path, description.as_bytes())
                .await
                .map_err(|e| EtlError::SinkError {
                    message: format!("cannot write {}: {}", card_path, e),
                })?;
        }

        tracing::info!(
            "📁 Wrote {} records to {} ({})",
            records.len(),
            data_path,
            request.commit_message
        );
        Ok(request.repo_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_source_reads_json_array() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap());
        storage
            .write_file(
                "input.json",
                br#"[{"question": "Who is king?", "no_of_hops": 2}, {"question": "Bob?"}]"#,
            )
            .await
            .unwrap();

        let source = FileDatasetSource::new(storage, "input.json");
        let records = source.fetch().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("no_of_hops"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_file_source_missing_file_is_source_error() {
        let temp_dir = TempDir::new().unwrap();
        let source = FileDatasetSource::new(
            LocalStorage::new(temp_dir.path().to_str().unwrap()),
            "missing.json",
        );

        assert!(matches!(
            source.fetch().await,
            Err(EtlError::SourceError { .. })
        ));
    }

    #[tokio::test]
    async fn test_local_sink_writes_data_and_card() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap());
        let sink = LocalDatasetSink::new(storage.clone());
        let records =
            vec![Record::from_value(json!({"question": "কে রাজা?", "no_of_hops": 2})).unwrap()];
        let request = PublishRequest {
            repo_name: "bengali-morehopqa".to_string(),
            private: false,
            commit_message: "Add Bengali translation".to_string(),
            description: Some("# Card".to_string()),
        };

        let location = sink.publish(&records, &request).await.unwrap();

        assert_eq!(location, "bengali-morehopqa");
        let data = storage
            .read_file("bengali-morehopqa/data/train.json")
            .await
            .unwrap();
        assert_eq!(records_from_json(&data).unwrap(), records);
        let card = storage.read_file("bengali-morehopqa/README.md").await.unwrap();
        assert_eq!(card, b"# Card");
    }
}
