use crate::domain::model::{PublishRequest, Record, TransformResult, TranslationJob};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 寫入要嘛完整可見，要嘛完全不可見
    fn write_file_atomic(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 列出目錄下的檔名（不含路徑），目錄不存在時返回空列表
    fn list_files(&self, dir: &str)
        -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 外部翻譯服務：輸入文字，返回譯文或失敗
#[async_trait]
pub trait TranslationService: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String>;
}

#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Record>>;
}

#[async_trait]
pub trait DatasetSink: Send + Sync {
    /// 發布完成的集合，返回發布位置
    async fn publish(&self, records: &[Record], request: &PublishRequest) -> Result<String>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn seed(&self, records: Vec<Record>) -> Result<TranslationJob>;
    async fn transform(&self, job: TranslationJob) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}

