use crate::adapters::local::{CARD_FILE, DATA_FILE};
use crate::domain::model::{records_from_json, PublishRequest, Record};
use crate::domain::ports::{DatasetSink, DatasetSource};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_HUB_ENDPOINT: &str = "https://huggingface.co";

fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

fn with_token(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) if !token.is_empty() => request.bearer_auth(token),
        _ => request,
    }
}

/// 從 Hub 的 dataset repo 下載單一 JSON 檔
pub struct HubDatasetSource {
    client: Client,
    endpoint: String,
    repo_id: String,
    filename: String,
    revision: String,
    token: Option<String>,
}

impl HubDatasetSource {
    pub fn new(
        endpoint: impl Into<String>,
        repo_id: impl Into<String>,
        filename: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
            repo_id: repo_id.into(),
            filename: filename.into(),
            revision: "main".to_string(),
            token,
        })
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    fn file_url(&self) -> String {
        format!(
            "{}/datasets/{}/resolve/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.repo_id,
            self.revision,
            self.filename
        )
    }
}

#[async_trait]
impl DatasetSource for HubDatasetSource {
    async fn fetch(&self) -> Result<Vec<Record>> {
        let url = self.file_url();
        tracing::info!("📡 Downloading {}/{} from the Hub", self.repo_id, self.filename);

        let response = with_token(self.client.get(&url), self.token.as_deref())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::SourceError {
                message: format!("GET {} returned {}", url, status),
            });
        }

        let bytes = response.bytes().await?;
        tracing::debug!("Downloaded {} bytes", bytes.len());
        let records = records_from_json(&bytes)?;
        tracing::info!("📥 Loaded {} records", records.len());
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct WhoAmI {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    commit_url: Option<String>,
}

/// 建立（或沿用）dataset repo，再以單一 commit 上傳資料與 dataset card
pub struct HubDatasetSink {
    client: Client,
    endpoint: String,
    token: String,
    revision: String,
}

impl HubDatasetSink {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
            token: token.into(),
            revision: "main".to_string(),
        })
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api/{}", self.endpoint.trim_end_matches('/'), path)
    }

    /// 沒有 namespace 的 repo 名稱歸屬於 token 的使用者
    async fn resolve_repo_id(&self, repo_name: &str) -> Result<String> {
        if repo_name.contains('/') {
            return Ok(repo_name.to_string());
        }

        let response = self
            .client
            .get(self.api("whoami-v2"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(EtlError::SinkError {
                message: format!("token lookup returned {}", response.status()),
            });
        }
        let whoami: WhoAmI = response.json().await?;
        Ok(format!("{}/{}", whoami.name, repo_name))
    }

    async fn ensure_repo(&self, repo_id: &str, private: bool) -> Result<()> {
        let (organization, name) = match repo_id.split_once('/') {
            Some((org, name)) => (Some(org), name),
            None => (None, repo_id),
        };

        let response = self
            .client
            .post(self.api("repos/create"))
            .bearer_auth(&self.token)
            .json(&json!({
                "type": "dataset",
                "name": name,
                "organization": organization,
                "private": private,
            }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!("📦 Created dataset repo {}", repo_id);
                Ok(())
            }
            StatusCode::CONFLICT => {
                tracing::debug!("Dataset repo {} already exists", repo_id);
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(EtlError::SinkError {
                    message: format!("creating {} returned {}: {}", repo_id, status, body),
                })
            }
        }
    }

    fn commit_body(records_json: &[u8], request: &PublishRequest) -> Result<String> {
        let mut lines = vec![json!({
            "key": "header",
            "value": {"summary": request.commit_message, "description": ""}
        })];
        lines.push(json!({
            "key": "file",
            "value": {"content": STANDARD.encode(records_json), "path": DATA_FILE, "encoding": "base64"}
        }));
        if let Some(description) = &request.description {
            lines.push(json!({
                "key": "file",
                "value": {"content": STANDARD.encode(description.as_bytes()), "path": CARD_FILE, "encoding": "base64"}
            }));
        }

        let mut body = String::new();
        for line in lines {
            body.push_str(&serde_json::to_string(&line)?);
            body.push('\n');
        }
        Ok(body)
    }
}

#[async_trait]
impl DatasetSink for HubDatasetSink {
    async fn publish(&self, records: &[Record], request: &PublishRequest) -> Result<String> {
        let repo_id = self.resolve_repo_id(&request.repo_name).await?;
        self.ensure_repo(&repo_id, request.private).await?;

        let records_json = serde_json::to_vec(records)?;
        let body = Self::commit_body(&records_json, request)?;
        tracing::info!(
            "🚀 Pushing {} records ({} bytes) to {}",
            records.len(),
            records_json.len(),
            repo_id
        );

        let response = self
            .client
            .post(self.api(&format!("datasets/{}/commit/{}", repo_id, self.revision)))
            .bearer_auth(&self.token)
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EtlError::SinkError {
                message: format!("commit to {} returned {}: {}", repo_id, status, body),
            });
        }

        let commit: CommitResponse = response.json().await?;
        Ok(commit.commit_url.unwrap_or_else(|| {
            format!("{}/datasets/{}", self.endpoint.trim_end_matches('/'), repo_id)
        }))
    }
}
