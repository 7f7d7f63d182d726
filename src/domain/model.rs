use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 一筆多跳問答記錄。欄位順序依輸入保留（serde_json `preserve_order`）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// 從 JSON 值建立記錄，非物件一律視為 schema 錯誤
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(data) => Ok(Self { data }),
            other => Err(EtlError::schema(
                "<record>",
                format!("expected a JSON object, found {}", json_type_name(&other)),
            )),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 解析 JSON 陣列形式的記錄集合
pub fn records_from_json(bytes: &[u8]) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_slice(bytes)?;
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| Record::from_value(item).map_err(|e| e.at_record(i)))
            .collect(),
        other => Err(EtlError::ProcessingError {
            message: format!(
                "expected a JSON array of records, found {}",
                json_type_name(&other)
            ),
        }),
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 已持久化的翻譯進度快照：`translated_records.len() == index`
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    index: usize,
    translated_records: Vec<Record>,
}

impl Checkpoint {
    pub fn new(index: usize, translated_records: Vec<Record>) -> Result<Self> {
        if translated_records.len() != index {
            return Err(EtlError::CheckpointError {
                message: format!(
                    "checkpoint {} holds {} records",
                    index,
                    translated_records.len()
                ),
            });
        }
        Ok(Self {
            index,
            translated_records,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn translated_records(&self) -> &[Record] {
        &self.translated_records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.translated_records
    }
}

/// 一次翻譯工作的狀態，只由 pipeline driver 變更
#[derive(Debug, Clone)]
pub struct TranslationJob {
    source: Vec<Record>,
    translated: Vec<Record>,
    checkpoint_interval: usize,
    resumed_from: usize,
}

impl TranslationJob {
    pub fn new(source: Vec<Record>, checkpoint_interval: usize) -> Self {
        Self {
            source,
            translated: Vec::new(),
            checkpoint_interval: checkpoint_interval.max(1),
            resumed_from: 0,
        }
    }

    /// 以 checkpoint 的前綴接續；checkpoint 不得超過來源長度
    pub fn resume(
        source: Vec<Record>,
        checkpoint: Checkpoint,
        checkpoint_interval: usize,
    ) -> Result<Self> {
        if checkpoint.index() > source.len() {
            return Err(EtlError::CheckpointError {
                message: format!(
                    "checkpoint index {} exceeds source collection size {}",
                    checkpoint.index(),
                    source.len()
                ),
            });
        }
        let resumed_from = checkpoint.index();
        Ok(Self {
            source,
            translated: checkpoint.into_records(),
            checkpoint_interval: checkpoint_interval.max(1),
            resumed_from,
        })
    }

    pub fn index(&self) -> usize {
        self.translated.len()
    }

    pub fn total(&self) -> usize {
        self.source.len()
    }

    pub fn resumed_from(&self) -> usize {
        self.resumed_from
    }

    pub fn is_complete(&self) -> bool {
        self.index() >= self.total()
    }

    pub fn next_record(&self) -> Option<&Record> {
        self.source.get(self.index())
    }

    /// 附加一筆翻譯結果並前進；返回是否到了 checkpoint 節點
    pub fn advance(&mut self, translated: Record) -> bool {
        self.translated.push(translated);
        self.index() % self.checkpoint_interval == 0
    }

    pub fn translated(&self) -> &[Record] {
        &self.translated
    }

    pub fn into_translated(self) -> Vec<Record> {
        self.translated
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub processed_records: Vec<Record>,
    pub description: String,
    pub resumed_from: usize,
    pub translated_this_run: usize,
    pub fallback_fields: usize,
    pub failed_checkpoints: usize,
}

/// 發布到 dataset sink 所需的參數
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub repo_name: String,
    pub private: bool,
    pub commit_message: String,
    pub description: Option<String>,
}
